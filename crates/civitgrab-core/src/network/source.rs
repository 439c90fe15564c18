//! Seam between the job pipeline and the remote model service.

use crate::error::{CivitError, Result};
use crate::model_library::RemoteModel;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// A model as fetched from the service.
#[derive(Debug, Clone)]
pub struct FetchedModel {
    /// Typed view used by the pipeline.
    pub model: RemoteModel,
    /// Verbatim response, written as the metadata snapshot.
    pub raw: Value,
}

impl FetchedModel {
    /// Validate a raw response against the [`RemoteModel`] shape.
    ///
    /// A mismatch is a fetch failure of `model_id`, not a JSON error, so the
    /// job reports it as a bad response.
    pub fn from_value(model_id: u64, raw: Value) -> Result<Self> {
        let model = RemoteModel::deserialize(&raw).map_err(|e| CivitError::Fetch {
            model_id,
            status: None,
            message: format!("Unexpected response shape: {}", e),
        })?;
        Ok(Self { model, raw })
    }
}

/// Source of model metadata and artifact bytes.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Fetch metadata of a model with all of its versions.
    async fn fetch_model(&self, model_id: u64) -> Result<FetchedModel>;

    /// Stream `url` into `destination`, creating or truncating it.
    ///
    /// Returns the number of bytes written. On error the destination may
    /// hold partial output; callers clean it up.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64>;
}
