//! civitgrab core - headless library for fetching Civitai models and
//! keeping an InvokeAI import catalog in sync.
//!
//! The binary crate only parses arguments and installs logging; every
//! operation lives here.
//!
//! # Example
//!
//! ```rust,ignore
//! use civitgrab_core::{CivitClient, GrabJob, GrabOptions, Grabber};
//!
//! #[tokio::main]
//! async fn main() -> civitgrab_core::Result<()> {
//!     let grabber = Grabber::new(CivitClient::new()?, GrabOptions::default());
//!     let report = grabber.grab(&GrabJob::new("https://civitai.com/models/4201")).await?;
//!     println!("{} files downloaded", report.downloaded_count());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model_library;
pub mod network;

pub use catalog::{Catalog, CatalogEntry, ReconcileReport, Reconciler};
pub use config::{ClientConfig, GrabOptions};
pub use error::{CivitError, ErrorKind, Result};
pub use model_library::{
    delete_model, load_jobs, parse_reference, run_batch, BatchReport, DeleteReport, GrabJob,
    GrabReport, Grabber, ModelReference,
};
pub use network::{CivitClient, FetchedModel, ModelSource, RetryConfig};
