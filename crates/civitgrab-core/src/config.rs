//! Centralized configuration for civitgrab.
//!
//! Compile-time constants live on the unit structs below. Runtime knobs are
//! plain structs ([`ClientConfig`], [`GrabOptions`]) built by the caller.

use crate::network::RetryConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const API_BASE: &'static str = "https://civitai.com/api/v1";
    pub const WEB_BASE: &'static str = "https://civitai.com";
    pub const USER_AGENT: &'static str = concat!("civitgrab/", env!("CARGO_PKG_VERSION"));
    pub const TOKEN_QUERY_PARAM: &'static str = "token";
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DOWNLOAD_ATTEMPTS: u32 = 3;
    pub const DOWNLOAD_RETRY_DELAY: Duration = Duration::ZERO;
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
}

/// Import catalog configuration (InvokeAI `models.yaml` conventions).
pub struct CatalogConfig;

impl CatalogConfig {
    pub const FRAGMENT_FILE_NAME: &'static str = "invokeImport.yml";
    pub const METADATA_KEY: &'static str = "__metadata__";
    pub const IMPORT_ID_NAMESPACE: &'static str = "sdxl";
    pub const CHECKPOINT_FALLBACK_CONFIG: &'static str = "configs/stable-diffusion/sd_xl_base.yaml";
    pub const CHECKPOINT_WIDTH: u32 = 1024;
    pub const CHECKPOINT_HEIGHT: u32 = 1024;
    pub const CHECKPOINT_VARIANT: &'static str = "normal";
}

/// On-disk layout of downloaded models.
pub struct LayoutConfig;

impl LayoutConfig {
    pub const SNAPSHOT_FILE_NAME: &'static str = "model.json";
    pub const CONFIG_FILE_NAME: &'static str = "config.yml";
    pub const SHORTCUT_EXTENSION: &'static str = "url";
    pub const NAME_MAX_LENGTH: usize = 30;
    pub const FALLBACK_FOLDER: &'static str = "etc";
    pub const NSFW_PREFIX: &'static str = "NSFW";
}

/// Connection settings for the Civitai source.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub web_base: String,
    /// Access token appended to every outbound request when set.
    pub token: Option<String>,
    /// Total timeout for metadata requests; unset leaves only the transport's.
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: NetworkConfig::API_BASE.to_string(),
            web_base: NetworkConfig::WEB_BASE.to_string(),
            token: None,
            request_timeout: None,
            connect_timeout: NetworkConfig::CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

/// Options shared by every job of a grab batch.
#[derive(Debug, Clone)]
pub struct GrabOptions {
    /// Root under which `<generation>/<type>/<model>/<version>` folders are created.
    pub output_root: PathBuf,
    /// Append ` (<creator>)` to the model name.
    pub append_author_name: bool,
    /// Prefix LoRA/LyCORIS names with their category tag, e.g. `[Style] `.
    pub prepend_lora_type: bool,
    /// Write the catalog fragment even when nothing new was downloaded.
    pub force_catalog: bool,
    /// Compare downloaded bytes against the published SHA256.
    pub verify_hashes: bool,
    pub retry: RetryConfig,
    /// Base URL used for model page links in shortcuts and descriptions.
    pub web_base: String,
}

impl Default for GrabOptions {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            append_author_name: true,
            prepend_lora_type: true,
            force_catalog: false,
            verify_hashes: false,
            retry: RetryConfig::new()
                .with_max_attempts(NetworkConfig::DOWNLOAD_ATTEMPTS)
                .with_delay(NetworkConfig::DOWNLOAD_RETRY_DELAY),
            web_base: NetworkConfig::WEB_BASE.to_string(),
        }
    }
}

impl GrabOptions {
    /// Canonical web page of a model.
    pub fn model_url(&self, model_id: u64) -> String {
        format!("{}/models/{}", self.web_base.trim_end_matches('/'), model_id)
    }
}
