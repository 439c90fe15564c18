//! Remote model metadata as returned by the Civitai `models/{id}` endpoint.
//!
//! Only the fields the pipeline reads are modelled; the full response is kept
//! as raw JSON next to the downloads. Enumerations carry an `Other` fallback
//! so that new values on the service side resolve through the documented
//! defaults instead of failing the job.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    Checkpoint,
    #[serde(rename = "LORA")]
    Lora,
    LoCon,
    #[serde(rename = "VAE")]
    Vae,
    TextualInversion,
    Controlnet,
    Hypernetwork,
    Poses,
    AestheticGradient,
    #[serde(other)]
    Other,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Checkpoint => "Checkpoint",
            ModelType::Lora => "LORA",
            ModelType::LoCon => "LoCon",
            ModelType::Vae => "VAE",
            ModelType::TextualInversion => "TextualInversion",
            ModelType::Controlnet => "Controlnet",
            ModelType::Hypernetwork => "Hypernetwork",
            ModelType::Poses => "Poses",
            ModelType::AestheticGradient => "AestheticGradient",
            ModelType::Other => "Other",
        }
    }

    /// LoRA-style adapters whose names get a category tag prefix.
    pub fn is_lora_like(&self) -> bool {
        matches!(self, ModelType::Lora | ModelType::LoCon)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable Diffusion generation a version was trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseModel {
    #[serde(rename = "SD 1.4")]
    Sd14,
    #[serde(rename = "SD 1.5")]
    Sd15,
    #[serde(rename = "SD 2.0")]
    Sd20,
    #[serde(rename = "SD 2.0 768")]
    Sd20_768,
    #[serde(rename = "SD 2.1")]
    Sd21,
    #[serde(rename = "SD 2.1 768")]
    Sd21_768,
    #[serde(rename = "SD 2.1 Unclip")]
    Sd21Unclip,
    #[serde(rename = "SDXL 0.9")]
    Sdxl09,
    #[serde(rename = "SDXL 1.0")]
    Sdxl10,
    #[serde(other)]
    Other,
}

impl BaseModel {
    /// Generation picked when a job does not name a version.
    pub const DEFAULT_GENERATION: BaseModel = BaseModel::Sdxl10;

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseModel::Sd14 => "SD 1.4",
            BaseModel::Sd15 => "SD 1.5",
            BaseModel::Sd20 => "SD 2.0",
            BaseModel::Sd20_768 => "SD 2.0 768",
            BaseModel::Sd21 => "SD 2.1",
            BaseModel::Sd21_768 => "SD 2.1 768",
            BaseModel::Sd21Unclip => "SD 2.1 Unclip",
            BaseModel::Sdxl09 => "SDXL 0.9",
            BaseModel::Sdxl10 => "SDXL 1.0",
            BaseModel::Other => "Other",
        }
    }
}

impl Default for BaseModel {
    fn default() -> Self {
        BaseModel::Other
    }
}

impl fmt::Display for BaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a file of a version is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilePurpose {
    Model,
    #[serde(rename = "VAE")]
    Vae,
    Config,
    #[serde(other)]
    Other,
}

/// Serialization format of a weights file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    SafeTensor,
    PickleTensor,
    #[serde(other)]
    Other,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::SafeTensor => "SafeTensor",
            FileFormat::PickleTensor => "PickleTensor",
            FileFormat::Other => "Other",
        }
    }
}

impl Default for FileFormat {
    fn default() -> Self {
        FileFormat::Other
    }
}

/// Floating point precision of a weights file (`fp16`, `fp32`, `bf16`, ...).
///
/// Unknown spellings are kept verbatim so they still show up in file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Precision {
    Fp16,
    Fp32,
    Bf16,
    Other(String),
}

impl Precision {
    pub fn as_str(&self) -> &str {
        match self {
            Precision::Fp16 => "fp16",
            Precision::Fp32 => "fp32",
            Precision::Bf16 => "bf16",
            Precision::Other(token) => token,
        }
    }

    /// Bit width taken from the digits of the token (`fp8` -> 8).
    pub fn bits(&self) -> u32 {
        match self {
            Precision::Fp16 | Precision::Bf16 => 16,
            Precision::Fp32 => 32,
            Precision::Other(token) => token
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .unwrap_or(0),
        }
    }

    /// Whether this is a brain-float precision.
    pub fn is_brain_float(&self) -> bool {
        match self {
            Precision::Bf16 => true,
            Precision::Fp16 | Precision::Fp32 => false,
            Precision::Other(token) => {
                token
                    .chars()
                    .filter(|c| !c.is_ascii_digit())
                    .collect::<String>()
                    == "bf"
            }
        }
    }
}

impl From<String> for Precision {
    fn from(value: String) -> Self {
        match value.as_str() {
            "fp16" => Precision::Fp16,
            "fp32" => Precision::Fp32,
            "bf16" => Precision::Bf16,
            _ => Precision::Other(value),
        }
    }
}

impl From<Precision> for String {
    fn from(value: Precision) -> Self {
        value.as_str().to_string()
    }
}

/// Whether a checkpoint keeps its training-only weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completeness {
    Full,
    Pruned,
}

impl Completeness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Completeness::Full => "full",
            Completeness::Pruned => "pruned",
        }
    }
}

/// Format/precision/completeness block of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(default)]
    pub format: FileFormat,
    #[serde(default, rename = "fp")]
    pub precision: Option<Precision>,
    #[serde(default, rename = "size")]
    pub completeness: Option<Completeness>,
}

/// Published content hashes of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileHashes {
    #[serde(default, rename = "SHA256")]
    pub sha256: Option<String>,
    #[serde(default, rename = "AutoV2")]
    pub auto_v2: Option<String>,
    #[serde(default, rename = "BLAKE3")]
    pub blake3: Option<String>,
    #[serde(default, rename = "CRC32")]
    pub crc32: Option<String>,
}

/// A single downloadable file of a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: u64,
    pub name: String,
    pub download_url: String,
    #[serde(default, rename = "sizeKB")]
    pub size_kb: f64,
    #[serde(rename = "type")]
    pub purpose: FilePurpose,
    #[serde(default)]
    pub metadata: FileMetadata,
    #[serde(default)]
    pub hashes: FileHashes,
}

impl RemoteFile {
    pub fn format(&self) -> FileFormat {
        self.metadata.format
    }

    pub fn precision(&self) -> Option<&Precision> {
        self.metadata.precision.as_ref()
    }

    pub fn completeness(&self) -> Option<Completeness> {
        self.metadata.completeness
    }

    /// Extension of the original file name, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// A release of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVersion {
    pub id: u64,
    pub name: String,
    #[serde(default, rename = "baseModel")]
    pub base_model: BaseModel,
    #[serde(default)]
    pub trained_words: Vec<String>,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

/// Author of a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub username: Option<String>,
}

/// A model with all of its versions, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteModel {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    #[serde(default)]
    pub creator: Option<Creator>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default, rename = "modelVersions")]
    pub versions: Vec<RemoteVersion>,
}

impl RemoteModel {
    pub fn creator_username(&self) -> Option<&str> {
        self.creator
            .as_ref()
            .and_then(|c| c.username.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// The newest version by the service's ordering.
    pub fn latest_version(&self) -> Option<&RemoteVersion> {
        self.versions.first()
    }
}
