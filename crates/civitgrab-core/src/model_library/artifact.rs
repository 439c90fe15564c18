//! Display names and file names of downloaded artifacts.

use super::types::{Completeness, FileFormat, FilePurpose, ModelType, RemoteFile};
use crate::config::LayoutConfig;
use regex::Regex;
use std::sync::LazyLock;

/// Anything an embedding trigger name cannot contain.
static EMBEDDING_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9a-z_\-]").unwrap());

static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// How name segments are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// Segments joined by spaces, used for catalog import ids.
    Display,
    /// Spaces replaced by underscores, used for file names.
    FileSystem,
}

/// Derives artifact names from the sanitized model and version names.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactNamer<'a> {
    model_type: ModelType,
    model_name: &'a str,
    version_name: &'a str,
}

impl<'a> ArtifactNamer<'a> {
    pub fn new(model_type: ModelType, model_name: &'a str, version_name: &'a str) -> Self {
        Self {
            model_type,
            model_name,
            version_name,
        }
    }

    /// Name of `file` without extension.
    ///
    /// Segments, in order: model name, version name, format (unless
    /// SafeTensor), precision, completeness (unless full) and `VAE` for VAE
    /// files. Config files are always called `Config`. Textual inversions
    /// use the stricter embedding rule regardless of `style`, since the name
    /// doubles as the trigger word.
    pub fn display_name(&self, file: &RemoteFile, style: NameStyle) -> String {
        if file.purpose == FilePurpose::Config {
            return "Config".to_string();
        }

        let mut segments: Vec<&str> = vec![self.model_name, self.version_name];
        if file.format() != FileFormat::SafeTensor {
            segments.push(file.format().as_str());
        }
        if let Some(precision) = file.precision() {
            segments.push(precision.as_str());
        }
        if let Some(completeness) = file.completeness() {
            if completeness != Completeness::Full {
                segments.push(completeness.as_str());
            }
        }
        if file.purpose == FilePurpose::Vae {
            segments.push("VAE");
        }

        if self.model_type == ModelType::TextualInversion {
            let lowered = segments.join("_").to_lowercase().replace(' ', "_");
            let stripped = EMBEDDING_DISALLOWED.replace_all(&lowered, "");
            return UNDERSCORE_RUNS.replace_all(&stripped, "_").into_owned();
        }

        match style {
            NameStyle::Display => segments.join(" "),
            NameStyle::FileSystem => segments.join("_").replace(' ', "_"),
        }
    }

    /// On-disk file name of `file`.
    ///
    /// The file-system display name plus the extension of the remote file
    /// name. Config files always land in `config.yml`.
    pub fn file_name(&self, file: &RemoteFile) -> String {
        if file.purpose == FilePurpose::Config {
            return LayoutConfig::CONFIG_FILE_NAME.to_string();
        }
        let stem = self.display_name(file, NameStyle::FileSystem);
        match file.extension() {
            Some(extension) => format!("{}.{}", stem, extension),
            None => stem,
        }
    }
}
