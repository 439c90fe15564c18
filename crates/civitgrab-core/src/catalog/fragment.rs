//! Per-version catalog fragments.
//!
//! A fragment holds the import entry of the primary weights file of a
//! version and, when the version ships one, an entry for its VAE.

use super::entry::{Catalog, CatalogEntry};
use crate::config::{CatalogConfig, LayoutConfig};
use crate::error::{CivitError, Result};
use crate::model_library::{
    ArtifactNamer, FilePurpose, ModelType, NameStyle, RemoteFile, RemoteModel, RemoteVersion,
};
use std::path::Path;

const SI_UNITS: &[&str] = &["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Import-id folder and import format of a model type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFormat {
    pub folder: &'static str,
    /// `None` is written as an explicit null.
    pub format: Option<&'static str>,
}

/// Import format of a model type; types the downstream tool cannot import
/// have none.
pub fn import_format(model_type: ModelType) -> Option<ImportFormat> {
    match model_type {
        ModelType::Checkpoint => Some(ImportFormat {
            folder: "main",
            format: Some("checkpoint"),
        }),
        ModelType::Lora | ModelType::LoCon => Some(ImportFormat {
            folder: "lora",
            format: Some("lycoris"),
        }),
        ModelType::TextualInversion => Some(ImportFormat {
            folder: "embedding",
            format: None,
        }),
        ModelType::Vae => Some(VAE_IMPORT_FORMAT),
        _ => None,
    }
}

const VAE_IMPORT_FORMAT: ImportFormat = ImportFormat {
    folder: "vae",
    format: Some("checkpoint"),
};

/// `sdxl/<folder>/<display name>`.
pub fn import_id(folder: &str, display_name: &str) -> String {
    format!(
        "{}/{}/{}",
        CatalogConfig::IMPORT_ID_NAMESPACE,
        folder,
        display_name
    )
}

/// Human-readable byte size in SI units with three significant digits.
///
/// ```
/// use civitgrab_core::catalog::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(6_938_000_000), "6.94 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    let value = bytes as f64;
    let exponent = ((value.log10() / 3.0).floor() as usize).min(SI_UNITS.len() - 1);
    let scaled = value / 1000f64.powi(exponent as i32);

    let integer_digits = scaled.log10().floor() as i32 + 1;
    let decimals = (3 - integer_digits).max(0) as usize;
    let mut number = format!("{:.*}", decimals, scaled);
    if number.contains('.') {
        number = number.trim_end_matches('0').trim_end_matches('.').to_string();
    }

    format!("{} {}", number, SI_UNITS[exponent])
}

/// `[ words ] | tags | size | url`, skipping empty segments.
pub fn build_description(
    trained_words: &[String],
    tags: &[String],
    size_bytes: u64,
    model_url: &str,
) -> String {
    let mut segments = Vec::with_capacity(4);
    if !trained_words.is_empty() {
        let words: Vec<&str> = trained_words.iter().map(|w| w.trim()).collect();
        segments.push(format!("[ {} ]", words.join(" | ")));
    }
    if !tags.is_empty() {
        let tags: Vec<&str> = tags.iter().map(|t| t.trim()).collect();
        segments.push(tags.join(", "));
    }
    segments.push(format_bytes(size_bytes));
    segments.push(model_url.to_string());
    segments.join(" | ")
}

/// Result of building a fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Built(Catalog),
    /// The model type has no import format.
    UnsupportedType(ModelType),
    /// No primary weights file was kept.
    NoMainFile,
}

/// Everything a fragment is derived from.
pub struct FragmentBuilder<'a> {
    pub model: &'a RemoteModel,
    pub version: &'a RemoteVersion,
    pub kept_files: &'a [&'a RemoteFile],
    pub namer: &'a ArtifactNamer<'a>,
    /// Absolute folder holding the downloaded files.
    pub version_dir: &'a Path,
    pub model_url: &'a str,
}

impl<'a> FragmentBuilder<'a> {
    /// Build the fragment from the files on disk.
    ///
    /// The description carries the size of the written main file, so the
    /// file has to exist.
    pub async fn build(&self) -> Result<Fragment> {
        let Some(format) = import_format(self.model.model_type) else {
            return Ok(Fragment::UnsupportedType(self.model.model_type));
        };
        let Some(main_file) = self.find_kept(FilePurpose::Model) else {
            return Ok(Fragment::NoMainFile);
        };

        let main_path = self.version_dir.join(self.namer.file_name(main_file));
        let size = tokio::fs::metadata(&main_path)
            .await
            .map_err(|e| CivitError::io_with_path(e, &main_path))?
            .len();

        let description = build_description(
            &self.version.trained_words,
            &self.model.tags,
            size,
            self.model_url,
        );

        let mut main_entry = CatalogEntry::new(path_string(&main_path))
            .with_format(format.format)
            .with_description(description.clone());

        if self.model.model_type == ModelType::Checkpoint {
            let config_path = self.version_dir.join(LayoutConfig::CONFIG_FILE_NAME);
            let config_exists = tokio::fs::try_exists(&config_path)
                .await
                .map_err(|e| CivitError::io_with_path(e, &config_path))?;
            let config = if config_exists {
                path_string(&config_path)
            } else {
                CatalogConfig::CHECKPOINT_FALLBACK_CONFIG.to_string()
            };
            main_entry = main_entry
                .with_dimensions(CatalogConfig::CHECKPOINT_WIDTH, CatalogConfig::CHECKPOINT_HEIGHT)
                .with_variant(CatalogConfig::CHECKPOINT_VARIANT)
                .with_config(config);
        }

        let mut catalog = Catalog::new();
        catalog.insert(
            import_id(format.folder, &self.namer.display_name(main_file, NameStyle::Display)),
            main_entry,
        );

        if let Some(vae_file) = self.find_kept(FilePurpose::Vae) {
            let vae_path = self.version_dir.join(self.namer.file_name(vae_file));
            let vae_entry = CatalogEntry::new(path_string(&vae_path))
                .with_format(VAE_IMPORT_FORMAT.format)
                .with_description(format!("{} (VAE)", description));
            catalog.insert(
                import_id(
                    VAE_IMPORT_FORMAT.folder,
                    &self.namer.display_name(vae_file, NameStyle::Display),
                ),
                vae_entry,
            );
        }

        Ok(Fragment::Built(catalog))
    }

    fn find_kept(&self, purpose: FilePurpose) -> Option<&'a RemoteFile> {
        self.kept_files
            .iter()
            .copied()
            .find(|file| file.purpose == purpose)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_library::{
        BaseModel, Completeness, FileFormat, FileHashes, FileMetadata, Precision,
    };
    use tempfile::TempDir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1000), "1 kB");
        assert_eq!(format_bytes(1500), "1.5 kB");
        assert_eq!(format_bytes(123_456), "123 kB");
        assert_eq!(format_bytes(12_345_678), "12.3 MB");
        assert_eq!(format_bytes(6_938_000_000), "6.94 GB");
    }

    #[test]
    fn test_build_description() {
        let words = vec![" analog style ".to_string(), "film".to_string()];
        let tags = vec!["photo".to_string(), " base model".to_string()];
        assert_eq!(
            build_description(&words, &tags, 2_000_000, "https://civitai.com/models/1"),
            "[ analog style | film ] | photo, base model | 2 MB | https://civitai.com/models/1"
        );
        assert_eq!(
            build_description(&[], &[], 10, "u"),
            "10 B | u"
        );
    }

    #[test]
    fn test_import_format_table() {
        assert_eq!(import_format(ModelType::LoCon).unwrap().format, Some("lycoris"));
        assert_eq!(import_format(ModelType::TextualInversion).unwrap().format, None);
        assert_eq!(import_format(ModelType::Vae).unwrap().folder, "vae");
        assert!(import_format(ModelType::Hypernetwork).is_none());
        assert!(import_format(ModelType::Other).is_none());
    }

    fn file(id: u64, name: &str, purpose: FilePurpose) -> RemoteFile {
        RemoteFile {
            id,
            name: name.into(),
            download_url: format!("https://example.com/{id}"),
            size_kb: 1.0,
            purpose,
            metadata: FileMetadata {
                format: FileFormat::SafeTensor,
                precision: Some(Precision::Fp16),
                completeness: Some(Completeness::Full),
            },
            hashes: FileHashes::default(),
        }
    }

    fn model(model_type: ModelType, files: Vec<RemoteFile>) -> RemoteModel {
        RemoteModel {
            id: 7,
            name: "Model".into(),
            model_type,
            creator: None,
            tags: vec!["photo".into()],
            nsfw: false,
            versions: vec![RemoteVersion {
                id: 8,
                name: "v1".into(),
                base_model: BaseModel::Sdxl10,
                trained_words: vec![],
                files,
            }],
        }
    }

    #[tokio::test]
    async fn test_checkpoint_fragment_with_vae() {
        let temp_dir = TempDir::new().unwrap();
        let version_dir = temp_dir.path();
        let m = model(
            ModelType::Checkpoint,
            vec![
                file(1, "a.safetensors", FilePurpose::Model),
                file(2, "vae.safetensors", FilePurpose::Vae),
            ],
        );
        let version = &m.versions[0];
        let kept: Vec<&RemoteFile> = version.files.iter().collect();
        let namer = ArtifactNamer::new(m.model_type, "Model", "v1");
        std::fs::write(version_dir.join("Model_v1_fp16.safetensors"), vec![0u8; 1500]).unwrap();

        let builder = FragmentBuilder {
            model: &m,
            version,
            kept_files: &kept,
            namer: &namer,
            version_dir,
            model_url: "https://civitai.com/models/7",
        };
        let Fragment::Built(catalog) = builder.build().await.unwrap() else {
            panic!("expected a fragment");
        };

        assert_eq!(catalog.len(), 2);
        let main = catalog.get("sdxl/main/Model v1 fp16").unwrap();
        assert_eq!(main.format(), Some("checkpoint"));
        assert_eq!(
            main.description(),
            Some("photo | 1.5 kB | https://civitai.com/models/7")
        );
        assert_eq!(main.config(), Some(CatalogConfig::CHECKPOINT_FALLBACK_CONFIG));
        assert_eq!(
            main.path(),
            Some(version_dir.join("Model_v1_fp16.safetensors").to_string_lossy().as_ref())
        );

        let vae = catalog.get("sdxl/vae/Model v1 fp16 VAE").unwrap();
        assert_eq!(vae.format(), Some("checkpoint"));
        assert_eq!(
            vae.description(),
            Some("photo | 1.5 kB | https://civitai.com/models/7 (VAE)")
        );
        assert!(vae.get("width").is_none());
    }

    #[tokio::test]
    async fn test_checkpoint_uses_downloaded_config() {
        let temp_dir = TempDir::new().unwrap();
        let version_dir = temp_dir.path();
        let m = model(
            ModelType::Checkpoint,
            vec![file(1, "a.safetensors", FilePurpose::Model)],
        );
        let version = &m.versions[0];
        let kept: Vec<&RemoteFile> = version.files.iter().collect();
        let namer = ArtifactNamer::new(m.model_type, "Model", "v1");
        std::fs::write(version_dir.join("Model_v1_fp16.safetensors"), b"x").unwrap();
        std::fs::write(version_dir.join("config.yml"), b"model: {}").unwrap();

        let builder = FragmentBuilder {
            model: &m,
            version,
            kept_files: &kept,
            namer: &namer,
            version_dir,
            model_url: "u",
        };
        let Fragment::Built(catalog) = builder.build().await.unwrap() else {
            panic!("expected a fragment");
        };
        let main = catalog.get("sdxl/main/Model v1 fp16").unwrap();
        assert_eq!(
            main.config(),
            Some(version_dir.join("config.yml").to_string_lossy().as_ref())
        );
    }

    #[tokio::test]
    async fn test_no_fragment_cases() {
        let temp_dir = TempDir::new().unwrap();
        let m = model(ModelType::Poses, vec![file(1, "a.zip", FilePurpose::Model)]);
        let kept: Vec<&RemoteFile> = m.versions[0].files.iter().collect();
        let namer = ArtifactNamer::new(m.model_type, "Model", "v1");
        let builder = FragmentBuilder {
            model: &m,
            version: &m.versions[0],
            kept_files: &kept,
            namer: &namer,
            version_dir: temp_dir.path(),
            model_url: "u",
        };
        assert_eq!(builder.build().await.unwrap(), Fragment::UnsupportedType(ModelType::Poses));

        let m = model(ModelType::Lora, vec![file(1, "cfg.yaml", FilePurpose::Config)]);
        let kept: Vec<&RemoteFile> = m.versions[0].files.iter().collect();
        let builder = FragmentBuilder {
            model: &m,
            version: &m.versions[0],
            kept_files: &kept,
            namer: &namer,
            version_dir: temp_dir.path(),
            model_url: "u",
        };
        assert_eq!(builder.build().await.unwrap(), Fragment::NoMainFile);
    }

    #[tokio::test]
    async fn test_textual_inversion_null_format() {
        let temp_dir = TempDir::new().unwrap();
        let m = model(
            ModelType::TextualInversion,
            vec![file(1, "emb.safetensors", FilePurpose::Model)],
        );
        let kept: Vec<&RemoteFile> = m.versions[0].files.iter().collect();
        let namer = ArtifactNamer::new(m.model_type, "Bad Hands", "v1");
        std::fs::write(temp_dir.path().join("bad_hands_v1_fp16.safetensors"), b"x").unwrap();
        let builder = FragmentBuilder {
            model: &m,
            version: &m.versions[0],
            kept_files: &kept,
            namer: &namer,
            version_dir: temp_dir.path(),
            model_url: "u",
        };
        let Fragment::Built(catalog) = builder.build().await.unwrap() else {
            panic!("expected a fragment");
        };
        let entry = catalog.get("sdxl/embedding/bad_hands_v1_fp16").unwrap();
        assert_eq!(entry.get("format"), Some(&serde_yaml::Value::Null));
        assert!(entry.get("variant").is_none());
    }
}
