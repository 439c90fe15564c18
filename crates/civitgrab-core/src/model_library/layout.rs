//! Deterministic folder layout for downloaded models.
//!
//! ```text
//! <output root>/<generation>/<type>/<model name>/
//!     model.json
//!     <model name>.url
//!     <version name>/
//!         <artifacts>
//!         invokeImport.yml
//! ```

use super::naming::{capitalize, clean_name};
use super::types::{BaseModel, ModelType, RemoteModel, RemoteVersion};
use crate::config::{CatalogConfig, LayoutConfig};
use crate::error::{CivitError, Result};
use std::path::{Component, Path, PathBuf};

/// Model tags that describe what a LoRA adapts, in no particular order.
const LORA_CATEGORY_TAGS: &[&str] = &[
    "character",
    "style",
    "celebrity",
    "concept",
    "clothing",
    "poses",
    "background",
    "buildings",
    "vehicle",
    "objects",
    "animal",
    "action",
    "assets",
];

/// Folder for a base-model generation; unknown generations go to `etc`.
pub fn generation_folder(base_model: BaseModel) -> &'static str {
    match base_model {
        BaseModel::Sd14 => "1.4",
        BaseModel::Sd15 => "1.5",
        BaseModel::Sd20 | BaseModel::Sd20_768 => "2.0",
        BaseModel::Sd21 | BaseModel::Sd21_768 | BaseModel::Sd21Unclip => "2.1",
        BaseModel::Sdxl09 => "xl_0.9",
        BaseModel::Sdxl10 => "xl",
        BaseModel::Other => LayoutConfig::FALLBACK_FOLDER,
    }
}

/// Folder for a model type; types without a dedicated folder go to `etc`.
pub fn type_folder(model_type: ModelType) -> &'static str {
    match model_type {
        ModelType::Checkpoint => "checkpoint",
        ModelType::Controlnet => "controlnet",
        ModelType::LoCon => "lycoris",
        ModelType::Lora => "lora",
        ModelType::TextualInversion => "embedding",
        ModelType::Vae => "vae",
        ModelType::Hypernetwork
        | ModelType::Poses
        | ModelType::AestheticGradient
        | ModelType::Other => LayoutConfig::FALLBACK_FOLDER,
    }
}

/// First model tag that names a LoRA category, capitalized.
pub fn lora_category_tag(model: &RemoteModel) -> Option<String> {
    model
        .tags
        .iter()
        .find(|tag| LORA_CATEGORY_TAGS.contains(&tag.as_str()))
        .map(|tag| capitalize(tag))
}

/// Per-job naming choices.
#[derive(Debug, Clone, Default)]
pub struct NamingOptions<'a> {
    /// Replaces the remote model name.
    pub name_override: Option<&'a str>,
    pub append_author_name: bool,
    pub prepend_lora_type: bool,
    pub nsfw: bool,
}

/// Sanitized names derived for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNames {
    /// Name of the model folder (never carries the NSFW marker).
    pub folder_name: String,
    /// Name used for artifacts, shortcuts and catalog display names.
    pub model_name: String,
    /// Sanitized version name, also the version folder name.
    pub version_name: String,
}

impl ModelNames {
    pub fn derive(model: &RemoteModel, version: &RemoteVersion, options: &NamingOptions<'_>) -> Self {
        let mut name = clean_name(options.name_override.unwrap_or(&model.name));

        if options.append_author_name {
            if let Some(username) = model.creator_username() {
                name = format!("{} ({})", name, username);
            }
        }

        if options.prepend_lora_type && model.model_type.is_lora_like() {
            if let Some(tag) = lora_category_tag(model) {
                name = format!("[{}] {}", tag, name);
            }
        }

        let model_name = if options.nsfw {
            format!("{} {}", LayoutConfig::NSFW_PREFIX, name)
        } else {
            name.clone()
        };

        Self {
            folder_name: name,
            model_name,
            version_name: clean_name(&version.name),
        }
    }
}

/// Paths of one model version on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLayout {
    pub model_dir: PathBuf,
    pub version_dir: PathBuf,
}

impl ModelLayout {
    pub fn new(
        output_root: &Path,
        model: &RemoteModel,
        version: &RemoteVersion,
        names: &ModelNames,
    ) -> Self {
        let model_dir = output_root
            .join(generation_folder(version.base_model))
            .join(type_folder(model.model_type))
            .join(&names.folder_name);
        let version_dir = model_dir.join(&names.version_name);
        Self {
            model_dir,
            version_dir,
        }
    }

    /// Raw metadata snapshot of the model.
    pub fn snapshot_path(&self) -> PathBuf {
        self.model_dir.join(LayoutConfig::SNAPSHOT_FILE_NAME)
    }

    /// Internet shortcut pointing at the model page.
    pub fn shortcut_path(&self, model_name: &str) -> PathBuf {
        self.model_dir
            .join(format!("{}.{}", model_name, LayoutConfig::SHORTCUT_EXTENSION))
    }

    /// Catalog fragment of this version.
    pub fn fragment_path(&self) -> PathBuf {
        self.version_dir.join(CatalogConfig::FRAGMENT_FILE_NAME)
    }

    /// Downloaded model config, if the version ships one.
    pub fn config_path(&self) -> PathBuf {
        self.version_dir.join(LayoutConfig::CONFIG_FILE_NAME)
    }

    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.version_dir.join(file_name)
    }
}

/// Fold `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root. Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = normalized.components().next_back();
                if matches!(last, Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Absolute, normalized form of `path`, so the same folder always yields
/// the same catalog paths however it was spelled.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| CivitError::io_with_path(e, path))?;
    Ok(normalize_path(&absolute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_library::types::Creator;

    fn model(model_type: ModelType, tags: &[&str]) -> RemoteModel {
        RemoteModel {
            id: 1,
            name: "Detail Tweaker v1.0".into(),
            model_type,
            creator: Some(Creator {
                username: Some("alice".into()),
            }),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            nsfw: false,
            versions: vec![],
        }
    }

    fn version() -> RemoteVersion {
        RemoteVersion {
            id: 2,
            name: "SDXL v2.0".into(),
            base_model: BaseModel::Sdxl10,
            trained_words: vec![],
            files: vec![],
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/tmp/x/sub/../lib/./xl")),
            PathBuf::from("/tmp/x/lib/xl")
        );
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("../a/../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("../../c")), PathBuf::from("../../c"));
    }

    #[test]
    fn test_resolve_path_is_absolute_and_clean() {
        let resolved = resolve_path(Path::new("sub/../lib")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("lib"));
        assert!(!resolved
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir)));
    }

    #[test]
    fn test_folder_maps() {
        assert_eq!(generation_folder(BaseModel::Sd21Unclip), "2.1");
        assert_eq!(generation_folder(BaseModel::Sdxl09), "xl_0.9");
        assert_eq!(generation_folder(BaseModel::Other), "etc");
        assert_eq!(type_folder(ModelType::LoCon), "lycoris");
        assert_eq!(type_folder(ModelType::TextualInversion), "embedding");
        assert_eq!(type_folder(ModelType::Hypernetwork), "etc");
    }

    #[test]
    fn test_lora_tag_uses_model_tag_order() {
        let m = model(ModelType::Lora, &["anime", "STYLE"]);
        assert_eq!(lora_category_tag(&m), None);
        let m = model(ModelType::Lora, &["anime", "STYLE", "character"]);
        assert_eq!(lora_category_tag(&m).as_deref(), Some("Character"));
        let m = model(ModelType::Lora, &["anime", "concept", "character"]);
        assert_eq!(lora_category_tag(&m).as_deref(), Some("Concept"));
    }

    #[test]
    fn test_derive_names_full() {
        let m = model(ModelType::Lora, &["tool", "concept"]);
        let names = ModelNames::derive(
            &m,
            &version(),
            &NamingOptions {
                name_override: None,
                append_author_name: true,
                prepend_lora_type: true,
                nsfw: true,
            },
        );
        assert_eq!(names.folder_name, "[Concept] Detail Tweaker v1_0 (alice)");
        assert_eq!(names.model_name, "NSFW [Concept] Detail Tweaker v1_0 (alice)");
        assert_eq!(names.version_name, "SDXL v2_0");
    }

    #[test]
    fn test_derive_names_override_and_flags_off() {
        let m = model(ModelType::Checkpoint, &["concept"]);
        let names = ModelNames::derive(
            &m,
            &version(),
            &NamingOptions {
                name_override: Some("My  Name!"),
                ..Default::default()
            },
        );
        assert_eq!(names.folder_name, "My Name");
        assert_eq!(names.model_name, "My Name");
    }

    #[test]
    fn test_layout_paths() {
        let m = model(ModelType::Checkpoint, &[]);
        let names = ModelNames {
            folder_name: "Juggernaut".into(),
            model_name: "NSFW Juggernaut".into(),
            version_name: "v9".into(),
        };
        let layout = ModelLayout::new(Path::new("/lib"), &m, &version(), &names);
        assert_eq!(layout.model_dir, PathBuf::from("/lib/xl/checkpoint/Juggernaut"));
        assert_eq!(layout.version_dir, PathBuf::from("/lib/xl/checkpoint/Juggernaut/v9"));
        assert_eq!(layout.snapshot_path(), PathBuf::from("/lib/xl/checkpoint/Juggernaut/model.json"));
        assert_eq!(
            layout.shortcut_path(&names.model_name),
            PathBuf::from("/lib/xl/checkpoint/Juggernaut/NSFW Juggernaut.url")
        );
        assert_eq!(layout.fragment_path(), PathBuf::from("/lib/xl/checkpoint/Juggernaut/v9/invokeImport.yml"));
        assert_eq!(layout.config_path(), PathBuf::from("/lib/xl/checkpoint/Juggernaut/v9/config.yml"));
    }
}
