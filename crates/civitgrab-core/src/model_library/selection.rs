//! Version and file selection.
//!
//! A job either names its version explicitly or gets the version built for
//! the default generation. Within a checkpoint version, duplicate weight
//! files (fp16/fp32, pruned/full, pickle/safetensors) are ranked by a worth
//! score and only the best one is kept.

use super::types::{
    BaseModel, Completeness, FileFormat, FilePurpose, ModelType, RemoteFile, RemoteModel,
    RemoteVersion,
};
use crate::error::{CivitError, Result};
use std::collections::BTreeSet;
use tracing::info;

/// Outcome of version and file selection for one job.
#[derive(Debug, Clone)]
pub struct SelectionResult<'a> {
    pub version: &'a RemoteVersion,
    /// Files to materialize, in the order the service listed them.
    pub kept_files: Vec<&'a RemoteFile>,
    /// Ids of duplicate weight files that lost the worth ranking.
    pub rejected_file_ids: BTreeSet<u64>,
}

impl<'a> SelectionResult<'a> {
    pub fn rejected_files(&self) -> impl Iterator<Item = &'a RemoteFile> + '_ {
        self.version
            .files
            .iter()
            .filter(move |file| self.rejected_file_ids.contains(&file.id))
    }
}

/// Pick the version to materialize.
///
/// 1. An explicit `version_id` must exist on the model.
/// 2. Otherwise the first version whose base model is `generation` wins.
///
/// When the default-generation version is not the newest version overall, an
/// informational line is logged; the default-generation version is still used.
pub fn select_version<'a>(
    model: &'a RemoteModel,
    version_id: Option<u64>,
    generation: BaseModel,
) -> Result<&'a RemoteVersion> {
    if let Some(version_id) = version_id {
        return model
            .versions
            .iter()
            .find(|version| version.id == version_id)
            .ok_or(CivitError::VersionNotFound {
                model_id: model.id,
                version_id,
            });
    }

    let selected = model
        .versions
        .iter()
        .find(|version| version.base_model == generation)
        .ok_or_else(|| CivitError::NoDefaultGenerationVersion {
            model_id: model.id,
            generation: generation.to_string(),
        })?;

    if let Some(latest) = model.latest_version() {
        if latest.id != selected.id {
            info!(
                "- latest version is {} ({}), but {} version is {} ({})",
                latest.name, latest.id, generation, selected.name, selected.id
            );
        }
    }

    Ok(selected)
}

/// Heuristic rank of a checkpoint file.
///
/// SafeTensor adds 100, a full (unpruned) file adds 1000, a known precision
/// adds its bit width plus 1 for brain-float. Format and completeness
/// therefore always dominate precision.
pub fn checkpoint_worth(file: &RemoteFile) -> u32 {
    let mut worth = 0;
    if file.format() == FileFormat::SafeTensor {
        worth += 100;
    }
    if file.completeness() == Some(Completeness::Full) {
        worth += 1000;
    }
    if let Some(precision) = file.precision() {
        worth += precision.bits();
        if precision.is_brain_float() {
            worth += 1;
        }
    }
    worth
}

/// Ids of duplicate checkpoint weight files that should not be downloaded.
///
/// Only checkpoints are culled, and only among `Model`-purpose files. VAE and
/// config files are never rejected. Equal worth keeps the first listed file.
pub fn select_rejected_files(model_type: ModelType, version: &RemoteVersion) -> Result<BTreeSet<u64>> {
    if model_type != ModelType::Checkpoint {
        return Ok(BTreeSet::new());
    }

    let mut candidates: Vec<&RemoteFile> = version
        .files
        .iter()
        .filter(|file| file.purpose == FilePurpose::Model)
        .collect();

    if candidates.is_empty() {
        return Err(CivitError::NoCheckpointFiles {
            version_id: version.id,
        });
    }
    if candidates.len() == 1 {
        return Ok(BTreeSet::new());
    }

    // Stable sort: ties keep source order.
    candidates.sort_by(|a, b| checkpoint_worth(b).cmp(&checkpoint_worth(a)));

    Ok(candidates.iter().skip(1).map(|file| file.id).collect())
}

/// Run version and file selection for a model.
pub fn select<'a>(
    model: &'a RemoteModel,
    version_id: Option<u64>,
    generation: BaseModel,
) -> Result<SelectionResult<'a>> {
    let version = select_version(model, version_id, generation)?;
    let rejected_file_ids = select_rejected_files(model.model_type, version)?;
    let kept_files = version
        .files
        .iter()
        .filter(|file| !rejected_file_ids.contains(&file.id))
        .collect();

    Ok(SelectionResult {
        version,
        kept_files,
        rejected_file_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_library::types::{FileHashes, FileMetadata, Precision};

    fn file(id: u64, purpose: FilePurpose, format: FileFormat, fp: Option<&str>, size: Option<Completeness>) -> RemoteFile {
        RemoteFile {
            id,
            name: format!("file{id}.safetensors"),
            download_url: format!("https://example.com/{id}"),
            size_kb: 1.0,
            purpose,
            metadata: FileMetadata {
                format,
                precision: fp.map(|p| Precision::from(p.to_string())),
                completeness: size,
            },
            hashes: FileHashes::default(),
        }
    }

    fn version(id: u64, base_model: BaseModel, files: Vec<RemoteFile>) -> RemoteVersion {
        RemoteVersion {
            id,
            name: format!("v{id}"),
            base_model,
            trained_words: vec![],
            files,
        }
    }

    fn model(model_type: ModelType, versions: Vec<RemoteVersion>) -> RemoteModel {
        RemoteModel {
            id: 1,
            name: "Model".into(),
            model_type,
            creator: None,
            tags: vec![],
            nsfw: false,
            versions,
        }
    }

    #[test]
    fn test_worth_format_and_completeness_dominate() {
        let good = file(1, FilePurpose::Model, FileFormat::SafeTensor, Some("fp16"), Some(Completeness::Full));
        let bad = file(2, FilePurpose::Model, FileFormat::Other, Some("fp32"), Some(Completeness::Pruned));
        assert_eq!(checkpoint_worth(&good), 1116);
        assert_eq!(checkpoint_worth(&bad), 32);
    }

    #[test]
    fn test_worth_brain_float_bonus() {
        let bf = file(1, FilePurpose::Model, FileFormat::SafeTensor, Some("bf16"), None);
        let fp = file(2, FilePurpose::Model, FileFormat::SafeTensor, Some("fp16"), None);
        assert_eq!(checkpoint_worth(&bf), 117);
        assert_eq!(checkpoint_worth(&fp), 116);
    }

    #[test]
    fn test_select_explicit_version() {
        let m = model(
            ModelType::Lora,
            vec![version(10, BaseModel::Sdxl10, vec![]), version(11, BaseModel::Sd15, vec![])],
        );
        assert_eq!(select_version(&m, Some(11), BaseModel::Sdxl10).unwrap().id, 11);

        let err = select_version(&m, Some(99), BaseModel::Sdxl10).unwrap_err();
        assert!(matches!(err, CivitError::VersionNotFound { version_id: 99, .. }));
    }

    #[test]
    fn test_select_default_generation_over_latest() {
        let m = model(
            ModelType::Lora,
            vec![
                version(12, BaseModel::Sd15, vec![]),
                version(11, BaseModel::Sdxl10, vec![]),
                version(10, BaseModel::Sdxl10, vec![]),
            ],
        );
        assert_eq!(select_version(&m, None, BaseModel::Sdxl10).unwrap().id, 11);
    }

    #[test]
    fn test_select_no_default_generation() {
        let m = model(ModelType::Lora, vec![version(12, BaseModel::Sd15, vec![])]);
        let err = select_version(&m, None, BaseModel::Sdxl10).unwrap_err();
        assert!(matches!(err, CivitError::NoDefaultGenerationVersion { .. }));
    }

    #[test]
    fn test_full_beats_pruned() {
        let v = version(
            1,
            BaseModel::Sdxl10,
            vec![
                file(1, FilePurpose::Model, FileFormat::SafeTensor, Some("fp16"), Some(Completeness::Pruned)),
                file(2, FilePurpose::Model, FileFormat::SafeTensor, Some("fp16"), Some(Completeness::Full)),
                file(3, FilePurpose::Vae, FileFormat::SafeTensor, None, None),
                file(4, FilePurpose::Config, FileFormat::Other, None, None),
            ],
        );
        let m = model(ModelType::Checkpoint, vec![v]);
        let selection = select(&m, None, BaseModel::Sdxl10).unwrap();

        assert_eq!(selection.rejected_file_ids, BTreeSet::from([1]));
        let kept: Vec<u64> = selection.kept_files.iter().map(|f| f.id).collect();
        assert_eq!(kept, vec![2, 3, 4]);
        assert_eq!(selection.rejected_files().map(|f| f.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_single_model_file_never_rejected() {
        let v = version(
            1,
            BaseModel::Sdxl10,
            vec![file(1, FilePurpose::Model, FileFormat::PickleTensor, None, Some(Completeness::Pruned))],
        );
        let m = model(ModelType::Checkpoint, vec![v]);
        let selection = select(&m, None, BaseModel::Sdxl10).unwrap();
        assert!(selection.rejected_file_ids.is_empty());
        assert_eq!(selection.kept_files.len(), 1);
    }

    #[test]
    fn test_equal_worth_keeps_first_listed() {
        let v = version(
            1,
            BaseModel::Sdxl10,
            vec![
                file(7, FilePurpose::Model, FileFormat::SafeTensor, Some("fp16"), None),
                file(5, FilePurpose::Model, FileFormat::SafeTensor, Some("fp16"), None),
            ],
        );
        let rejected = select_rejected_files(ModelType::Checkpoint, &v).unwrap();
        assert_eq!(rejected, BTreeSet::from([5]));
    }

    #[test]
    fn test_non_checkpoint_keeps_everything() {
        let v = version(
            1,
            BaseModel::Sdxl10,
            vec![
                file(1, FilePurpose::Model, FileFormat::SafeTensor, Some("fp16"), None),
                file(2, FilePurpose::Model, FileFormat::PickleTensor, Some("fp32"), None),
            ],
        );
        assert!(select_rejected_files(ModelType::Lora, &v).unwrap().is_empty());
    }

    #[test]
    fn test_checkpoint_without_model_files_fails() {
        let v = version(3, BaseModel::Sdxl10, vec![file(1, FilePurpose::Vae, FileFormat::SafeTensor, None, None)]);
        let err = select_rejected_files(ModelType::Checkpoint, &v).unwrap_err();
        assert!(matches!(err, CivitError::NoCheckpointFiles { version_id: 3 }));
    }
}
