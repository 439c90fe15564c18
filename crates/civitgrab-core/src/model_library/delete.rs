//! Removing a downloaded model and its catalog entries.

use super::identifier::parse_reference;
use super::layout::{normalize_path, resolve_path};
use crate::catalog::{read_catalog, write_catalog};
use crate::config::LayoutConfig;
use crate::error::{CivitError, Result};
use crate::metadata::read_snapshot_id;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub model_id: u64,
    pub model_dir: PathBuf,
    /// Catalog keys that pointed into the removed folder.
    pub removed_entries: Vec<String>,
    pub catalog_written: bool,
}

/// Find the model folder whose snapshot carries `model_id`.
///
/// Model folders sit at `<root>/<generation>/<type>/<model>`. Snapshots
/// that cannot be read are skipped with a warning.
pub fn find_model_folder(root: &Path, model_id: u64) -> Result<PathBuf> {
    let snapshots = WalkDir::new(root)
        .min_depth(4)
        .max_depth(4)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file() && entry.file_name() == LayoutConfig::SNAPSHOT_FILE_NAME
        });

    for snapshot in snapshots {
        match read_snapshot_id(snapshot.path()) {
            Ok(Some(id)) if id == model_id => {
                if let Some(parent) = snapshot.path().parent() {
                    return Ok(parent.to_path_buf());
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping {}: {}", snapshot.path().display(), e),
        }
    }

    Err(CivitError::ModelNotFound { model_id })
}

/// Delete the model referenced by `input` below `root`.
///
/// With a `catalog` path, entries whose artifact lives in a version folder
/// of the removed model are dropped as well; the catalog is only rewritten
/// when at least one entry went away. A missing catalog fails the call
/// before anything is deleted.
pub fn delete_model(input: &str, root: &Path, catalog: Option<&Path>) -> Result<DeleteReport> {
    let reference = parse_reference(input)?;

    if let Some(catalog) = catalog {
        if !catalog.is_file() {
            return Err(CivitError::CatalogMissing(catalog.to_path_buf()));
        }
    }

    let root = resolve_path(root)?;
    let model_dir = find_model_folder(&root, reference.id)?;
    info!("Deleting model {} at {}", reference.id, model_dir.display());

    std::fs::remove_dir_all(&model_dir).map_err(|e| CivitError::io_with_path(e, &model_dir))?;
    info!("Deleted");

    let mut report = DeleteReport {
        model_id: reference.id,
        model_dir,
        removed_entries: Vec::new(),
        catalog_written: false,
    };

    let Some(catalog_path) = catalog else {
        return Ok(report);
    };

    let mut entries = read_catalog(catalog_path)?;
    entries.retain(|key, entry| {
        let Some(path) = entry.path() else {
            return true;
        };
        let artifact = normalize_path(Path::new(path));
        let owner = artifact.parent().and_then(Path::parent);
        if owner == Some(report.model_dir.as_path()) {
            info!("Removing \u{201c}{}\u{201d} from {}", key, catalog_path.display());
            report.removed_entries.push(key.to_string());
            return false;
        }
        true
    });

    if !report.removed_entries.is_empty() {
        info!("Removed {} entries", report.removed_entries.len());
        info!("Saving to {}", catalog_path.display());
        write_catalog(catalog_path, &entries)?;
        report.catalog_written = true;
    }

    Ok(report)
}
