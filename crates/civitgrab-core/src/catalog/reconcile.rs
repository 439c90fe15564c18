//! Merging fragments into the master catalog.
//!
//! Fragments found under a root folder are merged into one mapping (later
//! fragments win on key collisions, walk order sorted by file name), then
//! diffed against the master catalog. The master file is only rewritten
//! when something was added or changed, so its modification time tells
//! when the catalog last really changed.

use super::codec::{read_catalog, write_catalog};
use super::entry::Catalog;
use crate::config::CatalogConfig;
use crate::error::{CivitError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Keys that were not in the master catalog.
    pub added: Vec<String>,
    /// Keys whose entry differed from the master catalog.
    pub updated: Vec<String>,
    /// Keys present in both with equal entries.
    pub unchanged: usize,
    /// Whether the master file was rewritten.
    pub written: bool,
}

impl ReconcileReport {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }
}

/// Apply `fragments` to `master` in place.
///
/// Existing keys keep their position, new keys are appended in fragment
/// order. Entries only in `master` are left alone. The returned report has
/// `written` unset.
pub fn merge_fragments(master: &mut Catalog, fragments: Catalog) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut additions = Vec::new();

    for (key, entry) in fragments.iter() {
        match master.get(key) {
            None => additions.push((key.to_string(), entry.clone())),
            Some(existing) if existing == entry => report.unchanged += 1,
            Some(_) => {
                info!("Update: {}", key);
                report.updated.push(key.to_string());
            }
        }
    }

    for key in &report.updated {
        if let Some(entry) = fragments.get(key) {
            master.insert(key.clone(), entry.clone());
        }
    }

    for (key, entry) in additions {
        info!("New:    {}", entry.path().unwrap_or(&key));
        report.added.push(key.clone());
        master.insert(key, entry);
    }

    report
}

/// Reconciles the fragments under a root folder into a master file.
#[derive(Debug, Clone)]
pub struct Reconciler {
    root: PathBuf,
    target: PathBuf,
}

impl Reconciler {
    pub fn new(root: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            target: target.into(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Fragment files under the root, in walk order.
    pub fn discover_fragments(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let message = e.to_string();
                let path = e.path().map(Path::to_path_buf);
                CivitError::Io {
                    message,
                    path,
                    source: e.into_io_error(),
                }
            })?;
            if entry.file_type().is_file()
                && entry.file_name() == CatalogConfig::FRAGMENT_FILE_NAME
            {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }

    /// Merge every fragment under the root, last one winning.
    pub fn collect_fragments(&self) -> Result<Catalog> {
        let mut merged = Catalog::new();
        for path in self.discover_fragments()? {
            debug!("Reading fragment {}", path.display());
            merged.merge(read_catalog(&path)?);
        }
        Ok(merged)
    }

    /// Run the reconciliation.
    ///
    /// Fails with [`CivitError::CatalogMissing`] before touching anything
    /// when the master file does not exist.
    pub fn run(&self) -> Result<ReconcileReport> {
        if !self.target.is_file() {
            return Err(CivitError::CatalogMissing(self.target.clone()));
        }

        let mut master = read_catalog(&self.target)?;
        let fragments = self.collect_fragments()?;
        let mut report = merge_fragments(&mut master, fragments);

        info!("New entries: {}", report.added.len());
        info!("Updated entries: {}", report.updated.len());

        if report.has_changes() {
            info!("Writing {}", self.target.display());
            write_catalog(&self.target, &master)?;
            report.written = true;
        }

        Ok(report)
    }
}
