//! The grab pipeline for a single job.
//!
//! parse reference -> fetch metadata -> select version and files -> name ->
//! write snapshot and shortcut -> download -> write catalog fragment.

use super::artifact::ArtifactNamer;
use super::download::{DownloadOutcome, Downloader};
use super::identifier::parse_reference;
use super::layout::{resolve_path, ModelLayout, ModelNames, NamingOptions};
use super::selection::select;
use super::types::BaseModel;
use crate::catalog::{write_catalog, Fragment, FragmentBuilder};
use crate::config::{CatalogConfig, GrabOptions};
use crate::error::{CivitError, Result};
use crate::metadata::{write_shortcut_if_missing, write_snapshot};
use crate::network::ModelSource;
use std::path::PathBuf;
use tracing::info;

/// One model to grab, with per-job overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrabJob {
    /// Model reference as typed by the user.
    pub input: String,
    /// Overrides a version parsed from `input`.
    pub version_id: Option<u64>,
    /// Overrides the remote model name.
    pub name: Option<String>,
    pub nsfw: bool,
}

impl GrabJob {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }
}

/// A file of the selected version that was kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file_id: u64,
    pub file_name: String,
    pub path: PathBuf,
    pub outcome: DownloadOutcome,
}

/// What happened to the catalog fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentStatus {
    Written(PathBuf),
    /// Nothing new was downloaded and a fragment already exists.
    Kept(PathBuf),
    /// The model type cannot be imported downstream.
    UnsupportedType,
    /// No primary weights file was kept.
    NoMainFile,
}

/// Outcome of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabReport {
    pub model_id: u64,
    pub version_id: u64,
    pub model_name: String,
    pub version_dir: PathBuf,
    pub files: Vec<FileReport>,
    /// File names of duplicate checkpoints that were not downloaded.
    pub rejected_files: Vec<String>,
    pub fragment: FragmentStatus,
}

impl GrabReport {
    pub fn downloaded_count(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.outcome.was_downloaded())
            .count()
    }
}

/// Runs grab jobs against a [`ModelSource`].
pub struct Grabber<S: ModelSource> {
    source: S,
    options: GrabOptions,
}

impl<S: ModelSource> Grabber<S> {
    pub fn new(source: S, options: GrabOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &GrabOptions {
        &self.options
    }

    /// Run one job to completion.
    ///
    /// Files written before a failure (snapshot, shortcut, earlier
    /// artifacts) stay on disk; only the failing download is cleaned up.
    pub async fn grab(&self, job: &GrabJob) -> Result<GrabReport> {
        let reference = parse_reference(&job.input)?.with_version(job.version_id);
        let fetched = self.source.fetch_model(reference.id).await?;
        let model = &fetched.model;

        let selection = select(model, reference.version_id, BaseModel::DEFAULT_GENERATION)?;
        let version = selection.version;

        let names = ModelNames::derive(
            model,
            version,
            &NamingOptions {
                name_override: job.name.as_deref(),
                append_author_name: self.options.append_author_name,
                prepend_lora_type: self.options.prepend_lora_type,
                nsfw: job.nsfw,
            },
        );
        info!("Model: {} ({})", names.model_name, model.id);
        info!("Version: {} ({})", names.version_name, version.id);

        let output_root = resolve_path(&self.options.output_root)?;
        let layout = ModelLayout::new(&output_root, model, version, &names);
        let model_url = self.options.model_url(reference.id);

        write_snapshot(&layout.snapshot_path(), &fetched.raw)?;
        write_shortcut_if_missing(&layout.shortcut_path(&names.model_name), &model_url)?;
        tokio::fs::create_dir_all(&layout.version_dir)
            .await
            .map_err(|e| CivitError::io_with_path(e, &layout.version_dir))?;

        let namer = ArtifactNamer::new(model.model_type, &names.model_name, &names.version_name);

        let rejected_files: Vec<String> = selection
            .rejected_files()
            .map(|file| namer.file_name(file))
            .collect();
        if !rejected_files.is_empty() {
            info!("- ignoring checkpoints: {}", rejected_files.join(", "));
            for file_name in &rejected_files {
                info!("- skip {} (not needed)", file_name);
            }
        }

        let downloader = Downloader::new(&self.source, self.options.retry.clone())
            .with_hash_verification(self.options.verify_hashes);
        let mut files = Vec::with_capacity(selection.kept_files.len());
        for file in &selection.kept_files {
            let file_name = namer.file_name(file);
            let path = layout.artifact_path(&file_name);
            let outcome = downloader.materialize(file, &file_name, &path).await?;
            files.push(FileReport {
                file_id: file.id,
                file_name,
                path,
                outcome,
            });
        }

        let mut report = GrabReport {
            model_id: model.id,
            version_id: version.id,
            model_name: names.model_name.clone(),
            version_dir: layout.version_dir.clone(),
            files,
            rejected_files,
            fragment: FragmentStatus::NoMainFile,
        };

        let fragment_path = layout.fragment_path();
        let fragment_exists = tokio::fs::try_exists(&fragment_path)
            .await
            .map_err(|e| CivitError::io_with_path(e, &fragment_path))?;
        let needs_fragment =
            self.options.force_catalog || report.downloaded_count() > 0 || !fragment_exists;
        if !needs_fragment {
            report.fragment = FragmentStatus::Kept(fragment_path);
            return Ok(report);
        }

        let builder = FragmentBuilder {
            model,
            version,
            kept_files: &selection.kept_files,
            namer: &namer,
            version_dir: &layout.version_dir,
            model_url: &model_url,
        };
        report.fragment = match builder.build().await? {
            Fragment::Built(catalog) => {
                info!("- save {}", CatalogConfig::FRAGMENT_FILE_NAME);
                write_catalog(&fragment_path, &catalog)?;
                FragmentStatus::Written(fragment_path)
            }
            Fragment::UnsupportedType(model_type) => {
                info!(
                    "Can't create {} for model type {}",
                    CatalogConfig::FRAGMENT_FILE_NAME,
                    model_type
                );
                FragmentStatus::UnsupportedType
            }
            Fragment::NoMainFile => {
                info!(
                    "No main file found, skipping {} creation",
                    CatalogConfig::FRAGMENT_FILE_NAME
                );
                FragmentStatus::NoMainFile
            }
        };

        Ok(report)
    }
}
