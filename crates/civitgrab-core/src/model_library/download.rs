//! Materializing selected files on disk.
//!
//! A file that already exists at its target path is never fetched again.
//! Everything else streams into `<target>.part` under the retry policy and
//! is renamed onto the target only after the stream (and the optional hash
//! check) completed, so the existence check never sees partial output.

use super::hashing::verify_sha256;
use super::types::RemoteFile;
use crate::config::NetworkConfig;
use crate::error::{CivitError, Result};
use crate::network::{retry_async, FailedAttempt, ModelSource, RetryConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Target already existed; nothing was fetched.
    AlreadyExists,
    /// File was streamed to disk.
    Downloaded { bytes: u64, attempts: u32 },
}

impl DownloadOutcome {
    pub fn was_downloaded(&self) -> bool {
        matches!(self, DownloadOutcome::Downloaded { .. })
    }
}

/// Temp path a download streams into before it is renamed onto `target`.
pub fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(NetworkConfig::DOWNLOAD_TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Streams files from a [`ModelSource`] with bounded retries.
pub struct Downloader<'a, S: ModelSource + ?Sized> {
    source: &'a S,
    retry: RetryConfig,
    verify_hashes: bool,
}

impl<'a, S: ModelSource + ?Sized> Downloader<'a, S> {
    pub fn new(source: &'a S, retry: RetryConfig) -> Self {
        Self {
            source,
            retry,
            verify_hashes: false,
        }
    }

    /// Check downloads against the published SHA256, when there is one.
    pub fn with_hash_verification(mut self, enabled: bool) -> Self {
        self.verify_hashes = enabled;
        self
    }

    /// Make sure `file` exists at `target`.
    ///
    /// Every failed attempt logs the attempt counter and removes the partial
    /// output. When the budget is spent the last error is returned and no
    /// partial output is left behind.
    pub async fn materialize(
        &self,
        file: &RemoteFile,
        file_name: &str,
        target: &Path,
    ) -> Result<DownloadOutcome> {
        if tokio::fs::try_exists(target)
            .await
            .map_err(|e| CivitError::io_with_path(e, target))?
        {
            info!("- skip {} (already exists)", file_name);
            return Ok(DownloadOutcome::AlreadyExists);
        }

        info!(
            "- down {} from {} ({} mb)",
            file_name,
            file.download_url,
            (file.size_kb / 1000.0).floor() as u64
        );

        let part = part_path(target);
        let expected_sha256 = if self.verify_hashes {
            file.hashes.sha256.as_deref()
        } else {
            None
        };

        let (result, stats) = retry_async(
            &self.retry,
            |attempt| {
                let part = part.clone();
                async move {
                    debug!("Download attempt {} for {}", attempt, file.download_url);
                    let bytes = self.source.download(&file.download_url, &part).await?;
                    if let Some(expected) = expected_sha256 {
                        verify_sha256(&part, expected).await?;
                    }
                    Ok::<u64, CivitError>(bytes)
                }
            },
            |failed: FailedAttempt, err: &CivitError| {
                warn!(
                    "- fail {} ({}/{}): {}",
                    file_name, failed.attempt, failed.remaining, err
                );
                let part = part.clone();
                async move {
                    remove_partial(&part).await;
                }
            },
        )
        .await;

        let bytes = result?;

        tokio::fs::rename(&part, target).await.map_err(|e| {
            CivitError::Io {
                message: format!("Failed to move download to {}: {}", target.display(), e),
                path: Some(target.to_path_buf()),
                source: Some(e),
            }
        })?;

        Ok(DownloadOutcome::Downloaded {
            bytes,
            attempts: stats.attempts,
        })
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial download {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {}: {}", path.display(), e),
    }
}
