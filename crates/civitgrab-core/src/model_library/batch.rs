//! Sequential batches of grab jobs.
//!
//! A batch is either a single reference or a YAML list of job records. Jobs
//! run strictly one after another and a failing job never stops the batch;
//! its error is captured in the [`BatchReport`].

use super::grab::{GrabJob, GrabReport, Grabber};
use crate::error::{CivitError, ErrorKind, Result};
use crate::network::ModelSource;
use serde::Deserialize;
use std::path::Path;
use tracing::{error, info};

/// One entry of a batch file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "versionId")]
    pub version: Option<u64>,
    #[serde(default)]
    pub nsfw: bool,
}

impl From<JobRecord> for GrabJob {
    fn from(record: JobRecord) -> Self {
        GrabJob {
            input: record.url,
            version_id: record.version,
            name: record.name,
            nsfw: record.nsfw,
        }
    }
}

/// Whether `input` names a batch file rather than a model reference.
pub fn is_batch_file(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    lower.ends_with(".yml") || lower.ends_with(".yaml")
}

/// Parse the records of a batch file.
pub fn parse_job_records(text: &str) -> Result<Vec<JobRecord>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(text).map_err(|e| CivitError::Yaml {
        message: format!("Invalid batch file: {}", e),
        source: Some(e),
    })
}

/// Expand user input into jobs.
///
/// A batch file yields one job per record, each carrying only the record's
/// own overrides. Any other input is a single job built from `single`.
pub async fn load_jobs(single: GrabJob) -> Result<Vec<GrabJob>> {
    if !is_batch_file(&single.input) {
        return Ok(vec![single]);
    }

    let path = Path::new(&single.input);
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CivitError::io_with_path(e, path))?;
    Ok(parse_job_records(&text)?
        .into_iter()
        .map(GrabJob::from)
        .collect())
}

/// Result of one job of a batch.
#[derive(Debug)]
pub struct JobOutcome {
    pub job: GrabJob,
    pub result: Result<GrabReport>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(CivitError::kind)
    }
}

/// Outcomes of every job of a batch, in job order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Run every job in order, isolating failures.
pub async fn run_batch<S: ModelSource>(grabber: &Grabber<S>, jobs: Vec<GrabJob>) -> BatchReport {
    let total = jobs.len();
    let mut report = BatchReport::default();

    for (index, job) in jobs.into_iter().enumerate() {
        let time = chrono::Local::now().format("%H:%M:%S");
        info!("[{}] Job {}/{}: {}", time, index + 1, total, job.input);

        let result = grabber.grab(&job).await;
        if let Err(e) = &result {
            error!("Job failed ({}): {:?}", e.kind(), job);
            error!("{}", e);
        }
        report.outcomes.push(JobOutcome { job, result });
    }

    if total > 1 {
        info!(
            "Finished {} jobs: {} succeeded, {} failed",
            total,
            report.succeeded(),
            report.failed()
        );
    }
    report
}
