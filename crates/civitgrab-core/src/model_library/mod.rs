//! Model acquisition: from a user-supplied reference to files on disk.
//!
//! This module provides:
//! - Reference parsing and name sanitizing
//! - Version and file selection
//! - Folder layout and artifact naming
//! - Downloads with bounded retries
//! - The per-job pipeline, batches and deletion

mod artifact;
mod batch;
mod delete;
mod download;
mod grab;
mod hashing;
mod identifier;
mod layout;
mod naming;
mod selection;
mod types;

pub use artifact::{ArtifactNamer, NameStyle};
pub use batch::{
    is_batch_file, load_jobs, parse_job_records, run_batch, BatchReport, JobOutcome, JobRecord,
};
pub use delete::{delete_model, find_model_folder, DeleteReport};
pub use download::{part_path, DownloadOutcome, Downloader};
pub use grab::{FileReport, FragmentStatus, GrabJob, GrabReport, Grabber};
pub use hashing::{compute_sha256, compute_sha256_async, verify_sha256};
pub use identifier::{parse_reference, ModelReference};
pub use layout::{
    generation_folder, lora_category_tag, normalize_path, resolve_path, type_folder, ModelLayout,
    ModelNames, NamingOptions,
};
pub use naming::{capitalize, clean_name, clean_string, shrink_whitespace, trim_length};
pub use selection::{checkpoint_worth, select, select_rejected_files, select_version, SelectionResult};
pub use types::{
    BaseModel, Completeness, Creator, FileFormat, FileHashes, FileMetadata, FilePurpose,
    ModelType, Precision, RemoteFile, RemoteModel, RemoteVersion,
};
