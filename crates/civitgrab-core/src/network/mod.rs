//! Network access: the remote source seam, its HTTP implementation and
//! bounded retries.

mod client;
mod retry;
mod source;

pub use client::CivitClient;
pub use retry::{retry_async, FailedAttempt, RetryConfig, RetryStats};
pub use source::{FetchedModel, ModelSource};
