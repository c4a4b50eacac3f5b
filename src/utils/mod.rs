//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{calculate_checksum, read_file_content};
pub use retry::{Retryable, RetryConfig, with_retry};
pub use text::{has_meaningful_content, truncate_snippet};
