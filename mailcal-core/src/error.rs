//! Error types for mailcal.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can stop a mailcal run.
///
/// Problems with individual mails or events are not errors: they are logged
/// and the offending unit is skipped.
#[derive(Error, Debug)]
pub enum MailCalError {
    #[error("Mailbox not found or not a directory: {}", .0.display())]
    MailboxNotFound(PathBuf),

    #[error("Corrupt date index at line {line}: {content:?}")]
    CorruptIndex { line: usize, content: String },

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for mailcal operations.
pub type MailCalResult<T> = Result<T, MailCalError>;
