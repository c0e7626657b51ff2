use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("File operation failed")]
    FileOperationFailed(#[from] std::io::Error),
    #[error("Restore batch was already executed")]
    RestoreAlreadyStarted,
    #[error("Restore events closed before completion")]
    RestoreIncomplete,
    #[error("No enabled trash root could be resolved")]
    TrashRootResolutionFailed,
}

/// Outcome code for a single restored entry. Every failure is terminal for
/// its entry only; the batch keeps advancing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum RestoreError {
    #[error("file operation was aborted")]
    Aborted,
    #[error("file operation failed: {0:?}")]
    Io(std::io::ErrorKind),
    #[error("path is not part of an enabled trash folder")]
    InvalidOperation,
    #[error("metadata location is not a valid trash entry")]
    InvalidUrl,
    #[error("trashed content does not exist")]
    NotFound,
}
