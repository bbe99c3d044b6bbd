use thiserror::Error;

/// Mirror contract violations are programming errors in the caller; they
/// abort the run rather than being recovered from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("path already exists: {0}")]
    PathExists(String),

    #[error("parent directory missing for {0}")]
    ParentMissing(String),

    #[error("expected a directory at {0}")]
    ExpectedDirectory(String),

    #[error("no such path: {0}")]
    PathMissing(String),

    #[error("mirror operation outside start_commit/end_commit")]
    NoCommit,

    #[error("delegate error: {0}")]
    Delegate(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Store(#[from] cvs_svn_export_store::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn delegate(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Delegate(source.into())
    }
}
