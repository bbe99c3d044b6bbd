use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed digest: {0}")]
    MalformedDigest(String),

    #[error("malformed revision record line: {0}")]
    MalformedRecord(String),

    #[error("malformed symboling line: {0}")]
    MalformedSymboling(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
