use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("scratch directory is locked by another run: {0}")]
    Locked(PathBuf),

    #[error("artifact {artifact} required by pass {pass} is missing; re-run the producing pass")]
    MissingArtifact { artifact: &'static str, pass: String },

    #[error("no record {id} in store {path}")]
    MissingRecord { id: u32, path: PathBuf },

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}
