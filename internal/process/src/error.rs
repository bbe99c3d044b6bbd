use std::{io, process::ExitStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("svnadmin load exited with {0}")]
    Exit(ExitStatus),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("preflight failed: {0}")]
    Preflight(crate::preflight::Error),

    #[error("error spawning svnadmin load: {0:?}")]
    Spawn(io::Error),

    #[error("cannot establish an input pipe to svnadmin load")]
    StdinPipe,
}
