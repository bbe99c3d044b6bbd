//! On-disk state for `cvs-svn-export`.
//!
//! Every pass reads and writes artifacts inside a single scratch directory.
//! Record stores are flat files addressed by dense integer ids through a
//! sidecar offset index; small whole-value databases are single bincode
//! blobs; the sortable record streams are plain text files. Writers stage
//! into a temporary file and rename into place, so a crashed pass never
//! leaves a half-written artifact behind.

use std::path::{Path, PathBuf};

mod artifact;
pub use artifact::{Artifact, ArtifactManager};

mod db;
pub use db::{read_db, write_db};

mod error;
pub use error::Error;

mod lock;
pub use lock::Lock;

mod record;
pub use record::{StoreReader, StoreWriter};

mod text;
pub use text::{sort_lines, LineReader, LineWriter};

/// The scratch directory all artifacts live in.
#[derive(Debug, Clone)]
pub struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.filename())
    }

    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).exists()
    }

    pub fn remove(&self, artifact: Artifact) -> Result<(), Error> {
        let path = self.path(artifact);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let index = record::index_path(&path);
        if index.exists() {
            std::fs::remove_file(&index)?;
        }

        Ok(())
    }

    /// Takes the directory lock guarding against concurrent runs sharing
    /// this scratch area.
    pub fn lock(&self) -> Result<Lock, Error> {
        Lock::acquire(&self.dir)
    }
}
