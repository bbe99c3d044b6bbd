use std::path::{Path, PathBuf};

use crate::Error;

/// A directory-based lock. Creation is atomic on every platform we care
/// about, so whichever run creates the directory owns the scratch area; the
/// lock is released on drop.
#[derive(Debug)]
pub struct Lock {
    path: PathBuf,
}

impl Lock {
    pub(crate) fn acquire(scratch_dir: &Path) -> Result<Self, Error> {
        let path = scratch_dir.join(".lock");

        match std::fs::create_dir(&path) {
            Ok(()) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::Locked(path)),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir(&self.path) {
            log::warn!("cannot release lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_excludes_and_releases() {
        let dir = tempfile::tempdir().unwrap();

        let lock = Lock::acquire(dir.path()).unwrap();
        assert!(matches!(Lock::acquire(dir.path()), Err(Error::Locked(_))));

        drop(lock);
        let _relock = Lock::acquire(dir.path()).unwrap();
    }
}
