//! Manages the optional `svnadmin load` child process that consumes the
//! dump stream directly instead of (or alongside) a dumpfile on disk.

use std::{
    ffi::OsStr,
    path::Path,
    process::{Child, ChildStdin, Command, Stdio},
};

mod error;
pub use self::error::Error;

mod preflight;
pub use self::preflight::preflight;

/// A running `svnadmin load` process. The caller writes the dump stream to
/// the returned stdin handle, drops it to signal end of stream, and then
/// waits for the loader to finish.
#[derive(Debug)]
pub struct Loader {
    child: Child,
}

impl Loader {
    /// Spawns `svnadmin load -q <repo>` with a piped stdin. Its stderr is
    /// inherited so load failures surface to the operator directly.
    pub fn spawn(svnadmin: &OsStr, repo: &Path) -> Result<(Self, ChildStdin), Error> {
        let mut child = Command::new(svnadmin)
            .arg("load")
            .arg("-q")
            .arg(repo)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(Error::Spawn)?;

        let stdin = child.stdin.take().ok_or(Error::StdinPipe)?;
        log::debug!("spawned svnadmin load for {}", repo.display());

        Ok((Self { child }, stdin))
    }

    /// Waits for the loader to exit. The stdin handle returned by
    /// [`Loader::spawn`] must have been dropped first, or this will block
    /// forever.
    pub fn wait(mut self) -> Result<(), Error> {
        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Exit(status))
        }
    }
}
