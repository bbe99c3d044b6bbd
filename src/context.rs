use std::{ffi::OsString, path::PathBuf};

use cvs_svn_export_model::Layout;
use cvs_svn_export_store::{Artifact, Scratch};

use crate::encoding::Encoding;

/// Everything the passes need, built once in `main` from the command line
/// and threaded explicitly; there are no process-wide singletons.
#[derive(Debug)]
pub struct Context {
    pub cvsroot: PathBuf,
    pub scratch: Scratch,
    pub layout: Layout,

    /// Commit coalescing window in seconds.
    pub threshold: i64,

    pub trunk_only: bool,

    /// Remove directories emptied by file deletions.
    pub prune: bool,

    pub username: String,
    pub cvs_revnums: bool,
    pub encodings: Vec<Encoding>,
    pub force_branch: Vec<String>,
    pub force_tag: Vec<String>,

    /// Explicit dumpfile destination; the scratch-relative default
    /// otherwise.
    pub dumpfile: Option<PathBuf>,

    /// Load the stream into this repository via `svnadmin load`.
    pub svn_target: Option<PathBuf>,
    pub svnadmin: OsString,

    /// Report every mirror action on stdout.
    pub report_actions: bool,

    /// Keep intermediate artifacts after their last consumer.
    pub keep_artifacts: bool,

    /// In-memory run length for the external sort.
    pub sort_run_lines: usize,
}

impl Context {
    pub fn dumpfile_path(&self) -> PathBuf {
        self.dumpfile
            .clone()
            .unwrap_or_else(|| self.scratch.path(Artifact::Dumpfile))
    }
}
