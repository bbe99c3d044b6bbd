use crate::Error;

/// What a copied path is, so delegates can emit the right node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
}

/// Revision properties for a commit being opened, with author and log
/// already resolved to the bytes the output should carry.
#[derive(Debug, Clone)]
pub struct RevProps {
    pub author: Vec<u8>,
    pub log: Vec<u8>,
    pub date: i64,
}

/// A file body handed to delegates on add and change events.
#[derive(Debug)]
pub struct FileContent<'a> {
    /// Full repository path.
    pub path: &'a str,
    pub text: &'a [u8],
    pub executable: bool,

    /// The CVS revision number, when the run records it as a node property.
    pub cvs_revnum: Option<String>,
}

/// The callback hooks the mirror drives while the emitter mutates it. The
/// dumpfile writer, the `svnadmin load` pipe, and the verbose stdout
/// reporter all implement this.
pub trait MirrorDelegate {
    fn start_commit(&mut self, revnum: u32, props: &RevProps) -> Result<(), Error>;

    fn end_commit(&mut self, revnum: u32) -> Result<(), Error>;

    /// Called once, inside r1, with the project top-level directories.
    fn initialize_project(&mut self, dirs: &[String]) -> Result<(), Error>;

    /// A LOD (or symbol) root directory coming into being without a copy.
    fn initialize_lod(&mut self, path: &str) -> Result<(), Error>;

    fn mkdir(&mut self, path: &str) -> Result<(), Error>;

    fn add_path(&mut self, content: &FileContent) -> Result<(), Error>;

    fn change_path(&mut self, content: &FileContent) -> Result<(), Error>;

    fn delete_lod(&mut self, path: &str) -> Result<(), Error>;

    fn delete_path(&mut self, path: &str) -> Result<(), Error>;

    fn copy_lod(&mut self, src_path: &str, dest_path: &str, src_revnum: u32)
        -> Result<(), Error>;

    fn copy_path(
        &mut self,
        src_path: &str,
        dest_path: &str,
        src_revnum: u32,
        kind: PathKind,
    ) -> Result<(), Error>;

    /// The stream is complete; flush and release resources.
    fn finish(&mut self) -> Result<(), Error>;
}
