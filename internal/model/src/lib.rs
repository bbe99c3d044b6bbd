//! Shared data model for `cvs-svn-export`.
//!
//! Every record that crosses a pass boundary lives here, keyed by the dense
//! integer ids the stores use. The crates that persist these
//! (`cvs-svn-export-store`) and the passes that produce and consume them all
//! speak in terms of this module.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

mod changeset;
pub use self::changeset::{Changeset, ChangesetKind};

mod error;
pub use self::error::Error;

mod layout;
pub use self::layout::Layout;

mod metadata;
pub use self::metadata::{Digest, Metadata};

mod record;
pub use self::record::{revision_from_line, revision_to_line};

mod resync;
pub use self::resync::ResyncHint;

mod revision;
pub use self::revision::{CvsFile, CvsRevision, Lod, RevisionOp};

mod tree;
pub use self::tree::{FileTrees, LodTree};

mod svn;
pub use self::svn::{SvnCommit, SvnCommitKind};

mod symbol;
pub use self::symbol::{Symbol, SymbolKind, SymbolTable};

mod symboling;
pub use self::symboling::{Symboling, SymbolingKind};

/// Identifies one CVS file (one `,v` file) across the whole conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Identifies one CVS revision of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RevId(pub u32);

/// Identifies a tag or branch symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Identifies a changeset. Revision and symbol changesets share this id
/// space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangesetId(pub u32);

impl Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for RevId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SymbolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ChangesetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
