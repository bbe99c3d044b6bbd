use serde::{Deserialize, Serialize};

use crate::{ChangesetId, RevId, SymbolId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SvnCommitKind {
    /// r1: creates the project top-level directories.
    Initialization,

    /// An ordinary commit derived from one revision changeset.
    Primary { changeset: ChangesetId },

    /// Trunk synchronization emitted immediately after a primary commit that
    /// touched non-trunk default-branch revisions. `source_revnum` is the
    /// primary's revision number.
    PostCommit {
        source_revnum: u32,
        revisions: Vec<RevId>,
    },

    /// Materializes a branch or tag by copying from earlier revisions.
    SymbolFill { symbol: SymbolId },
}

/// One revision of the output stream, scheduled and numbered by pass 6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvnCommit {
    pub revnum: u32,

    /// Seconds since the epoch; strictly increasing across the stream.
    pub time: i64,

    pub kind: SvnCommitKind,
}
