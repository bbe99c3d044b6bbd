use comma_v::RevNum;
use serde::{Deserialize, Serialize};

use crate::{Digest, FileId, RevId, SymbolId};

/// One CVS file, identified by its repository-relative path with the `,v`
/// suffix stripped and any trailing `Attic` directory removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvsFile {
    pub id: FileId,
    pub path: String,
    pub in_attic: bool,
    pub executable: bool,

    /// Keyword expansion mode from the RCS admin section (`kb`, `kkv`, …),
    /// if one was declared.
    pub expand: Option<String>,
}

impl CvsFile {
    /// True if the file's contents must be passed through untouched.
    pub fn is_binary(&self) -> bool {
        matches!(self.expand.as_deref(), Some("b") | Some("kb") | Some("o"))
    }
}

/// A line of development: trunk, or a named branch. Trunk orders first,
/// which also makes it the preferred source when fill scores tie.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Lod {
    Trunk,
    Branch(SymbolId),
}

impl Lod {
    pub fn is_trunk(&self) -> bool {
        matches!(self, Lod::Trunk)
    }

    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            Lod::Trunk => None,
            Lod::Branch(id) => Some(*id),
        }
    }
}

/// What a revision does to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionOp {
    Add,
    Change,
    Delete,

    /// The revision exists in the RCS tree but produces no SVN operation
    /// (folded vendor imports, synthesized add-on-branch trunk revisions).
    Noop,
}

/// One revision of one CVS file.
///
/// `prev` and `next` link revisions along the same line of development; the
/// first revision of a branch has `prev == None` even though its text derives
/// from the sprout revision (the delta store tracks that separately).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvsRevision {
    pub id: RevId,
    pub file: FileId,
    pub num: RevNum,
    pub lod: Lod,
    pub op: RevisionOp,

    /// Seconds since the epoch. Strictly greater than `prev`'s time once
    /// pass 2 has run.
    pub time: i64,

    /// Hash over the revision's author and log message.
    pub digest: Digest,

    pub deltatext_empty: bool,

    pub prev: Option<RevId>,
    pub next: Option<RevId>,

    /// First revisions of branches sprouting from this revision.
    pub branch_children: Vec<RevId>,

    /// Tags rooted at this revision.
    pub tags_rooted: Vec<SymbolId>,

    /// Branches rooted at this revision.
    pub branches_rooted: Vec<SymbolId>,

    /// True for the dead 1.x trunk revision CVS synthesizes when a file is
    /// added on a branch.
    pub added_on_branch: bool,

    /// True for revisions on the file's non-trunk RCS default branch; each
    /// primary commit containing one is followed by a trunk synchronization
    /// revision.
    pub default_branch: bool,
}

impl CvsRevision {
    /// True if this revision contributes an operation to the output stream.
    pub fn is_emitted(&self) -> bool {
        !matches!(self.op, RevisionOp::Noop)
    }
}
