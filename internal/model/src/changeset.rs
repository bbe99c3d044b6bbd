use serde::{Deserialize, Serialize};

use crate::{ChangesetId, RevId, SymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangesetKind {
    /// An ordinary commit: revisions sharing an author+log digest within the
    /// commit window.
    Revision,

    /// A synthetic changeset representing the filling of a branch or tag;
    /// its members are the revisions that root the symbol.
    Symbol(SymbolId),
}

/// A set of CVS revisions committed as one SVN revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Changeset {
    pub id: ChangesetId,
    pub kind: ChangesetKind,

    /// Member revisions in ascending time order.
    pub revisions: Vec<RevId>,
}

impl Changeset {
    pub fn symbol(&self) -> Option<SymbolId> {
        match self.kind {
            ChangesetKind::Revision => None,
            ChangesetKind::Symbol(id) => Some(id),
        }
    }

    pub fn is_symbol(&self) -> bool {
        self.symbol().is_some()
    }
}
