use serde::{Deserialize, Serialize};

use crate::RevId;

/// One line of development's revisions in checkout order. The first revision
/// derives its text from `sprout` when present (branches, and trunk when the
/// usual trunk root was folded into a vendor import); a `None` sprout means
/// the first revision's delta record is the full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LodTree {
    pub sprout: Option<RevId>,
    pub revisions: Vec<RevId>,
}

/// All of one file's LOD trees, keyed by file id in the tree store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTrees {
    pub lods: Vec<LodTree>,
}
