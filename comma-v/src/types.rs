use crate::num::RevNum;

/// A parsed `,v` file: the admin section, the revision tree, and the log and
/// text payloads. Deltas and texts are kept in file order, which for trunk
/// runs head-backward.
#[derive(Debug, Clone)]
pub struct RcsFile {
    pub admin: Admin,
    pub deltas: Vec<(RevNum, Delta)>,
    pub desc: Vec<u8>,
    pub texts: Vec<(RevNum, DeltaText)>,
}

impl RcsFile {
    pub fn head(&self) -> Option<&RevNum> {
        self.admin.head.as_ref()
    }

    pub fn delta(&self, num: &RevNum) -> Option<&Delta> {
        self.deltas
            .iter()
            .find(|(n, _)| n == num)
            .map(|(_, delta)| delta)
    }

    pub fn text(&self, num: &RevNum) -> Option<&DeltaText> {
        self.texts
            .iter()
            .find(|(n, _)| n == num)
            .map(|(_, text)| text)
    }
}

#[derive(Debug, Clone)]
pub struct Admin {
    pub head: Option<RevNum>,

    /// The principal (default) branch, if the file has one.
    pub branch: Option<RevNum>,

    pub access: Vec<Vec<u8>>,
    pub symbols: Vec<(Vec<u8>, RevNum)>,
    pub locks: Vec<(Vec<u8>, RevNum)>,
    pub strict: bool,
    pub comment: Option<Vec<u8>>,
    pub expand: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct Delta {
    /// Seconds since the epoch, already decoded from the RCS date format.
    pub date: i64,

    pub author: Vec<u8>,
    pub state: Option<Vec<u8>>,
    pub branches: Vec<RevNum>,
    pub next: Option<RevNum>,
    pub commit_id: Option<Vec<u8>>,
}

impl Delta {
    pub fn is_dead(&self) -> bool {
        self.state.as_deref() == Some(b"dead".as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct DeltaText {
    pub log: Vec<u8>,
    pub text: Vec<u8>,
}
