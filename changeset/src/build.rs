use std::collections::{HashMap, HashSet};

use binary_heap_plus::{BinaryHeap, MinComparator};
use cvs_svn_export_model::{Changeset, ChangesetId, ChangesetKind, Digest, FileId, RevId};

/// The slice of a revision the grouper needs: identity, owning file, and
/// timestamp. The full records stay on disk.
#[derive(Debug, Clone, Eq)]
pub struct RevStub {
    pub id: RevId,
    pub file: FileId,
    pub time: i64,
}

impl Ord for RevStub {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.time, self.id).cmp(&(other.time, other.id))
    }
}

impl PartialOrd for RevStub {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RevStub {
    fn eq(&self, other: &Self) -> bool {
        (self.time, self.id) == (other.time, other.id)
    }
}

/// A `Grouper` ingests revision stubs and yields revision changesets.
///
/// CVS has no repository-wide commit: one `cvs commit` leaves a file
/// revision per touched file, each stamped with that file's own mtime. Two
/// revisions land in the same changeset when they share an author+log digest
/// and their timestamps sit within the commit threshold of their neighbors
/// in time order.
///
/// Keying the pending map by digest is the obvious half; the interesting
/// half is keeping each digest's revisions in a min-heap so they are walked
/// in time order on consumption. Walking any other order would mean
/// stitching buckets back together when a straggler arrives between two
/// already-bucketed revisions.
#[derive(Debug)]
pub struct Grouper {
    threshold: i64,
    by_digest: HashMap<Digest, BinaryHeap<RevStub, MinComparator>>,
}

impl Grouper {
    /// `threshold` is the commit window in seconds: two neighboring
    /// revisions further apart than this are different commits.
    pub fn new(threshold: i64) -> Self {
        Self {
            threshold,
            by_digest: HashMap::new(),
        }
    }

    pub fn add_revision(&mut self, digest: Digest, stub: RevStub) {
        if let Some(heap) = self.by_digest.get_mut(&digest) {
            heap.push(stub);
        } else {
            let mut heap = BinaryHeap::new_min();
            heap.push(stub);
            self.by_digest.insert(digest, heap);
        }
    }

    /// Consumes the grouper and returns revision changesets in ascending
    /// time order, with ids assigned from `next_id`.
    ///
    /// Within one digest, a changeset is cut at every gap of at least the
    /// threshold and whenever a file would appear twice; the same-file
    /// successor revision carries the dependency edge between the two
    /// halves, so no explicit link is recorded here.
    pub fn into_changesets(self, next_id: &mut u32) -> Vec<Changeset> {
        let mut pending: Vec<Vec<RevStub>> = Vec::new();
        let threshold = self.threshold;

        for (_, heap) in self.by_digest.into_iter() {
            let mut members: Vec<RevStub> = Vec::new();
            let mut files: HashSet<FileId> = HashSet::new();

            for stub in heap.into_iter_sorted() {
                let gap_too_wide = members
                    .last()
                    .map(|last| stub.time - last.time >= threshold)
                    .unwrap_or(false);

                if gap_too_wide || files.contains(&stub.file) {
                    pending.push(std::mem::take(&mut members));
                    files.clear();
                }

                files.insert(stub.file);
                members.push(stub);
            }

            if !members.is_empty() {
                pending.push(members);
            }
        }

        // Id assignment follows time order so reruns are byte-identical.
        pending.sort_by_key(|members| (members[0].time, members[0].id));

        pending
            .into_iter()
            .map(|members| {
                let id = ChangesetId(*next_id);
                *next_id += 1;

                Changeset {
                    id,
                    kind: ChangesetKind::Revision,
                    revisions: members.into_iter().map(|stub| stub.id).collect(),
                }
            })
            .collect()
    }
}
