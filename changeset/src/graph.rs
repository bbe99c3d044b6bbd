use std::collections::{BTreeMap, BTreeSet, HashMap};

use cvs_svn_export_model::{ChangesetId, RevId};
use serde::{Deserialize, Serialize};

/// `[min, max]` over a changeset's member revision times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: i64,
    pub max: i64,
}

impl TimeRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ChangesetId,
    pub preds: BTreeSet<ChangesetId>,
    pub succs: BTreeSet<ChangesetId>,
    pub time_range: TimeRange,
}

/// The dependency graph over changesets. Edges run predecessor → successor;
/// a valid emission order is any topological order of the (post-split,
/// acyclic) graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangesetGraph {
    nodes: BTreeMap<ChangesetId, GraphNode>,
}

impl ChangesetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: ChangesetId, time_range: TimeRange) {
        self.nodes.insert(
            id,
            GraphNode {
                id,
                preds: BTreeSet::new(),
                succs: BTreeSet::new(),
                time_range,
            },
        );
    }

    /// Adds a dependency edge. Self-edges (a changeset depending on itself,
    /// which the same-LOD rule produces for intra-changeset links) are
    /// dropped.
    pub fn add_edge(&mut self, pred: ChangesetId, succ: ChangesetId) {
        if pred == succ {
            return;
        }

        if let Some(node) = self.nodes.get_mut(&pred) {
            node.succs.insert(succ);
        }
        if let Some(node) = self.nodes.get_mut(&succ) {
            node.preds.insert(pred);
        }
    }

    pub fn node(&self, id: ChangesetId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Looks for a cycle by destructively peeling a working copy of the
    /// graph: nodes with no remaining predecessors are removed until either
    /// nothing is left (acyclic) or every survivor sits on a cycle. One
    /// cycle is then recovered by walking predecessor links from any
    /// survivor until a node repeats.
    ///
    /// The returned nodes are in dependency order (each entry precedes the
    /// next).
    pub fn find_cycle(&self) -> Option<Vec<ChangesetId>> {
        let mut alive: BTreeSet<ChangesetId> = self.nodes.keys().copied().collect();
        let mut pred_count: HashMap<ChangesetId, usize> = self
            .nodes
            .values()
            .map(|node| (node.id, node.preds.len()))
            .collect();

        let mut removable: Vec<ChangesetId> = pred_count
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();

        while let Some(id) = removable.pop() {
            alive.remove(&id);
            for succ in self.nodes[&id].succs.iter() {
                let count = pred_count.get_mut(succ).unwrap();
                *count -= 1;
                if *count == 0 {
                    removable.push(*succ);
                }
            }
        }

        if alive.is_empty() {
            return None;
        }
        log::debug!("{} changeset(s) participate in cycles", alive.len());

        // Every survivor has at least one surviving predecessor, so walking
        // predecessor links must eventually revisit a node.
        let mut positions: HashMap<ChangesetId, usize> = HashMap::new();
        let mut walk: Vec<ChangesetId> = Vec::new();
        let mut current = *alive.iter().next().unwrap();

        loop {
            if let Some(start) = positions.get(&current) {
                let mut cycle = walk[*start..].to_vec();
                // The walk followed predecessor links, so it is in reverse
                // dependency order.
                cycle.reverse();
                return Some(cycle);
            }

            positions.insert(current, walk.len());
            walk.push(current);

            current = *self.nodes[&current]
                .preds
                .iter()
                .find(|pred| alive.contains(pred))
                .expect("surviving node lost its surviving predecessors");
        }
    }
}

/// Splits ordered `(revision, time)` members at their largest internal time
/// gap, earliest such gap on ties. Returns `None` for unsplittable
/// single-member sets; any larger set splits, even one with identical
/// timestamps, because removing a member from a changeset always shrinks
/// the quantity that bounds the cycle-breaking loop.
pub fn split_at_time_gap(members: &[(RevId, i64)]) -> Option<(Vec<RevId>, Vec<RevId>)> {
    if members.len() < 2 {
        return None;
    }

    let mut best_index = 1;
    let mut best_gap = i64::MIN;
    for (index, pair) in members.windows(2).enumerate() {
        let gap = pair[1].1 - pair[0].1;
        if gap > best_gap {
            best_gap = gap;
            best_index = index + 1;
        }
    }

    let (early, late) = members.split_at(best_index);
    Some((
        early.iter().map(|(id, _)| *id).collect(),
        late.iter().map(|(id, _)| *id).collect(),
    ))
}
