use std::collections::HashMap;

use binary_heap_plus::BinaryHeap;
use cvs_svn_export_model::ChangesetId;

use crate::{ChangesetGraph, Error};

/// One changeset in emission order with its assigned output timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub id: ChangesetId,
    pub time: i64,
}

/// Ready-queue entries order by `(t_max, t_min, id)`, the tie-break among
/// nodes whose predecessors have all been emitted.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Ready {
    t_max: i64,
    t_min: i64,
    id: ChangesetId,
}

/// Emits the graph in topological order and assigns each changeset the
/// timestamp `max(t_min, last + 1)`, which keeps revision properties
/// strictly increasing downstream.
///
/// Fails if any node is never freed, which means a cycle survived the
/// breaker.
pub fn schedule(graph: &ChangesetGraph) -> Result<Vec<Scheduled>, Error> {
    let mut pred_count: HashMap<ChangesetId, usize> = graph
        .nodes()
        .map(|node| (node.id, node.preds.len()))
        .collect();

    let mut ready = BinaryHeap::new_min();
    for node in graph.nodes() {
        if node.preds.is_empty() {
            ready.push(Ready {
                t_max: node.time_range.max,
                t_min: node.time_range.min,
                id: node.id,
            });
        }
    }

    let mut out: Vec<Scheduled> = Vec::with_capacity(graph.len());
    let mut last_time = i64::MIN;

    while let Some(next) = ready.pop() {
        let time = if out.is_empty() {
            next.t_min
        } else {
            next.t_min.max(last_time + 1)
        };
        last_time = time;

        out.push(Scheduled { id: next.id, time });

        for succ in graph.node(next.id).unwrap().succs.iter() {
            let count = pred_count.get_mut(succ).unwrap();
            *count -= 1;
            if *count == 0 {
                let node = graph.node(*succ).unwrap();
                ready.push(Ready {
                    t_max: node.time_range.max,
                    t_min: node.time_range.min,
                    id: node.id,
                });
            }
        }
    }

    if out.len() != graph.len() {
        return Err(Error::CycleRemains(graph.len() - out.len()));
    }

    Ok(out)
}
