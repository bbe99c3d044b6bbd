//! The symbol filling engine.
//!
//! Filling a branch or tag means reconstructing, under the symbol's
//! directory, every member file at the content its per-file source revision
//! had, using as few operations as possible: directory copies from the
//! best-scoring historical revision, then targeted deletes for entries the
//! copy dragged along, and per-path re-copies for files the chosen revision
//! got wrong.

use std::collections::BTreeMap;

use anyhow::{bail, Context as _};
use cvs_svn_export_model::{Layout, Lod, Symbol, SymbolTable, Symboling, SymbolingKind};
use svn_mirror::Mirror;

/// A subtree of the symbol's sources under one source LOD. Leaves carry the
/// half-open `[opening, closing)` span of revisions whose copy satisfies
/// them.
#[derive(Debug, Default)]
struct FillNode {
    children: BTreeMap<String, FillNode>,
    span: Option<(u32, u32)>,
}

impl FillNode {
    fn insert(&mut self, rel_path: &str, span: (u32, u32)) {
        let mut node = self;
        for component in rel_path.split('/') {
            node = node.children.entry(component.to_string()).or_default();
        }
        node.span = Some(span);
    }

    /// Score events over this subtree: +1 at each opening, -1 at each
    /// closing. The prefix sum at revision r is the number of leaves a copy
    /// at r satisfies.
    fn events(&self) -> BTreeMap<u32, i64> {
        let mut events = BTreeMap::new();
        self.accumulate(&mut events);
        events
    }

    fn accumulate(&self, events: &mut BTreeMap<u32, i64>) {
        if let Some((opening, closing)) = self.span {
            *events.entry(opening).or_insert(0) += 1;
            if closing != u32::MAX {
                *events.entry(closing).or_insert(0) -= 1;
            }
        }

        for child in self.children.values() {
            child.accumulate(events);
        }
    }
}

/// The best copy source over a set of score events: the revision with the
/// maximum score, preferring the parent's already-chosen revision when it
/// ties the maximum, and the lowest such revision otherwise. `None` when no
/// revision satisfies anything.
fn best_rev(events: &BTreeMap<u32, i64>, preferred: Option<u32>) -> Option<(u32, i64)> {
    let mut best: Option<(u32, i64)> = None;
    let mut preferred_score: Option<i64> = None;
    let mut running = 0i64;

    for (rev, delta) in events.iter() {
        running += delta;

        if best.map_or(true, |(_, score)| running > score) {
            best = Some((*rev, running));
        }
        if let Some(preferred) = preferred {
            if *rev <= preferred {
                preferred_score = Some(running);
            }
        }
    }

    let (_, max_score) = best?;
    if max_score <= 0 {
        return None;
    }

    if let (Some(preferred), Some(score)) = (preferred, preferred_score) {
        if score == max_score {
            return Some((preferred, score));
        }
    }

    best
}

/// Materializes one symbol in the mirror as of the output revision being
/// built. `entries` is the symbol's span of the sorted openings/closings
/// log; sources that only open at `as_of` or later are left for a later
/// fill part.
pub fn fill_symbol(
    mirror: &mut Mirror,
    symbol: &Symbol,
    entries: &[Symboling],
    as_of: u32,
    layout: &Layout,
    symbols: &SymbolTable,
) -> anyhow::Result<()> {
    let dest = Lod::Branch(symbol.id);

    // Group sources by the LOD they live on and build one fill tree each.
    let mut spans: BTreeMap<Lod, BTreeMap<String, (u32, u32)>> = BTreeMap::new();
    for entry in entries.iter() {
        let (lod, rel) = layout
            .parse_path(&entry.path, symbols)
            .with_context(|| format!("symboling path outside any LOD: {}", entry.path))?;
        if rel.is_empty() {
            bail!("symboling names a LOD root: {}", entry.path);
        }

        let lod_spans = spans.entry(lod).or_default();
        match entry.kind {
            SymbolingKind::Opening if entry.revnum < as_of => {
                lod_spans
                    .entry(rel.to_string())
                    .or_insert((entry.revnum, u32::MAX));
            }
            SymbolingKind::Opening => {}
            SymbolingKind::Closing => {
                if let Some(span) = lod_spans.get_mut(rel) {
                    if span.1 == u32::MAX {
                        span.1 = entry.revnum;
                    }
                }
            }
        }
    }

    let mut trees: Vec<(Lod, FillNode)> = spans
        .into_iter()
        .map(|(lod, paths)| {
            let mut tree = FillNode::default();
            for (rel, span) in paths.into_iter() {
                tree.insert(&rel, span);
            }
            (lod, tree)
        })
        .collect();

    // Fill from the strongest source first; its directory copy does the
    // bulk of the work and the weaker LODs patch their paths in afterwards.
    trees.sort_by_key(|(lod, tree)| {
        let score = best_rev(&tree.events(), None).map(|(_, score)| score).unwrap_or(0);
        (-score, lod.symbol().map(|id| id.0 as i64).unwrap_or(-1))
    });

    for (src, tree) in trees.iter() {
        fill_node(mirror, src, &dest, tree, String::new(), None)?;
    }

    // A symbol with nothing to copy (e.g. a branch whose only root is a
    // file added on the branch) still needs its directory to exist.
    if !mirror.lod_exists(&dest) {
        mirror.initialize_lod(&dest)?;
    }

    Ok(())
}

fn fill_node(
    mirror: &mut Mirror,
    src: &Lod,
    dest: &Lod,
    node: &FillNode,
    rel: String,
    copied_from: Option<u32>,
) -> anyhow::Result<()> {
    // Leaf: a member file.
    if node.children.is_empty() {
        let (opening, closing) = match node.span {
            Some(span) => span,
            None => return Ok(()),
        };

        let satisfied = copied_from.map_or(false, |rev| opening <= rev && rev < closing);
        if !satisfied {
            if mirror.path_exists(dest, &rel)? {
                mirror.delete_path(dest, &rel, false)?;
            }
            mirror.copy_path(&rel, src, dest, opening)?;
        }

        return Ok(());
    }

    let best = best_rev(&node.events(), copied_from);
    let exists = if rel.is_empty() {
        mirror.lod_exists(dest)
    } else {
        mirror.path_exists(dest, &rel)?
    };

    let effective = match (exists, best) {
        (false, Some((rev, _))) => {
            if rel.is_empty() {
                mirror.copy_lod(src, dest, rev)?;
            } else {
                mirror.copy_path(&rel, src, dest, rev)?;
            }
            prune_extraneous(mirror, src, dest, node, &rel, rev)?;
            Some(rev)
        }
        (false, None) => {
            // No copy helps here; children materialize their own paths. The
            // symbol root still has to exist for them to land in.
            if rel.is_empty() {
                mirror.initialize_lod(dest)?;
            }
            None
        }
        (true, Some((rev, _))) => match copied_from {
            Some(parent_rev) if parent_rev == rev => Some(rev),
            Some(_) => {
                // Dragged along by the parent's copy from a revision that
                // scores worse here than this directory's own best.
                mirror.delete_path(dest, &rel, false)?;
                mirror.copy_path(&rel, src, dest, rev)?;
                prune_extraneous(mirror, src, dest, node, &rel, rev)?;
                Some(rev)
            }
            // Present from another source LOD's fill: patch children in
            // place.
            None => None,
        },
        (true, None) => None,
    };

    for (name, child) in node.children.iter() {
        let child_rel = if rel.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", rel, name)
        };
        fill_node(mirror, src, dest, child, child_rel, effective)?;
    }

    Ok(())
}

/// Deletes every entry a directory copy brought in that is not part of the
/// symbol at this node.
fn prune_extraneous(
    mirror: &mut Mirror,
    src: &Lod,
    dest: &Lod,
    node: &FillNode,
    rel: &str,
    copied_rev: u32,
) -> anyhow::Result<()> {
    let dragged = mirror.old_directory(src, rel, copied_rev)?;

    for name in dragged.keys() {
        if !node.children.contains_key(name) {
            let victim = if rel.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", rel, name)
            };
            mirror.delete_path(dest, &victim, false)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use cvs_svn_export_model::{SymbolId, SymbolKind};
    use svn_mirror::RevProps;

    use super::*;

    fn events(pairs: &[(u32, i64)]) -> BTreeMap<u32, i64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_best_rev_max_score() {
        // Two files open at r2; one closes at r5; a third opens at r4.
        let events = events(&[(2, 2), (4, 1), (5, -1)]);

        assert_eq!(best_rev(&events, None), Some((4, 3)));
    }

    #[test]
    fn test_best_rev_prefers_lowest_on_tie() {
        let events = events(&[(2, 1), (3, -1), (4, 1)]);
        assert_eq!(best_rev(&events, None), Some((2, 1)));
    }

    #[test]
    fn test_best_rev_prefers_parent_choice_on_tie() {
        let events1 = events(&[(2, 1), (3, -1), (4, 1)]);
        assert_eq!(best_rev(&events1, Some(4)), Some((4, 1)));

        // The parent's choice loses when it scores below the maximum.
        let events2 = events(&[(2, 2), (3, -2), (4, 1)]);
        assert_eq!(best_rev(&events2, Some(4)), Some((2, 2)));
    }

    #[test]
    fn test_best_rev_empty() {
        assert_eq!(best_rev(&BTreeMap::new(), None), None);
    }

    fn opening(symbol: u32, revnum: u32, path: &str) -> Symboling {
        Symboling {
            symbol: SymbolId(symbol),
            revnum,
            kind: SymbolingKind::Opening,
            path: path.into(),
        }
    }

    fn closing(symbol: u32, revnum: u32, path: &str) -> Symboling {
        Symboling {
            symbol: SymbolId(symbol),
            revnum,
            kind: SymbolingKind::Closing,
            path: path.into(),
        }
    }

    /// Build trunk history, then fill a tag and check the result tree.
    #[test]
    fn test_fill_copies_and_prunes() {
        let mut symbols = SymbolTable::new();
        let tag = symbols.intern("R1", SymbolKind::Tag);
        symbols.resolve_kinds(&[], &[]).unwrap();
        let layout = Layout::default();

        let dir = tempfile::tempdir().unwrap();
        let mut mirror = Mirror::new(
            &dir.path().join("nodes.dat"),
            layout.clone(),
            symbols.clone(),
            Vec::new(),
        )
        .unwrap();

        let props = RevProps {
            author: b"a".to_vec(),
            log: b"l".to_vec(),
            date: 0,
        };

        // r1: trunk gets a.c, lib/b.c, and d.c (not part of the tag).
        mirror.start_commit(1, &props).unwrap();
        mirror.initialize_project().unwrap();
        mirror.add_file(&Lod::Trunk, "a.c", b"a1", false, None).unwrap();
        mirror
            .add_file(&Lod::Trunk, "lib/b.c", b"b1", false, None)
            .unwrap();
        mirror.add_file(&Lod::Trunk, "d.c", b"d1", false, None).unwrap();
        mirror.end_commit().unwrap();

        // r2: a.c moves past the tagged content.
        mirror.start_commit(2, &props).unwrap();
        mirror
            .change_file(&Lod::Trunk, "a.c", b"a2", false, None)
            .unwrap();
        mirror.end_commit().unwrap();

        // r3: the fill. Tag sources: a.c valid only at r1, lib/b.c open
        // ended.
        let entries = vec![
            opening(tag.0, 1, "trunk/a.c"),
            closing(tag.0, 2, "trunk/a.c"),
            opening(tag.0, 1, "trunk/lib/b.c"),
        ];

        mirror.start_commit(3, &props).unwrap();
        fill_symbol(
            &mut mirror,
            symbols.get(tag),
            &entries,
            3,
            &layout,
            &symbols,
        )
        .unwrap();
        mirror.end_commit().unwrap();

        let tag_lod = Lod::Branch(tag);
        assert!(mirror.path_exists(&tag_lod, "a.c").unwrap());
        assert!(mirror.path_exists(&tag_lod, "lib/b.c").unwrap());
        assert!(!mirror.path_exists(&tag_lod, "d.c").unwrap());
    }

    /// A branch rooted only at unloggable sources gets an empty directory.
    #[test]
    fn test_fill_with_no_sources_constructs_root() {
        let mut symbols = SymbolTable::new();
        let branch = symbols.intern("b", SymbolKind::Branch);
        symbols.resolve_kinds(&[], &[]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut mirror = Mirror::new(
            &dir.path().join("nodes.dat"),
            Layout::default(),
            symbols.clone(),
            Vec::new(),
        )
        .unwrap();

        let props = RevProps {
            author: b"a".to_vec(),
            log: b"l".to_vec(),
            date: 0,
        };
        mirror.start_commit(1, &props).unwrap();
        fill_symbol(
            &mut mirror,
            symbols.get(branch),
            &[],
            1,
            &Layout::default(),
            &symbols,
        )
        .unwrap();
        mirror.end_commit().unwrap();

        assert!(mirror.lod_exists(&Lod::Branch(branch)));
    }
}
