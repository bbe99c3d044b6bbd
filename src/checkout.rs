//! The delta-store checkout engine.
//!
//! Pass 1 records, per revision, either a forward delta against the
//! revision it derives from or (for tree roots) the full text. During
//! emission this engine replays those deltas, holding each materialized
//! text in a reference-counted cache only as long as unmaterialized
//! descendants remain. The emitter must request each file's revisions in
//! LOD order and each live revision at most once; `skip` accounts for
//! revisions whose text nobody needs.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context as _};
use cvs_svn_export_model::{FileId, FileTrees, RevId};
use cvs_svn_export_store::StoreReader;
use rcs_ed::{keywords, File, Script};

struct RevNode {
    prev: Option<RevId>,

    /// Direct descendants whose texts have not yet been produced.
    refcount: u32,

    done: bool,
}

struct FileTree {
    revs: HashMap<RevId, RevNode>,
    pending: usize,
}

impl FileTree {
    fn build(trees: &FileTrees) -> Self {
        let mut revs: HashMap<RevId, RevNode> = HashMap::new();

        for lod in trees.lods.iter() {
            let mut prev = lod.sprout;
            for rev in lod.revisions.iter() {
                revs.insert(
                    *rev,
                    RevNode {
                        prev,
                        refcount: 0,
                        done: false,
                    },
                );
                prev = Some(*rev);
            }
        }

        let parents: Vec<RevId> = revs.values().filter_map(|node| node.prev).collect();
        for parent in parents.into_iter() {
            if let Some(node) = revs.get_mut(&parent) {
                node.refcount += 1;
            }
        }

        let pending = revs.len();
        Self { revs, pending }
    }
}

pub struct CheckoutEngine {
    deltas: StoreReader<Vec<u8>>,
    trees: StoreReader<FileTrees>,
    live: HashMap<FileId, FileTree>,
    cache: HashMap<RevId, File>,
}

impl CheckoutEngine {
    pub fn new(deltas: StoreReader<Vec<u8>>, trees: StoreReader<FileTrees>) -> Self {
        Self {
            deltas,
            trees,
            live: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Produces the full text of one revision, optionally collapsing
    /// expanded RCS keywords.
    pub fn checkout(
        &mut self,
        file: FileId,
        rev: RevId,
        suppress_keywords: bool,
    ) -> anyhow::Result<Vec<u8>> {
        let text = self.materialize(file, rev, false)?;
        let bytes = text.into_bytes();

        Ok(if suppress_keywords {
            keywords::suppress(&bytes)
        } else {
            bytes
        })
    }

    /// Materializes and discards a revision's text, to keep the refcounts
    /// honest for revisions (deletes, folded vendor imports) whose content
    /// nobody consumes. A revision absent from the tree store was pruned at
    /// record time and needs nothing.
    pub fn skip(&mut self, file: FileId, rev: RevId) -> anyhow::Result<()> {
        if !self.tree_tracks(file, rev)? {
            return Ok(());
        }

        self.materialize(file, rev, false).map(|_| ())
    }

    /// Reports revisions that were never materialized and cache entries
    /// still alive, draining both. Either indicates a scheduling bug;
    /// already-written output is unaffected.
    pub fn finish(&mut self) -> usize {
        let mut leftovers = 0;

        for (file, tree) in self.live.drain() {
            if tree.pending > 0 {
                log::warn!(
                    "checkout engine: file {} still has {} unmaterialized revision(s)",
                    file,
                    tree.pending
                );
                leftovers += tree.pending;
            }
        }

        for (rev, _) in self.cache.drain() {
            log::warn!("checkout engine: cache entry for revision {} never freed", rev);
            leftovers += 1;
        }

        leftovers
    }

    fn tree_tracks(&mut self, file: FileId, rev: RevId) -> anyhow::Result<bool> {
        Ok(self.tree(file)?.revs.contains_key(&rev))
    }

    fn tree(&mut self, file: FileId) -> anyhow::Result<&mut FileTree> {
        if !self.live.contains_key(&file) {
            let trees = self
                .trees
                .get(file.0)
                .with_context(|| format!("no LOD trees for file {}", file))?;
            self.live.insert(file, FileTree::build(&trees));
        }

        Ok(self.live.get_mut(&file).unwrap())
    }

    /// The recursive core. `on_behalf` marks a recursive materialization of
    /// a parent the emitter passed over: the parent's own claim on *its*
    /// parent stays outstanding, to be settled by the emitter's eventual
    /// `skip`, or reported at `finish`.
    fn materialize(&mut self, file: FileId, rev: RevId, on_behalf: bool) -> anyhow::Result<File> {
        if on_behalf {
            if let Some(text) = self.cache.get(&rev) {
                return Ok(text.clone());
            }
        }

        let (prev, already_done) = {
            let tree = self.tree(file)?;
            let node = tree
                .revs
                .get(&rev)
                .ok_or_else(|| anyhow!("revision {} is not in file {}'s LOD trees", rev, file))?;
            (node.prev, node.done)
        };
        if already_done {
            bail!(
                "revision {} of file {} requested twice from the checkout engine",
                rev,
                file
            );
        }

        let delta = self
            .deltas
            .get(rev.0)
            .with_context(|| format!("no delta record for revision {}", rev))?;

        let text = match prev {
            None => File::from_bytes(&delta),
            Some(parent) => {
                let parent_text = match self.cache.get(&parent) {
                    Some(text) => text.clone(),
                    None => self.materialize(file, parent, true)?,
                };

                let commands = Script::parse(&delta)
                    .with_context(|| format!("bad delta for revision {}", rev))?;
                parent_text
                    .apply(&commands)
                    .with_context(|| format!("cannot apply delta for revision {}", rev))?
            }
        };

        // Settle the books: this revision is now produced.
        let refcount = {
            let tree = self.tree(file)?;
            let node = tree.revs.get_mut(&rev).unwrap();
            node.done = true;
            tree.pending -= 1;
            tree.revs[&rev].refcount
        };

        if let (Some(parent), false) = (prev, on_behalf) {
            let tree = self.tree(file)?;
            let node = tree.revs.get_mut(&parent).unwrap();
            node.refcount -= 1;
            if node.refcount == 0 {
                self.cache.remove(&parent);
            }
        }

        if refcount > 0 {
            self.cache.insert(rev, text.clone());
        }

        let tree = self.tree(file)?;
        if tree.pending == 0 {
            self.live.remove(&file);
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use cvs_svn_export_model::LodTree;
    use cvs_svn_export_store::StoreWriter;
    use rcs_ed::serialize;

    use super::*;

    /// A file with trunk 1.1 → 1.2 and a branch revision off 1.1:
    ///
    /// ```text
    ///   r0 (full text) ── r1 (trunk head)
    ///     └─ r2 (branch)
    /// ```
    fn engine(dir: &std::path::Path) -> CheckoutEngine {
        let mut deltas = StoreWriter::create(&dir.join("deltas.dat")).unwrap();
        deltas.put(0, &b"alpha\nbeta\n".to_vec()).unwrap();

        // r1: replace "beta" with "gamma".
        let r1 = Script::parse(b"d2 1\na2 1\ngamma\n").unwrap();
        deltas.put(1, &serialize(&r1)).unwrap();

        // r2: append "branch" after line 2.
        let r2 = Script::parse(b"a2 1\nbranch\n").unwrap();
        deltas.put(2, &serialize(&r2)).unwrap();
        deltas.finish().unwrap();

        let mut trees = StoreWriter::create(&dir.join("trees.dat")).unwrap();
        trees
            .put(
                0,
                &FileTrees {
                    lods: vec![
                        LodTree {
                            sprout: None,
                            revisions: vec![RevId(0), RevId(1)],
                        },
                        LodTree {
                            sprout: Some(RevId(0)),
                            revisions: vec![RevId(2)],
                        },
                    ],
                },
            )
            .unwrap();
        trees.finish().unwrap();

        CheckoutEngine::new(
            StoreReader::open(&dir.join("deltas.dat")).unwrap(),
            StoreReader::open(&dir.join("trees.dat")).unwrap(),
        )
    }

    #[test]
    fn test_checkout_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());

        assert_eq!(
            engine.checkout(FileId(0), RevId(0), false).unwrap(),
            b"alpha\nbeta\n"
        );
        assert_eq!(
            engine.checkout(FileId(0), RevId(2), false).unwrap(),
            b"alpha\nbeta\nbranch\n"
        );
        assert_eq!(
            engine.checkout(FileId(0), RevId(1), false).unwrap(),
            b"alpha\ngamma\n"
        );

        assert_eq!(engine.finish(), 0);
    }

    #[test]
    fn test_skipped_parent_is_materialized_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());

        // The emitter never asks for r0's own text; the first child's
        // checkout materializes it on demand, and the accounting still
        // settles once both children have consumed it.
        assert_eq!(
            engine.checkout(FileId(0), RevId(1), false).unwrap(),
            b"alpha\ngamma\n"
        );
        assert_eq!(
            engine.checkout(FileId(0), RevId(2), false).unwrap(),
            b"alpha\nbeta\nbranch\n"
        );

        assert_eq!(engine.finish(), 0);
    }

    #[test]
    fn test_double_checkout_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());

        engine.checkout(FileId(0), RevId(0), false).unwrap();
        engine.checkout(FileId(0), RevId(1), false).unwrap();
        assert!(engine.checkout(FileId(0), RevId(1), false).is_err());
    }

    #[test]
    fn test_leftovers_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());

        engine.checkout(FileId(0), RevId(0), false).unwrap();
        // r1 and r2 never requested: two unmaterialized revisions plus the
        // cached r0 text they would have consumed.
        assert_eq!(engine.finish(), 3);
    }

    #[test]
    fn test_skip_of_pruned_revision_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());

        engine.skip(FileId(0), RevId(99)).unwrap();
    }

    #[test]
    fn test_keyword_suppression_applies_to_output_only() {
        let dir = tempfile::tempdir().unwrap();

        let mut deltas = StoreWriter::create(&dir.path().join("deltas.dat")).unwrap();
        deltas
            .put(0, &b"$Id: f.c,v 1.1 2001/01/01 00:00:00 a Exp $\n".to_vec())
            .unwrap();
        deltas.finish().unwrap();

        let mut trees = StoreWriter::create(&dir.path().join("trees.dat")).unwrap();
        trees
            .put(
                0,
                &FileTrees {
                    lods: vec![LodTree {
                        sprout: None,
                        revisions: vec![RevId(0)],
                    }],
                },
            )
            .unwrap();
        trees.finish().unwrap();

        let mut engine = CheckoutEngine::new(
            StoreReader::open(&dir.path().join("deltas.dat")).unwrap(),
            StoreReader::open(&dir.path().join("trees.dat")).unwrap(),
        );

        assert_eq!(
            engine.checkout(FileId(0), RevId(0), true).unwrap(),
            b"$Id$\n"
        );
    }
}
