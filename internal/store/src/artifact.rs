use std::collections::HashMap;

use crate::{Error, Scratch};

/// Every artifact that can live in the scratch directory. Passes declare
/// which of these they require and produce; the [`ArtifactManager`] enforces
/// presence and deletes artifacts once their last consumer has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Pass 1's raw revision record lines.
    RevisionRecords,
    /// Digest-keyed timestamp rewrite hints from pass 1.
    ResyncHints,
    /// Pass 2's records with resynchronized timestamps.
    CleanRecords,
    /// Pass 3's records, sorted by (time, digest).
    SortedRecords,
    /// Digest-keyed author/log metadata.
    MetadataDb,
    /// Dense-id store of CVS files.
    CvsFileDb,
    /// File-id-keyed RCS default branch numbers.
    DefaultBranches,
    /// The symbol database.
    SymbolDb,
    /// Dense-id random-access store of CVS revisions.
    RevisionStore,
    /// Symbol-keyed last source revision ids.
    LastSymbolSources,
    /// Dense-id store of changesets.
    ChangesetStore,
    /// Revision-id to changeset-id map.
    ItemChangesetMap,
    /// The serialized post-split dependency graph.
    ChangesetGraphDb,
    /// The ordered SVN commit records from pass 6.
    SvnCommitDb,
    /// Revision-id to SVN revision number map.
    RevSvnMap,
    /// Revision-id-keyed RCS delta (or root full-text) store.
    RcsDeltas,
    /// File-id-keyed LOD tree store for the checkout engine.
    RcsTrees,
    /// Unsorted symbol openings/closings log from pass 7.
    SymbolingsRaw,
    /// The sorted openings/closings log.
    Symbolings,
    /// Symbol-id to byte offset index into the sorted log.
    SymbolOffsets,
    /// The mirror's persisted directory nodes.
    NodeStore,
    /// The output dumpfile.
    Dumpfile,
}

impl Artifact {
    pub fn filename(self) -> &'static str {
        match self {
            Artifact::RevisionRecords => "revision-records.txt",
            Artifact::ResyncHints => "resync-hints.db",
            Artifact::CleanRecords => "clean-records.txt",
            Artifact::SortedRecords => "sorted-records.txt",
            Artifact::MetadataDb => "metadata.db",
            Artifact::CvsFileDb => "cvs-files.db",
            Artifact::DefaultBranches => "default-branches.db",
            Artifact::SymbolDb => "symbols.db",
            Artifact::RevisionStore => "cvs-revisions.dat",
            Artifact::LastSymbolSources => "last-symbol-sources.db",
            Artifact::ChangesetStore => "changesets.dat",
            Artifact::ItemChangesetMap => "item-changesets.db",
            Artifact::ChangesetGraphDb => "changeset-graph.db",
            Artifact::SvnCommitDb => "svn-commits.dat",
            Artifact::RevSvnMap => "rev-svn-map.db",
            Artifact::RcsDeltas => "rcs-deltas.dat",
            Artifact::RcsTrees => "rcs-trees.dat",
            Artifact::SymbolingsRaw => "symbolings-raw.txt",
            Artifact::Symbolings => "symbolings.txt",
            Artifact::SymbolOffsets => "symbol-offsets.db",
            Artifact::NodeStore => "mirror-nodes.dat",
            Artifact::Dumpfile => "dump.out",
        }
    }
}

/// Tracks artifact ownership across the pass sequence: which pass produces
/// each artifact, which pass is the last to consume it, and when it can be
/// deleted.
#[derive(Debug)]
pub struct ArtifactManager {
    scratch: Scratch,
    keep: bool,
    last_consumer: HashMap<Artifact, usize>,
    kept_forever: Vec<Artifact>,
}

impl ArtifactManager {
    pub fn new(scratch: Scratch, keep: bool) -> Self {
        Self {
            scratch,
            keep,
            last_consumer: HashMap::new(),
            // The dumpfile is the product of the run, never garbage.
            kept_forever: vec![Artifact::Dumpfile],
        }
    }

    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    /// Registers a pass's requires set. Call once per pass, in pass order,
    /// before any pass runs.
    pub fn register(&mut self, pass_index: usize, requires: &[Artifact]) {
        for artifact in requires.iter() {
            let entry = self.last_consumer.entry(*artifact).or_insert(pass_index);
            *entry = (*entry).max(pass_index);
        }
    }

    /// Refuses to start a pass whose inputs are not on disk.
    pub fn check_requires(&self, pass_name: &str, requires: &[Artifact]) -> Result<(), Error> {
        for artifact in requires.iter() {
            if !self.scratch.exists(*artifact) {
                return Err(Error::MissingArtifact {
                    artifact: artifact.filename(),
                    pass: pass_name.into(),
                });
            }
        }

        Ok(())
    }

    /// Deletes every artifact whose last consumer was the pass that just
    /// finished. `--keep` disables cleanup entirely.
    pub fn pass_done(&mut self, pass_index: usize) -> Result<(), Error> {
        if self.keep {
            return Ok(());
        }

        for (artifact, last) in self.last_consumer.iter() {
            if *last == pass_index && !self.kept_forever.contains(artifact) {
                log::debug!("removing spent artifact {}", artifact.filename());
                self.scratch.remove(*artifact)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_checked() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(dir.path()).unwrap();
        let manager = ArtifactManager::new(scratch.clone(), false);

        assert!(matches!(
            manager.check_requires("sort", &[Artifact::CleanRecords]),
            Err(Error::MissingArtifact { .. })
        ));

        std::fs::write(scratch.path(Artifact::CleanRecords), b"").unwrap();
        manager
            .check_requires("sort", &[Artifact::CleanRecords])
            .unwrap();
    }

    #[test]
    fn test_gc_after_last_consumer() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(dir.path()).unwrap();
        std::fs::write(scratch.path(Artifact::RevisionRecords), b"").unwrap();

        let mut manager = ArtifactManager::new(scratch.clone(), false);
        manager.register(2, &[Artifact::RevisionRecords]);
        manager.register(3, &[Artifact::RevisionRecords]);

        manager.pass_done(2).unwrap();
        assert!(scratch.exists(Artifact::RevisionRecords));

        manager.pass_done(3).unwrap();
        assert!(!scratch.exists(Artifact::RevisionRecords));
    }

    #[test]
    fn test_keep_disables_gc() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(dir.path()).unwrap();
        std::fs::write(scratch.path(Artifact::RevisionRecords), b"").unwrap();

        let mut manager = ArtifactManager::new(scratch.clone(), true);
        manager.register(2, &[Artifact::RevisionRecords]);
        manager.pass_done(2).unwrap();
        assert!(scratch.exists(Artifact::RevisionRecords));
    }
}
