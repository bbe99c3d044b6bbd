//! Pass 4: build the random-access revision store from the sorted records
//! and determine, per symbol, the last revision that acts as one of its
//! sources.

use std::collections::HashMap;

use cvs_svn_export_model::{revision_from_line, RevId, SymbolId};
use cvs_svn_export_store::{write_db, Artifact, LineReader, StoreWriter};

use crate::{context::Context, pass::Pass};

pub struct IndexPass;

impl Pass for IndexPass {
    fn name(&self) -> &'static str {
        "index"
    }

    fn requires(&self) -> &'static [Artifact] {
        &[Artifact::SortedRecords]
    }

    fn produces(&self) -> &'static [Artifact] {
        &[Artifact::RevisionStore, Artifact::LastSymbolSources]
    }

    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut store = StoreWriter::create(&ctx.scratch.path(Artifact::RevisionStore))?;

        // The records stream in time order, so the last write per symbol
        // wins.
        let mut last_sources: HashMap<SymbolId, RevId> = HashMap::new();
        let mut count = 0usize;

        for line in LineReader::open(&ctx.scratch.path(Artifact::SortedRecords))? {
            let rev = revision_from_line(&line?)?;

            for symbol in rev.tags_rooted.iter().chain(rev.branches_rooted.iter()) {
                last_sources.insert(*symbol, rev.id);
            }

            store.put(rev.id.0, &rev)?;
            count += 1;
        }

        store.finish()?;
        write_db(&ctx.scratch.path(Artifact::LastSymbolSources), &last_sources)?;

        log::info!(
            "indexed {} revision(s); {} symbol(s) have sources",
            count,
            last_sources.len()
        );
        Ok(())
    }
}
