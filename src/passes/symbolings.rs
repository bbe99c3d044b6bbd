//! Pass 7: the symbol openings/closings log.
//!
//! A revision r that roots a symbol makes its path a valid copy source from
//! the output revision that committed r (the opening) until the output
//! revision that committed r's successor on the same LOD overwrote the path
//! (the closing; absent if nothing ever did). The log is sorted and offset
//! indexed so pass 8 can stream one symbol's entries at a time.

use std::collections::HashMap;

use cvs_svn_export_model::{
    CvsFile, CvsRevision, RevId, RevisionOp, SymbolId, Symboling, SymbolingKind, SymbolTable,
};
use cvs_svn_export_store::{
    read_db, sort_lines, write_db, Artifact, LineReader, LineWriter, StoreReader,
};

use crate::{context::Context, pass::Pass};

pub struct SymbolingsPass;

impl Pass for SymbolingsPass {
    fn name(&self) -> &'static str {
        "symbolings"
    }

    fn requires(&self) -> &'static [Artifact] {
        &[
            Artifact::RevisionStore,
            Artifact::RevSvnMap,
            Artifact::CvsFileDb,
            Artifact::SymbolDb,
        ]
    }

    fn produces(&self) -> &'static [Artifact] {
        &[Artifact::Symbolings, Artifact::SymbolOffsets]
    }

    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut revisions: StoreReader<CvsRevision> =
            StoreReader::open(&ctx.scratch.path(Artifact::RevisionStore))?;
        let mut files: StoreReader<CvsFile> =
            StoreReader::open(&ctx.scratch.path(Artifact::CvsFileDb))?;
        let symbols: SymbolTable = read_db(&ctx.scratch.path(Artifact::SymbolDb))?;
        let rev_svn: HashMap<RevId, u32> = read_db(&ctx.scratch.path(Artifact::RevSvnMap))?;

        let raw_path = ctx.scratch.path(Artifact::SymbolingsRaw);
        let mut raw = LineWriter::create(&raw_path)?;
        let mut openings = 0usize;

        let ids: Vec<u32> = revisions.ids().collect();
        for id in ids.into_iter() {
            let rev = revisions.get(id)?;
            if rev.tags_rooted.is_empty() && rev.branches_rooted.is_empty() {
                continue;
            }

            // The dead 1.x revision CVS synthesizes when a file is added on
            // a branch has no usable content; it is never a copy source for
            // the symbols rooted at it.
            if rev.added_on_branch {
                continue;
            }

            // Deleted and folded revisions are not usable copy sources.
            if !matches!(rev.op, RevisionOp::Add | RevisionOp::Change) {
                continue;
            }

            let opening_revnum = match rev_svn.get(&rev.id) {
                Some(revnum) => *revnum,
                None => continue,
            };
            let closing_revnum = rev
                .next
                .and_then(|next| rev_svn.get(&next))
                .copied();

            let file = files.get(rev.file.0)?;
            let path = ctx.layout.file_path(&rev.lod, &file.path, &symbols);

            for symbol in rev.tags_rooted.iter().chain(rev.branches_rooted.iter()) {
                raw.write_line(
                    &Symboling {
                        symbol: *symbol,
                        revnum: opening_revnum,
                        kind: SymbolingKind::Opening,
                        path: path.clone(),
                    }
                    .to_string(),
                )?;
                openings += 1;

                if let Some(closing_revnum) = closing_revnum {
                    raw.write_line(
                        &Symboling {
                            symbol: *symbol,
                            revnum: closing_revnum,
                            kind: SymbolingKind::Closing,
                            path: path.clone(),
                        }
                        .to_string(),
                    )?;
                }
            }
        }
        raw.finish()?;

        let sorted_path = ctx.scratch.path(Artifact::Symbolings);
        sort_lines(&raw_path, &sorted_path, ctx.sort_run_lines)?;
        ctx.scratch.remove(Artifact::SymbolingsRaw)?;

        // Byte offset of each symbol's first line in the sorted log.
        let mut offsets: HashMap<SymbolId, u64> = HashMap::new();
        let mut offset = 0u64;
        for line in LineReader::open(&sorted_path)? {
            let line = line?;
            let entry = Symboling::parse(&line)?;
            offsets.entry(entry.symbol).or_insert(offset);
            offset += line.len() as u64 + 1;
        }
        write_db(&ctx.scratch.path(Artifact::SymbolOffsets), &offsets)?;

        log::info!(
            "logged {} opening(s) for {} symbol(s)",
            openings,
            offsets.len()
        );
        Ok(())
    }
}
