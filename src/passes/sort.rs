//! Pass 3: external sort of the cleaned records by `(time, digest)`, which
//! is what the record line prefix encodes.

use cvs_svn_export_store::{sort_lines, Artifact};

use crate::{context::Context, pass::Pass};

pub struct SortPass;

impl Pass for SortPass {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn requires(&self) -> &'static [Artifact] {
        &[Artifact::CleanRecords]
    }

    fn produces(&self) -> &'static [Artifact] {
        &[Artifact::SortedRecords]
    }

    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        sort_lines(
            &ctx.scratch.path(Artifact::CleanRecords),
            &ctx.scratch.path(Artifact::SortedRecords),
            ctx.sort_run_lines,
        )?;

        Ok(())
    }
}
