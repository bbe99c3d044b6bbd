use cvs_svn_export_store::{Artifact, ArtifactManager};

use crate::{context::Context, passes};

/// One step of the conversion pipeline. Passes declare the artifacts they
/// consume and produce; the runner checks inputs before starting a pass and
/// garbage-collects artifacts after their last consumer, which is what makes
/// any contiguous sub-range of passes re-runnable.
pub trait Pass {
    fn name(&self) -> &'static str;
    fn requires(&self) -> &'static [Artifact];
    fn produces(&self) -> &'static [Artifact];
    fn run(&self, ctx: &Context) -> anyhow::Result<()>;
}

pub fn all_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(passes::collect::CollectPass),
        Box::new(passes::resync::ResyncPass),
        Box::new(passes::sort::SortPass),
        Box::new(passes::index::IndexPass),
        Box::new(passes::group::GroupPass),
        Box::new(passes::schedule::SchedulePass),
        Box::new(passes::symbolings::SymbolingsPass),
        Box::new(passes::emit::EmitPass),
    ]
}

/// Runs passes `start..=end` (1-based).
pub fn run(ctx: &Context, start: usize, end: usize) -> anyhow::Result<()> {
    let passes = all_passes();
    anyhow::ensure!(
        start >= 1 && start <= end && end <= passes.len(),
        "pass range {}..={} is outside 1..={}",
        start,
        end,
        passes.len()
    );

    let mut manager = ArtifactManager::new(ctx.scratch.clone(), ctx.keep_artifacts);
    for (index, pass) in passes.iter().enumerate() {
        manager.register(index + 1, pass.requires());
    }

    for (index, pass) in passes.iter().enumerate() {
        let number = index + 1;
        if number < start {
            continue;
        }
        if number > end {
            break;
        }

        manager.check_requires(pass.name(), pass.requires())?;
        log::info!("----- pass {} ({}) -----", number, pass.name());
        pass.run(ctx)?;
        manager.pass_done(number)?;
    }

    Ok(())
}
