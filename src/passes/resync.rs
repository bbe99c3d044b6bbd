//! Pass 2: timestamp resynchronization.
//!
//! CVS stamps each file revision with that file's own mtime, so members of
//! one logical commit can disagree by seconds and a branch point can
//! postdate its children. Pass 1 left a hint per detected inversion; here
//! every record whose digest and original time match a hint is rewritten,
//! and the hint's interval widens so near neighbors land in the same
//! commit bucket.

use std::collections::HashMap;

use cvs_svn_export_model::{revision_from_line, revision_to_line, Digest, ResyncHint};
use cvs_svn_export_store::{read_db, Artifact, LineReader, LineWriter};

use crate::{context::Context, pass::Pass};

pub struct ResyncPass;

impl Pass for ResyncPass {
    fn name(&self) -> &'static str {
        "resync"
    }

    fn requires(&self) -> &'static [Artifact] {
        &[Artifact::RevisionRecords, Artifact::ResyncHints]
    }

    fn produces(&self) -> &'static [Artifact] {
        &[Artifact::CleanRecords]
    }

    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut hints: HashMap<Digest, Vec<ResyncHint>> =
            read_db(&ctx.scratch.path(Artifact::ResyncHints))?;

        let mut rewritten = 0usize;
        let mut out = LineWriter::create(&ctx.scratch.path(Artifact::CleanRecords))?;

        for line in LineReader::open(&ctx.scratch.path(Artifact::RevisionRecords))? {
            let mut rev = revision_from_line(&line?)?;

            if let Some(hints) = hints.get_mut(&rev.digest) {
                if let Some(hint) = hints.iter_mut().find(|hint| hint.contains(rev.time)) {
                    log::debug!(
                        "resync: revision {} moved {} -> {}",
                        rev.id,
                        rev.time,
                        hint.replacement
                    );
                    rev.time = hint.replacement;
                    hint.widen(ctx.threshold / 2);
                    rewritten += 1;
                }
            }

            out.write_line(&revision_to_line(&rev)?)?;
        }

        out.finish()?;
        log::info!("resynchronized {} timestamp(s)", rewritten);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cvs_svn_export_model::{CvsRevision, Digest, FileId, Lod, RevId, RevisionOp};
    use cvs_svn_export_store::{write_db, Scratch};

    use super::*;

    fn rev(id: u32, time: i64, digest: Digest) -> CvsRevision {
        CvsRevision {
            id: RevId(id),
            file: FileId(0),
            num: comma_v::RevNum::parse(b"1.1").unwrap(),
            lod: Lod::Trunk,
            op: RevisionOp::Add,
            time,
            digest,
            deltatext_empty: false,
            prev: None,
            next: None,
            branch_children: vec![],
            tags_rooted: vec![],
            branches_rooted: vec![],
            added_on_branch: false,
            default_branch: false,
        }
    }

    #[test]
    fn test_hint_application_and_widening() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(dir.path()).unwrap();

        let digest = Digest([7; 16]);
        let mut writer = LineWriter::create(&scratch.path(Artifact::RevisionRecords)).unwrap();
        // In range; rewritten.
        writer
            .write_line(&revision_to_line(&rev(0, 100, digest)).unwrap())
            .unwrap();
        // Within the widened interval only; rewritten because it streams
        // after the first hit.
        writer
            .write_line(&revision_to_line(&rev(1, 160, digest)).unwrap())
            .unwrap();
        // Different digest; untouched.
        writer
            .write_line(&revision_to_line(&rev(2, 100, Digest([9; 16]))).unwrap())
            .unwrap();
        writer.finish().unwrap();

        let mut hints: HashMap<Digest, Vec<ResyncHint>> = HashMap::new();
        hints.insert(
            digest,
            vec![ResyncHint {
                lower: 100,
                upper: 100,
                replacement: 400,
            }],
        );
        write_db(&scratch.path(Artifact::ResyncHints), &hints).unwrap();

        let ctx = Context {
            cvsroot: dir.path().into(),
            scratch: scratch.clone(),
            layout: Default::default(),
            threshold: 300,
            trunk_only: false,
            prune: true,
            username: "cvs2svn".into(),
            cvs_revnums: false,
            encodings: vec![crate::encoding::Encoding::Utf8],
            force_branch: vec![],
            force_tag: vec![],
            dumpfile: None,
            svn_target: None,
            svnadmin: "svnadmin".into(),
            report_actions: false,
            keep_artifacts: true,
            sort_run_lines: 1000,
        };

        ResyncPass.run(&ctx).unwrap();

        let times: Vec<i64> = LineReader::open(&scratch.path(Artifact::CleanRecords))
            .unwrap()
            .map(|line| revision_from_line(&line.unwrap()).unwrap().time)
            .collect();

        assert_eq!(times, vec![400, 400, 100]);
    }
}
