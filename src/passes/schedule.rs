//! Pass 6: topological emission order, revision numbering, and timestamp
//! assignment.
//!
//! The scheduler is the only authority over output timestamps: every
//! commit gets `max(its changeset's earliest member time, last + 1)`, which
//! the dumpfile relies on for strictly increasing `svn:date` values. Primary
//! commits that touch non-trunk default-branch revisions are followed
//! immediately by a synthesized trunk synchronization commit.

use std::collections::HashMap;

use anyhow::Context as _;
use changeset::ChangesetGraph;
use comma_v::RevNum;
use cvs_svn_export_model::{
    Changeset, ChangesetKind, CvsRevision, FileId, RevId, SvnCommit, SvnCommitKind,
};
use cvs_svn_export_store::{read_db, write_db, Artifact, StoreReader, StoreWriter};

use crate::{context::Context, pass::Pass};

pub struct SchedulePass;

impl Pass for SchedulePass {
    fn name(&self) -> &'static str {
        "schedule"
    }

    fn requires(&self) -> &'static [Artifact] {
        &[
            Artifact::ChangesetGraphDb,
            Artifact::ChangesetStore,
            Artifact::RevisionStore,
            Artifact::DefaultBranches,
        ]
    }

    fn produces(&self) -> &'static [Artifact] {
        &[Artifact::SvnCommitDb, Artifact::RevSvnMap]
    }

    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let graph: ChangesetGraph = read_db(&ctx.scratch.path(Artifact::ChangesetGraphDb))?;
        let mut changesets: StoreReader<Changeset> =
            StoreReader::open(&ctx.scratch.path(Artifact::ChangesetStore))?;
        let mut revisions: StoreReader<CvsRevision> =
            StoreReader::open(&ctx.scratch.path(Artifact::RevisionStore))?;
        let default_branches: HashMap<FileId, RevNum> =
            read_db(&ctx.scratch.path(Artifact::DefaultBranches))?;

        // Trunk synchronization stops once a file has a real trunk commit:
        // the cutoff is the earliest emitted trunk revision above the root.
        let trunk_root = RevNum::parse(b"1.1").unwrap();
        let mut sync_cutoff: HashMap<FileId, i64> = HashMap::new();
        if !default_branches.is_empty() {
            let ids: Vec<u32> = revisions.ids().collect();
            for id in ids.into_iter() {
                let rev = revisions.get(id)?;
                if !default_branches.contains_key(&rev.file)
                    || !rev.lod.is_trunk()
                    || !rev.is_emitted()
                    || rev.num == trunk_root
                {
                    continue;
                }

                let cutoff = sync_cutoff.entry(rev.file).or_insert(i64::MAX);
                *cutoff = (*cutoff).min(rev.time);
            }
        }

        let scheduled = changeset::schedule(&graph).context("scheduling changesets")?;

        let mut commits = StoreWriter::create(&ctx.scratch.path(Artifact::SvnCommitDb))?;
        let mut rev_svn: HashMap<RevId, u32> = HashMap::new();

        let mut seq = 0u32;
        let mut revnum = 0u32;
        let mut last_time = i64::MIN;
        let mut push = |commits: &mut StoreWriter<SvnCommit>,
                        seq: &mut u32,
                        revnum: u32,
                        time: i64,
                        kind: SvnCommitKind|
         -> anyhow::Result<()> {
            commits.put(
                *seq,
                &SvnCommit {
                    revnum,
                    time,
                    kind,
                },
            )?;
            *seq += 1;
            Ok(())
        };

        // r1 creates the project directories, dated just before the first
        // real commit.
        let first_time = scheduled.first().map(|s| s.time).unwrap_or(0);
        revnum += 1;
        last_time = first_time - 1;
        push(
            &mut commits,
            &mut seq,
            revnum,
            last_time,
            SvnCommitKind::Initialization,
        )?;

        for entry in scheduled.iter() {
            let changeset = changesets.get(entry.id.0)?;
            let time = entry.time.max(last_time + 1);
            last_time = time;
            revnum += 1;

            match changeset.kind {
                ChangesetKind::Symbol(symbol) => {
                    push(
                        &mut commits,
                        &mut seq,
                        revnum,
                        time,
                        SvnCommitKind::SymbolFill { symbol },
                    )?;
                }
                ChangesetKind::Revision => {
                    let primary_revnum = revnum;
                    push(
                        &mut commits,
                        &mut seq,
                        primary_revnum,
                        time,
                        SvnCommitKind::Primary {
                            changeset: changeset.id,
                        },
                    )?;

                    let mut synchronized: Vec<RevId> = Vec::new();
                    for rev_id in changeset.revisions.iter() {
                        rev_svn.insert(*rev_id, primary_revnum);

                        let rev = revisions.get(rev_id.0)?;
                        let syncs = rev.default_branch
                            && rev.is_emitted()
                            && default_branches.contains_key(&rev.file)
                            && sync_cutoff
                                .get(&rev.file)
                                .map_or(true, |cutoff| rev.time < *cutoff);
                        if syncs {
                            synchronized.push(*rev_id);
                        }
                    }

                    if !synchronized.is_empty() {
                        revnum += 1;
                        last_time += 1;
                        push(
                            &mut commits,
                            &mut seq,
                            revnum,
                            last_time,
                            SvnCommitKind::PostCommit {
                                source_revnum: primary_revnum,
                                revisions: synchronized,
                            },
                        )?;
                    }
                }
            }
        }

        commits.finish()?;
        write_db(&ctx.scratch.path(Artifact::RevSvnMap), &rev_svn)?;

        log::info!("scheduled {} output revision(s)", revnum);
        Ok(())
    }
}
