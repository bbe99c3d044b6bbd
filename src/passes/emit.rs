//! Pass 8: walk the scheduled commits, drive the repository mirror, and
//! stream the dumpfile through the delegates.

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufWriter,
};

use anyhow::{anyhow, ensure, Context as _};
use cvs_svn_export_model::{
    Changeset, CvsFile, CvsRevision, Digest, Lod, Metadata, RevId, RevisionOp, SvnCommit,
    SvnCommitKind, SymbolId, SymbolKind, SymbolTable,
};
use cvs_svn_export_process::{preflight, Loader};
use cvs_svn_export_store::{read_db, Artifact, StoreReader};
use svn_mirror::{Mirror, MirrorDelegate, RevProps};

use crate::{
    checkout::CheckoutEngine,
    context::Context,
    delegates::{Delegate, DumpfileDelegate, StdoutDelegate},
    encoding, fill,
    pass::Pass,
    symbolings::SymbolingsReader,
};

pub struct EmitPass;

impl Pass for EmitPass {
    fn name(&self) -> &'static str {
        "emit"
    }

    fn requires(&self) -> &'static [Artifact] {
        &[
            Artifact::SvnCommitDb,
            Artifact::ChangesetStore,
            Artifact::RevisionStore,
            Artifact::CvsFileDb,
            Artifact::SymbolDb,
            Artifact::MetadataDb,
            Artifact::RcsDeltas,
            Artifact::RcsTrees,
            Artifact::Symbolings,
            Artifact::SymbolOffsets,
            Artifact::LastSymbolSources,
        ]
    }

    fn produces(&self) -> &'static [Artifact] {
        &[Artifact::NodeStore, Artifact::Dumpfile]
    }

    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let scratch = &ctx.scratch;

        let symbols: SymbolTable = read_db(&scratch.path(Artifact::SymbolDb))?;
        let metadata: HashMap<Digest, Metadata> = read_db(&scratch.path(Artifact::MetadataDb))?;
        let last_sources: HashMap<SymbolId, RevId> =
            read_db(&scratch.path(Artifact::LastSymbolSources))?;

        let mut delegates: Vec<Box<dyn MirrorDelegate>> = Vec::new();

        let dumpfile_path = ctx.dumpfile_path();
        delegates.push(Box::new(Delegate::Dumpfile(
            DumpfileDelegate::new(BufWriter::new(File::create(&dumpfile_path)?))
                .map_err(|e| anyhow!("cannot open dumpfile stream: {}", e))?,
        )));

        let loader = match &ctx.svn_target {
            Some(repo) => {
                preflight(&ctx.svnadmin).map_err(|e| anyhow!("{}", e))?;
                let (loader, stdin) =
                    Loader::spawn(&ctx.svnadmin, repo).map_err(|e| anyhow!("{}", e))?;
                delegates.push(Box::new(Delegate::Load(
                    DumpfileDelegate::new(stdin).map_err(|e| anyhow!("{}", e))?,
                )));
                Some(loader)
            }
            None => None,
        };

        if ctx.report_actions {
            delegates.push(Box::new(Delegate::Stdout(StdoutDelegate)));
        }

        let mut emitter = Emitter {
            ctx,
            commits: StoreReader::open(&scratch.path(Artifact::SvnCommitDb))?,
            changesets: StoreReader::open(&scratch.path(Artifact::ChangesetStore))?,
            revisions: StoreReader::open(&scratch.path(Artifact::RevisionStore))?,
            files: StoreReader::open(&scratch.path(Artifact::CvsFileDb))?,
            metadata,
            engine: CheckoutEngine::new(
                StoreReader::open(&scratch.path(Artifact::RcsDeltas))?,
                StoreReader::open(&scratch.path(Artifact::RcsTrees))?,
            ),
            symbolings: SymbolingsReader::open(
                &scratch.path(Artifact::Symbolings),
                &scratch.path(Artifact::SymbolOffsets),
            )?,
            mirror: Mirror::new(
                &scratch.path(Artifact::NodeStore),
                ctx.layout.clone(),
                symbols.clone(),
                delegates,
            )?,
            symbols,
            filled: HashSet::new(),
        };

        let emitted = emitter.run()?;

        for symbol in last_sources.keys() {
            if !emitter.filled.contains(symbol) {
                log::warn!(
                    "symbol {} has sources but was never filled",
                    emitter.symbols.get(*symbol).name
                );
            }
        }

        emitter.mirror.finish()?;
        let leftovers = emitter.engine.finish();
        if leftovers > 0 {
            log::warn!(
                "checkout engine finished with {} leftover entrie(s); see warnings above",
                leftovers
            );
        }
        drop(emitter);

        if let Some(loader) = loader {
            loader.wait().map_err(|e| anyhow!("{}", e))?;
        }

        log::info!(
            "emitted {} revision(s) to {}",
            emitted,
            dumpfile_path.display()
        );
        Ok(())
    }
}

struct Emitter<'a> {
    ctx: &'a Context,
    commits: StoreReader<SvnCommit>,
    changesets: StoreReader<Changeset>,
    revisions: StoreReader<CvsRevision>,
    files: StoreReader<CvsFile>,
    metadata: HashMap<Digest, Metadata>,
    engine: CheckoutEngine,
    symbolings: SymbolingsReader,
    mirror: Mirror,
    symbols: SymbolTable,
    filled: HashSet<SymbolId>,
}

impl Emitter<'_> {
    fn run(&mut self) -> anyhow::Result<u32> {
        let mut last_date = i64::MIN;
        let mut last_revnum = 0u32;

        let seqs: Vec<u32> = self.commits.ids().collect();

        // A symbol split during cycle breaking fills in parts; its
        // symbolings are only released after the last part.
        let mut fill_parts: HashMap<SymbolId, u32> = HashMap::new();
        for seq in seqs.iter() {
            if let SvnCommitKind::SymbolFill { symbol } = self.commits.get(*seq)?.kind {
                *fill_parts.entry(symbol).or_insert(0) += 1;
            }
        }

        for seq in seqs.into_iter() {
            let commit = self.commits.get(seq)?;

            // Any divergence from the scheduler's monotone assignment is a
            // bug, not something to paper over.
            ensure!(
                commit.time > last_date,
                "non-increasing timestamp at r{}",
                commit.revnum
            );
            last_date = commit.time;
            last_revnum = commit.revnum;

            let props = self.revprops(&commit)?;
            self.mirror.start_commit(commit.revnum, &props)?;

            match commit.kind.clone() {
                SvnCommitKind::Initialization => {
                    self.mirror.initialize_project()?;
                }
                SvnCommitKind::Primary { changeset } => {
                    self.emit_primary(changeset)?;
                }
                SvnCommitKind::PostCommit {
                    source_revnum,
                    revisions,
                } => {
                    self.emit_post_commit(source_revnum, &revisions)?;
                }
                SvnCommitKind::SymbolFill { symbol } => {
                    let entries = self.symbolings.read_symbol(symbol)?;
                    fill::fill_symbol(
                        &mut self.mirror,
                        self.symbols.get(symbol),
                        &entries,
                        commit.revnum,
                        &self.ctx.layout,
                        &self.symbols,
                    )?;

                    let parts = fill_parts.entry(symbol).or_insert(1);
                    *parts -= 1;
                    if *parts == 0 {
                        self.symbolings.forget(symbol);
                    }
                    self.filled.insert(symbol);
                }
            }

            self.mirror.end_commit()?;
        }

        Ok(last_revnum)
    }

    fn emit_primary(&mut self, changeset_id: cvs_svn_export_model::ChangesetId) -> anyhow::Result<()> {
        let changeset = self.changesets.get(changeset_id.0)?;

        // Deterministic operation order within a commit: by repository path.
        let mut members: Vec<(String, CvsRevision, CvsFile)> = Vec::new();
        for rev_id in changeset.revisions.iter() {
            let rev = self.revisions.get(rev_id.0)?;
            let file = self.files.get(rev.file.0)?;
            let path = self.ctx.layout.file_path(&rev.lod, &file.path, &self.symbols);
            members.push((path, rev, file));
        }
        members.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, rev, file) in members.into_iter() {
            ensure!(
                !rev.added_on_branch,
                "synthesized add-on-branch revision {} of {} scheduled as a real operation",
                rev.num,
                file.path
            );

            let suppress = !file.is_binary();
            let cvs_revnum = if self.ctx.cvs_revnums {
                Some(rev.num.to_string())
            } else {
                None
            };

            match rev.op {
                RevisionOp::Add => {
                    let text = self.engine.checkout(rev.file, rev.id, suppress)?;
                    self.mirror
                        .add_file(&rev.lod, &file.path, &text, file.executable, cvs_revnum)?;
                }
                RevisionOp::Change => {
                    let text = self.engine.checkout(rev.file, rev.id, suppress)?;
                    self.mirror
                        .change_file(&rev.lod, &file.path, &text, file.executable, cvs_revnum)?;
                }
                RevisionOp::Delete => {
                    self.engine.skip(rev.file, rev.id)?;
                    self.mirror.delete_path(&rev.lod, &file.path, self.ctx.prune)?;
                }
                RevisionOp::Noop => {
                    self.engine.skip(rev.file, rev.id)?;
                }
            }
        }

        Ok(())
    }

    /// Projects the default-branch changes of the preceding primary commit
    /// onto their trunk counterparts.
    fn emit_post_commit(&mut self, source_revnum: u32, revisions: &[RevId]) -> anyhow::Result<()> {
        for rev_id in revisions.iter() {
            let rev = self.revisions.get(rev_id.0)?;
            let file = self.files.get(rev.file.0)?;

            match rev.op {
                RevisionOp::Add | RevisionOp::Change => {
                    if self.mirror.path_exists(&Lod::Trunk, &file.path)? {
                        self.mirror.delete_path(&Lod::Trunk, &file.path, false)?;
                    }
                    self.mirror
                        .copy_path(&file.path, &rev.lod, &Lod::Trunk, source_revnum)?;
                }
                RevisionOp::Delete => {
                    if self.mirror.path_exists(&Lod::Trunk, &file.path)? {
                        self.mirror
                            .delete_path(&Lod::Trunk, &file.path, self.ctx.prune)?;
                    }
                }
                RevisionOp::Noop => {}
            }
        }

        Ok(())
    }

    fn revprops(&mut self, commit: &SvnCommit) -> anyhow::Result<RevProps> {
        if let SvnCommitKind::Primary { changeset } = &commit.kind {
            let changeset = self.changesets.get(changeset.0)?;
            let first = changeset
                .revisions
                .first()
                .context("primary commit with no revisions")?;
            let digest = self.revisions.get(first.0)?.digest;
            let metadata = self
                .metadata
                .get(&digest)
                .with_context(|| format!("no metadata for digest {}", digest))?;

            return Ok(RevProps {
                author: encoding::decode_meta(&metadata.author, &self.ctx.encodings),
                log: encoding::decode_meta(&metadata.log, &self.ctx.encodings),
                date: commit.time,
            });
        }

        let log = match &commit.kind {
            SvnCommitKind::Initialization => {
                String::from("Create the standard project directory layout.")
            }
            SvnCommitKind::PostCommit { source_revnum, .. } => format!(
                "This commit was generated to synchronize the trunk with revision {} of the default branch.",
                source_revnum
            ),
            SvnCommitKind::SymbolFill { symbol } => {
                let symbol = self.symbols.get(*symbol);
                format!(
                    "This commit was manufactured to create {} '{}'.",
                    match symbol.kind {
                        SymbolKind::Branch => "branch",
                        SymbolKind::Tag => "tag",
                    },
                    symbol.name
                )
            }
            SvnCommitKind::Primary { .. } => unreachable!(),
        };

        Ok(RevProps {
            author: self.ctx.username.clone().into_bytes(),
            log: log.into_bytes(),
            date: commit.time,
        })
    }
}
