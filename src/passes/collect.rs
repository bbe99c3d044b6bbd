//! Pass 1: walk the CVS repository, parse every `,v` file, and write the
//! raw conversion inputs: revision records, resync hints, the symbol and
//! metadata databases, the delta store, and the per-file LOD trees.

use std::{
    collections::{HashMap, HashSet},
    fs,
    os::unix::prelude::{OsStrExt, PermissionsExt},
    path::Path,
};

use anyhow::{anyhow, bail, Context as _};
use comma_v::RevNum;
use cvs_svn_export_model::{
    revision_to_line, CvsFile, CvsRevision, Digest, FileId, FileTrees, Lod, LodTree, Metadata,
    ResyncHint, RevId, RevisionOp, SymbolId, SymbolKind, SymbolTable,
};
use cvs_svn_export_store::{write_db, Artifact, LineWriter, StoreWriter};
use md5::{Digest as _, Md5};
use rcs_ed::{serialize, File as TextFile, Script};
use walkdir::WalkDir;

use crate::{context::Context, encoding, pass::Pass};

pub struct CollectPass;

impl Pass for CollectPass {
    fn name(&self) -> &'static str {
        "collect"
    }

    fn requires(&self) -> &'static [Artifact] {
        &[]
    }

    fn produces(&self) -> &'static [Artifact] {
        &[
            Artifact::RevisionRecords,
            Artifact::ResyncHints,
            Artifact::MetadataDb,
            Artifact::CvsFileDb,
            Artifact::DefaultBranches,
            Artifact::SymbolDb,
            Artifact::RcsDeltas,
            Artifact::RcsTrees,
        ]
    }

    fn run(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut collector = Collector::new(ctx)?;

        for entry in WalkDir::new(&ctx.cvsroot).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !entry.path().as_os_str().as_bytes().ends_with(b",v") {
                log::trace!("ignoring {} due to non-,v suffix", entry.path().display());
                continue;
            }

            log::trace!("processing {}", entry.path().display());
            if let Err(e) = collector.collect_file(entry.path()) {
                log::error!("error processing {}: {:#}", entry.path().display(), e);
                collector.failures += 1;
            }
        }

        collector.finish()
    }
}

/// What the visitor gathers from one `,v` file before graph construction.
#[derive(Default)]
struct FileScan {
    principal_branch: Option<RevNum>,
    expand: Option<String>,
    symbols: Vec<(Vec<u8>, RevNum)>,
    deltas: Vec<ScanDelta>,
    texts: HashMap<RevNum, ScanText>,
}

struct ScanDelta {
    num: RevNum,
    time: i64,
    author: Vec<u8>,
    dead: bool,
    branches: Vec<RevNum>,
    next: Option<RevNum>,
}

struct ScanText {
    log: Vec<u8>,
    text: Vec<u8>,
}

impl comma_v::Visitor for FileScan {
    type Error = anyhow::Error;

    fn set_principal_branch(&mut self, num: &RevNum) -> anyhow::Result<()> {
        self.principal_branch = Some(num.clone());
        Ok(())
    }

    fn set_expansion(&mut self, mode: &[u8]) -> anyhow::Result<()> {
        self.expand = Some(String::from_utf8_lossy(mode).into_owned());
        Ok(())
    }

    fn define_tag(&mut self, name: &[u8], num: &RevNum) -> anyhow::Result<()> {
        self.symbols.push((name.to_vec(), num.clone()));
        Ok(())
    }

    fn define_revision(
        &mut self,
        num: &RevNum,
        timestamp: i64,
        author: &[u8],
        state: Option<&[u8]>,
        branches: &[RevNum],
        next: Option<&RevNum>,
    ) -> anyhow::Result<()> {
        self.deltas.push(ScanDelta {
            num: num.clone(),
            time: timestamp,
            author: author.to_vec(),
            dead: state == Some(b"dead".as_ref()),
            branches: branches.to_vec(),
            next: next.cloned(),
        });
        Ok(())
    }

    fn set_revision_info(&mut self, num: &RevNum, log: &[u8], text: &[u8]) -> anyhow::Result<()> {
        self.texts.insert(
            num.clone(),
            ScanText {
                log: log.to_vec(),
                text: text.to_vec(),
            },
        );
        Ok(())
    }
}

struct Collector<'a> {
    ctx: &'a Context,
    symbols: SymbolTable,
    metadata: HashMap<Digest, Metadata>,
    hints: HashMap<Digest, Vec<ResyncHint>>,
    default_branches: HashMap<FileId, RevNum>,
    files: StoreWriter<CvsFile>,
    records: LineWriter,
    deltas: StoreWriter<Vec<u8>>,
    trees: StoreWriter<FileTrees>,
    next_file: u32,
    next_rev: u32,
    failures: usize,
}

impl<'a> Collector<'a> {
    fn new(ctx: &'a Context) -> anyhow::Result<Self> {
        let scratch = &ctx.scratch;

        Ok(Self {
            ctx,
            symbols: SymbolTable::new(),
            metadata: HashMap::new(),
            hints: HashMap::new(),
            default_branches: HashMap::new(),
            files: StoreWriter::create(&scratch.path(Artifact::CvsFileDb))?,
            records: LineWriter::create(&scratch.path(Artifact::RevisionRecords))?,
            deltas: StoreWriter::create(&scratch.path(Artifact::RcsDeltas))?,
            trees: StoreWriter::create(&scratch.path(Artifact::RcsTrees))?,
            next_file: 0,
            next_rev: 0,
            failures: 0,
        })
    }

    fn collect_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let bytes = fs::read(path)?;
        let rcs = comma_v::parse(&bytes).map_err(|e| anyhow!("{}", e))?;

        let mut scan = FileScan::default();
        comma_v::visit(&rcs, &mut scan)?;
        if scan.deltas.is_empty() {
            bail!("file contains no revisions");
        }

        let (rel_path, in_attic) = munge_path(&self.ctx.cvsroot, path, &self.ctx.encodings)?;
        let executable = fs::metadata(path)?.permissions().mode() & 0o111 != 0;
        let file_id = FileId(self.next_file);

        let delta_index: HashMap<&RevNum, usize> = scan
            .deltas
            .iter()
            .enumerate()
            .map(|(index, delta)| (&delta.num, index))
            .collect();

        // Symbols and the revisions they are rooted at.
        let mut rooted_tags: HashMap<RevNum, Vec<SymbolId>> = HashMap::new();
        let mut rooted_branches: HashMap<RevNum, Vec<SymbolId>> = HashMap::new();
        let mut branch_lods: HashMap<RevNum, SymbolId> = HashMap::new();

        if !self.ctx.trunk_only {
            for (name_bytes, num) in scan.symbols.iter() {
                let name = encoding::decode_path(name_bytes, &self.ctx.encodings)
                    .context("symbol name")?;

                if num.is_branch() {
                    let id = self.symbols.intern(&name, SymbolKind::Branch);
                    branch_lods.entry(num.clone()).or_insert(id);

                    match num.sprout() {
                        Some(sprout) if delta_index.contains_key(&sprout) => {
                            rooted_branches.entry(sprout).or_default().push(id);
                        }
                        _ => log::warn!(
                            "{}: branch {} has no sprout revision in this file",
                            rel_path,
                            name
                        ),
                    }
                } else {
                    let id = self.symbols.intern(&name, SymbolKind::Tag);
                    if delta_index.contains_key(num) {
                        rooted_tags.entry(num.clone()).or_default().push(id);
                    } else {
                        log::warn!(
                            "{}: tag {} references nonexistent revision {}",
                            rel_path,
                            name,
                            num
                        );
                    }
                }
            }
        }

        // The head is the trunk revision nothing else points at.
        let nexts: HashSet<&RevNum> = scan
            .deltas
            .iter()
            .filter_map(|delta| delta.next.as_ref())
            .collect();
        let head = scan
            .deltas
            .iter()
            .find(|delta| delta.num.is_trunk_revision() && !nexts.contains(&delta.num))
            .map(|delta| delta.num.clone())
            .ok_or_else(|| anyhow!("cannot determine head revision"))?;

        // Assemble the revision chains, trunk first, parents before the
        // branches that sprout from them.
        let mut chains: Vec<(Lod, Vec<RevNum>)> = Vec::new();

        let mut trunk = Vec::new();
        let mut cursor = Some(head.clone());
        while let Some(num) = cursor {
            let index = *delta_index
                .get(&num)
                .ok_or_else(|| anyhow!("missing delta for revision {}", num))?;
            cursor = scan.deltas[index].next.clone();
            trunk.push(num);
        }
        trunk.reverse();
        chains.push((Lod::Trunk, trunk));

        if !self.ctx.trunk_only {
            for delta in scan.deltas.iter() {
                for first in delta.branches.iter() {
                    let mut chain = Vec::new();
                    let mut cursor = Some(first.clone());
                    while let Some(num) = cursor {
                        let index = *delta_index
                            .get(&num)
                            .ok_or_else(|| anyhow!("missing delta for revision {}", num))?;
                        cursor = scan.deltas[index].next.clone();
                        chain.push(num);
                    }

                    let branch_num = first.branch();
                    let lod = match branch_lods.get(&branch_num) {
                        Some(id) => *id,
                        None => {
                            // A branch with revisions but no symbol name.
                            let id = self.symbols.intern(
                                &format!("unlabeled-{}", branch_num),
                                SymbolKind::Branch,
                            );
                            branch_lods.insert(branch_num.clone(), id);
                            rooted_branches
                                .entry(delta.num.clone())
                                .or_default()
                                .push(id);
                            id
                        }
                    };

                    chains.push((Lod::Branch(lod), chain));
                }
            }
        }

        // Parents before children for the resync walk below.
        chains.sort_by_key(|(_, chain)| chain[0].len());

        // Vendor-import folding: an empty 1.1.1.1 "Initial revision" is the
        // same content as 1.1. With a trunk default branch the import
        // revision disappears; with a vendor default branch 1.1 disappears
        // instead and trunk content comes from post-commit synchronization.
        let vendor_num = RevNum::parse(b"1.1.1.1").unwrap();
        let trunk_root = RevNum::parse(b"1.1").unwrap();
        let vendor_branch = RevNum::parse(b"1.1.1").unwrap();

        let mut fold_vendor = false;
        let mut fold_root = false;
        if !self.ctx.trunk_only
            && delta_index.contains_key(&vendor_num)
            && delta_index.contains_key(&trunk_root)
        {
            let import_shaped = scan.texts.get(&vendor_num).map_or(false, |text| {
                text.text.is_empty() && text.log == b"Initial revision\n".as_ref()
            });

            if import_shaped {
                if scan.principal_branch.as_ref() == Some(&vendor_branch) {
                    fold_root = true;
                } else {
                    fold_vendor = true;
                }
            }
        }

        if fold_vendor {
            if let Some(tags) = rooted_tags.remove(&vendor_num) {
                rooted_tags.entry(trunk_root.clone()).or_default().extend(tags);
            }
        }
        if fold_root {
            if let Some(tags) = rooted_tags.remove(&trunk_root) {
                rooted_tags.entry(vendor_num.clone()).or_default().extend(tags);
            }
        }

        // Dense revision ids, in chain order.
        let mut ids: HashMap<RevNum, RevId> = HashMap::new();
        for (_, chain) in chains.iter() {
            for num in chain.iter() {
                ids.insert(num.clone(), RevId(self.next_rev));
                self.next_rev += 1;
            }
        }

        // Build the revision records chain by chain, detecting timestamp
        // inversions against the (already adjusted) parse-time predecessor.
        let mut revisions: HashMap<RevNum, CvsRevision> = HashMap::new();
        let mut adjusted: HashMap<RevNum, i64> = HashMap::new();

        for (lod, chain) in chains.iter() {
            let chain_branch = if lod.is_trunk() {
                None
            } else {
                Some(chain[0].branch())
            };
            let on_default = chain_branch.as_ref().is_some()
                && chain_branch.as_ref() == scan.principal_branch.as_ref();

            let mut pred_time: Option<i64> = match chain_branch
                .as_ref()
                .and_then(|branch| branch.sprout())
            {
                Some(sprout) => adjusted.get(&sprout).copied(),
                None => None,
            };
            let mut prev_id: Option<RevId> = None;
            let mut prev_num: Option<&RevNum> = None;
            let mut prev_op: Option<RevisionOp> = None;
            let mut prev_live_folded = false;

            for num in chain.iter() {
                let delta = &scan.deltas[delta_index[num]];
                let text = scan
                    .texts
                    .get(num)
                    .ok_or_else(|| anyhow!("missing deltatext for revision {}", num))?;

                let excluded =
                    (fold_vendor && num == &vendor_num) || (fold_root && num == &trunk_root);
                let after_live = matches!(
                    prev_op,
                    Some(RevisionOp::Add) | Some(RevisionOp::Change)
                ) || prev_live_folded;

                let op = if excluded {
                    RevisionOp::Noop
                } else if delta.dead {
                    if after_live {
                        RevisionOp::Delete
                    } else {
                        RevisionOp::Noop
                    }
                } else if after_live {
                    RevisionOp::Change
                } else {
                    RevisionOp::Add
                };

                let added_on_branch = lod.is_trunk() && prev_id.is_none() && delta.dead;

                let digest = metadata_digest(&delta.author, &text.log);
                self.metadata.entry(digest).or_insert_with(|| Metadata {
                    author: delta.author.clone(),
                    log: text.log.clone(),
                });

                let time = delta.time;
                let assigned = match pred_time {
                    Some(pred) if time <= pred => {
                        self.hints.entry(digest).or_default().push(ResyncHint {
                            lower: time,
                            upper: time,
                            replacement: pred + 1,
                        });
                        pred + 1
                    }
                    _ => time,
                };
                adjusted.insert(num.clone(), assigned);
                pred_time = Some(assigned);

                let id = ids[num];
                revisions.insert(
                    num.clone(),
                    CvsRevision {
                        id,
                        file: file_id,
                        num: num.clone(),
                        lod: *lod,
                        op,
                        time,
                        digest,
                        deltatext_empty: text.text.is_empty(),
                        prev: prev_id,
                        next: None,
                        branch_children: delta
                            .branches
                            .iter()
                            .filter_map(|child| ids.get(child).copied())
                            .collect(),
                        tags_rooted: rooted_tags.get(num).cloned().unwrap_or_default(),
                        branches_rooted: rooted_branches.get(num).cloned().unwrap_or_default(),
                        added_on_branch,
                        default_branch: on_default,
                    },
                );

                if let Some(prev) = prev_num {
                    revisions.get_mut(prev).unwrap().next = Some(id);
                }

                prev_id = Some(id);
                prev_num = Some(num);
                prev_op = Some(op);
                prev_live_folded = excluded && !delta.dead;
            }
        }

        // Delta recording. Trunk deltas are inverted so every stored delta
        // applies forward from its tree parent; the tree root stores full
        // text.
        let mut blobs: Vec<(RevId, Vec<u8>)> = Vec::new();

        let trunk_chain = chains[0].1.clone();
        let head_text = &scan
            .texts
            .get(&head)
            .ok_or_else(|| anyhow!("missing head text"))?
            .text;
        let mut current = TextFile::from_bytes(head_text);

        for window in (1..trunk_chain.len()).rev().map(|i| (&trunk_chain[i - 1], &trunk_chain[i])) {
            let (older, newer) = window;
            let commands = Script::parse(&scan.texts[older].text)
                .with_context(|| format!("bad delta for revision {}", older))?;
            let (older_text, inverse) = current
                .apply_with_inverse(&commands)
                .with_context(|| format!("cannot invert delta for revision {}", older))?;

            blobs.push((ids[newer], serialize(&inverse)));
            current = older_text;
        }

        // `current` is now the root (1.1) text.
        if fold_root {
            blobs.push((ids[&vendor_num], current.into_bytes()));
        } else {
            blobs.push((ids[&trunk_chain[0]], current.into_bytes()));
        }

        for (lod, chain) in chains.iter() {
            if lod.is_trunk() {
                continue;
            }
            for num in chain.iter() {
                if fold_vendor && num == &vendor_num {
                    continue;
                }
                if fold_root && num == &vendor_num {
                    // Stored above as the tree root's full text.
                    continue;
                }
                blobs.push((ids[num], scan.texts[num].text.clone()));
            }
        }

        // LOD trees for the checkout engine, with the fold rewiring and
        // trailing dead revisions pruned.
        let mut lods: Vec<LodTree> = Vec::new();
        for (lod, chain) in chains.iter() {
            let is_vendor_chain = chain[0] == vendor_num;

            let mut nums: Vec<&RevNum> = chain.iter().collect();
            let mut sprout = if lod.is_trunk() {
                None
            } else {
                chain[0].branch().sprout().map(|num| {
                    if fold_root && num == trunk_root {
                        ids[&vendor_num]
                    } else {
                        ids[&num]
                    }
                })
            };

            if lod.is_trunk() && fold_root {
                nums.retain(|num| **num != trunk_root);
                sprout = Some(ids[&vendor_num]);
            }
            if is_vendor_chain && fold_vendor {
                nums.retain(|num| **num != vendor_num);
                sprout = Some(ids[&trunk_root]);
            }
            if is_vendor_chain && fold_root {
                // The import revision is the tree root with full text.
                sprout = None;
            }

            while let Some(last) = nums.last() {
                let rev = &revisions[*last];
                let prunable = matches!(rev.op, RevisionOp::Delete | RevisionOp::Noop)
                    && rev.branch_children.is_empty();
                if prunable {
                    nums.pop();
                } else {
                    break;
                }
            }

            if !nums.is_empty() {
                lods.push(LodTree {
                    sprout,
                    revisions: nums.iter().map(|num| ids[*num]).collect(),
                });
            }
        }

        let kept: HashSet<RevId> = lods
            .iter()
            .flat_map(|tree| tree.revisions.iter().copied())
            .collect();

        // All fallible work is done; persist this file's outputs.
        for (_, chain) in chains.iter() {
            for num in chain.iter() {
                self.records
                    .write_line(&revision_to_line(&revisions[num])?)?;
            }
        }

        for (id, bytes) in blobs.into_iter() {
            if kept.contains(&id) {
                self.deltas.put(id.0, &bytes)?;
            }
        }

        self.trees.put(file_id.0, &FileTrees { lods })?;
        self.files.put(
            file_id.0,
            &CvsFile {
                id: file_id,
                path: rel_path,
                in_attic,
                executable,
                expand: scan.expand.clone(),
            },
        )?;

        if let Some(branch) = scan.principal_branch.clone() {
            self.default_branches.insert(file_id, branch);
        }

        self.next_file += 1;
        Ok(())
    }

    fn finish(mut self) -> anyhow::Result<()> {
        if self.failures > 0 {
            bail!("{} file(s) failed to convert", self.failures);
        }

        self.symbols
            .resolve_kinds(&self.ctx.force_branch, &self.ctx.force_tag)
            .map_err(|conflicts| {
                anyhow!(
                    "symbols used as both tag and branch (use --force-branch/--force-tag): {}",
                    conflicts.join(", ")
                )
            })?;

        let scratch = &self.ctx.scratch;
        write_db(&scratch.path(Artifact::SymbolDb), &self.symbols)?;
        write_db(&scratch.path(Artifact::MetadataDb), &self.metadata)?;
        write_db(&scratch.path(Artifact::ResyncHints), &self.hints)?;
        write_db(&scratch.path(Artifact::DefaultBranches), &self.default_branches)?;

        self.files.finish()?;
        self.deltas.finish()?;
        self.trees.finish()?;
        self.records.finish()?;

        log::info!(
            "collected {} file(s), {} revision(s), {} symbol(s)",
            self.next_file,
            self.next_rev,
            self.symbols.len()
        );
        Ok(())
    }
}

fn metadata_digest(author: &[u8], log: &[u8]) -> Digest {
    let mut hasher = Md5::new();
    hasher.update(author);
    hasher.update(b"\0");
    hasher.update(log);
    Digest(hasher.finalize().into())
}

/// Strips the CVSROOT prefix, the `,v` suffix, and a trailing `Attic`
/// directory from a repository path.
fn munge_path(
    cvsroot: &Path,
    path: &Path,
    encodings: &[encoding::Encoding],
) -> anyhow::Result<(String, bool)> {
    let rel = path.strip_prefix(cvsroot).unwrap_or(path);
    let text = encoding::decode_path(rel.as_os_str().as_bytes(), encodings)?;
    let text = text
        .strip_suffix(",v")
        .ok_or_else(|| anyhow!("not a ,v file: {}", text))?;

    let mut components: Vec<&str> = text.split('/').collect();
    let in_attic = components.len() >= 2 && components[components.len() - 2] == "Attic";
    if in_attic {
        components.remove(components.len() - 2);
    }

    Ok((components.join("/"), in_attic))
}
