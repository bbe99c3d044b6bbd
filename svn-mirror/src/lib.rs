//! A content-free mirror of the output repository's directory structure.
//!
//! The mirror tracks one immutable tree per line of development (and per
//! symbol being filled). Mutations happen inside a `start_commit` /
//! `end_commit` transaction: touched directories are cloned copy-on-write
//! into the transaction, threaded up to the LOD root, and persisted to the
//! node store when the commit ends. Old revisions stay addressable forever,
//! which is what makes symbol fills cheap — a directory copy is one shared
//! node id.
//!
//! Every structural operation is echoed to the registered delegates, which
//! is how the dumpfile gets written.

use std::{collections::HashMap, path::Path};

use cvs_svn_export_model::{Layout, Lod, SymbolTable};

mod delegate;
pub use delegate::{FileContent, MirrorDelegate, PathKind, RevProps};

mod error;
pub use error::Error;

mod history;
use history::LodHistory;

mod node;
pub use node::{DirEntries, NodeId};
use node::NodeStore;

#[derive(Debug)]
struct Txn {
    revnum: u32,
    nodes: HashMap<NodeId, DirEntries>,
}

/// The chain of writable directories leading to an operation's target.
struct CowChain {
    /// Node ids from the LOD root down to the target directory.
    ids: Vec<NodeId>,
    /// Full paths of directories created along the way, LOD base first if
    /// the LOD itself was created.
    created: Vec<String>,
}

pub struct Mirror {
    store: NodeStore,
    histories: HashMap<Lod, LodHistory>,
    delegates: Vec<Box<dyn MirrorDelegate>>,
    layout: Layout,
    symbols: SymbolTable,
    next_node: u64,
    txn: Option<Txn>,
}

impl Mirror {
    pub fn new(
        node_store_path: &Path,
        layout: Layout,
        symbols: SymbolTable,
        delegates: Vec<Box<dyn MirrorDelegate>>,
    ) -> Result<Self, Error> {
        Ok(Self {
            store: NodeStore::create(node_store_path)?,
            histories: HashMap::new(),
            delegates,
            layout,
            symbols,
            next_node: 0,
            txn: None,
        })
    }

    /// The repository base directory of a mirror root: the trunk directory,
    /// or the symbol's home under the branches or tags root.
    pub fn base(&self, lod: &Lod) -> String {
        match lod {
            Lod::Trunk => self.layout.trunk.clone(),
            Lod::Branch(id) => self.layout.symbol_base(self.symbols.get(*id)),
        }
    }

    pub fn full_path(&self, lod: &Lod, rel_path: &str) -> String {
        if rel_path.is_empty() {
            self.base(lod)
        } else {
            format!("{}/{}", self.base(lod), rel_path)
        }
    }

    /// Opens a new writable youngest revision.
    pub fn start_commit(&mut self, revnum: u32, props: &RevProps) -> Result<(), Error> {
        debug_assert!(self.txn.is_none(), "commit already open");
        self.txn = Some(Txn {
            revnum,
            nodes: HashMap::new(),
        });

        for delegate in self.delegates.iter_mut() {
            delegate.start_commit(revnum, props)?;
        }

        Ok(())
    }

    /// Freezes the current revision: new nodes become immutable and are
    /// persisted to the node store.
    pub fn end_commit(&mut self) -> Result<(), Error> {
        let txn = self.txn.take().ok_or(Error::NoCommit)?;

        let mut ids: Vec<NodeId> = txn.nodes.keys().copied().collect();
        ids.sort();
        log::trace!("r{}: persisting {} node(s)", txn.revnum, ids.len());
        for id in ids.into_iter() {
            self.store.append(id, &txn.nodes[&id])?;
        }

        for delegate in self.delegates.iter_mut() {
            delegate.end_commit(txn.revnum)?;
        }

        Ok(())
    }

    /// Creates the project top-level directories and the (empty) trunk root.
    /// Belongs in r1.
    pub fn initialize_project(&mut self) -> Result<(), Error> {
        let dirs: Vec<String> = self
            .layout
            .top_dirs()
            .iter()
            .map(|dir| dir.to_string())
            .collect();

        let txn = self.txn.as_mut().ok_or(Error::NoCommit)?;
        let root = NodeId(self.next_node);
        self.next_node += 1;
        txn.nodes.insert(root, DirEntries::new());
        self.histories
            .entry(Lod::Trunk)
            .or_default()
            .set(txn.revnum, Some(root));

        for delegate in self.delegates.iter_mut() {
            delegate.initialize_project(&dirs)?;
        }

        Ok(())
    }

    /// Brings a root into existence with no copy source, e.g. a branch whose
    /// fill found nothing to copy.
    pub fn initialize_lod(&mut self, lod: &Lod) -> Result<(), Error> {
        let base = self.base(lod);

        let txn = self.txn.as_mut().ok_or(Error::NoCommit)?;
        let history = self.histories.entry(*lod).or_default();
        if history.current().is_some() {
            return Err(Error::PathExists(base));
        }

        let root = NodeId(self.next_node);
        self.next_node += 1;
        txn.nodes.insert(root, DirEntries::new());
        history.set(txn.revnum, Some(root));

        for delegate in self.delegates.iter_mut() {
            delegate.initialize_lod(&base)?;
        }

        Ok(())
    }

    pub fn lod_exists(&self, lod: &Lod) -> bool {
        self.histories
            .get(lod)
            .map(|history| history.current().is_some())
            .unwrap_or(false)
    }

    /// Creates a file leaf, auto-creating parent directories (and the root
    /// itself if need be).
    pub fn add_file(
        &mut self,
        lod: &Lod,
        rel_path: &str,
        text: &[u8],
        executable: bool,
        cvs_revnum: Option<String>,
    ) -> Result<(), Error> {
        let (dirs, name) = split_path(rel_path)?;
        let chain = self.cow_directory(lod, &dirs, true)?;
        let full = self.full_path(lod, rel_path);

        let txn = self.txn.as_mut().unwrap();
        let entries = txn.nodes.get_mut(chain.ids.last().unwrap()).unwrap();
        if entries.contains_key(name) {
            return Err(Error::PathExists(full));
        }
        entries.insert(name.to_string(), None);

        self.emit_created(&chain.created, lod)?;
        let content = FileContent {
            path: &full,
            text,
            executable,
            cvs_revnum,
        };
        for delegate in self.delegates.iter_mut() {
            delegate.add_path(&content)?;
        }

        Ok(())
    }

    /// Registers a content change. The mirror itself is content-free, so
    /// this only validates the path and notifies the delegates.
    pub fn change_file(
        &mut self,
        lod: &Lod,
        rel_path: &str,
        text: &[u8],
        executable: bool,
        cvs_revnum: Option<String>,
    ) -> Result<(), Error> {
        let full = self.full_path(lod, rel_path);
        if self.txn.is_none() {
            return Err(Error::NoCommit);
        }

        let root = self
            .histories
            .get(lod)
            .and_then(|history| history.current())
            .ok_or_else(|| Error::PathMissing(full.clone()))?;
        match self.resolve_from(root, rel_path)? {
            Some(None) => {}
            Some(Some(_)) => return Err(Error::ExpectedDirectory(full)),
            None => return Err(Error::PathMissing(full)),
        }

        let content = FileContent {
            path: &full,
            text,
            executable,
            cvs_revnum,
        };
        for delegate in self.delegates.iter_mut() {
            delegate.change_path(&content)?;
        }

        Ok(())
    }

    /// Removes a path. With `prune`, empty parent directories are removed
    /// too, up to but never including the root. Returns the full path of the
    /// topmost entry actually deleted.
    pub fn delete_path(
        &mut self,
        lod: &Lod,
        rel_path: &str,
        prune: bool,
    ) -> Result<String, Error> {
        let (dirs, name) = split_path(rel_path)?;
        let chain = self.cow_directory(lod, &dirs, false)?;
        let base = self.base(lod);
        let full = self.full_path(lod, rel_path);

        let txn = self.txn.as_mut().unwrap();
        if txn
            .nodes
            .get_mut(chain.ids.last().unwrap())
            .unwrap()
            .remove(name)
            .is_none()
        {
            return Err(Error::PathMissing(full));
        }

        let mut deleted = full;
        if prune {
            // chain.ids[i] holds the directory named by dirs[..i]; walk
            // upward removing directories emptied by the deletion.
            for i in (1..chain.ids.len()).rev() {
                if !txn.nodes.get(&chain.ids[i]).unwrap().is_empty() {
                    break;
                }

                txn.nodes
                    .get_mut(&chain.ids[i - 1])
                    .unwrap()
                    .remove(dirs[i - 1]);
                deleted = format!("{}/{}", base, dirs[..i].join("/"));
            }
        }

        for delegate in self.delegates.iter_mut() {
            delegate.delete_path(&deleted)?;
        }

        Ok(deleted)
    }

    /// Removes a whole root (a branch or tag directory).
    pub fn delete_lod(&mut self, lod: &Lod) -> Result<(), Error> {
        let base = self.base(lod);
        let txn = self.txn.as_mut().ok_or(Error::NoCommit)?;

        let history = self
            .histories
            .get_mut(lod)
            .ok_or_else(|| Error::PathMissing(base.clone()))?;
        if history.current().is_none() {
            return Err(Error::PathMissing(base));
        }
        history.set(txn.revnum, None);

        for delegate in self.delegates.iter_mut() {
            delegate.delete_lod(&base)?;
        }

        Ok(())
    }

    /// Deep-structural copy of a whole root as it stood at `src_revnum`.
    /// Cheap: the destination shares the source's node.
    pub fn copy_lod(&mut self, src: &Lod, dest: &Lod, src_revnum: u32) -> Result<(), Error> {
        let src_base = self.base(src);
        let dest_base = self.base(dest);

        let txn = self.txn.as_mut().ok_or(Error::NoCommit)?;
        let src_root = self
            .histories
            .get(src)
            .and_then(|history| history.root_at(src_revnum))
            .ok_or_else(|| Error::PathMissing(format!("{}@{}", src_base, src_revnum)))?;

        let history = self.histories.entry(*dest).or_default();
        if history.current().is_some() {
            return Err(Error::PathExists(dest_base));
        }
        history.set(txn.revnum, Some(src_root));

        for delegate in self.delegates.iter_mut() {
            delegate.copy_lod(&src_base, &dest_base, src_revnum)?;
        }

        Ok(())
    }

    /// Copies one path from `src` at `src_revnum` to the same relative path
    /// under `dest`, auto-creating destination parents.
    pub fn copy_path(
        &mut self,
        rel_path: &str,
        src: &Lod,
        dest: &Lod,
        src_revnum: u32,
    ) -> Result<(), Error> {
        let src_full = self.full_path(src, rel_path);
        let dest_full = self.full_path(dest, rel_path);

        let src_root = self
            .histories
            .get(src)
            .and_then(|history| history.root_at(src_revnum))
            .ok_or_else(|| Error::PathMissing(format!("{}@{}", src_full, src_revnum)))?;
        let src_entry = self
            .resolve_from(src_root, rel_path)?
            .ok_or_else(|| Error::PathMissing(format!("{}@{}", src_full, src_revnum)))?;

        let kind = match src_entry {
            Some(_) => delegate::PathKind::Directory,
            None => delegate::PathKind::File,
        };

        let (dirs, name) = split_path(rel_path)?;
        let chain = self.cow_directory(dest, &dirs, true)?;

        let txn = self.txn.as_mut().unwrap();
        let entries = txn.nodes.get_mut(chain.ids.last().unwrap()).unwrap();
        if entries.contains_key(name) {
            return Err(Error::PathExists(dest_full));
        }
        entries.insert(name.to_string(), src_entry);

        self.emit_created(&chain.created, dest)?;
        for delegate in self.delegates.iter_mut() {
            delegate.copy_path(&src_full, &dest_full, src_revnum, kind)?;
        }

        Ok(())
    }

    /// The entries of a directory in the revision being built.
    pub fn current_directory(&mut self, lod: &Lod, rel_dir: &str) -> Result<DirEntries, Error> {
        let full = self.full_path(lod, rel_dir);
        let root = self
            .histories
            .get(lod)
            .and_then(|history| history.current())
            .ok_or_else(|| Error::PathMissing(full.clone()))?;

        self.directory_from(root, rel_dir, full)
    }

    /// The entries of a directory as of an already-committed revision.
    pub fn old_directory(
        &mut self,
        lod: &Lod,
        rel_dir: &str,
        revnum: u32,
    ) -> Result<DirEntries, Error> {
        let full = self.full_path(lod, rel_dir);
        let root = self
            .histories
            .get(lod)
            .and_then(|history| history.root_at(revnum))
            .ok_or_else(|| Error::PathMissing(format!("{}@{}", full, revnum)))?;

        self.directory_from(root, rel_dir, full)
    }

    pub fn path_exists(&mut self, lod: &Lod, rel_path: &str) -> Result<bool, Error> {
        let root = match self.histories.get(lod).and_then(|history| history.current()) {
            Some(root) => root,
            None => return Ok(false),
        };

        Ok(self.resolve_from(root, rel_path)?.is_some())
    }

    /// Flushes the node store and index and tells the delegates the stream
    /// is complete.
    pub fn finish(&mut self) -> Result<(), Error> {
        self.store.finish()?;

        for delegate in self.delegates.iter_mut() {
            delegate.finish()?;
        }

        Ok(())
    }

    fn emit_created(&mut self, created: &[String], lod: &Lod) -> Result<(), Error> {
        let base = self.base(lod);

        for path in created.iter() {
            for delegate in self.delegates.iter_mut() {
                if *path == base {
                    delegate.initialize_lod(path)?;
                } else {
                    delegate.mkdir(path)?;
                }
            }
        }

        Ok(())
    }

    /// Resolves `rel_path` from `root`: `Ok(None)` if absent,
    /// `Ok(Some(None))` for a file, `Ok(Some(Some(id)))` for a directory.
    /// Intermediate file components read as absent.
    fn resolve_from(
        &mut self,
        root: NodeId,
        rel_path: &str,
    ) -> Result<Option<Option<NodeId>>, Error> {
        if rel_path.is_empty() {
            return Ok(Some(Some(root)));
        }

        let mut dir = root;
        let mut components = rel_path.split('/').peekable();
        while let Some(component) = components.next() {
            let entries = self.entries_of(dir)?;
            match entries.get(component) {
                Some(Some(id)) => {
                    if components.peek().is_none() {
                        return Ok(Some(Some(*id)));
                    }
                    dir = *id;
                }
                Some(None) => {
                    return Ok(if components.peek().is_none() {
                        Some(None)
                    } else {
                        None
                    });
                }
                None => return Ok(None),
            }
        }

        unreachable!("split('/') yields at least one component");
    }

    fn directory_from(
        &mut self,
        root: NodeId,
        rel_dir: &str,
        full: String,
    ) -> Result<DirEntries, Error> {
        match self.resolve_from(root, rel_dir)? {
            Some(Some(id)) => self.entries_of(id),
            Some(None) => Err(Error::ExpectedDirectory(full)),
            None => Err(Error::PathMissing(full)),
        }
    }

    fn entries_of(&mut self, id: NodeId) -> Result<DirEntries, Error> {
        if let Some(txn) = self.txn.as_ref() {
            if let Some(entries) = txn.nodes.get(&id) {
                return Ok(entries.clone());
            }
        }

        self.store.read(id)
    }

    /// Resolves the directory chain named by `dirs` under the LOD root,
    /// cloning every node on the way into the transaction so the final
    /// directory is mutable. With `create`, missing directories (and a
    /// missing root) are created; without it they are contract errors.
    fn cow_directory(&mut self, lod: &Lod, dirs: &[&str], create: bool) -> Result<CowChain, Error> {
        let base = self.base(lod);
        let mut created: Vec<String> = Vec::new();

        let txn = self.txn.as_mut().ok_or(Error::NoCommit)?;
        let history = self.histories.entry(*lod).or_default();

        let root = match history.current() {
            Some(id) if txn.nodes.contains_key(&id) => id,
            Some(id) => {
                let entries = self.store.read(id)?;
                let clone = NodeId(self.next_node);
                self.next_node += 1;
                txn.nodes.insert(clone, entries);
                history.set(txn.revnum, Some(clone));
                clone
            }
            None if create => {
                let root = NodeId(self.next_node);
                self.next_node += 1;
                txn.nodes.insert(root, DirEntries::new());
                history.set(txn.revnum, Some(root));
                created.push(base.clone());
                root
            }
            None => return Err(Error::ParentMissing(base)),
        };

        let mut ids = vec![root];
        let mut full = base;

        for component in dirs.iter() {
            let dir = *ids.last().unwrap();
            full = format!("{}/{}", full, component);

            let child = txn.nodes.get(&dir).unwrap().get(*component).cloned();
            let next = match child {
                Some(Some(id)) if txn.nodes.contains_key(&id) => id,
                Some(Some(id)) => {
                    let entries = self.store.read(id)?;
                    let clone = NodeId(self.next_node);
                    self.next_node += 1;
                    txn.nodes.insert(clone, entries);
                    txn.nodes
                        .get_mut(&dir)
                        .unwrap()
                        .insert(component.to_string(), Some(clone));
                    clone
                }
                Some(None) => return Err(Error::ExpectedDirectory(full)),
                None if create => {
                    let id = NodeId(self.next_node);
                    self.next_node += 1;
                    txn.nodes.insert(id, DirEntries::new());
                    txn.nodes
                        .get_mut(&dir)
                        .unwrap()
                        .insert(component.to_string(), Some(id));
                    created.push(full.clone());
                    id
                }
                None => return Err(Error::ParentMissing(full)),
            };

            ids.push(next);
        }

        Ok(CowChain { ids, created })
    }
}

fn split_path(rel_path: &str) -> Result<(Vec<&str>, &str), Error> {
    let mut components: Vec<&str> = rel_path.split('/').collect();
    if components.iter().any(|component| component.is_empty()) {
        return Err(Error::PathMissing(rel_path.into()));
    }

    let name = components.pop().unwrap();
    Ok((components, name))
}

#[cfg(test)]
mod tests;
