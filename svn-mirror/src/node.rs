use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Identifies one persisted directory node. Ids are dense and never reused;
/// a node, once written, is immutable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

/// A directory's entries: child name to subdirectory node, or `None` for a
/// file leaf (files carry no content in the mirror).
pub type DirEntries = BTreeMap<String, Option<NodeId>>;

/// The on-disk node store: bincode nodes appended to a data file with an
/// in-memory offset table, flushed as the node index when the mirror
/// finishes. Reads and appends interleave across commits.
#[derive(Debug)]
pub(crate) struct NodeStore {
    file: File,
    index: Vec<(u64, u32)>,
    end: u64,
    path: PathBuf,
}

impl NodeStore {
    pub(crate) fn create(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            file: OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?,
            index: Vec::new(),
            end: 0,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn len(&self) -> u64 {
        self.index.len() as u64
    }

    pub(crate) fn read(&mut self, id: NodeId) -> Result<DirEntries, Error> {
        let (offset, len) = *self
            .index
            .get(id.0 as usize)
            .ok_or_else(|| Error::PathMissing(format!("node {}", id.0)))?;

        self.file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; len as usize];
        self.file.read_exact(&mut bytes)?;

        Ok(bincode::deserialize(&bytes)?)
    }

    /// Appends a node. The caller allocates ids densely, so the id written
    /// must be the next slot.
    pub(crate) fn append(&mut self, id: NodeId, entries: &DirEntries) -> Result<(), Error> {
        debug_assert_eq!(id.0, self.index.len() as u64);

        let bytes = bincode::serialize(entries)?;
        self.file.seek(SeekFrom::Start(self.end))?;
        self.file.write_all(&bytes)?;

        self.index.push((self.end, bytes.len() as u32));
        self.end += bytes.len() as u64;

        Ok(())
    }

    /// Persists the node index beside the data file.
    pub(crate) fn finish(&mut self) -> Result<(), Error> {
        self.file.flush()?;

        let mut index_path = self.path.as_os_str().to_owned();
        index_path.push(".idx");
        cvs_svn_export_store::write_db(&PathBuf::from(index_path), &self.index)?;

        Ok(())
    }
}
