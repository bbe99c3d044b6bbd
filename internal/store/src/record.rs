use std::{
    fs::File,
    io::{BufWriter, Read, Seek, SeekFrom, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::Error;

pub(crate) fn index_path(path: &Path) -> PathBuf {
    let mut index = path.as_os_str().to_owned();
    index.push(".idx");
    PathBuf::from(index)
}

/// Writes a dense-id random-access record store: bincode records appended to
/// a data file, with a sidecar index mapping ids to offsets. Ids may be
/// written in any order; writing an id twice keeps the later record.
#[derive(Debug)]
pub struct StoreWriter<T> {
    out: BufWriter<tempfile::NamedTempFile>,
    index: Vec<Option<(u64, u32)>>,
    offset: u64,
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T> StoreWriter<T>
where
    T: Serialize,
{
    pub fn create(path: &Path) -> Result<Self, Error> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self {
            out: BufWriter::new(tempfile::NamedTempFile::new_in(dir)?),
            index: Vec::new(),
            offset: 0,
            path: path.to_path_buf(),
            _record: PhantomData,
        })
    }

    pub fn put(&mut self, id: u32, record: &T) -> Result<(), Error> {
        let bytes = bincode::serialize(record)?;

        let slot = id as usize;
        if slot >= self.index.len() {
            self.index.resize(slot + 1, None);
        }
        self.index[slot] = Some((self.offset, bytes.len() as u32));

        self.out.write_all(&bytes)?;
        self.offset += bytes.len() as u64;

        Ok(())
    }

    /// Flushes the data file and renames data and index into place.
    pub fn finish(self) -> Result<(), Error> {
        let file = self.out.into_inner().map_err(|e| e.into_error())?;
        file.persist(&self.path)?;

        crate::db::write_db(&index_path(&self.path), &self.index)?;
        Ok(())
    }
}

/// Random-access reader over a store written by [`StoreWriter`]. One record
/// is deserialized per [`StoreReader::get`]; nothing is held resident except
/// the offset index.
#[derive(Debug)]
pub struct StoreReader<T> {
    data: File,
    index: Vec<Option<(u64, u32)>>,
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T> StoreReader<T>
where
    T: DeserializeOwned,
{
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            data: File::open(path)?,
            index: crate::db::read_db(&index_path(path))?,
            path: path.to_path_buf(),
            _record: PhantomData,
        })
    }

    pub fn contains(&self, id: u32) -> bool {
        matches!(self.index.get(id as usize), Some(Some(_)))
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.index
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| id as u32)
    }

    pub fn get(&mut self, id: u32) -> Result<T, Error> {
        let (offset, len) = self
            .index
            .get(id as usize)
            .copied()
            .flatten()
            .ok_or_else(|| Error::MissingRecord {
                id,
                path: self.path.clone(),
            })?;

        self.data.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; len as usize];
        self.data.read_exact(&mut bytes)?;

        Ok(bincode::deserialize(&bytes)?)
    }
}
