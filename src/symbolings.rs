//! Reading the sorted symbol openings/closings log during emission.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Seek, SeekFrom},
    path::Path,
};

use anyhow::Context as _;
use cvs_svn_export_model::{Symboling, SymbolId};
use cvs_svn_export_store::read_db;

/// Seeks straight to a symbol's span of the sorted log via the offsets
/// table and streams its lines.
pub struct SymbolingsReader {
    file: BufReader<File>,
    offsets: HashMap<SymbolId, u64>,
}

impl SymbolingsReader {
    pub fn open(log_path: &Path, offsets_path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            file: BufReader::new(File::open(log_path)?),
            offsets: read_db(offsets_path)?,
        })
    }

    /// All openings and closings for one symbol, in (revnum, path) order. A
    /// symbol with no recorded sources yields an empty list.
    pub fn read_symbol(&mut self, symbol: SymbolId) -> anyhow::Result<Vec<Symboling>> {
        let offset = match self.offsets.get(&symbol) {
            Some(offset) => *offset,
            None => return Ok(Vec::new()),
        };

        self.file.seek(SeekFrom::Start(offset))?;

        let mut entries = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.file.read_line(&mut line)? == 0 {
                break;
            }

            let entry = Symboling::parse(line.trim_end_matches('\n'))
                .context("malformed symbolings line")?;
            if entry.symbol != symbol {
                break;
            }
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Drops the per-symbol bookkeeping once the symbol's last dependent
    /// changeset has been emitted.
    pub fn forget(&mut self, symbol: SymbolId) {
        self.offsets.remove(&symbol);
    }
}

#[cfg(test)]
mod tests {
    use cvs_svn_export_model::SymbolingKind;
    use cvs_svn_export_store::LineWriter;

    use super::*;

    fn entry(symbol: u32, revnum: u32, kind: SymbolingKind, path: &str) -> Symboling {
        Symboling {
            symbol: SymbolId(symbol),
            revnum,
            kind,
            path: path.into(),
        }
    }

    #[test]
    fn test_seek_and_stream() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("symbolings.txt");
        let offsets_path = dir.path().join("offsets.db");

        let entries = vec![
            entry(1, 2, SymbolingKind::Opening, "trunk/a.c"),
            entry(1, 5, SymbolingKind::Closing, "trunk/a.c"),
            entry(3, 4, SymbolingKind::Opening, "trunk/b.c"),
        ];

        let mut offsets: HashMap<SymbolId, u64> = HashMap::new();
        let mut offset = 0u64;
        let mut writer = LineWriter::create(&log).unwrap();
        for entry in entries.iter() {
            let line = entry.to_string();
            offsets.entry(entry.symbol).or_insert(offset);
            offset += line.len() as u64 + 1;
            writer.write_line(&line).unwrap();
        }
        writer.finish().unwrap();
        cvs_svn_export_store::write_db(&offsets_path, &offsets).unwrap();

        let mut reader = SymbolingsReader::open(&log, &offsets_path).unwrap();

        assert_eq!(reader.read_symbol(SymbolId(3)).unwrap(), entries[2..]);
        assert_eq!(reader.read_symbol(SymbolId(1)).unwrap(), entries[..2]);
        assert_eq!(reader.read_symbol(SymbolId(9)).unwrap(), vec![]);

        reader.forget(SymbolId(1));
        assert_eq!(reader.read_symbol(SymbolId(1)).unwrap(), vec![]);
    }
}
