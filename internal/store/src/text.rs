use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Lines, Seek, SeekFrom, Write},
    path::Path,
};

use binary_heap_plus::BinaryHeap;

use crate::Error;

/// Appends newline-terminated record lines, staged through a temporary file
/// and renamed into place on [`LineWriter::finish`].
#[derive(Debug)]
pub struct LineWriter {
    out: BufWriter<tempfile::NamedTempFile>,
    path: std::path::PathBuf,
}

impl LineWriter {
    pub fn create(path: &Path) -> Result<Self, Error> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self {
            out: BufWriter::new(tempfile::NamedTempFile::new_in(dir)?),
            path: path.to_path_buf(),
        })
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), Error> {
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(self) -> Result<(), Error> {
        let file = self.out.into_inner().map_err(|e| e.into_error())?;
        file.persist(&self.path)?;
        Ok(())
    }
}

/// Streams a text artifact one line at a time.
#[derive(Debug)]
pub struct LineReader {
    lines: Lines<BufReader<File>>,
}

impl LineReader {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            lines: BufReader::new(File::open(path)?).lines(),
        })
    }
}

impl Iterator for LineReader {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next().map(|line| Ok(line?))
    }
}

/// Externally sorts a line file: in-memory runs of at most `run_lines` lines
/// are spilled to anonymous temporary files, then merged through a min-heap.
pub fn sort_lines(input: &Path, output: &Path, run_lines: usize) -> Result<(), Error> {
    let mut runs: Vec<BufReader<File>> = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    for line in LineReader::open(input)? {
        pending.push(line?);
        if pending.len() >= run_lines {
            runs.push(spill_run(&mut pending)?);
        }
    }
    if !pending.is_empty() {
        runs.push(spill_run(&mut pending)?);
    }

    log::debug!(
        "sorting {} into {} from {} run(s)",
        input.display(),
        output.display(),
        runs.len()
    );

    let mut out = LineWriter::create(output)?;

    // Seed the heap with each run's first line; (line, run) ordering makes
    // the heap pop lexicographically smallest lines first.
    let mut heap = BinaryHeap::new_min();
    for (idx, run) in runs.iter_mut().enumerate() {
        if let Some(line) = read_run_line(run)? {
            heap.push((line, idx));
        }
    }

    while let Some((line, idx)) = heap.pop() {
        out.write_line(&line)?;
        if let Some(next) = read_run_line(&mut runs[idx])? {
            heap.push((next, idx));
        }
    }

    out.finish()
}

fn spill_run(pending: &mut Vec<String>) -> Result<BufReader<File>, Error> {
    pending.sort_unstable();

    let mut file = tempfile::tempfile()?;
    {
        let mut out = BufWriter::new(&mut file);
        for line in pending.iter() {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
    pending.clear();

    file.seek(SeekFrom::Start(0))?;
    Ok(BufReader::new(file))
}

fn read_run_line(run: &mut BufReader<File>) -> Result<Option<String>, Error> {
    let mut line = String::new();
    if run.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    if line.ends_with('\n') {
        line.pop();
    }
    Ok(Some(line))
}
