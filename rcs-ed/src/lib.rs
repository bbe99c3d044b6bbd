//! RCS delta handling: ed scripts parsed into command lists, applied to line
//! buffers, and inverted so that trunk deltas can be replayed root-to-head.

use thiserror::Error;

mod command;

pub mod keywords;

mod script;
pub use script::{serialize, Command, CommandList, Script};

/// A file held as lines for delta application.
///
/// Lines carry no trailing newline; a file that ends in a newline is
/// represented with a final empty line, so joining with `\n` reproduces the
/// original bytes exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    lines: Vec<Vec<u8>>,
}

impl File {
    pub fn from_bytes(input: &[u8]) -> Self {
        let mut lines: Vec<Vec<u8>> = input.split(|b| *b == b'\n').map(Vec::from).collect();
        if lines.is_empty() {
            lines.push(Vec::new());
        }

        Self { lines }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.lines.join(&b'\n')
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.lines.join(&b'\n')
    }

    /// Applies an ed script, yielding the patched file. Commands must be in
    /// ascending position order and refer to this file's line numbers, which
    /// is what RCS guarantees for its stored deltas.
    pub fn apply(&self, commands: &CommandList) -> Result<File, Error> {
        self.splice(commands, None)
    }

    /// Applies an ed script while recording its inverse: the returned command
    /// list transforms the patched file back into this one. Used to turn
    /// RCS's head-backward trunk deltas into forward deltas at record time.
    pub fn apply_with_inverse(&self, commands: &CommandList) -> Result<(File, CommandList), Error> {
        let mut inverse = CommandList::new();
        let file = self.splice(commands, Some(&mut inverse))?;
        Ok((file, inverse))
    }

    fn splice(
        &self,
        commands: &CommandList,
        mut inverse: Option<&mut CommandList>,
    ) -> Result<File, Error> {
        let len = self.lines.len();
        let mut out: Vec<Vec<u8>> = Vec::with_capacity(len);

        // `src` is the index of the next original line not yet copied; every
        // command copies the untouched span before it, then splices.
        let mut src = 0usize;

        for command in commands.iter() {
            match command {
                Command::Add { position, lines } => {
                    let upto = *position;
                    if upto < src || upto > len {
                        return Err(Error::OutOfRange {
                            position: *position,
                            len,
                        });
                    }

                    out.extend_from_slice(&self.lines[src..upto]);
                    src = upto;

                    if let Some(inverse) = inverse.as_mut() {
                        inverse.push(Command::Delete {
                            position: out.len() + 1,
                            count: lines.len(),
                        });
                    }
                    out.extend(lines.iter().cloned());
                }
                Command::Delete { position, count } => {
                    let start = position.checked_sub(1).ok_or(Error::OutOfRange {
                        position: *position,
                        len,
                    })?;
                    if start < src || start + count > len {
                        return Err(Error::OutOfRange {
                            position: *position,
                            len,
                        });
                    }

                    out.extend_from_slice(&self.lines[src..start]);

                    if let Some(inverse) = inverse.as_mut() {
                        inverse.push(Command::Add {
                            position: out.len(),
                            lines: self.lines[start..start + count].to_vec(),
                        });
                    }
                    src = start + count;
                }
            }
        }

        out.extend_from_slice(&self.lines[src..]);
        Ok(File { lines: out })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("ed command references line {position} outside the file ({len} lines)")]
    OutOfRange { position: usize, len: usize },

    #[error("command parsing error on line {line}: {message}")]
    BadCommand { line: usize, message: String },

    #[error("unexpected end of script: wanted {want} line(s) and only got {have}")]
    EndOfScript { have: usize, want: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(bytes: &[u8]) -> File {
        File::from_bytes(bytes)
    }

    #[test]
    fn test_round_trip_bytes() {
        for bytes in [
            b"".as_ref(),
            b"one line, no newline",
            b"trailing\n",
            b"a\nb\nc\n",
        ] {
            assert_eq!(file(bytes).as_bytes(), bytes);
        }
    }

    #[test]
    fn test_apply() {
        let base = file(b"the quick\nbrown fox\njumps\n");
        let script = Script::parse(b"d2 1\na2 2\nred dog\nwalks\na3 1\naway\n").unwrap();

        let patched = base.apply(&script).unwrap();
        assert_eq!(patched.as_bytes(), b"the quick\nred dog\nwalks\njumps\naway\n");
    }

    #[test]
    fn test_apply_insert_at_start() {
        let base = file(b"b\nc\n");
        let script = Script::parse(b"a0 1\na\n").unwrap();
        assert_eq!(base.apply(&script).unwrap().as_bytes(), b"a\nb\nc\n");
    }

    #[test]
    fn test_apply_out_of_range() {
        let base = file(b"a\nb\n");
        let script = Script::parse(b"d9 1\n").unwrap();
        assert!(matches!(
            base.apply(&script),
            Err(Error::OutOfRange { position: 9, .. })
        ));
    }

    #[test]
    fn test_inverse_round_trips() {
        let cases: Vec<(&[u8], &[u8])> = vec![
            (b"a\nb\nc\n", b"d1 1\n"),
            (b"a\nb\nc\n", b"a3 2\nx\ny\n"),
            (b"a\nb\nc\nd\n", b"d2 1\na2 1\nB\nd4 1\n"),
            (b"only\n", b"d1 1\na1 2\nfirst\nsecond\n"),
        ];

        for (bytes, script) in cases {
            let base = file(bytes);
            let commands = Script::parse(script).unwrap();
            let (patched, inverse) = base.apply_with_inverse(&commands).unwrap();

            assert_eq!(patched.as_bytes(), base.apply(&commands).unwrap().as_bytes());
            assert_eq!(
                patched.apply(&inverse).unwrap().as_bytes(),
                bytes,
                "inverse failed for script {:?}",
                String::from_utf8_lossy(script)
            );
        }
    }

    #[test]
    fn test_inverse_survives_serialization() {
        let base = file(b"a\nb\nc\nd\ne\n");
        let commands = Script::parse(b"d1 2\na4 1\nX\n").unwrap();
        let (patched, inverse) = base.apply_with_inverse(&commands).unwrap();

        let reparsed = Script::parse(&serialize(&inverse)).unwrap();
        assert_eq!(patched.apply(&reparsed).unwrap().as_bytes(), b"a\nb\nc\nd\ne\n");
    }
}
