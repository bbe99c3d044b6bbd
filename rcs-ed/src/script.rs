use crate::{command, Error};

/// An ed command with its payload, as stored in RCS deltatext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        /// The original-file line the content is appended after; 0 inserts
        /// at the start.
        position: usize,
        lines: Vec<Vec<u8>>,
    },
    Delete {
        /// The first original-file line removed, 1-based.
        position: usize,
        count: usize,
    },
}

pub type CommandList = Vec<Command>;

/// Parser for whole RCS ed scripts.
pub struct Script;

impl Script {
    /// Parses a deltatext payload into a command list. An empty payload is a
    /// valid, empty script.
    pub fn parse(input: &[u8]) -> Result<CommandList, Error> {
        let mut commands = CommandList::new();
        let mut lines = Lines { rest: input };
        let mut line_no = 0usize;

        while let Some(line) = lines.next() {
            line_no += 1;

            match command::Command::parse(line) {
                Ok(command::Command::Add { position, count }) => {
                    let mut content = Vec::with_capacity(count);
                    for _ in 0..count {
                        match lines.next() {
                            Some(line) => {
                                line_no += 1;
                                content.push(line.to_vec());
                            }
                            None => {
                                return Err(Error::EndOfScript {
                                    have: content.len(),
                                    want: count,
                                })
                            }
                        }
                    }

                    commands.push(Command::Add {
                        position,
                        lines: content,
                    });
                }
                Ok(command::Command::Delete { position, count }) => {
                    commands.push(Command::Delete { position, count });
                }
                Err(message) => {
                    return Err(Error::BadCommand {
                        line: line_no,
                        message,
                    })
                }
            }
        }

        Ok(commands)
    }
}

/// Writes a command list back out in the RCS diff format, so stored inverse
/// deltas round-trip through [`Script::parse`].
pub fn serialize(commands: &CommandList) -> Vec<u8> {
    let mut out = Vec::new();

    for command in commands.iter() {
        match command {
            Command::Add { position, lines } => {
                out.extend_from_slice(format!("a{} {}\n", position, lines.len()).as_bytes());
                for line in lines.iter() {
                    out.extend_from_slice(line);
                    out.push(b'\n');
                }
            }
            Command::Delete { position, count } => {
                out.extend_from_slice(format!("d{} {}\n", position, count).as_bytes());
            }
        }
    }

    out
}

struct Lines<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }

        match self.rest.iter().position(|b| *b == b'\n') {
            Some(idx) => {
                let line = &self.rest[..idx];
                self.rest = &self.rest[idx + 1..];
                Some(line)
            }
            None => {
                let line = self.rest;
                self.rest = &[];
                Some(line)
            }
        }
    }
}
