use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, SymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolingKind {
    /// The path first has the correct content for the symbol at this
    /// revision.
    Opening,

    /// The path no longer has the correct content from this revision on
    /// (exclusive upper bound).
    Closing,
}

/// One line of the symbol openings/closings log. The on-disk encoding is a
/// text line with zero-padded numeric fields so that a plain lexicographic
/// sort orders the file by symbol, then revision, then path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symboling {
    pub symbol: SymbolId,
    pub revnum: u32,
    pub kind: SymbolingKind,
    pub path: String,
}

impl Symboling {
    pub fn parse(line: &str) -> Result<Self, Error> {
        let bad = || Error::MalformedSymboling(line.into());

        let mut fields = line.splitn(4, ' ');
        let symbol = fields
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(bad)?;
        let revnum = fields
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(bad)?;
        let kind = match fields.next() {
            Some("O") => SymbolingKind::Opening,
            Some("C") => SymbolingKind::Closing,
            _ => return Err(bad()),
        };
        let path = fields.next().ok_or_else(bad)?;

        Ok(Self {
            symbol: SymbolId(symbol),
            revnum,
            kind,
            path: path.into(),
        })
    }
}

impl Display for Symboling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08} {:010} {} {}",
            self.symbol.0,
            self.revnum,
            match self.kind {
                SymbolingKind::Opening => 'O',
                SymbolingKind::Closing => 'C',
            },
            self.path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_round_trip() {
        let symboling = Symboling {
            symbol: SymbolId(7),
            revnum: 42,
            kind: SymbolingKind::Opening,
            path: "trunk/lib/util.c".into(),
        };

        let line = symboling.to_string();
        assert_eq!(line, "00000007 0000000042 O trunk/lib/util.c");
        assert_eq!(Symboling::parse(&line).unwrap(), symboling);
    }

    #[test]
    fn test_lines_sort_by_symbol_then_revnum() {
        let mut lines = vec![
            Symboling {
                symbol: SymbolId(10),
                revnum: 2,
                kind: SymbolingKind::Closing,
                path: "trunk/a".into(),
            }
            .to_string(),
            Symboling {
                symbol: SymbolId(2),
                revnum: 30,
                kind: SymbolingKind::Opening,
                path: "trunk/b".into(),
            }
            .to_string(),
            Symboling {
                symbol: SymbolId(2),
                revnum: 4,
                kind: SymbolingKind::Opening,
                path: "trunk/c".into(),
            }
            .to_string(),
        ];

        lines.sort();
        let parsed: Vec<Symboling> = lines.iter().map(|l| Symboling::parse(l).unwrap()).collect();
        assert_eq!(parsed[0].symbol, SymbolId(2));
        assert_eq!(parsed[0].revnum, 4);
        assert_eq!(parsed[1].revnum, 30);
        assert_eq!(parsed[2].symbol, SymbolId(10));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Symboling::parse("not a symboling").is_err());
        assert!(Symboling::parse("00000001 0000000002 X trunk/a").is_err());
    }
}
