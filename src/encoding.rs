//! Decoding of CVS metadata bytes for the output stream.
//!
//! Log messages and author names may be in whatever encodings the user
//! declares; they are tried in order and fall back to lossy UTF-8 with a
//! warning. Paths and symbol names have no fallback: the dumpfile requires
//! valid UTF-8, so a path that fails every declared encoding aborts the run.

use anyhow::bail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn parse(name: &str) -> anyhow::Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "ascii" => Ok(Encoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Ok(Encoding::Latin1),
            _ => bail!("unsupported encoding: {}", name),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(String::from),
            // Every Latin-1 byte maps directly to the code point of the same
            // value.
            Encoding::Latin1 => Some(bytes.iter().map(|b| *b as char).collect()),
        }
    }
}

/// Decodes log or author bytes leniently: the first declared encoding that
/// accepts the input wins and the result is re-encoded as UTF-8; when none
/// accepts, the raw bytes pass through with a warning.
pub fn decode_meta(bytes: &[u8], encodings: &[Encoding]) -> Vec<u8> {
    for encoding in encodings.iter() {
        if let Some(text) = encoding.decode(bytes) {
            return text.into_bytes();
        }
    }

    log::warn!(
        "log or author bytes undecodable in the declared encodings; passing through verbatim: {:?}",
        String::from_utf8_lossy(bytes)
    );
    bytes.to_vec()
}

/// Decodes path bytes strictly.
pub fn decode_path(bytes: &[u8], encodings: &[Encoding]) -> anyhow::Result<String> {
    for encoding in encodings.iter() {
        if let Some(text) = encoding.decode(bytes) {
            return Ok(text);
        }
    }

    bail!(
        "path is not valid in any declared encoding: {:?}",
        String::from_utf8_lossy(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_first() {
        let encodings = vec![Encoding::Utf8, Encoding::Latin1];
        assert_eq!(decode_meta(b"plain", &encodings), b"plain");
        assert_eq!(decode_meta("héllo".as_bytes(), &encodings), "héllo".as_bytes());
    }

    #[test]
    fn test_latin1_reencoded_as_utf8() {
        // 0xe9 is é in Latin-1 and invalid alone in UTF-8.
        let encodings = vec![Encoding::Utf8, Encoding::Latin1];
        assert_eq!(decode_meta(b"caf\xe9", &encodings), "café".as_bytes());
    }

    #[test]
    fn test_undecodable_meta_passes_through() {
        let encodings = vec![Encoding::Utf8];
        assert_eq!(decode_meta(b"caf\xe9", &encodings), b"caf\xe9");
    }

    #[test]
    fn test_path_strictness() {
        let encodings = vec![Encoding::Utf8];
        assert!(decode_path(b"src/caf\xe9.c", &encodings).is_err());
        assert_eq!(
            decode_path(b"src/cafe.c", &encodings).unwrap(),
            "src/cafe.c"
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Encoding::parse("UTF-8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::parse("iso-8859-1").unwrap(), Encoding::Latin1);
        assert!(Encoding::parse("shift-jis").is_err());
    }
}
