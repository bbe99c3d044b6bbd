/// An ordered property list, encoded in the dumpfile's `K`/`V` block format.
///
/// Values are bytes, not strings: log messages stay in whatever encoding the
/// caller resolved them to.
#[derive(Debug, Clone, Default)]
pub struct PropList {
    entries: Vec<(String, Vec<u8>)>,
}

impl PropList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<Vec<u8>>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for (key, value) in self.entries.iter() {
            out.extend_from_slice(format!("K {}\n", key.len()).as_bytes());
            out.extend_from_slice(key.as_bytes());
            out.push(b'\n');
            out.extend_from_slice(format!("V {}\n", value.len()).as_bytes());
            out.extend_from_slice(value);
            out.push(b'\n');
        }

        out.extend_from_slice(b"PROPS-END\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(PropList::new().encode(), b"PROPS-END\n");
    }

    #[test]
    fn test_encode() {
        let mut props = PropList::new();
        props.push("svn:author", "adam");
        props.push("svn:log", &b"fix\n"[..]);

        assert_eq!(
            props.encode(),
            b"K 10\nsvn:author\nV 4\nadam\nK 7\nsvn:log\nV 4\nfix\n\nPROPS-END\n"
        );
    }

    #[test]
    fn test_byte_lengths_not_char_lengths() {
        let mut props = PropList::new();
        props.push("svn:log", "naïve");

        // The value is 6 bytes in UTF-8 even though it is 5 characters.
        assert!(String::from_utf8(props.encode())
            .unwrap()
            .contains("V 6\nna\u{ef}ve\n"));
    }
}
