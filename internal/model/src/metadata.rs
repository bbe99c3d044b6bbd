use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Fixed-width hash over a revision's author and log message. Revisions with
/// equal digests are candidates for the same changeset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Digest(pub [u8; 16]);

impl Digest {
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::MalformedDigest(s.into()));
        }

        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16)
                .map_err(|_| Error::MalformedDigest(s.into()))?;
        }

        Ok(Self(bytes))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

/// Author and log message of one logical commit, stored verbatim. Encoding
/// conversion happens only at emit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub author: Vec<u8>,
    pub log: Vec<u8>,
}
