//! The text encoding of revision records used by passes 1–4.
//!
//! Each line starts with the zero-padded timestamp and the digest so that a
//! plain lexicographic sort of the file orders records by `(time, digest)`;
//! the full record follows as JSON.

use crate::{CvsRevision, Error};

pub fn revision_to_line(rev: &CvsRevision) -> Result<String, Error> {
    Ok(format!(
        "{:010} {} {}",
        rev.time,
        rev.digest,
        serde_json::to_string(rev)?
    ))
}

pub fn revision_from_line(line: &str) -> Result<CvsRevision, Error> {
    let json = line
        .splitn(3, ' ')
        .nth(2)
        .ok_or_else(|| Error::MalformedRecord(line.into()))?;

    Ok(serde_json::from_str(json)?)
}
