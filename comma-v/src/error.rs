use std::num::ParseIntError;

use nom::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed RCS date: {0}")]
    MalformedDate(String),

    #[error("malformed revision number: {0}")]
    MalformedNum(String),

    #[error("parse error of kind {kind:?} near {location:?}")]
    Parse { location: Vec<u8>, kind: ErrorKind },

    #[error(transparent)]
    ParseInt(#[from] ParseIntError),
}
