//! A parser for RCS `,v` files.
//!
//! [`parse`] reads a whole file into structured form; [`visit`] then drives a
//! [`Visitor`] over the parsed tree in file order, which is how the
//! collection pass consumes it.

use nom::Finish;

mod error;
mod num;
mod parser;
mod types;
mod visitor;

pub use error::Error;
pub use num::RevNum;
pub use types::*;
pub use visitor::{visit, Visitor};

/// Parses a full RCS file.
pub fn parse(input: &[u8]) -> Result<RcsFile, Error> {
    Ok(Finish::finish(parser::rcs_file(input))
        .map_err(|e| Error::Parse {
            location: e.input[..e.input.len().min(64)].to_vec(),
            kind: e.code,
        })?
        .1)
}
