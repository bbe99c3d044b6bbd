use chrono::NaiveDate;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    combinator::{map, map_res, value},
    multi::fold_many0,
    sequence::delimited,
    IResult,
};

use crate::{num::RevNum, Error};

/// RCS ids are visible graphic characters minus the special set. Dots are
/// legal in ids (but not in symbol names).
pub(super) fn is_idchar(c: u8) -> bool {
    (0x21..0x7f).contains(&c) && !b"$,:;@".contains(&c)
}

pub(super) fn is_symchar(c: u8) -> bool {
    is_idchar(c) && c != b'.'
}

pub(super) fn numlike(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|c: u8| c.is_ascii_digit() || c == b'.')(input)
}

pub(super) fn num(input: &[u8]) -> IResult<&[u8], RevNum> {
    map_res(numlike, RevNum::parse)(input)
}

pub(super) fn id(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(take_while1(is_idchar), Vec::from)(input)
}

pub(super) fn sym(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(take_while1(is_symchar), Vec::from)(input)
}

/// An RCS date, decoded straight to seconds since the epoch. Two-digit years
/// are relative to 1900.
pub(super) fn date(input: &[u8]) -> IResult<&[u8], i64> {
    map_res(numlike, decode_date)(input)
}

fn decode_date(input: &[u8]) -> Result<i64, Error> {
    let bad = || Error::MalformedDate(String::from_utf8_lossy(input).into_owned());

    let text = std::str::from_utf8(input).map_err(|_| bad())?;
    let fields = text
        .split('.')
        .map(|part| part.parse::<u32>().map_err(|_| bad()))
        .collect::<Result<Vec<u32>, Error>>()?;

    if let [year, month, day, hour, minute, second] = fields[..] {
        let year = if year < 100 { year + 1900 } else { year };
        NaiveDate::from_ymd_opt(year as i32, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .map(|datetime| datetime.timestamp())
            .ok_or_else(bad)
    } else {
        Err(bad())
    }
}

/// An `@`-delimited RCS string; `@@` unescapes to `@`.
pub(super) fn string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    delimited(
        tag(b"@"),
        fold_many0(
            alt((chunk, escaped_at)),
            Vec::new,
            |mut acc: Vec<u8>, fragment| {
                acc.extend_from_slice(fragment);
                acc
            },
        ),
        tag(b"@"),
    )(input)
}

fn chunk(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_till1(|c| c == b'@')(input)
}

fn escaped_at(input: &[u8]) -> IResult<&[u8], &[u8]> {
    value(&b"@"[..], tag(b"@@"))(input)
}
