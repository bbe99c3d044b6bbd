//! The `,v` grammar, written as straight-line nom functions: each phrase of
//! the admin and delta sections is parsed in the order rcsfile(5) defines,
//! and unrecognized newphrases are skipped so files written by newer RCS
//! versions still parse.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::multispace0,
    combinator::{opt, value},
    multi::many0,
    sequence::preceded,
    IResult,
};

use crate::{num::RevNum, types};

mod scalar;
use self::scalar::*;

pub(crate) fn rcs_file(input: &[u8]) -> IResult<&[u8], types::RcsFile> {
    let (input, admin) = admin(input)?;
    let (input, deltas) = many0(delta)(input)?;
    let (input, desc) = desc(input)?;
    let (input, texts) = many0(delta_text)(input)?;
    let (input, _) = multispace0(input)?;

    Ok((
        input,
        types::RcsFile {
            admin,
            deltas,
            desc,
            texts,
        },
    ))
}

fn kw<'a>(input: &'a [u8], word: &'static str) -> IResult<&'a [u8], ()> {
    value((), preceded(multispace0, tag(word.as_bytes())))(input)
}

fn semi(input: &[u8]) -> IResult<&[u8], ()> {
    kw(input, ";")
}

fn ws<'a, O, F>(f: F) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>
where
    F: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
{
    preceded(multispace0, f)
}

fn admin(input: &[u8]) -> IResult<&[u8], types::Admin> {
    let (input, _) = kw(input, "head")?;
    let (input, head) = opt(ws(num))(input)?;
    let (input, _) = semi(input)?;

    let (input, branch) = opt(branch_phrase)(input)?;

    let (input, _) = kw(input, "access")?;
    let (input, access) = many0(ws(id))(input)?;
    let (input, _) = semi(input)?;

    let (input, _) = kw(input, "symbols")?;
    let (input, symbols) = many0(tagged_pair(sym))(input)?;
    let (input, _) = semi(input)?;

    let (input, _) = kw(input, "locks")?;
    let (input, locks) = many0(tagged_pair(id))(input)?;
    let (input, _) = semi(input)?;

    let (input, strict) = opt(strict_phrase)(input)?;
    let (input, comment) = opt(string_phrase(b"comment"))(input)?;
    let (input, expand) = opt(string_phrase(b"expand"))(input)?;
    let (input, _) = many0(admin_newphrase)(input)?;

    Ok((
        input,
        types::Admin {
            head,
            branch: branch.flatten(),
            access,
            symbols,
            locks,
            strict: strict.is_some(),
            comment: comment.flatten(),
            expand: expand.flatten(),
        },
    ))
}

fn branch_phrase(input: &[u8]) -> IResult<&[u8], Option<RevNum>> {
    let (input, _) = kw(input, "branch")?;
    let (input, branch) = opt(ws(num))(input)?;
    let (input, _) = semi(input)?;
    Ok((input, branch))
}

fn strict_phrase(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = kw(input, "strict")?;
    semi(input)
}

/// `comment` and `expand` share the shape `keyword string? ;`.
fn string_phrase<'a>(
    keyword: &'static [u8],
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Option<Vec<u8>>> {
    move |input| {
        let (input, _) = value((), preceded(multispace0, tag(keyword)))(input)?;
        let (input, text) = opt(ws(string))(input)?;
        let (input, _) = semi(input)?;
        Ok((input, text))
    }
}

/// `name:num` pairs in the symbols and locks lists.
fn tagged_pair<'a>(
    name: fn(&'a [u8]) -> IResult<&'a [u8], Vec<u8>>,
) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], (Vec<u8>, RevNum)> {
    move |input| {
        let (input, key) = ws(name)(input)?;
        let (input, _) = kw(input, ":")?;
        let (input, rev) = ws(num)(input)?;
        Ok((input, (key, rev)))
    }
}

fn delta(input: &[u8]) -> IResult<&[u8], (RevNum, types::Delta)> {
    let (input, rev) = ws(num)(input)?;

    let (input, _) = kw(input, "date")?;
    let (input, date) = ws(date)(input)?;
    let (input, _) = semi(input)?;

    let (input, _) = kw(input, "author")?;
    let (input, author) = ws(id)(input)?;
    let (input, _) = semi(input)?;

    let (input, _) = kw(input, "state")?;
    let (input, state) = opt(ws(id))(input)?;
    let (input, _) = semi(input)?;

    let (input, _) = kw(input, "branches")?;
    let (input, branches) = many0(ws(num))(input)?;
    let (input, _) = semi(input)?;

    let (input, _) = kw(input, "next")?;
    let (input, next) = opt(ws(num))(input)?;
    let (input, _) = semi(input)?;

    let (input, commit_id) = opt(commitid_phrase)(input)?;
    let (input, _) = many0(admin_newphrase)(input)?;

    Ok((
        input,
        (
            rev,
            types::Delta {
                date,
                author,
                state,
                branches,
                next,
                commit_id,
            },
        ),
    ))
}

fn commitid_phrase(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, _) = kw(input, "commitid")?;
    let (input, id) = ws(sym)(input)?;
    let (input, _) = semi(input)?;
    Ok((input, id))
}

fn desc(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, _) = kw(input, "desc")?;
    ws(string)(input)
}

fn delta_text(input: &[u8]) -> IResult<&[u8], (RevNum, types::DeltaText)> {
    let (input, rev) = ws(num)(input)?;

    let (input, _) = kw(input, "log")?;
    let (input, log) = ws(string)(input)?;

    let (input, _) = many0(text_newphrase)(input)?;

    let (input, _) = kw(input, "text")?;
    let (input, text) = ws(string)(input)?;

    Ok((input, (rev, types::DeltaText { log, text })))
}

fn admin_newphrase(input: &[u8]) -> IResult<&[u8], ()> {
    newphrase(input, b"desc")
}

fn text_newphrase(input: &[u8]) -> IResult<&[u8], ()> {
    newphrase(input, b"text")
}

/// Skips one `id word* ;` phrase. Fails without consuming anything when the
/// next token starts a known section: a revision number or the `stop`
/// keyword.
fn newphrase<'a>(input: &'a [u8], stop: &'static [u8]) -> IResult<&'a [u8], ()> {
    let (rest, word) = ws(id)(input)?;
    if word.first().map_or(true, u8::is_ascii_digit) || word == stop {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }

    let (rest, _) = many0(phrase_word)(rest)?;
    semi(rest)
}

fn phrase_word(input: &[u8]) -> IResult<&[u8], ()> {
    ws(alt((
        value((), string),
        value((), id),
        value((), tag(b":")),
    )))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &[u8] = b"head\t1.2;
access;
symbols
\tRELEASE_1:1.2
\tstable:1.1.0.2;
locks; strict;
comment\t@# @;
fancyfeature @yes@;

1.2
date\t2021.08.20.17.34.26;\tauthor adam;\tstate Exp;
branches;
next\t1.1;

1.1
date\t2021.08.19.10.00.00;\tauthor beth;\tstate Exp;
branches
\t1.1.2.1;
next\t;

1.1.2.1
date\t2021.08.21.09.00.00;\tauthor beth;\tstate dead;
branches;
next\t;
commitid\tabc123;

desc
@@

1.2
log
@tweak the frobnicator
@
text
@line one
line two
@

1.1
log
@first cut
@
text
@d2 1
@

1.1.2.1
log
@gone
@
text
@@
";

    fn num(s: &str) -> RevNum {
        RevNum::parse(s.as_bytes()).unwrap()
    }

    #[test]
    fn test_full_file() {
        let (rest, file) = rcs_file(FIXTURE).unwrap();
        assert!(rest.is_empty());

        assert_eq!(file.admin.head, Some(num("1.2")));
        assert!(file.admin.branch.is_none());
        assert!(file.admin.strict);
        assert_eq!(file.admin.comment.as_deref(), Some(b"# ".as_ref()));
        assert_eq!(
            file.admin.symbols,
            vec![
                (b"RELEASE_1".to_vec(), num("1.2")),
                (b"stable".to_vec(), num("1.1.2")),
            ]
        );

        assert_eq!(file.deltas.len(), 3);
        let head = file.delta(&num("1.2")).unwrap();
        assert_eq!(head.author, b"adam");
        assert_eq!(head.next, Some(num("1.1")));
        assert!(!head.is_dead());

        let branch_rev = file.delta(&num("1.1.2.1")).unwrap();
        assert!(branch_rev.is_dead());
        assert_eq!(branch_rev.commit_id.as_deref(), Some(b"abc123".as_ref()));

        assert_eq!(file.delta(&num("1.1")).unwrap().branches, vec![num("1.1.2.1")]);

        assert_eq!(file.desc, b"");
        assert_eq!(file.texts.len(), 3);
        assert_eq!(
            file.text(&num("1.2")).unwrap().text,
            b"line one\nline two\n"
        );
        assert_eq!(file.text(&num("1.1")).unwrap().text, b"d2 1\n");
        assert_eq!(file.text(&num("1.1.2.1")).unwrap().text, b"");
    }

    #[test]
    fn test_branch_header() {
        let input = b"head 1.1; branch 1.1.1; access; symbols; locks;
1.1 date 97.01.02.03.04.05; author x; state Exp; branches; next ;
desc @@
1.1 log @l@ text @t@
";
        let (_, file) = rcs_file(input).unwrap();
        assert_eq!(file.admin.branch, Some(num("1.1.1")));
        assert!(!file.admin.strict);
    }

    #[test]
    fn test_empty_head() {
        let input = b"head; access; symbols; locks;
desc @nothing here@
";
        let (_, file) = rcs_file(input).unwrap();
        assert!(file.admin.head.is_none());
        assert!(file.deltas.is_empty());
        assert_eq!(file.desc, b"nothing here");
    }
}
