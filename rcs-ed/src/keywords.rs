//! RCS keyword suppression.
//!
//! Expanded keywords (`$Id: util.c,v 1.3 …$`) differ between a CVS checkout
//! and the literal repository text, so content comparisons and emitted file
//! bodies collapse them back to their unexpanded `$Id$` form. Unexpanded
//! keywords are left alone, which makes suppression idempotent.

use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref KEYWORD: Regex = Regex::new(
        r"\$(Author|Date|Header|Id|Locker|Log|Name|RCSfile|Revision|Source|State):[^$\n]*\$"
    )
    .unwrap();
}

pub fn suppress(text: &[u8]) -> Vec<u8> {
    KEYWORD.replace_all(text, &b"$$${1}$$"[..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppress() {
        assert_eq!(
            suppress(b"/* $Id: util.c,v 1.3 2001/02/03 04:05:06 adam Exp $ */\n"),
            b"/* $Id$ */\n"
        );
        assert_eq!(
            suppress(b"$Revision: 1.21 $ and $Author: beth $\n"),
            b"$Revision$ and $Author$\n"
        );
    }

    #[test]
    fn test_unexpanded_left_alone() {
        assert_eq!(suppress(b"$Id$ $Log$\n"), b"$Id$ $Log$\n");
        assert_eq!(suppress(b"price is $5: bargain$\n"), b"price is $5: bargain$\n");
    }

    #[test]
    fn test_idempotent() {
        let once = suppress(b"x $Header: /cvs/foo,v 1.1 $ y\n");
        assert_eq!(suppress(&once), once);
    }
}
