use crate::{types::RcsFile, RevNum};

/// The callback interface the collection pass implements. [`visit`] calls the
/// admin hooks first, then `define_revision` for every delta in file order,
/// then `tree_completed`, then `set_revision_info` for every log/text pair in
/// file order.
///
/// All hooks default to doing nothing so implementations only write the ones
/// they care about.
pub trait Visitor {
    type Error;

    fn set_principal_branch(&mut self, _num: &RevNum) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_expansion(&mut self, _mode: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn define_tag(&mut self, _name: &[u8], _num: &RevNum) -> Result<(), Self::Error> {
        Ok(())
    }

    fn define_revision(
        &mut self,
        _num: &RevNum,
        _timestamp: i64,
        _author: &[u8],
        _state: Option<&[u8]>,
        _branches: &[RevNum],
        _next: Option<&RevNum>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn tree_completed(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_revision_info(
        &mut self,
        _num: &RevNum,
        _log: &[u8],
        _text: &[u8],
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Drives a [`Visitor`] over a parsed file.
pub fn visit<V: Visitor>(file: &RcsFile, visitor: &mut V) -> Result<(), V::Error> {
    if let Some(branch) = &file.admin.branch {
        visitor.set_principal_branch(branch)?;
    }

    if let Some(expand) = &file.admin.expand {
        visitor.set_expansion(expand)?;
    }

    for (name, num) in file.admin.symbols.iter() {
        visitor.define_tag(name, num)?;
    }

    for (num, delta) in file.deltas.iter() {
        visitor.define_revision(
            num,
            delta.date,
            &delta.author,
            delta.state.as_deref(),
            &delta.branches,
            delta.next.as_ref(),
        )?;
    }

    visitor.tree_completed()?;

    for (num, text) in file.texts.iter() {
        visitor.set_revision_info(num, &text.log, &text.text)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Visitor for Recorder {
        type Error = std::convert::Infallible;

        fn set_expansion(&mut self, mode: &[u8]) -> Result<(), Self::Error> {
            self.calls
                .push(format!("expand {}", String::from_utf8_lossy(mode)));
            Ok(())
        }

        fn define_tag(&mut self, name: &[u8], num: &RevNum) -> Result<(), Self::Error> {
            self.calls
                .push(format!("tag {} {}", String::from_utf8_lossy(name), num));
            Ok(())
        }

        fn define_revision(
            &mut self,
            num: &RevNum,
            _timestamp: i64,
            author: &[u8],
            _state: Option<&[u8]>,
            _branches: &[RevNum],
            _next: Option<&RevNum>,
        ) -> Result<(), Self::Error> {
            self.calls
                .push(format!("rev {} {}", num, String::from_utf8_lossy(author)));
            Ok(())
        }

        fn tree_completed(&mut self) -> Result<(), Self::Error> {
            self.calls.push("tree done".into());
            Ok(())
        }

        fn set_revision_info(
            &mut self,
            num: &RevNum,
            _log: &[u8],
            _text: &[u8],
        ) -> Result<(), Self::Error> {
            self.calls.push(format!("info {}", num));
            Ok(())
        }
    }

    #[test]
    fn test_visit_order() {
        let input = b"head 1.2; access; symbols R1:1.1; locks; expand @kv@;
1.2 date 2020.01.01.00.00.00; author a; state Exp; branches; next 1.1;
1.1 date 2019.01.01.00.00.00; author b; state Exp; branches; next ;
desc @@
1.2 log @l2@ text @t2@
1.1 log @l1@ text @d1 1@
";
        let file = crate::parse(input).unwrap();
        let mut recorder = Recorder::default();
        visit(&file, &mut recorder).unwrap();

        assert_eq!(
            recorder.calls,
            vec![
                "expand kv",
                "tag R1 1.1",
                "rev 1.2 a",
                "rev 1.1 b",
                "tree done",
                "info 1.2",
                "info 1.1",
            ]
        );
    }
}
