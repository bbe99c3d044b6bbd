use std::fmt::Display;

use derive_more::{Deref, From, Into};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A dotted RCS revision or branch number with magic zero components
/// stripped: `1.2.0.4` and `1.2.4` both parse to the branch `[1, 2, 4]`.
///
/// An even number of components names a revision; an odd number names a
/// branch.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, From, Into, Serialize, Deserialize,
)]
pub struct RevNum(Vec<u32>);

impl RevNum {
    pub fn parse(input: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(input)
            .map_err(|_| Error::MalformedNum(String::from_utf8_lossy(input).into_owned()))?;

        let parts = text
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<u32>, _>>()?;
        if parts.is_empty() {
            return Err(Error::MalformedNum(text.into()));
        }

        // Magic branch numbers embed a zero (1.2.0.4 means branch 1.2.4);
        // strip the zeros so the component count alone tells revisions and
        // branches apart.
        Ok(Self(parts.into_iter().filter(|part| *part != 0).collect()))
    }

    pub fn is_branch(&self) -> bool {
        self.0.len() % 2 == 1
    }

    pub fn is_revision(&self) -> bool {
        !self.is_branch()
    }

    pub fn is_trunk_revision(&self) -> bool {
        self.0.len() == 2
    }

    /// The branch a revision lives on: `1.2.4.7` → `1.2.4`; trunk revisions
    /// yield the trunk branch `1`.
    pub fn branch(&self) -> RevNum {
        debug_assert!(self.is_revision());
        if self.is_trunk_revision() {
            Self(self.0[..1].to_vec())
        } else {
            Self(self.0[..self.0.len() - 1].to_vec())
        }
    }

    /// The revision a branch sprouts from: branch `1.2.4` → revision `1.2`.
    /// The trunk branch sprouts from nothing.
    pub fn sprout(&self) -> Option<RevNum> {
        debug_assert!(self.is_branch());
        if self.0.len() == 1 {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The first revision committed on a branch: `1.2.4` → `1.2.4.1`.
    pub fn first_on_branch(&self) -> RevNum {
        debug_assert!(self.is_branch());
        let mut parts = self.0.clone();
        parts.push(1);
        Self(parts)
    }

    /// True for `1.1.1.1`, the first revision of the conventional vendor
    /// import branch.
    pub fn is_initial_vendor(&self) -> bool {
        self.0 == [1, 1, 1, 1]
    }
}

impl Display for RevNum {
    #[allow(unstable_name_collisions)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .iter()
                .map(|part| part.to_string())
                .intersperse(String::from("."))
                .collect::<String>()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> RevNum {
        RevNum::parse(s.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(num("1.1"), RevNum(vec![1, 1]));
        assert_eq!(num("1.2.4.7"), RevNum(vec![1, 2, 4, 7]));
        assert_eq!(num("1.2.4"), RevNum(vec![1, 2, 4]));
        assert_eq!(num("1.2.0.4"), RevNum(vec![1, 2, 4]));
        assert!(RevNum::parse(b"").is_err());
        assert!(RevNum::parse(b"1.x").is_err());
    }

    #[test]
    fn test_kinds() {
        assert!(num("1.1").is_revision());
        assert!(num("1.1").is_trunk_revision());
        assert!(!num("1.2.4.7").is_trunk_revision());
        assert!(num("1.2.4").is_branch());
        assert!(num("1.2.0.4").is_branch());
    }

    #[test]
    fn test_relatives() {
        assert_eq!(num("1.2.4.7").branch(), num("1.2.4"));
        assert_eq!(num("1.7").branch(), RevNum(vec![1]));
        assert_eq!(num("1.2.4").sprout(), Some(num("1.2")));
        assert_eq!(RevNum(vec![1]).sprout(), None);
        assert_eq!(num("1.2.4").first_on_branch(), num("1.2.4.1"));
        assert!(num("1.1.1.1").is_initial_vendor());
        assert!(!num("1.1.1.2").is_initial_vendor());
    }

    #[test]
    fn test_display() {
        assert_eq!(num("1.2.0.4").to_string(), "1.2.4");
        assert_eq!(num("1.13").to_string(), "1.13");
    }
}
