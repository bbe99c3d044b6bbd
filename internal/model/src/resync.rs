use serde::{Deserialize, Serialize};

/// A timestamp rewrite hint produced by pass 1 and applied by pass 2.
///
/// Any revision carrying the hint's digest whose original time falls inside
/// `[lower, upper]` has its time rewritten to `replacement`; each
/// application widens the interval so neighbors of the rewritten revision
/// are drawn into the same commit bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncHint {
    pub lower: i64,
    pub upper: i64,
    pub replacement: i64,
}

impl ResyncHint {
    pub fn contains(&self, time: i64) -> bool {
        self.lower <= time && time <= self.upper
    }

    pub fn widen(&mut self, margin: i64) {
        self.lower -= margin;
        self.upper += margin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_and_widen() {
        let mut hint = ResyncHint {
            lower: 100,
            upper: 100,
            replacement: 150,
        };

        assert!(hint.contains(100));
        assert!(!hint.contains(99));

        hint.widen(150);
        assert!(hint.contains(-50));
        assert!(hint.contains(250));
        assert!(!hint.contains(251));
    }
}
