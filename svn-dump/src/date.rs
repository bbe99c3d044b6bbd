use chrono::{TimeZone, Utc};

/// Formats an epoch timestamp the way Subversion writes `svn:date` revision
/// properties.
pub fn svn_date(epoch: i64) -> String {
    Utc.timestamp(epoch, 0)
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svn_date() {
        assert_eq!(svn_date(0), "1970-01-01T00:00:00.000000Z");
        assert_eq!(svn_date(981173106), "2001-02-03T04:05:06.000000Z");
    }
}
