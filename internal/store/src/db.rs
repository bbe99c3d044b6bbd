use std::{io::Write, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use crate::Error;

/// Writes a whole-value bincode database, staged through a temporary file in
/// the same directory so the artifact appears atomically.
pub fn write_db<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(&bincode::serialize(value)?)?;
    file.persist(path)?;

    Ok(())
}

pub fn read_db<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    Ok(bincode::deserialize(&std::fs::read(path)?)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.db");

        let mut map = HashMap::new();
        map.insert(7u32, String::from("seven"));
        write_db(&path, &map).unwrap();

        let back: HashMap<u32, String> = read_db(&path).unwrap();
        assert_eq!(back, map);
    }
}
