use serde::{Deserialize, Serialize};

use crate::{Lod, Symbol, SymbolKind, SymbolTable};

/// Where trunk, branches, and tags live inside the output repository. All
/// paths are slash-separated with no leading slash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub trunk: String,
    pub branches: String,
    pub tags: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            trunk: "trunk".into(),
            branches: "branches".into(),
            tags: "tags".into(),
        }
    }
}

impl Layout {
    /// The base directory of a line of development.
    pub fn lod_base(&self, lod: &Lod, symbols: &SymbolTable) -> String {
        match lod {
            Lod::Trunk => self.trunk.clone(),
            Lod::Branch(id) => format!("{}/{}", self.branches, symbols.get(*id).name),
        }
    }

    /// The base directory of a symbol: under the branches root for branches,
    /// under the tags root for tags.
    pub fn symbol_base(&self, symbol: &Symbol) -> String {
        match symbol.kind {
            SymbolKind::Branch => format!("{}/{}", self.branches, symbol.name),
            SymbolKind::Tag => format!("{}/{}", self.tags, symbol.name),
        }
    }

    /// The full repository path of a file on a line of development.
    pub fn file_path(&self, lod: &Lod, file_path: &str, symbols: &SymbolTable) -> String {
        format!("{}/{}", self.lod_base(lod, symbols), file_path)
    }

    /// The three project top-level directories, in creation order. These are
    /// never pruned.
    pub fn top_dirs(&self) -> [&str; 3] {
        [&self.trunk, &self.branches, &self.tags]
    }

    /// Splits a repository path back into the line of development it lives on
    /// and the path relative to that LOD's base. Paths under the tags root
    /// are not LOD paths and return `None`, as does anything outside the
    /// configured bases.
    pub fn parse_path<'a>(
        &self,
        path: &'a str,
        symbols: &SymbolTable,
    ) -> Option<(Lod, &'a str)> {
        if let Some(rest) = strip_dir_prefix(path, &self.trunk) {
            return Some((Lod::Trunk, rest));
        }

        let rest = strip_dir_prefix(path, &self.branches)?;
        let (name, sub) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };

        symbols.lookup(name).map(|id| (Lod::Branch(id), sub))
    }
}

fn strip_dir_prefix<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(base)?;
    match rest.as_bytes().first() {
        Some(b'/') => Some(&rest[1..]),
        None => Some(""),
        Some(_) => None,
    }
}
