use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Branch,
    Tag,
}

/// A CVS tag or branch symbol, with per-kind usage counts so that a name
/// declared as both kinds across files can be reported or forced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub branch_files: u32,
    pub tag_files: u32,
}

/// The symbol database built by pass 1 and consulted by every later pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one use of `name` as `kind` and returns the symbol's id,
    /// creating the symbol on first use. The kind recorded at creation is
    /// provisional until [`SymbolTable::resolve_kinds`] runs.
    pub fn intern(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        let id = match self.by_name.get(name) {
            Some(id) => *id,
            None => {
                let id = SymbolId(self.symbols.len() as u32);
                self.symbols.push(Symbol {
                    id,
                    name: name.into(),
                    kind,
                    branch_files: 0,
                    tag_files: 0,
                });
                self.by_name.insert(name.into(), id);
                id
            }
        };

        let symbol = &mut self.symbols[id.0 as usize];
        match kind {
            SymbolKind::Branch => symbol.branch_files += 1,
            SymbolKind::Tag => symbol.tag_files += 1,
        }

        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Settles each symbol's final kind. Forced names win; otherwise a name
    /// used as both kinds is a conflict, returned as the list of offending
    /// names.
    pub fn resolve_kinds(
        &mut self,
        force_branch: &[String],
        force_tag: &[String],
    ) -> Result<(), Vec<String>> {
        let mut conflicts = Vec::new();

        for symbol in self.symbols.iter_mut() {
            if force_branch.iter().any(|n| n == &symbol.name) {
                symbol.kind = SymbolKind::Branch;
            } else if force_tag.iter().any(|n| n == &symbol.name) {
                symbol.kind = SymbolKind::Tag;
            } else if symbol.branch_files > 0 && symbol.tag_files > 0 {
                conflicts.push(symbol.name.clone());
            } else if symbol.branch_files > 0 {
                symbol.kind = SymbolKind::Branch;
            } else {
                symbol.kind = SymbolKind::Tag;
            }
        }

        if conflicts.is_empty() {
            Ok(())
        } else {
            conflicts.sort();
            Err(conflicts)
        }
    }
}
