use crate::ast::DeclId;
use std::collections::HashMap;
use tinylang_ir::{FuncId, GlobalId};

/// IR object a module-scope declaration was placed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalRef {
    Variable(GlobalId),
    Procedure(FuncId),
}

#[derive(Debug, Default)]
pub struct GlobalTable {
    entries: HashMap<DeclId, GlobalRef>,
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous entry if `decl` was already placed.
    pub fn insert(&mut self, decl: DeclId, global: GlobalRef) -> Option<GlobalRef> {
        self.entries.insert(decl, global)
    }

    pub fn get(&self, decl: DeclId) -> Option<GlobalRef> {
        self.entries.get(&decl).copied()
    }

    pub fn variable(&self, decl: DeclId) -> Option<GlobalId> {
        match self.get(decl)? {
            GlobalRef::Variable(id) => Some(id),
            GlobalRef::Procedure(_) => None,
        }
    }

    pub fn procedure(&self, decl: DeclId) -> Option<FuncId> {
        match self.get(decl)? {
            GlobalRef::Procedure(id) => Some(id),
            GlobalRef::Variable(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
