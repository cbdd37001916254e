use crate::ast::{DeclArena, DeclId};
use std::fmt::Write;

/// Builds linkage names from a declaration's scope chain.
///
/// Each scope name is written as its length followed by the name, outermost
/// first, so `M.P.x` becomes `_t1M1P1x`. The length prefix keeps the encoding
/// injective: `["ab", "c"]` and `["a", "bc"]` cannot collide.
#[derive(Debug, Clone)]
pub struct Mangler {
    prefix: String,
}

impl Mangler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn mangle(&self, arena: &DeclArena, decl: DeclId) -> String {
        mangle_parts(&self.prefix, arena.scope_names(decl))
    }
}

pub fn mangle_parts<'a>(prefix: &str, parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut mangled = prefix.to_string();
    for part in parts {
        let _ = write!(mangled, "{}{}", part.len(), part);
    }
    mangled
}
