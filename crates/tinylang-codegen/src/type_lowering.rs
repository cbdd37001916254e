use crate::ast::{DeclArena, DeclId, DeclKind, Expr, TypeDecl};
use crate::errors::{CodegenError, Result};
use std::collections::{HashMap, HashSet};
use tinylang_ir::{TypeId, TypeRegistry};
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Memoized conversion of type declarations into IR types.
///
/// Every type declaration lowers at most once per compilation unit; later
/// lookups return the same [`TypeId`] handle. Aliases get their own cache
/// entry pointing at the target's handle.
#[derive(Debug, Default)]
pub struct TypeLowering {
    cache: HashMap<DeclId, TypeId>,
    in_progress: HashSet<DeclId>,
    stats: CacheStats,
}

impl TypeLowering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn cached(&self, decl: DeclId) -> Option<TypeId> {
        self.cache.get(&decl).copied()
    }

    pub fn lower(
        &mut self,
        arena: &DeclArena,
        types: &mut TypeRegistry,
        decl: DeclId,
    ) -> Result<TypeId> {
        if let Some(&ty) = self.cache.get(&decl) {
            self.stats.hits += 1;
            trace!(%decl, "type cache hit");
            return Ok(ty);
        }
        self.stats.misses += 1;

        let type_decl = arena
            .get(decl)
            .ok_or_else(|| CodegenError::InvariantViolation(format!("unknown declaration {}", decl)))?;
        let kind = match &type_decl.kind {
            DeclKind::Type(kind) => kind,
            other => {
                return Err(CodegenError::UnsupportedType(format!(
                    "{} is a {}, not a type",
                    type_decl.name,
                    other.describe()
                )))
            }
        };

        if !self.in_progress.insert(decl) {
            return Err(CodegenError::RecursiveType(type_decl.name.clone()));
        }
        let lowered = self.lower_kind(arena, types, &type_decl.name, kind);
        self.in_progress.remove(&decl);
        let ty = lowered?;

        trace!(%decl, name = %type_decl.name, ty = %types.display(ty), "type cache miss");
        self.cache.insert(decl, ty);
        Ok(ty)
    }

    fn lower_kind(
        &mut self,
        arena: &DeclArena,
        types: &mut TypeRegistry,
        name: &str,
        kind: &TypeDecl,
    ) -> Result<TypeId> {
        match kind {
            TypeDecl::Pervasive => match name {
                "INTEGER" => Ok(TypeId::I64),
                "BOOLEAN" => Ok(TypeId::I1),
                _ => Err(CodegenError::UnsupportedType(name.to_string())),
            },
            TypeDecl::Alias { target } => self.lower(arena, types, *target),
            TypeDecl::Array { length, element } => {
                let len = match length {
                    Expr::Integer(n) if *n >= 0 => *n as u64,
                    other => {
                        return Err(CodegenError::InvariantViolation(format!(
                            "array {} has non-literal length {:?}",
                            name, other
                        )))
                    }
                };
                let element = self.lower(arena, types, *element)?;
                Ok(types.array(element, len))
            }
            TypeDecl::Record { fields } => {
                let fields = fields
                    .iter()
                    .map(|field| self.lower(arena, types, field.ty))
                    .collect::<Result<Vec<_>>>()?;
                Ok(types.create_struct(name, fields))
            }
        }
    }
}
