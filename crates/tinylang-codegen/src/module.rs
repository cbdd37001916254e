use crate::ast::{DeclArena, DeclId, DeclKind};
use crate::config::CodegenConfig;
use crate::errors::{CodegenError, Result};
use crate::globals::{GlobalRef, GlobalTable};
use crate::mangle::Mangler;
use crate::procedure::ProcedureCodegen;
use crate::type_lowering::TypeLowering;
use tinylang_ir::{FuncId, Global, Program, Signature, TypeId, TypeRegistry};
use tracing::debug;

/// Module-wide state for one compilation unit: the program being built,
/// the type cache, and the table of placed globals.
pub struct CodegenModule<'a> {
    arena: &'a DeclArena,
    module: DeclId,
    config: CodegenConfig,
    program: Program,
    types: TypeLowering,
    globals: GlobalTable,
    mangler: Mangler,
}

impl<'a> CodegenModule<'a> {
    pub fn new(arena: &'a DeclArena, module: DeclId, config: CodegenConfig) -> Result<Self> {
        let decl = arena.get(module).ok_or_else(|| {
            CodegenError::InvariantViolation(format!("unknown declaration {}", module))
        })?;
        if arena.module(module).is_none() {
            return Err(CodegenError::UnsupportedDeclarationKind(format!(
                "{} is a {}, expected a module",
                decl.name,
                decl.kind.describe()
            )));
        }

        let mangler = Mangler::new(config.mangle_prefix.clone());
        Ok(Self {
            arena,
            module,
            config,
            program: Program::new(decl.name.clone()),
            types: TypeLowering::new(),
            globals: GlobalTable::new(),
            mangler,
        })
    }

    pub fn arena(&self) -> &'a DeclArena {
        self.arena
    }

    pub fn module_decl(&self) -> DeclId {
        self.module
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.program.types
    }

    pub fn type_cache(&self) -> &TypeLowering {
        &self.types
    }

    pub fn globals(&self) -> &GlobalTable {
        &self.globals
    }

    pub fn mangle(&self, decl: DeclId) -> String {
        self.mangler.mangle(self.arena, decl)
    }

    pub fn convert_type(&mut self, decl: DeclId) -> Result<TypeId> {
        self.types.lower(self.arena, &mut self.program.types, decl)
    }

    /// Add `decl`'s callable to the program ahead of its body, so calls to
    /// it (including recursive ones) can be emitted.
    pub(crate) fn declare_procedure(&mut self, decl: DeclId, name: &str, signature: Signature) -> FuncId {
        let id = self.program.declare_function(name, signature);
        self.globals.insert(decl, GlobalRef::Procedure(id));
        id
    }

    /// Walk the module's declarations in order: variables become internal
    /// zero-initialized globals, procedures are generated one by one.
    pub fn lower_globals(&mut self) -> Result<()> {
        let arena = self.arena;
        let decls = arena
            .module(self.module)
            .map(|m| m.decls.as_slice())
            .unwrap_or_default();

        for &decl in decls {
            let Some(d) = arena.get(decl) else {
                return Err(CodegenError::InvariantViolation(format!(
                    "unknown declaration {}",
                    decl
                )));
            };
            match &d.kind {
                DeclKind::Variable { ty } => {
                    let ty = self.convert_type(*ty)?;
                    let name = self.mangle(decl);
                    let id = self.program.add_global(Global::new(name.as_str(), ty));
                    self.globals.insert(decl, GlobalRef::Variable(id));
                    debug!(global = %name, ty = %self.program.types.display(ty), "placed global");
                }
                DeclKind::Procedure(_) => {
                    let (id, function) = ProcedureCodegen::new(self, decl)?.run()?;
                    self.program.define_function(id, function)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn run(mut self) -> Result<Program> {
        self.lower_globals()?;
        let stats = self.types.stats();
        debug!(
            module = %self.program.name,
            functions = self.program.functions.len(),
            globals = self.program.globals.len(),
            type_hits = stats.hits,
            type_misses = stats.misses,
            "module generated"
        );
        Ok(self.program)
    }

    pub fn finish(self) -> Program {
        self.program
    }
}
