/*! Code generation from tinylang declaration trees into SSA form.
 *
 * The front end hands over a scope-resolved, type-checked [`DeclArena`]. [`CodegenModule`] walks
 * the module's declarations in order, placing variables as globals and generating each procedure
 * with a fresh [`ProcedureCodegen`]. Procedure bodies are put into SSA form while they are
 * lowered: local reads and writes go through [`SsaBuilder`], which places phis on demand and
 * folds the redundant ones away. Types are lowered once per declaration and cached.
 */

pub mod ast;
pub mod config;
pub mod errors;
mod expr;
pub mod globals;
pub mod mangle;
pub mod module;
pub mod procedure;
pub mod ssa;
pub mod type_lowering;

pub use ast::{
    Decl, DeclArena, DeclId, DeclKind, Designator, Expr, Field, InfixOp, PrefixOp, Selector, Stmt,
    TypeDecl,
};
pub use config::CodegenConfig;
pub use errors::{CodegenError, Result};
pub use globals::{GlobalRef, GlobalTable};
pub use mangle::{mangle_parts, Mangler};
pub use module::CodegenModule;
pub use procedure::ProcedureCodegen;
pub use ssa::SsaBuilder;
pub use type_lowering::{CacheStats, TypeLowering};

use tinylang_ir::Program;

/// Generate the IR program for `module`. Stops at the first error.
pub fn generate(arena: &DeclArena, module: DeclId, config: CodegenConfig) -> Result<Program> {
    CodegenModule::new(arena, module, config)?.run()
}

#[cfg(test)]
mod tests;
