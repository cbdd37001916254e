/*! Single entry point for the tinylang code generation backend.
 *
 * Hand a scope-resolved declaration tree to [`compile_module`] and get back a [`Program`] whose
 * functions are in SSA form, ready for instruction selection.
 */

pub use tinylang_codegen as codegen;
pub use tinylang_ir as ir;

pub use tinylang_codegen::{
    CodegenConfig, CodegenError, DeclArena, DeclId, Designator, Expr, InfixOp, PrefixOp, Stmt,
};
pub use tinylang_ir::{
    format::format_program, BasicBlock, BlockId, Function, Instruction, Program, Terminator, Value,
};

use anyhow::Context;

pub fn compile_module(arena: &DeclArena, module: DeclId, config: CodegenConfig) -> anyhow::Result<Program> {
    let name = arena
        .get(module)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| module.to_string());
    tinylang_codegen::generate(arena, module, config)
        .with_context(|| format!("Failed to generate code for module {}", name))
}
