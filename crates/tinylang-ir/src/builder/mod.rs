/*! Builders for constructing function bodies.
 *
 * Code generation appends instructions at a cursor, creates blocks ahead of the edges that reach
 * them, and patches phis in place while SSA form is being constructed. The builder owns the
 * function until it is finished and handed to the program.
 */

pub mod function_builder;

pub use function_builder::FunctionBuilder;
