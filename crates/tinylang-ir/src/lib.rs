/*! SSA intermediate representation for the tinylang code generator.
 *
 * A program is a set of internally linked global slots and externally linked functions whose
 * bodies are basic blocks in SSA form. The builder keeps predecessor lists up to date as
 * terminators are set and supports the phi surgery (insert, extend, replace, remove) that
 * on-the-fly SSA construction needs.
 */

pub mod block;
pub mod builder;
pub mod format;
pub mod function;
pub mod instructions;
pub mod program;
pub mod types;
pub mod values;
pub mod verify;

pub use block::{BasicBlock, BlockId, Terminator};
pub use builder::FunctionBuilder;
pub use function::{Function, Linkage, Param, ParamAttr, Signature};
pub use instructions::{BinaryOp, CompareOp, Instruction, UnaryOp};
pub use program::{Global, Initializer, Program};
pub use types::{Type, TypeId, TypeRegistry};
pub use values::{ArgId, Constant, FuncId, GlobalId, TempId, Value};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Unknown block: {0}")]
    UnknownBlock(BlockId),
    #[error("Unknown value: {0}")]
    UnknownValue(String),
    #[error("Block {0} already has a terminator")]
    AlreadyTerminated(BlockId),
    #[error("{0} is not a live phi")]
    NotAPhi(TempId),
    #[error("Verification failed in {function}: {message}")]
    Verification { function: String, message: String },
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
