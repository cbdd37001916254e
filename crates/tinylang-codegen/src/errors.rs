use thiserror::Error;
use tinylang_ir::IrError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Unsupported declaration kind: {0}")]
    UnsupportedDeclarationKind(String),

    #[error("Nested procedures are not supported: {0}")]
    NestedProcedureUnsupported(String),

    #[error("Recursive type cannot be lowered: {0}")]
    RecursiveType(String),

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IR builder error: {0}")]
    Ir(#[from] IrError),
}

impl CodegenError {
    /// Defects in the generator or unmet front-end preconditions, as opposed
    /// to language features that are not implemented.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            CodegenError::InvariantViolation(_) | CodegenError::Ir(_)
        )
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            CodegenError::UnsupportedType(_)
                | CodegenError::UnsupportedDeclarationKind(_)
                | CodegenError::NestedProcedureUnsupported(_)
                | CodegenError::RecursiveType(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CodegenError>;
