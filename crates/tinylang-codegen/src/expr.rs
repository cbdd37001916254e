use crate::ast::{Expr, InfixOp, PrefixOp};
use crate::errors::{CodegenError, Result};
use crate::procedure::ProcedureCodegen;
use tinylang_ir::{BinaryOp, CompareOp, UnaryOp, Value};

impl ProcedureCodegen<'_, '_> {
    /// Lower an expression into a value in the current block.
    pub(crate) fn emit_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Integer(n) => Ok(Value::int(*n)),
            Expr::Boolean(b) => Ok(Value::bool(*b)),
            Expr::Designator(designator) if designator.selectors.is_empty() => {
                self.read_variable(designator.decl)
            }
            Expr::Designator(designator) => match self.designator_address(designator)? {
                Some((address, ty)) => Ok(self.builder.load(ty, address)?),
                None => Err(CodegenError::InvariantViolation(format!(
                    "no storage behind {}",
                    designator.decl
                ))),
            },
            Expr::Infix { op, left, right } => {
                let left = self.emit_expr(left)?;
                let right = self.emit_expr(right)?;
                self.emit_infix(*op, left, right)
            }
            Expr::Prefix { op, operand } => {
                let operand = self.emit_expr(operand)?;
                let operand = self.ssa.resolve(operand);
                let ty = self.builder.value_type(&operand)?;
                match op {
                    PrefixOp::Plus => Ok(operand),
                    PrefixOp::Minus => Ok(self.builder.unary(UnaryOp::Neg, ty, operand)?),
                    PrefixOp::Not => Ok(self.builder.unary(UnaryOp::Not, ty, operand)?),
                }
            }
            Expr::Call { callee, args } => self.emit_call(*callee, args)?.ok_or_else(|| {
                CodegenError::InvariantViolation(format!(
                    "procedure {} has no result but is used as a value",
                    callee
                ))
            }),
        }
    }

    fn emit_infix(&mut self, op: InfixOp, left: Value, right: Value) -> Result<Value> {
        let left = self.ssa.resolve(left);
        let right = self.ssa.resolve(right);
        let ty = self.builder.value_type(&left)?;

        let value = match op {
            InfixOp::Plus => self.builder.binary(BinaryOp::Add, ty, left, right)?,
            InfixOp::Minus => self.builder.binary(BinaryOp::Sub, ty, left, right)?,
            InfixOp::Star => self.builder.binary(BinaryOp::Mul, ty, left, right)?,
            InfixOp::Div => self.builder.binary(BinaryOp::SDiv, ty, left, right)?,
            InfixOp::Mod => self.builder.binary(BinaryOp::SRem, ty, left, right)?,
            InfixOp::And => self.builder.binary(BinaryOp::And, ty, left, right)?,
            InfixOp::Or => self.builder.binary(BinaryOp::Or, ty, left, right)?,
            InfixOp::Equal => self.builder.compare(CompareOp::Eq, left, right)?,
            InfixOp::NotEqual => self.builder.compare(CompareOp::Ne, left, right)?,
            InfixOp::Less => self.builder.compare(CompareOp::Slt, left, right)?,
            InfixOp::LessEqual => self.builder.compare(CompareOp::Sle, left, right)?,
            InfixOp::Greater => self.builder.compare(CompareOp::Sgt, left, right)?,
            InfixOp::GreaterEqual => self.builder.compare(CompareOp::Sge, left, right)?,
        };
        Ok(value)
    }
}
