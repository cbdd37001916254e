use crate::block::BlockId;
use crate::types::TypeId;
use crate::values::{FuncId, TempId, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Binary {
        result: TempId,
        op: BinaryOp,
        ty: TypeId,
        left: Value,
        right: Value,
    },
    Compare {
        result: TempId,
        op: CompareOp,
        left: Value,
        right: Value,
    },
    Unary {
        result: TempId,
        op: UnaryOp,
        ty: TypeId,
        operand: Value,
    },

    Alloca {
        result: TempId,
        ty: TypeId,
    },
    Load {
        result: TempId,
        ty: TypeId,
        address: Value,
    },
    Store {
        address: Value,
        value: Value,
    },
    /// Address of a nested element. `base` points to a value of type
    /// `aggregate`; each index steps one level into it.
    ElementAddr {
        result: TempId,
        aggregate: TypeId,
        base: Value,
        indices: Vec<Value>,
    },

    Call {
        result: Option<TempId>,
        callee: FuncId,
        args: Vec<Value>,
    },

    Phi {
        result: TempId,
        ty: TypeId,
        incoming: Vec<(BlockId, Value)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::SRem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl CompareOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Slt => "slt",
            CompareOp::Sle => "sle",
            CompareOp::Sgt => "sgt",
            CompareOp::Sge => "sge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
        }
    }
}

impl Instruction {
    pub fn result(&self) -> Option<TempId> {
        match self {
            Instruction::Binary { result, .. }
            | Instruction::Compare { result, .. }
            | Instruction::Unary { result, .. }
            | Instruction::Alloca { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::ElementAddr { result, .. }
            | Instruction::Phi { result, .. } => Some(*result),
            Instruction::Call { result, .. } => *result,
            Instruction::Store { .. } => None,
        }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Instruction::Phi { .. })
    }

    pub fn is_memory_access(&self) -> bool {
        matches!(self, Instruction::Load { .. } | Instruction::Store { .. })
    }

    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Instruction::Binary { left, right, .. } | Instruction::Compare { left, right, .. } => {
                vec![left, right]
            }
            Instruction::Unary { operand, .. } => vec![operand],
            Instruction::Alloca { .. } => Vec::new(),
            Instruction::Load { address, .. } => vec![address],
            Instruction::Store { address, value } => vec![address, value],
            Instruction::ElementAddr { base, indices, .. } => {
                std::iter::once(base).chain(indices.iter()).collect()
            }
            Instruction::Call { args, .. } => args.iter().collect(),
            Instruction::Phi { incoming, .. } => incoming.iter().map(|(_, v)| v).collect(),
        }
    }

    pub fn operands_mut(&mut self) -> Vec<&mut Value> {
        match self {
            Instruction::Binary { left, right, .. } | Instruction::Compare { left, right, .. } => {
                vec![left, right]
            }
            Instruction::Unary { operand, .. } => vec![operand],
            Instruction::Alloca { .. } => Vec::new(),
            Instruction::Load { address, .. } => vec![address],
            Instruction::Store { address, value } => vec![address, value],
            Instruction::ElementAddr { base, indices, .. } => {
                std::iter::once(base).chain(indices.iter_mut()).collect()
            }
            Instruction::Call { args, .. } => args.iter_mut().collect(),
            Instruction::Phi { incoming, .. } => incoming.iter_mut().map(|(_, v)| v).collect(),
        }
    }

    pub fn uses(&self, value: &Value) -> bool {
        self.operands().into_iter().any(|op| op == value)
    }
}
