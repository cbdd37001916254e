use crate::types::TypeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Temp(TempId),
    Arg(ArgId),
    Constant(Constant),
    Global(GlobalId),
    Function(FuncId),
    Undef(TypeId),
}

impl Value {
    pub fn as_temp(&self) -> Option<TempId> {
        match self {
            Value::Temp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef(_))
    }

    pub fn int(value: i64) -> Self {
        Value::Constant(Constant::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Value::Constant(Constant::Bool(value))
    }
}

impl From<TempId> for Value {
    fn from(id: TempId) -> Self {
        Value::Temp(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempId(pub u32);

impl std::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArgId(pub u32);

impl std::fmt::Display for ArgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%arg{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalId(pub u32);

impl std::fmt::Display for GlobalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub u32);

impl std::fmt::Display for FuncId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    Bool(bool),
}

impl Constant {
    pub fn ty(&self) -> TypeId {
        match self {
            Constant::Int(_) => TypeId::I64,
            Constant::Bool(_) => TypeId::I1,
        }
    }

    pub fn as_int(&self) -> i64 {
        match self {
            Constant::Int(v) => *v,
            Constant::Bool(b) => *b as i64,
        }
    }
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Bool(b) => write!(f, "{}", b),
        }
    }
}
