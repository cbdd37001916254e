use crate::block::{BasicBlock, BlockId};
use crate::types::TypeId;
use crate::values::{TempId, Value};
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub signature: Signature,
    pub blocks: IndexMap<BlockId, BasicBlock>,
    pub temps: Vec<TempData>,
    next_block_id: u32,
}

impl Function {
    pub fn new(name: impl Into<String>, linkage: Linkage, signature: Signature) -> Self {
        Self {
            name: name.into(),
            linkage,
            signature,
            blocks: IndexMap::new(),
            temps: Vec::new(),
            next_block_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A function without blocks is a declaration whose body has not been
    /// generated yet.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.keys().next().copied()
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, BasicBlock::new(id, name));
        id
    }

    pub fn block(&self, id: BlockId) -> Result<&BasicBlock> {
        self.blocks.get(&id).ok_or(IrError::UnknownBlock(id))
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock> {
        self.blocks.get_mut(&id).ok_or(IrError::UnknownBlock(id))
    }

    pub fn new_temp(&mut self, ty: TypeId) -> TempId {
        let id = TempId(self.temps.len() as u32);
        self.temps.push(TempData { ty, removed: false });
        id
    }

    pub fn is_live_temp(&self, id: TempId) -> bool {
        self.temps
            .get(id.0 as usize)
            .map(|t| !t.removed)
            .unwrap_or(false)
    }

    pub fn value_type(&self, value: &Value) -> Result<TypeId> {
        match value {
            Value::Temp(t) => self
                .temps
                .get(t.0 as usize)
                .map(|data| data.ty)
                .ok_or_else(|| IrError::UnknownValue(format!("{}", t))),
            Value::Arg(a) => self
                .signature
                .params
                .get(a.0 as usize)
                .map(|p| p.ty)
                .ok_or_else(|| IrError::UnknownValue(format!("{}", a))),
            Value::Constant(c) => Ok(c.ty()),
            Value::Global(_) | Value::Function(_) => Ok(TypeId::PTR),
            Value::Undef(ty) => Ok(*ty),
        }
    }

    pub fn phi_count(&self) -> usize {
        self.blocks.values().map(BasicBlock::phi_count).sum()
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.values().map(|b| b.instructions.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TempData {
    pub ty: TypeId,
    pub removed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub result: Option<TypeId>,
}

impl Signature {
    pub fn new(params: Vec<Param>, result: Option<TypeId>) -> Self {
        Self { params, result }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
    pub attrs: Vec<ParamAttr>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, attr: ParamAttr) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn dereferenceable(&self) -> Option<u64> {
        self.attrs.iter().find_map(|attr| match attr {
            ParamAttr::Dereferenceable(bytes) => Some(*bytes),
            _ => None,
        })
    }

    pub fn is_nocapture(&self) -> bool {
        self.attrs.contains(&ParamAttr::NoCapture)
    }
}

/// Optimizer hints attached to pointer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamAttr {
    Dereferenceable(u64),
    NoCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    External,
    Internal,
}

impl Linkage {
    pub fn keyword(&self) -> &'static str {
        match self {
            Linkage::External => "external",
            Linkage::Internal => "internal",
        }
    }
}
