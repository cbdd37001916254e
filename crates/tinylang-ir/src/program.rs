use crate::function::{Function, Linkage, Signature};
use crate::types::{TypeId, TypeRegistry};
use crate::values::{FuncId, GlobalId};
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One compilation unit: global storage, functions, and the types they use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub types: TypeRegistry,
    pub globals: IndexMap<GlobalId, Global>,
    pub functions: IndexMap<FuncId, Function>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: TypeRegistry::new(),
            globals: IndexMap::new(),
            functions: IndexMap::new(),
        }
    }

    pub fn add_global(&mut self, global: Global) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.globals.insert(id, global);
        id
    }

    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        self.globals.get(&id)
    }

    pub fn global_by_name(&self, name: &str) -> Option<&Global> {
        self.globals.values().find(|g| g.name == name)
    }

    pub fn declare_function(&mut self, name: impl Into<String>, signature: Signature) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.functions
            .insert(id, Function::new(name, Linkage::External, signature));
        id
    }

    /// Replace a declaration with its generated body.
    pub fn define_function(&mut self, id: FuncId, function: Function) -> Result<()> {
        let slot = self
            .functions
            .get_mut(&id)
            .ok_or_else(|| IrError::UnknownValue(format!("{}", id)))?;
        if !slot.is_declaration() {
            return Err(IrError::BuilderError(format!(
                "Function {} already has a body",
                slot.name
            )));
        }
        *slot = function;
        Ok(())
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(&id)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.values().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    pub ty: TypeId,
    pub linkage: Linkage,
    pub initializer: Initializer,
}

impl Global {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            linkage: Linkage::Internal,
            initializer: Initializer::Zero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initializer {
    Zero,
}
