use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Handle to a type stored in a [`TypeRegistry`].
///
/// Two handles are equal exactly when they name the same registry entry, so
/// handle equality is type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const I1: TypeId = TypeId(1);
    pub const I64: TypeId = TypeId(2);
    pub const PTR: TypeId = TypeId(3);
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ty{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Int(u16),
    Ptr,
    Array { element: TypeId, len: u64 },
    Struct(StructType),
}

impl Type {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array { .. } | Type::Struct(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<TypeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: Vec<Type>,
    ints: HashMap<u16, TypeId>,
    #[serde(skip)]
    arrays: HashMap<(TypeId, u64), TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut ints = HashMap::new();
        ints.insert(1, TypeId::I1);
        ints.insert(64, TypeId::I64);

        Self {
            types: vec![Type::Void, Type::Int(1), Type::Int(64), Type::Ptr],
            ints,
            arrays: HashMap::new(),
        }
    }

    fn push(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn int(&mut self, bits: u16) -> TypeId {
        if let Some(&id) = self.ints.get(&bits) {
            return id;
        }
        let id = self.push(Type::Int(bits));
        self.ints.insert(bits, id);
        id
    }

    pub fn array(&mut self, element: TypeId, len: u64) -> TypeId {
        if let Some(&id) = self.arrays.get(&(element, len)) {
            return id;
        }
        let id = self.push(Type::Array { element, len });
        self.arrays.insert((element, len), id);
        id
    }

    /// Structs are nominal: every call creates a distinct type, even for an
    /// identical field list.
    pub fn create_struct(&mut self, name: impl Into<String>, fields: Vec<TypeId>) -> TypeId {
        self.push(Type::Struct(StructType {
            name: name.into(),
            fields,
        }))
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn structs(&self) -> impl Iterator<Item = (TypeId, &StructType)> {
        self.types.iter().enumerate().filter_map(|(i, ty)| match ty {
            Type::Struct(st) => Some((TypeId(i as u32), st)),
            _ => None,
        })
    }

    pub fn is_aggregate(&self, id: TypeId) -> bool {
        self.get(id).map(Type::is_aggregate).unwrap_or(false)
    }

    /// Type reached by following one index into an aggregate.
    pub fn element_type(&self, aggregate: TypeId, index: u64) -> Option<TypeId> {
        match self.get(aggregate)? {
            Type::Array { element, .. } => Some(*element),
            Type::Struct(st) => st.fields.get(index as usize).copied(),
            _ => None,
        }
    }

    pub fn align(&self, id: TypeId) -> u64 {
        match self.get(id) {
            Some(Type::Int(bits)) => int_bytes(*bits).next_power_of_two().min(8),
            Some(Type::Ptr) => 8,
            Some(Type::Array { element, .. }) => self.align(*element),
            Some(Type::Struct(st)) => st.fields.iter().map(|f| self.align(*f)).max().unwrap_or(1),
            Some(Type::Void) | None => 1,
        }
    }

    /// Bytes written by a store of this type, including struct padding.
    pub fn store_size(&self, id: TypeId) -> u64 {
        match self.get(id) {
            Some(Type::Int(bits)) => int_bytes(*bits),
            Some(Type::Ptr) => 8,
            Some(Type::Array { element, len }) => self.store_size(*element) * len,
            Some(Type::Struct(st)) => {
                let mut offset = 0;
                for field in &st.fields {
                    offset = align_to(offset, self.align(*field));
                    offset += self.store_size(*field);
                }
                align_to(offset, self.align(id))
            }
            Some(Type::Void) | None => 0,
        }
    }

    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            Some(Type::Void) => "void".to_string(),
            Some(Type::Int(bits)) => format!("i{}", bits),
            Some(Type::Ptr) => "ptr".to_string(),
            Some(Type::Array { element, len }) => format!("[{} x {}]", len, self.display(*element)),
            Some(Type::Struct(st)) => format!("%{}", st.name),
            None => format!("<unknown {}>", id),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn int_bytes(bits: u16) -> u64 {
    (bits as u64 + 7) / 8
}

fn align_to(offset: u64, align: u64) -> u64 {
    if align <= 1 {
        offset
    } else {
        offset.div_ceil(align) * align
    }
}
