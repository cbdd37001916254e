//! Declaration and statement tree handed over by the front end.
//!
//! Declarations live in a [`DeclArena`] and refer to each other by [`DeclId`].
//! Every declaration knows its enclosing scope, which is what name mangling
//! and variable dispatch are driven by.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub name: String,
    pub enclosing: Option<DeclId>,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    Module(ModuleDecl),
    Procedure(ProcedureDecl),
    Variable { ty: DeclId },
    FormalParameter { ty: DeclId, by_ref: bool },
    Type(TypeDecl),
}

impl DeclKind {
    pub fn describe(&self) -> &'static str {
        match self {
            DeclKind::Module(_) => "module",
            DeclKind::Procedure(_) => "procedure",
            DeclKind::Variable { .. } => "variable",
            DeclKind::FormalParameter { .. } => "formal parameter",
            DeclKind::Type(_) => "type",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub decls: Vec<DeclId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcedureDecl {
    pub params: Vec<DeclId>,
    pub decls: Vec<DeclId>,
    pub body: Vec<Stmt>,
    pub return_type: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDecl {
    /// Built-in type, identified by name (`INTEGER`, `BOOLEAN`, ...).
    Pervasive,
    Alias { target: DeclId },
    Array { length: Expr, element: DeclId },
    Record { fields: Vec<Field> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: DeclId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Assignment {
        target: Designator,
        value: Expr,
    },
    ProcedureCall {
        callee: DeclId,
        args: Vec<Expr>,
    },
    If {
        cond: Expr,
        then_stmts: Vec<Stmt>,
        else_stmts: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
}

impl Stmt {
    pub fn assign(decl: DeclId, value: Expr) -> Self {
        Stmt::Assignment {
            target: Designator::var(decl),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Designator {
    pub decl: DeclId,
    pub selectors: Vec<Selector>,
}

impl Designator {
    pub fn var(decl: DeclId) -> Self {
        Self {
            decl,
            selectors: Vec::new(),
        }
    }

    pub fn index(mut self, index: Expr) -> Self {
        self.selectors.push(Selector::Index(index));
        self
    }

    pub fn field(mut self, index: usize) -> Self {
        self.selectors.push(Selector::Field(index));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    Index(Expr),
    /// Field position within the record, in declaration order.
    Field(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Integer(i64),
    Boolean(bool),
    Designator(Designator),
    Infix {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Prefix {
        op: PrefixOp,
        operand: Box<Expr>,
    },
    Call {
        callee: DeclId,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn var(decl: DeclId) -> Self {
        Expr::Designator(Designator::var(decl))
    }

    pub fn infix(op: InfixOp, left: Expr, right: Expr) -> Self {
        Expr::Infix {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn prefix(op: PrefixOp, operand: Expr) -> Self {
        Expr::Prefix {
            op,
            operand: Box::new(operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfixOp {
    Plus,
    Minus,
    Star,
    Div,
    Mod,
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixOp {
    Plus,
    Minus,
    Not,
}

/// Owns every declaration of a compilation unit.
///
/// The `add_*` constructors register the new declaration with its enclosing
/// module or procedure, so declaration order is the order of construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclArena {
    decls: Vec<Decl>,
}

impl DeclArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    fn push(&mut self, name: impl Into<String>, enclosing: Option<DeclId>, kind: DeclKind) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Decl {
            name: name.into(),
            enclosing,
            kind,
        });
        if let Some(scope) = enclosing {
            self.register(scope, id);
        }
        id
    }

    fn register(&mut self, scope: DeclId, id: DeclId) {
        let is_param = matches!(
            self.get(id).map(|d| &d.kind),
            Some(DeclKind::FormalParameter { .. })
        );
        match self.decls.get_mut(scope.0 as usize).map(|d| &mut d.kind) {
            Some(DeclKind::Module(module)) => module.decls.push(id),
            Some(DeclKind::Procedure(proc)) if is_param => proc.params.push(id),
            Some(DeclKind::Procedure(proc)) => proc.decls.push(id),
            _ => {}
        }
    }

    pub fn add_module(&mut self, name: impl Into<String>) -> DeclId {
        self.push(name, None, DeclKind::Module(ModuleDecl::default()))
    }

    pub fn add_procedure(&mut self, enclosing: DeclId, name: impl Into<String>) -> DeclId {
        self.push(
            name,
            Some(enclosing),
            DeclKind::Procedure(ProcedureDecl::default()),
        )
    }

    pub fn add_variable(&mut self, enclosing: DeclId, name: impl Into<String>, ty: DeclId) -> DeclId {
        self.push(name, Some(enclosing), DeclKind::Variable { ty })
    }

    pub fn add_param(
        &mut self,
        procedure: DeclId,
        name: impl Into<String>,
        ty: DeclId,
        by_ref: bool,
    ) -> DeclId {
        self.push(
            name,
            Some(procedure),
            DeclKind::FormalParameter { ty, by_ref },
        )
    }

    /// Pervasive types belong to no scope.
    pub fn add_pervasive(&mut self, name: impl Into<String>) -> DeclId {
        self.push(name, None, DeclKind::Type(TypeDecl::Pervasive))
    }

    pub fn add_alias(&mut self, enclosing: DeclId, name: impl Into<String>, target: DeclId) -> DeclId {
        self.push(
            name,
            Some(enclosing),
            DeclKind::Type(TypeDecl::Alias { target }),
        )
    }

    pub fn add_array(
        &mut self,
        enclosing: DeclId,
        name: impl Into<String>,
        length: Expr,
        element: DeclId,
    ) -> DeclId {
        self.push(
            name,
            Some(enclosing),
            DeclKind::Type(TypeDecl::Array { length, element }),
        )
    }

    pub fn add_record(
        &mut self,
        enclosing: DeclId,
        name: impl Into<String>,
        fields: Vec<(&str, DeclId)>,
    ) -> DeclId {
        let fields = fields
            .into_iter()
            .map(|(name, ty)| Field {
                name: name.to_string(),
                ty,
            })
            .collect();
        self.push(
            name,
            Some(enclosing),
            DeclKind::Type(TypeDecl::Record { fields }),
        )
    }

    /// Does nothing unless `procedure` is a procedure declaration.
    pub fn set_body(&mut self, procedure: DeclId, body: Vec<Stmt>) {
        if let Some(proc) = self.procedure_mut(procedure) {
            proc.body = body;
        }
    }

    pub fn set_return_type(&mut self, procedure: DeclId, ty: DeclId) {
        if let Some(proc) = self.procedure_mut(procedure) {
            proc.return_type = Some(ty);
        }
    }

    pub fn module(&self, id: DeclId) -> Option<&ModuleDecl> {
        match self.get(id).map(|d| &d.kind) {
            Some(DeclKind::Module(module)) => Some(module),
            _ => None,
        }
    }

    pub fn procedure(&self, id: DeclId) -> Option<&ProcedureDecl> {
        match self.get(id).map(|d| &d.kind) {
            Some(DeclKind::Procedure(proc)) => Some(proc),
            _ => None,
        }
    }

    fn procedure_mut(&mut self, id: DeclId) -> Option<&mut ProcedureDecl> {
        match self.decls.get_mut(id.0 as usize).map(|d| &mut d.kind) {
            Some(DeclKind::Procedure(proc)) => Some(proc),
            _ => None,
        }
    }

    /// Names from the outermost scope down to `id` itself.
    pub fn scope_names(&self, id: DeclId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut cursor = self.get(id);
        while let Some(decl) = cursor {
            names.push(decl.name.as_str());
            cursor = decl.enclosing.and_then(|e| self.get(e));
        }
        names.reverse();
        names
    }
}
