use crate::ast::{DeclArena, DeclId, DeclKind, Designator, Expr, Selector, Stmt};
use crate::errors::{CodegenError, Result};
use crate::globals::GlobalRef;
use crate::module::CodegenModule;
use crate::ssa::SsaBuilder;
use indexmap::IndexMap;
use std::collections::HashMap;
use tinylang_ir::{
    verify::verify_function, ArgId, BlockId, FuncId, Function, FunctionBuilder, Linkage, Param,
    ParamAttr, Signature, TypeId, Value,
};
use tracing::{debug, debug_span, trace};

/// Generates the body of one procedure.
///
/// Scalar locals and by-value parameters live in SSA form; aggregates get a
/// stack slot; by-reference parameters and module variables are accessed
/// through memory. One instance per procedure, discarded afterwards.
pub struct ProcedureCodegen<'m, 'a> {
    pub(crate) cgm: &'m mut CodegenModule<'a>,
    pub(crate) arena: &'a DeclArena,
    pub(crate) proc: DeclId,
    pub(crate) builder: FunctionBuilder,
    pub(crate) ssa: SsaBuilder,
    formal_params: HashMap<DeclId, Value>,
    local_storage: HashMap<DeclId, Value>,
}

/// Where a variable's value lives.
enum Storage {
    Ssa,
    Memory(Value),
}

impl<'m, 'a> ProcedureCodegen<'m, 'a> {
    pub fn new(cgm: &'m mut CodegenModule<'a>, proc: DeclId) -> Result<Self> {
        let arena = cgm.arena();
        let signature = Self::create_function_type(cgm, proc)?;
        let function = Self::create_function(cgm, proc, signature);
        Ok(Self {
            cgm,
            arena,
            proc,
            builder: FunctionBuilder::new(function),
            ssa: SsaBuilder::new(),
            formal_params: HashMap::new(),
            local_storage: HashMap::new(),
        })
    }

    /// IR type of a variable, parameter or type declaration. With
    /// `honor_reference`, by-reference parameters map to an address.
    pub fn map_type(cgm: &mut CodegenModule<'a>, decl: DeclId, honor_reference: bool) -> Result<TypeId> {
        let arena = cgm.arena();
        let d = arena
            .get(decl)
            .ok_or_else(|| CodegenError::InvariantViolation(format!("unknown declaration {}", decl)))?;
        match d.kind {
            DeclKind::FormalParameter { by_ref: true, .. } if honor_reference => Ok(TypeId::PTR),
            DeclKind::FormalParameter { ty, .. } | DeclKind::Variable { ty } => cgm.convert_type(ty),
            DeclKind::Type(_) => cgm.convert_type(decl),
            ref other => Err(CodegenError::UnsupportedDeclarationKind(format!(
                "{} is a {}",
                d.name,
                other.describe()
            ))),
        }
    }

    pub fn create_function_type(cgm: &mut CodegenModule<'a>, proc: DeclId) -> Result<Signature> {
        let decl = cgm.arena().procedure(proc).ok_or_else(|| {
            CodegenError::InvariantViolation(format!("{} is not a procedure", proc))
        })?;

        let result = match decl.return_type {
            Some(ty) => Some(Self::map_type(cgm, ty, false)?),
            None => None,
        };

        let mut params = Vec::with_capacity(decl.params.len());
        for &fp in &decl.params {
            let name = cgm.arena().get(fp).map(|d| d.name.clone()).unwrap_or_default();
            let mut param = Param::new(name, Self::map_type(cgm, fp, true)?);
            if is_by_ref(cgm.arena(), fp) && cgm.config().param_attributes {
                let pointee = Self::map_type(cgm, fp, false)?;
                param = param
                    .with_attr(ParamAttr::Dereferenceable(cgm.types().store_size(pointee)))
                    .with_attr(ParamAttr::NoCapture);
            }
            params.push(param);
        }

        Ok(Signature::new(params, result))
    }

    pub fn create_function(cgm: &CodegenModule<'a>, proc: DeclId, signature: Signature) -> Function {
        Function::new(cgm.mangle(proc), Linkage::External, signature)
    }

    pub fn run(mut self) -> Result<(FuncId, Function)> {
        let name = self.builder.function().name.clone();
        let span = debug_span!("procedure", %name);
        let _enter = span.enter();
        debug!("generating procedure");

        let signature = self.builder.function().signature.clone();
        let id = self.cgm.declare_procedure(self.proc, &name, signature);

        let arena = self.arena;
        let proc = arena.procedure(self.proc).ok_or_else(|| {
            CodegenError::InvariantViolation(format!("{} is not a procedure", self.proc))
        })?;

        let entry = self.builder.create_block("entry");
        self.builder.switch_to_block(entry)?;

        for (index, &fp) in proc.params.iter().enumerate() {
            let arg = Value::Arg(ArgId(index as u32));
            if is_by_ref(arena, fp) {
                self.formal_params.insert(fp, arg);
                continue;
            }
            let ty = Self::map_type(self.cgm, fp, false)?;
            if self.cgm.types().is_aggregate(ty) {
                let slot = self.builder.alloca(ty)?;
                self.builder.store(slot.clone(), arg)?;
                self.local_storage.insert(fp, slot);
            } else {
                self.ssa.write(entry, fp, arg);
            }
        }

        for &local in &proc.decls {
            match arena.get(local).map(|d| &d.kind) {
                Some(DeclKind::Variable { .. }) => {
                    let ty = Self::map_type(self.cgm, local, false)?;
                    if self.cgm.types().is_aggregate(ty) {
                        let slot = self.builder.alloca(ty)?;
                        self.local_storage.insert(local, slot);
                    }
                }
                Some(DeclKind::Procedure(_)) => {
                    return Err(CodegenError::NestedProcedureUnsupported(
                        self.cgm.mangle(local),
                    ))
                }
                _ => {}
            }
        }

        self.emit(&proc.body)?;

        let curr = self.curr()?;
        if !self.builder.is_terminated(curr)? {
            self.builder.ret(None)?;
        }
        self.ssa.seal(&mut self.builder, curr)?;

        let function = self.builder.finish();
        if self.cgm.config().verify {
            verify_function(&function)
                .map_err(|e| CodegenError::InvariantViolation(e.to_string()))?;
        }
        debug!(
            blocks = function.blocks.len(),
            phis = function.phi_count(),
            "finished procedure"
        );
        Ok((id, function))
    }

    pub(crate) fn curr(&self) -> Result<BlockId> {
        Ok(self.builder.current_block()?)
    }

    fn set_curr(&mut self, block: BlockId) -> Result<()> {
        self.builder.switch_to_block(block)?;
        Ok(())
    }

    fn seal_curr(&mut self) -> Result<()> {
        let curr = self.curr()?;
        self.ssa.seal(&mut self.builder, curr)
    }

    fn create_block(&mut self, name: &str) -> BlockId {
        let block = self.builder.create_block(name);
        trace!(%block, name, "created block");
        block
    }

    /// Classify a variable or formal parameter referenced from this
    /// procedure.
    fn storage(&self, decl: DeclId) -> Result<Storage> {
        let d = self
            .arena
            .get(decl)
            .ok_or_else(|| CodegenError::InvariantViolation(format!("unknown declaration {}", decl)))?;
        match d.kind {
            DeclKind::Variable { .. } => {
                if d.enclosing == Some(self.proc) {
                    Ok(match self.local_storage.get(&decl) {
                        Some(slot) => Storage::Memory(slot.clone()),
                        None => Storage::Ssa,
                    })
                } else if d.enclosing == Some(self.cgm.module_decl()) {
                    match self.cgm.globals().variable(decl) {
                        Some(id) => Ok(Storage::Memory(Value::Global(id))),
                        None => Err(CodegenError::InvariantViolation(format!(
                            "global {} used before it was placed",
                            d.name
                        ))),
                    }
                } else {
                    Err(CodegenError::NestedProcedureUnsupported(d.name.clone()))
                }
            }
            DeclKind::FormalParameter { by_ref, .. } => {
                if d.enclosing != Some(self.proc) {
                    return Err(CodegenError::NestedProcedureUnsupported(d.name.clone()));
                }
                if by_ref {
                    self.formal_params
                        .get(&decl)
                        .cloned()
                        .map(Storage::Memory)
                        .ok_or_else(|| {
                            CodegenError::InvariantViolation(format!(
                                "no address bound for parameter {}",
                                d.name
                            ))
                        })
                } else {
                    Ok(match self.local_storage.get(&decl) {
                        Some(slot) => Storage::Memory(slot.clone()),
                        None => Storage::Ssa,
                    })
                }
            }
            ref other => Err(CodegenError::UnsupportedDeclarationKind(format!(
                "{} is a {}",
                d.name,
                other.describe()
            ))),
        }
    }

    pub fn write_variable(&mut self, decl: DeclId, value: Value) -> Result<()> {
        let value = self.ssa.resolve(value);
        match self.storage(decl)? {
            Storage::Ssa => {
                let curr = self.curr()?;
                self.ssa.write(curr, decl, value);
            }
            Storage::Memory(address) => self.builder.store(address, value)?,
        }
        Ok(())
    }

    pub fn read_variable(&mut self, decl: DeclId) -> Result<Value> {
        let ty = Self::map_type(self.cgm, decl, false)?;
        match self.storage(decl)? {
            Storage::Ssa => {
                let curr = self.curr()?;
                self.ssa.read(&mut self.builder, curr, decl, ty)
            }
            Storage::Memory(address) => Ok(self.builder.load(ty, address)?),
        }
    }

    /// Address of the storage a designator names, with the type stored
    /// there. `None` for a scalar held in SSA form.
    pub(crate) fn designator_address(&mut self, designator: &Designator) -> Result<Option<(Value, TypeId)>> {
        let base_ty = Self::map_type(self.cgm, designator.decl, false)?;
        let base = match self.storage(designator.decl)? {
            Storage::Memory(address) => address,
            Storage::Ssa if designator.selectors.is_empty() => return Ok(None),
            Storage::Ssa => {
                return Err(CodegenError::InvariantViolation(format!(
                    "selector applied to scalar {}",
                    designator.decl
                )))
            }
        };
        if designator.selectors.is_empty() {
            return Ok(Some((base, base_ty)));
        }

        let mut ty = base_ty;
        let mut indices = Vec::with_capacity(designator.selectors.len());
        for selector in &designator.selectors {
            let (index, position) = match selector {
                Selector::Index(expr) => (self.emit_expr(expr)?, 0),
                Selector::Field(field) => (Value::int(*field as i64), *field as u64),
            };
            ty = self.cgm.types().element_type(ty, position).ok_or_else(|| {
                CodegenError::InvariantViolation(format!(
                    "selector does not match the type of {}",
                    designator.decl
                ))
            })?;
            indices.push(self.ssa.resolve(index));
        }
        let address = self.builder.element_addr(base_ty, base, indices)?;
        Ok(Some((address, ty)))
    }

    pub fn emit(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            if self.builder.is_terminated(self.curr()?)? {
                trace!("skipping unreachable statements");
                break;
            }
            match stmt {
                Stmt::Assignment { target, value } => self.emit_assignment(target, value)?,
                Stmt::ProcedureCall { callee, args } => {
                    self.emit_call(*callee, args)?;
                }
                Stmt::If {
                    cond,
                    then_stmts,
                    else_stmts,
                } => self.emit_if(cond, then_stmts, else_stmts)?,
                Stmt::While { cond, body } => self.emit_while(cond, body)?,
                Stmt::Return(value) => self.emit_return(value.as_ref())?,
            }
        }
        Ok(())
    }

    fn emit_assignment(&mut self, target: &Designator, value: &Expr) -> Result<()> {
        let value = self.emit_expr(value)?;
        if target.selectors.is_empty() {
            return self.write_variable(target.decl, value);
        }
        match self.designator_address(target)? {
            Some((address, _)) => {
                let value = self.ssa.resolve(value);
                self.builder.store(address, value)?;
                Ok(())
            }
            None => Err(CodegenError::InvariantViolation(format!(
                "no storage for assignment to {}",
                target.decl
            ))),
        }
    }

    fn emit_if(&mut self, cond: &Expr, then_stmts: &[Stmt], else_stmts: &[Stmt]) -> Result<()> {
        let if_bb = self.create_block("if.body");
        let else_bb = if else_stmts.is_empty() {
            None
        } else {
            Some(self.create_block("else.body"))
        };
        let after_if = self.create_block("after.if");

        let cond = self.emit_expr(cond)?;
        let cond = self.ssa.resolve(cond);
        self.builder.branch(cond, if_bb, else_bb.unwrap_or(after_if))?;
        self.seal_curr()?;

        self.set_curr(if_bb)?;
        self.emit(then_stmts)?;
        self.close_arm(after_if)?;

        if let Some(else_bb) = else_bb {
            self.set_curr(else_bb)?;
            self.emit(else_stmts)?;
            self.close_arm(after_if)?;
        }

        self.set_curr(after_if)
    }

    fn close_arm(&mut self, after: BlockId) -> Result<()> {
        if !self.builder.is_terminated(self.curr()?)? {
            self.builder.jump(after)?;
        }
        self.seal_curr()
    }

    fn emit_while(&mut self, cond: &Expr, body: &[Stmt]) -> Result<()> {
        let cond_bb = self.create_block("while.cond");
        let body_bb = self.create_block("while.body");
        let after_while = self.create_block("after.while");

        self.builder.jump(cond_bb)?;
        self.seal_curr()?;

        self.set_curr(cond_bb)?;
        let cond = self.emit_expr(cond)?;
        let cond = self.ssa.resolve(cond);
        self.builder.branch(cond, body_bb, after_while)?;

        self.set_curr(body_bb)?;
        self.emit(body)?;
        if !self.builder.is_terminated(self.curr()?)? {
            self.builder.jump(cond_bb)?;
        }
        // The back edge exists now, so the condition block's predecessors
        // are final.
        self.ssa.seal(&mut self.builder, cond_bb)?;
        self.seal_curr()?;

        self.set_curr(after_while)
    }

    fn emit_return(&mut self, value: Option<&Expr>) -> Result<()> {
        let value = match value {
            Some(expr) => {
                let value = self.emit_expr(expr)?;
                Some(self.ssa.resolve(value))
            }
            None => None,
        };
        self.builder.ret(value)?;
        Ok(())
    }

    /// Lower a call. Reference arguments are passed as addresses; a scalar
    /// SSA local passed by reference is spilled around the call.
    pub(crate) fn emit_call(&mut self, callee: DeclId, args: &[Expr]) -> Result<Option<Value>> {
        let func = match self.cgm.globals().get(callee) {
            Some(GlobalRef::Procedure(id)) => id,
            _ => {
                return Err(CodegenError::InvariantViolation(format!(
                    "call to {} before its declaration was generated",
                    callee
                )))
            }
        };
        let params = self
            .arena
            .procedure(callee)
            .map(|p| p.params.clone())
            .unwrap_or_default();
        if params.len() != args.len() {
            return Err(CodegenError::InvariantViolation(format!(
                "{} expects {} arguments, got {}",
                callee,
                params.len(),
                args.len()
            )));
        }
        let result_ty = self
            .cgm
            .program()
            .function(func)
            .and_then(|f| f.signature.result);

        let mut values = Vec::with_capacity(args.len());
        // One slot per spilled local, shared by every reference argument
        // naming it, so the callee sees the aliasing.
        let mut spills: IndexMap<DeclId, (Value, TypeId)> = IndexMap::new();
        for (&param, arg) in params.iter().zip(args) {
            if !is_by_ref(self.arena, param) {
                let value = self.emit_expr(arg)?;
                values.push(value);
                continue;
            }
            let designator = match arg {
                Expr::Designator(designator) => designator,
                _ => {
                    return Err(CodegenError::InvariantViolation(format!(
                        "reference parameter {} needs a designator argument",
                        param
                    )))
                }
            };
            match self.designator_address(designator)? {
                Some((address, _)) => values.push(address),
                None => {
                    if let Some((slot, _)) = spills.get(&designator.decl) {
                        values.push(slot.clone());
                        continue;
                    }
                    let ty = Self::map_type(self.cgm, designator.decl, false)?;
                    let current = self.read_variable(designator.decl)?;
                    let current = self.ssa.resolve(current);
                    let slot = self.builder.entry_alloca(ty)?;
                    self.builder.store(slot.clone(), current)?;
                    trace!(decl = %designator.decl, slot = ?slot, "spilled for reference argument");
                    values.push(slot.clone());
                    spills.insert(designator.decl, (slot, ty));
                }
            }
        }

        let values = values.into_iter().map(|v| self.ssa.resolve(v)).collect();
        let result = self.builder.call(func, result_ty, values)?;

        for (decl, (slot, ty)) in spills {
            let updated = self.builder.load(ty, slot)?;
            self.write_variable(decl, updated)?;
        }
        Ok(result)
    }
}

fn is_by_ref(arena: &DeclArena, decl: DeclId) -> bool {
    matches!(
        arena.get(decl).map(|d| &d.kind),
        Some(DeclKind::FormalParameter { by_ref: true, .. })
    )
}
