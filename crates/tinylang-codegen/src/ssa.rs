/*! On-the-fly SSA construction for local variables.
 *
 * Values are tracked per (block, declaration) while statements are lowered, without a prior CFG,
 * dominator tree or renaming pass. Reads that miss in a block either place a placeholder phi (the
 * block is still open, more predecessors may appear) or walk up into the predecessors (the block
 * is sealed). Phis that turn out to merge a single value are folded away as soon as that is known,
 * and their users are re-examined because they may have become redundant in turn.
 */

use crate::ast::DeclId;
use crate::errors::{CodegenError, Result};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tinylang_ir::{BlockId, FunctionBuilder, TempId, TypeId, Value};
use tracing::{debug, trace};

/// Definition table and sealing state for one procedure.
#[derive(Debug, Default)]
pub struct SsaBuilder {
    current_def: HashMap<BlockId, HashMap<DeclId, Value>>,
    sealed: HashSet<BlockId>,
    incomplete_phis: IndexMap<BlockId, Vec<(TempId, DeclId)>>,
    /// Phis folded into another value. Lets a caller that still holds a
    /// folded phi find its replacement.
    replaced: HashMap<TempId, Value>,
    /// Phis whose operands are being collected right now.
    filling: HashSet<TempId>,
}

impl SsaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sealed(&self, block: BlockId) -> bool {
        self.sealed.contains(&block)
    }

    pub fn write(&mut self, block: BlockId, decl: DeclId, value: Value) {
        self.current_def
            .entry(block)
            .or_default()
            .insert(decl, value);
    }

    /// Follow phi replacements until reaching a value that is still live.
    pub fn resolve(&self, value: Value) -> Value {
        let mut value = value;
        let mut steps = 0;
        while let Value::Temp(t) = value {
            match self.replaced.get(&t) {
                Some(next) if steps <= self.replaced.len() => {
                    value = next.clone();
                    steps += 1;
                }
                _ => break,
            }
        }
        value
    }

    pub fn read(
        &mut self,
        builder: &mut FunctionBuilder,
        block: BlockId,
        decl: DeclId,
        ty: TypeId,
    ) -> Result<Value> {
        if let Some(value) = self.current_def.get(&block).and_then(|defs| defs.get(&decl)) {
            return Ok(self.resolve(value.clone()));
        }
        self.read_recursive(builder, block, decl, ty)
    }

    fn read_recursive(
        &mut self,
        builder: &mut FunctionBuilder,
        block: BlockId,
        decl: DeclId,
        ty: TypeId,
    ) -> Result<Value> {
        let value = if !self.is_sealed(block) {
            let phi = builder.insert_phi(block, ty)?;
            trace!(%block, %decl, %phi, "incomplete phi");
            self.incomplete_phis
                .entry(block)
                .or_default()
                .push((phi, decl));
            Value::Temp(phi)
        } else {
            let preds = builder.predecessors(block)?;
            if let [pred] = preds.as_slice() {
                self.read(builder, *pred, decl, ty)?
            } else {
                let phi = builder.insert_phi(block, ty)?;
                trace!(%block, %decl, %phi, "phi");
                // Bind before recursing so a back edge finds the phi instead
                // of walking around the loop forever.
                self.write(block, decl, Value::Temp(phi));
                self.add_phi_operands(builder, block, decl, phi)?
            }
        };
        self.write(block, decl, value.clone());
        Ok(value)
    }

    fn add_phi_operands(
        &mut self,
        builder: &mut FunctionBuilder,
        block: BlockId,
        decl: DeclId,
        phi: TempId,
    ) -> Result<Value> {
        let ty = builder.value_type(&Value::Temp(phi))?;
        self.filling.insert(phi);
        for pred in builder.predecessors(block)? {
            let value = self.read(builder, pred, decl, ty)?;
            builder.add_phi_incoming(phi, pred, value)?;
        }
        self.filling.remove(&phi);
        self.try_remove_trivial_phi(builder, phi)
    }

    /// Fold `phi` away if it merges at most one distinct value besides
    /// itself. Returns the value that now stands for it.
    pub fn try_remove_trivial_phi(
        &mut self,
        builder: &mut FunctionBuilder,
        phi: TempId,
    ) -> Result<Value> {
        let this = Value::Temp(phi);
        let mut same: Option<Value> = None;
        for (_, operand) in builder.phi_incoming(phi)? {
            let operand = self.resolve(operand);
            if operand == this || same.as_ref() == Some(&operand) {
                continue;
            }
            if same.is_some() {
                return Ok(this);
            }
            same = Some(operand);
        }

        let same = match same {
            Some(value) => value,
            None => Value::Undef(builder.value_type(&this)?),
        };

        let users: Vec<TempId> = builder
            .phi_users(&this)
            .into_iter()
            .filter(|user| *user != phi)
            .collect();

        builder.replace_all_uses(&this, &same);
        builder.remove_phi(phi)?;
        for defs in self.current_def.values_mut() {
            for value in defs.values_mut() {
                if *value == this {
                    *value = same.clone();
                }
            }
        }
        self.replaced.insert(phi, same.clone());
        debug!(%phi, replacement = ?same, "removed trivial phi");

        for user in users {
            if builder.is_phi(user) && !self.filling.contains(&user) {
                self.try_remove_trivial_phi(builder, user)?;
            }
        }
        Ok(same)
    }

    /// Mark `block`'s predecessor list final and complete its placeholder
    /// phis. Sealing is one-shot.
    pub fn seal(&mut self, builder: &mut FunctionBuilder, block: BlockId) -> Result<()> {
        if self.is_sealed(block) {
            return Err(CodegenError::InvariantViolation(format!(
                "attempt to seal already sealed block {}",
                block
            )));
        }

        // Completing one phi can place another in this block while it is
        // still open, so drain until nothing is pending.
        while let Some(pending) = self.incomplete_phis.shift_remove(&block) {
            for (phi, decl) in pending {
                if builder.is_phi(phi) {
                    self.add_phi_operands(builder, block, decl, phi)?;
                }
            }
        }

        self.sealed.insert(block);
        debug!(%block, "sealed");
        Ok(())
    }

    pub fn pending_phis(&self, block: BlockId) -> usize {
        self.incomplete_phis.get(&block).map_or(0, Vec::len)
    }
}
