use crate::{
    block::{BlockId, Terminator},
    function::Function,
    instructions::{BinaryOp, CompareOp, Instruction, UnaryOp},
    types::TypeId,
    values::{FuncId, TempId, Value},
    IrError, Result,
};
use std::collections::HashMap;

/// Cursor-style builder over a single function body.
///
/// Instructions are appended to the current block. Setting a terminator
/// records the edge on every successor's predecessor list, in the order edges
/// are created, so predecessor order is deterministic.
pub struct FunctionBuilder {
    function: Function,
    current_block: Option<BlockId>,
    phi_blocks: HashMap<TempId, BlockId>,
}

impl FunctionBuilder {
    pub fn new(function: Function) -> Self {
        Self {
            function,
            current_block: None,
            phi_blocks: HashMap::new(),
        }
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn finish(self) -> Function {
        self.function
    }

    pub fn create_block(&mut self, name: &str) -> BlockId {
        self.function.create_block(name)
    }

    pub fn switch_to_block(&mut self, block: BlockId) -> Result<()> {
        self.function.block(block)?;
        self.current_block = Some(block);
        Ok(())
    }

    pub fn current_block(&self) -> Result<BlockId> {
        self.current_block
            .ok_or_else(|| IrError::BuilderError("No current block".to_string()))
    }

    pub fn is_terminated(&self, block: BlockId) -> Result<bool> {
        Ok(self.function.block(block)?.is_terminated())
    }

    pub fn predecessors(&self, block: BlockId) -> Result<Vec<BlockId>> {
        Ok(self.function.block(block)?.predecessors.clone())
    }

    pub fn value_type(&self, value: &Value) -> Result<TypeId> {
        self.function.value_type(value)
    }

    fn push(&mut self, inst: Instruction) -> Result<()> {
        let block_id = self.current_block()?;
        let block = self.function.block_mut(block_id)?;
        if block.is_terminated() {
            return Err(IrError::AlreadyTerminated(block_id));
        }
        block.add_instruction(inst);
        Ok(())
    }

    fn emit(&mut self, ty: TypeId, make: impl FnOnce(TempId) -> Instruction) -> Result<Value> {
        let result = self.function.new_temp(ty);
        self.push(make(result))?;
        Ok(Value::Temp(result))
    }

    pub fn binary(&mut self, op: BinaryOp, ty: TypeId, left: Value, right: Value) -> Result<Value> {
        self.emit(ty, |result| Instruction::Binary {
            result,
            op,
            ty,
            left,
            right,
        })
    }

    pub fn compare(&mut self, op: CompareOp, left: Value, right: Value) -> Result<Value> {
        self.emit(TypeId::I1, |result| Instruction::Compare {
            result,
            op,
            left,
            right,
        })
    }

    pub fn unary(&mut self, op: UnaryOp, ty: TypeId, operand: Value) -> Result<Value> {
        self.emit(ty, |result| Instruction::Unary {
            result,
            op,
            ty,
            operand,
        })
    }

    pub fn alloca(&mut self, ty: TypeId) -> Result<Value> {
        self.emit(TypeId::PTR, |result| Instruction::Alloca { result, ty })
    }

    /// Allocate a stack slot at the top of the entry block, after the slots
    /// already placed there, whatever block is current.
    pub fn entry_alloca(&mut self, ty: TypeId) -> Result<Value> {
        let entry = self
            .function
            .entry_block()
            .ok_or_else(|| IrError::BuilderError("function has no entry block".to_string()))?;
        let result = self.function.new_temp(TypeId::PTR);
        let bb = self.function.block_mut(entry)?;
        let at = bb
            .instructions
            .iter()
            .take_while(|inst| inst.is_phi() || matches!(inst, Instruction::Alloca { .. }))
            .count();
        bb.instructions.insert(at, Instruction::Alloca { result, ty });
        Ok(Value::Temp(result))
    }

    pub fn load(&mut self, ty: TypeId, address: Value) -> Result<Value> {
        self.emit(ty, |result| Instruction::Load {
            result,
            ty,
            address,
        })
    }

    pub fn store(&mut self, address: Value, value: Value) -> Result<()> {
        self.push(Instruction::Store { address, value })
    }

    pub fn element_addr(
        &mut self,
        aggregate: TypeId,
        base: Value,
        indices: Vec<Value>,
    ) -> Result<Value> {
        self.emit(TypeId::PTR, |result| Instruction::ElementAddr {
            result,
            aggregate,
            base,
            indices,
        })
    }

    pub fn call(
        &mut self,
        callee: FuncId,
        result_ty: Option<TypeId>,
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        match result_ty {
            Some(ty) => self
                .emit(ty, |result| Instruction::Call {
                    result: Some(result),
                    callee,
                    args,
                })
                .map(Some),
            None => {
                self.push(Instruction::Call {
                    result: None,
                    callee,
                    args,
                })?;
                Ok(None)
            }
        }
    }

    pub fn jump(&mut self, target: BlockId) -> Result<()> {
        self.terminate(Terminator::Jump(target))
    }

    pub fn branch(&mut self, condition: Value, then_block: BlockId, else_block: BlockId) -> Result<()> {
        self.terminate(Terminator::Branch {
            condition,
            then_block,
            else_block,
        })
    }

    pub fn ret(&mut self, value: Option<Value>) -> Result<()> {
        self.terminate(Terminator::Return(value))
    }

    fn terminate(&mut self, terminator: Terminator) -> Result<()> {
        let block_id = self.current_block()?;
        if self.function.block(block_id)?.is_terminated() {
            return Err(IrError::AlreadyTerminated(block_id));
        }

        for succ in terminator.successors() {
            let target = self.function.block_mut(succ)?;
            if !target.predecessors.contains(&block_id) {
                target.predecessors.push(block_id);
            }
        }

        self.function.block_mut(block_id)?.terminator = terminator;
        Ok(())
    }

    /// Insert an operand-less phi after the existing phis of `block`.
    pub fn insert_phi(&mut self, block: BlockId, ty: TypeId) -> Result<TempId> {
        let result = self.function.new_temp(ty);
        let bb = self.function.block_mut(block)?;
        let at = bb.phi_count();
        bb.instructions.insert(
            at,
            Instruction::Phi {
                result,
                ty,
                incoming: Vec::new(),
            },
        );
        self.phi_blocks.insert(result, block);
        Ok(result)
    }

    pub fn is_phi(&self, value: TempId) -> bool {
        self.phi_blocks.contains_key(&value)
    }

    fn phi_mut(&mut self, phi: TempId) -> Result<&mut Vec<(BlockId, Value)>> {
        let block = *self.phi_blocks.get(&phi).ok_or(IrError::NotAPhi(phi))?;
        self.function
            .block_mut(block)?
            .instructions
            .iter_mut()
            .find_map(|inst| match inst {
                Instruction::Phi {
                    result, incoming, ..
                } if *result == phi => Some(incoming),
                _ => None,
            })
            .ok_or(IrError::NotAPhi(phi))
    }

    pub fn add_phi_incoming(&mut self, phi: TempId, pred: BlockId, value: Value) -> Result<()> {
        self.phi_mut(phi)?.push((pred, value));
        Ok(())
    }

    pub fn phi_incoming(&mut self, phi: TempId) -> Result<Vec<(BlockId, Value)>> {
        Ok(self.phi_mut(phi)?.clone())
    }

    /// Live phis that take `value` as an operand, in block order.
    pub fn phi_users(&self, value: &Value) -> Vec<TempId> {
        self.function
            .blocks
            .values()
            .flat_map(|bb| bb.phis())
            .filter_map(|inst| match inst {
                Instruction::Phi {
                    result, incoming, ..
                } if incoming.iter().any(|(_, v)| v == value) => Some(*result),
                _ => None,
            })
            .collect()
    }

    /// Rewrite every operand equal to `old` into `new`. Returns the number of
    /// operands rewritten.
    pub fn replace_all_uses(&mut self, old: &Value, new: &Value) -> usize {
        let mut replaced = 0;
        for bb in self.function.blocks.values_mut() {
            let operands = bb
                .instructions
                .iter_mut()
                .flat_map(|inst| inst.operands_mut())
                .chain(bb.terminator.operands_mut());
            for operand in operands {
                if operand == old {
                    *operand = new.clone();
                    replaced += 1;
                }
            }
        }
        replaced
    }

    pub fn remove_phi(&mut self, phi: TempId) -> Result<()> {
        let block = self.phi_blocks.remove(&phi).ok_or(IrError::NotAPhi(phi))?;
        self.function
            .block_mut(block)?
            .instructions
            .retain(|inst| !(inst.is_phi() && inst.result() == Some(phi)));
        if let Some(data) = self.function.temps.get_mut(phi.0 as usize) {
            data.removed = true;
        }
        Ok(())
    }
}
