use crate::{
    block::{BasicBlock, BlockId, Terminator},
    function::Function,
    program::Program,
    values::Value,
    IrError, Result,
};
use std::collections::{BTreeSet, HashMap};

pub fn verify_program(program: &Program) -> Result<()> {
    for function in program.functions.values() {
        if !function.is_declaration() {
            verify_function(function)?;
        }
    }
    Ok(())
}

/// Structural checks on a finished function body:
/// every block is terminated, branch targets exist, recorded predecessor
/// lists match the terminators, phis lead their block and carry exactly one
/// operand per predecessor, and no operand refers to a removed value.
pub fn verify_function(function: &Function) -> Result<()> {
    let fail = |message: String| IrError::Verification {
        function: function.name.clone(),
        message,
    };

    let mut incoming: HashMap<BlockId, BTreeSet<BlockId>> = HashMap::new();
    for block in function.blocks.values() {
        if matches!(block.terminator, Terminator::Invalid) {
            return Err(fail(format!("{} ({}) has no terminator", block.id, block.name)));
        }
        for succ in block.successors() {
            if !function.blocks.contains_key(&succ) {
                return Err(fail(format!("{} branches to missing {}", block.id, succ)));
            }
            incoming.entry(succ).or_default().insert(block.id);
        }
    }

    for block in function.blocks.values() {
        let recorded: BTreeSet<BlockId> = block.predecessors.iter().copied().collect();
        let actual = incoming.remove(&block.id).unwrap_or_default();
        if recorded != actual || recorded.len() != block.predecessors.len() {
            return Err(fail(format!(
                "{} records predecessors {:?} but is reached from {:?}",
                block.id, block.predecessors, actual
            )));
        }

        verify_phis(function, block).map_err(fail)?;

        for inst in &block.instructions {
            for operand in inst.operands() {
                check_operand(function, operand).map_err(fail)?;
            }
        }
        for operand in block.terminator.operands() {
            check_operand(function, operand).map_err(fail)?;
        }
    }

    Ok(())
}

fn verify_phis(function: &Function, block: &BasicBlock) -> std::result::Result<(), String> {
    let leading = block.phi_count();
    if block.instructions[leading..].iter().any(|inst| inst.is_phi()) {
        return Err(format!("{} has a phi after a non-phi instruction", block.id));
    }

    let preds: BTreeSet<BlockId> = block.predecessors.iter().copied().collect();
    for phi in block.phis() {
        if let crate::instructions::Instruction::Phi {
            result, incoming, ..
        } = phi
        {
            let from: BTreeSet<BlockId> = incoming.iter().map(|(b, _)| *b).collect();
            if from != preds || incoming.len() != block.predecessors.len() {
                return Err(format!(
                    "phi {} in {} has operands from {:?}, expected one per predecessor {:?}",
                    result, block.id, from, block.predecessors
                ));
            }
            if !function.is_live_temp(*result) {
                return Err(format!("phi {} in {} was removed", result, block.id));
            }
        }
    }
    Ok(())
}

fn check_operand(function: &Function, operand: &Value) -> std::result::Result<(), String> {
    match operand {
        Value::Temp(t) if !function.is_live_temp(*t) => {
            Err(format!("use of removed or unknown value {}", t))
        }
        Value::Arg(a) if a.0 as usize >= function.signature.params.len() => {
            Err(format!("use of unknown argument {}", a))
        }
        _ => Ok(()),
    }
}
