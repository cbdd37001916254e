use crate::block::{BlockId, Terminator};
use crate::builder::FunctionBuilder;
use crate::function::{Function, Linkage, Param, Signature};
use crate::instructions::{BinaryOp, CompareOp, Instruction};
use crate::types::TypeId;
use crate::values::{ArgId, TempId, Value};
use crate::IrError;
use pretty_assertions::assert_eq;

fn builder_with_param() -> FunctionBuilder {
    let signature = Signature::new(vec![Param::new("x", TypeId::I64)], Some(TypeId::I64));
    FunctionBuilder::new(Function::new("f", Linkage::External, signature))
}

#[test]
fn test_terminators_record_predecessors_in_edge_order() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    let left = b.create_block("left");
    let right = b.create_block("right");
    let join = b.create_block("join");

    b.switch_to_block(entry).unwrap();
    let cond = b
        .compare(CompareOp::Sgt, Value::Arg(ArgId(0)), Value::int(0))
        .unwrap();
    b.branch(cond, left, right).unwrap();

    b.switch_to_block(right).unwrap();
    b.jump(join).unwrap();
    b.switch_to_block(left).unwrap();
    b.jump(join).unwrap();

    assert_eq!(b.predecessors(left).unwrap(), vec![entry]);
    assert_eq!(b.predecessors(right).unwrap(), vec![entry]);
    assert_eq!(b.predecessors(join).unwrap(), vec![right, left]);
}

#[test]
fn test_block_cannot_be_terminated_twice() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    b.switch_to_block(entry).unwrap();
    b.ret(None).unwrap();

    assert_eq!(b.ret(None), Err(IrError::AlreadyTerminated(entry)));
    assert_eq!(
        b.binary(BinaryOp::Add, TypeId::I64, Value::int(1), Value::int(2)),
        Err(IrError::AlreadyTerminated(entry))
    );
}

#[test]
fn test_unknown_targets_are_rejected() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    b.switch_to_block(entry).unwrap();
    assert_eq!(b.jump(BlockId(42)), Err(IrError::UnknownBlock(BlockId(42))));
    assert!(b.switch_to_block(BlockId(7)).is_err());
}

#[test]
fn test_phis_are_kept_at_block_front() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    b.switch_to_block(entry).unwrap();
    b.binary(BinaryOp::Add, TypeId::I64, Value::int(1), Value::int(2))
        .unwrap();

    let p1 = b.insert_phi(entry, TypeId::I64).unwrap();
    let p2 = b.insert_phi(entry, TypeId::I1).unwrap();

    let block = b.function().block(entry).unwrap();
    assert_eq!(block.phi_count(), 2);
    assert_eq!(block.instructions[0].result(), Some(p1));
    assert_eq!(block.instructions[1].result(), Some(p2));
    assert!(!block.instructions[2].is_phi());
    assert_eq!(b.value_type(&Value::Temp(p2)).unwrap(), TypeId::I1);
}

#[test]
fn test_replace_all_uses_rewrites_instructions_phis_and_terminators() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    let next = b.create_block("next");
    b.switch_to_block(entry).unwrap();
    b.jump(next).unwrap();

    let phi = b.insert_phi(next, TypeId::I64).unwrap();
    b.add_phi_incoming(phi, entry, Value::Arg(ArgId(0))).unwrap();
    let other = b.insert_phi(next, TypeId::I64).unwrap();
    b.add_phi_incoming(other, entry, Value::Temp(phi)).unwrap();

    b.switch_to_block(next).unwrap();
    let sum = b
        .binary(BinaryOp::Add, TypeId::I64, Value::Temp(phi), Value::Temp(phi))
        .unwrap();
    b.ret(Some(Value::Temp(phi))).unwrap();

    assert_eq!(b.phi_users(&Value::Temp(phi)), vec![other]);

    let replaced = b.replace_all_uses(&Value::Temp(phi), &Value::Arg(ArgId(0)));
    assert_eq!(replaced, 4);
    b.remove_phi(phi).unwrap();

    let f = b.finish();
    let block = f.block(next).unwrap();
    assert_eq!(block.phi_count(), 1);
    assert_eq!(
        block.instructions[0],
        Instruction::Phi {
            result: other,
            ty: TypeId::I64,
            incoming: vec![(entry, Value::Arg(ArgId(0)))],
        }
    );
    assert_eq!(block.instructions[1].operands(), vec![&Value::Arg(ArgId(0)); 2]);
    assert_eq!(block.terminator, Terminator::Return(Some(Value::Arg(ArgId(0)))));
    assert!(!f.is_live_temp(phi));
    assert_eq!(sum.as_temp().map(|t| f.is_live_temp(t)), Some(true));
}

#[test]
fn test_remove_phi_rejects_non_phis() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    b.switch_to_block(entry).unwrap();
    let v = b
        .binary(BinaryOp::Mul, TypeId::I64, Value::int(3), Value::int(4))
        .unwrap();
    let t = v.as_temp().unwrap();
    assert_eq!(b.remove_phi(t), Err(IrError::NotAPhi(t)));
    assert_eq!(b.remove_phi(TempId(99)), Err(IrError::NotAPhi(TempId(99))));
}

#[test]
fn test_call_without_result() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    b.switch_to_block(entry).unwrap();
    let none = b
        .call(crate::values::FuncId(0), None, vec![Value::int(1)])
        .unwrap();
    let some = b
        .call(crate::values::FuncId(0), Some(TypeId::I64), vec![])
        .unwrap();
    assert!(none.is_none());
    assert_eq!(b.value_type(&some.unwrap()).unwrap(), TypeId::I64);
}

#[test]
fn test_entry_alloca_lands_at_top_of_entry() {
    let mut b = builder_with_param();
    let entry = b.create_block("entry");
    let body = b.create_block("body");
    b.switch_to_block(entry).unwrap();
    let first = b.alloca(TypeId::I64).unwrap();
    let sum = b
        .binary(BinaryOp::Add, TypeId::I64, Value::Arg(ArgId(0)), Value::int(1))
        .unwrap();
    b.jump(body).unwrap();

    b.switch_to_block(body).unwrap();
    let second = b.entry_alloca(TypeId::I64).unwrap();
    b.ret(Some(sum.clone())).unwrap();

    let function = b.finish();
    let entry_insts = &function.block(entry).unwrap().instructions;
    let results: Vec<Option<TempId>> = entry_insts.iter().map(|inst| inst.result()).collect();
    let as_temp = |v: &Value| match v {
        Value::Temp(t) => Some(*t),
        _ => None,
    };
    assert_eq!(results, vec![as_temp(&first), as_temp(&second), as_temp(&sum)]);
    assert!(matches!(entry_insts[1], Instruction::Alloca { .. }));
    assert!(function.block(body).unwrap().instructions.is_empty());
}
