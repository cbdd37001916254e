use super::*;
use pretty_assertions::assert_eq;
use tinylang_ir::{
    BlockId, Function, FunctionBuilder, Linkage, Param, Signature, TypeId, TypeRegistry, Value,
};

fn builder() -> FunctionBuilder {
    let signature = Signature::new(vec![Param::new("c", TypeId::I1)], None);
    FunctionBuilder::new(Function::new("f", Linkage::External, signature))
}

const X: DeclId = DeclId(7);

#[test]
fn test_mangle_scope_chain() {
    let mut arena = DeclArena::new();
    let m = arena.add_module("M");
    let p = arena.add_procedure(m, "P");
    let int = arena.add_pervasive("INTEGER");
    let x = arena.add_variable(p, "x", int);

    let mangler = Mangler::new("_t");
    assert_eq!(mangler.mangle(&arena, x), "_t1M1P1x");
    assert_eq!(mangler.mangle(&arena, p), "_t1M1P");
    assert_eq!(mangler.mangle(&arena, m), "_t1M");
}

#[test]
fn test_mangle_length_prefix_is_injective() {
    let a = mangle_parts("_t", ["ab", "c"]);
    let b = mangle_parts("_t", ["a", "bc"]);
    assert_eq!(a, "_t2ab1c");
    assert_eq!(b, "_t1a2bc");
    assert_ne!(a, b);
}

#[test]
fn test_lower_pervasive_and_alias() {
    let mut arena = DeclArena::new();
    let m = arena.add_module("M");
    let int = arena.add_pervasive("INTEGER");
    let boolean = arena.add_pervasive("BOOLEAN");
    let count = arena.add_alias(m, "Count", int);

    let mut types = TypeRegistry::new();
    let mut lowering = TypeLowering::new();
    assert_eq!(lowering.lower(&arena, &mut types, int).unwrap(), TypeId::I64);
    assert_eq!(lowering.lower(&arena, &mut types, boolean).unwrap(), TypeId::I1);
    assert_eq!(lowering.lower(&arena, &mut types, count).unwrap(), TypeId::I64);

    // the alias has its own entry now
    assert_eq!(lowering.cached(count), Some(TypeId::I64));
    assert_eq!(lowering.lower(&arena, &mut types, count).unwrap(), TypeId::I64);
    assert_eq!(lowering.stats(), CacheStats { hits: 2, misses: 3 });
}

#[test]
fn test_lower_array_needs_literal_length() {
    let mut arena = DeclArena::new();
    let m = arena.add_module("M");
    let int = arena.add_pervasive("INTEGER");
    let n = arena.add_variable(m, "n", int);
    let good = arena.add_array(m, "Good", Expr::Integer(4), int);
    let bad = arena.add_array(m, "Bad", Expr::var(n), int);

    let mut types = TypeRegistry::new();
    let mut lowering = TypeLowering::new();
    let ty = lowering.lower(&arena, &mut types, good).unwrap();
    assert_eq!(types.display(ty), "[4 x i64]");

    let err = lowering.lower(&arena, &mut types, bad).unwrap_err();
    assert!(err.is_invariant_violation(), "{err}");
}

#[test]
fn test_lower_unknown_pervasive_is_unsupported() {
    let mut arena = DeclArena::new();
    let real = arena.add_pervasive("REAL");
    let mut types = TypeRegistry::new();
    let err = TypeLowering::new().lower(&arena, &mut types, real).unwrap_err();
    assert_eq!(err, CodegenError::UnsupportedType("REAL".to_string()));
    assert!(err.is_unsupported());
}

#[test]
fn test_lower_self_referential_record_is_rejected() {
    let mut arena = DeclArena::new();
    let m = arena.add_module("M");
    let next = DeclId(arena.len() as u32);
    let node = arena.add_record(m, "Node", vec![("next", next)]);
    assert_eq!(node, next);

    let mut types = TypeRegistry::new();
    let mut lowering = TypeLowering::new();
    let err = lowering.lower(&arena, &mut types, node).unwrap_err();
    assert_eq!(err, CodegenError::RecursiveType("Node".to_string()));
    assert_eq!(lowering.cached(node), None);
}

#[test]
fn test_lower_mutually_recursive_aliases_is_rejected() {
    let mut arena = DeclArena::new();
    let m = arena.add_module("M");
    let b_id = DeclId(arena.len() as u32 + 1);
    let a = arena.add_alias(m, "A", b_id);
    let b = arena.add_alias(m, "B", a);
    assert_eq!(b, b_id);

    let mut types = TypeRegistry::new();
    let err = TypeLowering::new().lower(&arena, &mut types, a).unwrap_err();
    assert!(matches!(err, CodegenError::RecursiveType(_)));
}

#[test]
fn test_non_type_declaration_does_not_lower() {
    let mut arena = DeclArena::new();
    let m = arena.add_module("M");
    let mut types = TypeRegistry::new();
    let err = TypeLowering::new().lower(&arena, &mut types, m).unwrap_err();
    assert!(matches!(err, CodegenError::UnsupportedType(_)));
}

#[test]
fn test_seal_twice_is_rejected() {
    let mut b = builder();
    let entry = b.create_block("entry");
    let mut ssa = SsaBuilder::new();
    ssa.seal(&mut b, entry).unwrap();
    assert!(ssa.is_sealed(entry));

    let err = ssa.seal(&mut b, entry).unwrap_err();
    assert!(err.is_invariant_violation());
}

#[test]
fn test_read_in_open_block_places_pending_phi() {
    let mut b = builder();
    let entry = b.create_block("entry");
    let mut ssa = SsaBuilder::new();

    let value = ssa.read(&mut b, entry, X, TypeId::I64).unwrap();
    assert!(value.as_temp().is_some_and(|t| b.is_phi(t)));
    assert_eq!(ssa.pending_phis(entry), 1);

    // a second read short-circuits on the bound placeholder
    assert_eq!(ssa.read(&mut b, entry, X, TypeId::I64).unwrap(), value);
    assert_eq!(b.function().phi_count(), 1);

    // no predecessors: the placeholder folds into undef
    ssa.seal(&mut b, entry).unwrap();
    assert_eq!(ssa.pending_phis(entry), 0);
    assert_eq!(ssa.resolve(value), Value::Undef(TypeId::I64));
    assert_eq!(b.function().phi_count(), 0);
}

/// entry -> (left | right) -> join, with `x` written in entry and maybe in
/// `left`.
fn diamond(ssa: &mut SsaBuilder, left_value: Option<i64>) -> (FunctionBuilder, [BlockId; 4]) {
    let mut b = builder();
    let entry = b.create_block("entry");
    let left = b.create_block("left");
    let right = b.create_block("right");
    let join = b.create_block("join");

    b.switch_to_block(entry).unwrap();
    ssa.write(entry, X, Value::int(0));
    b.branch(Value::Arg(tinylang_ir::ArgId(0)), left, right).unwrap();
    ssa.seal(&mut b, entry).unwrap();

    b.switch_to_block(left).unwrap();
    if let Some(v) = left_value {
        ssa.write(left, X, Value::int(v));
    }
    b.jump(join).unwrap();
    ssa.seal(&mut b, left).unwrap();

    b.switch_to_block(right).unwrap();
    b.jump(join).unwrap();
    ssa.seal(&mut b, right).unwrap();

    ssa.seal(&mut b, join).unwrap();
    (b, [entry, left, right, join])
}

#[test]
fn test_merge_of_different_definitions_gets_a_phi() {
    let mut ssa = SsaBuilder::new();
    let (mut b, [_, left, right, join]) = diamond(&mut ssa, Some(1));

    let value = ssa.read(&mut b, join, X, TypeId::I64).unwrap();
    let phi = value.as_temp().unwrap();
    assert_eq!(
        b.phi_incoming(phi).unwrap(),
        vec![(left, Value::int(1)), (right, Value::int(0))]
    );
}

#[test]
fn test_merge_of_identical_definitions_has_no_phi() {
    let mut ssa = SsaBuilder::new();
    let (mut b, [_, _, _, join]) = diamond(&mut ssa, Some(0));

    let value = ssa.read(&mut b, join, X, TypeId::I64).unwrap();
    assert_eq!(value, Value::int(0));
    assert_eq!(b.function().phi_count(), 0);
}

#[test]
fn test_loop_invariant_variable_folds_header_phi() {
    let mut b = builder();
    let mut ssa = SsaBuilder::new();
    let entry = b.create_block("entry");
    let header = b.create_block("header");
    let body = b.create_block("body");
    let exit = b.create_block("exit");

    b.switch_to_block(entry).unwrap();
    ssa.write(entry, X, Value::int(5));
    b.jump(header).unwrap();
    ssa.seal(&mut b, entry).unwrap();

    b.switch_to_block(header).unwrap();
    let in_header = ssa.read(&mut b, header, X, TypeId::I64).unwrap();
    assert_eq!(ssa.pending_phis(header), 1);
    b.branch(Value::Arg(tinylang_ir::ArgId(0)), body, exit).unwrap();

    b.switch_to_block(body).unwrap();
    b.jump(header).unwrap();
    ssa.seal(&mut b, header).unwrap();
    ssa.seal(&mut b, body).unwrap();

    assert_eq!(ssa.resolve(in_header), Value::int(5));
    assert_eq!(b.function().phi_count(), 0);
}

#[test]
fn test_loop_carried_variable_keeps_header_phi() {
    let mut b = builder();
    let mut ssa = SsaBuilder::new();
    let entry = b.create_block("entry");
    let header = b.create_block("header");
    let body = b.create_block("body");
    let exit = b.create_block("exit");

    b.switch_to_block(entry).unwrap();
    ssa.write(entry, X, Value::int(0));
    b.jump(header).unwrap();
    ssa.seal(&mut b, entry).unwrap();

    b.switch_to_block(header).unwrap();
    let phi = ssa.read(&mut b, header, X, TypeId::I64).unwrap();
    b.branch(Value::Arg(tinylang_ir::ArgId(0)), body, exit).unwrap();

    b.switch_to_block(body).unwrap();
    let current = ssa.read(&mut b, body, X, TypeId::I64).unwrap();
    let next = b
        .binary(tinylang_ir::BinaryOp::Add, TypeId::I64, current, Value::int(1))
        .unwrap();
    ssa.write(body, X, next.clone());
    b.jump(header).unwrap();
    ssa.seal(&mut b, header).unwrap();
    ssa.seal(&mut b, body).unwrap();

    let phi = ssa.resolve(phi).as_temp().unwrap();
    assert_eq!(
        b.phi_incoming(phi).unwrap(),
        vec![(entry, Value::int(0)), (body, next)]
    );
    // the body's placeholder folded into the header phi
    assert_eq!(b.function().phi_count(), 1);
}

#[test]
fn test_config_defaults_and_partial_deserialize() {
    let config = CodegenConfig::default();
    assert!(config.verify);
    assert!(config.param_attributes);
    assert_eq!(config.mangle_prefix, "_t");

    let parsed: CodegenConfig = serde_json::from_str(r#"{ "verify": false }"#).unwrap();
    assert_eq!(
        parsed,
        CodegenConfig {
            verify: false,
            ..CodegenConfig::default()
        }
    );
}

#[test]
fn test_error_classification() {
    let ir: CodegenError = tinylang_ir::IrError::AlreadyTerminated(BlockId(0)).into();
    assert!(ir.is_invariant_violation());
    assert!(!ir.is_unsupported());

    let nested = CodegenError::NestedProcedureUnsupported("y".to_string());
    assert!(nested.is_unsupported());
    assert!(!nested.is_invariant_violation());
}

#[test]
fn test_module_requires_module_declaration() {
    let mut arena = DeclArena::new();
    let int = arena.add_pervasive("INTEGER");
    let err = CodegenModule::new(&arena, int, CodegenConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, CodegenError::UnsupportedDeclarationKind(_)));
}

#[test]
fn test_global_table_lookup() {
    let mut table = GlobalTable::new();
    assert!(table.is_empty());
    table.insert(DeclId(1), GlobalRef::Variable(tinylang_ir::GlobalId(0)));
    table.insert(DeclId(2), GlobalRef::Procedure(tinylang_ir::FuncId(0)));

    assert_eq!(table.variable(DeclId(1)), Some(tinylang_ir::GlobalId(0)));
    assert_eq!(table.procedure(DeclId(1)), None);
    assert_eq!(table.procedure(DeclId(2)), Some(tinylang_ir::FuncId(0)));
    assert_eq!(
        table.get(DeclId(2)),
        Some(GlobalRef::Procedure(tinylang_ir::FuncId(0)))
    );
    assert_eq!(table.len(), 2);
}
