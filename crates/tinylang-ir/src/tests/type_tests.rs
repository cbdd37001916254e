use crate::types::{Type, TypeId, TypeRegistry};
use pretty_assertions::assert_eq;

#[test]
fn test_pervasive_types_are_preinterned() {
    let mut types = TypeRegistry::new();
    assert_eq!(types.int(1), TypeId::I1);
    assert_eq!(types.int(64), TypeId::I64);
    assert_eq!(types.get(TypeId::PTR), Some(&Type::Ptr));
    assert_eq!(types.get(TypeId::VOID), Some(&Type::Void));
}

#[test]
fn test_other_int_widths_are_interned_once() {
    let mut types = TypeRegistry::new();
    let a = types.int(32);
    let b = types.int(32);
    assert_eq!(a, b);
    assert_eq!(types.display(a), "i32");
}

#[test]
fn test_arrays_are_structural() {
    let mut types = TypeRegistry::new();
    let a = types.array(TypeId::I64, 10);
    let b = types.array(TypeId::I64, 10);
    let c = types.array(TypeId::I64, 11);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(types.display(a), "[10 x i64]");
    assert_eq!(types.element_type(a, 3), Some(TypeId::I64));
}

#[test]
fn test_structs_are_nominal() {
    let mut types = TypeRegistry::new();
    let a = types.create_struct("Point", vec![TypeId::I64, TypeId::I64]);
    let b = types.create_struct("Point", vec![TypeId::I64, TypeId::I64]);
    assert_ne!(a, b);
    assert_eq!(types.display(a), "%Point");
    assert_eq!(types.element_type(a, 1), Some(TypeId::I64));
    assert_eq!(types.element_type(a, 2), None);
}

#[test]
fn test_store_sizes() {
    let mut types = TypeRegistry::new();
    assert_eq!(types.store_size(TypeId::I1), 1);
    assert_eq!(types.store_size(TypeId::I64), 8);
    assert_eq!(types.store_size(TypeId::PTR), 8);

    let arr = types.array(TypeId::I64, 10);
    assert_eq!(types.store_size(arr), 80);

    // bool, then padding up to the i64 field, then the array
    let rec = types.create_struct("R", vec![TypeId::I1, TypeId::I64, arr]);
    assert_eq!(types.align(rec), 8);
    assert_eq!(types.store_size(rec), 8 + 8 + 80);

    // tail padding rounds up to the struct alignment
    let tail = types.create_struct("T", vec![TypeId::I64, TypeId::I1]);
    assert_eq!(types.store_size(tail), 16);

    let bools = types.create_struct("B", vec![TypeId::I1, TypeId::I1]);
    assert_eq!(types.store_size(bools), 2);
}

#[test]
fn test_aggregate_classification() {
    let mut types = TypeRegistry::new();
    let arr = types.array(TypeId::I1, 4);
    let rec = types.create_struct("R", vec![]);
    assert!(types.is_aggregate(arr));
    assert!(types.is_aggregate(rec));
    assert!(!types.is_aggregate(TypeId::I64));
    assert!(!types.is_aggregate(TypeId::PTR));
}
