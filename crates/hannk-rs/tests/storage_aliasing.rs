use std::sync::Arc;

use anyhow::Result;
use hannk_rs::{
    Bounds, Buffer, ContractViolation, DType, Interval, QuantizationInfo, Tensor, TensorStorage,
};

fn bounds_1d(min: i32, max: i32) -> Bounds {
    Bounds::new([Interval::new(min, max)])
}

fn declared(name: &str, bounds: Bounds) -> Tensor {
    Tensor::new(name, DType::I32, bounds, QuantizationInfo::default())
}

#[test]
fn storage_union_matches_worked_example() {
    let storage = TensorStorage::new();
    storage.add_use(DType::U8, &bounds_1d(-2, 7));
    storage.add_use(DType::U8, &bounds_1d(0, 9));

    let buffer = storage.allocate();
    assert_eq!(buffer.dim(0).min(), -2);
    assert_eq!(buffer.dim(0).max(), 9);
    assert_eq!(buffer.dim(0).extent(), 12);
}

#[test]
#[should_panic(expected = "storage use has type")]
fn storage_rejects_type_mismatch() {
    let storage = TensorStorage::new();
    storage.add_use(DType::U8, &bounds_1d(0, 3));
    storage.add_use(DType::F32, &bounds_1d(0, 3));
}

#[test]
#[should_panic(expected = "already allocated")]
fn storage_rejects_uses_after_allocation() {
    let storage = TensorStorage::new();
    storage.add_use(DType::U8, &bounds_1d(0, 3));
    storage.allocate();
    storage.add_use(DType::U8, &bounds_1d(0, 4));
}

#[test]
fn tensor_allocate_is_idempotent() {
    let tensor = declared("x", Bounds::from_extents(&[3, 2]));
    assert!(!tensor.is_allocated());
    assert!(!tensor.is_constant());

    tensor.allocate();
    let first = tensor.buffer();
    tensor.allocate();
    let second = tensor.buffer();

    assert!(first.same_allocation(&second));
    assert_eq!(first.bounds(), second.bounds());
    assert_eq!(first.bounds(), *tensor.bounds());
}

#[test]
fn constant_tensor_reports_allocated_immediately() -> Result<()> {
    let buffer = Buffer::from_values(&Bounds::from_extents(&[2, 2]), &[1.0f32, 2.0, 3.0, 4.0])?;
    let tensor = Tensor::from_buffer("w", buffer.clone(), QuantizationInfo::per_tensor(0.1, 0));
    assert!(tensor.is_constant());
    assert!(tensor.is_allocated());

    tensor.allocate();
    assert!(tensor.buffer().same_allocation(&buffer));
    assert_eq!(tensor.get::<f32>(&[1, 1]), 4.0);
    Ok(())
}

#[test]
fn alias_shares_storage_sized_to_the_union() {
    let b = declared("b", bounds_1d(0, 7));
    let a = declared("a", bounds_1d(-2, 3));

    a.set_alias_of(&b);

    assert!(Arc::ptr_eq(&a.storage(), &b.storage()));
    assert!(a.is_alias_of(&b));
    assert_eq!(b.storage().bounds(), Some(bounds_1d(-2, 7)));
    assert_eq!(b.storage().use_count(), 2);

    b.allocate();
    a.allocate();
    assert_eq!(a.buffer().bounds(), bounds_1d(-2, 3));
    assert_eq!(b.buffer().bounds(), bounds_1d(0, 7));
    assert!(a.buffer().same_allocation(&b.buffer()));
}

#[test]
fn alias_views_observe_each_others_writes() {
    let input = declared("input", Bounds::from_extents(&[4, 2]));
    let output = declared(
        "output",
        Bounds::new([Interval::new(2, 5), Interval::new(0, 1)]),
    );
    output.set_alias_of(&input);

    // Allocating the alias first still sizes the storage by every registered use.
    output.allocate();
    input.allocate();

    input.set(&[3, 1], 11i32);
    assert_eq!(output.get::<i32>(&[3, 1]), 11);

    output.set(&[2, 0], -5i32);
    assert_eq!(input.get::<i32>(&[2, 0]), -5);

    // Coordinates outside the alias' own bounds stay out of reach through its view.
    assert!(matches!(
        output.buffer().try_get::<i32>(&[1, 0]),
        Err(ContractViolation::OutOfBounds { .. })
    ));
}

#[test]
fn alias_chain_shares_one_storage() {
    let a = declared("a", bounds_1d(0, 3));
    let b = declared("b", bounds_1d(2, 5));
    let c = declared("c", bounds_1d(-1, 1));
    b.set_alias_of(&a);
    c.set_alias_of(&b);

    assert!(c.is_alias_of(&a));
    assert_eq!(a.storage().bounds(), Some(bounds_1d(-1, 5)));

    for tensor in [&a, &b, &c] {
        tensor.allocate();
        assert_eq!(tensor.buffer().bounds(), *tensor.bounds());
    }
}

#[test]
fn alias_with_mismatched_rank_is_rejected() {
    let a = declared("a", Bounds::from_extents(&[4]));
    let b = declared("b", Bounds::from_extents(&[2, 2]));
    assert_eq!(
        b.try_set_alias_of(&a),
        Err(ContractViolation::RankMismatch {
            expected: 1,
            actual: 2
        })
    );
    assert!(!b.is_alias_of(&a));
}

#[test]
fn alias_after_allocation_is_rejected() {
    let a = declared("a", Bounds::from_extents(&[4]));
    let b = declared("b", Bounds::from_extents(&[4]));
    b.allocate();
    assert!(matches!(
        b.try_set_alias_of(&a),
        Err(ContractViolation::AliasAfterAllocation { .. })
    ));
}

#[test]
#[should_panic(expected = "buffer is not allocated")]
fn reading_an_unallocated_tensor_panics() {
    let tensor = declared("x", Bounds::from_extents(&[1]));
    tensor.get::<i32>(&[0]);
}
