//! Property-based tests for storage sizing and op insertion order.


use std::sync::Arc;

use hannk_rs::{Bounds, DType, Interval, Model, TensorStorage};
use proptest::prelude::*;

use graph_support::{node, tensor};

/// Generate 2-D bounds with small, possibly negative mins.
fn arb_bounds() -> impl Strategy<Value = Bounds> {
    prop::collection::vec((-8i32..8, 1i32..8), 2).prop_map(|dims| {
        dims.into_iter()
            .map(|(min, extent)| Interval::from_extent(min, extent))
            .collect()
    })
}

fn expected_union(uses: &[Bounds]) -> Bounds {
    uses.iter()
        .skip(1)
        .fold(uses[0].clone(), |acc, bounds| acc.union(bounds))
}

proptest! {
    #[test]
    fn prop_storage_bounds_are_union_of_uses(
        uses in prop::collection::vec(arb_bounds(), 1..6),
        rotation in 0usize..6,
    ) {
        let storage = TensorStorage::new();
        for bounds in &uses {
            storage.add_use(DType::I16, bounds);
        }

        let mut rotated = uses.clone();
        let len = rotated.len();
        rotated.rotate_left(rotation % len);
        let reordered = TensorStorage::new();
        for bounds in rotated.iter().rev() {
            reordered.add_use(DType::I16, bounds);
        }

        let expected = expected_union(&uses);
        prop_assert_eq!(storage.bounds(), Some(expected.clone()));
        prop_assert_eq!(reordered.bounds(), Some(expected.clone()));

        let buffer = storage.allocate();
        prop_assert_eq!(buffer.bounds(), expected.clone());
        for bounds in &uses {
            prop_assert!(buffer.bounds().contains(bounds));
        }
    }

    #[test]
    fn prop_inserted_producer_precedes_its_consumer(
        chain_len in 1usize..8,
        consumer_at in 0usize..8,
        anchor_at in prop::option::of(0usize..9),
    ) {
        let consumer_at = consumer_at % chain_len;
        let mut model = Model::new();
        let pending = tensor("pending", &[1]);
        let mut previous = tensor("in", &[1]);
        for i in 0..chain_len {
            let next = tensor(&format!("t{i}"), &[1]);
            let op = if i == consumer_at {
                node(&format!("op{i}"), &[&previous, &pending], &[&next])
            } else {
                node(&format!("op{i}"), &[&previous], &[&next])
            };
            model.push_op(op);
            previous = next;
        }

        let anchor = anchor_at
            .and_then(|at| model.ops().get(at))
            .map(Arc::clone);
        let expected_pos = match anchor_at {
            Some(at) if at < consumer_at => at,
            _ => consumer_at,
        };
        let producer = node("producer", &[], &[&pending]);
        model.insert_op(Arc::clone(&producer), anchor.as_deref());

        let producer_pos = model.position_of_op(producer.as_ref()).expect("producer placed");
        let consumer_pos = model
            .ops()
            .iter()
            .position(|op| op.consumes(&pending))
            .expect("consumer present");
        prop_assert_eq!(producer_pos, expected_pos);
        prop_assert!(producer_pos < consumer_pos);
        prop_assert!(model.validate_topology().is_ok());
    }
}
