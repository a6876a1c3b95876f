use std::collections::HashMap;

use thiserror::Error;

use crate::ops::OpPtr;
use crate::tensor::TensorId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error(
        "op {consumer} `{consumer_name}` reads tensor `{tensor}` before op {producer} `{producer_name}` writes it"
    )]
    ConsumerBeforeProducer {
        consumer: usize,
        consumer_name: String,
        producer: usize,
        producer_name: String,
        tensor: String,
    },
}

/// Checks that every op comes after the first op producing each of its inputs.
///
/// Tensors nothing produces (graph inputs, constants) are always available. Reports the
/// earliest offending consumer.
pub fn validate_op_order(ops: &[OpPtr]) -> Result<(), TopologyError> {
    let mut producers: HashMap<TensorId, usize> = HashMap::new();
    for (position, op) in ops.iter().enumerate() {
        for output in op.outputs() {
            producers.entry(output.id()).or_insert(position);
        }
    }

    for (position, op) in ops.iter().enumerate() {
        for input in op.inputs() {
            if let Some(&producer) = producers.get(&input.id()) {
                if producer > position {
                    return Err(TopologyError::ConsumerBeforeProducer {
                        consumer: position,
                        consumer_name: op.name().to_string(),
                        producer,
                        producer_name: ops[producer].name().to_string(),
                        tensor: input.name().to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
