//! Ordered tensor and op lists making up an interpreter graph.
//!
//! The op list order is the execution order and the only record of dependencies; no
//! separate dependency graph is kept. Mutation primitives keep that order valid:
//! [`Model::insert_op`] moves a new op in front of any earlier consumer of its outputs.
//!
//! Cloning a model shares every tensor that is already allocated (constants and weights,
//! which are never written after allocation) and duplicates every tensor that is not, so
//! independent clones can run concurrently without sharing intermediate state.

mod topology;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::env;
use crate::ops::{same_op, Op, OpDump, OpPtr, OpVisitor};
use crate::tensor::{Residency, Tensor, TensorMap, TensorPtr};

pub use topology::{validate_op_order, TopologyError};

/// Interpreter graph: tensors in emission order and ops in execution order.
#[derive(Debug, Default)]
pub struct Model {
    tensors: Vec<TensorPtr>,
    ops: Vec<OpPtr>,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    pub fn tensors(&self) -> &[TensorPtr] {
        &self.tensors
    }

    pub fn ops(&self) -> &[OpPtr] {
        &self.ops
    }

    /// Looks up a tensor by name.
    pub fn find_tensor(&self, name: &str) -> Option<&TensorPtr> {
        self.tensors.iter().find(|tensor| tensor.name() == name)
    }

    pub fn position_of_tensor(&self, tensor: &Tensor) -> Option<usize> {
        self.tensors
            .iter()
            .position(|candidate| std::ptr::eq(Arc::as_ptr(candidate), tensor))
    }

    pub fn position_of_op(&self, op: &dyn Op) -> Option<usize> {
        self.ops
            .iter()
            .position(|candidate| same_op(candidate.as_ref(), op))
    }

    pub fn push_tensor(&mut self, tensor: TensorPtr) {
        self.tensors.push(tensor);
    }

    /// Appends an op without any ordering check.
    pub fn push_op(&mut self, op: OpPtr) {
        self.ops.push(op);
    }

    /// Inserts `tensor` right after `after`, or at the end when the anchor is absent.
    pub fn insert_tensor(&mut self, tensor: TensorPtr, after: Option<&Tensor>) {
        match after.and_then(|anchor| self.position_of_tensor(anchor)) {
            Some(position) => self.tensors.insert(position + 1, tensor),
            None => self.tensors.push(tensor),
        }
    }

    /// Inserts `op` before `before`, moving it earlier if needed to stay in dependency order.
    ///
    /// Ops are scanned from the start. If an op consuming one of the new op's outputs is
    /// reached before the anchor, the new op goes in front of that consumer instead. When
    /// neither is found the op is appended. Only the first conflict is corrected; the rest
    /// of the list is assumed to be in valid order already.
    pub fn insert_op(&mut self, op: OpPtr, before: Option<&dyn Op>) {
        let mut placement = None;
        for (position, existing) in self.ops.iter().enumerate() {
            if before.is_some_and(|anchor| same_op(existing.as_ref(), anchor)) {
                placement = Some(position);
                break;
            }
            if let Some(output) = op.outputs().iter().find(|output| existing.consumes(output)) {
                debug!(
                    op = op.name(),
                    consumer = existing.name(),
                    tensor = output.name(),
                    position,
                    "moved op ahead of an earlier consumer"
                );
                placement = Some(position);
                break;
            }
        }

        match placement {
            Some(position) => self.ops.insert(position, op),
            None => self.ops.push(op),
        }

        if env::validate_graph_enabled() {
            if let Err(err) = self.validate_topology() {
                warn!(%err, "op order is invalid after insertion");
            }
        }
    }

    /// Calls `visitor` on every op in order.
    ///
    /// The walk goes by position and re-reads the op count at every step, so ops inserted
    /// during the walk are visited too. Removing ops ahead of the cursor is not supported.
    pub fn accept(&mut self, visitor: &mut dyn OpVisitor) {
        let mut position = 0;
        while position < self.ops.len() {
            let op = Arc::clone(&self.ops[position]);
            trace!(position, op = op.name(), "visiting op");
            op.accept(visitor, self);
            position += 1;
        }
    }

    /// Allocates every tensor, returning how many were newly allocated.
    ///
    /// Aliasing must be set up before this runs: a storage stops growing once any of its
    /// tensors is allocated.
    pub fn allocate_tensors(&self) -> usize {
        let mut allocated = 0;
        for tensor in &self.tensors {
            if !tensor.is_allocated() {
                tensor.allocate();
                allocated += 1;
            }
        }
        debug!(
            allocated,
            total = self.tensors.len(),
            "allocated model tensors"
        );
        allocated
    }

    /// Checks that the op list is in dependency order.
    pub fn validate_topology(&self) -> Result<(), TopologyError> {
        validate_op_order(&self.ops)
    }
}

impl Clone for Model {
    fn clone(&self) -> Self {
        let mut map = TensorMap::new();
        let tensors = self
            .tensors
            .iter()
            .map(|tensor| match tensor.residency() {
                Residency::Shared => Arc::clone(tensor),
                Residency::PerRun => {
                    let cloned = Arc::new(tensor.duplicate());
                    map.insert(tensor, Arc::clone(&cloned));
                    cloned
                }
            })
            .collect();
        let ops = self.ops.iter().map(|op| op.clone_with(&map)).collect();
        debug!(
            tensors = self.tensors.len(),
            duplicated = map.len(),
            ops = self.ops.len(),
            "cloned model"
        );
        Model { tensors, ops }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tensors:")?;
        for tensor in &self.tensors {
            writeln!(f, "  {tensor}")?;
        }
        writeln!(f, "Ops:")?;
        for op in &self.ops {
            writeln!(f, "  {}", OpDump(op.as_ref()))?;
        }
        Ok(())
    }
}
