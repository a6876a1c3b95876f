//! Contract between the model graph and the ops that live in it.
//!
//! Kernels, their parameters, and how they compute are defined outside this crate. The
//! model only needs to see which tensors an op reads and writes, how to copy an op onto a
//! different set of tensors, and how to hand it to a visitor.
mod visitor;

use std::fmt;
use std::sync::Arc;

use crate::model::Model;
use crate::tensor::{Tensor, TensorMap, TensorPtr};

pub use visitor::OpVisitor;

/// Shared handle to an op stored in a [`Model`].
pub type OpPtr = Arc<dyn Op>;

/// Graph node reading input tensors and writing output tensors.
pub trait Op: fmt::Debug + Send + Sync {
    /// Short kind name used in dumps and logs.
    fn name(&self) -> &str;

    fn inputs(&self) -> &[TensorPtr];

    fn outputs(&self) -> &[TensorPtr];

    fn input_count(&self) -> usize {
        self.inputs().len()
    }

    fn output_count(&self) -> usize {
        self.outputs().len()
    }

    /// Returns input `index`, panicking when out of range.
    fn input(&self, index: usize) -> &TensorPtr {
        &self.inputs()[index]
    }

    /// Returns output `index`, panicking when out of range.
    fn output(&self, index: usize) -> &TensorPtr {
        &self.outputs()[index]
    }

    /// Copies the op, replacing every tensor found in `map` with its substitute.
    fn clone_with(&self, map: &TensorMap) -> OpPtr;

    /// Double dispatch into `visitor`. Implementations call `visitor.visit(self, model)`.
    fn accept(&self, visitor: &mut dyn OpVisitor, model: &mut Model);

    /// Writes a one-line description of the op.
    fn dump(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        write_tensor_names(f, self.inputs())?;
        f.write_str(") -> (")?;
        write_tensor_names(f, self.outputs())?;
        f.write_str(")")
    }

    /// Reports whether `tensor` is one of this op's inputs.
    fn consumes(&self, tensor: &Tensor) -> bool {
        self.inputs()
            .iter()
            .any(|input| std::ptr::eq(Arc::as_ptr(input), tensor))
    }

    /// Reports whether `tensor` is one of this op's outputs.
    fn produces(&self, tensor: &Tensor) -> bool {
        self.outputs()
            .iter()
            .any(|output| std::ptr::eq(Arc::as_ptr(output), tensor))
    }
}

fn write_tensor_names(f: &mut fmt::Formatter<'_>, tensors: &[TensorPtr]) -> fmt::Result {
    for (i, tensor) in tensors.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "\"{}\"", tensor.name())?;
    }
    Ok(())
}

/// Identity comparison for ops, ignoring vtables.
pub fn same_op(a: &dyn Op, b: &dyn Op) -> bool {
    std::ptr::addr_eq(a, b)
}

/// Adapter that renders an op through [`Op::dump`].
pub(crate) struct OpDump<'a>(pub(crate) &'a dyn Op);

impl fmt::Display for OpDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.dump(f)
    }
}
