use crate::model::Model;

use super::Op;

/// Callback invoked once per op by [`Model::accept`].
///
/// The visitor gets mutable access to the model so passes can insert tensors and ops
/// while walking it. Ops inserted after the current position are visited later in the
/// same walk; ops inserted before it shift the current op forward, so it is seen again.
pub trait OpVisitor {
    fn visit(&mut self, op: &dyn Op, model: &mut Model);
}

impl<F> OpVisitor for F
where
    F: FnMut(&dyn Op, &mut Model),
{
    fn visit(&mut self, op: &dyn Op, model: &mut Model) {
        self(op, model)
    }
}
