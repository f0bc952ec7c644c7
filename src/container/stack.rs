use crate::{DependencyId, InjectError, InjectResult};
use std::cell::RefCell;

/// The dependencies currently being resolved by the thread holding the
/// instantiation lock, outermost first.
#[derive(Debug, Default)]
pub(crate) struct InstantiationStack {
    ids: Vec<DependencyId>,
}

impl InstantiationStack {
    /// Pushes `id` onto the stack, returning a guard which pops it again when
    /// dropped. Fails without pushing if `id` is already on the stack.
    pub fn enter<'a>(
        stack: &'a RefCell<Self>,
        id: &DependencyId,
    ) -> InjectResult<StackFrame<'a>> {
        let mut inner = stack.borrow_mut();
        if inner.ids.contains(id) {
            let mut cycle = inner.ids.clone();
            cycle.push(id.clone());
            return Err(InjectError::CycleDetected {
                id: id.clone(),
                cycle,
            });
        }

        inner.ids.push(id.clone());
        Ok(StackFrame { stack })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Removes the top of the stack when dropped, including while unwinding.
pub(crate) struct StackFrame<'a> {
    stack: &'a RefCell<InstantiationStack>,
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().ids.pop();
    }
}
