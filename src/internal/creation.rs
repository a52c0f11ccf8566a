//! Prototype in-creation tracking.
//!
//! Prototypes are never cached, so a prototype cycle would recurse forever.
//! Each thread keeps its own stack of prototypes under construction, keyed by
//! container so independent containers on the same thread do not interfere.

use std::cell::RefCell;

use crate::error::{ContainerError, ContainerResult};

// Thread-local stack of (container id, bean name) pairs
thread_local! {
    static PROTOTYPES_IN_CREATION: RefCell<Vec<(u64, String)>> = const { RefCell::new(Vec::new()) };
}

/// Guard marking a prototype as in creation on the current thread.
///
/// Dropping the guard unmarks it, also on error paths.
pub(crate) struct PrototypeGuard {
    container: u64,
    name: String,
}

impl PrototypeGuard {
    pub(crate) fn enter(container: u64, name: &str) -> ContainerResult<Self> {
        PROTOTYPES_IN_CREATION.with(|stack| {
            let mut stack = stack.borrow_mut();

            // Detect the cycle before pushing the new name
            if let Some(start) = stack.iter().position(|(c, n)| *c == container && n == name) {
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .filter(|(c, _)| *c == container)
                    .map(|(_, n)| n.clone())
                    .collect();
                path.push(name.to_owned());
                return Err(ContainerError::CircularCreation { bean: name.to_owned(), path });
            }

            stack.push((container, name.to_owned()));
            Ok(Self { container, name: name.to_owned() })
        })
    }
}

impl Drop for PrototypeGuard {
    fn drop(&mut self) {
        PROTOTYPES_IN_CREATION.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack
                .iter()
                .rposition(|(c, n)| *c == self.container && *n == self.name)
            {
                stack.remove(position);
            }
        });
    }
}

/// Whether `name` is being built as a prototype on this thread.
pub(crate) fn is_prototype_in_creation(container: u64, name: &str) -> bool {
    PROTOTYPES_IN_CREATION.with(|stack| stack.borrow().iter().any(|(c, n)| *c == container && n == name))
}
