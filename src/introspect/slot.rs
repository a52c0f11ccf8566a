//! Interior-mutable injection cell.

use std::fmt;

use parking_lot::RwLock;

/// Cell for a property that is wired after construction.
///
/// Beans are shared as `Arc`s as soon as they exist, so setters only ever see
/// `&self`. A `Slot` is what a setter writes into. It is also what makes
/// setter cycles possible: the early reference handed to a dependent is the
/// same allocation whose slots get filled later.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Slot;
///
/// let port: Slot<u16> = Slot::new();
/// assert!(!port.is_set());
/// port.set(8080);
/// assert_eq!(port.get(), Some(8080));
/// ```
pub struct Slot<T> {
    value: RwLock<Option<T>>,
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self { value: RwLock::new(None) }
    }

    /// Stores `value`, replacing anything set before.
    pub fn set(&self, value: T) {
        *self.value.write() = Some(value);
    }

    pub fn is_set(&self) -> bool {
        self.value.read().is_some()
    }

    /// Removes and returns the current value.
    pub fn take(&self) -> Option<T> {
        self.value.write().take()
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.value.read().as_ref())
    }
}

impl<T: Clone> Slot<T> {
    pub fn get(&self) -> Option<T> {
        self.value.read().clone()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("set", &self.is_set()).finish()
    }
}
