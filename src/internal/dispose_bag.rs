//! Internal disposal bag for managing destroy actions.

use crate::error::BoxError;

/// Destroy action registered for one bean.
pub(crate) type DisposeFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Named destroy actions kept in registration order and run LIFO.
///
/// Each bean has at most one entry; registering a name again replaces the
/// old action and moves it to the end.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<(String, DisposeFn)>,
}

impl DisposeBag {
    /// Add a destroy action for `name`.
    pub(crate) fn push(&mut self, name: &str, f: DisposeFn) {
        self.entries.retain(|(n, _)| n != name);
        self.entries.push((name.to_owned(), f));
    }

    /// Remove and return the action for `name`.
    pub(crate) fn take(&mut self, name: &str) -> Option<DisposeFn> {
        let position = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(position).1)
    }

    /// Registered names, most recent first.
    pub(crate) fn names_reverse(&self) -> Vec<String> {
        self.entries.iter().rev().map(|(n, _)| n.clone()).collect()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
