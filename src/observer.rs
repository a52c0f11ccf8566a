//! Observation hooks for bean creation and teardown.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::ContainerError;

/// Receives container events.
///
/// Calls are made synchronously on the thread building the bean, with the
/// container monitor possibly held; keep implementations cheap and never call
/// back into the container.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use ferrous_beans::{Container, ContainerObserver};
///
/// #[derive(Default)]
/// struct Counter(AtomicUsize);
///
/// impl ContainerObserver for Counter {
///     fn created(&self, _bean: &str, _elapsed: Duration) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
///
/// let counter = Arc::new(Counter::default());
/// let container = Container::builder().observer(counter.clone()).build().unwrap();
/// assert_eq!(counter.0.load(Ordering::Relaxed), 0);
/// # let _ = container;
/// ```
pub trait ContainerObserver: Send + Sync {
    /// A bean is about to be built.
    fn creating(&self, _bean: &str) {}

    /// A bean was built, post-processed and initialized.
    fn created(&self, _bean: &str, _elapsed: Duration) {}

    /// Building a bean failed; the error propagates to the caller afterwards.
    fn creation_failed(&self, _bean: &str, _error: &ContainerError) {}

    /// A singleton's destroy callbacks have run.
    fn destroyed(&self, _bean: &str) {}
}

/// Registered observers. Costs one atomic load per event when empty.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn ContainerObserver>>>,
}

impl Observers {
    pub(crate) fn add(&self, observer: Arc<dyn ContainerObserver>) {
        self.observers.write().push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.read().is_empty()
    }

    fn each(&self, notify: impl Fn(&dyn ContainerObserver)) {
        if !self.has_observers() {
            return;
        }
        let observers = self.observers.read().clone();
        for observer in &observers {
            notify(observer.as_ref());
        }
    }

    pub(crate) fn creating(&self, bean: &str) {
        self.each(|o| o.creating(bean));
    }

    pub(crate) fn created(&self, bean: &str, elapsed: Duration) {
        self.each(|o| o.created(bean, elapsed));
    }

    pub(crate) fn creation_failed(&self, bean: &str, error: &ContainerError) {
        self.each(|o| o.creation_failed(bean, error));
    }

    pub(crate) fn destroyed(&self, bean: &str) {
        self.each(|o| o.destroyed(bean));
    }
}

/// Forwards container events to `tracing`.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self { prefix: "ferrous-beans".to_owned() }
    }

    /// Observer whose events carry `prefix` in the `container` field.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerObserver for LoggingObserver {
    fn creating(&self, bean: &str) {
        debug!(container = %self.prefix, bean, "creating bean");
    }

    fn created(&self, bean: &str, elapsed: Duration) {
        info!(container = %self.prefix, bean, ?elapsed, "bean ready");
    }

    fn creation_failed(&self, bean: &str, error: &ContainerError) {
        warn!(container = %self.prefix, bean, %error, "bean creation failed");
    }

    fn destroyed(&self, bean: &str) {
        debug!(container = %self.prefix, bean, "bean destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ContainerObserver for Recorder {
        fn creating(&self, bean: &str) {
            self.0.lock().push(format!("creating {bean}"));
        }

        fn destroyed(&self, bean: &str) {
            self.0.lock().push(format!("destroyed {bean}"));
        }
    }

    #[test]
    fn events_fan_out_in_registration_order() {
        let observers = Observers::default();
        assert!(!observers.has_observers());
        observers.creating("ignored");

        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        observers.add(first.clone());
        observers.add(second.clone());
        observers.creating("a");
        observers.created("a", Duration::from_millis(1));
        observers.destroyed("a");

        assert_eq!(*first.0.lock(), ["creating a", "destroyed a"]);
        assert_eq!(*second.0.lock(), ["creating a", "destroyed a"]);
    }
}
