//! Singleton cache and cycle coordination.
//!
//! Three cooperating maps keyed by bean name:
//!
//! - *finished*: fully initialized singletons,
//! - *early*: not-yet-initialized references already handed to a dependent,
//! - *factories*: producers of early references, run at most once.
//!
//! A name lives in at most one of them. Every mutation happens under the
//! container monitor, a re-entrant mutex held for the whole construction of a
//! singleton: the building thread may re-enter (that is how setter cycles
//! resolve) while other threads wait instead of building a duplicate. Finished
//! singletons are additionally readable without the monitor.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, trace, warn};

use crate::error::{ContainerError, ContainerResult, Phase};
use crate::instance::Instance;
use crate::internal::{DisposeBag, DisposeFn, FastMap};

/// Producer of an early reference.
pub(crate) type EarlyFactory = Box<dyn FnOnce() -> ContainerResult<Instance> + Send>;

#[derive(Default)]
struct SingletonState {
    early: HashMap<String, Instance>,
    factories: HashMap<String, EarlyFactory>,
    in_creation: Vec<String>,
    in_destruction: bool,
}

#[derive(Default)]
struct DependencyGraph {
    /// bean -> beans that depend on it
    dependents: HashMap<String, Vec<String>>,
    /// bean -> beans it depends on
    dependencies: HashMap<String, Vec<String>>,
    /// containing bean -> inner beans
    contained: HashMap<String, Vec<String>>,
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_owned());
    }
}

pub(crate) struct SingletonRegistry {
    monitor: ReentrantMutex<RefCell<SingletonState>>,
    finished: RwLock<FastMap<String, Instance>>,
    /// Finished names in completion order.
    order: Mutex<Vec<String>>,
    /// Names registered ready-made rather than built from a blueprint.
    manual: Mutex<Vec<String>>,
    graph: Mutex<DependencyGraph>,
    disposables: Mutex<DisposeBag>,
    closed: AtomicBool,
}

impl Default for SingletonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SingletonRegistry {
    pub(crate) fn new() -> Self {
        Self {
            monitor: ReentrantMutex::new(RefCell::new(SingletonState::default())),
            finished: RwLock::new(FastMap::default()),
            order: Mutex::new(Vec::new()),
            manual: Mutex::new(Vec::new()),
            graph: Mutex::new(DependencyGraph::default()),
            disposables: Mutex::new(DisposeBag::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Finished singleton, or, when `allow_early` is set and the name is in
    /// creation on this thread, its early reference.
    ///
    /// The first early lookup runs the registered factory and caches the
    /// result, so wrapping processors see each bean once.
    pub(crate) fn get_singleton(&self, name: &str, allow_early: bool) -> ContainerResult<Option<Instance>> {
        if let Some(instance) = self.finished.read().get(name) {
            return Ok(Some(instance.clone()));
        }
        if !allow_early {
            return Ok(None);
        }

        let guard = self.monitor.lock();
        if let Some(instance) = self.finished.read().get(name) {
            return Ok(Some(instance.clone()));
        }
        let factory = {
            let mut state = guard.borrow_mut();
            if !state.in_creation.iter().any(|n| n == name) {
                return Ok(None);
            }
            if let Some(early) = state.early.get(name) {
                trace!(bean = name, "returning cached early reference");
                return Ok(Some(early.clone()));
            }
            state.factories.remove(name)
        };
        let Some(factory) = factory else {
            return Ok(None);
        };

        let early = factory()?;
        debug!(bean = name, "eagerly returning reference to singleton still in creation");
        guard.borrow_mut().early.insert(name.to_owned(), early.clone());
        Ok(Some(early))
    }

    /// Returns the finished singleton or builds it with `create`.
    ///
    /// The monitor is held while `create` runs. A name already in creation on
    /// this thread is a cycle `create` could not break and fails with
    /// [`ContainerError::CircularCreation`]. On failure every trace of the
    /// partial singleton is removed, together with any bean that captured its
    /// early reference.
    pub(crate) fn get_or_create(
        &self,
        name: &str,
        create: impl FnOnce() -> ContainerResult<Instance>,
        on_destroyed: &dyn Fn(&str),
    ) -> ContainerResult<Instance> {
        let guard = self.monitor.lock();
        if let Some(instance) = self.finished.read().get(name) {
            return Ok(instance.clone());
        }
        {
            let mut state = guard.borrow_mut();
            if self.is_closed() || state.in_destruction {
                return Err(ContainerError::ContainerClosed);
            }
            if let Some(start) = state.in_creation.iter().position(|n| n == name) {
                let mut path = state.in_creation[start..].to_vec();
                path.push(name.to_owned());
                return Err(ContainerError::CircularCreation { bean: name.to_owned(), path });
            }
            state.in_creation.push(name.to_owned());
        }

        trace!(bean = name, "creating shared instance of singleton bean");
        let result = create();

        {
            let mut state = guard.borrow_mut();
            if let Some(position) = state.in_creation.iter().rposition(|n| n == name) {
                state.in_creation.remove(position);
            }
        }

        match result {
            Ok(instance) => {
                self.add_singleton(name, instance.clone());
                Ok(instance)
            }
            Err(error) => {
                debug!(bean = name, %error, "singleton creation failed, discarding partial state");
                self.destroy_singleton(name, on_destroyed);
                Err(error)
            }
        }
    }

    fn add_singleton(&self, name: &str, instance: Instance) {
        let guard = self.monitor.lock();
        {
            let mut state = guard.borrow_mut();
            state.early.remove(name);
            state.factories.remove(name);
        }
        self.finished.write().insert(name.to_owned(), instance);
        push_unique(&mut self.order.lock(), name);
    }

    /// Registers a ready-made singleton.
    pub(crate) fn register_singleton(&self, name: &str, instance: Instance) -> ContainerResult<()> {
        let _guard = self.monitor.lock();
        if self.is_closed() {
            return Err(ContainerError::ContainerClosed);
        }
        if self.finished.read().contains_key(name) {
            return Err(ContainerError::InvalidDefinition {
                bean: name.to_owned(),
                reason: "a singleton is already registered under this name".into(),
            });
        }
        self.add_singleton(name, instance);
        push_unique(&mut self.manual.lock(), name);
        debug!(bean = name, "registered manual singleton");
        Ok(())
    }

    /// Registers the producer of `name`'s early reference, unless it is
    /// already finished.
    pub(crate) fn add_singleton_factory(&self, name: &str, factory: EarlyFactory) {
        let guard = self.monitor.lock();
        if self.finished.read().contains_key(name) {
            return;
        }
        let mut state = guard.borrow_mut();
        state.early.remove(name);
        state.factories.insert(name.to_owned(), factory);
        trace!(bean = name, "eagerly caching bean to allow for resolving potential circular references");
    }

    /// Early reference already handed out for `name`, if any.
    pub(crate) fn early_reference(&self, name: &str) -> Option<Instance> {
        let guard = self.monitor.lock();
        let state = guard.borrow();
        state.early.get(name).cloned()
    }

    pub(crate) fn contains_singleton(&self, name: &str) -> bool {
        self.finished.read().contains_key(name)
    }

    /// Class of a finished singleton.
    pub(crate) fn singleton_class(&self, name: &str) -> Option<std::sync::Arc<crate::introspect::Class>> {
        self.finished.read().get(name).map(|instance| instance.class().clone())
    }

    /// Finished singleton names in completion order.
    pub(crate) fn singleton_names(&self) -> Vec<String> {
        self.order.lock().clone()
    }

    pub(crate) fn manual_singletons(&self) -> Vec<String> {
        self.manual.lock().clone()
    }

    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        let guard = self.monitor.lock();
        let state = guard.borrow();
        state.in_creation.iter().any(|n| n == name)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Records that `dependent` holds a reference to `bean`.
    pub(crate) fn register_dependent(&self, bean: &str, dependent: &str) {
        if bean == dependent {
            return;
        }
        let mut graph = self.graph.lock();
        push_unique(graph.dependents.entry(bean.to_owned()).or_default(), dependent);
        push_unique(graph.dependencies.entry(dependent.to_owned()).or_default(), bean);
    }

    /// Moves every edge recorded for `from` onto `to` and forgets `from`.
    pub(crate) fn transfer_dependencies(&self, from: &str, to: &str) {
        let graph = &mut *self.graph.lock();
        let Some(dependencies) = graph.dependencies.remove(from) else {
            return;
        };
        for bean in &dependencies {
            if let Some(dependents) = graph.dependents.get_mut(bean) {
                dependents.retain(|d| d != from);
                if bean != to {
                    push_unique(dependents, to);
                }
            }
        }
        graph.dependents.retain(|_, dependents| !dependents.is_empty());
        let owned = graph.dependencies.entry(to.to_owned()).or_default();
        for bean in dependencies.iter().filter(|bean| *bean != to) {
            push_unique(owned, bean);
        }
        if owned.is_empty() {
            graph.dependencies.remove(to);
        }
    }

    /// Records an inner bean; it is destroyed after its container.
    pub(crate) fn register_contained(&self, contained: &str, containing: &str) {
        push_unique(self.graph.lock().contained.entry(containing.to_owned()).or_default(), contained);
        self.register_dependent(contained, containing);
    }

    /// Whether `dependent` depends on `bean`, directly or transitively.
    pub(crate) fn is_dependent(&self, bean: &str, dependent: &str) -> bool {
        let graph = self.graph.lock();
        let mut seen = HashSet::new();
        let mut pending = vec![bean.to_owned()];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(dependents) = graph.dependents.get(&current) {
                if dependents.iter().any(|d| d == dependent) {
                    return true;
                }
                pending.extend(dependents.iter().cloned());
            }
        }
        false
    }

    pub(crate) fn dependents_of(&self, name: &str) -> Vec<String> {
        self.graph.lock().dependents.get(name).cloned().unwrap_or_default()
    }

    pub(crate) fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.graph.lock().dependencies.get(name).cloned().unwrap_or_default()
    }

    pub(crate) fn register_disposable(&self, name: &str, action: DisposeFn) {
        self.disposables.lock().push(name, action);
    }

    pub(crate) fn has_disposable(&self, name: &str) -> bool {
        self.disposables.lock().contains(name)
    }

    /// Tears down all singletons, most recently completed first.
    ///
    /// Failing destroy actions are logged and skipped. Calling this again after
    /// the registry closed does nothing.
    pub(crate) fn destroy_singletons(&self, on_destroyed: &dyn Fn(&str)) {
        let guard = self.monitor.lock();
        if self.is_closed() {
            return;
        }
        guard.borrow_mut().in_destruction = true;
        debug!(singletons = self.finished.read().len(), "destroying singletons");

        let names = self.disposables.lock().names_reverse();
        for name in names {
            self.destroy_singleton(&name, on_destroyed);
        }

        {
            let mut state = guard.borrow_mut();
            state.early.clear();
            state.factories.clear();
            state.in_destruction = false;
        }
        self.finished.write().clear();
        self.order.lock().clear();
        self.manual.lock().clear();
        *self.graph.lock() = DependencyGraph::default();
        self.closed.store(true, Ordering::Release);
    }

    /// Removes `name` from every cache and destroys it after its dependents.
    pub(crate) fn destroy_singleton(&self, name: &str, on_destroyed: &dyn Fn(&str)) {
        {
            let guard = self.monitor.lock();
            let mut state = guard.borrow_mut();
            state.early.remove(name);
            state.factories.remove(name);
        }
        self.finished.write().remove(name);
        self.order.lock().retain(|n| n != name);
        let action = self.disposables.lock().take(name);
        self.destroy_bean(name, action, on_destroyed);
    }

    fn destroy_bean(&self, name: &str, action: Option<DisposeFn>, on_destroyed: &dyn Fn(&str)) {
        let dependents = self.graph.lock().dependents.remove(name).unwrap_or_default();
        if !dependents.is_empty() {
            debug!(bean = name, ?dependents, "destroying dependent beans first");
        }
        for dependent in dependents {
            self.destroy_singleton(&dependent, on_destroyed);
        }

        if let Some(action) = action {
            trace!(bean = name, "invoking destroy callbacks");
            if let Err(source) = action() {
                let error = ContainerError::from_user(name, Phase::Destruction, source);
                warn!(bean = name, %error, "destroy callback failed, continuing teardown");
            }
            on_destroyed(name);
        }

        let contained = self.graph.lock().contained.remove(name).unwrap_or_default();
        for inner in contained {
            self.destroy_singleton(&inner, on_destroyed);
        }

        let mut graph = self.graph.lock();
        for dependents in graph.dependents.values_mut() {
            dependents.retain(|d| d != name);
        }
        graph.dependents.retain(|_, dependents| !dependents.is_empty());
        graph.dependencies.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn noop(_: &str) {}

    fn recorder(log: &Arc<StdMutex<Vec<String>>>, name: &str) -> DisposeFn {
        let log = log.clone();
        let name = name.to_owned();
        Box::new(move || {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[test]
    fn finished_singletons_are_returned_without_rebuilding() {
        let registry = SingletonRegistry::new();
        let first = registry.get_or_create("a", || Ok(Instance::opaque(1u8)), &noop).unwrap();
        let second = registry
            .get_or_create("a", || panic!("must not rebuild"), &noop)
            .unwrap();
        assert!(first.ptr_eq(&second));
        assert!(registry.get_singleton("a", false).unwrap().is_some());
        assert_eq!(registry.singleton_names(), ["a"]);
    }

    #[test]
    fn reentrant_creation_of_the_same_name_is_circular() {
        let registry = SingletonRegistry::new();
        let result = registry.get_or_create(
            "a",
            || {
                registry.get_or_create(
                    "b",
                    || registry.get_or_create("a", || Ok(Instance::opaque(0u8)), &noop),
                    &noop,
                )
            },
            &noop,
        );
        match result {
            Err(ContainerError::CircularCreation { path, .. }) => assert_eq!(path, ["a", "b", "a"]),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!registry.is_in_creation("a"));
        assert!(!registry.is_in_creation("b"));
        assert!(!registry.contains_singleton("a"));
    }

    #[test]
    fn early_factory_runs_once_and_is_cleared_on_completion() {
        let registry = SingletonRegistry::new();
        let runs = Arc::new(StdMutex::new(0));
        let result = registry.get_or_create(
            "a",
            || {
                let raw = Instance::opaque(5u32);
                let exposed = raw.clone();
                let counter = runs.clone();
                registry.add_singleton_factory(
                    "a",
                    Box::new(move || {
                        *counter.lock().unwrap() += 1;
                        Ok(exposed)
                    }),
                );
                let first = registry.get_singleton("a", true)?.unwrap();
                let second = registry.get_singleton("a", true)?.unwrap();
                assert!(first.ptr_eq(&second));
                assert!(registry.early_reference("a").is_some());
                Ok(raw)
            },
            &noop,
        );
        assert!(result.is_ok());
        assert_eq!(*runs.lock().unwrap(), 1);
        assert!(registry.early_reference("a").is_none());
    }

    #[test]
    fn failed_creation_leaves_nothing_behind_and_can_be_retried() {
        let registry = SingletonRegistry::new();
        let result = registry.get_or_create(
            "flaky",
            || {
                registry.add_singleton_factory("flaky", Box::new(|| Ok(Instance::opaque(0u8))));
                registry.get_singleton("flaky", true)?;
                Err(ContainerError::NoSuchDefinition("dep".into()))
            },
            &noop,
        );
        assert!(result.is_err());
        assert!(!registry.is_in_creation("flaky"));
        assert!(registry.early_reference("flaky").is_none());
        assert!(registry.get_singleton("flaky", true).unwrap().is_none());

        let retried = registry.get_or_create("flaky", || Ok(Instance::opaque(1u8)), &noop);
        assert!(retried.is_ok());
    }

    #[test]
    fn teardown_runs_in_reverse_completion_order() {
        let registry = SingletonRegistry::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        for name in ["p", "q", "r"] {
            registry
                .get_or_create(name, || Ok(Instance::opaque(name.to_owned())), &noop)
                .unwrap();
            registry.register_disposable(name, recorder(&log, name));
        }
        registry.destroy_singletons(&noop);
        assert_eq!(*log.lock().unwrap(), ["r", "q", "p"]);
        assert!(registry.is_closed());
        assert!(matches!(
            registry.get_or_create("p", || Ok(Instance::opaque(0u8)), &noop),
            Err(ContainerError::ContainerClosed)
        ));
    }

    #[test]
    fn dependents_are_destroyed_first_and_failures_do_not_stop_teardown() {
        let registry = SingletonRegistry::new();
        let log = Arc::new(StdMutex::new(Vec::new()));
        for name in ["db", "repo", "cache"] {
            registry
                .get_or_create(name, || Ok(Instance::opaque(0u8)), &noop)
                .unwrap();
        }
        registry.register_disposable("repo", recorder(&log, "repo"));
        registry.register_disposable("cache", Box::new(|| Err("boom".into())));
        registry.register_disposable("db", recorder(&log, "db"));
        registry.register_dependent("db", "repo");

        let destroyed = Arc::new(StdMutex::new(Vec::new()));
        let seen = destroyed.clone();
        registry.destroy_singletons(&move |name: &str| seen.lock().unwrap().push(name.to_owned()));
        assert_eq!(*log.lock().unwrap(), ["repo", "db"]);
        assert_eq!(*destroyed.lock().unwrap(), ["repo", "db", "cache"]);
    }

    #[test]
    fn transitive_dependents_are_detected() {
        let registry = SingletonRegistry::new();
        registry.register_dependent("a", "b");
        registry.register_dependent("b", "c");
        assert!(registry.is_dependent("a", "c"));
        assert!(!registry.is_dependent("c", "a"));
        assert_eq!(registry.dependencies_of("c"), ["b"]);
    }

    #[test]
    fn transferred_edges_belong_to_the_new_owner() {
        let registry = SingletonRegistry::new();
        registry.register_dependent("users", "desk#inner#0");
        registry.register_dependent("clock", "desk#inner#0");
        registry.register_dependent("users", "desk");
        registry.register_dependent("desk", "desk#inner#0");

        registry.transfer_dependencies("desk#inner#0", "desk");
        assert_eq!(registry.dependents_of("users"), ["desk"]);
        assert_eq!(registry.dependents_of("clock"), ["desk"]);
        assert!(registry.dependents_of("desk").is_empty());
        assert_eq!(registry.dependencies_of("desk"), ["users", "clock"]);
        assert!(registry.dependencies_of("desk#inner#0").is_empty());

        registry.transfer_dependencies("unknown", "desk");
        assert_eq!(registry.dependencies_of("desk"), ["users", "clock"]);
    }

    #[test]
    fn manual_singletons_cannot_be_registered_twice() {
        let registry = SingletonRegistry::new();
        registry.register_singleton("config", Instance::opaque(1u8)).unwrap();
        assert!(registry.register_singleton("config", Instance::opaque(2u8)).is_err());
        assert_eq!(registry.manual_singletons(), ["config"]);
    }
}
