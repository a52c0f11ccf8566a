//! The bean factory.
//!
//! [`Container`] owns the definition store, the singleton registry and the
//! processor pipeline, and drives every bean through its lifecycle:
//!
//! 1. merge the blueprint and run definition processors (once),
//! 2. offer before-instantiation hooks a chance to short-circuit,
//! 3. instantiate (supplier, factory method or constructor),
//! 4. expose an early reference if the bean is a singleton in creation,
//! 5. populate properties,
//! 6. run aware callbacks, init hooks and init methods,
//! 7. reconcile the final identity with any early reference handed out,
//! 8. register destroy callbacks.
//!
//! The capability traits [`Lookup`](crate::Lookup),
//! [`Enumerable`](crate::Enumerable) and [`Mutable`](crate::Mutable) expose
//! it to callers.

mod builder;
mod context;
mod populate;

pub use builder::ContainerBuilder;
pub use context::{ContainerRef, HookContext};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::config::ContainerConfig;
use crate::definition::{BeanDefinition, DefinitionStore, MergedDefinition, Value};
use crate::error::{ContainerError, ContainerResult};
use crate::instance::Instance;
use crate::internal::{is_prototype_in_creation, PrototypeGuard};
use crate::introspect::{Class, TypeRegistry};
use crate::observer::{ContainerObserver, Observers};
use crate::processor::{AutowiredProcessor, Pipeline, PostProcessor};
use crate::registry::SingletonRegistry;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ContainerInner {
    pub(crate) id: u64,
    pub(crate) config: ContainerConfig,
    pub(crate) definitions: Arc<DefinitionStore>,
    pub(crate) singletons: SingletonRegistry,
    pub(crate) processors: Pipeline,
    pub(crate) observers: Observers,
    pub(crate) parent: Option<Container>,
    inner_seq: AtomicU64,
}

/// A bean container.
///
/// Cloning is cheap and yields another handle to the same container.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_beans::{BeanDefinition, ClassBuilder, Container, Introspectable, Lookup, LookupExt, Mutable, Param, Slot};
///
/// #[derive(Default)]
/// struct Clock;
///
/// impl Introspectable for Clock {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class.default_constructor()
///     }
/// }
///
/// struct Scheduler {
///     clock: Arc<Clock>,
///     interval: Slot<u64>,
/// }
///
/// impl Introspectable for Scheduler {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class
///             .constructor(vec![Param::of::<Arc<Clock>>("clock")], |args| {
///                 Ok(Scheduler { clock: args.next()?, interval: Slot::new() })
///             })
///             .property("interval", |s: &Scheduler, ms: u64| s.interval.set(ms))
///     }
/// }
///
/// let container = Container::new();
/// container.register_definition("clock", BeanDefinition::of::<Clock>()).unwrap();
/// container
///     .register_definition("scheduler", BeanDefinition::of::<Scheduler>().property("interval", 250))
///     .unwrap();
///
/// let scheduler: Arc<Scheduler> = container.get("scheduler").unwrap();
/// let clock: Arc<Clock> = container.get("clock").unwrap();
/// assert!(Arc::ptr_eq(&scheduler.clock, &clock));
/// assert_eq!(scheduler.interval.get(), Some(250));
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Container with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        Self::assemble(config, None)
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Child container consulting this one for names and types it does not
    /// define itself.
    pub fn child(&self) -> Container {
        self.child_with_config(self.inner.config.clone())
    }

    pub fn child_with_config(&self, config: ContainerConfig) -> Container {
        Self::assemble(config, Some(self.clone()))
    }

    pub(crate) fn assemble(config: ContainerConfig, parent: Option<Container>) -> Self {
        let id = NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed);
        let parent_store = parent.as_ref().map(|p| p.inner.definitions.clone());
        let processors = Pipeline::new();
        if config.annotation_injection {
            processors.add(Arc::new(AutowiredProcessor::new()));
        }
        debug!(container = id, has_parent = parent.is_some(), "container created");
        Self {
            inner: Arc::new(ContainerInner {
                id,
                definitions: Arc::new(DefinitionStore::new(config.allow_definition_overriding, parent_store)),
                config,
                singletons: SingletonRegistry::new(),
                processors,
                observers: Observers::default(),
                parent,
                inner_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    pub fn add_observer(&self, observer: Arc<dyn ContainerObserver>) {
        self.inner.observers.add(observer);
    }

    /// Names of the registered post-processors in execution order.
    pub fn post_processor_names(&self) -> Vec<String> {
        self.inner.processors.names()
    }

    /// Every class this container's blueprints declare or produce.
    pub fn type_registry(&self) -> Arc<TypeRegistry> {
        self.inner
            .definitions
            .type_registry(&|name: &str| self.inner.singletons.singleton_class(name))
    }

    /// Whether [`destroy_all`](crate::Mutable::destroy_all) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.singletons.is_closed()
    }

    /// Whether `name` is being built on this thread, as a singleton or a
    /// prototype.
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        let name = self.inner.definitions.canonical_name(name);
        self.inner.singletons.is_in_creation(&name) || is_prototype_in_creation(self.inner.id, &name)
    }

    pub(crate) fn ensure_open(&self) -> ContainerResult<()> {
        if self.inner.singletons.is_closed() {
            return Err(ContainerError::ContainerClosed);
        }
        Ok(())
    }

    pub(crate) fn add_processor(&self, processor: Arc<dyn PostProcessor>) {
        self.inner.processors.add(processor);
    }

    pub(crate) fn target_class(&self, merged: &MergedDefinition) -> Option<Arc<Class>> {
        self.inner
            .definitions
            .target_class(merged, &|name: &str| self.inner.singletons.singleton_class(name))
    }

    /// Builds the bean `name` with explicit constructor or factory arguments
    /// in place of the blueprint's own.
    ///
    /// Meant for prototypes; a singleton that already exists is returned as is.
    pub fn get_object_with_args(&self, name: &str, args: Vec<Value>) -> ContainerResult<Instance> {
        self.get_object_internal(name, Some(&args))
    }

    /// Instantiates every non-abstract, non-lazy singleton blueprint, in
    /// registration order.
    ///
    /// Freezes the definition store.
    pub fn pre_instantiate_singletons(&self) -> ContainerResult<()> {
        self.ensure_open()?;
        self.inner.definitions.freeze();
        let names = self.inner.definitions.names();
        debug!(container = self.inner.id, definitions = names.len(), "pre-instantiating singletons");
        for name in names {
            let merged = self.inner.definitions.merged(&name)?;
            if merged.is_abstract() || !merged.is_singleton() || merged.is_lazy_init() {
                continue;
            }
            self.get_object_internal(&name, None)?;
        }
        Ok(())
    }

    /// Entry point for every lookup by name.
    pub(crate) fn get_object_internal(&self, name: &str, args: Option<&[Value]>) -> ContainerResult<Instance> {
        self.ensure_open()?;
        let name = self.inner.definitions.canonical_name(name);

        if args.is_none() {
            if let Some(instance) = self.inner.singletons.get_singleton(&name, true)? {
                trace!(bean = %name, "returning cached instance of singleton bean");
                return Ok(instance);
            }
        }

        if !self.inner.definitions.contains(&name) {
            if let Some(instance) = self.inner.singletons.get_singleton(&name, false)? {
                return Ok(instance);
            }
            return match &self.inner.parent {
                Some(parent) => parent.get_object_internal(&name, args),
                None => Err(ContainerError::NoSuchDefinition(name)),
            };
        }

        let merged = self.inner.definitions.merged(&name)?;
        if merged.is_abstract() {
            return Err(ContainerError::InvalidDefinition {
                bean: name,
                reason: "bean definition is abstract".into(),
            });
        }

        for dependency in merged.depends_on() {
            let dependency = self.inner.definitions.canonical_name(dependency);
            if self.inner.singletons.is_dependent(&name, &dependency) {
                return Err(ContainerError::CircularCreation {
                    path: vec![name.clone(), dependency, name.clone()],
                    bean: name,
                });
            }
            self.inner.singletons.register_dependent(&dependency, &name);
            self.get_object_internal(&dependency, None)?;
        }

        if merged.is_singleton() {
            self.inner.definitions.freeze();
            let observers = &self.inner.observers;
            self.inner.singletons.get_or_create(
                &name,
                || self.create_bean(&name, &merged, args),
                &|destroyed: &str| observers.destroyed(destroyed),
            )
        } else {
            let _guard = PrototypeGuard::enter(self.inner.id, &name)?;
            self.create_bean(&name, &merged, args)
        }
    }

    /// Full lifecycle of one bean, with observer notifications.
    pub(crate) fn create_bean(&self, name: &str, merged: &Arc<MergedDefinition>, args: Option<&[Value]>) -> ContainerResult<Instance> {
        let started = Instant::now();
        self.inner.observers.creating(name);
        let result = self.build_bean(name, merged, args);
        match &result {
            Ok(_) => self.inner.observers.created(name, started.elapsed()),
            Err(error) => self.inner.observers.creation_failed(name, error),
        }
        result
    }

    fn build_bean(&self, name: &str, merged: &Arc<MergedDefinition>, args: Option<&[Value]>) -> ContainerResult<Instance> {
        trace!(bean = name, "creating instance of bean");
        let ctx = HookContext::new(self, name, merged);

        if let Some(class) = self.target_class(merged) {
            merged.process_once(|| self.inner.processors.apply_definition_processors(merged, &class))?;
            if let Some(substitute) = self.inner.processors.apply_before_instantiation(&class, &ctx)? {
                return self.inner.processors.apply_after_initialization(substitute, &ctx);
            }
        }

        self.do_create_bean(name, merged, args, &ctx)
    }

    fn do_create_bean(
        &self,
        name: &str,
        merged: &Arc<MergedDefinition>,
        args: Option<&[Value]>,
        ctx: &HookContext<'_>,
    ) -> ContainerResult<Instance> {
        let raw = self.instantiate(name, merged, args)?;

        let early_exposure = merged.is_singleton()
            && self.inner.config.allow_circular_references
            && self.inner.singletons.is_in_creation(name);
        if early_exposure {
            let container = self.clone();
            let definition = merged.clone();
            let bean = name.to_owned();
            let exposed = raw.clone();
            self.inner.singletons.add_singleton_factory(
                name,
                Box::new(move || {
                    let ctx = HookContext::new(&container, &bean, &definition);
                    container.inner.processors.apply_early_reference(exposed, &ctx)
                }),
            );
        }

        self.populate_bean(name, merged, &raw, ctx)?;
        let mut exposed = self.initialize_bean(name, merged, raw.clone(), ctx)?;

        if early_exposure {
            if let Some(early) = self.inner.singletons.early_reference(name) {
                if exposed.ptr_eq(&raw) {
                    exposed = early;
                } else if !exposed.ptr_eq(&early) && !self.inner.config.allow_raw_injection_despite_wrapping {
                    let dependents = self.inner.singletons.dependents_of(name);
                    if !dependents.is_empty() {
                        return Err(ContainerError::WrappedReferenceLeak { bean: name.to_owned(), dependents });
                    }
                }
            }
        }

        if merged.is_singleton() {
            self.register_disposable_if_necessary(name, merged, &raw)?;
        }
        Ok(exposed)
    }

    /// Builds an anonymous bean declared inline in `outer`'s blueprint.
    pub(crate) fn create_inner_bean(&self, outer_name: &str, outer: &MergedDefinition, definition: &BeanDefinition) -> ContainerResult<Instance> {
        let seq = self.inner.inner_seq.fetch_add(1, Ordering::Relaxed);
        let inner_name = format!("{outer_name}#inner#{seq}");
        let mut merged = self.inner.definitions.merge_anonymous(&inner_name, definition)?;
        if !outer.is_singleton() && merged.is_singleton() {
            merged = merged.with_scope(outer.scope());
        }
        let merged = Arc::new(merged);

        trace!(bean = outer_name, inner = %inner_name, "creating inner bean");
        let created = self.create_bean(&inner_name, &merged, None);
        if merged.is_singleton() {
            if created.is_ok() {
                self.inner.singletons.register_contained(&inner_name, outer_name);
            }
        } else {
            // a fresh name per request; the outer bean owns what it referenced
            self.inner.singletons.transfer_dependencies(&inner_name, outer_name);
        }
        created
    }

    /// Tears down every singleton and closes the container.
    pub(crate) fn close(&self) {
        let observers = &self.inner.observers;
        self.inner
            .singletons
            .destroy_singletons(&|destroyed: &str| observers.destroyed(destroyed));
        debug!(container = self.inner.id, "container closed");
    }

    /// Multi-line dump of blueprints, singletons and processors.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "Container #{} ({})", self.inner.id, if self.is_closed() { "closed" } else { "open" });
        let _ = writeln!(out, "Definitions:");
        for name in self.inner.definitions.names() {
            match self.inner.definitions.merged(&name) {
                Ok(merged) => {
                    let type_name = self.target_class(&merged).map_or("?", |class| class.name());
                    let state = if self.inner.singletons.contains_singleton(&name) { "instantiated" } else { "-" };
                    let _ = writeln!(out, "  {name}: {type_name} [{:?}] {state}", merged.scope());
                }
                Err(error) => {
                    let _ = writeln!(out, "  {name}: <{error}>");
                }
            }
        }
        let _ = writeln!(out, "Manual singletons: {:?}", self.inner.singletons.manual_singletons());
        let _ = writeln!(out, "Post-processors: {:?}", self.inner.processors.names());
        out
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("definitions", &self.inner.definitions.len())
            .field("singletons", &self.inner.singletons.singleton_names().len())
            .field("post_processors", &self.inner.processors.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
