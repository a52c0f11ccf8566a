//! Fluent container assembly.

use std::sync::Arc;

use crate::config::ContainerConfig;
use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::instance::Instance;
use crate::observer::ContainerObserver;
use crate::processor::PostProcessor;
use crate::traits::Mutable;

enum Registration {
    Definition(String, BeanDefinition),
    Singleton(String, Instance),
    Alias(String, String),
}

/// Collects configuration, blueprints and hooks, then assembles a
/// [`Container`] in one step.
///
/// Processors and observers are attached before any registration is applied,
/// so they see every bean the container ever creates.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_beans::{BeanDefinition, ClassBuilder, Container, ContainerConfig, Introspectable, LookupExt};
///
/// #[derive(Default)]
/// struct Pool;
///
/// impl Introspectable for Pool {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class.default_constructor()
///     }
/// }
///
/// let container = Container::builder()
///     .config(ContainerConfig::default().with_circular_references(false))
///     .definition("pool", BeanDefinition::of::<Pool>())
///     .alias("pool", "db")
///     .refresh()
///     .unwrap();
///
/// let a: Arc<Pool> = container.get("pool").unwrap();
/// let b: Arc<Pool> = container.get("db").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    config: ContainerConfig,
    parent: Option<Container>,
    registrations: Vec<Registration>,
    processors: Vec<Arc<dyn PostProcessor>>,
    observers: Vec<Arc<dyn ContainerObserver>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Makes the built container a child of `parent`.
    pub fn parent(mut self, parent: Container) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn definition(mut self, name: impl Into<String>, definition: BeanDefinition) -> Self {
        self.registrations.push(Registration::Definition(name.into(), definition));
        self
    }

    pub fn singleton(mut self, name: impl Into<String>, instance: Instance) -> Self {
        self.registrations.push(Registration::Singleton(name.into(), instance));
        self
    }

    pub fn alias(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.registrations.push(Registration::Alias(name.into(), alias.into()));
        self
    }

    pub fn post_processor(mut self, processor: Arc<dyn PostProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ContainerObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Assembles the container, applying registrations in the order given.
    ///
    /// No bean is created.
    pub fn build(self) -> ContainerResult<Container> {
        let container = Container::assemble(self.config, self.parent);
        for observer in self.observers {
            container.add_observer(observer);
        }
        for processor in self.processors {
            container.add_post_processor(processor);
        }
        for registration in self.registrations {
            match registration {
                Registration::Definition(name, definition) => container.register_definition(&name, definition)?,
                Registration::Singleton(name, instance) => container.register_singleton(&name, instance)?,
                Registration::Alias(name, alias) => container.register_alias(&name, &alias)?,
            }
        }
        Ok(container)
    }

    /// [`build`](Self::build) followed by
    /// [`pre_instantiate_singletons`](Container::pre_instantiate_singletons).
    pub fn refresh(self) -> ContainerResult<Container> {
        let container = self.build()?;
        container.pre_instantiate_singletons()?;
        Ok(container)
    }
}
