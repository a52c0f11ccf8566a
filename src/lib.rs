//! # ferrous-beans
//!
//! A bean lifecycle and dependency-resolution engine: describe objects as
//! blueprints ("build a `T`, wire these constructor arguments and properties,
//! call this init method") and get back fully constructed, fully wired
//! object graphs.
//!
//! ## Features
//!
//! - **Blueprints**: constructor, factory-method or supplier instantiation,
//!   parent/child inheritance, aliases, lazy and abstract definitions
//! - **Dependency resolution**: by name, by type (with primary and qualifier
//!   tie-breaking), optional dependencies, ordered collections and maps
//! - **Circular references**: setter cycles between singletons resolve
//!   through early references; constructor cycles fail with the full path
//! - **Post-processors**: capability-based hooks at every lifecycle phase,
//!   including identity-consistent decoration
//! - **Teardown**: dependents are destroyed before their dependencies
//! - **Thread-safe**: concurrent lookups never build a singleton twice
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ferrous_beans::{BeanDefinition, ClassBuilder, Container, Introspectable, LookupExt, Mutable, Slot};
//!
//! #[derive(Default)]
//! struct Orders {
//!     billing: Slot<Arc<Billing>>,
//! }
//!
//! #[derive(Default)]
//! struct Billing {
//!     orders: Slot<Arc<Orders>>,
//! }
//!
//! impl Introspectable for Orders {
//!     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
//!         class
//!             .default_constructor()
//!             .property("billing", |o: &Orders, b: Arc<Billing>| o.billing.set(b))
//!     }
//! }
//!
//! impl Introspectable for Billing {
//!     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
//!         class
//!             .default_constructor()
//!             .property("orders", |b: &Billing, o: Arc<Orders>| b.orders.set(o))
//!     }
//! }
//!
//! let container = Container::new();
//! container
//!     .register_definition("orders", BeanDefinition::of::<Orders>().property_ref("billing", "billing"))
//!     .unwrap();
//! container
//!     .register_definition("billing", BeanDefinition::of::<Billing>().property_ref("orders", "orders"))
//!     .unwrap();
//!
//! let orders: Arc<Orders> = container.get("orders").unwrap();
//! let billing: Arc<Billing> = container.get("billing").unwrap();
//! assert!(Arc::ptr_eq(&orders.billing.get().unwrap(), &billing));
//! assert!(Arc::ptr_eq(&billing.orders.get().unwrap(), &orders));
//!
//! // Break the cycle so both beans can be dropped.
//! orders.billing.take();
//! container.destroy_all();
//! ```
//!
//! ## Scopes
//!
//! - **Singleton**: built once per container and cached
//! - **Prototype**: built fresh on every lookup, never destroyed by the container

pub mod config;
pub mod container;
pub mod definition;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod introspect;
pub mod key;
pub mod observer;
pub mod processor;
pub mod resolver;
pub mod scope;
pub mod traits;

// Internal modules
mod instantiate;
mod internal;
mod lifecycle;
mod registry;

pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder, ContainerRef, HookContext};
pub use definition::{ArgValue, AutowireMode, BeanDefinition, MergedDefinition, PropertyValues, Supplier, Value};
pub use descriptors::BeanDescriptor;
pub use error::{BoxError, ContainerError, ContainerResult, ConversionError, Phase};
pub use instance::{BeanObject, Instance};
pub use introspect::{
    Args, Class, ClassBuilder, ConstructorDescriptor, DependencyKind, FactoryMethodDescriptor, Injectable, Injection,
    Introspectable, Param, PropertyDescriptor, Resolved, Slot, TypeRegistry,
};
pub use key::TypeKey;
pub use observer::{ContainerObserver, LoggingObserver};
pub use processor::{
    AfterInstantiation, AutowiredProcessor, BeforeInstantiation, ConstructorSelector, Decorate, DecoratingProcessor,
    Decoration, DefinitionProcessor, DestructionProcessor, EarlyReferenceProcessor, InitializationProcessor, Order,
    PostProcessor, PropertyProcessor, Tier, ViewDecorator,
};
pub use resolver::DependencyDescriptor;
pub use scope::Scope;
pub use traits::{
    BeanNameAware, ContainerAware, DisposableBean, Enumerable, InitializingBean, Lookup, LookupExt, Mutable,
    TypeRegistryAware,
};
