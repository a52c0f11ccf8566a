//! Capability traits.
//!
//! Callers depend on the narrowest capability they need: [`Lookup`] to obtain
//! beans, [`Enumerable`] to inspect what is registered, [`Mutable`] to
//! register and tear down. Beans implement the lifecycle traits to receive
//! callbacks.

mod enumerable;
mod lifecycle;
mod lookup;
mod mutable;

pub use enumerable::Enumerable;
pub use lifecycle::{BeanNameAware, ContainerAware, DisposableBean, InitializingBean, TypeRegistryAware};
pub use lookup::{Lookup, LookupExt};
pub use mutable::Mutable;
