//! Callbacks a bean type can opt into.
//!
//! Implementing one of these traits is not enough on its own: the bean's
//! [`ClassBuilder`](crate::ClassBuilder) must also declare it
//! (`bean_name_aware()`, `initializing()` and so on) so the container can
//! reach the implementation through type erasure.

use std::sync::Arc;

use crate::container::ContainerRef;
use crate::error::BoxError;
use crate::introspect::TypeRegistry;

/// Told the name it was registered under, before any init hook runs.
pub trait BeanNameAware {
    fn set_bean_name(&self, name: &str);
}

/// Handed the registry of every class the container knows.
pub trait TypeRegistryAware {
    fn set_type_registry(&self, registry: Arc<TypeRegistry>);
}

/// Handed a weak handle to the owning container.
///
/// The handle does not keep the container alive.
pub trait ContainerAware {
    fn set_container(&self, container: ContainerRef);
}

/// Runs after properties are populated and before after-initialization
/// processors. An error aborts the bean's creation.
pub trait InitializingBean {
    fn after_properties_set(&self) -> Result<(), BoxError>;
}

/// Runs when the owning container tears the singleton down.
///
/// Errors are logged and do not stop the teardown of other beans.
pub trait DisposableBean {
    fn destroy(&self) -> Result<(), BoxError>;
}
