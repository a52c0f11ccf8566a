//! Views of the container handed to hooks and beans.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::container::{Container, ContainerInner};
use crate::definition::MergedDefinition;
use crate::error::{BoxError, ContainerError, ContainerResult, Phase};
use crate::instance::Instance;
use crate::introspect::Resolved;
use crate::resolver::DependencyDescriptor;

/// What a post-processor hook may see of the bean being built.
pub struct HookContext<'a> {
    container: &'a Container,
    bean_name: &'a str,
    definition: &'a MergedDefinition,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(container: &'a Container, bean_name: &'a str, definition: &'a MergedDefinition) -> Self {
        Self { container, bean_name, definition }
    }

    pub fn bean_name(&self) -> &str {
        self.bean_name
    }

    pub fn definition(&self) -> &MergedDefinition {
        self.definition
    }

    pub fn container(&self) -> &Container {
        self.container
    }

    /// Resolves a dependency on behalf of the bean, recording the edge for
    /// teardown ordering.
    pub fn resolve(&self, descriptor: &DependencyDescriptor) -> ContainerResult<Resolved> {
        self.container.resolve_dependency(descriptor, Some(self.bean_name))
    }

    /// Looks up a bean by name on behalf of the bean being built.
    pub fn get_object(&self, name: &str) -> ContainerResult<Instance> {
        let instance = self.container.get_object_internal(name, None)?;
        let canonical = self.container.inner.definitions.canonical_name(name);
        self.container.inner.singletons.register_dependent(&canonical, self.bean_name);
        Ok(instance)
    }

    pub(crate) fn fail(&self, phase: Phase, error: BoxError) -> ContainerError {
        ContainerError::from_user(self.bean_name, phase, error)
    }
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("bean_name", &self.bean_name)
            .field("definition", &self.definition)
            .finish()
    }
}

/// Non-owning handle to a container, given to container-aware beans.
///
/// Beans live inside the container, so a strong handle would keep it alive
/// through its own singletons.
#[derive(Clone)]
pub struct ContainerRef {
    inner: Weak<ContainerInner>,
}

impl ContainerRef {
    pub(crate) fn new(container: &Container) -> Self {
        Self { inner: Arc::downgrade(&container.inner) }
    }

    /// The container, unless it has been dropped.
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl fmt::Debug for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRef")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
