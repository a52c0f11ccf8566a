//! Registration and teardown.

use std::sync::Arc;

use tracing::debug;

use crate::container::Container;
use crate::definition::BeanDefinition;
use crate::error::ContainerResult;
use crate::instance::Instance;
use crate::processor::PostProcessor;

/// Operations that change what a container holds.
pub trait Mutable {
    /// Registers a blueprint under `name`.
    ///
    /// Fails once the store is frozen, which happens at the first singleton
    /// creation or at [`pre_instantiate_singletons`](Container::pre_instantiate_singletons).
    fn register_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()>;

    /// Registers a ready-made singleton. It is never initialized by the
    /// container, but its destroy callbacks run on teardown.
    fn register_singleton(&self, name: &str, instance: Instance) -> ContainerResult<()>;

    /// Makes `alias` resolve to `name`.
    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()>;

    /// Adds a post-processor. Processors run by tier, then order, then
    /// registration; beans created before the call are not revisited.
    fn add_post_processor(&self, processor: Arc<dyn PostProcessor>);

    /// Destroys every singleton, dependents before their dependencies, and
    /// closes the container. Later lookups fail with
    /// [`ContainerClosed`](crate::ContainerError::ContainerClosed).
    fn destroy_all(&self);
}

impl Mutable for Container {
    fn register_definition(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        self.ensure_open()?;
        self.inner.definitions.register(name, definition)
    }

    fn register_singleton(&self, name: &str, instance: Instance) -> ContainerResult<()> {
        self.ensure_open()?;
        let disposer = instance.class().disposer();
        let object = instance.clone();
        self.inner.singletons.register_singleton(name, instance)?;
        if let Some(destroy) = disposer {
            self.inner
                .singletons
                .register_disposable(name, Box::new(move || destroy(object.object())));
        }
        Ok(())
    }

    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        self.inner.definitions.register_alias(name, alias)
    }

    fn add_post_processor(&self, processor: Arc<dyn PostProcessor>) {
        debug!(processor = processor.name(), "adding post-processor");
        self.add_processor(processor);
    }

    fn destroy_all(&self) {
        self.close();
    }
}
