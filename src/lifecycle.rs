//! Init and destroy callbacks.

use tracing::{trace, warn};

use crate::container::{Container, ContainerRef, HookContext};
use crate::definition::MergedDefinition;
use crate::error::{BoxError, ContainerError, ContainerResult, Phase};
use crate::instance::Instance;
use crate::internal::DisposeFn;

impl Container {
    /// Runs, in order: aware callbacks, before-initialization hooks,
    /// `after_properties_set`, the declared init method and
    /// after-initialization hooks. Returns the bean callers will see.
    pub(crate) fn initialize_bean(
        &self,
        name: &str,
        merged: &MergedDefinition,
        instance: Instance,
        ctx: &HookContext<'_>,
    ) -> ContainerResult<Instance> {
        self.invoke_aware_callbacks(name, &instance);
        let wrapped = self.inner.processors.apply_before_initialization(instance, ctx)?;
        self.invoke_init_methods(name, merged, &wrapped)?;
        self.inner.processors.apply_after_initialization(wrapped, ctx)
    }

    fn invoke_aware_callbacks(&self, name: &str, instance: &Instance) {
        let class = instance.class();
        let object = instance.object();
        class.notify_name(object, name);
        class.notify_registry(object, || self.type_registry());
        class.notify_container(object, || ContainerRef::new(self));
    }

    fn invoke_init_methods(&self, name: &str, merged: &MergedDefinition, instance: &Instance) -> ContainerResult<()> {
        let class = instance.class();
        if let Some(result) = class.after_properties_set(instance.object()) {
            trace!(bean = name, "invoking after_properties_set");
            result.map_err(|e| ContainerError::from_user(name, Phase::Initialization, e))?;
        }

        let Some(method) = merged.init_method() else {
            return Ok(());
        };
        if class.is_initializing() && method == "after_properties_set" {
            return Ok(());
        }
        let init = class.method(method).ok_or_else(|| ContainerError::InvalidDefinition {
            bean: name.to_owned(),
            reason: format!("init method '{method}' not found on {}", class.name()),
        })?;
        trace!(bean = name, method, "invoking init method");
        init(instance.object()).map_err(|e| ContainerError::from_user(name, Phase::Initialization, e))
    }

    /// Registers the teardown of a singleton if anything needs to run.
    pub(crate) fn register_disposable_if_necessary(&self, name: &str, merged: &MergedDefinition, instance: &Instance) -> ContainerResult<()> {
        if let Some(action) = self.disposal_action(name, merged, instance)? {
            self.inner.singletons.register_disposable(name, action);
        }
        Ok(())
    }

    /// Teardown of `instance`: destruction processors, then `destroy`, then
    /// the declared destroy method. Every step runs even if an earlier one
    /// failed; the first failure is reported.
    fn disposal_action(&self, name: &str, merged: &MergedDefinition, instance: &Instance) -> ContainerResult<Option<DisposeFn>> {
        let class = instance.class();
        let processors = self.inner.processors.destruction_processors(instance);
        let disposer = class.disposer();
        let declared = match merged.destroy_method() {
            Some(method) if class.is_disposable() && method == "destroy" => None,
            Some(method) => Some(class.method(method).cloned().ok_or_else(|| ContainerError::InvalidDefinition {
                bean: name.to_owned(),
                reason: format!("destroy method '{method}' not found on {}", class.name()),
            })?),
            None => None,
        };
        if processors.is_empty() && disposer.is_none() && declared.is_none() {
            return Ok(None);
        }

        let bean = name.to_owned();
        let instance = instance.clone();
        Ok(Some(Box::new(move || {
            let mut first: Option<BoxError> = None;
            let mut record = |result: Result<(), BoxError>| {
                if let Err(error) = result {
                    if first.is_none() {
                        first = Some(error);
                    } else {
                        warn!(bean = %bean, %error, "destroy callback failed");
                    }
                }
            };

            for processor in &processors {
                if let Some(hook) = processor.destruction() {
                    record(hook.before_destruction(&instance, &bean));
                }
            }
            if let Some(destroy) = &disposer {
                trace!(bean = %bean, "invoking destroy");
                record(destroy(instance.object()));
            }
            if let Some(method) = &declared {
                trace!(bean = %bean, "invoking declared destroy method");
                record(method(instance.object()));
            }

            match first {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })))
    }
}
