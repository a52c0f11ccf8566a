//! Property population.

use tracing::trace;

use crate::container::{Container, HookContext};
use crate::definition::{AutowireMode, MergedDefinition, PropertyValues, Value};
use crate::error::{ContainerError, ContainerResult, Phase};
use crate::instance::Instance;
use crate::introspect::{DependencyKind, Resolved};
use crate::resolver::DependencyDescriptor;

impl Container {
    /// Fills the properties of a freshly constructed bean.
    ///
    /// Declared values come first; autowiring by name or type only fills
    /// bean-typed properties the blueprint left unset; property processors see
    /// and may rewrite the combined set before any setter runs.
    pub(crate) fn populate_bean(
        &self,
        name: &str,
        merged: &MergedDefinition,
        instance: &Instance,
        ctx: &HookContext<'_>,
    ) -> ContainerResult<()> {
        if !self.inner.processors.apply_after_instantiation(instance, ctx)? {
            return Ok(());
        }

        let mut properties = merged.properties().clone();
        match merged.autowire() {
            AutowireMode::ByName => self.autowire_by_name(name, instance, &mut properties)?,
            AutowireMode::ByType => self.autowire_by_type(name, instance, &mut properties)?,
            AutowireMode::None | AutowireMode::Constructor => {}
        }

        let properties = self.inner.processors.apply_property_processors(properties, instance, ctx)?;
        self.apply_properties(name, merged, instance, &properties)
    }

    fn autowire_by_name(&self, name: &str, instance: &Instance, properties: &mut PropertyValues) -> ContainerResult<()> {
        for property in instance.class().properties() {
            if properties.contains(property.name()) || !matches!(property.kind(), DependencyKind::Bean(_)) {
                continue;
            }
            if self.contains_bean(property.name()) {
                let dependency = self.get_object_internal(property.name(), None)?;
                let canonical = self.inner.definitions.canonical_name(property.name());
                self.inner.singletons.register_dependent(&canonical, name);
                trace!(bean = name, property = property.name(), "autowiring by name");
                properties.set(property.name(), Value::Resolved(Resolved::Bean(dependency)));
            } else {
                trace!(bean = name, property = property.name(), "no matching bean found for autowiring by name");
            }
        }
        Ok(())
    }

    fn autowire_by_type(&self, name: &str, instance: &Instance, properties: &mut PropertyValues) -> ContainerResult<()> {
        for property in instance.class().properties() {
            if properties.contains(property.name()) || !property.kind().is_bean() {
                continue;
            }
            let descriptor = DependencyDescriptor::new(property.kind(), property.name()).required(false);
            match self.resolve_dependency(&descriptor, Some(name))? {
                Resolved::Null => {
                    trace!(bean = name, property = property.name(), "no candidate for autowiring by type");
                }
                value => properties.set(property.name(), Value::Resolved(value)),
            }
        }
        Ok(())
    }

    fn apply_properties(
        &self,
        name: &str,
        merged: &MergedDefinition,
        instance: &Instance,
        properties: &PropertyValues,
    ) -> ContainerResult<()> {
        let class = instance.class();
        for (property_name, value) in properties.iter() {
            let property = class.property(property_name).ok_or_else(|| ContainerError::InvalidDefinition {
                bean: name.to_owned(),
                reason: format!("{} has no writable property '{property_name}'", class.name()),
            })?;
            let resolved = self.resolve_value(name, merged, value)?;
            property
                .apply(instance.object(), resolved)
                .map_err(|e| ContainerError::from_user(name, Phase::Population, e))?;
        }
        Ok(())
    }

    /// Whether a bean named `name` can be obtained here or from a parent.
    pub(crate) fn contains_bean(&self, name: &str) -> bool {
        let canonical = self.inner.definitions.canonical_name(name);
        self.inner.definitions.contains(&canonical)
            || self.inner.singletons.contains_singleton(&canonical)
            || self.inner.parent.as_ref().map_or(false, |parent| parent.contains_bean(name))
    }
}
