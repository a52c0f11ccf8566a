//! Built-in processor wiring properties marked for injection.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::container::HookContext;
use crate::definition::{MergedDefinition, PropertyValues, Value};
use crate::error::BoxError;
use crate::instance::Instance;
use crate::introspect::{Class, Resolved};
use crate::key::TypeKey;
use crate::processor::{ConstructorSelector, DefinitionProcessor, Order, PostProcessor, PropertyProcessor};
use crate::resolver::DependencyDescriptor;

struct InjectionPoint {
    property: &'static str,
    descriptor: DependencyDescriptor,
}

/// Wires properties declared with
/// [`ClassBuilder::autowired`](crate::ClassBuilder::autowired) and proposes
/// constructors declared with
/// [`ClassBuilder::autowired_constructor`](crate::ClassBuilder::autowired_constructor).
///
/// Injection metadata is computed once per class while blueprints are
/// processed, before the first instance is built. Values given explicitly in
/// the blueprint win over injection.
///
/// Registered by default; see
/// [`ContainerConfig::annotation_injection`](crate::ContainerConfig).
pub struct AutowiredProcessor {
    metadata: RwLock<HashMap<TypeKey, Arc<[InjectionPoint]>>>,
}

impl AutowiredProcessor {
    pub const ORDER: Order = Order::priority(i32::MAX - 2);

    pub fn new() -> Self {
        Self { metadata: RwLock::new(HashMap::new()) }
    }

    fn metadata(&self, class: &Class) -> Arc<[InjectionPoint]> {
        if let Some(points) = self.metadata.read().get(&class.key()) {
            return points.clone();
        }
        let points: Arc<[InjectionPoint]> = class
            .properties()
            .iter()
            .filter_map(|property| {
                property.injection().map(|_| InjectionPoint {
                    property: property.name(),
                    descriptor: DependencyDescriptor::for_property(property),
                })
            })
            .collect::<Vec<_>>()
            .into();
        trace!(class = class.name(), points = points.len(), "computed injection metadata");
        self.metadata.write().entry(class.key()).or_insert(points).clone()
    }
}

impl Default for AutowiredProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PostProcessor for AutowiredProcessor {
    fn order(&self) -> Order {
        Self::ORDER
    }

    fn name(&self) -> &str {
        "AutowiredProcessor"
    }

    fn definition_processor(&self) -> Option<&dyn DefinitionProcessor> {
        Some(self)
    }

    fn constructor_selector(&self) -> Option<&dyn ConstructorSelector> {
        Some(self)
    }

    fn property_processor(&self) -> Option<&dyn PropertyProcessor> {
        Some(self)
    }
}

impl DefinitionProcessor for AutowiredProcessor {
    fn process_definition(&self, _definition: &MergedDefinition, class: &Arc<Class>) -> Result<(), BoxError> {
        self.metadata(class);
        Ok(())
    }
}

impl ConstructorSelector for AutowiredProcessor {
    fn candidate_constructors(&self, class: &Class, _bean_name: &str) -> Option<Vec<usize>> {
        let marked: Vec<usize> = class
            .constructors()
            .iter()
            .enumerate()
            .filter(|(_, constructor)| constructor.is_autowired())
            .map(|(index, _)| index)
            .collect();
        (!marked.is_empty()).then_some(marked)
    }
}

impl PropertyProcessor for AutowiredProcessor {
    fn process_properties(
        &self,
        mut properties: PropertyValues,
        instance: &Instance,
        ctx: &HookContext<'_>,
    ) -> Result<PropertyValues, BoxError> {
        for point in self.metadata(instance.class()).iter() {
            if properties.contains(point.property) {
                continue;
            }
            match ctx.resolve(&point.descriptor)? {
                Resolved::Null => {
                    trace!(bean = ctx.bean_name(), property = point.property, "optional injection point left unset");
                }
                value => properties.set(point.property, Value::Resolved(value)),
            }
        }
        Ok(properties)
    }
}
