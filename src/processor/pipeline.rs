//! Ordered processor storage and hook dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::container::HookContext;
use crate::definition::{MergedDefinition, PropertyValues};
use crate::error::{ContainerError, ContainerResult, Phase};
use crate::instance::Instance;
use crate::introspect::Class;
use crate::processor::{Order, PostProcessor};

#[derive(Clone)]
struct Entry {
    processor: Arc<dyn PostProcessor>,
    order: Order,
    seq: u64,
}

/// Registered processors, kept sorted.
///
/// Readers take a snapshot, so hooks may register further processors
/// without deadlocking; those apply to beans created afterwards.
pub(crate) struct Pipeline {
    entries: RwLock<Arc<[Entry]>>,
    seq: AtomicU64,
}

impl Pipeline {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::from(Vec::new())),
            seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn add(&self, processor: Arc<dyn PostProcessor>) {
        let entry = Entry {
            order: processor.order(),
            processor,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        trace!(processor = entry.processor.name(), order = ?entry.order, "registering post-processor");
        let mut entries = self.entries.write();
        let mut sorted: Vec<Entry> = entries.iter().cloned().collect();
        sorted.push(entry);
        sorted.sort_by(|a, b| a.order.cmp(&b.order).then(a.seq.cmp(&b.seq)));
        *entries = sorted.into();
    }

    fn snapshot(&self) -> Arc<[Entry]> {
        self.entries.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Processor names in execution order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.processor.name().to_owned()).collect()
    }

    pub(crate) fn apply_definition_processors(&self, definition: &MergedDefinition, class: &Arc<Class>) -> ContainerResult<()> {
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.definition_processor() {
                hook.process_definition(definition, class)
                    .map_err(|e| ContainerError::from_user(definition.name(), Phase::PostProcessing, e))?;
            }
        }
        Ok(())
    }

    /// First substitute returned wins.
    pub(crate) fn apply_before_instantiation(&self, class: &Arc<Class>, ctx: &HookContext<'_>) -> ContainerResult<Option<Instance>> {
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.before_instantiation() {
                let substitute = hook
                    .before_instantiation(class, ctx)
                    .map_err(|e| ctx.fail(Phase::PostProcessing, e))?;
                if let Some(substitute) = substitute {
                    trace!(bean = ctx.bean_name(), processor = entry.processor.name(), "instantiation short-circuited");
                    return Ok(Some(substitute));
                }
            }
        }
        Ok(None)
    }

    /// Union of proposed constructors, first proposal order preserved.
    pub(crate) fn candidate_constructors(&self, class: &Class, bean_name: &str) -> Option<Vec<usize>> {
        let mut proposed: Option<Vec<usize>> = None;
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.constructor_selector() {
                if let Some(indices) = hook.candidate_constructors(class, bean_name) {
                    let all = proposed.get_or_insert_with(Vec::new);
                    for index in indices {
                        if index < class.constructors().len() && !all.contains(&index) {
                            all.push(index);
                        }
                    }
                }
            }
        }
        proposed.filter(|indices| !indices.is_empty())
    }

    pub(crate) fn apply_early_reference(&self, instance: Instance, ctx: &HookContext<'_>) -> ContainerResult<Instance> {
        let mut exposed = instance;
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.early_reference() {
                exposed = hook
                    .early_reference(&exposed, ctx)
                    .map_err(|e| ctx.fail(Phase::PostProcessing, e))?
                    .apply(exposed);
            }
        }
        Ok(exposed)
    }

    /// `false` as soon as one processor vetoes population.
    pub(crate) fn apply_after_instantiation(&self, instance: &Instance, ctx: &HookContext<'_>) -> ContainerResult<bool> {
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.after_instantiation() {
                let proceed = hook
                    .after_instantiation(instance, ctx)
                    .map_err(|e| ctx.fail(Phase::PostProcessing, e))?;
                if !proceed {
                    trace!(bean = ctx.bean_name(), processor = entry.processor.name(), "property population vetoed");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub(crate) fn apply_property_processors(
        &self,
        properties: PropertyValues,
        instance: &Instance,
        ctx: &HookContext<'_>,
    ) -> ContainerResult<PropertyValues> {
        let mut properties = properties;
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.property_processor() {
                properties = hook
                    .process_properties(properties, instance, ctx)
                    .map_err(|e| ctx.fail(Phase::PostProcessing, e))?;
            }
        }
        Ok(properties)
    }

    pub(crate) fn apply_before_initialization(&self, instance: Instance, ctx: &HookContext<'_>) -> ContainerResult<Instance> {
        let mut current = instance;
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.initialization() {
                current = hook
                    .before_initialization(&current, ctx)
                    .map_err(|e| ctx.fail(Phase::PostProcessing, e))?
                    .apply(current);
            }
        }
        Ok(current)
    }

    pub(crate) fn apply_after_initialization(&self, instance: Instance, ctx: &HookContext<'_>) -> ContainerResult<Instance> {
        let mut current = instance;
        for entry in self.snapshot().iter() {
            if let Some(hook) = entry.processor.initialization() {
                current = hook
                    .after_initialization(&current, ctx)
                    .map_err(|e| ctx.fail(Phase::PostProcessing, e))?
                    .apply(current);
            }
        }
        Ok(current)
    }

    /// Destruction processors interested in `instance`.
    pub(crate) fn destruction_processors(&self, instance: &Instance) -> Vec<Arc<dyn PostProcessor>> {
        self.snapshot()
            .iter()
            .filter(|e| e.processor.destruction().map_or(false, |hook| hook.requires_destruction(instance)))
            .map(|e| e.processor.clone())
            .collect()
    }
}
