//! Post-processor pipeline.
//!
//! A post-processor intercepts bean creation at fixed points. Rather than
//! inheriting from a hook hierarchy, a processor implements [`PostProcessor`]
//! and answers capability queries: each accessor returns `Some(self)` for the
//! interception points it implements and the container never calls a hook
//! whose accessor returned `None`.
//!
//! Interception points, in lifecycle order:
//!
//! 1. [`DefinitionProcessor`]: once per merged blueprint, before any instance exists.
//! 2. [`BeforeInstantiation`]: may return a substitute and skip construction entirely.
//! 3. [`ConstructorSelector`]: proposes constructors for autowiring.
//! 4. [`EarlyReferenceProcessor`]: shapes the reference handed out mid-cycle.
//! 5. [`AfterInstantiation`]: may veto property population.
//! 6. [`PropertyProcessor`]: rewrites the property set.
//! 7. [`InitializationProcessor`]: wraps or replaces the bean around init callbacks.
//! 8. [`DestructionProcessor`]: runs before the bean's own destroy callbacks.
//!
//! Processors run ordered by [`Tier`], then by order value, then by
//! registration.

mod autowired;
mod decorate;
mod pipeline;

pub use autowired::AutowiredProcessor;
pub use decorate::{Decorate, DecoratingProcessor, ViewDecorator};
pub(crate) use pipeline::Pipeline;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::container::HookContext;
use crate::definition::{MergedDefinition, PropertyValues};
use crate::error::BoxError;
use crate::instance::Instance;
use crate::introspect::Class;

/// Outcome of a hook that may swap the bean for another object.
///
/// `Keep` is distinct from any replacement, so "no intervention" never needs a
/// placeholder value.
#[derive(Debug, Clone)]
pub enum Decoration {
    Keep,
    Replace(Instance),
}

impl Decoration {
    pub(crate) fn apply(self, current: Instance) -> Instance {
        match self {
            Decoration::Keep => current,
            Decoration::Replace(replacement) => replacement,
        }
    }
}

/// Ordering tier. Earlier tiers always run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Priority,
    Ordered,
    Unordered,
}

/// Position of a processor in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Order {
    pub tier: Tier,
    pub value: i32,
}

impl Order {
    pub const fn priority(value: i32) -> Self {
        Self { tier: Tier::Priority, value }
    }

    pub const fn ordered(value: i32) -> Self {
        Self { tier: Tier::Ordered, value }
    }

    pub const fn unordered() -> Self {
        Self { tier: Tier::Unordered, value: 0 }
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::unordered()
    }
}

impl PartialOrd for Order {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Order {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tier.cmp(&other.tier).then(self.value.cmp(&other.value))
    }
}

/// A pluggable interceptor.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{
///     AfterInstantiation, BoxError, HookContext, Instance, Order, PostProcessor,
/// };
///
/// /// Skips property population for every bean whose name starts with "raw-".
/// struct RawBeans;
///
/// impl PostProcessor for RawBeans {
///     fn order(&self) -> Order {
///         Order::ordered(10)
///     }
///
///     fn after_instantiation(&self) -> Option<&dyn AfterInstantiation> {
///         Some(self)
///     }
/// }
///
/// impl AfterInstantiation for RawBeans {
///     fn after_instantiation(&self, _instance: &Instance, ctx: &HookContext<'_>) -> Result<bool, BoxError> {
///         Ok(!ctx.bean_name().starts_with("raw-"))
///     }
/// }
/// ```
pub trait PostProcessor: Send + Sync {
    fn order(&self) -> Order {
        Order::unordered()
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn definition_processor(&self) -> Option<&dyn DefinitionProcessor> {
        None
    }

    fn before_instantiation(&self) -> Option<&dyn BeforeInstantiation> {
        None
    }

    fn constructor_selector(&self) -> Option<&dyn ConstructorSelector> {
        None
    }

    fn early_reference(&self) -> Option<&dyn EarlyReferenceProcessor> {
        None
    }

    fn after_instantiation(&self) -> Option<&dyn AfterInstantiation> {
        None
    }

    fn property_processor(&self) -> Option<&dyn PropertyProcessor> {
        None
    }

    fn initialization(&self) -> Option<&dyn InitializationProcessor> {
        None
    }

    fn destruction(&self) -> Option<&dyn DestructionProcessor> {
        None
    }
}

/// Enriches merged blueprints before their first instance is built.
pub trait DefinitionProcessor: Send + Sync {
    fn process_definition(&self, definition: &MergedDefinition, class: &Arc<Class>) -> Result<(), BoxError>;
}

/// May supply a bean in place of normal construction.
///
/// A returned instance skips instantiation, population and init callbacks;
/// only after-initialization hooks still run on it.
pub trait BeforeInstantiation: Send + Sync {
    fn before_instantiation(&self, class: &Arc<Class>, ctx: &HookContext<'_>) -> Result<Option<Instance>, BoxError>;
}

/// Proposes the constructors to consider for autowiring, as indices into
/// [`Class::constructors`].
pub trait ConstructorSelector: Send + Sync {
    fn candidate_constructors(&self, class: &Class, bean_name: &str) -> Option<Vec<usize>>;
}

/// Shapes the reference a singleton hands out while still in creation.
///
/// Processors that replace beans after initialization should apply the same
/// replacement here, so that beans in a cycle see the final identity.
pub trait EarlyReferenceProcessor: Send + Sync {
    fn early_reference(&self, instance: &Instance, ctx: &HookContext<'_>) -> Result<Decoration, BoxError>;
}

/// Runs after construction, before property population.
pub trait AfterInstantiation: Send + Sync {
    /// Returning `false` skips property population for this bean.
    fn after_instantiation(&self, instance: &Instance, ctx: &HookContext<'_>) -> Result<bool, BoxError>;
}

/// Rewrites or augments the property set before it is applied.
pub trait PropertyProcessor: Send + Sync {
    fn process_properties(
        &self,
        properties: PropertyValues,
        instance: &Instance,
        ctx: &HookContext<'_>,
    ) -> Result<PropertyValues, BoxError>;
}

/// Wraps or replaces the bean around its init callbacks.
pub trait InitializationProcessor: Send + Sync {
    fn before_initialization(&self, _instance: &Instance, _ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        Ok(Decoration::Keep)
    }

    fn after_initialization(&self, _instance: &Instance, _ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        Ok(Decoration::Keep)
    }
}

/// Runs before a singleton's own destroy callbacks.
pub trait DestructionProcessor: Send + Sync {
    fn before_destruction(&self, instance: &Instance, bean_name: &str) -> Result<(), BoxError>;

    /// Whether this processor has work to do for `instance`.
    fn requires_destruction(&self, _instance: &Instance) -> bool {
        true
    }
}
