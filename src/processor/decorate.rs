//! Identity-changing decoration as a first-class processor.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::container::HookContext;
use crate::error::BoxError;
use crate::instance::Instance;
use crate::processor::{Decoration, EarlyReferenceProcessor, InitializationProcessor, Order, PostProcessor};

/// A decorator that wraps or replaces beans.
///
/// The replacement is what every later caller sees, so decorators typically
/// return a wrapper implementing the same interface views as the original.
pub trait Decorate: Send + Sync + 'static {
    /// Whether this decorator wants to wrap the bean.
    fn applies_to(&self, instance: &Instance, bean_name: &str) -> bool;

    /// Produces the bean handed to callers in place of `original`.
    fn decorate(&self, original: Instance, bean_name: &str) -> Result<Instance, BoxError>;
}

/// Decorator for every bean viewable as `Arc<I>`.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_beans::{ClassBuilder, DecoratingProcessor, Instance, Introspectable};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct Loud(Arc<dyn Greeter>);
///
/// impl Greeter for Loud {
///     fn greet(&self) -> String {
///         self.0.greet().to_uppercase()
///     }
/// }
///
/// impl Introspectable for Loud {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class.implements::<dyn Greeter>(|loud| loud as Arc<dyn Greeter>)
///     }
/// }
///
/// let processor = DecoratingProcessor::for_view(|greeter: Arc<dyn Greeter>, _name: &str| {
///     Ok(Instance::new(Loud(greeter)))
/// });
/// # let _ = processor;
/// ```
pub struct ViewDecorator<I: ?Sized, F> {
    decorate: F,
    _marker: PhantomData<fn(Arc<I>)>,
}

impl<I, F> ViewDecorator<I, F>
where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<I>, &str) -> Result<Instance, BoxError> + Send + Sync + 'static,
{
    pub fn new(decorate: F) -> Self {
        Self { decorate, _marker: PhantomData }
    }
}

impl<I, F> Decorate for ViewDecorator<I, F>
where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<I>, &str) -> Result<Instance, BoxError> + Send + Sync + 'static,
{
    fn applies_to(&self, instance: &Instance, _bean_name: &str) -> bool {
        instance.is::<I>()
    }

    fn decorate(&self, original: Instance, bean_name: &str) -> Result<Instance, BoxError> {
        let view = original
            .get::<I>()
            .ok_or_else(|| format!("bean '{bean_name}' cannot be viewed as {}", std::any::type_name::<I>()))?;
        (self.decorate)(view, bean_name)
    }
}

/// Applies a [`Decorate`] exactly once per bean, with consistent identity.
///
/// When a singleton in a cycle hands out an early reference, the decoration
/// is applied there and remembered; the after-initialization hook then keeps
/// the raw bean, and the container swaps in the already decorated early
/// reference. Without a cycle the decoration happens after initialization.
///
/// A bean whose creation fails after its early reference was taken leaves
/// nothing behind that could suppress a later decoration: the memo only
/// holds a weak handle to the raw bean.
pub struct DecoratingProcessor<D> {
    decorator: D,
    order: Order,
    /// bean name -> raw bean decorated early
    early: Mutex<HashMap<String, Weak<dyn Any + Send + Sync>>>,
}

impl<D: Decorate> DecoratingProcessor<D> {
    pub fn new(decorator: D) -> Self {
        Self {
            decorator,
            order: Order::unordered(),
            early: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn decorator(&self) -> &D {
        &self.decorator
    }

    fn wrap(&self, instance: &Instance, bean_name: &str) -> Result<Decoration, BoxError> {
        if !self.decorator.applies_to(instance, bean_name) {
            return Ok(Decoration::Keep);
        }
        debug!(bean = bean_name, "decorating bean");
        self.decorator
            .decorate(instance.clone(), bean_name)
            .map(Decoration::Replace)
    }
}

impl<I, F> DecoratingProcessor<ViewDecorator<I, F>>
where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<I>, &str) -> Result<Instance, BoxError> + Send + Sync + 'static,
{
    /// Processor decorating every bean viewable as `Arc<I>` with `decorate`.
    pub fn for_view(decorate: F) -> Self {
        Self::new(ViewDecorator::new(decorate))
    }
}

impl<D: Decorate> PostProcessor for DecoratingProcessor<D> {
    fn order(&self) -> Order {
        self.order
    }

    fn early_reference(&self) -> Option<&dyn EarlyReferenceProcessor> {
        Some(self)
    }

    fn initialization(&self) -> Option<&dyn InitializationProcessor> {
        Some(self)
    }
}

impl<D: Decorate> EarlyReferenceProcessor for DecoratingProcessor<D> {
    fn early_reference(&self, instance: &Instance, ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        {
            let mut early = self.early.lock();
            early.retain(|_, raw| raw.strong_count() > 0);
            early.insert(ctx.bean_name().to_owned(), Arc::downgrade(instance.object()));
        }
        self.wrap(instance, ctx.bean_name())
    }
}

impl<D: Decorate> InitializationProcessor for DecoratingProcessor<D> {
    fn after_initialization(&self, instance: &Instance, ctx: &HookContext<'_>) -> Result<Decoration, BoxError> {
        let decorated_early = self
            .early
            .lock()
            .remove(ctx.bean_name())
            .and_then(|raw| raw.upgrade())
            .map_or(false, |raw| Arc::as_ptr(&raw) as *const () as usize == instance.address());
        if decorated_early {
            return Ok(Decoration::Keep);
        }
        self.wrap(instance, ctx.bean_name())
    }
}
