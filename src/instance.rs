//! Type-erased bean instances.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::introspect::{Class, Introspectable};
use crate::key::TypeKey;

/// Type-erased shared object.
pub type BeanObject = Arc<dyn Any + Send + Sync>;

/// A bean together with its class.
///
/// Cloning an `Instance` clones the `Arc`; identity is pointer identity of the
/// underlying object (see [`ptr_eq`](Instance::ptr_eq)).
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_beans::{ClassBuilder, Instance, Introspectable};
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock(u64);
///
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 {
///         self.0
///     }
/// }
///
/// impl Introspectable for FixedClock {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class.implements::<dyn Clock>(|clock| clock as Arc<dyn Clock>)
///     }
/// }
///
/// let instance = Instance::new(FixedClock(7));
/// assert_eq!(instance.get::<dyn Clock>().unwrap().now(), 7);
/// assert_eq!(instance.downcast::<FixedClock>().unwrap().0, 7);
/// assert!(instance.get::<String>().is_none());
/// ```
#[derive(Clone)]
pub struct Instance {
    object: BeanObject,
    class: Arc<Class>,
}

impl Instance {
    pub fn new<T: Introspectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an existing `Arc`, keeping its identity.
    pub fn from_arc<T: Introspectable>(value: Arc<T>) -> Self {
        Self { object: value, class: Class::of::<T>() }
    }

    /// Wraps a value whose type carries no description.
    ///
    /// The instance can be looked up by name or by its concrete type only.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self { object: Arc::new(value), class: Class::opaque::<T>() }
    }

    pub(crate) fn from_parts(object: BeanObject, class: Arc<Class>) -> Self {
        Self { object, class }
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn type_key(&self) -> TypeKey {
        self.class.key()
    }

    pub fn object(&self) -> &BeanObject {
        &self.object
    }

    /// The concrete object.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.object).downcast_ref::<T>()
    }

    /// View of the bean as `Arc<I>`, where `I` is the concrete type or an
    /// interface declared through [`ClassBuilder::implements`](crate::ClassBuilder::implements).
    pub fn get<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.class
            .cast(&self.object, TypeId::of::<I>())
            .and_then(|boxed| boxed.downcast::<Arc<I>>().ok())
            .map(|view| *view)
    }

    /// Whether [`get::<I>`](Instance::get) would succeed.
    pub fn is<I: ?Sized + 'static>(&self) -> bool {
        self.class.is_assignable_to(TypeKey::of::<I>())
    }

    /// True when both instances refer to the same object.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.object) as *const (),
            Arc::as_ptr(&other.object) as *const (),
        )
    }

    /// Address of the underlying object, for identity tracking.
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.object) as *const () as usize
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({} @ {:#x})", self.class.name(), self.address())
    }
}
