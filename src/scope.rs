//! Bean scope definitions.

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Bean scopes controlling instance sharing
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanDefinition, ClassBuilder, Container, Introspectable, Lookup, Mutable, Scope};
///
/// #[derive(Default)]
/// struct Counter;
///
/// impl Introspectable for Counter {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class.default_constructor()
///     }
/// }
///
/// let container = Container::new();
/// container.register_definition("shared", BeanDefinition::of::<Counter>()).unwrap();
/// container
///     .register_definition("fresh", BeanDefinition::of::<Counter>().scope(Scope::Prototype))
///     .unwrap();
///
/// let a = container.get_object("shared").unwrap();
/// let b = container.get_object("shared").unwrap();
/// assert!(a.ptr_eq(&b));
///
/// let c = container.get_object("fresh").unwrap();
/// let d = container.get_object("fresh").unwrap();
/// assert!(!c.ptr_eq(&d));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Scope {
    /// One shared instance per container
    ///
    /// Created on first demand (or during pre-instantiation), cached for the
    /// container's lifetime and destroyed in reverse creation order on
    /// teardown. Only singletons take part in early-reference exposure.
    #[default]
    Singleton,
    /// Fresh instance per request, never cached
    ///
    /// The container builds a new instance every time and hands ownership to
    /// the caller; destroy hooks are not registered for prototypes.
    Prototype,
}

impl Scope {
    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self, Scope::Prototype)
    }
}
