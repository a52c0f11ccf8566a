//! Bean descriptors for introspection and diagnostics.

use crate::scope::Scope;

/// Summary of one registered bean
///
/// Produced by [`Enumerable::describe`](crate::Enumerable::describe) for
/// every blueprint and manual singleton, in registration order.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanDefinition, ClassBuilder, Container, Enumerable, Introspectable, Lookup, Mutable, Scope};
///
/// #[derive(Default)]
/// struct Cache;
///
/// impl Introspectable for Cache {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class.default_constructor()
///     }
/// }
///
/// let container = Container::new();
/// container.register_definition("cache", BeanDefinition::of::<Cache>().primary()).unwrap();
/// container.register_definition("scratch", BeanDefinition::of::<Cache>().prototype()).unwrap();
/// container.get_object("cache").unwrap();
///
/// let descriptors = Enumerable::describe(&container);
/// let cache = descriptors.iter().find(|d| d.name == "cache").unwrap();
/// assert!(cache.primary && cache.instantiated);
/// assert!(cache.type_name.unwrap().ends_with("Cache"));
///
/// let scratch = descriptors.iter().find(|d| d.name == "scratch").unwrap();
/// assert_eq!(scratch.scope, Scope::Prototype);
/// assert!(!scratch.instantiated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanDescriptor {
    pub name: String,
    /// Type of the produced bean, when it can be predicted.
    pub type_name: Option<&'static str>,
    pub scope: Scope,
    pub aliases: Vec<String>,
    pub primary: bool,
    pub lazy: bool,
    pub is_abstract: bool,
    /// Registered ready-made rather than from a blueprint.
    pub manual: bool,
    /// A finished singleton exists for this name.
    pub instantiated: bool,
    /// Destroy callbacks will run for it on teardown.
    pub disposable: bool,
}

impl BeanDescriptor {
    /// Short name of the bean type, without its module path.
    pub fn short_type_name(&self) -> Option<&'static str> {
        self.type_name.map(|name| {
            let generic = name.find('<').unwrap_or(name.len());
            let start = name[..generic].rfind("::").map_or(0, |i| i + 2);
            &name[start..]
        })
    }
}
