//! Bean lookup.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::container::Container;
use crate::error::{ContainerError, ContainerResult};
use crate::instance::Instance;
use crate::key::TypeKey;

/// Object-safe bean lookup.
///
/// Most callers use the typed helpers of [`LookupExt`], which every `Lookup`
/// gets for free.
pub trait Lookup: Send + Sync {
    /// The bean registered under `name` or one of its aliases.
    ///
    /// Singletons keep their identity across calls; prototypes are built anew.
    fn get_object(&self, name: &str) -> ContainerResult<Instance>;

    /// The single bean assignable to `key`, with primary beans winning ties.
    fn get_object_by_type(&self, key: TypeKey) -> ContainerResult<Instance>;

    /// Every bean assignable to `key` with its name, ordered by priority.
    fn get_objects_by_type(&self, key: TypeKey) -> ContainerResult<Vec<(String, Instance)>>;

    /// Whether `name` refers to a blueprint or a registered singleton.
    fn contains_object(&self, name: &str) -> bool;
}

/// Typed lookup on top of [`Lookup`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_beans::{BeanDefinition, ClassBuilder, Container, ContainerError, Introspectable, LookupExt, Mutable};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> &'static str;
/// }
///
/// #[derive(Default)]
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> &'static str {
///         "hello"
///     }
/// }
///
/// impl Introspectable for English {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class
///             .implements::<dyn Greeter>(|english| english as Arc<dyn Greeter>)
///             .default_constructor()
///     }
/// }
///
/// let container = Container::new();
/// container.register_definition("english", BeanDefinition::of::<English>()).unwrap();
///
/// let greeter: Arc<dyn Greeter> = container.get_by_type().unwrap();
/// assert_eq!(greeter.greet(), "hello");
///
/// let by_name = container.get::<dyn Greeter>("english").unwrap();
/// assert!(Arc::ptr_eq(&greeter, &by_name));
///
/// assert!(matches!(container.get::<String>("english"), Err(ContainerError::TypeMismatch { .. })));
/// ```
pub trait LookupExt: Lookup {
    /// The bean `name` viewed as `Arc<I>`.
    fn get<I>(&self, name: &str) -> ContainerResult<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let instance = self.get_object(name)?;
        view(name, &instance)
    }

    /// The single bean assignable to `I`.
    fn get_by_type<I>(&self) -> ContainerResult<Arc<I>>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let instance = self.get_object_by_type(TypeKey::of::<I>())?;
        view(std::any::type_name::<I>(), &instance)
    }

    /// Every bean assignable to `I`, ordered by priority.
    fn get_all<I>(&self) -> ContainerResult<Vec<Arc<I>>>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.get_objects_by_type(TypeKey::of::<I>())?
            .iter()
            .map(|(name, instance)| view(name, instance))
            .collect()
    }

    /// Every bean assignable to `I`, keyed by bean name.
    fn get_map<I>(&self) -> ContainerResult<BTreeMap<String, Arc<I>>>
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.get_objects_by_type(TypeKey::of::<I>())?
            .into_iter()
            .map(|(name, instance)| view(&name, &instance).map(|bean| (name, bean)))
            .collect()
    }
}

impl<T: Lookup + ?Sized> LookupExt for T {}

fn view<I>(name: &str, instance: &Instance) -> ContainerResult<Arc<I>>
where
    I: ?Sized + Send + Sync + 'static,
{
    instance.get::<I>().ok_or_else(|| ContainerError::TypeMismatch {
        bean: name.to_owned(),
        expected: std::any::type_name::<I>(),
        actual: instance.type_key().name(),
    })
}

impl Lookup for Container {
    fn get_object(&self, name: &str) -> ContainerResult<Instance> {
        self.get_object_internal(name, None)
    }

    fn get_object_by_type(&self, key: TypeKey) -> ContainerResult<Instance> {
        self.get_object_by_key(key)
    }

    fn get_objects_by_type(&self, key: TypeKey) -> ContainerResult<Vec<(String, Instance)>> {
        self.get_objects_by_key(key)
    }

    fn contains_object(&self, name: &str) -> bool {
        self.contains_bean(name)
    }
}
