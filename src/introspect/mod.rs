//! Explicit type metadata used in place of runtime reflection.
//!
//! A type opts into container management by implementing [`Introspectable`]
//! and describing, through a [`ClassBuilder`], everything the container may
//! need to know about it: how to construct it, which properties can be set,
//! which factory methods it offers, which interface views (`dyn Trait`) it can
//! be cast to, and which lifecycle callbacks it implements. The result is an
//! immutable [`Class`] shared by every blueprint and instance of that type.

mod inject;
mod slot;

pub use inject::{Args, DependencyKind, Injectable, Param, Resolved};
pub use slot::Slot;

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::container::ContainerRef;
use crate::error::BoxError;
use crate::instance::{BeanObject, Instance};
use crate::key::TypeKey;
use crate::traits::{BeanNameAware, ContainerAware, DisposableBean, InitializingBean, TypeRegistryAware};

type Caster = Arc<dyn Fn(BeanObject) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;
type BuildFn = Arc<dyn Fn(&mut Args) -> Result<BeanObject, BoxError> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&BeanObject, Resolved) -> Result<(), BoxError> + Send + Sync>;
type FactoryFn = Arc<dyn Fn(Option<&BeanObject>, &mut Args) -> Result<Instance, BoxError> + Send + Sync>;
pub(crate) type MethodFn = Arc<dyn Fn(&BeanObject) -> Result<(), BoxError> + Send + Sync>;
type NameFn = Arc<dyn Fn(&BeanObject, &str) + Send + Sync>;
type RegistryFn = Arc<dyn Fn(&BeanObject, Arc<TypeRegistry>) + Send + Sync>;
type ContainerFn = Arc<dyn Fn(&BeanObject, ContainerRef) + Send + Sync>;

static CLASSES: Lazy<RwLock<HashMap<TypeId, Arc<Class>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Capability of a type to describe itself to the container.
///
/// The default description is empty: the type can be registered as a manual
/// singleton or returned from a supplier, but the container cannot construct
/// it on its own.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_beans::{ClassBuilder, Introspectable, Param, Slot};
///
/// trait Repository: Send + Sync {
///     fn table(&self) -> String;
/// }
///
/// struct SqlRepository {
///     table: String,
///     pool_size: Slot<u32>,
/// }
///
/// impl Repository for SqlRepository {
///     fn table(&self) -> String {
///         self.table.clone()
///     }
/// }
///
/// impl Introspectable for SqlRepository {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class
///             .implements::<dyn Repository>(|repo| repo as Arc<dyn Repository>)
///             .constructor(vec![Param::of::<String>("table")], |args| {
///                 Ok(SqlRepository { table: args.next()?, pool_size: Slot::new() })
///             })
///             .property("pool_size", |repo: &SqlRepository, size: u32| repo.pool_size.set(size))
///     }
/// }
/// ```
pub trait Introspectable: Any + Send + Sync + Sized {
    fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
        class
    }
}

/// Injection marker attached to a property.
///
/// Marked properties are wired by the built-in autowiring processor without
/// being listed in the blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    required: bool,
    qualifier: Option<&'static str>,
}

impl Injection {
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn qualifier(&self) -> Option<&'static str> {
        self.qualifier
    }
}

/// One way of constructing a class.
pub struct ConstructorDescriptor {
    params: Vec<Param>,
    autowired: bool,
    build: BuildFn,
}

impl ConstructorDescriptor {
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Constructors marked for injection are preferred by the autowiring processor.
    pub fn is_autowired(&self) -> bool {
        self.autowired
    }

    pub(crate) fn instantiate(&self, mut args: Args) -> Result<BeanObject, BoxError> {
        (self.build)(&mut args)
    }
}

/// A writable property.
pub struct PropertyDescriptor {
    name: &'static str,
    kind: DependencyKind,
    required: bool,
    injection: Option<Injection>,
    setter: SetterFn,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn injection(&self) -> Option<Injection> {
        self.injection
    }

    pub(crate) fn apply(&self, target: &BeanObject, value: Resolved) -> Result<(), BoxError> {
        (self.setter)(target, value)
    }
}

/// A method producing another bean.
pub struct FactoryMethodDescriptor {
    name: &'static str,
    params: Vec<Param>,
    is_static: bool,
    produces: fn() -> Arc<Class>,
    build: FactoryFn,
}

impl FactoryMethodDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Class of the produced bean.
    pub fn produces(&self) -> Arc<Class> {
        (self.produces)()
    }

    pub(crate) fn invoke(&self, target: Option<&BeanObject>, mut args: Args) -> Result<Instance, BoxError> {
        (self.build)(target, &mut args)
    }
}

#[derive(Default, Clone)]
struct Callbacks {
    name_aware: Option<NameFn>,
    registry_aware: Option<RegistryFn>,
    container_aware: Option<ContainerFn>,
    initializing: Option<MethodFn>,
    disposable: Option<MethodFn>,
}

/// Immutable metadata for one Rust type.
pub struct Class {
    key: TypeKey,
    casts: HashMap<TypeId, Caster>,
    interfaces: Vec<TypeKey>,
    constructors: Vec<ConstructorDescriptor>,
    properties: Vec<PropertyDescriptor>,
    factory_methods: Vec<FactoryMethodDescriptor>,
    methods: HashMap<&'static str, MethodFn>,
    callbacks: Callbacks,
}

impl Class {
    /// Shared class for `T`, built from its description on first use.
    pub fn of<T: Introspectable>() -> Arc<Class> {
        if let Some(class) = CLASSES.read().get(&TypeId::of::<T>()) {
            return class.clone();
        }
        let class = Arc::new(T::describe(ClassBuilder::new()).class);
        CLASSES.write().entry(TypeId::of::<T>()).or_insert(class).clone()
    }

    /// Class with no capabilities beyond identity, for plain values handed to
    /// the container ready-made.
    pub fn opaque<T: Any + Send + Sync>() -> Arc<Class> {
        Arc::new(ClassBuilder::<T>::new().class)
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// Interface views declared with [`ClassBuilder::implements`].
    pub fn interfaces(&self) -> &[TypeKey] {
        &self.interfaces
    }

    /// Whether a bean of this class satisfies a dependency on `key`.
    pub fn is_assignable_to(&self, key: TypeKey) -> bool {
        key.is_any() || self.casts.contains_key(&key.id())
    }

    /// Constructors in declaration order.
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    pub fn has_default_constructor(&self) -> bool {
        self.constructors.iter().any(|c| c.params.is_empty())
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Factory method overloads named `name`, in declaration order.
    pub fn factory_methods<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FactoryMethodDescriptor> + 'a {
        self.factory_methods.iter().filter(move |m| m.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn is_initializing(&self) -> bool {
        self.callbacks.initializing.is_some()
    }

    pub fn is_disposable(&self) -> bool {
        self.callbacks.disposable.is_some()
    }

    pub(crate) fn method(&self, name: &str) -> Option<&MethodFn> {
        self.methods.get(name)
    }

    pub(crate) fn cast(&self, object: &BeanObject, target: TypeId) -> Option<Box<dyn Any + Send + Sync>> {
        self.casts.get(&target).and_then(|caster| caster(object.clone()))
    }

    pub(crate) fn notify_name(&self, object: &BeanObject, name: &str) {
        if let Some(callback) = &self.callbacks.name_aware {
            callback(object, name);
        }
    }

    pub(crate) fn notify_registry(&self, object: &BeanObject, registry: impl FnOnce() -> Arc<TypeRegistry>) {
        if let Some(callback) = &self.callbacks.registry_aware {
            callback(object, registry());
        }
    }

    pub(crate) fn notify_container(&self, object: &BeanObject, container: impl FnOnce() -> ContainerRef) {
        if let Some(callback) = &self.callbacks.container_aware {
            callback(object, container());
        }
    }

    pub(crate) fn after_properties_set(&self, object: &BeanObject) -> Option<Result<(), BoxError>> {
        self.callbacks.initializing.as_ref().map(|callback| callback(object))
    }

    pub(crate) fn disposer(&self) -> Option<MethodFn> {
        self.callbacks.disposable.clone()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("type", &self.key.name())
            .field("interfaces", &self.interfaces)
            .field("constructors", &self.constructors.len())
            .field("properties", &self.properties.iter().map(|p| p.name).collect::<Vec<_>>())
            .field("factory_methods", &self.factory_methods.iter().map(|m| m.name).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder handed to [`Introspectable::describe`].
pub struct ClassBuilder<T> {
    class: Class,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    fn new() -> Self {
        let mut casts: HashMap<TypeId, Caster> = HashMap::new();
        casts.insert(
            TypeId::of::<T>(),
            Arc::new(|object: BeanObject| {
                object
                    .downcast::<T>()
                    .ok()
                    .map(|concrete| Box::new(concrete) as Box<dyn Any + Send + Sync>)
            }),
        );
        casts.insert(
            TypeId::of::<dyn Any + Send + Sync>(),
            Arc::new(|object: BeanObject| Some(Box::new(object) as Box<dyn Any + Send + Sync>)),
        );
        Self {
            class: Class {
                key: TypeKey::of::<T>(),
                casts,
                interfaces: Vec::new(),
                constructors: Vec::new(),
                properties: Vec::new(),
                factory_methods: Vec::new(),
                methods: HashMap::new(),
                callbacks: Callbacks::default(),
            },
            _marker: PhantomData,
        }
    }

    /// Declares that beans of this class can be viewed as `Arc<I>`.
    ///
    /// This is what makes the class a candidate for by-type dependencies on `I`.
    pub fn implements<I>(mut self, cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.class.casts.insert(
            TypeId::of::<I>(),
            Arc::new(move |object: BeanObject| {
                object
                    .downcast::<T>()
                    .ok()
                    .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
            }),
        );
        let key = TypeKey::of::<I>();
        if !self.class.interfaces.contains(&key) {
            self.class.interfaces.push(key);
        }
        self
    }

    fn push_constructor<F>(mut self, params: Vec<Param>, autowired: bool, build: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.class.constructors.push(ConstructorDescriptor {
            params,
            autowired,
            build: Arc::new(move |args| build(args).map(|value| Arc::new(value) as BeanObject)),
        });
        self
    }

    /// Adds a constructor taking `params`.
    pub fn constructor<F>(self, params: Vec<Param>, build: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push_constructor(params, false, build)
    }

    /// Adds a constructor marked for injection.
    pub fn autowired_constructor<F>(self, params: Vec<Param>, build: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push_constructor(params, true, build)
    }

    /// Adds a zero-argument constructor backed by `Default`.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    fn push_property<V, F>(mut self, name: &'static str, injection: Option<Injection>, set: F) -> Self
    where
        V: Injectable,
        F: Fn(&T, V) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.class.properties.retain(|p| p.name != name);
        self.class.properties.push(PropertyDescriptor {
            name,
            kind: V::kind(),
            required: V::required(),
            injection,
            setter: Arc::new(move |object, value| {
                let target = (**object)
                    .downcast_ref::<T>()
                    .ok_or_else(|| format!("property '{name}' applied to a foreign object"))?;
                set(target, V::from_resolved(value)?)
            }),
        });
        self
    }

    /// Adds a writable property.
    pub fn property<V, F>(self, name: &'static str, set: F) -> Self
    where
        V: Injectable,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        self.push_property(name, None, move |target: &T, value: V| {
            set(target, value);
            Ok(())
        })
    }

    /// Adds a writable property whose setter may reject the value.
    pub fn try_property<V, F>(self, name: &'static str, set: F) -> Self
    where
        V: Injectable,
        F: Fn(&T, V) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.push_property(name, None, set)
    }

    /// Adds a property wired by type without being listed in the blueprint.
    ///
    /// `Option<Arc<I>>` makes the injection optional.
    pub fn autowired<V, F>(self, name: &'static str, set: F) -> Self
    where
        V: Injectable,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        let injection = Injection { required: V::required(), qualifier: None };
        self.push_property(name, Some(injection), move |target: &T, value: V| {
            set(target, value);
            Ok(())
        })
    }

    /// Like [`autowired`](Self::autowired), narrowed to a bean name or qualifier.
    pub fn autowired_qualified<V, F>(self, name: &'static str, qualifier: &'static str, set: F) -> Self
    where
        V: Injectable,
        F: Fn(&T, V) + Send + Sync + 'static,
    {
        let injection = Injection { required: V::required(), qualifier: Some(qualifier) };
        self.push_property(name, Some(injection), move |target: &T, value: V| {
            set(target, value);
            Ok(())
        })
    }

    /// Adds an instance factory method producing an `R`.
    pub fn factory_method<R, F>(mut self, name: &'static str, params: Vec<Param>, build: F) -> Self
    where
        R: Introspectable,
        F: Fn(&T, &mut Args) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.class.factory_methods.push(FactoryMethodDescriptor {
            name,
            params,
            is_static: false,
            produces: Class::of::<R>,
            build: Arc::new(move |target, args| {
                let target = target
                    .and_then(|object| (**object).downcast_ref::<T>())
                    .ok_or_else(|| format!("factory method '{name}' needs an instance of {}", std::any::type_name::<T>()))?;
                build(target, args).map(Instance::new)
            }),
        });
        self
    }

    /// Adds a static factory method producing an `R`.
    pub fn static_factory_method<R, F>(mut self, name: &'static str, params: Vec<Param>, build: F) -> Self
    where
        R: Introspectable,
        F: Fn(&mut Args) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.class.factory_methods.push(FactoryMethodDescriptor {
            name,
            params,
            is_static: true,
            produces: Class::of::<R>,
            build: Arc::new(move |_, args| build(args).map(Instance::new)),
        });
        self
    }

    /// Adds a named no-argument method, usable as a declared init or destroy method.
    pub fn method<F>(mut self, name: &'static str, call: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.class.methods.insert(name, Self::erase(name, call));
        self
    }

    fn erase<F>(name: &'static str, call: F) -> MethodFn
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Arc::new(move |object: &BeanObject| {
            let target = (**object)
                .downcast_ref::<T>()
                .ok_or_else(|| format!("method '{name}' called on a foreign object"))?;
            call(target)
        })
    }

    pub fn bean_name_aware(mut self) -> Self
    where
        T: BeanNameAware,
    {
        self.class.callbacks.name_aware = Some(Arc::new(|object: &BeanObject, name: &str| {
            if let Some(target) = (**object).downcast_ref::<T>() {
                target.set_bean_name(name);
            }
        }));
        self
    }

    pub fn type_registry_aware(mut self) -> Self
    where
        T: TypeRegistryAware,
    {
        self.class.callbacks.registry_aware = Some(Arc::new(|object: &BeanObject, registry: Arc<TypeRegistry>| {
            if let Some(target) = (**object).downcast_ref::<T>() {
                target.set_type_registry(registry);
            }
        }));
        self
    }

    pub fn container_aware(mut self) -> Self
    where
        T: ContainerAware,
    {
        self.class.callbacks.container_aware = Some(Arc::new(|object: &BeanObject, container: ContainerRef| {
            if let Some(target) = (**object).downcast_ref::<T>() {
                target.set_container(container);
            }
        }));
        self
    }

    pub fn initializing(mut self) -> Self
    where
        T: InitializingBean,
    {
        self.class.callbacks.initializing = Some(Self::erase("after_properties_set", |target: &T| {
            target.after_properties_set()
        }));
        self
    }

    pub fn disposable(mut self) -> Self
    where
        T: DisposableBean,
    {
        self.class.callbacks.disposable = Some(Self::erase("destroy", |target: &T| target.destroy()));
        self
    }
}

/// Every class known to a definition store, by type name.
///
/// Handed to [`TypeRegistryAware`] beans.
#[derive(Default)]
pub struct TypeRegistry {
    classes: BTreeMap<&'static str, Arc<Class>>,
}

impl TypeRegistry {
    pub(crate) fn from_classes(classes: impl IntoIterator<Item = Arc<Class>>) -> Self {
        Self {
            classes: classes.into_iter().map(|class| (class.name(), class)).collect(),
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<Class>> {
        self.classes.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.classes.contains_key(type_name)
    }

    /// Classes assignable to `key`.
    pub fn assignable_to(&self, key: TypeKey) -> impl Iterator<Item = &Arc<Class>> + '_ {
        self.classes.values().filter(move |class| class.is_assignable_to(key))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.classes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.classes.keys()).finish()
    }
}
