//! Object blueprints.
//!
//! A [`BeanDefinition`] is the declarative recipe for one bean: which class to
//! build and how, what to inject, which scope it lives in and which callbacks
//! to run. Definitions are registered under a name, may inherit from a parent
//! definition, and are merged into an immutable [`MergedDefinition`] before
//! use.

mod merged;
mod store;
mod value;

pub use merged::MergedDefinition;
pub(crate) use store::DefinitionStore;
pub use value::{ArgValue, PropertyValues, Value};

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::BoxError;
use crate::instance::Instance;
use crate::introspect::{Class, Introspectable};
use crate::scope::Scope;

/// Closure producing a bean without going through a constructor.
pub type Supplier = Arc<dyn Fn() -> Result<Instance, BoxError> + Send + Sync>;

/// How unset properties and constructor parameters get wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum AutowireMode {
    /// Only explicitly declared values and injection markers.
    #[default]
    None,
    /// Bean-typed properties are wired from the bean of the same name.
    ByName,
    /// Bean-typed and collection properties are wired by type.
    ByType,
    /// The greediest satisfiable constructor is chosen and its parameters
    /// wired by type.
    Constructor,
}

/// Declarative recipe for one bean.
///
/// Built with consuming setters and handed to
/// [`Mutable::register_definition`](crate::Mutable::register_definition).
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanDefinition, ClassBuilder, Introspectable, Scope, Slot, Value};
///
/// #[derive(Default)]
/// struct Mailer {
///     host: Slot<String>,
/// }
///
/// impl Introspectable for Mailer {
///     fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
///         class
///             .default_constructor()
///             .property("host", |m: &Mailer, host: String| m.host.set(host))
///     }
/// }
///
/// let template = BeanDefinition::of::<Mailer>()
///     .property("host", "smtp.local")
///     .abstract_();
/// let child = BeanDefinition::child("mailer-template").scope(Scope::Prototype);
///
/// assert!(template.is_abstract());
/// assert_eq!(child.parent_name(), Some("mailer-template"));
/// assert!(matches!(template.properties().get("host"), Some(Value::Str(_))));
/// ```
#[derive(Clone, Default)]
pub struct BeanDefinition {
    pub(crate) class: Option<Arc<Class>>,
    pub(crate) parent: Option<String>,
    pub(crate) scope: Option<Scope>,
    pub(crate) args: Vec<ArgValue>,
    pub(crate) properties: PropertyValues,
    pub(crate) init_method: Option<String>,
    pub(crate) destroy_method: Option<String>,
    pub(crate) autowire: Option<AutowireMode>,
    pub(crate) primary: bool,
    pub(crate) qualifiers: Vec<String>,
    pub(crate) priority: Option<i32>,
    pub(crate) lazy_init: Option<bool>,
    pub(crate) is_abstract: bool,
    pub(crate) depends_on: Vec<String>,
    pub(crate) supplier: Option<Supplier>,
    pub(crate) factory_bean: Option<String>,
    pub(crate) factory_method: Option<String>,
}

impl BeanDefinition {
    /// Blueprint constructing a `T`.
    pub fn of<T: Introspectable>() -> Self {
        Self::with_class(Class::of::<T>())
    }

    pub fn with_class(class: Arc<Class>) -> Self {
        Self { class: Some(class), ..Self::default() }
    }

    /// Blueprint inheriting from the definition named `parent`.
    pub fn child(parent: impl Into<String>) -> Self {
        Self { parent: Some(parent.into()), ..Self::default() }
    }

    /// Blueprint whose instance comes from `supplier`.
    pub fn supplied<T, F>(supplier: F) -> Self
    where
        T: Introspectable,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            class: Some(Class::of::<T>()),
            supplier: Some(Arc::new(move || supplier().map(Instance::new))),
            ..Self::default()
        }
    }

    /// Blueprint produced by calling `method` on the bean named `factory_bean`.
    pub fn factory(factory_bean: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            factory_bean: Some(factory_bean.into()),
            factory_method: Some(method.into()),
            ..Self::default()
        }
    }

    /// Blueprint produced by the static factory `method` declared on `T`.
    pub fn static_factory<T: Introspectable>(method: impl Into<String>) -> Self {
        Self {
            class: Some(Class::of::<T>()),
            factory_method: Some(method.into()),
            ..Self::default()
        }
    }

    /// Overrides the class, typically on a child definition.
    pub fn class_of<T: Introspectable>(mut self) -> Self {
        self.class = Some(Class::of::<T>());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.set(name, value);
        self
    }

    /// Property wired to the bean named `bean`.
    pub fn property_ref(self, name: impl Into<String>, bean: impl Into<String>) -> Self {
        self.property(name, Value::Ref(bean.into()))
    }

    /// Positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(ArgValue { index: None, name: None, value: value.into() });
        self
    }

    /// Positional argument wired to the bean named `bean`.
    pub fn arg_ref(self, bean: impl Into<String>) -> Self {
        self.arg(Value::Ref(bean.into()))
    }

    pub fn indexed_arg(mut self, index: usize, value: impl Into<Value>) -> Self {
        let arg = ArgValue { index: Some(index), name: None, value: value.into() };
        self.args.retain(|existing| !existing.same_slot(&arg));
        self.args.push(arg);
        self
    }

    pub fn named_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let arg = ArgValue { index: None, name: Some(name.into()), value: value.into() };
        self.args.retain(|existing| !existing.same_slot(&arg));
        self.args.push(arg);
        self
    }

    pub fn init_method(mut self, name: impl Into<String>) -> Self {
        self.init_method = Some(name.into());
        self
    }

    pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy_method = Some(name.into());
        self
    }

    pub fn autowire(mut self, mode: AutowireMode) -> Self {
        self.autowire = Some(mode);
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        let qualifier = qualifier.into();
        if !self.qualifiers.contains(&qualifier) {
            self.qualifiers.push(qualifier);
        }
        self
    }

    /// Position in injected collections; lower values come first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy_init = Some(true);
        self
    }

    pub fn eager(mut self) -> Self {
        self.lazy_init = Some(false);
        self
    }

    /// Marks the blueprint as a template for children only.
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn class(&self) -> Option<&Arc<Class>> {
        self.class.as_ref()
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn declared_scope(&self) -> Option<Scope> {
        self.scope
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    pub fn properties(&self) -> &PropertyValues {
        &self.properties
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("BeanDefinition");
        s.field("class", &self.class.as_ref().map(|c| c.name()));
        if let Some(parent) = &self.parent {
            s.field("parent", parent);
        }
        s.field("scope", &self.scope)
            .field("args", &self.args)
            .field("properties", &self.properties);
        if let Some(method) = &self.factory_method {
            s.field("factory_bean", &self.factory_bean).field("factory_method", method);
        }
        if self.supplier.is_some() {
            s.field("supplier", &"<fn>");
        }
        s.field("primary", &self.primary).field("abstract", &self.is_abstract).finish()
    }
}
