//! Resolved values and their conversion into injection targets.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, ConversionError};
use crate::instance::Instance;
use crate::key::TypeKey;

/// A fully resolved value ready to be handed to a constructor, factory method
/// or property setter.
#[derive(Clone)]
pub enum Resolved {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bean(Instance),
    List(Vec<Resolved>),
    /// Keyed values in resolution order.
    Map(Vec<(String, Resolved)>),
}

impl Resolved {
    /// Short description used in conversion errors.
    pub fn describe(&self) -> String {
        match self {
            Resolved::Null => "null".to_owned(),
            Resolved::Str(s) => format!("string {s:?}"),
            Resolved::Int(i) => format!("integer {i}"),
            Resolved::Float(x) => format!("float {x}"),
            Resolved::Bool(b) => format!("bool {b}"),
            Resolved::Bean(instance) => format!("bean of type {}", instance.type_key().name()),
            Resolved::List(items) => format!("list of {} values", items.len()),
            Resolved::Map(entries) => format!("map of {} entries", entries.len()),
        }
    }

    pub fn as_bean(&self) -> Option<&Instance> {
        match self {
            Resolved::Bean(instance) => Some(instance),
            _ => None,
        }
    }

    /// Rough compatibility check used to discard constructor candidates before
    /// invoking user code.
    pub(crate) fn fits(&self, kind: &DependencyKind) -> bool {
        match (kind, self) {
            (_, Resolved::Null) => true,
            (DependencyKind::Bean(key), Resolved::Bean(instance)) => instance.class().is_assignable_to(*key),
            (DependencyKind::List(key), Resolved::List(items)) => items
                .iter()
                .all(|item| matches!(item, Resolved::Bean(i) if i.class().is_assignable_to(*key))),
            (DependencyKind::Map(key), Resolved::Map(entries)) => entries
                .iter()
                .all(|(_, item)| matches!(item, Resolved::Bean(i) if i.class().is_assignable_to(*key))),
            (DependencyKind::Value(_), Resolved::Bean(_)) => false,
            (DependencyKind::Value(_), _) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Bean(instance) => write!(f, "Bean({instance:?})"),
            Resolved::List(items) => f.debug_list().entries(items).finish(),
            Resolved::Map(entries) => f.debug_map().entries(entries.iter().map(|(k, v)| (k, v))).finish(),
            other => f.write_str(&other.describe()),
        }
    }
}

impl From<Instance> for Resolved {
    fn from(instance: Instance) -> Self {
        Resolved::Bean(instance)
    }
}

impl From<&str> for Resolved {
    fn from(value: &str) -> Self {
        Resolved::Str(value.to_owned())
    }
}

impl From<String> for Resolved {
    fn from(value: String) -> Self {
        Resolved::Str(value)
    }
}

impl From<i64> for Resolved {
    fn from(value: i64) -> Self {
        Resolved::Int(value)
    }
}

impl From<bool> for Resolved {
    fn from(value: bool) -> Self {
        Resolved::Bool(value)
    }
}

impl From<f64> for Resolved {
    fn from(value: f64) -> Self {
        Resolved::Float(value)
    }
}

/// What an injection point asks for.
///
/// Bean kinds carry the required [`TypeKey`]; collection kinds ask for *every*
/// bean assignable to the element key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// A literal value, named by its Rust type.
    Value(&'static str),
    /// A single bean assignable to the key.
    Bean(TypeKey),
    /// All beans assignable to the key, as an ordered sequence.
    List(TypeKey),
    /// All beans assignable to the key, keyed by bean name.
    Map(TypeKey),
}

impl DependencyKind {
    /// Element type for bean and collection kinds.
    pub fn element(&self) -> Option<TypeKey> {
        match self {
            DependencyKind::Value(_) => None,
            DependencyKind::Bean(key) | DependencyKind::List(key) | DependencyKind::Map(key) => Some(*key),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, DependencyKind::List(_) | DependencyKind::Map(_))
    }

    /// True for kinds the container can satisfy from its own beans.
    pub fn is_bean(&self) -> bool {
        !matches!(self, DependencyKind::Value(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DependencyKind::Value(name) => name,
            DependencyKind::Bean(key) | DependencyKind::List(key) | DependencyKind::Map(key) => key.name(),
        }
    }
}

/// Conversion from a [`Resolved`] value into a constructor parameter or
/// property type.
///
/// `Arc<I>` covers both concrete beans and interface views (`Arc<dyn Trait>`);
/// the view must have been declared with
/// [`ClassBuilder::implements`](crate::ClassBuilder::implements).
pub trait Injectable: Sized + Send + Sync + 'static {
    /// The dependency this type asks for.
    fn kind() -> DependencyKind;

    /// Whether an absent value is an error.
    fn required() -> bool {
        true
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError>;
}

impl Injectable for String {
    fn kind() -> DependencyKind {
        DependencyKind::Value(std::any::type_name::<String>())
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::Str(s) => Ok(s),
            Resolved::Int(i) => Ok(i.to_string()),
            Resolved::Float(x) => Ok(x.to_string()),
            Resolved::Bool(b) => Ok(b.to_string()),
            other => Err(ConversionError::new("String", other.describe())),
        }
    }
}

impl Injectable for Option<String> {
    fn kind() -> DependencyKind {
        DependencyKind::Value(std::any::type_name::<String>())
    }

    fn required() -> bool {
        false
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::Null => Ok(None),
            other => String::from_resolved(other).map(Some),
        }
    }
}

impl Injectable for bool {
    fn kind() -> DependencyKind {
        DependencyKind::Value("bool")
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::Bool(b) => Ok(b),
            Resolved::Str(s) => s
                .trim()
                .parse::<bool>()
                .map_err(|_| ConversionError::new("bool", format!("string {s:?}"))),
            other => Err(ConversionError::new("bool", other.describe())),
        }
    }
}

macro_rules! impl_integer_injectable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Injectable for $ty {
                fn kind() -> DependencyKind {
                    DependencyKind::Value(stringify!($ty))
                }

                fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
                    match value {
                        Resolved::Int(i) => <$ty>::try_from(i)
                            .map_err(|_| ConversionError::new(stringify!($ty), format!("integer {i}"))),
                        Resolved::Str(s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|_| ConversionError::new(stringify!($ty), format!("string {s:?}"))),
                        other => Err(ConversionError::new(stringify!($ty), other.describe())),
                    }
                }
            }
        )*
    };
}

impl_integer_injectable!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

macro_rules! impl_float_injectable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Injectable for $ty {
                fn kind() -> DependencyKind {
                    DependencyKind::Value(stringify!($ty))
                }

                fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
                    match value {
                        Resolved::Float(x) => Ok(x as $ty),
                        Resolved::Int(i) => Ok(i as $ty),
                        Resolved::Str(s) => s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|_| ConversionError::new(stringify!($ty), format!("string {s:?}"))),
                        other => Err(ConversionError::new(stringify!($ty), other.describe())),
                    }
                }
            }
        )*
    };
}

impl_float_injectable!(f32, f64);

impl Injectable for Vec<String> {
    fn kind() -> DependencyKind {
        DependencyKind::Value(std::any::type_name::<Vec<String>>())
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::List(items) => items.into_iter().map(String::from_resolved).collect(),
            other => Err(ConversionError::new("Vec<String>", other.describe())),
        }
    }
}

impl Injectable for Instance {
    fn kind() -> DependencyKind {
        DependencyKind::Bean(TypeKey::any())
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::Bean(instance) => Ok(instance),
            other => Err(ConversionError::new("Instance", other.describe())),
        }
    }
}

fn bean_view<I: ?Sized + Send + Sync + 'static>(value: Resolved) -> Result<Arc<I>, ConversionError> {
    match value {
        Resolved::Bean(instance) => instance
            .get::<I>()
            .ok_or_else(|| ConversionError::new(std::any::type_name::<I>(), format!("bean of type {}", instance.type_key().name()))),
        other => Err(ConversionError::new(std::any::type_name::<I>(), other.describe())),
    }
}

impl<I: ?Sized + Send + Sync + 'static> Injectable for Arc<I> {
    fn kind() -> DependencyKind {
        DependencyKind::Bean(TypeKey::of::<I>())
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        bean_view::<I>(value)
    }
}

impl<I: ?Sized + Send + Sync + 'static> Injectable for Option<Arc<I>> {
    fn kind() -> DependencyKind {
        DependencyKind::Bean(TypeKey::of::<I>())
    }

    fn required() -> bool {
        false
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::Null => Ok(None),
            other => bean_view::<I>(other).map(Some),
        }
    }
}

impl<I: ?Sized + Send + Sync + 'static> Injectable for Vec<Arc<I>> {
    fn kind() -> DependencyKind {
        DependencyKind::List(TypeKey::of::<I>())
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::List(items) => items.into_iter().map(bean_view::<I>).collect(),
            Resolved::Bean(instance) => Ok(vec![bean_view::<I>(Resolved::Bean(instance))?]),
            other => Err(ConversionError::new(std::any::type_name::<Vec<Arc<I>>>(), other.describe())),
        }
    }
}

impl<I: ?Sized + Send + Sync + 'static> Injectable for BTreeMap<String, Arc<I>> {
    fn kind() -> DependencyKind {
        DependencyKind::Map(TypeKey::of::<I>())
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::Map(entries) => entries
                .into_iter()
                .map(|(name, item)| bean_view::<I>(item).map(|bean| (name, bean)))
                .collect(),
            other => Err(ConversionError::new(std::any::type_name::<Self>(), other.describe())),
        }
    }
}

impl<I: ?Sized + Send + Sync + 'static> Injectable for HashMap<String, Arc<I>> {
    fn kind() -> DependencyKind {
        DependencyKind::Map(TypeKey::of::<I>())
    }

    fn from_resolved(value: Resolved) -> Result<Self, ConversionError> {
        match value {
            Resolved::Map(entries) => entries
                .into_iter()
                .map(|(name, item)| bean_view::<I>(item).map(|bean| (name, bean)))
                .collect(),
            other => Err(ConversionError::new(std::any::type_name::<Self>(), other.describe())),
        }
    }
}

/// Declared parameter of a constructor or factory method.
#[derive(Debug, Clone)]
pub struct Param {
    name: &'static str,
    kind: DependencyKind,
    required: bool,
    qualifier: Option<&'static str>,
}

impl Param {
    /// Parameter named `name` whose type is `V`.
    pub fn of<V: Injectable>(name: &'static str) -> Self {
        Self {
            name,
            kind: V::kind(),
            required: V::required(),
            qualifier: None,
        }
    }

    /// Narrows by-type resolution of this parameter to a bean name or qualifier.
    pub fn qualifier(mut self, qualifier: &'static str) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn qualifier_name(&self) -> Option<&'static str> {
        self.qualifier
    }
}

/// Positional arguments handed to a constructor or factory method.
///
/// Arguments arrive in declaration order of the [`Param`]s; each call to
/// [`next`](Args::next) consumes one.
pub struct Args {
    values: std::vec::IntoIter<Resolved>,
    position: usize,
}

impl Args {
    pub(crate) fn new(values: Vec<Resolved>) -> Self {
        Self { values: values.into_iter(), position: 0 }
    }

    /// Takes the next argument converted to `V`.
    pub fn next<V: Injectable>(&mut self) -> Result<V, BoxError> {
        let position = self.position;
        let value = self
            .values
            .next()
            .ok_or_else(|| format!("missing argument at position {position}"))?;
        self.position += 1;
        Ok(V::from_resolved(value)?)
    }

    /// Number of arguments not yet taken.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}
