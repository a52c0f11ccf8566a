//! Declarative values for constructor arguments and properties.

use std::fmt;

use crate::definition::BeanDefinition;
use crate::introspect::Resolved;

/// A value as written in a blueprint, before resolution.
///
/// Literals are converted to the target parameter type when injected;
/// [`Value::Ref`] names another bean; [`Value::Inner`] carries an anonymous
/// blueprint built afresh for each resolution.
#[derive(Clone)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Reference to another bean by name.
    Ref(String),
    /// Anonymous nested blueprint.
    Inner(Box<BeanDefinition>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
    /// Already resolved, used by processors that inject on their own.
    Resolved(Resolved),
}

impl Value {
    /// Reference to the bean named `name`.
    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    pub fn inner(definition: BeanDefinition) -> Self {
        Value::Inner(Box::new(definition))
    }

    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<K: Into<String>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Whether resolving this value touches other beans.
    pub fn references_beans(&self) -> bool {
        match self {
            Value::Ref(_) | Value::Inner(_) => true,
            Value::List(items) => items.iter().any(Value::references_beans),
            Value::Map(entries) => entries.iter().any(|(_, v)| v.references_beans()),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Ref(name) => write!(f, "ref({name})"),
            Value::Inner(definition) => write!(f, "inner({definition:?})"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(entries) => f.debug_map().entries(entries.iter().map(|(k, v)| (k, v))).finish(),
            Value::Resolved(resolved) => write!(f, "resolved({resolved:?})"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<BeanDefinition> for Value {
    fn from(definition: BeanDefinition) -> Self {
        Value::inner(definition)
    }
}

impl From<Resolved> for Value {
    fn from(resolved: Resolved) -> Self {
        Value::Resolved(resolved)
    }
}

/// A constructor or factory-method argument, matched by index, by parameter
/// name, or positionally when neither is given.
#[derive(Clone, Debug)]
pub struct ArgValue {
    pub(crate) index: Option<usize>,
    pub(crate) name: Option<String>,
    pub(crate) value: Value,
}

impl ArgValue {
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn same_slot(&self, other: &ArgValue) -> bool {
        match (self.index, other.index, &self.name, &other.name) {
            (Some(a), Some(b), _, _) => a == b,
            (_, _, Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Property assignments in declaration order, unique by name.
#[derive(Clone, Debug, Default)]
pub struct PropertyValues {
    entries: Vec<(String, Value)>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing an earlier assignment in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies `other` on top of `self`.
    pub(crate) fn overlay(&mut self, other: &PropertyValues) {
        for (name, value) in &other.entries {
            self.set(name.clone(), value.clone());
        }
    }
}

impl IntoIterator for PropertyValues {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
