//! Type keys used for by-type matching.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key identifying a concrete type or an interface view (`dyn Trait`).
///
/// Keys compare by `TypeId`; the name is carried only for diagnostics. A
/// blueprint's class is assignable to a key when the class *is* that type or
/// declares an interface view for it.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::TypeKey;
///
/// trait Greeter: Send + Sync {}
///
/// let concrete = TypeKey::of::<String>();
/// let view = TypeKey::of::<dyn Greeter>();
/// assert_eq!(concrete.name(), "alloc::string::String");
/// assert!(view.name().contains("Greeter"));
/// assert_ne!(concrete, view);
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`, which may be unsized (`dyn Trait`).
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Key every class is assignable to.
    pub fn any() -> Self {
        Self::of::<dyn Any + Send + Sync>()
    }

    /// Returns true for the catch-all key.
    pub fn is_any(&self) -> bool {
        self.id == TypeId::of::<dyn Any + Send + Sync>()
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name (`std::any::type_name`).
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
