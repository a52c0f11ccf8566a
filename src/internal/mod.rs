//! Internal implementation details.

pub(crate) mod creation;
pub(crate) mod dispose_bag;

pub(crate) use creation::{is_prototype_in_creation, PrototypeGuard};
pub(crate) use dispose_bag::{DisposeBag, DisposeFn};

/// Map used on lookup hot paths.
#[cfg(feature = "ahash")]
pub(crate) type FastMap<K, V> = ahash::AHashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub(crate) type FastMap<K, V> = std::collections::HashMap<K, V>;
