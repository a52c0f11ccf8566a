//! Name-indexed blueprint storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::definition::{BeanDefinition, MergedDefinition};
use crate::error::{ContainerError, ContainerResult};
use crate::introspect::{Class, TypeRegistry};
use crate::key::TypeKey;

const MAX_ALIAS_HOPS: usize = 64;

#[derive(Default)]
struct StoreState {
    definitions: HashMap<String, Arc<BeanDefinition>>,
    order: Vec<String>,
    aliases: HashMap<String, String>,
}

/// Registered blueprints, their merged forms and by-type candidate lists.
///
/// Registration is allowed until the store is frozen, which happens when the
/// first singleton starts construction. After that the candidate lists are
/// cached per type key.
pub(crate) struct DefinitionStore {
    state: RwLock<StoreState>,
    merged: RwLock<HashMap<String, Arc<MergedDefinition>>>,
    candidates: RwLock<HashMap<TypeKey, Arc<[String]>>>,
    frozen: AtomicBool,
    allow_overriding: bool,
    parent: Option<Arc<DefinitionStore>>,
    registry: OnceCell<Arc<TypeRegistry>>,
}

/// Lookup of the class of a manually registered singleton, for factory beans
/// that have no blueprint.
pub(crate) type SingletonClass<'a> = &'a dyn Fn(&str) -> Option<Arc<Class>>;

impl DefinitionStore {
    pub(crate) fn new(allow_overriding: bool, parent: Option<Arc<DefinitionStore>>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            merged: RwLock::new(HashMap::new()),
            candidates: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
            allow_overriding,
            parent,
            registry: OnceCell::new(),
        }
    }

    pub(crate) fn register(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        if self.is_frozen() {
            return Err(ContainerError::DefinitionFrozen(name.to_owned()));
        }
        if name.is_empty() {
            return Err(ContainerError::InvalidDefinition {
                bean: name.to_owned(),
                reason: "bean name must not be empty".into(),
            });
        }
        if definition.class.is_none()
            && definition.parent.is_none()
            && definition.supplier.is_none()
            && definition.factory_method.is_none()
        {
            return Err(ContainerError::InvalidDefinition {
                bean: name.to_owned(),
                reason: "definition declares no class, parent, supplier or factory method".into(),
            });
        }
        if definition.factory_bean.is_some() && definition.factory_method.is_none() {
            return Err(ContainerError::InvalidDefinition {
                bean: name.to_owned(),
                reason: "factory bean declared without a factory method".into(),
            });
        }

        let mut state = self.state.write();
        // freeze() flips the flag under this lock
        if self.is_frozen() {
            return Err(ContainerError::DefinitionFrozen(name.to_owned()));
        }
        if state.definitions.contains_key(name) {
            if !self.allow_overriding {
                return Err(ContainerError::InvalidDefinition {
                    bean: name.to_owned(),
                    reason: "a definition with this name is already registered and overriding is disabled".into(),
                });
            }
            debug!(bean = name, "overriding bean definition");
        } else {
            if state.aliases.contains_key(name) {
                if !self.allow_overriding {
                    return Err(ContainerError::InvalidDefinition {
                        bean: name.to_owned(),
                        reason: "name is already in use as an alias".into(),
                    });
                }
                state.aliases.remove(name);
            }
            state.order.push(name.to_owned());
        }
        state.definitions.insert(name.to_owned(), Arc::new(definition));
        drop(state);

        self.merged.write().clear();
        self.candidates.write().clear();
        trace!(bean = name, "registered bean definition");
        Ok(())
    }

    pub(crate) fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        let mut state = self.state.write();
        if alias == name {
            state.aliases.remove(alias);
            return Ok(());
        }
        if state.definitions.contains_key(alias) {
            return Err(ContainerError::InvalidDefinition {
                bean: alias.to_owned(),
                reason: format!("cannot alias '{name}' as '{alias}': a definition with that name exists"),
            });
        }
        if let Some(existing) = state.aliases.get(alias) {
            if existing == name {
                return Ok(());
            }
            if !self.allow_overriding {
                return Err(ContainerError::InvalidDefinition {
                    bean: alias.to_owned(),
                    reason: format!("alias already points to '{existing}'"),
                });
            }
        }
        if alias_chain_contains(&state.aliases, name, alias) {
            return Err(ContainerError::InvalidDefinition {
                bean: alias.to_owned(),
                reason: format!("alias '{alias}' for '{name}' would be circular"),
            });
        }
        state.aliases.insert(alias.to_owned(), name.to_owned());
        debug!(bean = name, alias, "registered alias");
        Ok(())
    }

    /// Follows aliases to the registered name.
    pub(crate) fn canonical_name(&self, name: &str) -> String {
        resolve_alias(&self.state.read().aliases, name)
    }

    pub(crate) fn aliases_of(&self, name: &str) -> Vec<String> {
        let state = self.state.read();
        let mut aliases: Vec<String> = state
            .aliases
            .keys()
            .filter(|alias| resolve_alias(&state.aliases, alias) == name)
            .cloned()
            .collect();
        aliases.sort();
        aliases
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        let state = self.state.read();
        state.definitions.contains_key(&resolve_alias(&state.aliases, name))
    }

    pub(crate) fn definition(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        let state = self.state.read();
        state.definitions.get(&resolve_alias(&state.aliases, name)).cloned()
    }

    /// Names in registration order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.state.read().order.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.read().order.len()
    }

    pub(crate) fn freeze(&self) {
        let state = self.state.write();
        if self.frozen.swap(true, Ordering::AcqRel) {
            return;
        }
        let definitions = state.order.len();
        drop(state);
        self.candidates.write().clear();
        debug!(definitions, "definition store frozen");
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Merged definition for `name`, walking the parent chain.
    ///
    /// Names with no local definition are looked up in the parent store.
    pub(crate) fn merged(&self, name: &str) -> ContainerResult<Arc<MergedDefinition>> {
        let name = self.canonical_name(name);
        if let Some(merged) = self.merged.read().get(&name) {
            return Ok(merged.clone());
        }

        let Some(own) = self.definition(&name) else {
            return match &self.parent {
                Some(parent) => parent.merged(&name),
                None => Err(ContainerError::NoSuchDefinition(name)),
            };
        };

        let chain = self.parent_chain(&name, own)?;
        let merged = Arc::new(MergedDefinition::from_chain(&name, &chain));
        Ok(self.merged.write().entry(name).or_insert(merged).clone())
    }

    /// Parent chain of `own`, root first.
    fn parent_chain(&self, name: &str, own: Arc<BeanDefinition>) -> ContainerResult<Vec<Arc<BeanDefinition>>> {
        let mut chain = vec![own];
        let mut visited = vec![name.to_owned()];
        while let Some(parent_name) = chain.last().and_then(|d| d.parent.clone()) {
            let parent_name = self.canonical_name(&parent_name);
            if visited.contains(&parent_name) {
                visited.push(parent_name);
                return Err(ContainerError::InvalidDefinition {
                    bean: name.to_owned(),
                    reason: format!("circular parent chain: {}", visited.join(" -> ")),
                });
            }
            let local = if parent_name == name { None } else { self.definition(&parent_name) };
            match local.or_else(|| self.parent.as_ref().and_then(|p| p.definition(&parent_name))) {
                Some(parent) => {
                    visited.push(parent_name);
                    chain.push(parent);
                }
                None => {
                    return Err(ContainerError::InvalidDefinition {
                        bean: name.to_owned(),
                        reason: format!("parent definition '{parent_name}' not found"),
                    })
                }
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// Merged form of a blueprint not registered under any name, such as an
    /// inner bean.
    pub(crate) fn merge_anonymous(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<MergedDefinition> {
        if definition.parent.is_none() {
            return Ok(MergedDefinition::standalone(name, definition));
        }
        let chain = self.parent_chain(name, Arc::new(definition.clone()))?;
        Ok(MergedDefinition::from_chain(name, &chain))
    }

    /// Class of the bean the definition produces.
    ///
    /// For factory-method blueprints this is the product of the first overload
    /// with the declared name.
    pub(crate) fn target_class(&self, merged: &MergedDefinition, singleton_class: SingletonClass<'_>) -> Option<Arc<Class>> {
        self.predict(merged, singleton_class, &mut Vec::new())
    }

    fn predict(
        &self,
        merged: &MergedDefinition,
        singleton_class: SingletonClass<'_>,
        visiting: &mut Vec<String>,
    ) -> Option<Arc<Class>> {
        if let Some(target) = merged.target.get() {
            return target.clone();
        }
        if visiting.iter().any(|n| n == merged.name()) {
            return None;
        }
        visiting.push(merged.name().to_owned());

        let predicted = match merged.factory_method() {
            None => merged.class().cloned(),
            Some(method) => {
                let declaring = match merged.factory_bean() {
                    None => merged.class().cloned(),
                    Some(bean) => match self.merged(bean) {
                        Ok(factory) => self.predict(&factory, singleton_class, visiting),
                        Err(_) => singleton_class(&self.canonical_name(bean)),
                    },
                };
                declaring.and_then(|class| class.factory_methods(method).next().map(|m| m.produces()))
            }
        };
        visiting.pop();
        merged.target.get_or_init(|| predicted).clone()
    }

    /// Non-abstract definitions whose product is assignable to `key`, in
    /// registration order.
    pub(crate) fn candidate_names(&self, key: TypeKey, singleton_class: SingletonClass<'_>) -> Arc<[String]> {
        let frozen = self.is_frozen();
        if frozen {
            if let Some(cached) = self.candidates.read().get(&key) {
                return cached.clone();
            }
        }

        let mut names = Vec::new();
        for name in self.names() {
            let merged = match self.merged(&name) {
                Ok(merged) => merged,
                Err(error) => {
                    trace!(bean = %name, %error, "skipping unmergeable definition in type match");
                    continue;
                }
            };
            if merged.is_abstract() {
                continue;
            }
            if self
                .target_class(&merged, singleton_class)
                .map_or(false, |class| class.is_assignable_to(key))
            {
                names.push(name);
            }
        }

        let names: Arc<[String]> = names.into();
        if frozen {
            self.candidates.write().insert(key, names.clone());
        }
        names
    }

    /// Every class the store can produce or declares.
    pub(crate) fn type_registry(&self, singleton_class: SingletonClass<'_>) -> Arc<TypeRegistry> {
        if let Some(registry) = self.registry.get() {
            return registry.clone();
        }
        let mut classes = Vec::new();
        for name in self.names() {
            if let Ok(merged) = self.merged(&name) {
                classes.extend(merged.class().cloned());
                classes.extend(self.target_class(&merged, singleton_class));
            }
        }
        let registry = Arc::new(TypeRegistry::from_classes(classes));
        if self.is_frozen() {
            return self.registry.get_or_init(|| registry).clone();
        }
        registry
    }
}

/// Whether following aliases from `start` passes through `target`.
fn alias_chain_contains(aliases: &HashMap<String, String>, start: &str, target: &str) -> bool {
    let mut current = start;
    for _ in 0..MAX_ALIAS_HOPS {
        if current == target {
            return true;
        }
        match aliases.get(current) {
            Some(next) => current = next,
            None => return false,
        }
    }
    false
}

fn resolve_alias(aliases: &HashMap<String, String>, name: &str) -> String {
    let mut current = name;
    for _ in 0..MAX_ALIAS_HOPS {
        match aliases.get(current) {
            Some(target) => current = target,
            None => break,
        }
    }
    current.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{ClassBuilder, Introspectable, Param};

    trait Sink: Send + Sync {}

    #[derive(Default)]
    struct FileSink;
    impl Sink for FileSink {}

    #[derive(Default)]
    struct SinkFactory;

    impl Introspectable for FileSink {
        fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
            class
                .implements::<dyn Sink>(|s| s as Arc<dyn Sink>)
                .default_constructor()
        }
    }

    impl Introspectable for SinkFactory {
        fn describe(class: ClassBuilder<Self>) -> ClassBuilder<Self> {
            class
                .default_constructor()
                .factory_method("create", Vec::<Param>::new(), |_: &SinkFactory, _| Ok(FileSink))
        }
    }

    fn no_singletons(_: &str) -> Option<Arc<Class>> {
        None
    }

    #[test]
    fn registration_is_rejected_after_freeze() {
        let store = DefinitionStore::new(true, None);
        store.register("a", BeanDefinition::of::<FileSink>()).unwrap();
        store.freeze();
        assert!(matches!(
            store.register("b", BeanDefinition::of::<FileSink>()),
            Err(ContainerError::DefinitionFrozen(name)) if name == "b"
        ));
    }

    #[test]
    fn nothing_lands_after_a_concurrent_freeze() {
        let store = DefinitionStore::new(true, None);
        let (accepted, frozen_len) = crossbeam_utils::thread::scope(|s| {
            let writers: Vec<_> = (0..4)
                .map(|t| {
                    let store = &store;
                    s.spawn(move |_| {
                        (0..200)
                            .filter(|i| store.register(&format!("sink-{t}-{i}"), BeanDefinition::of::<FileSink>()).is_ok())
                            .count()
                    })
                })
                .collect();
            store.freeze();
            let frozen_len = store.len();
            let accepted: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();
            (accepted, frozen_len)
        })
        .unwrap();

        assert_eq!(store.len(), frozen_len);
        assert_eq!(store.len(), accepted);
    }

    #[test]
    fn overriding_can_be_disabled() {
        let store = DefinitionStore::new(false, None);
        store.register("a", BeanDefinition::of::<FileSink>()).unwrap();
        assert!(matches!(
            store.register("a", BeanDefinition::of::<SinkFactory>()),
            Err(ContainerError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn aliases_resolve_transitively_and_reject_cycles() {
        let store = DefinitionStore::new(true, None);
        store.register("primary-sink", BeanDefinition::of::<FileSink>()).unwrap();
        store.register_alias("primary-sink", "sink").unwrap();
        store.register_alias("sink", "out").unwrap();
        assert_eq!(store.canonical_name("out"), "primary-sink");
        assert!(store.contains("out"));
        assert_eq!(store.aliases_of("primary-sink"), ["out", "sink"]);
        assert!(store.register_alias("out", "primary-sink").is_err());
    }

    #[test]
    fn parent_cycles_are_invalid() {
        let store = DefinitionStore::new(true, None);
        store.register("a", BeanDefinition::child("b")).unwrap();
        store.register("b", BeanDefinition::child("a")).unwrap();
        assert!(matches!(store.merged("a"), Err(ContainerError::InvalidDefinition { .. })));
        assert!(matches!(store.merged("missing"), Err(ContainerError::NoSuchDefinition(_))));
    }

    #[test]
    fn candidates_follow_factory_products_and_skip_abstract() {
        let store = DefinitionStore::new(true, None);
        store.register("factory", BeanDefinition::of::<SinkFactory>()).unwrap();
        store.register("made", BeanDefinition::factory("factory", "create")).unwrap();
        store.register("template", BeanDefinition::of::<FileSink>().abstract_()).unwrap();
        store.register("direct", BeanDefinition::of::<FileSink>()).unwrap();

        let names = store.candidate_names(TypeKey::of::<dyn Sink>(), &no_singletons);
        assert_eq!(&names[..], ["made", "direct"]);

        store.freeze();
        let cached = store.candidate_names(TypeKey::of::<dyn Sink>(), &no_singletons);
        let again = store.candidate_names(TypeKey::of::<dyn Sink>(), &no_singletons);
        assert!(Arc::ptr_eq(&cached, &again));
        assert_eq!(store.type_registry(&no_singletons).len(), 2);
    }

    #[test]
    fn parent_store_supplies_missing_definitions() {
        let parent = Arc::new(DefinitionStore::new(true, None));
        parent.register("base", BeanDefinition::of::<FileSink>().qualifier("disk")).unwrap();
        let child = DefinitionStore::new(true, Some(parent));
        child.register("derived", BeanDefinition::child("base").primary()).unwrap();

        let merged = child.merged("derived").unwrap();
        assert!(merged.is_primary());
        assert!(merged.has_qualifier("disk"));
        assert!(child.merged("base").is_ok());
    }
}
