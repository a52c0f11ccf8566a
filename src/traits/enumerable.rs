//! Inspection of registered beans.

use crate::container::Container;
use crate::descriptors::BeanDescriptor;
use crate::key::TypeKey;
use crate::scope::Scope;

/// Read-only view of what a container knows, without creating beans.
pub trait Enumerable {
    /// Blueprint names in registration order.
    fn definition_names(&self) -> Vec<String>;

    fn definition_count(&self) -> usize;

    fn contains_definition(&self, name: &str) -> bool;

    /// Names of beans assignable to `key`: blueprints in registration order,
    /// then manual singletons, then beans only a parent container knows.
    fn names_for_type(&self, key: TypeKey) -> Vec<String>;

    /// Aliases pointing at `name`, sorted.
    fn aliases(&self, name: &str) -> Vec<String>;

    /// Names of the beans that were injected with `name`.
    fn dependents_of(&self, name: &str) -> Vec<String>;

    /// Names of the beans `name` was injected with.
    fn dependencies_of(&self, name: &str) -> Vec<String>;

    /// Descriptors of every blueprint and manual singleton.
    fn describe(&self) -> Vec<BeanDescriptor>;
}

impl Enumerable for Container {
    fn definition_names(&self) -> Vec<String> {
        self.inner.definitions.names()
    }

    fn definition_count(&self) -> usize {
        self.inner.definitions.len()
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.inner.definitions.contains(name)
    }

    fn names_for_type(&self, key: TypeKey) -> Vec<String> {
        self.candidate_names(key)
    }

    fn aliases(&self, name: &str) -> Vec<String> {
        let canonical = self.inner.definitions.canonical_name(name);
        self.inner.definitions.aliases_of(&canonical)
    }

    fn dependents_of(&self, name: &str) -> Vec<String> {
        let canonical = self.inner.definitions.canonical_name(name);
        self.inner.singletons.dependents_of(&canonical)
    }

    fn dependencies_of(&self, name: &str) -> Vec<String> {
        let canonical = self.inner.definitions.canonical_name(name);
        self.inner.singletons.dependencies_of(&canonical)
    }

    fn describe(&self) -> Vec<BeanDescriptor> {
        let definitions = &self.inner.definitions;
        let singletons = &self.inner.singletons;

        let mut descriptors: Vec<BeanDescriptor> = definitions
            .names()
            .into_iter()
            .filter_map(|name| {
                let merged = definitions.merged(&name).ok()?;
                Some(BeanDescriptor {
                    type_name: self.target_class(&merged).map(|class| class.name()),
                    scope: merged.scope(),
                    aliases: definitions.aliases_of(&name),
                    primary: merged.is_primary(),
                    lazy: merged.is_lazy_init(),
                    is_abstract: merged.is_abstract(),
                    manual: false,
                    instantiated: singletons.contains_singleton(&name),
                    disposable: singletons.has_disposable(&name),
                    name,
                })
            })
            .collect();

        for name in singletons.manual_singletons() {
            if definitions.contains(&name) {
                continue;
            }
            descriptors.push(BeanDescriptor {
                type_name: singletons.singleton_class(&name).map(|class| class.name()),
                scope: Scope::Singleton,
                aliases: definitions.aliases_of(&name),
                primary: false,
                lazy: false,
                is_abstract: false,
                manual: true,
                instantiated: true,
                disposable: singletons.has_disposable(&name),
                name,
            });
        }
        descriptors
    }
}
