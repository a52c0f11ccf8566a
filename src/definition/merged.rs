//! Parent/child merging of blueprints.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::definition::{ArgValue, AutowireMode, BeanDefinition, PropertyValues, Supplier};
use crate::error::ContainerResult;
use crate::introspect::Class;
use crate::scope::Scope;

/// A blueprint with its parent chain folded in.
///
/// Merged definitions are immutable; the store caches one per bean name and
/// hands out `Arc`s.
pub struct MergedDefinition {
    name: String,
    class: Option<Arc<Class>>,
    scope: Scope,
    args: Vec<ArgValue>,
    properties: PropertyValues,
    init_method: Option<String>,
    destroy_method: Option<String>,
    autowire: AutowireMode,
    primary: bool,
    qualifiers: Vec<String>,
    priority: Option<i32>,
    lazy_init: bool,
    is_abstract: bool,
    depends_on: Vec<String>,
    supplier: Option<Supplier>,
    factory_bean: Option<String>,
    factory_method: Option<String>,
    pub(crate) target: OnceCell<Option<Arc<Class>>>,
    pub(crate) processed: OnceCell<()>,
}

impl MergedDefinition {
    /// Folds `chain` (root first, the bean's own definition last).
    pub(crate) fn from_chain(name: &str, chain: &[Arc<BeanDefinition>]) -> Self {
        let mut merged = BeanDefinition::default();
        for definition in chain {
            overlay(&mut merged, definition);
        }
        let own = chain.last();
        Self {
            name: name.to_owned(),
            class: merged.class,
            scope: merged.scope.unwrap_or_default(),
            args: merged.args,
            properties: merged.properties,
            init_method: merged.init_method,
            destroy_method: merged.destroy_method,
            autowire: merged.autowire.unwrap_or_default(),
            primary: own.map_or(false, |d| d.primary),
            qualifiers: merged.qualifiers,
            priority: merged.priority,
            lazy_init: merged.lazy_init.unwrap_or(false),
            is_abstract: own.map_or(false, |d| d.is_abstract),
            depends_on: merged.depends_on,
            supplier: merged.supplier,
            factory_bean: merged.factory_bean,
            factory_method: merged.factory_method,
            target: OnceCell::new(),
            processed: OnceCell::new(),
        }
    }

    /// Standalone merge for an anonymous inner blueprint with no parent.
    pub(crate) fn standalone(name: &str, definition: &BeanDefinition) -> Self {
        Self::from_chain(name, &[Arc::new(definition.clone())])
    }

    pub(crate) fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared class. For static factory blueprints this is the class
    /// declaring the factory method, not the product.
    pub fn class(&self) -> Option<&Arc<Class>> {
        self.class.as_ref()
    }

    /// Class of the produced bean, once the store has predicted it.
    pub fn target_class(&self) -> Option<&Arc<Class>> {
        self.target.get().and_then(Option::as_ref)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    pub fn is_prototype(&self) -> bool {
        self.scope.is_prototype()
    }

    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }

    pub fn properties(&self) -> &PropertyValues {
        &self.properties
    }

    pub fn init_method(&self) -> Option<&str> {
        self.init_method.as_deref()
    }

    pub fn destroy_method(&self) -> Option<&str> {
        self.destroy_method.as_deref()
    }

    pub fn autowire(&self) -> AutowireMode {
        self.autowire
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.qualifiers.iter().any(|q| q == qualifier)
    }

    pub fn priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn supplier(&self) -> Option<&Supplier> {
        self.supplier.as_ref()
    }

    pub fn factory_bean(&self) -> Option<&str> {
        self.factory_bean.as_deref()
    }

    pub fn factory_method(&self) -> Option<&str> {
        self.factory_method.as_deref()
    }

    /// Runs `process` once for the lifetime of this merged definition.
    pub(crate) fn process_once(&self, process: impl FnOnce() -> ContainerResult<()>) -> ContainerResult<()> {
        self.processed.get_or_try_init(process).map(|_| ())
    }
}

fn overlay(merged: &mut BeanDefinition, child: &BeanDefinition) {
    if child.class.is_some() {
        merged.class = child.class.clone();
    }
    if child.scope.is_some() {
        merged.scope = child.scope;
    }
    for arg in &child.args {
        match merged.args.iter_mut().find(|existing| existing.same_slot(arg)) {
            Some(existing) => *existing = arg.clone(),
            None => merged.args.push(arg.clone()),
        }
    }
    merged.properties.overlay(&child.properties);
    if child.init_method.is_some() {
        merged.init_method = child.init_method.clone();
    }
    if child.destroy_method.is_some() {
        merged.destroy_method = child.destroy_method.clone();
    }
    if child.autowire.is_some() {
        merged.autowire = child.autowire;
    }
    for qualifier in &child.qualifiers {
        if !merged.qualifiers.contains(qualifier) {
            merged.qualifiers.push(qualifier.clone());
        }
    }
    if child.priority.is_some() {
        merged.priority = child.priority;
    }
    if child.lazy_init.is_some() {
        merged.lazy_init = child.lazy_init;
    }
    if !child.depends_on.is_empty() {
        merged.depends_on = child.depends_on.clone();
    }
    if child.supplier.is_some() {
        merged.supplier = child.supplier.clone();
    }
    if child.factory_method.is_some() {
        merged.factory_bean = child.factory_bean.clone();
        merged.factory_method = child.factory_method.clone();
    }
}

impl fmt::Debug for MergedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedDefinition")
            .field("name", &self.name)
            .field("class", &self.class.as_ref().map(|c| c.name()))
            .field("scope", &self.scope)
            .field("autowire", &self.autowire)
            .field("primary", &self.primary)
            .field("lazy_init", &self.lazy_init)
            .field("abstract", &self.is_abstract)
            .finish()
    }
}
