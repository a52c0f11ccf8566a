//! Dependency resolution by name and by type.

use std::fmt;

use tracing::trace;

use crate::container::Container;
use crate::definition::{MergedDefinition, Value};
use crate::error::{ContainerError, ContainerResult};
use crate::instance::Instance;
use crate::introspect::{DependencyKind, Injectable, Param, PropertyDescriptor, Resolved};
use crate::key::TypeKey;

/// One injection point: what is required, where, and how strictly.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_beans::{DependencyDescriptor, DependencyKind, TypeKey};
///
/// trait Store: Send + Sync {}
///
/// let descriptor = DependencyDescriptor::of::<Option<Arc<dyn Store>>>("store").qualifier("primary-db");
/// assert!(!descriptor.is_required());
/// assert_eq!(descriptor.kind(), DependencyKind::Bean(TypeKey::of::<dyn Store>()));
/// assert_eq!(descriptor.qualifier_name(), Some("primary-db"));
/// ```
#[derive(Clone)]
pub struct DependencyDescriptor {
    kind: DependencyKind,
    point: String,
    required: bool,
    qualifier: Option<String>,
}

impl DependencyDescriptor {
    pub fn new(kind: DependencyKind, point: impl Into<String>) -> Self {
        Self { kind, point: point.into(), required: true, qualifier: None }
    }

    /// Descriptor for a value of type `V` injected at `point`.
    pub fn of<V: Injectable>(point: impl Into<String>) -> Self {
        Self::new(V::kind(), point).required(V::required())
    }

    pub(crate) fn for_param(param: &Param) -> Self {
        let descriptor = Self::new(param.kind(), param.name()).required(param.is_required());
        match param.qualifier_name() {
            Some(qualifier) => descriptor.qualifier(qualifier),
            None => descriptor,
        }
    }

    pub(crate) fn for_property(property: &PropertyDescriptor) -> Self {
        let injection = property.injection();
        let required = injection.map_or(property.is_required(), |i| i.is_required());
        let descriptor = Self::new(property.kind(), property.name()).required(required);
        match injection.and_then(|i| i.qualifier()) {
            Some(qualifier) => descriptor.qualifier(qualifier),
            None => descriptor,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Name of the parameter or property being injected.
    pub fn point(&self) -> &str {
        &self.point
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn qualifier_name(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl fmt::Debug for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyDescriptor")
            .field("point", &self.point)
            .field("type", &self.kind.type_name())
            .field("required", &self.required)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}

/// A by-type candidate with the metadata used for tie-breaks and ordering.
struct Candidate {
    name: String,
    primary: bool,
    priority: Option<i32>,
    qualifiers: Vec<String>,
}

enum Selection {
    None,
    One(String),
}

impl Container {
    /// Names of every bean assignable to `key`: local blueprints, then
    /// manual singletons, then beans only the parent container knows.
    pub(crate) fn candidate_names(&self, key: TypeKey) -> Vec<String> {
        let inner = &self.inner;
        let singleton_class = |name: &str| inner.singletons.singleton_class(name);
        let mut names: Vec<String> = inner.definitions.candidate_names(key, &singleton_class).to_vec();

        for name in inner.singletons.manual_singletons() {
            if names.contains(&name) || inner.definitions.contains(&name) {
                continue;
            }
            if singleton_class(&name).map_or(false, |class| class.is_assignable_to(key)) {
                names.push(name);
            }
        }

        if let Some(parent) = &inner.parent {
            for name in parent.candidate_names(key) {
                if !names.contains(&name) && !inner.definitions.contains(&name) && !inner.singletons.contains_singleton(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn local_or_parent_merged(&self, name: &str) -> Option<std::sync::Arc<MergedDefinition>> {
        self.inner.definitions.merged(name).ok().or_else(|| {
            self.inner
                .parent
                .as_ref()
                .and_then(|parent| parent.local_or_parent_merged(name))
        })
    }

    fn candidates(&self, key: TypeKey, exclude: Option<&str>) -> Vec<Candidate> {
        self.candidate_names(key)
            .into_iter()
            .filter(|name| Some(name.as_str()) != exclude)
            .map(|name| match self.local_or_parent_merged(&name) {
                Some(merged) => Candidate {
                    primary: merged.is_primary(),
                    priority: merged.priority(),
                    qualifiers: merged.qualifiers().to_vec(),
                    name,
                },
                None => Candidate { name, primary: false, priority: None, qualifiers: Vec::new() },
            })
            .collect()
    }

    fn matches_qualifier(&self, candidate: &Candidate, qualifier: &str) -> bool {
        candidate.name == qualifier
            || candidate.qualifiers.iter().any(|q| q == qualifier)
            || self.inner.definitions.canonical_name(qualifier) == candidate.name
    }

    /// Picks one candidate: the qualifier narrows, then a unique primary wins.
    /// The injection point's name never breaks a tie.
    fn select(&self, key: TypeKey, qualifier: Option<&str>, exclude: Option<&str>) -> ContainerResult<Selection> {
        let mut candidates = self.candidates(key, exclude);
        if let Some(qualifier) = qualifier {
            candidates.retain(|c| self.matches_qualifier(c, qualifier));
        }
        match candidates.len() {
            0 => return Ok(Selection::None),
            1 => return Ok(Selection::One(candidates.remove(0).name)),
            _ => {}
        }

        let primaries: Vec<&Candidate> = candidates.iter().filter(|c| c.primary).collect();
        match primaries.len() {
            1 => return Ok(Selection::One(primaries[0].name.clone())),
            0 => {}
            _ => {
                return Err(ContainerError::AmbiguousDependency {
                    required: key.name(),
                    candidates: primaries.iter().map(|c| c.name.clone()).collect(),
                })
            }
        }

        Err(ContainerError::AmbiguousDependency {
            required: key.name(),
            candidates: candidates.into_iter().map(|c| c.name).collect(),
        })
    }

    fn fetch(&self, name: &str, requester: Option<&str>) -> ContainerResult<Instance> {
        let instance = self.get_object_internal(name, None)?;
        if let Some(requester) = requester {
            self.inner.singletons.register_dependent(name, requester);
        }
        Ok(instance)
    }

    /// Resolves one injection point on behalf of `requester`.
    ///
    /// Collection kinds resolve every candidate and fail as a whole if any
    /// single candidate fails.
    pub(crate) fn resolve_dependency(&self, descriptor: &DependencyDescriptor, requester: Option<&str>) -> ContainerResult<Resolved> {
        let unsatisfied = |reason: String| ContainerError::UnsatisfiedDependency {
            bean: requester.unwrap_or("<caller>").to_owned(),
            injection_point: descriptor.point().to_owned(),
            reason,
        };

        match descriptor.kind() {
            DependencyKind::Value(type_name) => {
                if descriptor.is_required() {
                    Err(unsatisfied(format!("no value given for {type_name}")))
                } else {
                    Ok(Resolved::Null)
                }
            }
            DependencyKind::Bean(key) => {
                match self.select(key, descriptor.qualifier_name(), requester)? {
                    Selection::One(name) => {
                        trace!(bean = requester, dependency = %name, point = descriptor.point(), "autowiring by type");
                        self.fetch(&name, requester).map(Resolved::Bean)
                    }
                    Selection::None if descriptor.is_required() => Err(unsatisfied(match descriptor.qualifier_name() {
                        Some(qualifier) => format!("no bean of type {} qualified '{qualifier}'", key.name()),
                        None => format!("no bean of type {}", key.name()),
                    })),
                    Selection::None => Ok(Resolved::Null),
                }
            }
            DependencyKind::List(key) | DependencyKind::Map(key) => {
                let mut candidates = self.candidates(key, requester);
                if let Some(qualifier) = descriptor.qualifier_name() {
                    candidates.retain(|c| self.matches_qualifier(c, qualifier));
                }
                if candidates.is_empty() {
                    return if descriptor.is_required() {
                        Err(unsatisfied(format!("no beans of type {}", key.name())))
                    } else {
                        Ok(Resolved::Null)
                    };
                }
                candidates.sort_by_key(|c| (c.priority.is_none(), c.priority.unwrap_or(0)));

                let mut resolved = Vec::with_capacity(candidates.len());
                for candidate in candidates {
                    let instance = self.fetch(&candidate.name, requester)?;
                    resolved.push((candidate.name, Resolved::Bean(instance)));
                }
                Ok(match descriptor.kind() {
                    DependencyKind::Map(_) => Resolved::Map(resolved),
                    _ => Resolved::List(resolved.into_iter().map(|(_, bean)| bean).collect()),
                })
            }
        }
    }

    /// Top-level lookup of the single bean assignable to `key`.
    pub(crate) fn get_object_by_key(&self, key: TypeKey) -> ContainerResult<Instance> {
        self.ensure_open()?;
        match self.select(key, None, None)? {
            Selection::One(name) => self.get_object_internal(&name, None),
            Selection::None => Err(ContainerError::NoSuchDefinition(key.name().to_owned())),
        }
    }

    /// Every bean assignable to `key`, keyed by name, in injection order.
    pub(crate) fn get_objects_by_key(&self, key: TypeKey) -> ContainerResult<Vec<(String, Instance)>> {
        self.ensure_open()?;
        let mut candidates = self.candidates(key, None);
        candidates.sort_by_key(|c| (c.priority.is_none(), c.priority.unwrap_or(0)));
        candidates
            .into_iter()
            .map(|c| self.get_object_internal(&c.name, None).map(|instance| (c.name, instance)))
            .collect()
    }

    /// Resolves a declared value for `requester`.
    pub(crate) fn resolve_value(&self, requester: &str, outer: &MergedDefinition, value: &Value) -> ContainerResult<Resolved> {
        Ok(match value {
            Value::Null => Resolved::Null,
            Value::Str(s) => Resolved::Str(s.clone()),
            Value::Int(i) => Resolved::Int(*i),
            Value::Float(x) => Resolved::Float(*x),
            Value::Bool(b) => Resolved::Bool(*b),
            Value::Ref(name) => {
                let name = self.inner.definitions.canonical_name(name);
                trace!(bean = requester, reference = %name, "resolving bean reference");
                Resolved::Bean(self.fetch(&name, Some(requester))?)
            }
            Value::Inner(definition) => Resolved::Bean(self.create_inner_bean(requester, outer, definition)?),
            Value::List(items) => Resolved::List(
                items
                    .iter()
                    .map(|item| self.resolve_value(requester, outer, item))
                    .collect::<ContainerResult<_>>()?,
            ),
            Value::Map(entries) => Resolved::Map(
                entries
                    .iter()
                    .map(|(key, item)| self.resolve_value(requester, outer, item).map(|v| (key.clone(), v)))
                    .collect::<ContainerResult<_>>()?,
            ),
            Value::Resolved(resolved) => resolved.clone(),
        })
    }
}
