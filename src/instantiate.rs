//! Instantiation strategies.
//!
//! A blueprint is instantiated by the first strategy that applies:
//!
//! 1. its supplier,
//! 2. its factory method (on a factory bean, or static on the blueprint class),
//! 3. constructor autowiring, when processors propose constructors, the
//!    autowire mode is `Constructor`, arguments are declared or given, or the
//!    class has no zero-argument constructor,
//! 4. the zero-argument constructor.
//!
//! Constructor and factory-method candidates are tried greediest first. A
//! candidate whose arguments cannot be satisfied is skipped; any other failure
//! aborts the search.

use std::sync::Arc;

use tracing::trace;

use crate::container::Container;
use crate::definition::{AutowireMode, MergedDefinition, Value};
use crate::error::{BoxError, ContainerError, ContainerResult, Phase};
use crate::instance::Instance;
use crate::introspect::{Args, Class, Param, Resolved};
use crate::resolver::DependencyDescriptor;

/// An argument value declared in the blueprint or passed by the caller.
struct GivenArg {
    index: Option<usize>,
    name: Option<String>,
    value: Resolved,
}

impl GivenArg {
    fn is_generic(&self) -> bool {
        self.index.is_none() && self.name.is_none()
    }
}

/// One invocable candidate: a constructor or a factory method overload.
struct Candidate<'a> {
    params: &'a [Param],
    invoke: Box<dyn Fn(Args) -> Result<Instance, BoxError> + 'a>,
}

impl Container {
    pub(crate) fn instantiate(&self, name: &str, merged: &MergedDefinition, explicit: Option<&[Value]>) -> ContainerResult<Instance> {
        if let Some(supplier) = merged.supplier() {
            trace!(bean = name, "obtaining instance from supplier");
            return supplier().map_err(|e| ContainerError::from_user(name, Phase::Instantiation, e));
        }
        if merged.factory_method().is_some() {
            return self.instantiate_using_factory_method(name, merged, explicit);
        }

        let class = merged.class().cloned().ok_or_else(|| ContainerError::InvalidDefinition {
            bean: name.to_owned(),
            reason: "no class, supplier or factory method to instantiate".into(),
        })?;

        let proposed = self.inner.processors.candidate_constructors(&class, name);
        let autowire = proposed.is_some()
            || merged.autowire() == AutowireMode::Constructor
            || merged.has_args()
            || explicit.is_some()
            || !class.has_default_constructor();
        if autowire {
            let indices = proposed.unwrap_or_else(|| (0..class.constructors().len()).collect());
            return self.autowire_constructor(name, merged, &class, &indices, explicit);
        }

        trace!(bean = name, class = class.name(), "instantiating with default constructor");
        let constructor = class
            .constructors()
            .iter()
            .find(|c| c.params().is_empty())
            .ok_or_else(|| ContainerError::NoViableConstructor {
                bean: name.to_owned(),
                reason: format!("{} declares no zero-argument constructor", class.name()),
            })?;
        constructor
            .instantiate(Args::new(Vec::new()))
            .map(|object| Instance::from_parts(object, class.clone()))
            .map_err(|e| ContainerError::from_user(name, Phase::Instantiation, e))
    }

    fn autowire_constructor(
        &self,
        name: &str,
        merged: &MergedDefinition,
        class: &Arc<Class>,
        indices: &[usize],
        explicit: Option<&[Value]>,
    ) -> ContainerResult<Instance> {
        let candidates: Vec<Candidate<'_>> = indices
            .iter()
            .filter_map(|&index| class.constructors().get(index))
            .map(|constructor| Candidate {
                params: constructor.params(),
                invoke: Box::new(move |args| {
                    constructor
                        .instantiate(args)
                        .map(|object| Instance::from_parts(object, class.clone()))
                }),
            })
            .collect();
        if candidates.is_empty() {
            return Err(ContainerError::NoViableConstructor {
                bean: name.to_owned(),
                reason: format!("{} declares no constructors", class.name()),
            });
        }
        let given = self.given_args(name, merged, explicit)?;
        self.invoke_greediest(name, candidates, &given, explicit.is_none())
    }

    fn instantiate_using_factory_method(
        &self,
        name: &str,
        merged: &MergedDefinition,
        explicit: Option<&[Value]>,
    ) -> ContainerResult<Instance> {
        let method = merged.factory_method().unwrap_or_default();

        let (factory, declaring) = match merged.factory_bean() {
            Some(factory_bean) => {
                let factory_bean = self.inner.definitions.canonical_name(factory_bean);
                if factory_bean == name {
                    return Err(ContainerError::InvalidDefinition {
                        bean: name.to_owned(),
                        reason: "factory bean reference points back to the same definition".into(),
                    });
                }
                let factory = self.get_object_internal(&factory_bean, None)?;
                self.inner.singletons.register_dependent(&factory_bean, name);
                let declaring = factory.class().clone();
                (Some(factory), declaring)
            }
            None => {
                let declaring = merged.class().cloned().ok_or_else(|| ContainerError::InvalidDefinition {
                    bean: name.to_owned(),
                    reason: format!("static factory method '{method}' declared without a class"),
                })?;
                (None, declaring)
            }
        };

        let wants_static = factory.is_none();
        let target = factory.as_ref().map(|f| f.object());
        let candidates: Vec<Candidate<'_>> = declaring
            .factory_methods(method)
            .filter(|m| m.is_static() == wants_static)
            .map(|m| Candidate {
                params: m.params(),
                invoke: Box::new(move |args| m.invoke(target, args)),
            })
            .collect();
        if candidates.is_empty() {
            return Err(ContainerError::NoViableConstructor {
                bean: name.to_owned(),
                reason: format!(
                    "no {} factory method '{method}' on {}",
                    if wants_static { "static" } else { "instance" },
                    declaring.name()
                ),
            });
        }

        trace!(bean = name, method, factory = ?merged.factory_bean(), "instantiating with factory method");
        let given = self.given_args(name, merged, explicit)?;
        self.invoke_greediest(name, candidates, &given, explicit.is_none())
    }

    fn given_args(&self, name: &str, merged: &MergedDefinition, explicit: Option<&[Value]>) -> ContainerResult<Vec<GivenArg>> {
        match explicit {
            Some(values) => values
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    Ok(GivenArg {
                        index: Some(index),
                        name: None,
                        value: self.resolve_value(name, merged, value)?,
                    })
                })
                .collect(),
            None => merged
                .args()
                .iter()
                .map(|arg| {
                    Ok(GivenArg {
                        index: arg.index(),
                        name: arg.name().map(str::to_owned),
                        value: self.resolve_value(name, merged, arg.value())?,
                    })
                })
                .collect(),
        }
    }

    /// Tries `candidates` with the most parameters first.
    fn invoke_greediest(
        &self,
        name: &str,
        mut candidates: Vec<Candidate<'_>>,
        given: &[GivenArg],
        autowire: bool,
    ) -> ContainerResult<Instance> {
        candidates.sort_by(|a, b| b.params.len().cmp(&a.params.len()));
        let single = candidates.len() == 1;
        let mut last_failure: Option<ContainerError> = None;

        for candidate in &candidates {
            if candidate.params.len() < given.len() {
                continue;
            }
            match self.fill_arguments(name, candidate.params, given, autowire) {
                Ok(values) => {
                    trace!(bean = name, params = candidate.params.len(), "invoking constructor candidate");
                    return (candidate.invoke)(Args::new(values))
                        .map_err(|e| ContainerError::from_user(name, Phase::Instantiation, e));
                }
                Err(error) if error.is_unsatisfied() => {
                    trace!(bean = name, %error, "skipping unsatisfiable candidate");
                    if single {
                        return Err(error);
                    }
                    last_failure = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(ContainerError::NoViableConstructor {
            bean: name.to_owned(),
            reason: match last_failure {
                Some(error) => error.to_string(),
                None => format!("no candidate accepts {} declared argument(s)", given.len()),
            },
        })
    }

    /// Assigns a value to every parameter: by index, then by name, then the
    /// first fitting generic value, then by autowiring.
    fn fill_arguments(&self, name: &str, params: &[Param], given: &[GivenArg], autowire: bool) -> ContainerResult<Vec<Resolved>> {
        let mut used = vec![false; given.len()];
        let mut values = Vec::with_capacity(params.len());

        for (position, param) in params.iter().enumerate() {
            let kind = param.kind();
            let pick = given
                .iter()
                .enumerate()
                .position(|(k, g)| !used[k] && g.index == Some(position))
                .or_else(|| {
                    given
                        .iter()
                        .enumerate()
                        .position(|(k, g)| !used[k] && g.index.is_none() && g.name.as_deref() == Some(param.name()))
                })
                .or_else(|| {
                    given
                        .iter()
                        .enumerate()
                        .position(|(k, g)| !used[k] && g.is_generic() && g.value.fits(&kind))
                });

            match pick {
                Some(k) if given[k].value.fits(&kind) => {
                    used[k] = true;
                    values.push(given[k].value.clone());
                }
                Some(k) => {
                    return Err(ContainerError::UnsatisfiedDependency {
                        bean: name.to_owned(),
                        injection_point: param.name().to_owned(),
                        reason: format!("declared {} does not fit {}", given[k].value.describe(), kind.type_name()),
                    })
                }
                None if autowire => {
                    values.push(self.resolve_dependency(&DependencyDescriptor::for_param(param), Some(name))?);
                }
                None if !param.is_required() => values.push(Resolved::Null),
                None => {
                    return Err(ContainerError::UnsatisfiedDependency {
                        bean: name.to_owned(),
                        injection_point: param.name().to_owned(),
                        reason: "no argument given".into(),
                    })
                }
            }
        }

        if let Some(unused) = given.iter().zip(&used).find(|(_, used)| !**used) {
            return Err(ContainerError::UnsatisfiedDependency {
                bean: name.to_owned(),
                injection_point: unused.0.name.clone().unwrap_or_else(|| format!("#{}", unused.0.index.unwrap_or(0))),
                reason: format!("declared {} matches no parameter", unused.0.value.describe()),
            });
        }
        Ok(values)
    }
}
