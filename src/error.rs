//! Error types for the bean container.

use std::fmt;

use thiserror::Error;

/// Boxed error returned by user code the container calls into.
///
/// Constructors, setters, factory methods, init/destroy methods and
/// post-processor hooks all report failures through this type. When the boxed
/// value is itself a [`ContainerError`] the container propagates it unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Lifecycle phase in which user code failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Supplier, constructor or factory method.
    Instantiation,
    /// Property conversion and setters.
    Population,
    /// Aware callbacks and init methods.
    Initialization,
    /// A post-processor hook.
    PostProcessing,
    /// Destroy callbacks.
    Destruction,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Phase::Instantiation => "instantiation",
            Phase::Population => "property population",
            Phase::Initialization => "initialization",
            Phase::PostProcessing => "post-processing",
            Phase::Destruction => "destruction",
        };
        f.write_str(phase)
    }
}

/// Container errors
///
/// Every `get_object` failure is reported through one of these variants.
/// Errors raised deep inside a recursive construction surface unchanged at the
/// outermost call, so a constructor cycle three beans down is still reported
/// as [`ContainerError::CircularCreation`].
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Container, ContainerError, Lookup};
///
/// let container = Container::new();
/// match container.get_object("missing") {
///     Err(ContainerError::NoSuchDefinition(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No blueprint matches the requested name or type.
    #[error("no bean definition found for '{0}'")]
    NoSuchDefinition(String),

    /// By-type resolution matched more than one candidate and no tie-break applied.
    #[error("expected a single bean of type {required} but found {}: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousDependency {
        required: &'static str,
        candidates: Vec<String>,
    },

    /// A required dependency could not be resolved.
    #[error("unsatisfied dependency '{injection_point}' of bean '{bean}': {reason}")]
    UnsatisfiedDependency {
        bean: String,
        injection_point: String,
        reason: String,
    },

    /// Constructor-injection cycle, prototype cycle or circular depends-on.
    #[error("bean '{bean}' is currently in creation, unresolvable circular reference: {}", .path.join(" -> "))]
    CircularCreation { bean: String, path: Vec<String> },

    /// A raw early reference was injected and the bean was wrapped afterwards.
    #[error("bean '{bean}' was injected into [{}] in its raw version but has eventually been wrapped", .dependents.join(", "))]
    WrappedReferenceLeak { bean: String, dependents: Vec<String> },

    /// User code failed while building or tearing down a bean.
    #[error("bean '{bean}' failed during {phase}: {source}")]
    ConstructionFailed {
        bean: String,
        phase: Phase,
        #[source]
        source: BoxError,
    },

    /// No constructor or factory method could be satisfied.
    #[error("no viable constructor for bean '{bean}': {reason}")]
    NoViableConstructor { bean: String, reason: String },

    /// The container has been torn down.
    #[error("container has been closed")]
    ContainerClosed,

    /// Registration attempted after the definition store was frozen.
    #[error("definition store is frozen, cannot register '{0}'")]
    DefinitionFrozen(String),

    /// The blueprint is unusable as declared.
    #[error("invalid definition for bean '{bean}': {reason}")]
    InvalidDefinition { bean: String, reason: String },

    /// The bean exists but cannot be viewed as the requested type.
    #[error("bean '{bean}' is of type {actual}, not {expected}")]
    TypeMismatch {
        bean: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A configuration value could not be parsed.
    #[error("invalid container configuration: {0}")]
    InvalidConfig(String),
}

impl ContainerError {
    /// Maps an error returned by user code.
    ///
    /// Container errors travelling back up through user code keep their
    /// identity; anything else becomes [`ContainerError::ConstructionFailed`].
    pub fn from_user(bean: &str, phase: Phase, error: BoxError) -> Self {
        match error.downcast::<ContainerError>() {
            Ok(container_error) => *container_error,
            Err(source) => ContainerError::ConstructionFailed {
                bean: bean.to_owned(),
                phase,
                source,
            },
        }
    }

    /// Returns true for the failures that make a constructor candidate unusable
    /// without aborting the whole constructor search.
    pub(crate) fn is_unsatisfied(&self) -> bool {
        matches!(
            self,
            ContainerError::UnsatisfiedDependency { .. }
                | ContainerError::NoSuchDefinition(_)
                | ContainerError::AmbiguousDependency { .. }
        )
    }
}

/// Value conversion failure
///
/// Raised when a resolved value cannot be turned into the Rust type a
/// constructor parameter or property setter asks for.
#[derive(Debug, Clone, Error)]
#[error("cannot convert {found} into {target}")]
pub struct ConversionError {
    pub target: &'static str,
    pub found: String,
}

impl ConversionError {
    pub(crate) fn new(target: &'static str, found: impl Into<String>) -> Self {
        Self { target, found: found.into() }
    }
}

/// Result type for container operations
///
/// A convenience alias for `Result<T, ContainerError>` used throughout the crate.
pub type ContainerResult<T> = Result<T, ContainerError>;
