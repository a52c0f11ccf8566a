//! Container configuration.
//!
//! Settings come from code (`ContainerConfig::default().with_*`), from
//! environment variables, or, with the `config` feature, from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// Engine switches.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{Container, ContainerConfig};
///
/// let config = ContainerConfig::default()
///     .with_circular_references(false)
///     .with_definition_overriding(false);
/// assert!(!config.allow_circular_references);
///
/// let container = Container::with_config(config);
/// assert!(!container.config().allow_definition_overriding);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Singletons expose early references so setter cycles resolve.
    pub allow_circular_references: bool,
    /// Tolerate a raw early reference having been injected into another bean
    /// when post-processing later wraps the bean.
    pub allow_raw_injection_despite_wrapping: bool,
    /// Registering a blueprint under a taken name replaces the old one.
    pub allow_definition_overriding: bool,
    /// Register the built-in [`AutowiredProcessor`](crate::AutowiredProcessor).
    pub annotation_injection: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            allow_raw_injection_despite_wrapping: false,
            allow_definition_overriding: true,
            annotation_injection: true,
        }
    }
}

impl ContainerConfig {
    pub fn with_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn with_raw_injection_despite_wrapping(mut self, allow: bool) -> Self {
        self.allow_raw_injection_despite_wrapping = allow;
        self
    }

    pub fn with_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    pub fn with_annotation_injection(mut self, enabled: bool) -> Self {
        self.annotation_injection = enabled;
        self
    }

    /// Reads `<PREFIX>_ALLOW_CIRCULAR_REFERENCES`,
    /// `<PREFIX>_ALLOW_RAW_INJECTION_DESPITE_WRAPPING`,
    /// `<PREFIX>_ALLOW_DEFINITION_OVERRIDING` and
    /// `<PREFIX>_ANNOTATION_INJECTION`. Unset variables keep their defaults.
    pub fn from_env(prefix: &str) -> ContainerResult<Self> {
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> ContainerResult<Self> {
        let mut config = Self::default();
        let flags: [(&str, &mut bool); 4] = [
            ("ALLOW_CIRCULAR_REFERENCES", &mut config.allow_circular_references),
            ("ALLOW_RAW_INJECTION_DESPITE_WRAPPING", &mut config.allow_raw_injection_despite_wrapping),
            ("ALLOW_DEFINITION_OVERRIDING", &mut config.allow_definition_overriding),
            ("ANNOTATION_INJECTION", &mut config.annotation_injection),
        ];
        for (suffix, slot) in flags {
            let key = if prefix.is_empty() { suffix.to_owned() } else { format!("{prefix}_{suffix}") };
            if let Some(raw) = lookup(&key) {
                *slot = parse_flag(&key, &raw)?;
            }
        }
        Ok(config)
    }

    /// Parses a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> ContainerResult<Self> {
        serde_json::from_str(json).map_err(|e| ContainerError::InvalidConfig(e.to_string()))
    }
}

fn parse_flag(key: &str, raw: &str) -> ContainerResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ContainerError::InvalidConfig(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_are_strict_about_wrapping_only() {
        let config = ContainerConfig::default();
        assert!(config.allow_circular_references);
        assert!(!config.allow_raw_injection_despite_wrapping);
        assert!(config.allow_definition_overriding);
        assert!(config.annotation_injection);
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let env = vars(&[("BEANS_ALLOW_CIRCULAR_REFERENCES", "off"), ("BEANS_ANNOTATION_INJECTION", " FALSE ")]);
        let config = ContainerConfig::from_lookup("BEANS", |k| env.get(k).cloned()).unwrap();
        assert!(!config.allow_circular_references);
        assert!(!config.annotation_injection);
        assert!(config.allow_definition_overriding);
    }

    #[test]
    fn unparsable_flags_are_rejected() {
        let env = vars(&[("X_ALLOW_DEFINITION_OVERRIDING", "maybe")]);
        match ContainerConfig::from_lookup("X", |k| env.get(k).cloned()) {
            Err(ContainerError::InvalidConfig(message)) => assert!(message.contains("X_ALLOW_DEFINITION_OVERRIDING")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = ContainerConfig::from_json(r#"{ "allow_raw_injection_despite_wrapping": true }"#).unwrap();
        assert!(config.allow_raw_injection_despite_wrapping);
        assert!(config.allow_circular_references);
        assert!(ContainerConfig::from_json("[1, 2]").is_err());
    }
}
