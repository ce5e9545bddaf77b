//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;

// ── EngineConfig ───────────────────────────────────────────────────

/// Configuration for [`WorldService`](crate::service::WorldService).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Prefix of run thread names; the world id is appended
    /// (`orrery-world-7`). Default: `"orrery-world"`.
    pub thread_name_prefix: String,
    /// Step cap applied when `start_world` is called without one.
    /// Default: `None` (run until stopped).
    pub default_max_steps: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "orrery-world".into(),
            default_max_steps: None,
        }
    }
}

impl EngineConfig {
    /// Validate all fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::EmptyThreadPrefix);
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(ConfigError::InvalidThreadPrefix {
                prefix: self.thread_name_prefix.clone(),
            });
        }
        if self.default_max_steps == Some(0) {
            return Err(ConfigError::ZeroDefaultMaxSteps);
        }
        Ok(())
    }

    pub(crate) fn thread_name(&self, world: impl fmt::Display) -> String {
        format!("{}-{world}", self.thread_name_prefix)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `thread_name_prefix` is empty.
    EmptyThreadPrefix,
    /// `thread_name_prefix` contains a NUL byte, which thread names
    /// cannot carry.
    InvalidThreadPrefix {
        /// The rejected prefix.
        prefix: String,
    },
    /// `default_max_steps` is `Some(0)`; every default start would be a
    /// no-op.
    ZeroDefaultMaxSteps,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyThreadPrefix => write!(f, "thread_name_prefix must not be empty"),
            Self::InvalidThreadPrefix { prefix } => {
                write!(f, "thread_name_prefix {prefix:?} contains a NUL byte")
            }
            Self::ZeroDefaultMaxSteps => {
                write!(f, "default_max_steps must be at least 1 when set")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.thread_name(7), "orrery-world-7");
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = EngineConfig {
            thread_name_prefix: String::new(),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyThreadPrefix));

        let cfg = EngineConfig {
            thread_name_prefix: "a\0b".into(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidThreadPrefix { .. })
        ));

        let cfg = EngineConfig {
            default_max_steps: Some(0),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDefaultMaxSteps));
    }
}
