//! Front end configuration
//!
//! Tunables come from `AJFRONT_*` environment variables. A value that does not
//! parse falls back to its default; the front end never refuses to start over
//! a bad knob.

use std::str::FromStr;

/// Name of the dialect wired in when nothing else is configured.
pub const DEFAULT_DIALECT: &str = "aspectj";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Diagnostics allowed per unit before parsing of that unit is abandoned.
    pub max_errors: usize,
    /// Consecutive failed repair attempts before the unit is abandoned.
    pub max_recovery_attempts: usize,
    /// Tokens a trial repair has to consume before it counts as resynchronized.
    pub recovery_window: usize,
    /// Dialect name looked up in the registry; `None` disables the dialect.
    pub dialect: Option<String>,
    /// Trace every reduction with the stack depths.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_errors: 100,
            max_recovery_attempts: 8,
            recovery_window: 4,
            dialect: Some(DEFAULT_DIALECT.to_string()),
            debug: false,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let dialect = match std::env::var("AJFRONT_DIALECT") {
            Ok(name) if is_disabled_name(&name) => None,
            Ok(name) => Some(name.trim().to_string()),
            Err(_) => defaults.dialect.clone(),
        };
        Self {
            max_errors: env_or("AJFRONT_PARSE_MAX_ERRORS", defaults.max_errors),
            max_recovery_attempts: env_or("AJFRONT_RECOVERY_MAX_ATTEMPTS", defaults.max_recovery_attempts),
            recovery_window: env_or("AJFRONT_RECOVERY_WINDOW", defaults.recovery_window).max(1),
            dialect,
            debug: std::env::var("AJFRONT_DEBUG").is_ok(),
        }
    }

    /// Same configuration with the dialect switched off.
    pub fn without_dialect(mut self) -> Self {
        self.dialect = None;
        self
    }

    pub fn with_dialect(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.dialect = if is_disabled_name(&name) { None } else { Some(name) };
        self
    }
}

fn is_disabled_name(name: &str) -> bool {
    matches!(name.trim(), "" | "none" | "disabled" | "off")
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("ignoring {}={:?}: not a valid value, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_errors, 100);
        assert_eq!(config.dialect.as_deref(), Some(DEFAULT_DIALECT));
    }

    #[test]
    fn test_dialect_switches() {
        assert_eq!(Config::default().without_dialect().dialect, None);
        assert_eq!(Config::default().with_dialect("none").dialect, None);
        assert_eq!(Config::default().with_dialect("custom").dialect.as_deref(), Some("custom"));
    }
}
