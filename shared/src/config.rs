//! Harness configuration
//!
//! Defaults can be overridden from the environment. A `.env` file in the
//! current directory or its parents is loaded first when present; variables
//! already set in the process environment win over the file.
//!
//! ## Recognised variables
//! - `HARNESS_TIMEOUT_SECS`: wall-clock budget for a child run
//! - `HARNESS_GRACE_SECS`: wait between terminate and kill
//! - `HARNESS_KILL_WAIT_SECS`: bound on the wait after kill (unset = unbounded)
//! - `HARNESS_LOG_LEVEL`: tracing level for the harness crates
//! - `HARNESS_VERBOSITY`: `silent`, `default` or `verbose`
//! - `HARNESS_INTERPRETER`: interpreter executable used by the assertion helpers
//! - `HARNESS_CRASH_REPORTS_DIR`: directory scanned for crash reports

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{SharedError, SharedResult};
use crate::types::Verbosity;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

const TIMEOUT_VAR: &str = "HARNESS_TIMEOUT_SECS";
const GRACE_VAR: &str = "HARNESS_GRACE_SECS";
const KILL_WAIT_VAR: &str = "HARNESS_KILL_WAIT_SECS";
const LOG_LEVEL_VAR: &str = "HARNESS_LOG_LEVEL";
const VERBOSITY_VAR: &str = "HARNESS_VERBOSITY";
const INTERPRETER_VAR: &str = "HARNESS_INTERPRETER";
const CRASH_REPORTS_VAR: &str = "HARNESS_CRASH_REPORTS_DIR";

#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub timeout: Duration,
    pub grace: Duration,
    /// `None` waits for a killed child without limit
    pub kill_wait: Option<Duration>,
    pub log_level: String,
    pub verbosity: Verbosity,
    pub interpreter: Option<PathBuf>,
    pub crash_reports_dir: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            grace: DEFAULT_GRACE,
            kill_wait: None,
            log_level: "info".to_string(),
            verbosity: Verbosity::Default,
            interpreter: None,
            crash_reports_dir: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> SharedResult<Self> {
        // Silently ignored when no .env file exists
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> SharedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(TIMEOUT_VAR) {
            config.timeout = parse_seconds(TIMEOUT_VAR, &value)?;
        }
        if let Some(value) = lookup(GRACE_VAR) {
            config.grace = parse_seconds(GRACE_VAR, &value)?;
        }
        if let Some(value) = lookup(KILL_WAIT_VAR) {
            config.kill_wait = Some(parse_seconds(KILL_WAIT_VAR, &value)?);
        }
        if let Some(value) = lookup(LOG_LEVEL_VAR) {
            config.log_level = value;
        }
        if let Some(value) = lookup(VERBOSITY_VAR) {
            config.verbosity = value.parse().map_err(|_| SharedError::InvalidConfig {
                field: VERBOSITY_VAR.to_string(),
                value: value.clone(),
            })?;
        }
        config.interpreter = lookup(INTERPRETER_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        config.crash_reports_dir = lookup(CRASH_REPORTS_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}

/// Parse a non-negative, possibly fractional, number of seconds
pub fn parse_seconds(field: &str, value: &str) -> SharedResult<Duration> {
    let invalid = || SharedError::InvalidConfig {
        field: field.to_string(),
        value: value.to_string(),
    };
    let secs: f64 = value.trim().parse().map_err(|_| invalid())?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = HarnessConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.grace, Duration::from_secs(1));
        assert!(config.kill_wait.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            ("HARNESS_TIMEOUT_SECS", "2.5"),
            ("HARNESS_GRACE_SECS", "0"),
            ("HARNESS_KILL_WAIT_SECS", "30"),
            ("HARNESS_LOG_LEVEL", "debug"),
            ("HARNESS_VERBOSITY", "silent"),
            ("HARNESS_INTERPRETER", "/usr/bin/ruby"),
            ("HARNESS_CRASH_REPORTS_DIR", "/tmp/reports"),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.grace, Duration::ZERO);
        assert_eq!(config.kill_wait, Some(Duration::from_secs(30)));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.verbosity, Verbosity::Silent);
        assert_eq!(config.interpreter, Some(PathBuf::from("/usr/bin/ruby")));
        assert_eq!(config.crash_reports_dir, Some(PathBuf::from("/tmp/reports")));
    }

    #[test]
    fn test_empty_paths_are_ignored() {
        let config = HarnessConfig::from_lookup(lookup_from(&[("HARNESS_INTERPRETER", "")])).unwrap();
        assert!(config.interpreter.is_none());
    }

    #[test]
    fn test_invalid_seconds_are_rejected() {
        let err = HarnessConfig::from_lookup(lookup_from(&[("HARNESS_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert_eq!(
            err,
            SharedError::InvalidConfig {
                field: "HARNESS_TIMEOUT_SECS".to_string(),
                value: "soon".to_string(),
            }
        );

        assert!(parse_seconds("x", "-1").is_err());
        assert!(parse_seconds("x", "NaN").is_err());
    }

    #[test]
    fn test_invalid_verbosity_names_the_field() {
        let err = HarnessConfig::from_lookup(lookup_from(&[("HARNESS_VERBOSITY", "loud")])).unwrap_err();
        assert!(err.to_string().contains("HARNESS_VERBOSITY"));
    }
}
