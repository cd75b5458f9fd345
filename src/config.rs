//! Configuration for the runcell engine.
//!
//! Everything is environment-driven with sensible defaults, so `runcell`
//! runs with zero configuration against a local Docker daemon. A `.env`
//! file is honored when present.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::observability::ObservabilityConfig;
use crate::sandbox::SandboxConfig;

/// Main configuration for the engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub sandbox: SandboxConfig,
    /// Operator-maintained policy file; `None` means built-in defaults.
    pub policy_path: Option<PathBuf>,
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut sandbox = SandboxConfig::default();
        if let Some(image) = optional_env("RUNCELL_IMAGE")? {
            sandbox.image = image;
        }
        if let Some(n) = parse_env::<usize>("RUNCELL_MAX_CONTEXTS")? {
            if n == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "RUNCELL_MAX_CONTEXTS".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            sandbox.max_contexts = n;
        }
        if let Some(root) = optional_env("RUNCELL_WORKSPACE_ROOT")? {
            sandbox.workspace_root = PathBuf::from(root);
        }
        if let Some(secs) = parse_env::<u64>("RUNCELL_DEFAULT_TIMEOUT_SECS")? {
            sandbox.default_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("RUNCELL_MAX_TIMEOUT_SECS")? {
            sandbox.max_timeout = Duration::from_secs(secs);
        }
        if let Some(mb) = parse_env::<u64>("RUNCELL_MEMORY_LIMIT_MB")? {
            sandbox.limits.memory_bytes = mb * 1024 * 1024;
        }
        if let Some(cpus) = parse_env::<f64>("RUNCELL_CPUS")? {
            sandbox.limits.cpus = cpus;
        }
        if let Some(pids) = parse_env::<u32>("RUNCELL_PIDS_LIMIT")? {
            sandbox.limits.pids = pids;
        }

        Ok(Self {
            sandbox,
            policy_path: resolve_policy_path(optional_env("RUNCELL_POLICY_PATH")?),
            observability: ObservabilityConfig {
                backend: optional_env("RUNCELL_OBSERVABILITY")?
                    .unwrap_or_else(|| "none".to_string()),
            },
        })
    }
}

/// Explicit path wins; otherwise `~/.runcell/policy.json` is picked up
/// when it exists, and the built-in policy applies when it doesn't.
fn resolve_policy_path(explicit: Option<String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    let default = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".runcell")
        .join("policy.json");
    default.exists().then_some(default)
}

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key.to_string())),
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; each test uses its own unique
    // variable name to stay independent of test ordering.

    #[test]
    fn optional_env_missing_is_none() {
        assert_eq!(optional_env("RUNCELL_TEST_MISSING").unwrap(), None);
    }

    #[test]
    fn optional_env_blank_is_none() {
        std::env::set_var("RUNCELL_TEST_BLANK", "  ");
        assert_eq!(optional_env("RUNCELL_TEST_BLANK").unwrap(), None);
        std::env::remove_var("RUNCELL_TEST_BLANK");
    }

    #[test]
    fn parse_env_rejects_garbage() {
        std::env::set_var("RUNCELL_TEST_GARBAGE", "not-a-number");
        let err = parse_env::<u64>("RUNCELL_TEST_GARBAGE").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        std::env::remove_var("RUNCELL_TEST_GARBAGE");
    }

    #[test]
    fn parse_env_parses_numbers() {
        std::env::set_var("RUNCELL_TEST_NUMBER", "8");
        assert_eq!(parse_env::<u64>("RUNCELL_TEST_NUMBER").unwrap(), Some(8));
        std::env::remove_var("RUNCELL_TEST_NUMBER");
    }

    #[test]
    fn resolve_policy_path_prefers_explicit() {
        let path = resolve_policy_path(Some("/etc/runcell/policy.json".into()));
        assert_eq!(path, Some(PathBuf::from("/etc/runcell/policy.json")));
    }
}
