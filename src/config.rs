use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "policyflow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-opus-4-5-20251101";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
/// Five-minute ceiling on a single generator call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Matched patterns required before the deterministic output is trusted.
pub const MIN_COVERAGE: usize = 2;

pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_API_URL: &str = "POLICYFLOW_API_URL";
pub const ENV_MODEL: &str = "POLICYFLOW_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "POLICYFLOW_TIMEOUT_SECS";
pub const ENV_REGISTRY: &str = "POLICYFLOW_REGISTRY";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_CRATE_NAME"))
}

/// Settings for the extraction orchestrator and its fallback generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub min_coverage: usize,
    pub surface_fallback_errors: bool,
    pub registry_path: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            min_coverage: MIN_COVERAGE,
            surface_fallback_errors: false,
            registry_path: None,
        }
    }
}

impl ExtractorConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let timeout_secs = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(
                        variable = ENV_TIMEOUT_SECS,
                        value = %raw,
                        default = defaults.timeout_secs,
                        "Invalid timeout, using default"
                    );
                    defaults.timeout_secs
                }
            },
            None => defaults.timeout_secs,
        };

        Self {
            api_key: get(ENV_API_KEY),
            api_base_url: get(ENV_API_URL).unwrap_or(defaults.api_base_url),
            model: get(ENV_MODEL).unwrap_or(defaults.model),
            timeout_secs,
            registry_path: get(ENV_REGISTRY).map(PathBuf::from),
            ..defaults
        }
    }
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
    fn defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.api_base_url, "https://api.anthropic.com");
        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.min_coverage, 2);
        assert!(!config.surface_fallback_errors);
        assert!(config.api_key.is_none());
        assert!(config.registry_path.is_none());
    }

    #[test]
    fn lookup_overrides() {
        let config = ExtractorConfig::from_lookup(lookup_from(&[
            (ENV_API_KEY, "sk-test"),
            (ENV_API_URL, "http://localhost:9000"),
            (ENV_MODEL, "model-b"),
            (ENV_TIMEOUT_SECS, "45"),
            (ENV_REGISTRY, "/etc/policyflow/registry.json"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.model, "model-b");
        assert_eq!(config.timeout_secs, 45);
        assert_eq!(
            config.registry_path,
            Some(PathBuf::from("/etc/policyflow/registry.json"))
        );
        assert_eq!(config.min_coverage, MIN_COVERAGE);
    }

    #[test]
    fn malformed_timeout_falls_back() {
        let config = ExtractorConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECS, "soon")]));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let zero = ExtractorConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECS, "0")]));
        assert_eq!(zero.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = ExtractorConfig::from_lookup(lookup_from(&[(ENV_API_KEY, "   ")]));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ExtractorConfig =
            serde_json::from_str(r#"{"min_coverage": 3, "surface_fallback_errors": true}"#).unwrap();
        assert_eq!(config.min_coverage, 3);
        assert!(config.surface_fallback_errors);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn log_filter_names_crate() {
        assert!(default_log_filter().starts_with("info,"));
    }

    #[test]
    fn app_name() {
        assert_eq!(APP_NAME, "policyflow");
    }
}
