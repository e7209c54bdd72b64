//! Named rate limit policies.
//!
//! This module holds the immutable per-route policies, the built-in preset
//! table for common website surfaces, and the registry that the limiter
//! resolves policy names against. Policies can be added or overridden from
//! a YAML file.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{FormgateError, Result};

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// Default window length when none is configured.
pub const DEFAULT_WINDOW_MS: u64 = 15 * MINUTE_MS;
/// Default quota per window when none is configured.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;
/// Default rejection message.
pub const DEFAULT_MESSAGE: &str = "Too many requests, please try again later.";
/// Default HTTP status for rejected requests.
pub const DEFAULT_STATUS_CODE: u16 = 429;

/// An immutable rate limit policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Length of the fixed counting window in milliseconds
    pub window_ms: u64,
    /// Requests allowed per window; zero rejects everything
    pub max_requests: u64,
    /// Message returned to rejected clients
    pub message: String,
    /// HTTP status returned to rejected clients
    pub status_code: u16,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_requests: DEFAULT_MAX_REQUESTS,
            message: DEFAULT_MESSAGE.to_string(),
            status_code: DEFAULT_STATUS_CODE,
        }
    }
}

/// Caller-supplied fields to merge over a base policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub window_ms: Option<u64>,
    #[serde(default)]
    pub max_requests: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

impl RateLimitConfig {
    /// Build a policy from overrides merged over the default table.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::default().merged(overrides)
    }

    /// Merge overrides over this policy, returning the result.
    pub fn merged(&self, overrides: ConfigOverrides) -> Self {
        Self {
            window_ms: overrides.window_ms.unwrap_or(self.window_ms),
            max_requests: overrides.max_requests.unwrap_or(self.max_requests),
            message: overrides.message.unwrap_or_else(|| self.message.clone()),
            status_code: overrides.status_code.unwrap_or(self.status_code),
        }
    }
}

/// Built-in policies for the surfaces a marketing site typically exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// General API traffic
    Api,
    /// Generic form submission
    Forms,
    /// Contact form
    Contact,
    /// Quote requests
    Quotes,
    /// Newsletter signup
    Newsletter,
    /// File uploads
    Uploads,
    /// Authentication attempts
    Auth,
    /// Site search
    Search,
}

impl Preset {
    /// Every preset, in table order.
    pub const ALL: [Preset; 8] = [
        Preset::Api,
        Preset::Forms,
        Preset::Contact,
        Preset::Quotes,
        Preset::Newsletter,
        Preset::Uploads,
        Preset::Auth,
        Preset::Search,
    ];

    /// The registry name of this preset.
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Api => "api",
            Preset::Forms => "forms",
            Preset::Contact => "contact",
            Preset::Quotes => "quotes",
            Preset::Newsletter => "newsletter",
            Preset::Uploads => "uploads",
            Preset::Auth => "auth",
            Preset::Search => "search",
        }
    }

    /// The policy for this preset.
    pub fn config(&self) -> RateLimitConfig {
        let (window_ms, max_requests, message) = match self {
            Preset::Api => (
                15 * MINUTE_MS,
                100,
                "API rate limit exceeded. Please try again later.",
            ),
            Preset::Forms => (
                HOUR_MS,
                10,
                "Too many form submissions. Please try again later.",
            ),
            Preset::Contact => (
                HOUR_MS,
                5,
                "Too many contact form submissions. Please try again later.",
            ),
            Preset::Quotes => (
                24 * HOUR_MS,
                3,
                "Too many quote requests. Please try again tomorrow.",
            ),
            Preset::Newsletter => (
                HOUR_MS,
                3,
                "Too many newsletter subscription attempts. Please try again later.",
            ),
            Preset::Uploads => (
                HOUR_MS,
                10,
                "Too many file uploads. Please try again later.",
            ),
            Preset::Auth => (
                15 * MINUTE_MS,
                5,
                "Too many authentication attempts. Please try again later.",
            ),
            Preset::Search => (
                5 * MINUTE_MS,
                20,
                "Too many search requests. Please try again later.",
            ),
        };

        RateLimitConfig::resolve(ConfigOverrides {
            window_ms: Some(window_ms),
            max_requests: Some(max_requests),
            message: Some(message.to_string()),
            status_code: None,
        })
    }
}

/// On-disk format for a limiter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterFile {
    /// Whether to start from the built-in presets
    #[serde(default = "default_include_presets")]
    pub include_presets: bool,
    /// Named policies; entries sharing a preset name override that preset
    #[serde(default)]
    pub limiters: HashMap<String, ConfigOverrides>,
}

fn default_include_presets() -> bool {
    true
}

/// Registry of named rate limit policies.
///
/// Policies are immutable once registered; registering an existing name
/// swaps in the new policy for subsequent checks.
#[derive(Debug, Default)]
pub struct LimiterRegistry {
    limiters: RwLock<HashMap<String, Arc<RateLimitConfig>>>,
}

impl LimiterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in preset.
    pub fn with_presets() -> Self {
        let registry = Self::new();
        for preset in Preset::ALL {
            registry.register(preset.name(), preset.config());
        }
        registry
    }

    /// Load a registry from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limiter definitions");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a registry from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: LimiterFile = serde_yaml::from_str(yaml).map_err(|e| {
            FormgateError::Config(format!("Failed to parse limiter definitions: {}", e))
        })?;

        let registry = if file.include_presets {
            Self::with_presets()
        } else {
            Self::new()
        };

        for (name, overrides) in file.limiters {
            if name.is_empty() {
                return Err(FormgateError::Config(
                    "limiter names must not be empty".to_string(),
                ));
            }
            let config = match registry.get(&name) {
                Some(base) => base.merged(overrides),
                None => RateLimitConfig::resolve(overrides),
            };
            registry.register(name, config);
        }

        Ok(registry)
    }

    /// Register or replace a named policy.
    pub fn register(&self, name: impl Into<String>, config: RateLimitConfig) {
        let name = name.into();
        debug!(
            limiter = %name,
            window_ms = config.window_ms,
            max_requests = config.max_requests,
            "Registering rate limiter"
        );
        self.limiters.write().insert(name, Arc::new(config));
    }

    /// Get the policy registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<RateLimitConfig>> {
        self.limiters.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.limiters.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every registered policy, sorted by name.
    pub fn entries(&self) -> Vec<(String, Arc<RateLimitConfig>)> {
        let mut entries: Vec<_> = self
            .limiters
            .read()
            .iter()
            .map(|(name, config)| (name.clone(), Arc::clone(config)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of registered policies.
    pub fn len(&self) -> usize {
        self.limiters.read().len()
    }

    /// Whether no policy is registered.
    pub fn is_empty(&self) -> bool {
        self.limiters.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.window_ms, 15 * 60 * 1000);
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.message, DEFAULT_MESSAGE);
        assert_eq!(config.status_code, 429);
    }

    #[test]
    fn test_resolve_merges_over_defaults() {
        let config = RateLimitConfig::resolve(ConfigOverrides {
            max_requests: Some(7),
            message: Some("slow down".to_string()),
            ..ConfigOverrides::default()
        });

        assert_eq!(config.max_requests, 7);
        assert_eq!(config.message, "slow down");
        assert_eq!(config.window_ms, DEFAULT_WINDOW_MS);
        assert_eq!(config.status_code, DEFAULT_STATUS_CODE);
    }

    #[test]
    fn test_resolve_without_overrides_is_default() {
        assert_eq!(
            RateLimitConfig::resolve(ConfigOverrides::default()),
            RateLimitConfig::default()
        );
    }

    #[test]
    fn test_preset_table() {
        let contact = Preset::Contact.config();
        assert_eq!(contact.window_ms, 60 * 60 * 1000);
        assert_eq!(contact.max_requests, 5);

        let quotes = Preset::Quotes.config();
        assert_eq!(quotes.window_ms, 24 * 60 * 60 * 1000);
        assert_eq!(quotes.max_requests, 3);
        assert_eq!(quotes.message, "Too many quote requests. Please try again tomorrow.");

        let search = Preset::Search.config();
        assert_eq!(search.window_ms, 5 * 60 * 1000);
        assert_eq!(search.max_requests, 20);

        for preset in Preset::ALL {
            assert_eq!(preset.config().status_code, 429);
        }
    }

    #[test]
    fn test_registry_with_presets() {
        let registry = LimiterRegistry::with_presets();
        assert_eq!(registry.len(), 8);
        assert_eq!(
            registry.names(),
            vec!["api", "auth", "contact", "forms", "newsletter", "quotes", "search", "uploads"]
        );
        assert_eq!(registry.get("auth").unwrap().max_requests, 5);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let registry = LimiterRegistry::with_presets();
        registry.register(
            "contact",
            RateLimitConfig {
                max_requests: 0,
                ..Preset::Contact.config()
            },
        );

        assert_eq!(registry.len(), 8);
        assert_eq!(registry.get("contact").unwrap().max_requests, 0);
    }

    #[test]
    fn test_parse_limiter_file() {
        let yaml = r#"
limiters:
  contact:
    max_requests: 2
  webinar:
    window_ms: 60000
    max_requests: 50
    message: Webinar signups are full for now.
    status_code: 503
"#;
        let registry = LimiterRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.len(), 9);

        // Overrides merge over the preset, not over the global defaults
        let contact = registry.get("contact").unwrap();
        assert_eq!(contact.max_requests, 2);
        assert_eq!(contact.window_ms, 60 * 60 * 1000);
        assert_eq!(contact.message, Preset::Contact.config().message);

        let webinar = registry.get("webinar").unwrap();
        assert_eq!(webinar.window_ms, 60_000);
        assert_eq!(webinar.status_code, 503);
    }

    #[test]
    fn test_parse_without_presets() {
        let yaml = r#"
include_presets: false
limiters:
  api:
    max_requests: 1000
"#;
        let registry = LimiterRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.names(), vec!["api"]);

        let api = registry.get("api").unwrap();
        assert_eq!(api.max_requests, 1000);
        assert_eq!(api.message, DEFAULT_MESSAGE);
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let yaml = r#"
limiters:
  api:
    max_request: 10
"#;
        let result = LimiterRegistry::from_yaml(yaml);
        assert!(matches!(result, Err(FormgateError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limiters.yaml");
        std::fs::write(&path, "limiters:\n  search:\n    max_requests: 40\n").unwrap();

        let registry = LimiterRegistry::from_file(&path).unwrap();
        assert_eq!(registry.get("search").unwrap().max_requests, 40);
    }

    #[test]
    fn test_from_missing_file() {
        let result = LimiterRegistry::from_file("/nonexistent/limiters.yaml");
        assert!(matches!(result, Err(FormgateError::Io(_))));
    }
}
