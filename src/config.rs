//! Configuration for followgraph.
//!
//! Loaded from a TOML file (default `.followgraph/config.toml`), then
//! overridden by environment variables:
//!
//! - `FOLLOWGRAPH_STORE_URI`
//! - `FOLLOWGRAPH_STORE_USER`
//! - `FOLLOWGRAPH_STORE_PASSWORD`
//!
//! Every field has a default, so a missing or partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const ENV_STORE_URI: &str = "FOLLOWGRAPH_STORE_URI";
pub const ENV_STORE_USER: &str = "FOLLOWGRAPH_STORE_USER";
pub const ENV_STORE_PASSWORD: &str = "FOLLOWGRAPH_STORE_PASSWORD";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowGraphConfig {
    pub store: StoreConfig,
    pub limits: QueryLimits,
}

/// Where the graph store lives and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `memory://`, `file://<path>` or `bolt://<host>:<port>`.
    pub uri: String,
    /// Bolt credentials, passed to the server as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "file://.followgraph/graph.bin".to_string(),
            user: None,
            password: None,
        }
    }
}

/// Fixed result limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Upper bound the front end clamps most-followed requests to.
    pub max_top: usize,
    /// How many recommendations to return.
    pub recommendations: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_top: MAX_TOP_CEILING,
            recommendations: RECOMMENDATION_CEILING,
        }
    }
}

/// Largest accepted `max_top`.
pub const MAX_TOP_CEILING: usize = 20;
/// Largest accepted `recommendations`.
pub const RECOMMENDATION_CEILING: usize = 10;

impl QueryLimits {
    /// Clamp both limits into their accepted ranges: `max_top` to
    /// `1..=20`, `recommendations` to `1..=10`.
    pub fn validated(self) -> Self {
        let clamped = Self {
            max_top: self.max_top.clamp(1, MAX_TOP_CEILING),
            recommendations: self.recommendations.clamp(1, RECOMMENDATION_CEILING),
        };
        if clamped != self {
            warn!(
                max_top = self.max_top,
                recommendations = self.recommendations,
                "query limits out of range, clamped to {}/{}",
                clamped.max_top,
                clamped.recommendations
            );
        }
        clamped
    }
}

impl FollowGraphConfig {
    /// Load config from `path`, falling back to defaults if the file is
    /// missing or invalid. Environment overrides are applied afterwards.
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => match toml::from_str::<FollowGraphConfig>(&text) {
                Ok(config) => {
                    debug!(path = %path.display(), "config loaded");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                    FollowGraphConfig::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                FollowGraphConfig::default()
            }
        };
        config.apply_env();
        config.limits = config.limits.validated();
        config
    }

    /// Apply `FOLLOWGRAPH_STORE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = lookup(ENV_STORE_URI).filter(|v| !v.trim().is_empty()) {
            self.store.uri = uri;
        }
        if let Some(user) = lookup(ENV_STORE_USER) {
            self.store.user = Some(user);
        }
        if let Some(password) = lookup(ENV_STORE_PASSWORD) {
            self.store.password = Some(password);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = FollowGraphConfig::default();
        assert_eq!(config.store.uri, "file://.followgraph/graph.bin");
        assert_eq!(config.limits.max_top, 20);
        assert_eq!(config.limits.recommendations, 10);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nuri = \"memory://\"\n").unwrap();

        let config: FollowGraphConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.store.uri, "memory://");
        assert_eq!(config.limits, QueryLimits::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = FollowGraphConfig::load(&dir.path().join("nope.toml"));
        assert_eq!(loaded.limits, QueryLimits::default());
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        let config = FollowGraphConfig::load(&path);
        assert_eq!(config.limits, QueryLimits::default());
    }

    #[test]
    fn test_zero_limits_clamped_up() {
        let limits = QueryLimits {
            max_top: 0,
            recommendations: 0,
        }
        .validated();
        assert_eq!(limits.max_top, 1);
        assert_eq!(limits.recommendations, 1);
    }

    #[test]
    fn test_large_limits_clamped_down() {
        let limits = QueryLimits {
            max_top: 500,
            recommendations: 11,
        }
        .validated();
        assert_eq!(limits, QueryLimits::default());

        let limits = QueryLimits {
            max_top: 5,
            recommendations: 3,
        };
        assert_eq!(limits.validated(), limits);
    }

    #[test]
    fn test_load_validates_limits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[limits]\nmax_top = 0\nrecommendations = 1000\n").unwrap();

        let config = FollowGraphConfig::load(&path);
        assert_eq!(config.limits.max_top, 1);
        assert_eq!(config.limits.recommendations, 10);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_STORE_URI, "memory://"),
            (ENV_STORE_USER, "neo"),
            (ENV_STORE_PASSWORD, "hunter2"),
        ]
        .into_iter()
        .collect();

        let mut config = FollowGraphConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.store.uri, "memory://");
        assert_eq!(config.store.user.as_deref(), Some("neo"));
        assert_eq!(config.store.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_blank_uri_override_ignored() {
        let mut config = FollowGraphConfig::default();
        config.apply_overrides(|k| (k == ENV_STORE_URI).then(|| "  ".to_string()));
        assert_eq!(config.store.uri, StoreConfig::default().uri);
    }
}
