//! Gremlin Explorer Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with sensible defaults for development against a local emulator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// API server configuration
    pub server: ServerConfig,

    /// Remote Gremlin endpoint
    pub gremlin: GremlinConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_vars(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overwrite every field whose variable is set, as returned by `lookup`
    fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_var("API_PORT", port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Gremlin endpoint
        if let Some(host) = lookup("GREMLIN_HOST") {
            self.gremlin.host = host;
        }
        if let Some(port) = lookup("GREMLIN_PORT") {
            self.gremlin.port = parse_var("GREMLIN_PORT", port)?;
        }
        if let Some(tls) = lookup("GREMLIN_USE_TLS") {
            self.gremlin.use_tls = parse_var("GREMLIN_USE_TLS", tls)?;
        }
        if let Some(database) = lookup("GREMLIN_DATABASE") {
            self.gremlin.database = database;
        }
        if let Some(collection) = lookup("GREMLIN_COLLECTION") {
            self.gremlin.collection = collection;
        }
        if let Some(key) = lookup("GREMLIN_PRIMARY_KEY") {
            self.gremlin.primary_key = Some(key);
        }
        if let Some(secs) = lookup("GREMLIN_REQUEST_TIMEOUT_SECS") {
            self.gremlin.request_timeout_secs = parse_var("GREMLIN_REQUEST_TIMEOUT_SECS", secs)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_var("LOG_JSON", json)?;
        }

        Ok(())
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())?;
        Ok(self)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 120,
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Remote Gremlin endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GremlinConfig {
    /// Endpoint host without scheme, e.g. `account.gremlin.cosmos.azure.com`
    pub host: String,

    /// Endpoint port
    pub port: u16,

    /// Use `wss://` instead of `ws://`
    pub use_tls: bool,

    /// Logical database name
    pub database: String,

    /// Default collection (graph) when a request does not name one
    pub collection: String,

    /// Shared secret used as the SASL password
    pub primary_key: Option<String>,

    /// Maximum time to wait for the response to one query
    pub request_timeout_secs: u64,

    /// Maximum time to wait for the WebSocket handshake
    pub connect_timeout_secs: u64,

    /// Queries larger than this are rejected before sending
    pub max_query_bytes: usize,
}

impl Default for GremlinConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 443,
            use_tls: true,
            database: "graphdb".to_string(),
            collection: "thehobbit".to_string(),
            primary_key: None,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_query_bytes: 64 * 1024,
        }
    }
}

impl GremlinConfig {
    /// Resolve and validate the connection target for `collection`
    pub fn target(&self, collection: &str) -> Result<GremlinTarget, ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::MissingRequired("GREMLIN_HOST".to_string()));
        }
        if host.contains("://") {
            return Err(ConfigError::InvalidValue {
                key: "GREMLIN_HOST".to_string(),
                value: self.host.clone(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GREMLIN_PORT".to_string(),
                value: "0".to_string(),
            });
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingRequired("GREMLIN_DATABASE".to_string()));
        }
        let collection = collection.trim();
        if collection.is_empty() {
            return Err(ConfigError::MissingRequired("collection".to_string()));
        }
        let secret = self
            .primary_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("GREMLIN_PRIMARY_KEY".to_string()))?;

        Ok(GremlinTarget {
            host: host.to_string(),
            port: self.port,
            use_tls: self.use_tls,
            database: self.database.trim().to_string(),
            collection: collection.to_string(),
            secret: secret.to_string(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_query_bytes: self.max_query_bytes,
        })
    }
}

/// A validated connection target for one collection
#[derive(Clone)]
pub struct GremlinTarget {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub database: String,
    pub collection: String,
    pub secret: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_query_bytes: usize,
}

impl GremlinTarget {
    /// WebSocket URL of the Gremlin endpoint
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{scheme}://{}:{}/gremlin", self.host, self.port)
    }

    /// Composite identity used as the SASL username
    pub fn credential_identity(&self) -> String {
        format!("/dbs/{}/colls/{}", self.database, self.collection)
    }
}

// The secret never appears in logs
impl std::fmt::Debug for GremlinTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GremlinTarget")
            .field("url", &self.url())
            .field("identity", &self.credential_identity())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> GremlinConfig {
        GremlinConfig {
            host: "account.gremlin.cosmos.azure.com".to_string(),
            primary_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.gremlin.port, 443);
        assert!(config.gremlin.use_tls);
        assert_eq!(config.gremlin.collection, "thehobbit");
    }

    #[test]
    fn test_target_identity_and_url() {
        let target = configured().target("people").unwrap();
        assert_eq!(target.credential_identity(), "/dbs/graphdb/colls/people");
        assert_eq!(
            target.url(),
            "wss://account.gremlin.cosmos.azure.com:443/gremlin"
        );

        let plain = GremlinConfig {
            use_tls: false,
            port: 8182,
            ..configured()
        };
        assert_eq!(
            plain.target("g").unwrap().url(),
            "ws://account.gremlin.cosmos.azure.com:8182/gremlin"
        );
    }

    #[test]
    fn test_target_requires_key_and_collection() {
        let no_key = GremlinConfig {
            primary_key: None,
            ..configured()
        };
        assert!(matches!(
            no_key.target("people"),
            Err(ConfigError::MissingRequired(_))
        ));
        assert!(matches!(
            configured().target("   "),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_target_rejects_scheme_in_host() {
        let config = GremlinConfig {
            host: "wss://account.gremlin.cosmos.azure.com".to_string(),
            ..configured()
        };
        assert!(matches!(
            config.target("people"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_target_debug_hides_secret() {
        let rendered = format!("{:?}", configured().target("people").unwrap());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("/dbs/graphdb/colls/people"));
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [gremlin]
            host = "example.gremlin.cosmos.azure.com"
            collection = "people"

            [logging]
            json_format = true
            "#,
        )
        .unwrap();

        assert_eq!(config.gremlin.host, "example.gremlin.cosmos.azure.com");
        assert_eq!(config.gremlin.collection, "people");
        assert_eq!(config.gremlin.port, 443);
        assert!(config.logging.json_format);
        assert_eq!(config.server.port, 8080);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_every_set_field() {
        let mut config = AppConfig::from_toml(
            r#"
            [gremlin]
            host = "h"
            port = 8182
            "#,
        )
        .unwrap();

        config
            .apply_vars(vars(&[
                ("GREMLIN_USE_TLS", "false"),
                ("GREMLIN_REQUEST_TIMEOUT_SECS", "99"),
                ("LOG_JSON", "true"),
                ("GREMLIN_PORT", "443"),
            ]))
            .unwrap();

        assert_eq!(config.gremlin.host, "h");
        assert!(!config.gremlin.use_tls);
        assert_eq!(config.gremlin.request_timeout_secs, 99);
        assert!(config.logging.json_format);
        // A default value still replaces the file value
        assert_eq!(config.gremlin.port, 443);
    }

    #[test]
    fn test_unset_vars_keep_file_values() {
        let mut config = AppConfig::from_toml(
            r#"
            [gremlin]
            use_tls = false
            collection = "people"
            "#,
        )
        .unwrap();

        config.apply_vars(vars(&[])).unwrap();

        assert!(!config.gremlin.use_tls);
        assert_eq!(config.gremlin.collection, "people");
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_vars(vars(&[("GREMLIN_USE_TLS", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var::<u16>("API_PORT", " 9000 ".to_string()).unwrap(), 9000);
        assert!(parse_var::<bool>("GREMLIN_USE_TLS", "maybe".to_string()).is_err());
    }
}
