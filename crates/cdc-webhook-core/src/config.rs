//! Configuration for the CDC webhook engine

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdcConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CdcConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CDC_WEBHOOK_DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(max) = std::env::var("CDC_WEBHOOK_DATABASE_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                config.database.max_connections = n;
            }
        }
        if let Ok(schema) = std::env::var("CDC_WEBHOOK_DEFAULT_SCHEMA") {
            config.registry.default_schema = schema;
        }
        if let Ok(agent) = std::env::var("CDC_WEBHOOK_USER_AGENT") {
            config.dispatch.user_agent = agent;
        }
        if let Ok(level) = std::env::var("CDC_WEBHOOK_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("CDC_WEBHOOK_LOG_FORMAT") {
            config.logging.format = format;
        }

        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(crate::Error::ConfigError(
                "database.url must not be empty".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(crate::Error::ConfigError(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.registry.default_schema.trim().is_empty() {
            return Err(crate::Error::ConfigError(
                "registry.default_schema must not be empty".into(),
            ));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(crate::Error::ConfigError(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                other
            ))),
        }
    }
}

/// Durable storage for trigger definitions and credential records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cdc_webhook.db?mode=rwc".to_string(),
            max_connections: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Schema assumed when a registration omits `schema_name`
    pub default_schema: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_schema: crate::DEFAULT_SCHEMA.to_string(),
        }
    }
}

/// HTTP client settings shared by every delivery.
///
/// Per-attempt timeouts come from each trigger definition, not from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

fn default_user_agent() -> String {
    format!("cdc-webhook/{}", crate::VERSION)
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CdcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registry.default_schema, "public");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.dispatch.user_agent.starts_with("cdc-webhook/"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = CdcConfig::from_toml(
            r#"
            [database]
            url = "sqlite:///var/lib/cdc/triggers.db?mode=rwc"
            max_connections = 4

            [dispatch]
            connect_timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.dispatch.connect_timeout_ms, 500);
        assert_eq!(config.dispatch.pool_idle_timeout_secs, 90);
        assert_eq!(config.registry.default_schema, "public");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CdcConfig::default();
        config.registry.default_schema = "  ".into();
        assert!(config.validate().is_err());

        let mut config = CdcConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());

        let mut config = CdcConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = CdcConfig::from_toml("[database\nurl = 1").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigError(_)));
    }
}
