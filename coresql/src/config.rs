//! Configuration for connections, wait sessions and truncation batches.
//!
//! Tunables are plain structs with documented defaults, passed explicitly into
//! each operation. There is no process-wide mutable state, so concurrent test
//! cases never interfere with each other through shared settings.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;

/// MySQL database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConnectionConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
}

impl MySqlConnectionConfig {
    /// Creates MySQL connection options for connecting to the configured
    /// database.
    pub fn with_db(&self) -> MySqlConnectOptions {
        self.without_db().database(&self.name)
    }

    /// Creates MySQL connection options for connecting to the server without
    /// selecting a database.
    pub fn without_db(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username);

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }
}

/// Configuration for a bounded-retry wait session.
///
/// Controls how [`wait_for_connection`](crate::wait::wait_for_connection)
/// probes a database that may not yet be reachable.
#[derive(Debug, Clone, Deserialize)]
pub struct WaitConfig {
    /// Maximum number of connection probes before the session fails.
    ///
    /// Default: 60
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between a failed probe and the release of the next one.
    ///
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 10ms
    #[serde(default = "default_cooldown_ms", rename = "cooldown_ms")]
    pub cooldown_ms: u64,

    /// Overall deadline for the whole session, regardless of attempts
    /// remaining.
    ///
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 5000ms (5 seconds)
    #[serde(default = "default_wait_deadline_ms", rename = "deadline_ms")]
    pub deadline_ms: u64,
}

fn default_max_attempts() -> u32 {
    60
}

fn default_cooldown_ms() -> u64 {
    10
}

fn default_wait_deadline_ms() -> u64 {
    5000
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            cooldown_ms: default_cooldown_ms(),
            deadline_ms: default_wait_deadline_ms(),
        }
    }
}

impl WaitConfig {
    /// Returns the per-attempt cooldown as a [`Duration`].
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Returns the overall session deadline as a [`Duration`].
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Configuration for a table-truncation batch.
#[derive(Debug, Clone, Deserialize)]
pub struct TruncateConfig {
    /// Shared deadline for one truncation batch, discovery included.
    ///
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 5000ms (5 seconds)
    #[serde(default = "default_truncate_deadline_ms", rename = "deadline_ms")]
    pub deadline_ms: u64,
}

fn default_truncate_deadline_ms() -> u64 {
    5000
}

impl Default for TruncateConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_truncate_deadline_ms(),
        }
    }
}

impl TruncateConfig {
    /// Returns the batch deadline as a [`Duration`].
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_config_defaults() {
        let config = WaitConfig::default();
        assert_eq!(config.max_attempts, 60);
        assert_eq!(config.cooldown(), Duration::from_millis(10));
        assert_eq!(config.deadline(), Duration::from_secs(5));
    }

    #[test]
    fn test_truncate_config_defaults() {
        let config = TruncateConfig::default();
        assert_eq!(config.deadline(), Duration::from_secs(5));
    }

    #[test]
    fn test_wait_config_deserializes_with_defaults() {
        let config: WaitConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_attempts, 60);
        assert_eq!(config.cooldown_ms, 10);
        assert_eq!(config.deadline_ms, 5000);
    }

    #[test]
    fn test_wait_config_deserializes_overrides() {
        let config: WaitConfig =
            serde_json::from_str(r#"{"max_attempts": 3, "cooldown_ms": 1, "deadline_ms": 250}"#)
                .unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.cooldown(), Duration::from_millis(1));
        assert_eq!(config.deadline(), Duration::from_millis(250));
    }

    #[test]
    fn test_connection_config_options() {
        let config: MySqlConnectionConfig = serde_json::from_str(
            r#"{
                "host": "localhost",
                "port": 3306,
                "name": "coresql_test",
                "username": "root",
                "password": "secret"
            }"#,
        )
        .unwrap();

        let options = config.with_db();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 3306);
        assert_eq!(options.get_database(), Some("coresql_test"));
    }
}
