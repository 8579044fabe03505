//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;

/// Connection settings for the MySQL server hosting the `accounts` table.
///
/// # Environment Variables
///
/// Only all-lowercase names are read. Uppercase variables such as the
/// shell's `USER` or `HOST` are ignored and never clash with `user` or `host`.
///
/// - `host` (optional): server host, defaults to 127.0.0.1
/// - `port` (optional): server port, defaults to 3306
/// - `user` (required): user name
/// - `password` (optional): password, omitted from the handshake when unset
/// - `database` (required): schema that holds the `accounts` table
/// - `prepare_schema` (optional): create and seed `accounts` before running, defaults to false
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    pub database: String,

    #[serde(default)]
    pub prepare_schema: bool,
}

/// Default host if `host` is not set.
fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Default MySQL port if `port` is not set.
fn default_port() -> u16 {
    3306
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (`user`, `database`)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Deserialize from `(name, value)` pairs, skipping any name that contains an uppercase letter.
    ///
    /// envy lowercases every name it sees, so `USER` and `user` would otherwise
    /// both arrive as `user` and be rejected as a duplicate field.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(
            vars.into_iter()
                .filter(|(name, _)| !name.chars().any(|c| c.is_ascii_uppercase())),
        )
    }

    /// Build the driver's connect options for one dedicated connection.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database);

        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn applies_defaults_for_optional_settings() {
        let config = Config::from_vars(vars(&[("user", "demo"), ("database", "bank")])).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3306);
        assert_eq!(config.user, "demo");
        assert_eq!(config.password, None);
        assert_eq!(config.database, "bank");
        assert!(!config.prepare_schema);
    }

    #[test]
    fn reads_every_setting() {
        let config = Config::from_vars(vars(&[
            ("host", "db.internal"),
            ("port", "3307"),
            ("user", "demo"),
            ("password", "hunter2"),
            ("database", "bank"),
            ("prepare_schema", "true"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.password.as_deref(), Some("hunter2"));
        assert!(config.prepare_schema);
    }

    #[test]
    fn requires_user_and_database() {
        let missing_user = Config::from_vars(vars(&[("database", "bank")]));
        assert!(missing_user.is_err());

        let missing_database = Config::from_vars(vars(&[("user", "demo")]));
        assert!(missing_database.is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        let result = Config::from_vars(vars(&[
            ("user", "demo"),
            ("database", "bank"),
            ("port", "mysql"),
        ]));

        assert!(result.is_err());
    }

    #[test]
    fn ignores_uppercase_shell_variables() {
        let config = Config::from_vars(vars(&[
            ("USER", "root"),
            ("HOST", "workstation"),
            ("user", "demo"),
            ("host", "db.internal"),
            ("database", "bank"),
        ]))
        .unwrap();

        assert_eq!(config.user, "demo");
        assert_eq!(config.host, "db.internal");
    }

    #[test]
    fn uppercase_name_does_not_stand_in_for_required_setting() {
        let result = Config::from_vars(vars(&[("USER", "root"), ("database", "bank")]));

        assert!(result.is_err());
    }
}
