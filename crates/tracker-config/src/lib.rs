//! Configuration module for the order tracker system.
//!
//! This module provides structures and utilities for managing tracker
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure required values are properly set.
//!
//! The token signing secret is deliberately never defaulted: it may come
//! from the config file or from the `TRACKER_SIGNING_SECRET` environment
//! variable, and its absence is surfaced to the token service as a hard
//! misconfiguration rather than silently falling back.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable consulted when the config file carries no secret.
pub const SIGNING_SECRET_ENV: &str = "TRACKER_SIGNING_SECRET";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the order tracker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this tracker instance.
	pub service: ServiceConfig,
	/// Configuration for token issuance and verification.
	#[serde(default)]
	pub token: TokenConfig,
	/// Configuration for the order store backend.
	pub storage: StorageConfig,
	/// Configuration for outbound notification.
	#[serde(default)]
	pub notification: NotificationConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the tracker instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this tracker instance.
	pub id: String,
	/// Public base URL embedded into verification links.
	#[serde(default = "default_base_url")]
	pub base_url: String,
}

fn default_base_url() -> String {
	"http://localhost:3000".to_string()
}

/// Configuration for token issuance and verification.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	/// Signing secret. Optional here because it may instead arrive via
	/// the environment; resolution happens in `resolve_secret`.
	pub secret: Option<String>,
	/// Validity window for issued tokens, in seconds.
	#[serde(default = "default_validity_secs")]
	pub validity_secs: u64,
}

/// Returns the default token validity window: 2 days.
fn default_validity_secs() -> u64 {
	172_800
}

impl Default for TokenConfig {
	fn default() -> Self {
		Self {
			secret: None,
			validity_secs: default_validity_secs(),
		}
	}
}

impl TokenConfig {
	/// Resolves the signing secret from config or environment.
	///
	/// Returns `None` when neither source provides a non-empty value;
	/// the token service turns that into a `Misconfigured` failure.
	pub fn resolve_secret(&self) -> Option<SecretString> {
		self.secret
			.clone()
			.filter(|s| !s.is_empty())
			.or_else(|| std::env::var(SIGNING_SECRET_ENV).ok().filter(|s| !s.is_empty()))
			.map(SecretString::from)
	}
}

impl fmt::Debug for TokenConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TokenConfig")
			.field("secret", &self.secret.as_ref().map(|_| "***REDACTED***"))
			.field("validity_secs", &self.validity_secs)
			.finish()
	}
}

/// Configuration for the order store backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of store implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

impl StorageConfig {
	/// Returns the configuration section for an implementation, or an
	/// empty table for backends that need none (e.g. memory).
	pub fn implementation_config(&self, name: &str) -> toml::Value {
		self.implementations
			.get(name)
			.cloned()
			.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()))
	}
}

/// Configuration for outbound notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
	/// Which implementation to use as primary.
	#[serde(default = "default_notifier")]
	pub primary: String,
	/// Map of notifier implementation names to their configurations.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

fn default_notifier() -> String {
	"log".to_string()
}

impl Default for NotificationConfig {
	fn default() -> Self {
		Self {
			primary: default_notifier(),
			implementations: HashMap::new(),
		}
	}
}

impl NotificationConfig {
	/// Returns the configuration section for an implementation, or an
	/// empty table for channels that need none (e.g. log).
	pub fn implementation_config(&self, name: &str) -> toml::Value {
		self.implementations
			.get(name)
			.cloned()
			.unwrap_or_else(|| toml::Value::Table(toml::map::Map::new()))
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server should be started.
	#[serde(default)]
	pub enabled: bool,
	/// Bind host.
	#[serde(default = "default_host")]
	pub host: String,
	/// Bind port.
	#[serde(default = "default_port")]
	pub port: u16,
}

fn default_host() -> String {
	"127.0.0.1".to_string()
}

fn default_port() -> u16 {
	3000
}

impl Config {
	/// Loads configuration from a TOML file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Validates the configuration after parsing.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"service.id must not be empty".into(),
			));
		}
		if self.storage.primary.trim().is_empty() {
			return Err(ConfigError::Validation(
				"storage.primary must not be empty".into(),
			));
		}
		if self.token.validity_secs == 0 {
			return Err(ConfigError::Validation(
				"token.validity_secs must be positive".into(),
			));
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use secrecy::ExposeSecret;

	const MINIMAL: &str = r#"
		[service]
		id = "tracker-test"

		[storage]
		primary = "memory"
	"#;

	#[test]
	fn minimal_config_parses_with_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.service.id, "tracker-test");
		assert_eq!(config.service.base_url, "http://localhost:3000");
		assert_eq!(config.token.validity_secs, 172_800);
		assert_eq!(config.notification.primary, "log");
		assert!(config.api.is_none());
	}

	#[test]
	fn missing_service_section_is_an_error() {
		let result = "[storage]\nprimary = \"memory\"".parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[test]
	fn zero_validity_is_rejected() {
		let source = r#"
			[service]
			id = "tracker-test"

			[token]
			validity_secs = 0

			[storage]
			primary = "memory"
		"#;
		let result = source.parse::<Config>();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn secret_resolves_from_config_value() {
		let source = r#"
			[service]
			id = "tracker-test"

			[token]
			secret = "from-config"

			[storage]
			primary = "memory"
		"#;
		let config: Config = source.parse().unwrap();
		let secret = config.token.resolve_secret().unwrap();
		assert_eq!(secret.expose_secret(), "from-config");
	}

	#[test]
	fn empty_secret_does_not_resolve() {
		let source = r#"
			[service]
			id = "tracker-test"

			[token]
			secret = ""

			[storage]
			primary = "memory"
		"#;
		let config: Config = source.parse().unwrap();
		// The empty string is not a usable secret; env fallback is not
		// set in this test, so resolution must fail.
		if std::env::var(SIGNING_SECRET_ENV).is_err() {
			assert!(config.token.resolve_secret().is_none());
		}
	}

	#[test]
	fn debug_output_redacts_the_secret() {
		let config = TokenConfig {
			secret: Some("super-secret".into()),
			validity_secs: 60,
		};
		let debug = format!("{:?}", config);
		assert!(!debug.contains("super-secret"));
		assert!(debug.contains("REDACTED"));
	}

	#[tokio::test]
	async fn config_loads_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tracker.toml");
		tokio::fs::write(&path, MINIMAL).await.unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.storage.primary, "memory");
	}
}
