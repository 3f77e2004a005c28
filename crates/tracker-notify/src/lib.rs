//! Outbound notification module for the order tracker system.
//!
//! Notification is advisory: it runs after the authoritative state
//! change has committed, and a slow or failing channel must never block
//! or fail an otherwise-successful transition. Callers are expected to
//! catch and log `NotifyError`, not propagate it.

use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod smtp;
}

/// Errors that can occur during outbound notification.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// The recipient address could not be parsed.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// The transport failed to deliver the message.
	#[error("Transport error: {0}")]
	Transport(String),
	/// Error that occurs during configuration of the notifier.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the outbound notifier collaborator.
///
/// Implementations deliver a human-readable message to a customer
/// address. Delivery is best effort.
#[async_trait]
pub trait OutboundNotifier: Send + Sync {
	/// Sends a message to the given address.
	async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Type alias for notifier factory functions.
pub type NotifierFactory = fn(&toml::Value) -> Result<Box<dyn OutboundNotifier>, NotifyError>;

/// Get all registered notifier implementations.
///
/// Returns a vector of (name, factory) tuples used by the service wiring
/// to resolve the configured notification channel.
pub fn get_all_implementations() -> Vec<(&'static str, NotifierFactory)> {
	use implementations::{log, smtp};

	vec![
		("log", log::create_notifier as NotifierFactory),
		("smtp", smtp::create_notifier as NotifierFactory),
	]
}
