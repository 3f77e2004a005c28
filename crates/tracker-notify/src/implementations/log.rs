//! Log-only notifier implementation.
//!
//! Records every outbound message through tracing instead of delivering
//! it. Useful for development and for deployments without an SMTP relay.

use crate::{NotifyError, OutboundNotifier};
use async_trait::async_trait;

/// Notifier that logs messages instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl OutboundNotifier for LogNotifier {
	async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
		tracing::info!(
			to = %to,
			subject = %subject,
			body_len = body.len(),
			"Outbound notification (log only)"
		);
		Ok(())
	}
}

/// Factory function to create a log notifier from configuration.
///
/// Configuration parameters:
/// - None required for the log notifier
pub fn create_notifier(_config: &toml::Value) -> Result<Box<dyn OutboundNotifier>, NotifyError> {
	Ok(Box::new(LogNotifier))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn log_notifier_always_succeeds() {
		let notifier = LogNotifier;
		notifier
			.send("ada@example.com", "Order confirmed", "Your order is confirmed.")
			.await
			.unwrap();
	}
}
