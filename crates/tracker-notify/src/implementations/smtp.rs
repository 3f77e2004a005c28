//! SMTP notifier implementation.
//!
//! Delivers plain-text messages over an authenticated STARTTLS relay
//! using lettre's tokio transport.

use crate::{NotifyError, OutboundNotifier};
use async_trait::async_trait;
use lettre::{
	message::header::ContentType,
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Notifier that sends mail through an SMTP relay.
pub struct SmtpNotifier {
	mailer: AsyncSmtpTransport<Tokio1Executor>,
	from_address: String,
}

impl SmtpNotifier {
	/// Creates a new SMTP notifier.
	pub fn new(
		host: &str,
		port: u16,
		username: String,
		password: String,
		from_address: String,
	) -> Result<Self, NotifyError> {
		let credentials = Credentials::new(username, password);
		let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
			.map_err(|e| NotifyError::Configuration(e.to_string()))?
			.port(port)
			.credentials(credentials)
			.build();

		Ok(Self {
			mailer,
			from_address,
		})
	}
}

#[async_trait]
impl OutboundNotifier for SmtpNotifier {
	async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
		let message = Message::builder()
			.from(
				self.from_address
					.parse()
					.map_err(|_| NotifyError::InvalidAddress(self.from_address.clone()))?,
			)
			.to(to
				.parse()
				.map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
			.subject(subject)
			.header(ContentType::TEXT_PLAIN)
			.body(body.to_string())
			.map_err(|e| NotifyError::Transport(e.to_string()))?;

		self.mailer
			.send(message)
			.await
			.map_err(|e| NotifyError::Transport(e.to_string()))?;

		Ok(())
	}
}

/// Factory function to create an SMTP notifier from configuration.
///
/// Configuration parameters:
/// - `host`: SMTP relay hostname (required)
/// - `port`: relay port (default: 587)
/// - `username` / `password`: relay credentials (required)
/// - `from_address`: sender address (required)
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn OutboundNotifier>, NotifyError> {
	let get_str = |key: &str| -> Result<String, NotifyError> {
		config
			.get(key)
			.and_then(|v| v.as_str())
			.map(str::to_string)
			.ok_or_else(|| NotifyError::Configuration(format!("missing smtp field: {}", key)))
	};

	let host = get_str("host")?;
	let port = config
		.get("port")
		.and_then(|v| v.as_integer())
		.unwrap_or(587) as u16;
	let username = get_str("username")?;
	let password = get_str("password")?;
	let from_address = get_str("from_address")?;

	Ok(Box::new(SmtpNotifier::new(
		&host,
		port,
		username,
		password,
		from_address,
	)?))
}
