//! Verification token service for the order tracker system.
//!
//! Binds a single order to a time-boxed confirmation capability and
//! resolves a presented capability back to that order, rejecting
//! forgeries, stale generations and expired tokens. Tokens are signed
//! with HMAC-SHA256 over a base64url JSON claims segment; the signing
//! secret is injected at construction and its absence is a hard failure,
//! never a fallback default.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracker_storage::{OrderStore, StoreError};
use tracker_types::{CustomerOrderView, Order, OrderPatch, OrderStatus, StatusEntry};
use uuid::Uuid;

pub mod renderer;

pub use renderer::{ArtifactRenderer, DataUrlRenderer};

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur during token issuance and verification.
///
/// The verification variants are deliberately distinct so callers can
/// give precise feedback: a forged token is `InvalidSignature`, a token
/// past its window is `Expired`, and a superseded generation is `Stale`.
#[derive(Debug, Error)]
pub enum TokenError {
	/// The signing secret is absent or empty. Operational fault.
	#[error("Signing secret is not configured")]
	Misconfigured,
	/// The token signature does not validate against the secret.
	#[error("Invalid token signature")]
	InvalidSignature,
	/// The token is past its validity window.
	#[error("Token has expired")]
	Expired,
	/// The token was superseded by a newer generation for this order.
	#[error("Token has been superseded")]
	Stale,
	/// The referenced order does not exist.
	#[error("Order not found")]
	NotFound,
	/// The order record is delivered and immutable.
	#[error("Order is delivered and immutable")]
	Immutable,
	/// The artifact renderer failed.
	#[error("Artifact rendering failed: {0}")]
	Render(String),
	/// The backing store failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

fn map_store_error(e: StoreError) -> TokenError {
	match e {
		StoreError::NotFound => TokenError::NotFound,
		StoreError::Immutable => TokenError::Immutable,
		other => TokenError::Storage(other.to_string()),
	}
}

/// Signed claims carried inside a verification token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
	/// Internal id of the bound order.
	order_id: String,
	/// Customer identity at issuance time.
	email: String,
	/// Issuance timestamp, unix seconds.
	issued_at: u64,
	/// Unique issuance id. Timestamps have one-second resolution, so
	/// without this two back-to-back issuances would mint identical
	/// tokens and the superseded one would still verify.
	jti: String,
}

/// Result of issuing a verification token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
	/// The signed token string.
	pub token: String,
	/// Rendered verification artifact (scannable payload).
	pub artifact: String,
	/// The order after the Confirmed transition.
	pub order: Order,
}

/// Issues and verifies signed, expiring verification tokens.
///
/// The service holds the signing secret for the process lifetime; it is
/// loaded once at construction and treated as immutable thereafter.
pub struct TokenService {
	secret: SecretString,
	validity: Duration,
	base_url: String,
	store: Arc<dyn OrderStore>,
	renderer: Arc<dyn ArtifactRenderer>,
}

impl TokenService {
	/// Default validity window for issued tokens: 2 days.
	pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(2 * 24 * 60 * 60);

	/// Creates a new token service.
	///
	/// Fails with `Misconfigured` if the secret is empty. A guessable
	/// default secret would defeat the capability guarantee, so there
	/// is no fallback.
	pub fn new(
		secret: SecretString,
		validity: Duration,
		base_url: String,
		store: Arc<dyn OrderStore>,
		renderer: Arc<dyn ArtifactRenderer>,
	) -> Result<Self, TokenError> {
		if secret.expose_secret().is_empty() {
			return Err(TokenError::Misconfigured);
		}
		Ok(Self {
			secret,
			validity,
			base_url,
			store,
			renderer,
		})
	}

	fn mac(&self) -> Result<HmacSha256, TokenError> {
		HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
			.map_err(|_| TokenError::Misconfigured)
	}

	/// Mints a signed token for the given claims.
	fn mint(&self, claims: &TokenClaims) -> Result<String, TokenError> {
		let payload = URL_SAFE_NO_PAD.encode(
			serde_json::to_vec(claims).map_err(|e| TokenError::Storage(e.to_string()))?,
		);
		let mut mac = self.mac()?;
		mac.update(payload.as_bytes());
		let signature = hex::encode(mac.finalize().into_bytes());
		Ok(format!("{}.{}", payload, signature))
	}

	/// Issues a fresh token for an order and commits the Confirmed
	/// transition.
	///
	/// Replaces any previously issued token (single generation), marks
	/// the order administrator-confirmed and appends the matching
	/// history entry. Token fields and status change are one patch, so
	/// partial application is impossible.
	pub async fn issue(&self, order_id: &str) -> Result<IssuedToken, TokenError> {
		let order = self
			.store
			.find_by_id(order_id)
			.await
			.map_err(map_store_error)?;

		let claims = TokenClaims {
			order_id: order.id.clone(),
			email: order.customer_email.clone(),
			issued_at: Utc::now().timestamp() as u64,
			jti: Uuid::new_v4().to_string(),
		};
		let token = self.mint(&claims)?;

		let url = format!(
			"{}/scan/{}",
			self.base_url.trim_end_matches('/'),
			token
		);
		let artifact = self
			.renderer
			.render(&url)
			.await
			.map_err(|e| TokenError::Render(e.to_string()))?;

		let patch = OrderPatch {
			status: Some(OrderStatus::Confirmed),
			push_history: Some(StatusEntry {
				status: OrderStatus::Confirmed,
				changed_by: "Admin".into(),
				timestamp: Utc::now(),
				note: format!("{} -> {}", order.status, OrderStatus::Confirmed),
			}),
			verification_token: Some(token.clone()),
			verification_artifact: Some(artifact.clone()),
			admin_confirmed: Some(true),
		};
		let updated = self
			.store
			.update(order_id, patch)
			.await
			.map_err(map_store_error)?;

		Ok(IssuedToken {
			token,
			artifact,
			order: updated,
		})
	}

	/// Verifies a presented token and resolves it to the bound order.
	///
	/// Checks run in a fixed order: signature, expiry, order existence,
	/// staleness. Signature and expiry come before the staleness check
	/// so a forged token learns only "invalid", never "stale".
	pub async fn verify(&self, token: &str) -> Result<CustomerOrderView, TokenError> {
		let (payload, signature) = token
			.split_once('.')
			.ok_or(TokenError::InvalidSignature)?;

		let signature_bytes =
			hex::decode(signature).map_err(|_| TokenError::InvalidSignature)?;
		let mut mac = self.mac()?;
		mac.update(payload.as_bytes());
		mac.verify_slice(&signature_bytes)
			.map_err(|_| TokenError::InvalidSignature)?;

		let claims_bytes = URL_SAFE_NO_PAD
			.decode(payload)
			.map_err(|_| TokenError::InvalidSignature)?;
		let claims: TokenClaims =
			serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::InvalidSignature)?;

		let now = Utc::now().timestamp() as u64;
		if now >= claims.issued_at.saturating_add(self.validity.as_secs()) {
			return Err(TokenError::Expired);
		}

		let order = self
			.store
			.find_by_id(&claims.order_id)
			.await
			.map_err(map_store_error)?;

		// Single-generation invariant: only the most recently stored
		// token is honored, even if this one is cryptographically valid.
		if order.verification_token.as_deref() != Some(token) {
			return Err(TokenError::Stale);
		}

		Ok(order.customer_view())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;
	use tracker_storage::implementations::memory::MemoryStore;
	use tracker_types::{LineItem, NewOrder};

	async fn seeded_store() -> (Arc<dyn OrderStore>, Order) {
		let store = Arc::new(MemoryStore::new());
		let order = store
			.create(NewOrder {
				human_order_id: "ORD-000001".into(),
				customer_name: "Ada".into(),
				customer_email: "ada@example.com".into(),
				line_items: vec![LineItem {
					name: "Pen".into(),
					unit_price: dec!(10),
					quantity: 3,
				}],
			})
			.await
			.unwrap();
		(store, order)
	}

	fn service(store: Arc<dyn OrderStore>, validity: Duration) -> TokenService {
		TokenService::new(
			SecretString::from("unit-test-secret"),
			validity,
			"http://localhost:3000".into(),
			store,
			Arc::new(DataUrlRenderer),
		)
		.unwrap()
	}

	#[test]
	fn empty_secret_is_a_hard_failure() {
		let store: Arc<dyn OrderStore> = Arc::new(MemoryStore::new());
		let result = TokenService::new(
			SecretString::from(""),
			TokenService::DEFAULT_VALIDITY,
			"http://localhost:3000".into(),
			store,
			Arc::new(DataUrlRenderer),
		);
		assert!(matches!(result, Err(TokenError::Misconfigured)));
	}

	#[tokio::test]
	async fn issue_then_verify_round_trips() {
		let (store, order) = seeded_store().await;
		let service = service(store, TokenService::DEFAULT_VALIDITY);

		let issued = service.issue(&order.id).await.unwrap();
		assert_eq!(issued.order.status, OrderStatus::Confirmed);
		assert!(issued.order.admin_confirmed);
		assert_eq!(issued.order.status_history.len(), 1);
		assert_eq!(
			issued.order.status_history[0].note,
			"Pending Admin Confirmation -> Confirmed"
		);
		assert!(issued.artifact.starts_with("data:"));

		let view = service.verify(&issued.token).await.unwrap();
		assert_eq!(view.status, OrderStatus::Confirmed);
		assert_eq!(view.human_order_id, "ORD-000001");
	}

	#[tokio::test]
	async fn reissue_invalidates_the_previous_generation() {
		let (store, order) = seeded_store().await;
		let service = service(store, TokenService::DEFAULT_VALIDITY);

		// Back-to-back issuances land in the same second; the jti claim
		// still makes each generation distinct.
		let first = service.issue(&order.id).await.unwrap();
		let second = service.issue(&order.id).await.unwrap();
		assert_ne!(first.token, second.token);

		let result = service.verify(&first.token).await;
		assert!(matches!(result, Err(TokenError::Stale)));
		assert!(service.verify(&second.token).await.is_ok());
	}

	#[tokio::test]
	async fn expired_token_fails_even_with_valid_signature() {
		let (store, order) = seeded_store().await;
		let service = service(store, Duration::ZERO);

		let issued = service.issue(&order.id).await.unwrap();
		let result = service.verify(&issued.token).await;
		assert!(matches!(result, Err(TokenError::Expired)));
	}

	#[tokio::test]
	async fn forged_token_reports_invalid_signature() {
		let (store, order) = seeded_store().await;
		let service = service(store, TokenService::DEFAULT_VALIDITY);

		let issued = service.issue(&order.id).await.unwrap();
		let (payload, _) = issued.token.split_once('.').unwrap();
		let forged = format!("{}.{}", payload, hex::encode([0u8; 32]));

		let result = service.verify(&forged).await;
		assert!(matches!(result, Err(TokenError::InvalidSignature)));

		let garbage = service.verify("not-a-token").await;
		assert!(matches!(garbage, Err(TokenError::InvalidSignature)));
	}

	#[tokio::test]
	async fn signature_check_precedes_staleness() {
		let (store, order) = seeded_store().await;
		let service = service(store, TokenService::DEFAULT_VALIDITY);

		let first = service.issue(&order.id).await.unwrap();
		service.issue(&order.id).await.unwrap();

		// A tampered copy of the superseded token must report invalid,
		// not stale, to avoid leaking generation state to forgers.
		let (payload, _) = first.token.split_once('.').unwrap();
		let forged = format!("{}.{}", payload, hex::encode([0u8; 32]));
		let result = service.verify(&forged).await;
		assert!(matches!(result, Err(TokenError::InvalidSignature)));
	}

	#[tokio::test]
	async fn token_for_missing_order_is_not_found() {
		let (store, _) = seeded_store().await;
		let service = service(store, TokenService::DEFAULT_VALIDITY);

		let token = service
			.mint(&TokenClaims {
				order_id: "no-such-order".into(),
				email: "ada@example.com".into(),
				issued_at: Utc::now().timestamp() as u64,
				jti: Uuid::new_v4().to_string(),
			})
			.unwrap();
		let result = service.verify(&token).await;
		assert!(matches!(result, Err(TokenError::NotFound)));
	}
}
