//! Lifecycle orchestrator.
//!
//! The façade consumed by the transport layer: creates orders, issues
//! verification tokens (confirming the order as a side effect), applies
//! validated status transitions, resolves presented tokens, and fans out
//! events after every committed state change. Outbound notification runs
//! after the commit and is fire-and-forget; its failure is logged and
//! never surfaced to the caller.

use crate::event_bus::EventBus;
use crate::state::{self, TransitionError};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracker_notify::OutboundNotifier;
use tracker_storage::{OrderStore, StoreError};
use tracker_token::{IssuedToken, TokenError, TokenService};
use tracker_types::{
	CustomerOrderView, LineItem, NewOrder, Order, OrderPatch, OrderStatus, TrackerEvent,
};

/// How many human-order-id regeneration attempts are made before the
/// collision surfaces to the caller.
const HUMAN_ID_ATTEMPTS: usize = 5;

/// Errors returned by the lifecycle orchestrator.
///
/// Each variant maps one-to-one onto the transport layer's response
/// taxonomy; nothing is retried internally.
#[derive(Debug, Error)]
pub enum LifecycleError {
	/// Malformed request data. Caller's fault.
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	/// The referenced order does not exist.
	#[error("Order not found")]
	NotFound,
	/// Business-id collision at creation.
	#[error("Duplicate order id: {0}")]
	Duplicate(String),
	/// Mutation attempted on a `Delivered` order.
	#[error("Order is delivered and immutable")]
	Immutable,
	/// The requested status is outside the allowed enumeration.
	#[error("Invalid status: {0}")]
	InvalidStatus(String),
	/// Token issuance or verification failure.
	#[error(transparent)]
	Token(TokenError),
	/// The backing store failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StoreError> for LifecycleError {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::NotFound => LifecycleError::NotFound,
			StoreError::Duplicate(id) => LifecycleError::Duplicate(id),
			StoreError::Immutable => LifecycleError::Immutable,
			other => LifecycleError::Storage(other.to_string()),
		}
	}
}

impl From<TokenError> for LifecycleError {
	fn from(e: TokenError) -> Self {
		match e {
			TokenError::NotFound => LifecycleError::NotFound,
			TokenError::Immutable => LifecycleError::Immutable,
			other => LifecycleError::Token(other),
		}
	}
}

impl From<TransitionError> for LifecycleError {
	fn from(e: TransitionError) -> Self {
		match e {
			TransitionError::Immutable => LifecycleError::Immutable,
			TransitionError::InvalidStatus(s) => LifecycleError::InvalidStatus(s),
		}
	}
}

/// Orchestrates the order lifecycle.
///
/// Each public operation is an independent unit of work against the
/// store; the store's per-record atomic update is the only
/// serialization point.
pub struct Lifecycle {
	store: Arc<dyn OrderStore>,
	tokens: Arc<TokenService>,
	notifier: Arc<dyn OutboundNotifier>,
	event_bus: EventBus,
}

impl Lifecycle {
	/// Creates a new lifecycle orchestrator.
	pub fn new(
		store: Arc<dyn OrderStore>,
		tokens: Arc<TokenService>,
		notifier: Arc<dyn OutboundNotifier>,
		event_bus: EventBus,
	) -> Self {
		Self {
			store,
			tokens,
			notifier,
			event_bus,
		}
	}

	/// Returns the event bus observers subscribe to.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Places a new order.
	///
	/// Validates input, normalizes the customer email, generates a
	/// unique human order id, persists with the derived total and the
	/// initial `PendingConfirmation` status, and emits `NewOrder`.
	pub async fn place_order(
		&self,
		customer_name: &str,
		customer_email: &str,
		line_items: Vec<LineItem>,
	) -> Result<Order, LifecycleError> {
		let customer_name = customer_name.trim();
		if customer_name.is_empty() {
			return Err(LifecycleError::InvalidInput(
				"customer name must not be empty".into(),
			));
		}
		let email = normalize_email(customer_email);
		if !is_valid_email(&email) {
			return Err(LifecycleError::InvalidInput(format!(
				"invalid customer email: {}",
				customer_email
			)));
		}
		validate_line_items(&line_items)?;

		// Uniqueness is a hard contract; collision handling is
		// regeneration, bounded so a pathological store still surfaces
		// the duplicate to the caller.
		let mut last_err = None;
		for _ in 0..HUMAN_ID_ATTEMPTS {
			let draft = NewOrder {
				human_order_id: generate_human_order_id(),
				customer_name: customer_name.to_string(),
				customer_email: email.clone(),
				line_items: line_items.clone(),
			};
			match self.store.create(draft).await {
				Ok(order) => {
					tracing::info!(
						order_id = %order.human_order_id,
						customer = %order.customer_email,
						"Order placed"
					);
					self.event_bus
						.publish(TrackerEvent::NewOrder {
							order: order.clone(),
						})
						.ok();
					return Ok(order);
				}
				Err(StoreError::Duplicate(id)) => {
					last_err = Some(LifecycleError::Duplicate(id));
				}
				Err(e) => return Err(e.into()),
			}
		}
		Err(last_err.unwrap_or(LifecycleError::Storage(
			"order creation failed".into(),
		)))
	}

	/// Issues a verification token and confirms the order.
	///
	/// Emits `OrderUpdated` and `OrderConfirmed` after the commit and
	/// triggers a fire-and-forget confirmation email. Notification
	/// failure never rolls back the state change.
	pub async fn confirm_with_qr(&self, order_id: &str) -> Result<IssuedToken, LifecycleError> {
		let issued = self.tokens.issue(order_id).await?;

		tracing::info!(
			order_id = %issued.order.human_order_id,
			"Order confirmed, verification token issued"
		);
		self.event_bus
			.publish(TrackerEvent::OrderUpdated {
				order_id: issued.order.id.clone(),
				status: OrderStatus::Confirmed,
				qr_generated: true,
			})
			.ok();
		self.event_bus
			.publish(TrackerEvent::OrderConfirmed {
				customer_email: issued.order.customer_email.clone(),
				order: issued.order.clone(),
			})
			.ok();

		self.notify_later(
			issued.order.customer_email.clone(),
			format!("Order {} confirmed", issued.order.human_order_id),
			format!(
				"Hi {},\n\nYour order {} (total {}) has been confirmed and is being prepared.\n",
				issued.order.customer_name,
				issued.order.human_order_id,
				issued.order.total_amount
			),
		);

		Ok(issued)
	}

	/// Applies a manual status transition.
	///
	/// The state machine validates the request; the store re-applies
	/// the immutability guard atomically at commit time. Emits
	/// `OrderUpdated` and a best-effort status email on success.
	pub async fn change_status(
		&self,
		order_id: &str,
		requested: &str,
		actor: &str,
	) -> Result<Order, LifecycleError> {
		let target = state::parse_requested(requested)?;
		let order = self.store.find_by_id(order_id).await?;
		state::check_transition(order.status)?;

		let patch = OrderPatch {
			status: Some(target),
			push_history: Some(state::transition_entry(order.status, target, actor)),
			..Default::default()
		};
		let updated = self.store.update(order_id, patch).await?;

		tracing::info!(
			order_id = %updated.human_order_id,
			from = %order.status,
			to = %target,
			actor = %actor,
			"Order status changed"
		);
		self.event_bus
			.publish(TrackerEvent::OrderUpdated {
				order_id: updated.id.clone(),
				status: target,
				qr_generated: false,
			})
			.ok();

		if !updated.customer_email.is_empty() {
			self.notify_later(
				updated.customer_email.clone(),
				format!("Order {} update", updated.human_order_id),
				format!(
					"Hi {},\n\nYour order {} is now: {}.\n",
					updated.customer_name, updated.human_order_id, target
				),
			);
		}

		Ok(updated)
	}

	/// Resolves a presented verification token to its order.
	pub async fn resolve_token(&self, token: &str) -> Result<CustomerOrderView, LifecycleError> {
		Ok(self.tokens.verify(token).await?)
	}

	/// Lists all orders, newest first.
	pub async fn list_orders(&self) -> Result<Vec<Order>, LifecycleError> {
		Ok(self.store.list_all().await?)
	}

	/// Lists a customer's orders, newest first.
	///
	/// Orders still awaiting administrator confirmation are excluded;
	/// an unconfirmed order is not shown to the customer.
	pub async fn orders_for_customer(
		&self,
		email: &str,
	) -> Result<Vec<Order>, LifecycleError> {
		let email = normalize_email(email);
		let orders = self.store.find_by_email(&email).await?;
		Ok(orders
			.into_iter()
			.filter(|o| o.status != OrderStatus::PendingConfirmation)
			.collect())
	}

	/// Spawns an outbound notification decoupled from the caller.
	///
	/// Runs after the state commit has already succeeded; failures are
	/// logged and swallowed because notification is advisory, not part
	/// of the order's authoritative state.
	fn notify_later(&self, to: String, subject: String, body: String) {
		let notifier = Arc::clone(&self.notifier);
		tokio::spawn(async move {
			if let Err(e) = notifier.send(&to, &subject, &body).await {
				tracing::warn!(to = %to, error = %e, "Outbound notification failed");
			}
		});
	}
}

/// Normalizes an email for storage and lookup.
fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

/// Basic email format validation: one `@`, non-empty local part, and a
/// dotted domain. Full RFC validation belongs to the mail relay.
fn is_valid_email(email: &str) -> bool {
	if email.is_empty() || email.chars().any(char::is_whitespace) {
		return false;
	}
	match email.split_once('@') {
		Some((local, domain)) => {
			!local.is_empty()
				&& !domain.is_empty()
				&& domain.contains('.')
				&& !domain.starts_with('.')
				&& !domain.ends_with('.')
		}
		None => false,
	}
}

/// Validates creation preconditions on the line items.
fn validate_line_items(line_items: &[LineItem]) -> Result<(), LifecycleError> {
	if line_items.is_empty() {
		return Err(LifecycleError::InvalidInput(
			"order must contain at least one line item".into(),
		));
	}
	for item in line_items {
		if item.name.trim().is_empty() {
			return Err(LifecycleError::InvalidInput(
				"line item name must not be empty".into(),
			));
		}
		if item.quantity < 1 {
			return Err(LifecycleError::InvalidInput(format!(
				"line item '{}' must have quantity of at least 1",
				item.name
			)));
		}
		if item.unit_price.is_sign_negative() {
			return Err(LifecycleError::InvalidInput(format!(
				"line item '{}' must not have a negative price",
				item.name
			)));
		}
	}
	Ok(())
}

/// Generates a six-digit human order id, e.g. "ORD-482913".
fn generate_human_order_id() -> String {
	let n: u32 = rand::rng().random_range(100_000..1_000_000);
	format!("ORD-{}", n)
}
