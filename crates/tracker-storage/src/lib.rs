//! Storage module for the order tracker system.
//!
//! This module defines the store contract consumed by the lifecycle
//! orchestrator and provides backend implementations. The contract is
//! document-oriented: one order record per document, with per-record
//! atomic conditional updates. The `Delivered`-is-terminal guard lives
//! inside each backend's write-side critical section; it is a single
//! atomic check-and-mutate, never check-then-act across calls.

use async_trait::async_trait;
use chrono::Utc;
use tracker_types::{NewOrder, Order, OrderPatch, OrderStatus};
use thiserror::Error;
use uuid::Uuid;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The referenced order does not exist.
	#[error("Not found")]
	NotFound,
	/// A business identifier collided with an existing order.
	#[error("Duplicate key: {0}")]
	Duplicate(String),
	/// A mutation was attempted on a `Delivered` record.
	#[error("Order is delivered and immutable")]
	Immutable,
	/// A concurrent update lost the race at the backend. The bundled
	/// backends serialize writers in-process and never produce this;
	/// it is part of the contract for backends whose contention lives
	/// outside the process (a database, a shared volume).
	#[error("Conflict: {0}")]
	Conflict(String),
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the store contract for order records.
///
/// `update` must be atomic per record: the immutability guard and the
/// mutation happen in one step, so two concurrent callers can never both
/// observe a non-terminal state and both commit conflicting transitions.
#[async_trait]
pub trait OrderStore: Send + Sync {
	/// Persists a new order. The store assigns the internal id, the
	/// initial `PendingConfirmation` status, the derived total and the
	/// timestamps. Fails with `Duplicate` if the human order id is
	/// already taken by a stored order.
	async fn create(&self, draft: NewOrder) -> Result<Order, StoreError>;

	/// Retrieves an order by its internal id.
	async fn find_by_id(&self, id: &str) -> Result<Order, StoreError>;

	/// Retrieves all orders for a normalized customer email, newest first.
	async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, StoreError>;

	/// Retrieves all orders, newest first.
	async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

	/// Applies a patch to an order atomically. Fails with `NotFound` if
	/// the order does not exist and with `Immutable` if the record is
	/// `Delivered`, unless the patch only appends an audit note.
	async fn update(&self, id: &str, patch: OrderPatch) -> Result<Order, StoreError>;
}

/// Type alias for store factory functions.
///
/// This is the function signature that all store implementations must
/// provide to create instances of their backend from configuration.
pub type StoreFactory = fn(&toml::Value) -> Result<Box<dyn OrderStore>, StoreError>;

/// Get all registered store implementations.
///
/// Returns a vector of (name, factory) tuples for the available backends,
/// used by the service wiring to resolve the configured primary store.
pub fn get_all_implementations() -> Vec<(&'static str, StoreFactory)> {
	use implementations::{file, memory};

	vec![
		("file", file::create_store as StoreFactory),
		("memory", memory::create_store as StoreFactory),
	]
}

/// Materializes a draft into a full order record.
///
/// Shared by the backends so that id assignment, the initial status and
/// the derived total are computed identically everywhere.
pub(crate) fn materialize(draft: NewOrder) -> Order {
	let now = Utc::now();
	Order {
		id: Uuid::new_v4().to_string(),
		total_amount: Order::compute_total(&draft.line_items),
		human_order_id: draft.human_order_id,
		customer_name: draft.customer_name,
		customer_email: draft.customer_email,
		line_items: draft.line_items,
		status: OrderStatus::PendingConfirmation,
		status_history: Vec::new(),
		admin_confirmed: false,
		verification_token: None,
		verification_artifact: None,
		created_at: now,
		updated_at: now,
	}
}

/// Applies a patch under the immutability guard.
///
/// Must be called while the backend holds its write-side lock for the
/// record, so guard and mutation form one critical section.
pub(crate) fn apply_guarded(order: &mut Order, patch: &OrderPatch) -> Result<(), StoreError> {
	if order.status == OrderStatus::Delivered && !patch.is_audit_note_only() {
		return Err(StoreError::Immutable);
	}
	patch.apply(order);
	Ok(())
}

/// Sorts orders newest first, the ordering exposed by every listing call.
pub(crate) fn sort_newest_first(orders: &mut [Order]) {
	orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
