//! In-memory store backend for the tracker service.
//!
//! This module provides a memory-based implementation of the OrderStore
//! trait, useful for testing and development scenarios where persistence
//! is not required. All mutations run under a single write lock, which
//! makes the conditional update trivially atomic.

use crate::{apply_guarded, materialize, sort_newest_first, OrderStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracker_types::{NewOrder, Order, OrderPatch};

/// In-memory store implementation.
///
/// Orders are held in a HashMap keyed by internal id, protected by a
/// read-write lock. No persistence across restarts.
pub struct MemoryStore {
	orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl MemoryStore {
	/// Creates a new MemoryStore instance.
	pub fn new() -> Self {
		Self {
			orders: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl OrderStore for MemoryStore {
	async fn create(&self, draft: NewOrder) -> Result<Order, StoreError> {
		let mut orders = self.orders.write().await;
		if orders
			.values()
			.any(|o| o.human_order_id == draft.human_order_id)
		{
			return Err(StoreError::Duplicate(draft.human_order_id));
		}
		let order = materialize(draft);
		orders.insert(order.id.clone(), order.clone());
		Ok(order)
	}

	async fn find_by_id(&self, id: &str) -> Result<Order, StoreError> {
		let orders = self.orders.read().await;
		orders.get(id).cloned().ok_or(StoreError::NotFound)
	}

	async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, StoreError> {
		let orders = self.orders.read().await;
		let mut matches: Vec<Order> = orders
			.values()
			.filter(|o| o.customer_email == email)
			.cloned()
			.collect();
		sort_newest_first(&mut matches);
		Ok(matches)
	}

	async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
		let orders = self.orders.read().await;
		let mut all: Vec<Order> = orders.values().cloned().collect();
		sort_newest_first(&mut all);
		Ok(all)
	}

	async fn update(&self, id: &str, patch: OrderPatch) -> Result<Order, StoreError> {
		let mut orders = self.orders.write().await;
		let order = orders.get_mut(id).ok_or(StoreError::NotFound)?;
		apply_guarded(order, &patch)?;
		Ok(order.clone())
	}
}

/// Factory function to create a memory store from configuration.
///
/// Configuration parameters:
/// - None required for the memory backend
pub fn create_store(_config: &toml::Value) -> Result<Box<dyn OrderStore>, StoreError> {
	Ok(Box::new(MemoryStore::new()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;
	use tracker_types::{LineItem, OrderStatus, StatusEntry};

	fn draft(human_id: &str, email: &str) -> NewOrder {
		NewOrder {
			human_order_id: human_id.into(),
			customer_name: "Ada".into(),
			customer_email: email.into(),
			line_items: vec![LineItem {
				name: "Pen".into(),
				unit_price: dec!(10),
				quantity: 3,
			}],
		}
	}

	fn entry(status: OrderStatus, note: &str) -> StatusEntry {
		StatusEntry {
			status,
			changed_by: "Admin".into(),
			timestamp: chrono::Utc::now(),
			note: note.into(),
		}
	}

	#[tokio::test]
	async fn create_assigns_identity_and_total() {
		let store = MemoryStore::new();
		let order = store
			.create(draft("ORD-000001", "ada@example.com"))
			.await
			.unwrap();

		assert!(!order.id.is_empty());
		assert_eq!(order.status, OrderStatus::PendingConfirmation);
		assert_eq!(order.total_amount, dec!(30));
		assert!(order.status_history.is_empty());

		let found = store.find_by_id(&order.id).await.unwrap();
		assert_eq!(found.human_order_id, "ORD-000001");
	}

	#[tokio::test]
	async fn create_rejects_duplicate_human_id() {
		let store = MemoryStore::new();
		store
			.create(draft("ORD-000001", "ada@example.com"))
			.await
			.unwrap();
		let result = store.create(draft("ORD-000001", "bob@example.com")).await;
		assert!(matches!(result, Err(StoreError::Duplicate(_))));
	}

	#[tokio::test]
	async fn delivered_record_rejects_everything_but_audit_notes() {
		let store = MemoryStore::new();
		let order = store
			.create(draft("ORD-000001", "ada@example.com"))
			.await
			.unwrap();

		store
			.update(
				&order.id,
				OrderPatch {
					status: Some(OrderStatus::Delivered),
					push_history: Some(entry(OrderStatus::Delivered, "Confirmed -> Delivered")),
					..Default::default()
				},
			)
			.await
			.unwrap();

		// Transition attempts are rejected.
		let result = store
			.update(
				&order.id,
				OrderPatch {
					status: Some(OrderStatus::Returned),
					push_history: Some(entry(OrderStatus::Returned, "Delivered -> Returned")),
					..Default::default()
				},
			)
			.await;
		assert!(matches!(result, Err(StoreError::Immutable)));

		let unchanged = store.find_by_id(&order.id).await.unwrap();
		assert_eq!(unchanged.status, OrderStatus::Delivered);
		assert_eq!(unchanged.status_history.len(), 1);

		// An audit-note-only patch is still accepted.
		let noted = store
			.update(
				&order.id,
				OrderPatch {
					push_history: Some(entry(OrderStatus::Delivered, "left at front desk")),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(noted.status_history.len(), 2);
		assert_eq!(noted.status, OrderStatus::Delivered);
	}

	#[tokio::test]
	async fn listings_are_newest_first_and_email_scoped() {
		let store = MemoryStore::new();
		let first = store
			.create(draft("ORD-000001", "ada@example.com"))
			.await
			.unwrap();
		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
		let second = store
			.create(draft("ORD-000002", "ada@example.com"))
			.await
			.unwrap();
		store
			.create(draft("ORD-000003", "bob@example.com"))
			.await
			.unwrap();

		let all = store.list_all().await.unwrap();
		assert_eq!(all.len(), 3);

		let ada = store.find_by_email("ada@example.com").await.unwrap();
		assert_eq!(ada.len(), 2);
		assert_eq!(ada[0].id, second.id);
		assert_eq!(ada[1].id, first.id);
	}

	#[tokio::test]
	async fn update_missing_order_is_not_found() {
		let store = MemoryStore::new();
		let result = store.update("nope", OrderPatch::default()).await;
		assert!(matches!(result, Err(StoreError::NotFound)));
	}
}
