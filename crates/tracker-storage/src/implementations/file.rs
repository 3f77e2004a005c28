//! File-backed store implementation for the tracker service.
//!
//! Each order is stored as one JSON document under the base directory,
//! named by its internal id. Writes go to a temp file and are renamed
//! into place. A process-wide read-write lock is the serialization
//! point: the conditional update (immutability guard plus mutation) runs
//! entirely under the write half, which honors the atomic
//! update-with-guard contract for a single authoritative store.

use crate::{apply_guarded, materialize, sort_newest_first, OrderStore, StoreError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracker_types::{NewOrder, Order, OrderPatch};

/// File-based store implementation.
pub struct FileStore {
	/// Base directory path for order documents.
	base_path: PathBuf,
	/// Serialization point for mutations.
	lock: RwLock<()>,
}

impl FileStore {
	/// Creates a new FileStore rooted at the given directory.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			lock: RwLock::new(()),
		}
	}

	/// Converts an internal order id to its document path.
	fn document_path(&self, id: &str) -> PathBuf {
		// Sanitize to be filesystem-safe; ids are uuids in practice.
		let safe = id.replace(['/', ':'], "_");
		self.base_path.join(format!("{}.json", safe))
	}

	async fn read_order(&self, id: &str) -> Result<Order, StoreError> {
		let path = self.document_path(id);
		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StoreError::NotFound)
			}
			Err(e) => return Err(StoreError::Backend(e.to_string())),
		};
		serde_json::from_slice(&data).map_err(|e| StoreError::Serialization(e.to_string()))
	}

	async fn write_order(&self, order: &Order) -> Result<(), StoreError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		let bytes =
			serde_json::to_vec_pretty(order).map_err(|e| StoreError::Serialization(e.to_string()))?;

		// Write atomically by writing to a temp file then renaming.
		let path = self.document_path(&order.id);
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		Ok(())
	}

	/// Loads every order document under the base directory.
	async fn read_all(&self) -> Result<Vec<Order>, StoreError> {
		let mut orders = Vec::new();
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			// A store that has never persisted anything is simply empty.
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(orders),
			Err(e) => return Err(StoreError::Backend(e.to_string())),
		};

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("json")) {
				continue;
			}
			match fs::read(&path).await {
				Ok(data) => match serde_json::from_slice::<Order>(&data) {
					Ok(order) => orders.push(order),
					Err(e) => {
						tracing::warn!("Skipping unreadable order document {:?}: {}", path, e);
					}
				},
				Err(e) => {
					tracing::warn!("Skipping order document {:?}: {}", path, e);
				}
			}
		}
		Ok(orders)
	}
}

#[async_trait]
impl OrderStore for FileStore {
	async fn create(&self, draft: NewOrder) -> Result<Order, StoreError> {
		let _guard = self.lock.write().await;
		let existing = self.read_all().await?;
		if existing
			.iter()
			.any(|o| o.human_order_id == draft.human_order_id)
		{
			return Err(StoreError::Duplicate(draft.human_order_id));
		}
		let order = materialize(draft);
		self.write_order(&order).await?;
		Ok(order)
	}

	async fn find_by_id(&self, id: &str) -> Result<Order, StoreError> {
		let _guard = self.lock.read().await;
		self.read_order(id).await
	}

	async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, StoreError> {
		let _guard = self.lock.read().await;
		let mut matches: Vec<Order> = self
			.read_all()
			.await?
			.into_iter()
			.filter(|o| o.customer_email == email)
			.collect();
		sort_newest_first(&mut matches);
		Ok(matches)
	}

	async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
		let _guard = self.lock.read().await;
		let mut all = self.read_all().await?;
		sort_newest_first(&mut all);
		Ok(all)
	}

	async fn update(&self, id: &str, patch: OrderPatch) -> Result<Order, StoreError> {
		// Guard check and rewrite happen under the same write guard.
		let _guard = self.lock.write().await;
		let mut order = self.read_order(id).await?;
		apply_guarded(&mut order, &patch)?;
		self.write_order(&order).await?;
		Ok(order)
	}
}

/// Factory function to create a file store from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for order documents (default: "./data/orders")
pub fn create_store(config: &toml::Value) -> Result<Box<dyn OrderStore>, StoreError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/orders")
		.to_string();

	Ok(Box::new(FileStore::new(PathBuf::from(storage_path))))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;
	use tracker_types::{LineItem, OrderStatus, StatusEntry};

	fn draft(human_id: &str) -> NewOrder {
		NewOrder {
			human_order_id: human_id.into(),
			customer_name: "Ada".into(),
			customer_email: "ada@example.com".into(),
			line_items: vec![LineItem {
				name: "Pen".into(),
				unit_price: dec!(10),
				quantity: 3,
			}],
		}
	}

	#[tokio::test]
	async fn orders_survive_a_round_trip_through_disk() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().to_path_buf());

		let order = store.create(draft("ORD-000001")).await.unwrap();
		let found = store.find_by_id(&order.id).await.unwrap();
		assert_eq!(found.human_order_id, "ORD-000001");
		assert_eq!(found.total_amount, dec!(30));
		assert_eq!(found.status, OrderStatus::PendingConfirmation);
	}

	#[tokio::test]
	async fn duplicate_human_id_is_rejected_across_documents() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().to_path_buf());

		store.create(draft("ORD-000001")).await.unwrap();
		let result = store.create(draft("ORD-000001")).await;
		assert!(matches!(result, Err(StoreError::Duplicate(_))));
	}

	#[tokio::test]
	async fn delivered_guard_holds_on_disk() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().to_path_buf());

		let order = store.create(draft("ORD-000001")).await.unwrap();
		store
			.update(
				&order.id,
				OrderPatch {
					status: Some(OrderStatus::Delivered),
					push_history: Some(StatusEntry {
						status: OrderStatus::Delivered,
						changed_by: "Admin".into(),
						timestamp: chrono::Utc::now(),
						note: "Confirmed -> Delivered".into(),
					}),
					..Default::default()
				},
			)
			.await
			.unwrap();

		let result = store
			.update(
				&order.id,
				OrderPatch {
					status: Some(OrderStatus::Returned),
					..Default::default()
				},
			)
			.await;
		assert!(matches!(result, Err(StoreError::Immutable)));

		let on_disk = store.find_by_id(&order.id).await.unwrap();
		assert_eq!(on_disk.status, OrderStatus::Delivered);
	}

	#[tokio::test]
	async fn missing_document_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().to_path_buf());
		let result = store.find_by_id("missing").await;
		assert!(matches!(result, Err(StoreError::NotFound)));
	}
}
