//! Order record types for the tracker system.
//!
//! This module defines the persisted order entity, its line items and
//! audit history, the status enumeration governing the lifecycle, and the
//! patch type used for atomic store updates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single purchased line within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
	/// Product name as entered at order time.
	pub name: String,
	/// Price per unit. Must be non-negative at creation.
	pub unit_price: Decimal,
	/// Number of units. Must be at least 1 at creation.
	pub quantity: u32,
}

impl LineItem {
	/// Returns the extended price for this line (`unit_price * quantity`).
	pub fn extended(&self) -> Decimal {
		self.unit_price * Decimal::from(self.quantity)
	}
}

/// One append-only audit entry recorded per accepted status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
	/// The status the order entered.
	pub status: OrderStatus,
	/// Caller-asserted actor label (e.g. "Admin").
	pub changed_by: String,
	/// When the transition was accepted.
	pub timestamp: DateTime<Utc>,
	/// Human-readable edge description, `"<old> -> <new>"`.
	pub note: String,
}

/// Status of an order in the tracker system.
///
/// `PendingConfirmation` is reachable only at creation and is never a
/// valid manual-transition target. `Delivered` makes the record
/// immutable. The side branches (`Cancelled`, `Returned`, `Refunded`,
/// `Failed`) are reachable from any non-terminal state after
/// confirmation; no forward-only ordering is enforced among the
/// happy-path states, mirroring the admin override capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
	/// Order has been placed but not yet confirmed by an administrator.
	PendingConfirmation,
	/// An administrator has confirmed the order (token issued).
	Confirmed,
	/// Order is being prepared.
	Processing,
	/// Order has been handed to the carrier.
	Shipped,
	/// Order is out for final delivery.
	OutForDelivery,
	/// Order has been delivered. The record is read-only from here.
	Delivered,
	/// Order was cancelled.
	Cancelled,
	/// Order was returned by the customer.
	Returned,
	/// Order was refunded.
	Refunded,
	/// Order fulfillment failed.
	Failed,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::PendingConfirmation => write!(f, "Pending Admin Confirmation"),
			OrderStatus::Confirmed => write!(f, "Confirmed"),
			OrderStatus::Processing => write!(f, "Processing"),
			OrderStatus::Shipped => write!(f, "Shipped"),
			OrderStatus::OutForDelivery => write!(f, "Out for Delivery"),
			OrderStatus::Delivered => write!(f, "Delivered"),
			OrderStatus::Cancelled => write!(f, "Cancelled"),
			OrderStatus::Returned => write!(f, "Returned"),
			OrderStatus::Refunded => write!(f, "Refunded"),
			OrderStatus::Failed => write!(f, "Failed"),
		}
	}
}

/// Error returned when a string matches no known order status.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
	type Err = ParseStatusError;

	/// Parses both the enum variant form ("OutForDelivery") and the
	/// human label form ("Out for Delivery") used by external displays.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"PendingConfirmation" | "Pending Admin Confirmation" => {
				Ok(OrderStatus::PendingConfirmation)
			}
			"Confirmed" => Ok(OrderStatus::Confirmed),
			"Processing" => Ok(OrderStatus::Processing),
			"Shipped" => Ok(OrderStatus::Shipped),
			"OutForDelivery" | "Out for Delivery" => Ok(OrderStatus::OutForDelivery),
			"Delivered" => Ok(OrderStatus::Delivered),
			"Cancelled" => Ok(OrderStatus::Cancelled),
			"Returned" => Ok(OrderStatus::Returned),
			"Refunded" => Ok(OrderStatus::Refunded),
			"Failed" => Ok(OrderStatus::Failed),
			other => Err(ParseStatusError(other.to_string())),
		}
	}
}

/// The persisted order entity.
///
/// `id` is assigned by the store at creation and never changes.
/// `total_amount` is derived from the line items and recomputed on every
/// persist; it is an invariant, not an input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Opaque unique identifier assigned by the store.
	pub id: String,
	/// Short unique business identifier, e.g. "ORD-482913".
	pub human_order_id: String,
	/// Name of the purchaser.
	pub customer_name: String,
	/// Purchaser email, lower-cased and trimmed at creation. Used as
	/// the lookup key for "orders by customer".
	pub customer_email: String,
	/// Ordered, non-empty sequence of purchased lines.
	pub line_items: Vec<LineItem>,
	/// Derived sum over line items.
	pub total_amount: Decimal,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Append-only audit trail, one entry per accepted transition.
	#[serde(default)]
	pub status_history: Vec<StatusEntry>,
	/// Whether an administrator has confirmed this order.
	#[serde(default)]
	pub admin_confirmed: bool,
	/// Most recently issued verification token, if any. A presented
	/// token must match this exactly; issuing a new one invalidates
	/// the previous generation.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verification_token: Option<String>,
	/// Opaque rendering of the verification URL, if a token was issued.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verification_artifact: Option<String>,
	/// When the order was created.
	pub created_at: DateTime<Utc>,
	/// When the order was last persisted.
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Computes the order total from a set of line items.
	pub fn compute_total(line_items: &[LineItem]) -> Decimal {
		line_items.iter().map(LineItem::extended).sum()
	}

	/// Returns the customer-safe projection of this order.
	pub fn customer_view(&self) -> CustomerOrderView {
		CustomerOrderView {
			human_order_id: self.human_order_id.clone(),
			customer_name: self.customer_name.clone(),
			customer_email: self.customer_email.clone(),
			line_items: self.line_items.clone(),
			total_amount: self.total_amount,
			status: self.status,
			status_history: self.status_history.clone(),
			created_at: self.created_at,
		}
	}
}

/// Input for creating an order. The store assigns `id`, timestamps and
/// the initial `PendingConfirmation` status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
	/// Pre-generated business identifier; uniqueness is enforced by the store.
	pub human_order_id: String,
	/// Name of the purchaser.
	pub customer_name: String,
	/// Normalized purchaser email.
	pub customer_email: String,
	/// Non-empty purchased lines.
	pub line_items: Vec<LineItem>,
}

/// A partial update applied atomically by the store.
///
/// Fields left as `None` are untouched. A patch whose only content is a
/// history append is an "audit note" patch, the one mutation a
/// `Delivered` record still accepts.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
	/// New status, if the patch carries a transition.
	pub status: Option<OrderStatus>,
	/// History entry to append.
	pub push_history: Option<StatusEntry>,
	/// Replacement verification token.
	pub verification_token: Option<String>,
	/// Replacement verification artifact.
	pub verification_artifact: Option<String>,
	/// New administrator-confirmed flag.
	pub admin_confirmed: Option<bool>,
}

impl OrderPatch {
	/// Returns true if this patch only appends to the audit history.
	pub fn is_audit_note_only(&self) -> bool {
		self.push_history.is_some()
			&& self.status.is_none()
			&& self.verification_token.is_none()
			&& self.verification_artifact.is_none()
			&& self.admin_confirmed.is_none()
	}

	/// Applies this patch to an order in place.
	///
	/// The store calls this inside its write-side critical section so
	/// that guard check and mutation are one atomic step. The derived
	/// total is recomputed here so a persisted record can never drift
	/// from its line items.
	pub fn apply(&self, order: &mut Order) {
		if let Some(status) = self.status {
			order.status = status;
		}
		if let Some(entry) = &self.push_history {
			order.status_history.push(entry.clone());
		}
		if let Some(token) = &self.verification_token {
			order.verification_token = Some(token.clone());
		}
		if let Some(artifact) = &self.verification_artifact {
			order.verification_artifact = Some(artifact.clone());
		}
		if let Some(confirmed) = self.admin_confirmed {
			order.admin_confirmed = confirmed;
		}
		order.total_amount = Order::compute_total(&order.line_items);
		order.updated_at = Utc::now();
	}
}

/// Customer-facing projection of an order.
///
/// Returned by token verification; excludes the internal id, the stored
/// token and the rendered artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerOrderView {
	#[serde(rename = "orderId")]
	pub human_order_id: String,
	#[serde(rename = "customerName")]
	pub customer_name: String,
	#[serde(rename = "customerEmail")]
	pub customer_email: String,
	#[serde(rename = "lineItems")]
	pub line_items: Vec<LineItem>,
	#[serde(rename = "totalAmount")]
	pub total_amount: Decimal,
	pub status: OrderStatus,
	#[serde(rename = "statusHistory")]
	pub status_history: Vec<StatusEntry>,
	#[serde(rename = "createdAt")]
	pub created_at: DateTime<Utc>,
}
