//! Event types for lifecycle fan-out.
//!
//! This module defines the events emitted by the lifecycle orchestrator
//! after a state change has been committed. Events flow through a
//! broadcast bus to currently-connected observers (dashboards,
//! customer-facing views); there is no persistence or replay, so a late
//! subscriber must catch up through the pull-based listing calls.

use crate::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Lifecycle events broadcast to all connected observers.
///
/// The serialized form tags each frame with an `event` discriminator so
/// transport-level consumers (e.g. the WebSocket stream) can dispatch
/// without knowing the Rust type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TrackerEvent {
	/// A new order was placed. Carries the full order so admin views
	/// can render it without a follow-up fetch.
	NewOrder {
		order: Order,
	},
	/// An order's status changed. `qr_generated` distinguishes the
	/// token-issue path from a plain manual transition.
	OrderUpdated {
		order_id: String,
		status: OrderStatus,
		#[serde(default)]
		qr_generated: bool,
	},
	/// An order was administrator-confirmed. Addressed by customer
	/// email so a customer view can pick up an order it did not yet
	/// know about.
	OrderConfirmed {
		customer_email: String,
		order: Order,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn events_are_tagged_for_transport() {
		let event = TrackerEvent::OrderUpdated {
			order_id: "abc".into(),
			status: OrderStatus::Shipped,
			qr_generated: false,
		};
		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["event"], "orderUpdated");
		assert_eq!(json["status"], "Shipped");
	}
}
