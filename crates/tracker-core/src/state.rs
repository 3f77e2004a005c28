//! Order status state machine.
//!
//! Pure transition logic: which statuses are legal targets, when a
//! record refuses further transitions, and the audit entry appended per
//! accepted edge. The machine is deliberately permissive among the
//! non-terminal states (an administrator may jump, e.g. Confirmed
//! directly to Delivered); the only hard gates are that
//! `PendingConfirmation` is never a manual target and that `Delivered`
//! records are immutable.

use chrono::Utc;
use thiserror::Error;
use tracker_types::{OrderStatus, StatusEntry};

/// Errors produced by transition validation.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
	/// The record is `Delivered` and accepts no further transitions.
	#[error("Order is delivered and immutable")]
	Immutable,
	/// The requested value is not a legal transition target.
	#[error("Invalid status: {0}")]
	InvalidStatus(String),
}

/// Parses a caller-supplied status into a legal transition target.
///
/// Accepts every enumerated status except `PendingConfirmation`, which
/// is reachable only at creation.
pub fn parse_requested(requested: &str) -> Result<OrderStatus, TransitionError> {
	let status: OrderStatus = requested
		.parse()
		.map_err(|_| TransitionError::InvalidStatus(requested.to_string()))?;
	if status == OrderStatus::PendingConfirmation {
		return Err(TransitionError::InvalidStatus(requested.to_string()));
	}
	Ok(status)
}

/// Validates a transition from the current status.
///
/// This is the advisory check used before building a patch; the store
/// re-applies the same guard atomically inside its critical section, so
/// a concurrent writer can never slip past it.
pub fn check_transition(current: OrderStatus) -> Result<(), TransitionError> {
	if current == OrderStatus::Delivered {
		return Err(TransitionError::Immutable);
	}
	Ok(())
}

/// Builds the audit entry recorded for an accepted transition.
pub fn transition_entry(from: OrderStatus, to: OrderStatus, actor: &str) -> StatusEntry {
	StatusEntry {
		status: to,
		changed_by: actor.to_string(),
		timestamp: Utc::now(),
		note: format!("{} -> {}", from, to),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_non_initial_status_is_a_legal_target() {
		for name in [
			"Confirmed",
			"Processing",
			"Shipped",
			"OutForDelivery",
			"Delivered",
			"Cancelled",
			"Returned",
			"Refunded",
			"Failed",
		] {
			assert!(parse_requested(name).is_ok(), "{} should parse", name);
		}
	}

	#[test]
	fn pending_confirmation_is_never_a_manual_target() {
		assert_eq!(
			parse_requested("PendingConfirmation"),
			Err(TransitionError::InvalidStatus(
				"PendingConfirmation".to_string()
			))
		);
	}

	#[test]
	fn unknown_status_is_rejected() {
		assert!(matches!(
			parse_requested("NotARealStatus"),
			Err(TransitionError::InvalidStatus(_))
		));
	}

	#[test]
	fn delivered_blocks_all_transitions() {
		assert_eq!(
			check_transition(OrderStatus::Delivered),
			Err(TransitionError::Immutable)
		);
	}

	#[test]
	fn backward_jumps_are_allowed_before_delivery() {
		// Admin override: no forward-only ordering is enforced.
		assert!(check_transition(OrderStatus::Shipped).is_ok());
		assert!(parse_requested("Processing").is_ok());
	}

	#[test]
	fn entry_notes_describe_the_edge() {
		let entry = transition_entry(OrderStatus::Shipped, OrderStatus::OutForDelivery, "Admin");
		assert_eq!(entry.note, "Shipped -> Out for Delivery");
		assert_eq!(entry.changed_by, "Admin");
		assert_eq!(entry.status, OrderStatus::OutForDelivery);
	}
}
