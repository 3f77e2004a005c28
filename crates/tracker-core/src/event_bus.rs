//! Event bus for lifecycle fan-out.
//!
//! A thin wrapper over a tokio broadcast channel. Delivery is best
//! effort: events reach the observers subscribed at emission time, there
//! is no persistence or replay, and publishing with zero subscribers is
//! not an error.

use tokio::sync::broadcast;
use tracker_types::TrackerEvent;

/// Default buffered capacity per subscriber.
const DEFAULT_CAPACITY: usize = 1000;

/// Broadcast bus carrying lifecycle events to connected observers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TrackerEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given per-subscriber capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the number of subscribers the event reached. The
	/// no-subscriber case is reported as an `Err` by the underlying
	/// channel; callers treat it as a non-event with `.ok()`.
	pub fn publish(
		&self,
		event: TrackerEvent,
	) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
		self.sender.send(event)
	}

	/// Subscribes to events published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_types::OrderStatus;

	#[tokio::test]
	async fn subscribers_receive_published_events() {
		let bus = EventBus::default();
		let mut receiver = bus.subscribe();

		bus.publish(TrackerEvent::OrderUpdated {
			order_id: "abc".into(),
			status: OrderStatus::Shipped,
			qr_generated: false,
		})
		.unwrap();

		match receiver.recv().await.unwrap() {
			TrackerEvent::OrderUpdated { order_id, status, .. } => {
				assert_eq!(order_id, "abc");
				assert_eq!(status, OrderStatus::Shipped);
			}
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[tokio::test]
	async fn publishing_without_subscribers_is_not_an_error_path() {
		let bus = EventBus::default();
		// The underlying channel reports no receivers; callers swallow it.
		let result = bus.publish(TrackerEvent::OrderUpdated {
			order_id: "abc".into(),
			status: OrderStatus::Shipped,
			qr_generated: false,
		});
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn late_subscribers_miss_earlier_events() {
		let bus = EventBus::default();
		let mut early = bus.subscribe();
		bus.publish(TrackerEvent::OrderUpdated {
			order_id: "first".into(),
			status: OrderStatus::Processing,
			qr_generated: false,
		})
		.unwrap();

		let mut late = bus.subscribe();
		assert!(early.recv().await.is_ok());
		assert!(matches!(
			late.try_recv(),
			Err(broadcast::error::TryRecvError::Empty)
		));
	}
}
