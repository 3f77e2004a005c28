//! Core lifecycle engine for the order tracker system.
//!
//! This module provides the orchestration logic that ties the store, the
//! verification token service and the notification collaborators
//! together: order creation, token-gated confirmation, validated status
//! transitions and event fan-out to connected observers.

pub mod event_bus;
pub mod lifecycle;
pub mod state;

pub use event_bus::EventBus;
pub use lifecycle::{Lifecycle, LifecycleError};
pub use state::TransitionError;
