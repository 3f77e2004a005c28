//! Common types module for the order tracker system.
//!
//! This module defines the core data types and structures used throughout
//! the tracker system. It provides a centralized location for shared types
//! to ensure consistency across all tracker components.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Event types for lifecycle fan-out to observers.
pub mod events;
/// Order record types: line items, status, history and patches.
pub mod order;

// Re-export all types for convenient access
pub use api::*;
pub use events::*;
pub use order::*;
