//! API types for the tracker HTTP surface.
//!
//! This module defines the request and response types consumed by the
//! transport layer, plus the structured error type that maps the
//! subsystem's error taxonomy onto HTTP status codes.

use crate::{LineItem, Order};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request for placing a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
	#[serde(rename = "customerName")]
	pub customer_name: String,
	#[serde(rename = "customerEmail")]
	pub customer_email: String,
	#[serde(rename = "lineItems")]
	pub line_items: Vec<LineItem>,
}

/// Request for a manual status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
	/// Requested status, either variant or display form.
	pub status: String,
	/// Actor label recorded in the audit history. Defaults to "Admin".
	#[serde(rename = "changedBy", default = "default_actor")]
	pub changed_by: String,
}

fn default_actor() -> String {
	"Admin".to_string()
}

/// Response for the confirm-with-QR operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResponse {
	/// Rendered verification artifact (scannable payload).
	pub qr: String,
	/// The order after the Confirmed transition.
	pub order: Order,
}

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code.
	pub error: String,
	/// Human-readable description.
	pub message: String,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Malformed request data (400).
	BadRequest { error_type: String, message: String },
	/// Token verification failure (401).
	Unauthorized { error_type: String, message: String },
	/// Mutation attempted on an immutable record (403).
	Forbidden { error_type: String, message: String },
	/// Referenced order or token absent (404).
	NotFound { error_type: String, message: String },
	/// Business-id collision or lost update race (409).
	Conflict { error_type: String, message: String },
	/// Operational fault or unexpected failure (500).
	InternalServerError { error_type: String, message: String },
}

impl ApiError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::Unauthorized { .. } => 401,
			ApiError::Forbidden { .. } => 403,
			ApiError::NotFound { .. } => 404,
			ApiError::Conflict { .. } => 409,
			ApiError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = match self {
			ApiError::BadRequest {
				error_type,
				message,
			}
			| ApiError::Unauthorized {
				error_type,
				message,
			}
			| ApiError::Forbidden {
				error_type,
				message,
			}
			| ApiError::NotFound {
				error_type,
				message,
			}
			| ApiError::Conflict {
				error_type,
				message,
			}
			| ApiError::InternalServerError {
				error_type,
				message,
			} => (error_type, message),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", response.error, self.status_code(), response.message)
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
