//! HTTP server for the order tracker API.
//!
//! Exposes the lifecycle operations over REST plus a WebSocket stream
//! of lifecycle events for live dashboards.

use axum::{
	extract::{
		ws::{Message, WebSocket},
		Path, State, WebSocketUpgrade,
	},
	http::StatusCode,
	response::{IntoResponse, Json},
	routing::{get, post, put},
	Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracker_config::ApiConfig;
use tracker_core::{Lifecycle, LifecycleError};
use tracker_token::TokenError;
use tracker_types::{
	ApiError, ChangeStatusRequest, ConfirmResponse, CustomerOrderView, Order, PlaceOrderRequest,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the lifecycle orchestrator for processing requests.
	pub lifecycle: Arc<Lifecycle>,
}

/// Starts the HTTP server for the API.
///
/// This function creates and configures the HTTP server with routing,
/// middleware, and error handling for the tracker endpoints.
pub async fn start_server(
	api_config: ApiConfig,
	lifecycle: Arc<Lifecycle>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { lifecycle };

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(handle_place_order).get(handle_list_orders))
				.route("/orders/{id}/qrcode", put(handle_confirm_with_qr))
				.route("/orders/verify/{token}", get(handle_verify_token))
				.route("/orders/status/{id}", put(handle_change_status))
				.route("/orders/customer/{email}", get(handle_customer_orders))
				.route("/events", get(handle_events)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Order tracker API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/orders requests.
///
/// Places a new order; the response carries the persisted record with
/// its generated ids and derived total.
async fn handle_place_order(
	State(state): State<AppState>,
	Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
	let order = state
		.lifecycle
		.place_order(
			&request.customer_name,
			&request.customer_email,
			request.line_items,
		)
		.await
		.map_err(api_error)?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders requests. Administrative listing, newest first.
async fn handle_list_orders(
	State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
	let orders = state.lifecycle.list_orders().await.map_err(api_error)?;
	Ok(Json(orders))
}

/// Handles PUT /api/orders/{id}/qrcode requests.
///
/// Confirms the order and issues its verification token; the rendered
/// artifact in the response is what gets handed to the customer.
async fn handle_confirm_with_qr(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<ConfirmResponse>, ApiError> {
	let issued = state
		.lifecycle
		.confirm_with_qr(&id)
		.await
		.map_err(api_error)?;
	Ok(Json(ConfirmResponse {
		qr: issued.artifact,
		order: issued.order,
	}))
}

/// Handles GET /api/orders/verify/{token} requests.
///
/// Resolves a presented token to a customer-facing view of its order.
async fn handle_verify_token(
	Path(token): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<CustomerOrderView>, ApiError> {
	let view = state
		.lifecycle
		.resolve_token(&token)
		.await
		.map_err(api_error)?;
	Ok(Json(view))
}

/// Handles PUT /api/orders/status/{id} requests.
async fn handle_change_status(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<Order>, ApiError> {
	let order = state
		.lifecycle
		.change_status(&id, &request.status, &request.changed_by)
		.await
		.map_err(api_error)?;
	Ok(Json(order))
}

/// Handles GET /api/orders/customer/{email} requests.
async fn handle_customer_orders(
	Path(email): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
	let orders = state
		.lifecycle
		.orders_for_customer(&email)
		.await
		.map_err(api_error)?;
	Ok(Json(orders))
}

/// Handles GET /api/events requests.
///
/// Upgrades to a WebSocket and streams every lifecycle event published
/// after the subscription as a JSON text frame.
async fn handle_events(
	State(state): State<AppState>,
	ws: WebSocketUpgrade,
) -> impl IntoResponse {
	let receiver = state.lifecycle.event_bus().subscribe();
	ws.on_upgrade(move |socket| stream_events(socket, receiver))
}

/// Forwards lifecycle events to a connected WebSocket client.
///
/// A lagging client that misses broadcast messages is disconnected
/// rather than silently skipped ahead.
async fn stream_events(
	mut socket: WebSocket,
	mut receiver: tokio::sync::broadcast::Receiver<tracker_types::TrackerEvent>,
) {
	while let Ok(event) = receiver.recv().await {
		let payload = match serde_json::to_string(&event) {
			Ok(payload) => payload,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to serialize lifecycle event");
				continue;
			}
		};
		if socket.send(Message::Text(payload.into())).await.is_err() {
			break;
		}
	}
	tracing::debug!("Event stream client disconnected");
}

/// Maps a lifecycle failure onto the HTTP error taxonomy.
fn api_error(e: LifecycleError) -> ApiError {
	match e {
		LifecycleError::InvalidInput(message) => ApiError::BadRequest {
			error_type: "INVALID_INPUT".to_string(),
			message,
		},
		LifecycleError::InvalidStatus(status) => ApiError::BadRequest {
			error_type: "INVALID_STATUS".to_string(),
			message: format!("Invalid status: {}", status),
		},
		LifecycleError::Token(TokenError::InvalidSignature) => ApiError::Unauthorized {
			error_type: "INVALID_SIGNATURE".to_string(),
			message: "Token signature verification failed".to_string(),
		},
		LifecycleError::Token(TokenError::Expired) => ApiError::Unauthorized {
			error_type: "TOKEN_EXPIRED".to_string(),
			message: "Token has expired".to_string(),
		},
		LifecycleError::Token(TokenError::Stale) => ApiError::Unauthorized {
			error_type: "TOKEN_STALE".to_string(),
			message: "Token has been superseded by a newer issuance".to_string(),
		},
		LifecycleError::Immutable => ApiError::Forbidden {
			error_type: "ORDER_IMMUTABLE".to_string(),
			message: "Delivered orders cannot be modified".to_string(),
		},
		LifecycleError::NotFound => ApiError::NotFound {
			error_type: "ORDER_NOT_FOUND".to_string(),
			message: "Order not found".to_string(),
		},
		LifecycleError::Duplicate(id) => ApiError::Conflict {
			error_type: "DUPLICATE_ORDER_ID".to_string(),
			message: format!("Order id already exists: {}", id),
		},
		LifecycleError::Token(other) => ApiError::InternalServerError {
			error_type: "TOKEN_ERROR".to_string(),
			message: other.to_string(),
		},
		LifecycleError::Storage(message) => ApiError::InternalServerError {
			error_type: "STORAGE_ERROR".to_string(),
			message,
		},
	}
}
