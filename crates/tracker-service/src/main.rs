//! Main entry point for the order tracker service.
//!
//! This binary wires the configured store, token service, and outbound
//! notifier into a lifecycle orchestrator and serves the HTTP API. All
//! components are pluggable implementations selected by configuration.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracker_config::Config;
use tracker_core::{EventBus, Lifecycle};
use tracker_notify::OutboundNotifier;
use tracker_storage::OrderStore;
use tracker_token::{DataUrlRenderer, TokenError, TokenService};

mod server;

/// Command-line arguments for the tracker service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the tracker service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the lifecycle orchestrator from configured implementations
/// 5. Serves the HTTP API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started tracker");

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let lifecycle = Arc::new(build_lifecycle(&config)?);

	// Log every published event so the lifecycle is observable even
	// without any connected WebSocket client.
	spawn_event_logger(lifecycle.event_bus());

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);
	if api_enabled {
		let api_config = config
			.api
			.clone()
			.ok_or("api section missing despite enabled flag")?;
		server::start_server(api_config, lifecycle).await?;
		tracing::info!("API server finished");
	} else {
		tracing::warn!("API server disabled, nothing to serve; exiting");
	}

	tracing::info!("Stopped tracker");
	Ok(())
}

/// Builds the lifecycle orchestrator from configuration.
///
/// Resolves the configured store and notifier implementations from
/// their factory registries, then constructs the token service around
/// the resolved signing secret. A missing secret is a hard startup
/// failure; there is no fallback value.
fn build_lifecycle(config: &Config) -> Result<Lifecycle, Box<dyn std::error::Error>> {
	let store = create_store(config)?;
	let notifier = create_notifier(config)?;

	let secret = config
		.token
		.resolve_secret()
		.ok_or(TokenError::Misconfigured)?;
	let validity = std::time::Duration::from_secs(config.token.validity_secs);
	let tokens = TokenService::new(
		secret,
		validity,
		config.service.base_url.clone(),
		Arc::clone(&store),
		Arc::new(DataUrlRenderer),
	)?;

	Ok(Lifecycle::new(
		store,
		Arc::new(tokens),
		notifier,
		EventBus::default(),
	))
}

/// Resolves the configured order store implementation.
fn create_store(config: &Config) -> Result<Arc<dyn OrderStore>, Box<dyn std::error::Error>> {
	let name = config.storage.primary.as_str();
	let factory = tracker_storage::get_all_implementations()
		.into_iter()
		.find(|(n, _)| *n == name)
		.map(|(_, f)| f)
		.ok_or_else(|| format!("unknown storage implementation: {}", name))?;
	let store = factory(&config.storage.implementation_config(name))?;
	tracing::info!(implementation = name, "Order store ready");
	Ok(Arc::from(store))
}

/// Resolves the configured outbound notifier implementation.
fn create_notifier(
	config: &Config,
) -> Result<Arc<dyn OutboundNotifier>, Box<dyn std::error::Error>> {
	let name = config.notification.primary.as_str();
	let factory = tracker_notify::get_all_implementations()
		.into_iter()
		.find(|(n, _)| *n == name)
		.map(|(_, f)| f)
		.ok_or_else(|| format!("unknown notification implementation: {}", name))?;
	let notifier = factory(&config.notification.implementation_config(name))?;
	tracing::info!(implementation = name, "Outbound notifier ready");
	Ok(Arc::from(notifier))
}

/// Spawns a background task that logs every published lifecycle event.
fn spawn_event_logger(bus: &EventBus) {
	use tokio::sync::broadcast::error::RecvError;

	let mut receiver = bus.subscribe();
	tokio::spawn(async move {
		loop {
			match receiver.recv().await {
				Ok(event) => tracing::debug!(?event, "Lifecycle event"),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Event logger fell behind")
				}
				Err(RecvError::Closed) => break,
			}
		}
	});
}
