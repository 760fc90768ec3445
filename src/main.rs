use std::sync::Arc;
use tracing::{error, info};

use wave_sync::contract::rpc::RpcWavePortal;
use wave_sync::provider::rpc::{JsonRpcClient, JsonRpcProvider};
use wave_sync::provider::{ProviderGateway, SharedProvider};
use wave_sync::session::TracingHandler;
use wave_sync::utils::format_wave;
use wave_sync::{ClientConfig, SessionController};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	dotenvy::dotenv().ok();

	// Initialize tracing subscriber with debug logging for this crate
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive("wave_sync=debug".parse().unwrap())
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wave sync client");

	let config = match ClientConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	let rpc = match JsonRpcClient::new(config.rpc_url.clone()) {
		Ok(rpc) => rpc,
		Err(e) => {
			error!("Failed to create JSON-RPC client: {}", e);
			return;
		}
	};

	let portal = match RpcWavePortal::new(
		rpc.clone(),
		config.ws_url.clone(),
		&config.contract_address,
		config.receipt_poll_interval,
	) {
		Ok(portal) => portal,
		Err(e) => {
			error!("Failed to create wave portal client: {}", e);
			return;
		}
	};

	info!("Created wave portal client for {}", config.contract_address);

	let provider: SharedProvider = Arc::new(JsonRpcProvider::new(rpc, config.poll_interval));
	let gateway = ProviderGateway::new(Some(provider));
	let mut controller = SessionController::new(config, gateway, Arc::new(portal));
	controller.register_handler(Box::new(TracingHandler));

	// Errors are reported through the handler; a missing wallet just ends the run.
	if controller.initialize_on_load().await.is_err() {
		return;
	}
	if !controller.session().is_connected() && controller.connect().await.is_err() {
		return;
	}

	for wave in controller.waves().iter() {
		info!("{}", format_wave(wave));
	}

	if let Some(message) = std::env::args().nth(1) {
		controller.set_draft(message.clone());
		if controller.submit_wave(&message).await.is_ok() {
			info!("Wave sent");
		}
	}

	info!("Following live waves, press Ctrl-C to stop");
	loop {
		let before = controller.waves().len();
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				info!("Interrupted");
				break;
			}
			more = controller.process_next() => {
				if !more {
					info!("No more event sources");
					break;
				}
			}
		}

		if controller.waves().len() > before {
			if let Some(newest) = controller.waves().records().first() {
				info!("{}", format_wave(newest));
			}
		}
	}

	controller.shutdown().await;
}
