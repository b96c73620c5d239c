//! Startup logging for the swap router
//!
//! Prints service and environment details, then the effective routing
//! configuration, once the router is assembled.

use std::env;
use tracing::{info, warn};

use crate::Settings;

/// Logs service information at startup
pub fn log_service_info() {
	let service_name = "swap-router";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Swap Router Starting ===");
	info!("🚀 Service: {} v{}", service_name, service_version);
	info!("💻 Platform: {} ({})", env::consts::OS, env::consts::ARCH);

	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Level: {}", rust_log);
	}

	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs the sources, timeouts and sandbox provider a router was built with
pub fn log_router_configuration(settings: &Settings) {
	match settings.enabled_sources() {
		Ok(sources) => {
			let names: Vec<String> = sources
				.iter()
				.map(|(id, source)| format!("{} ({}ms)", id, source.timeout_ms))
				.collect();
			info!("📡 Quote sources: {}", names.join(", "));
		},
		Err(e) => warn!("⚠️ Quote sources misconfigured: {}", e),
	}

	let routing = &settings.routing;
	info!(
		"⏱️ Route window: {}ms, preview grace: {}ms, default slippage: {}%",
		routing.timeout_ms, routing.preview_grace_ms, routing.default_slippage_pct
	);
	if let Some(trusted) = routing.trusted_source {
		info!(
			"⚖️ Trusted source: {} (margin {}%)",
			trusted, routing.ranking_margin_pct
		);
	}

	let sandbox = &settings.sandbox;
	info!(
		"🧪 Sandbox provider: {} ({}/{}), access key from {}",
		sandbox.provider_url,
		sandbox.account_slug,
		sandbox.project_slug,
		sandbox.access_key.description()
	);
	if sandbox.access_key.is_plain() {
		warn!("⚠️ Sandbox access key is stored in plain configuration");
	}

	info!(
		"🧮 Drift tolerance: {}%, submit attempts: {}",
		settings.validation.drift_tolerance_pct, settings.validation.submit_attempts
	);
}

/// Logs completion of router assembly
pub fn log_startup_complete(source_count: usize) {
	info!("✅ Swap router ready with {} quote sources", source_count);
}
