//! Swap Router Library
//!
//! Routing core for multi-chain swaps and bridges: fans a request out to
//! many quote sources, validates every candidate in a forked chain sandbox
//! and returns the executable routes, best first.

// Core domain types - the most commonly used types
pub use router_types::{
	// External dependencies for convenience
	alloy_primitives,
	serde_json,
	// Requests and results
	AmountSpec,
	BridgeQuote,
	BridgeRequest,
	BridgeRoute,
	ChainId,
	Quote,
	QuoteTx,
	// Error types
	AdapterError,
	RouteError,
	RouteMode,
	RouteResult,
	SourceId,
	SwapRequest,
	SwapRoute,
	TokenRef,
	ValidatedRoute,
};

// Collaborator seams
pub use router_types::{
	ChainRpc, PriceOracle, QuoteAdapter, RpcConnector, SandboxProvisioner, TokenResolver,
};

// Service layer
pub use router_service::{CandidateValidator, RouteOrchestrator, RouteValidator};

// Adapters
pub use router_adapters::{AdapterRegistry, ClientCache, SourceHint};

// Chain clients
pub use router_chain::{
	DefiLlamaPriceOracle, HttpRpcConnector, StaticTokenResolver, TenderlyConfig,
	TenderlyProvisioner,
};

// Config
pub use router_config::{load_config, log_service_info, log_startup_complete, Settings};

// Module aliases
pub mod models {
	pub use router_types::*;
}

pub mod config {
	pub use router_config::*;
}

pub mod adapters {
	pub use router_adapters::*;
}

pub mod chain {
	pub use router_chain::*;
}

pub mod service {
	pub use router_service::*;
}

pub mod mocks;

use router_config::{
	ConfigLoadError, ConfigValidationError, ConfigurableValueError, LogFormat, LoggingSettings,
};
use router_types::{AdapterRuntimeConfig, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

// Re-export external dependencies for embedders
pub use async_trait;

/// Errors raised while assembling a router
#[derive(Debug, Error)]
pub enum RouterBuildError {
	#[error(transparent)]
	Config(#[from] ConfigLoadError),

	#[error("Invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),

	#[error("Secret could not be resolved: {0}")]
	Secret(#[from] ConfigurableValueError),

	#[error(transparent)]
	Registry(#[from] RouteError),
}

/// Builder pattern for configuring the router
///
/// Every collaborator defaults to its HTTP implementation built from
/// [`Settings`]; tests and embedders swap in their own.
#[derive(Default)]
pub struct RouterBuilder {
	settings: Option<Settings>,
	adapters: Vec<Arc<dyn QuoteAdapter>>,
	provisioner: Option<Arc<dyn SandboxProvisioner>>,
	connector: Option<Arc<dyn RpcConnector>>,
	prices: Option<Arc<dyn PriceOracle>>,
	tokens: Option<Arc<dyn TokenResolver>>,
	validator: Option<Arc<dyn RouteValidator>>,
}

impl RouterBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load `.env`, then settings from `config/config.*` and `ROUTER__*` variables
	pub fn from_env() -> Result<Self, RouterBuildError> {
		dotenvy::dotenv().ok();
		let settings = load_config()?;
		Ok(Self::new().with_settings(settings))
	}

	/// Set custom settings
	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	/// Get the current settings
	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	/// Register a custom adapter, replacing the configured one for its source
	pub fn with_adapter(mut self, adapter: Arc<dyn QuoteAdapter>) -> Self {
		self.adapters.push(adapter);
		self
	}

	pub fn with_provisioner(mut self, provisioner: Arc<dyn SandboxProvisioner>) -> Self {
		self.provisioner = Some(provisioner);
		self
	}

	pub fn with_rpc_connector(mut self, connector: Arc<dyn RpcConnector>) -> Self {
		self.connector = Some(connector);
		self
	}

	pub fn with_price_oracle(mut self, prices: Arc<dyn PriceOracle>) -> Self {
		self.prices = Some(prices);
		self
	}

	pub fn with_token_resolver(mut self, tokens: Arc<dyn TokenResolver>) -> Self {
		self.tokens = Some(tokens);
		self
	}

	/// Replace sandbox validation altogether
	pub fn with_validator(mut self, validator: Arc<dyn RouteValidator>) -> Self {
		self.validator = Some(validator);
		self
	}

	/// Assemble the orchestrator.
	///
	/// Fails when configuration names an unknown source, a secret cannot be
	/// resolved, or an enabled source ends up without an adapter.
	pub fn build(self) -> Result<RouteOrchestrator, RouterBuildError> {
		let settings = self.settings.unwrap_or_default();
		settings.validate()?;

		let enabled = settings.enabled_sources()?;
		let mut configs = Vec::with_capacity(enabled.len());
		for (source_id, source) in &enabled {
			let endpoint = source
				.endpoint
				.clone()
				.unwrap_or_else(|| router_adapters::default_endpoint(*source_id).to_string());
			let mut config = AdapterRuntimeConfig::new(*source_id, endpoint, source.timeout_ms);
			if let Some(api_key) = source.api_key_secret()? {
				config = config.with_api_key(api_key);
			}
			if let Some(headers) = &source.headers {
				config = config.with_headers(headers.clone());
			}
			configs.push(config);
		}

		let mut registry = AdapterRegistry::from_configs(configs, ClientCache::new());
		for adapter in self.adapters {
			info!("Registering custom adapter for {}", adapter.source());
			registry.register(adapter);
		}
		let enabled_ids: Vec<SourceId> = enabled.iter().map(|(id, _)| *id).collect();
		registry.validate(&enabled_ids)?;

		let provisioner = match self.provisioner {
			Some(provisioner) => provisioner,
			None => Arc::new(TenderlyProvisioner::new(tenderly_config(&settings)?)),
		};
		let connector = self
			.connector
			.unwrap_or_else(|| Arc::new(HttpRpcConnector::new()));
		let prices = self
			.prices
			.unwrap_or_else(|| Arc::new(DefiLlamaPriceOracle::new(settings.pricing.endpoint.clone())));
		let tokens = self
			.tokens
			.unwrap_or_else(|| Arc::new(StaticTokenResolver::with_defaults()));
		let validator = self.validator.unwrap_or_else(|| {
			Arc::new(CandidateValidator::new(
				Arc::clone(&provisioner),
				connector,
				settings.validation.clone(),
			))
		});

		router_config::log_router_configuration(&settings);
		log_startup_complete(registry.len());

		Ok(RouteOrchestrator::new(
			Arc::new(registry),
			validator,
			provisioner,
			prices,
			tokens,
			settings.routing.clone(),
		)
		.with_validation_attempts(settings.validation.validation_attempts))
	}
}

fn tenderly_config(settings: &Settings) -> Result<TenderlyConfig, RouterBuildError> {
	let sandbox = &settings.sandbox;
	let validation = &settings.validation;
	let mut config = TenderlyConfig::new(
		sandbox.account_slug.clone(),
		sandbox.project_slug.clone(),
		settings.sandbox_access_key()?,
	)
	.with_api_url(sandbox.provider_url.clone());
	config.create_policy = RetryPolicy::exponential(
		sandbox.create_attempts,
		Duration::from_millis(sandbox.create_base_delay_ms),
	);
	config.fund_policy = RetryPolicy::exponential(
		validation.fund_attempts,
		Duration::from_millis(validation.fund_base_delay_ms),
	);
	config.clone_poll_interval = Duration::from_millis(sandbox.clone_poll_interval_ms);
	config.clone_poll_timeout = Duration::from_millis(sandbox.clone_poll_timeout_ms);
	Ok(config)
}

/// Initialize tracing from logging settings.
///
/// `RUST_LOG` overrides the configured level. Does nothing when a global
/// subscriber is already installed.
pub fn init_tracing(logging: &LoggingSettings) {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

	let result = match logging.format {
		LogFormat::Json => {
			let subscriber = tracing_subscriber::fmt().json().with_env_filter(env_filter);
			if logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()
			} else {
				subscriber.try_init()
			}
		},
		LogFormat::Pretty => {
			let subscriber = tracing_subscriber::fmt().pretty().with_env_filter(env_filter);
			if logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()
			} else {
				subscriber.try_init()
			}
		},
		LogFormat::Compact => {
			let subscriber = tracing_subscriber::fmt().compact().with_env_filter(env_filter);
			if logging.structured {
				subscriber.with_target(true).with_thread_ids(true).try_init()
			} else {
				subscriber.try_init()
			}
		},
	};

	if result.is_ok() {
		log_service_info();
	}
}
