//! Configuration settings structures

use crate::{configurable_value::ConfigurableValue, ConfigurableValueError};
use router_types::constants::limits::{
	DEFAULT_ADAPTER_TIMEOUT_MS, DEFAULT_CLONE_POLL_INTERVAL_MS, DEFAULT_CLONE_POLL_TIMEOUT_MS,
	DEFAULT_DRIFT_TOLERANCE_PCT, DEFAULT_FUND_ATTEMPTS, DEFAULT_FUND_BASE_DELAY_MS,
	DEFAULT_PREVIEW_GRACE_MS, DEFAULT_RANKING_MARGIN_PCT, DEFAULT_ROUTE_TIMEOUT_MS,
	DEFAULT_SANDBOX_CREATE_ATTEMPTS, DEFAULT_SANDBOX_CREATE_BASE_DELAY_MS, DEFAULT_SLIPPAGE_PCT,
	DEFAULT_SUBMIT_ATTEMPTS, DEFAULT_SUBMIT_BASE_DELAY_MS, DEFAULT_SYNTHETIC_NATIVE_BALANCE,
	DEFAULT_VALIDATION_ATTEMPTS, DEFAULT_VALIDATION_PAUSE_MS, DEFAULT_VALIDATION_SILENT_ATTEMPTS,
};
use router_types::{ChainId, SecretString, SourceId, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Main router settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub routing: RoutingSettings,
	pub validation: ValidationSettings,
	pub sandbox: SandboxSettings,
	/// Quote sources keyed by canonical source id (`0x`, `odos`, ...)
	pub sources: HashMap<String, SourceSettings>,
	/// RPC endpoints keyed by numeric chain id
	pub chains: HashMap<String, ChainSettings>,
	pub pricing: PricingSettings,
	pub logging: LoggingSettings,
}

/// Fan-out, preview and ranking knobs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RoutingSettings {
	/// Bounded window for multi-source runs
	pub timeout_ms: u64,
	/// Extra time pending sources get once a preview route is accepted
	pub preview_grace_ms: u64,
	pub default_slippage_pct: f64,
	/// Firm-price source that must win by `ranking_margin_pct`
	pub trusted_source: Option<SourceId>,
	/// Bridge that gets a `ranking_margin_pct` benefit
	pub preferred_bridge_source: Option<SourceId>,
	pub ranking_margin_pct: f64,
}

impl Default for RoutingSettings {
	fn default() -> Self {
		Self {
			timeout_ms: DEFAULT_ROUTE_TIMEOUT_MS,
			preview_grace_ms: DEFAULT_PREVIEW_GRACE_MS,
			default_slippage_pct: DEFAULT_SLIPPAGE_PCT,
			trusted_source: Some(SourceId::CowSwap),
			preferred_bridge_source: Some(SourceId::Relay),
			ranking_margin_pct: DEFAULT_RANKING_MARGIN_PCT,
		}
	}
}

/// Sandbox execution and retry knobs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ValidationSettings {
	/// Largest tolerated gap between requested and spent input, in percent
	pub drift_tolerance_pct: f64,
	pub submit_attempts: u32,
	pub submit_base_delay_ms: u64,
	/// Attempts at a whole validation that failed unexpectedly
	pub validation_attempts: u32,
	pub validation_pause_ms: u64,
	/// Failed validation attempts logged at debug level before warnings start
	pub silent_attempts: u32,
	/// Gas asset granted in every sandbox, in whole units
	pub synthetic_native_balance_eth: u64,
	pub fund_attempts: u32,
	pub fund_base_delay_ms: u64,
}

impl Default for ValidationSettings {
	fn default() -> Self {
		Self {
			drift_tolerance_pct: DEFAULT_DRIFT_TOLERANCE_PCT,
			submit_attempts: DEFAULT_SUBMIT_ATTEMPTS,
			submit_base_delay_ms: DEFAULT_SUBMIT_BASE_DELAY_MS,
			validation_attempts: DEFAULT_VALIDATION_ATTEMPTS,
			validation_pause_ms: DEFAULT_VALIDATION_PAUSE_MS,
			silent_attempts: DEFAULT_VALIDATION_SILENT_ATTEMPTS,
			synthetic_native_balance_eth: DEFAULT_SYNTHETIC_NATIVE_BALANCE,
			fund_attempts: DEFAULT_FUND_ATTEMPTS,
			fund_base_delay_ms: DEFAULT_FUND_BASE_DELAY_MS,
		}
	}
}

/// Sandbox provider connection
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SandboxSettings {
	pub provider_url: String,
	pub account_slug: String,
	pub project_slug: String,
	/// Example configurations:
	/// - Environment variable: `{"type": "env", "value": "TENDERLY_ACCESS_KEY"}`
	/// - Plain value: `{"type": "plain", "value": "your-key-here"}`
	pub access_key: ConfigurableValue,
	pub create_attempts: u32,
	pub create_base_delay_ms: u64,
	pub clone_poll_interval_ms: u64,
	pub clone_poll_timeout_ms: u64,
}

impl Default for SandboxSettings {
	fn default() -> Self {
		Self {
			provider_url: "https://api.tenderly.co/api/v1".to_string(),
			account_slug: String::new(),
			project_slug: String::new(),
			access_key: ConfigurableValue::from_env("TENDERLY_ACCESS_KEY"),
			create_attempts: DEFAULT_SANDBOX_CREATE_ATTEMPTS,
			create_base_delay_ms: DEFAULT_SANDBOX_CREATE_BASE_DELAY_MS,
			clone_poll_interval_ms: DEFAULT_CLONE_POLL_INTERVAL_MS,
			clone_poll_timeout_ms: DEFAULT_CLONE_POLL_TIMEOUT_MS,
		}
	}
}

/// Individual quote source configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceSettings {
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	/// Overrides the source's public API endpoint
	#[serde(default)]
	pub endpoint: Option<String>,
	#[serde(default = "default_source_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub api_key: Option<ConfigurableValue>,
	#[serde(default)]
	pub headers: Option<HashMap<String, String>>,
}

fn default_enabled() -> bool {
	true
}

fn default_source_timeout_ms() -> u64 {
	DEFAULT_ADAPTER_TIMEOUT_MS
}

impl Default for SourceSettings {
	fn default() -> Self {
		Self {
			enabled: true,
			endpoint: None,
			timeout_ms: DEFAULT_ADAPTER_TIMEOUT_MS,
			api_key: None,
			headers: None,
		}
	}
}

impl SourceSettings {
	pub fn api_key_secret(&self) -> Result<Option<SecretString>, ConfigurableValueError> {
		self.api_key
			.as_ref()
			.map(ConfigurableValue::resolve_for_secret)
			.transpose()
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChainSettings {
	pub rpc_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PricingSettings {
	pub endpoint: String,
}

impl Default for PricingSettings {
	fn default() -> Self {
		Self {
			endpoint: "https://coins.llama.fi".to_string(),
		}
	}
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
	pub format: LogFormat,
	pub structured: bool,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Pretty,
			structured: false,
		}
	}
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

/// Errors found while checking loaded settings
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
	#[error("Unknown quote source '{0}' in configuration")]
	UnknownSource(String),

	#[error("Invalid chain id '{0}' in configuration")]
	InvalidChain(String),

	#[error("Chain {0} has no RPC URLs")]
	MissingRpcUrls(String),

	#[error("Invalid value for {field}: {reason}")]
	InvalidValue { field: &'static str, reason: String },
}

impl Settings {
	/// Check every field the loader cannot check through types alone
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		self.enabled_sources()?;
		self.chain_rpc_urls()?;

		let routing = &self.routing;
		if routing.timeout_ms == 0 {
			return Err(invalid("routing.timeout_ms", "must be positive"));
		}
		if !(0.0..=100.0).contains(&routing.default_slippage_pct) {
			return Err(invalid("routing.default_slippage_pct", "must be within 0..=100"));
		}
		if !(0.0..100.0).contains(&routing.ranking_margin_pct) {
			return Err(invalid("routing.ranking_margin_pct", "must be within 0..100"));
		}
		if let Some(source) = routing.preferred_bridge_source {
			if source.kind() != SourceKind::Bridge {
				return Err(invalid(
					"routing.preferred_bridge_source",
					format!("{} is not a bridge", source),
				));
			}
		}

		let validation = &self.validation;
		if !(validation.drift_tolerance_pct > 0.0 && validation.drift_tolerance_pct < 100.0) {
			return Err(invalid("validation.drift_tolerance_pct", "must be within 0..100"));
		}
		if validation.submit_attempts == 0 {
			return Err(invalid("validation.submit_attempts", "must be at least 1"));
		}
		if validation.validation_attempts == 0 {
			return Err(invalid("validation.validation_attempts", "must be at least 1"));
		}
		Ok(())
	}

	/// Enabled sources with their settings, in source order
	pub fn enabled_sources(&self) -> Result<Vec<(SourceId, SourceSettings)>, ConfigValidationError> {
		let mut enabled = Vec::new();
		for (name, source) in &self.sources {
			let id = name
				.parse::<SourceId>()
				.map_err(|_| ConfigValidationError::UnknownSource(name.clone()))?;
			if source.enabled {
				enabled.push((id, source.clone()));
			}
		}
		enabled.sort_by_key(|(id, _)| *id);
		Ok(enabled)
	}

	pub fn chain_rpc_urls(&self) -> Result<HashMap<ChainId, Vec<String>>, ConfigValidationError> {
		self.chains
			.iter()
			.map(|(key, chain)| {
				let chain_id = key
					.parse::<u64>()
					.map_err(|_| ConfigValidationError::InvalidChain(key.clone()))?;
				if chain.rpc_urls.is_empty() {
					return Err(ConfigValidationError::MissingRpcUrls(key.clone()));
				}
				Ok((ChainId(chain_id), chain.rpc_urls.clone()))
			})
			.collect()
	}

	/// Resolve the sandbox provider access key
	pub fn sandbox_access_key(&self) -> Result<SecretString, ConfigurableValueError> {
		self.sandbox.access_key.resolve_for_secret()
	}
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigValidationError {
	ConfigValidationError::InvalidValue {
		field,
		reason: reason.into(),
	}
}
