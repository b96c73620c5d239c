//! HTTP client cache for quote source APIs
//!
//! Provides per-source client instances with connection pooling and keep-alive.

use dashmap::{mapref::entry::Entry, DashMap};
use reqwest::{Client, ClientBuilder};
use router_types::{AdapterError, AdapterResult, AdapterRuntimeConfig, SourceId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for creating HTTP clients
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
	/// Base endpoint of the source
	pub base_url: String,
	/// Source identifier for cache differentiation
	pub source: SourceId,
	/// Whole-request timeout
	pub timeout_ms: u64,
	/// Maximum number of idle connections per host
	pub max_idle_per_host: usize,
	/// Connection keep-alive timeout
	pub keep_alive_timeout_ms: u64,
	/// Default headers (auth, content type...)
	pub headers: Vec<(String, String)>,
}

impl From<&AdapterRuntimeConfig> for ClientConfig {
	fn from(config: &AdapterRuntimeConfig) -> Self {
		let mut headers = vec![
			("User-Agent".to_string(), "swap-router/1.0".to_string()),
			("Accept".to_string(), "application/json".to_string()),
		];

		if let Some(extra) = &config.headers {
			let mut extra: Vec<_> = extra.iter().collect();
			extra.sort();
			for (key, value) in extra {
				headers.push((key.clone(), value.clone()));
			}
		}

		Self {
			base_url: config.base_url().to_string(),
			source: config.source,
			timeout_ms: config.timeout_ms,
			max_idle_per_host: 10,
			keep_alive_timeout_ms: 90_000,
			headers,
		}
	}
}

impl ClientConfig {
	/// Send the configured API key under `header`, if one is configured
	pub fn with_api_key_header(mut self, header: &str, config: &AdapterRuntimeConfig) -> Self {
		if let Some(key) = &config.api_key {
			self.headers
				.push((header.to_string(), key.expose_secret().to_string()));
		}
		self
	}
}

/// Cached client with creation timestamp for TTL management
#[derive(Debug, Clone)]
struct CachedClient {
	client: Arc<Client>,
	created_at: Instant,
}

impl CachedClient {
	fn new(client: Client) -> Self {
		Self {
			client: Arc::new(client),
			created_at: Instant::now(),
		}
	}

	fn is_expired(&self, ttl: Duration) -> bool {
		self.created_at.elapsed() > ttl
	}
}

/// Thread-safe cache of HTTP clients keyed by client configuration, with TTL
#[derive(Clone, Debug)]
pub struct ClientCache {
	clients: Arc<DashMap<ClientConfig, CachedClient>>,
	ttl: Duration,
}

impl ClientCache {
	/// Create a new client cache with default 30-minute TTL
	pub fn new() -> Self {
		Self::with_ttl(Duration::from_secs(30 * 60))
	}

	pub fn with_ttl(ttl: Duration) -> Self {
		Self {
			clients: Arc::new(DashMap::new()),
			ttl,
		}
	}

	/// Get or create a client for the given configuration
	pub fn get_client(&self, config: &ClientConfig) -> AdapterResult<Arc<Client>> {
		self.clients.remove_if(config, |_, cached| {
			let expired = cached.is_expired(self.ttl);
			if expired {
				warn!(
					"Client cache expired for {} (age: {:?}), will create new client",
					config.base_url,
					cached.created_at.elapsed()
				);
			}
			expired
		});

		if let Some(cached) = self.clients.get(config) {
			return Ok(cached.client.clone());
		}

		debug!("Creating new client for {} ({})", config.source, config.base_url);
		let cached = CachedClient::new(Self::build_client(config)?);

		match self.clients.entry(config.clone()) {
			Entry::Occupied(entry) => Ok(entry.get().client.clone()),
			Entry::Vacant(entry) => Ok(entry.insert(cached).client.clone()),
		}
	}

	pub(crate) fn build_client(config: &ClientConfig) -> AdapterResult<Client> {
		let mut header_map = reqwest::header::HeaderMap::new();
		for (key, value) in &config.headers {
			if let (Ok(name), Ok(value)) = (
				reqwest::header::HeaderName::from_bytes(key.as_bytes()),
				reqwest::header::HeaderValue::from_str(value),
			) {
				header_map.insert(name, value);
			}
		}

		ClientBuilder::new()
			.pool_max_idle_per_host(config.max_idle_per_host)
			.pool_idle_timeout(Duration::from_millis(config.keep_alive_timeout_ms))
			.tcp_keepalive(Duration::from_secs(60))
			.timeout(Duration::from_millis(config.timeout_ms))
			.default_headers(header_map)
			.build()
			.map_err(AdapterError::HttpError)
	}

	pub fn len(&self) -> usize {
		self.clients.len()
	}

	pub fn is_empty(&self) -> bool {
		self.clients.is_empty()
	}
}

impl Default for ClientCache {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::SecretString;

	fn runtime(source: SourceId, endpoint: &str) -> AdapterRuntimeConfig {
		AdapterRuntimeConfig::new(source, endpoint, 5_000)
	}

	#[test]
	fn test_client_reused_for_same_config() {
		let cache = ClientCache::new();
		let config = ClientConfig::from(&runtime(SourceId::ZeroX, "https://api.0x.org/"));

		let first = cache.get_client(&config).unwrap();
		let second = cache.get_client(&config).unwrap();

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(cache.len(), 1);
		assert_eq!(config.base_url, "https://api.0x.org");
	}

	#[test]
	fn test_sources_get_distinct_clients() {
		let cache = ClientCache::new();
		let zerox = ClientConfig::from(&runtime(SourceId::ZeroX, "https://api.example"));
		let odos = ClientConfig::from(&runtime(SourceId::Odos, "https://api.example"));

		cache.get_client(&zerox).unwrap();
		cache.get_client(&odos).unwrap();

		assert_eq!(cache.len(), 2);
	}

	#[test]
	fn test_api_key_header_only_when_configured() {
		let plain = runtime(SourceId::ZeroX, "https://api.0x.org");
		let config = ClientConfig::from(&plain).with_api_key_header("0x-api-key", &plain);
		assert!(!config.headers.iter().any(|(k, _)| k == "0x-api-key"));

		let keyed = plain.with_api_key(SecretString::from("k"));
		let config = ClientConfig::from(&keyed).with_api_key_header("0x-api-key", &keyed);
		assert!(config
			.headers
			.iter()
			.any(|(k, v)| k == "0x-api-key" && v == "k"));
	}

	#[test]
	fn test_expired_client_is_replaced_on_lookup() {
		let cache = ClientCache::with_ttl(Duration::ZERO);
		let config = ClientConfig::from(&runtime(SourceId::Odos, "https://api.odos.xyz"));
		let first = cache.get_client(&config).unwrap();
		std::thread::sleep(Duration::from_millis(2));

		let second = cache.get_client(&config).unwrap();
		assert!(!Arc::ptr_eq(&first, &second));
		assert_eq!(cache.len(), 1);
	}
}
