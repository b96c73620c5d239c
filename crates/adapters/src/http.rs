//! Shared HTTP plumbing for quote source adapters

use alloy_primitives::U256;
use reqwest::{Client, Response};
use router_types::{AdapterError, AdapterResult, SourceId};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};

/// Client strategy shared by every adapter
#[derive(Debug)]
pub(crate) enum ClientStrategy {
	/// Use the client cache for connection pooling and reuse
	Cached(ClientCache),
	/// Create clients on-demand with no caching
	OnDemand,
}

impl ClientStrategy {
	pub(crate) fn client(&self, config: &ClientConfig) -> AdapterResult<Arc<Client>> {
		match self {
			ClientStrategy::Cached(cache) => cache.get_client(config),
			ClientStrategy::OnDemand => ClientCache::build_client(config).map(Arc::new),
		}
	}
}

/// Decode a JSON body, mapping unsuccessful statuses to adapter errors
pub(crate) async fn read_json<T: DeserializeOwned>(
	response: Response,
	source_id: SourceId,
) -> AdapterResult<T> {
	let status = response.status();
	if status.as_u16() == 429 {
		return Err(AdapterError::RateLimitExceeded { source_id });
	}
	if !status.is_success() {
		let body = response.text().await.unwrap_or_default();
		debug!("{} returned {}: {}", source_id, status, body);
		return Err(AdapterError::HttpStatusError {
			status_code: status.as_u16(),
			reason: if body.is_empty() {
				status.to_string()
			} else {
				body
			},
		});
	}

	let bytes = response.bytes().await?;
	serde_json::from_slice(&bytes).map_err(|e| {
		AdapterError::invalid_response(format!("Failed to parse {} response: {}", source_id, e))
	})
}

/// Parse a base-10 integer amount returned as a string
pub(crate) fn parse_amount(value: &str, field: &str) -> AdapterResult<U256> {
	U256::from_str_radix(value.trim(), 10)
		.map_err(|e| AdapterError::invalid_response(format!("Invalid {} '{}': {}", field, value, e)))
}

/// Parse an amount that may be encoded as hex (`0x..`) or decimal
pub(crate) fn parse_quantity(value: &str, field: &str) -> AdapterResult<U256> {
	match value.strip_prefix("0x") {
		Some(hex) if hex.is_empty() => Ok(U256::ZERO),
		Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| {
			AdapterError::invalid_response(format!("Invalid {} '{}': {}", field, value, e))
		}),
		None => parse_amount(value, field),
	}
}
