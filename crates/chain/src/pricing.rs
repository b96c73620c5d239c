//! DefiLlama-backed USD price oracle

use alloy_primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use router_types::{ChainId, PriceError, PriceOracle, TokenRef};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://coins.llama.fi";

const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
struct LlamaCoin {
	price: f64,
}

/// `GET /prices/current/{coin}` response
#[derive(Debug, Clone, Deserialize)]
struct LlamaPrices {
	#[serde(default)]
	coins: HashMap<String, LlamaCoin>,
}

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
	price: Option<f64>,
	fetched_at: Instant,
}

/// USD prices from the DefiLlama coins API, cached briefly per coin
#[derive(Debug)]
pub struct DefiLlamaPriceOracle {
	endpoint: String,
	client: Client,
	ttl: Duration,
	cache: DashMap<String, CachedPrice>,
}

impl DefiLlamaPriceOracle {
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			client: Client::new(),
			ttl: DEFAULT_PRICE_TTL,
			cache: DashMap::new(),
		}
	}

	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;
		self
	}

	/// Coin key understood by the API; native assets are priced by their coingecko id
	fn coin_key(token: &TokenRef, chain_id: ChainId) -> Result<String, PriceError> {
		if let Some(address) = token.address {
			let chain = chain_id
				.name()
				.ok_or(PriceError::UnknownChain { chain_id })?;
			return Ok(format!("{}:{:#x}", chain, address));
		}
		let gecko_id = match chain_id.native_symbol() {
			"BNB" => "binancecoin",
			"POL" => "polygon-ecosystem-token",
			"AVAX" => "avalanche-2",
			_ => "ethereum",
		};
		Ok(format!("coingecko:{}", gecko_id))
	}

	fn cached(&self, key: &str) -> Option<Option<f64>> {
		self.cache
			.get(key)
			.filter(|cached| cached.fetched_at.elapsed() < self.ttl)
			.map(|cached| cached.price)
	}
}

#[async_trait]
impl PriceOracle for DefiLlamaPriceOracle {
	async fn get_usd_price(
		&self,
		_account: Address,
		token: &TokenRef,
		chain_id: ChainId,
	) -> Result<Option<f64>, PriceError> {
		let key = Self::coin_key(token, chain_id)?;
		if let Some(price) = self.cached(&key) {
			return Ok(price);
		}

		let url = format!(
			"{}/prices/current/{}",
			self.endpoint.trim_end_matches('/'),
			key
		);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| PriceError::Request {
				reason: e.to_string(),
			})?;
		if !response.status().is_success() {
			return Err(PriceError::Status {
				status_code: response.status().as_u16(),
			});
		}
		let prices: LlamaPrices = response.json().await.map_err(|e| PriceError::Request {
			reason: e.to_string(),
		})?;

		let price = prices
			.coins
			.get(&key)
			.map(|coin| coin.price)
			.filter(|price| price.is_finite() && *price > 0.0);
		debug!("USD price of {} on chain {}: {:?}", token.symbol, chain_id, price);
		self.cache.insert(
			key,
			CachedPrice {
				price,
				fetched_at: Instant::now(),
			},
		);
		Ok(price)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[test]
	fn test_coin_keys() {
		let usdc = TokenRef::erc20(Address::repeat_byte(0x11), "USDC", 6);
		assert_eq!(
			DefiLlamaPriceOracle::coin_key(&usdc, ChainId::BASE).unwrap(),
			"base:0x1111111111111111111111111111111111111111"
		);
		assert_eq!(
			DefiLlamaPriceOracle::coin_key(&TokenRef::native(ChainId::POLYGON), ChainId::POLYGON)
				.unwrap(),
			"coingecko:polygon-ecosystem-token"
		);
		assert!(DefiLlamaPriceOracle::coin_key(&usdc, ChainId(999)).is_err());
	}

	#[tokio::test]
	async fn test_price_is_fetched_once_within_ttl() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/prices/current/coingecko:ethereum"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"coins": { "coingecko:ethereum": { "price": 2500.5, "symbol": "ETH", "confidence": 0.99 } }
			})))
			.expect(1)
			.mount(&server)
			.await;

		let oracle = DefiLlamaPriceOracle::new(server.uri());
		let eth = TokenRef::native(ChainId::ARBITRUM);
		for _ in 0..2 {
			let price = oracle
				.get_usd_price(Address::ZERO, &eth, ChainId::ARBITRUM)
				.await
				.unwrap();
			assert_eq!(price, Some(2500.5));
		}
	}

	#[tokio::test]
	async fn test_unknown_coin_has_no_price() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "coins": {} })))
			.mount(&server)
			.await;

		let oracle = DefiLlamaPriceOracle::new(server.uri());
		let pepe = TokenRef::erc20(Address::repeat_byte(0x99), "PEPE", 18);
		assert_eq!(
			oracle
				.get_usd_price(Address::ZERO, &pepe, ChainId::ETHEREUM)
				.await
				.unwrap(),
			None
		);
	}

	#[tokio::test]
	async fn test_server_error_is_reported() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;

		let oracle = DefiLlamaPriceOracle::new(server.uri());
		let result = oracle
			.get_usd_price(Address::ZERO, &TokenRef::native(ChainId::BASE), ChainId::BASE)
			.await;
		assert_eq!(result, Err(PriceError::Status { status_code: 503 }));
	}
}
