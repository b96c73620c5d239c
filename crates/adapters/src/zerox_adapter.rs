//! 0x swap API adapter
//!
//! Quotes come with a ready-to-send transaction. Exact output is supported
//! natively through `buyAmount`.

use alloy_primitives::{address, Address, Bytes};
use async_trait::async_trait;
use router_types::{
	AdapterError, AdapterResult, AdapterRuntimeConfig, AmountSpec, ChainId, Quote, QuoteAdapter,
	QuoteTx, SourceId, SwapQuery, TokenRef,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{parse_amount, parse_quantity, read_json, ClientStrategy};

pub const DEFAULT_ENDPOINT: &str = "https://api.0x.org";

/// Placeholder 0x uses for the native asset
pub const NATIVE_TOKEN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

// ================================
// 0x API MODELS
// ================================

/// `GET /swap/v1/quote` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroXQuoteResponse {
	/// Sell amount before fees, when fees are charged
	#[serde(default)]
	pub gross_sell_amount: Option<String>,
	pub sell_amount: String,
	/// Buy amount before fees, when fees are charged
	#[serde(default)]
	pub gross_buy_amount: Option<String>,
	pub buy_amount: String,
	pub estimated_gas: String,
	pub to: Address,
	pub value: String,
	pub data: Bytes,
}

impl ZeroXQuoteResponse {
	fn into_quote(self) -> AdapterResult<Quote> {
		let amount_in = parse_amount(
			self.gross_sell_amount.as_deref().unwrap_or(&self.sell_amount),
			"sellAmount",
		)?;
		let amount_out = parse_amount(
			self.gross_buy_amount.as_deref().unwrap_or(&self.buy_amount),
			"buyAmount",
		)?;
		let value = parse_quantity(&self.value, "value")?;

		Ok(Quote::with_tx(
			SourceId::ZeroX,
			amount_in,
			Some(amount_out),
			QuoteTx::new(self.to, self.data, value),
		))
	}
}

/// 0x adapter for same-chain swaps
#[derive(Debug)]
pub struct ZeroXAdapter {
	config: AdapterRuntimeConfig,
	client_strategy: ClientStrategy,
}

impl ZeroXAdapter {
	pub fn new(config: AdapterRuntimeConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	pub fn with_cache(config: AdapterRuntimeConfig, cache: ClientCache) -> Self {
		Self {
			config,
			client_strategy: ClientStrategy::Cached(cache),
		}
	}

	pub fn without_cache(config: AdapterRuntimeConfig) -> Self {
		Self {
			config,
			client_strategy: ClientStrategy::OnDemand,
		}
	}

	/// 0x serves each chain from its own host; a custom endpoint serves all chains
	fn base_url(&self, chain_id: ChainId) -> AdapterResult<String> {
		if self.config.base_url() != DEFAULT_ENDPOINT {
			return Ok(self.config.base_url().to_string());
		}

		let host = match chain_id.as_u64() {
			1 => "api.0x.org",
			10 => "optimism.api.0x.org",
			56 => "bsc.api.0x.org",
			137 => "polygon.api.0x.org",
			8453 => "base.api.0x.org",
			42161 => "arbitrum.api.0x.org",
			43114 => "avalanche.api.0x.org",
			_ => {
				return Err(AdapterError::ChainNotSupported {
					chain_id,
					source_id: SourceId::ZeroX,
				})
			},
		};
		Ok(format!("https://{}", host))
	}

	fn token_param(token: &TokenRef) -> String {
		token.address.unwrap_or(NATIVE_TOKEN).to_string()
	}
}

#[async_trait]
impl QuoteAdapter for ZeroXAdapter {
	fn source(&self) -> SourceId {
		SourceId::ZeroX
	}

	async fn quote_swap(&self, query: &SwapQuery) -> AdapterResult<Quote> {
		let quote_url = format!("{}/swap/v1/quote", self.base_url(query.chain_id)?);
		let client_config =
			ClientConfig::from(&self.config).with_api_key_header("0x-api-key", &self.config);
		let client = self.client_strategy.client(&client_config)?;

		let mut params = vec![
			("sellToken", Self::token_param(&query.token_in)),
			("buyToken", Self::token_param(&query.token_out)),
			("slippagePercentage", query.slippage_fraction().to_string()),
			("gasPrice", query.gas_price.to_string()),
			("takerAddress", query.account.to_string()),
		];
		match query.amount {
			AmountSpec::ExactIn(amount) => params.push(("sellAmount", amount.to_string())),
			AmountSpec::ExactOut(amount) => params.push(("buyAmount", amount.to_string())),
		}
		if let Some(dexes) = &query.dex_filter {
			params.push(("includeSources", dexes.join(",")));
		}

		debug!(
			"Fetching 0x quote from {} on chain {}: {} -> {}",
			quote_url, query.chain_id, query.token_in.symbol, query.token_out.symbol
		);

		let response = client.get(&quote_url).query(&params).send().await?;
		let quote: ZeroXQuoteResponse = read_json(response, SourceId::ZeroX).await?;

		debug!(
			"0x quoted {} -> {} (estimated gas {})",
			quote.sell_amount, quote.buy_amount, quote.estimated_gas
		);
		quote.into_quote()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use router_types::{QuotePrices, SecretString};
	use serde_json::json;
	use wiremock::matchers::{header, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn query(amount: AmountSpec) -> SwapQuery {
		SwapQuery {
			chain_id: ChainId::BASE,
			account: Address::repeat_byte(0xaa),
			token_in: TokenRef::native(ChainId::BASE),
			token_out: TokenRef::erc20(Address::repeat_byte(0x11), "USDC", 6),
			amount,
			gas_price: U256::from(1_000_000u64),
			slippage_bps: 100,
			adapter_count_hint: 3,
			dex_filter: None,
			limit_price: None,
			prices: QuotePrices::default(),
		}
	}

	fn quote_body() -> serde_json::Value {
		json!({
			"sellAmount": "1000000000000000000",
			"buyAmount": "2500000000",
			"estimatedGas": "150000",
			"to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
			"value": "1000000000000000000",
			"data": "0xd9627aa4"
		})
	}

	#[tokio::test]
	async fn test_exact_in_quote() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/swap/v1/quote"))
			.and(query_param("sellAmount", "1000000000000000000"))
			.and(query_param("slippagePercentage", "0.01"))
			.and(query_param(
				"sellToken",
				"0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
			))
			.and(header("0x-api-key", "test-key"))
			.respond_with(ResponseTemplate::new(200).set_body_json(quote_body()))
			.expect(1)
			.mount(&server)
			.await;

		let config = AdapterRuntimeConfig::new(SourceId::ZeroX, server.uri(), 5_000)
			.with_api_key(SecretString::from("test-key"));
		let adapter = ZeroXAdapter::without_cache(config);

		let quote = adapter
			.quote_swap(&query(AmountSpec::ExactIn(U256::from(
				1_000_000_000_000_000_000u64,
			))))
			.await
			.unwrap();

		assert_eq!(quote.source, SourceId::ZeroX);
		assert_eq!(quote.amount_out, Some(U256::from(2_500_000_000u64)));
		let tx = quote.tx.unwrap();
		assert_eq!(tx.value, U256::from(1_000_000_000_000_000_000u64));
		assert_eq!(tx.data, Bytes::from(vec![0xd9, 0x62, 0x7a, 0xa4]));
	}

	#[tokio::test]
	async fn test_exact_out_uses_buy_amount() {
		let server = MockServer::start().await;
		let mut body = quote_body();
		body["grossSellAmount"] = json!("1010000000000000000");
		Mock::given(method("GET"))
			.and(path("/swap/v1/quote"))
			.and(query_param("buyAmount", "2500000000"))
			.respond_with(ResponseTemplate::new(200).set_body_json(body))
			.mount(&server)
			.await;

		let adapter =
			ZeroXAdapter::new(AdapterRuntimeConfig::new(SourceId::ZeroX, server.uri(), 5_000));
		let quote = adapter
			.quote_swap(&query(AmountSpec::ExactOut(U256::from(2_500_000_000u64))))
			.await
			.unwrap();

		assert_eq!(quote.amount_in, U256::from(1_010_000_000_000_000_000u64));
	}

	#[tokio::test]
	async fn test_error_status_is_swallowed_unless_sole_source() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/swap/v1/quote"))
			.respond_with(ResponseTemplate::new(400).set_body_string("{\"code\":100}"))
			.mount(&server)
			.await;

		let adapter =
			ZeroXAdapter::new(AdapterRuntimeConfig::new(SourceId::ZeroX, server.uri(), 5_000));
		let amount = AmountSpec::ExactIn(U256::from(1000u64));

		assert!(adapter.quote(&query(amount)).await.unwrap().is_none());

		let mut sole = query(amount);
		sole.adapter_count_hint = 1;
		let err = adapter.quote(&sole).await.unwrap_err();
		assert!(err.to_string().starts_with("Error fetching quote from 0x."));
	}

	#[test]
	fn test_per_chain_hosts() {
		let adapter =
			ZeroXAdapter::new(AdapterRuntimeConfig::new(SourceId::ZeroX, DEFAULT_ENDPOINT, 5_000));
		assert_eq!(
			adapter.base_url(ChainId::POLYGON).unwrap(),
			"https://polygon.api.0x.org"
		);
		assert!(matches!(
			adapter.base_url(ChainId::BLAST),
			Err(AdapterError::ChainNotSupported { .. })
		));
	}
}
