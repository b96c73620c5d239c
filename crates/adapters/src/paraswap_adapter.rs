//! ParaSwap adapter
//!
//! A `/prices` lookup yields a price route which `/transactions/{network}`
//! turns into calldata. Funds are pulled by the token transfer proxy, not by
//! the transaction target, so quotes carry an explicit approval target.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use router_types::{
	AdapterResult, AdapterRuntimeConfig, AmountSpec, Quote, QuoteAdapter, QuoteTx, SourceId,
	SwapQuery, TokenRef,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{parse_amount, parse_quantity, read_json, ClientStrategy};
use crate::zerox_adapter::NATIVE_TOKEN;

pub const DEFAULT_ENDPOINT: &str = "https://api.paraswap.io";

// ================================
// PARASWAP API MODELS
// ================================

/// Price route returned by `/prices`; posted back verbatim when building
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaswapPriceRoute {
	pub src_amount: String,
	pub dest_amount: String,
	pub token_transfer_proxy: Address,
	#[serde(default, rename = "gasCostUSD")]
	pub gas_cost_usd: Option<String>,
	#[serde(flatten)]
	pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaswapPriceResponse {
	pub price_route: ParaswapPriceRoute,
}

/// `POST /transactions/{network}` body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaswapTransactionRequest<'a> {
	pub src_token: Address,
	pub dest_token: Address,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub src_amount: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dest_amount: Option<&'a str>,
	/// Basis points
	pub slippage: u32,
	pub price_route: &'a ParaswapPriceRoute,
	pub user_address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParaswapTransactionResponse {
	pub to: Address,
	pub value: String,
	pub data: Bytes,
}

/// ParaSwap adapter for same-chain swaps
#[derive(Debug)]
pub struct ParaswapAdapter {
	config: AdapterRuntimeConfig,
	client_strategy: ClientStrategy,
}

impl ParaswapAdapter {
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

	fn token_address(token: &TokenRef) -> Address {
		token.address.unwrap_or(NATIVE_TOKEN)
	}
}

#[async_trait]
impl QuoteAdapter for ParaswapAdapter {
	fn source(&self) -> SourceId {
		SourceId::Paraswap
	}

	async fn quote_swap(&self, query: &SwapQuery) -> AdapterResult<Quote> {
		let client = self
			.client_strategy
			.client(&ClientConfig::from(&self.config))?;
		let src_token = Self::token_address(&query.token_in);
		let dest_token = Self::token_address(&query.token_out);

		let (amount, side) = match query.amount {
			AmountSpec::ExactIn(amount) => (amount, "SELL"),
			AmountSpec::ExactOut(amount) => (amount, "BUY"),
		};
		let mut params = vec![
			("srcToken", src_token.to_string()),
			("destToken", dest_token.to_string()),
			("srcDecimals", query.token_in.decimals.to_string()),
			("destDecimals", query.token_out.decimals.to_string()),
			("amount", amount.to_string()),
			("side", side.to_string()),
			("network", query.chain_id.to_string()),
			("userAddress", query.account.to_string()),
		];
		if let Some(dexes) = &query.dex_filter {
			params.push(("includeDEXS", dexes.join(",")));
		}

		let prices_url = format!("{}/prices", self.config.base_url());
		debug!(
			"Fetching ParaSwap price route from {} ({} {} on chain {})",
			prices_url, side, amount, query.chain_id
		);
		let response = client.get(&prices_url).query(&params).send().await?;
		let price: ParaswapPriceResponse = read_json(response, SourceId::Paraswap).await?;
		let route = price.price_route;

		let body = ParaswapTransactionRequest {
			src_token,
			dest_token,
			src_amount: (!query.amount.is_exact_out()).then_some(route.src_amount.as_str()),
			dest_amount: query.amount.is_exact_out().then_some(route.dest_amount.as_str()),
			slippage: query.slippage_bps,
			price_route: &route,
			user_address: query.account,
		};
		let tx_url = format!(
			"{}/transactions/{}",
			self.config.base_url(),
			query.chain_id
		);
		let response = client
			.post(&tx_url)
			.query(&[("ignoreChecks", "true"), ("ignoreGasEstimate", "true")])
			.json(&body)
			.send()
			.await?;
		let tx: ParaswapTransactionResponse = read_json(response, SourceId::Paraswap).await?;

		let amount_in = parse_amount(&route.src_amount, "srcAmount")?;
		let amount_out = parse_amount(&route.dest_amount, "destAmount")?;
		debug!(
			"ParaSwap quoted {} -> {} (gas ${})",
			amount_in,
			amount_out,
			route.gas_cost_usd.as_deref().unwrap_or("?")
		);

		let value = parse_quantity(&tx.value, "value")?;
		Ok(Quote::with_tx(
			SourceId::Paraswap,
			amount_in,
			Some(amount_out),
			QuoteTx::new(tx.to, tx.data, value),
		)
		.with_approval_target(route.token_transfer_proxy))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use router_types::{ChainId, QuotePrices};
	use serde_json::json;
	use wiremock::matchers::{body_partial_json, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const PROXY: &str = "0x216b4b4ba9f3e719726886d34a177484278bfcae";
	const AUGUSTUS: &str = "0xdef171fe48cf0115b1d80b88dc8eab59176fee57";

	fn query(amount: AmountSpec, dex_filter: Option<Vec<String>>) -> SwapQuery {
		SwapQuery {
			chain_id: ChainId::ETHEREUM,
			account: Address::repeat_byte(0xaa),
			token_in: TokenRef::erc20(Address::repeat_byte(0x11), "USDC", 6),
			token_out: TokenRef::native(ChainId::ETHEREUM),
			amount,
			gas_price: U256::from(10u64),
			slippage_bps: 100,
			adapter_count_hint: 4,
			dex_filter,
			limit_price: None,
			prices: QuotePrices::default(),
		}
	}

	async fn mount(server: &MockServer, side: &str, amounts: Value) {
		Mock::given(method("GET"))
			.and(path("/prices"))
			.and(query_param("side", side))
			.and(query_param("network", "1"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"priceRoute": {
					"srcAmount": "2000000000",
					"destAmount": "1000000000000000000",
					"tokenTransferProxy": PROXY,
					"gasCostUSD": "3.21",
					"bestRoute": [{ "percent": 100 }]
				}
			})))
			.mount(server)
			.await;
		Mock::given(method("POST"))
			.and(path("/transactions/1"))
			.and(query_param("ignoreChecks", "true"))
			.and(body_partial_json(json!({
				"slippage": 100,
				"priceRoute": { "bestRoute": [{ "percent": 100 }] }
			})))
			.and(body_partial_json(amounts))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"to": AUGUSTUS,
				"value": "0",
				"data": "0x54e3f31b"
			})))
			.expect(1)
			.mount(server)
			.await;
	}

	#[tokio::test]
	async fn test_sell_quote_targets_transfer_proxy() {
		let server = MockServer::start().await;
		mount(&server, "SELL", json!({ "srcAmount": "2000000000" })).await;

		let adapter = ParaswapAdapter::without_cache(AdapterRuntimeConfig::new(
			SourceId::Paraswap,
			server.uri(),
			5_000,
		));
		let quote = adapter
			.quote_swap(&query(AmountSpec::ExactIn(U256::from(2_000_000_000u64)), None))
			.await
			.unwrap();

		assert_eq!(quote.amount_in, U256::from(2_000_000_000u64));
		assert_eq!(quote.spender(), Some(PROXY.parse().unwrap()));
		assert_ne!(quote.spender(), quote.tx.as_ref().map(|tx| tx.to));
	}

	#[tokio::test]
	async fn test_buy_side_for_exact_out_with_dex_filter() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/prices"))
			.and(query_param("includeDEXS", "CurveV1,CurveV2"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;
		mount(&server, "BUY", json!({ "destAmount": "1000000000000000000" })).await;

		let adapter = ParaswapAdapter::new(AdapterRuntimeConfig::new(
			SourceId::Paraswap,
			server.uri(),
			5_000,
		));
		let quote = adapter
			.quote_swap(&query(
				AmountSpec::ExactOut(U256::from(1_000_000_000_000_000_000u64)),
				None,
			))
			.await
			.unwrap();
		assert_eq!(quote.amount_out, Some(U256::from(1_000_000_000_000_000_000u64)));

		let filtered = query(
			AmountSpec::ExactIn(U256::from(1u64)),
			Some(vec!["CurveV1".to_string(), "CurveV2".to_string()]),
		);
		assert!(adapter.quote_swap(&filtered).await.is_err());
	}
}
