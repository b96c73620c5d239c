//! CoW Protocol adapter
//!
//! CoW answers with an off-chain order to sign rather than a transaction, and
//! its quoted price is final. The network fee is folded into the sell amount
//! so the signed order carries no separate fee.

use alloy_primitives::Address;
use async_trait::async_trait;
use router_types::{
	AdapterError, AdapterResult, AdapterRuntimeConfig, AmountSpec, ChainId, Quote, QuoteAdapter,
	SourceId, SwapQuery,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{parse_amount, read_json, ClientStrategy};
use crate::zerox_adapter::NATIVE_TOKEN;

pub const DEFAULT_ENDPOINT: &str = "https://api.cow.fi";

// ================================
// COW API MODELS
// ================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CowOrderKind {
	Sell,
	Buy,
}

/// `POST /api/v1/quote` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CowQuoteRequest {
	pub sell_token: Address,
	pub buy_token: Address,
	pub from: Address,
	pub receiver: Address,
	pub onchain_order: bool,
	pub kind: CowOrderKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sell_amount_before_fee: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub buy_amount_after_fee: Option<String>,
}

/// Order terms inside a quote response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CowOrder {
	pub sell_amount: String,
	pub buy_amount: String,
	pub fee_amount: String,
	#[serde(flatten)]
	pub rest: Map<String, Value>,
}

/// `POST /api/v1/quote` response; the whole document becomes the sign payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CowQuoteResponse {
	pub quote: CowOrder,
	#[serde(flatten)]
	pub rest: Map<String, Value>,
}

/// CoW Swap adapter (signature-only, firm price)
#[derive(Debug)]
pub struct CowSwapAdapter {
	config: AdapterRuntimeConfig,
	client_strategy: ClientStrategy,
}

impl CowSwapAdapter {
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

	fn network(chain_id: ChainId) -> AdapterResult<&'static str> {
		match chain_id {
			ChainId::ETHEREUM => Ok("mainnet"),
			ChainId::ARBITRUM => Ok("arbitrum_one"),
			_ => Err(AdapterError::fatal(
				"Only Ethereum and Arbitrum are supported for Cowswap.",
			)),
		}
	}
}

#[async_trait]
impl QuoteAdapter for CowSwapAdapter {
	fn source(&self) -> SourceId {
		SourceId::CowSwap
	}

	async fn quote_swap(&self, query: &SwapQuery) -> AdapterResult<Quote> {
		let network = Self::network(query.chain_id)?;
		// Native sells need an on-chain wrap first
		let sell_token = query
			.token_in
			.address
			.ok_or_else(|| AdapterError::UnsupportedToken {
				token: query.token_in.symbol.clone(),
				source_id: SourceId::CowSwap,
			})?;

		let (kind, sell_amount_before_fee, buy_amount_after_fee) = match query.amount {
			AmountSpec::ExactIn(amount) => (CowOrderKind::Sell, Some(amount.to_string()), None),
			AmountSpec::ExactOut(amount) => (CowOrderKind::Buy, None, Some(amount.to_string())),
		};
		let body = CowQuoteRequest {
			sell_token,
			buy_token: query.token_out.address.unwrap_or(NATIVE_TOKEN),
			from: query.account,
			receiver: query.account,
			onchain_order: false,
			kind,
			sell_amount_before_fee,
			buy_amount_after_fee,
		};

		let client = self
			.client_strategy
			.client(&ClientConfig::from(&self.config))?;
		let url = format!("{}/{}/api/v1/quote", self.config.base_url(), network);
		debug!("Fetching CoW quote from {} ({:?})", url, kind);
		let response = client.post(&url).json(&body).send().await?;
		let mut quote: CowQuoteResponse = read_json(response, SourceId::CowSwap).await?;

		let sell_amount = parse_amount(&quote.quote.sell_amount, "sellAmount")?;
		let fee_amount = parse_amount(&quote.quote.fee_amount, "feeAmount")?;
		let buy_amount = parse_amount(&quote.quote.buy_amount, "buyAmount")?;
		let amount_in = sell_amount.saturating_add(fee_amount);

		quote.quote.sell_amount = amount_in.to_string();
		quote.quote.fee_amount = "0".to_string();
		let sign_data = serde_json::to_value(&quote)?;

		Ok(Quote::signature_only(
			SourceId::CowSwap,
			amount_in,
			Some(buy_amount),
			sign_data,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use router_types::{QuotePrices, TokenRef};
	use serde_json::json;
	use wiremock::matchers::{body_partial_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn query(chain_id: ChainId, token_in: TokenRef, hint: usize) -> SwapQuery {
		SwapQuery {
			chain_id,
			account: Address::repeat_byte(0xaa),
			token_in,
			token_out: TokenRef::erc20(Address::repeat_byte(0x22), "DAI", 18),
			amount: AmountSpec::ExactIn(U256::from(1_000_000u64)),
			gas_price: U256::from(10u64),
			slippage_bps: 50,
			adapter_count_hint: hint,
			dex_filter: None,
			limit_price: None,
			prices: QuotePrices::default(),
		}
	}

	fn usdc() -> TokenRef {
		TokenRef::erc20(Address::repeat_byte(0x11), "USDC", 6)
	}

	#[tokio::test]
	async fn test_fee_folded_into_sell_amount() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/arbitrum_one/api/v1/quote"))
			.and(body_partial_json(json!({
				"kind": "sell",
				"sellAmountBeforeFee": "1000000",
				"onchainOrder": false
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"quote": {
					"sellAmount": "990000",
					"buyAmount": "989000000000000000",
					"feeAmount": "10000",
					"validTo": 1700000000
				},
				"from": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
				"id": 42
			})))
			.mount(&server)
			.await;

		let adapter = CowSwapAdapter::without_cache(AdapterRuntimeConfig::new(
			SourceId::CowSwap,
			server.uri(),
			5_000,
		));
		let quote = adapter
			.quote_swap(&query(ChainId::ARBITRUM, usdc(), 3))
			.await
			.unwrap();

		assert!(quote.is_signature_only());
		assert_eq!(quote.amount_in, U256::from(1_000_000u64));
		assert_eq!(quote.amount_out, Some(U256::from(989_000_000_000_000_000u64)));

		let sign_data = quote.sign_data.unwrap();
		assert_eq!(sign_data["quote"]["sellAmount"], "1000000");
		assert_eq!(sign_data["quote"]["feeAmount"], "0");
		assert_eq!(sign_data["quote"]["validTo"], 1700000000);
		assert_eq!(sign_data["id"], 42);
	}

	#[tokio::test]
	async fn test_unsupported_chain_is_verbatim_for_sole_source() {
		let adapter = CowSwapAdapter::new(AdapterRuntimeConfig::new(
			SourceId::CowSwap,
			DEFAULT_ENDPOINT,
			5_000,
		));

		let err = adapter
			.quote(&query(ChainId::BASE, usdc(), 1))
			.await
			.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Only Ethereum and Arbitrum are supported for Cowswap."
		);
		assert!(adapter
			.quote(&query(ChainId::BASE, usdc(), 2))
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_native_sell_has_no_route() {
		let adapter = CowSwapAdapter::new(AdapterRuntimeConfig::new(
			SourceId::CowSwap,
			DEFAULT_ENDPOINT,
			5_000,
		));
		let result = adapter
			.quote_swap(&query(ChainId::ETHEREUM, TokenRef::native(ChainId::ETHEREUM), 2))
			.await;
		assert!(matches!(result, Err(AdapterError::UnsupportedToken { .. })));
	}
}
