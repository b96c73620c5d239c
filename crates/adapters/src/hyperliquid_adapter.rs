//! Hyperliquid spot venue adapter
//!
//! Hyperliquid is not an EVM chain the sandbox can fork, so quotes are
//! priced from the spot market and answered with an order payload to sign.
//! Only markets quoted against USDC are supported.

use alloy_primitives::U256;
use async_trait::async_trait;
use router_types::{
	AdapterError, AdapterResult, AdapterRuntimeConfig, AmountSpec, Quote, QuoteAdapter, SourceId,
	SwapQuery, TokenRef,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{read_json, ClientStrategy};

pub const DEFAULT_ENDPOINT: &str = "https://api.hyperliquid.xyz";

/// Spot market metadata is refreshed at most this often
const MARKETS_TTL: Duration = Duration::from_secs(60 * 60);

// ================================
// HYPERLIQUID API MODELS
// ================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HyperliquidSpotToken {
	pub name: String,
	pub index: usize,
	#[serde(default)]
	pub sz_decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperliquidSpotPair {
	pub name: String,
	/// `[base, quote]` token indices
	pub tokens: [usize; 2],
	pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperliquidSpotMeta {
	pub tokens: Vec<HyperliquidSpotToken>,
	pub universe: Vec<HyperliquidSpotPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HyperliquidAssetCtx {
	#[serde(default)]
	pub mark_px: Option<String>,
}

/// `POST /info {"type": "spotMetaAndAssetCtxs"}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperliquidSpotMetaAndCtxs(pub HyperliquidSpotMeta, pub Vec<HyperliquidAssetCtx>);

/// A USDC-quoted spot market
#[derive(Debug, Clone, PartialEq)]
pub struct SpotMarket {
	/// Base token name, e.g. `HYPE`
	pub base: String,
	pub mark_price: f64,
}

impl HyperliquidSpotMetaAndCtxs {
	/// USDC-quoted markets with a mark price
	pub fn usdc_markets(&self) -> Vec<SpotMarket> {
		let HyperliquidSpotMetaAndCtxs(meta, ctxs) = self;
		let token_name = |index: usize| {
			meta.tokens
				.iter()
				.find(|t| t.index == index)
				.map(|t| t.name.as_str())
		};

		meta.universe
			.iter()
			.filter_map(|pair| {
				let [base, quote] = pair.tokens;
				if !token_name(quote)?.eq_ignore_ascii_case("usdc") {
					return None;
				}
				let mark_price = ctxs
					.get(pair.index)?
					.mark_px
					.as_deref()?
					.parse::<f64>()
					.ok()
					.filter(|p| *p > 0.0)?;
				Some(SpotMarket {
					base: token_name(base)?.to_string(),
					mark_price,
				})
			})
			.collect()
	}
}

#[derive(Debug)]
struct CachedMarkets {
	markets: Arc<Vec<SpotMarket>>,
	fetched_at: Instant,
}

/// Hyperliquid spot adapter (signature-only venue)
#[derive(Debug)]
pub struct HyperliquidAdapter {
	config: AdapterRuntimeConfig,
	client_strategy: ClientStrategy,
	markets: RwLock<Option<CachedMarkets>>,
}

impl HyperliquidAdapter {
	pub fn new(config: AdapterRuntimeConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	pub fn with_cache(config: AdapterRuntimeConfig, cache: ClientCache) -> Self {
		Self {
			config,
			client_strategy: ClientStrategy::Cached(cache),
			markets: RwLock::new(None),
		}
	}

	pub fn without_cache(config: AdapterRuntimeConfig) -> Self {
		Self {
			config,
			client_strategy: ClientStrategy::OnDemand,
			markets: RwLock::new(None),
		}
	}

	async fn spot_markets(&self) -> AdapterResult<Arc<Vec<SpotMarket>>> {
		if let Some(cached) = self.markets.read().await.as_ref() {
			if cached.fetched_at.elapsed() < MARKETS_TTL {
				return Ok(cached.markets.clone());
			}
		}

		let client = self
			.client_strategy
			.client(&ClientConfig::from(&self.config))?;
		let url = format!("{}/info", self.config.base_url());
		let response = client
			.post(&url)
			.json(&json!({ "type": "spotMetaAndAssetCtxs" }))
			.send()
			.await?;
		let meta: HyperliquidSpotMetaAndCtxs = read_json(response, SourceId::Hyperliquid).await?;
		let markets = Arc::new(meta.usdc_markets());
		debug!("Loaded {} Hyperliquid spot markets", markets.len());

		*self.markets.write().await = Some(CachedMarkets {
			markets: markets.clone(),
			fetched_at: Instant::now(),
		});
		Ok(markets)
	}
}

#[async_trait]
impl QuoteAdapter for HyperliquidAdapter {
	fn source(&self) -> SourceId {
		SourceId::Hyperliquid
	}

	async fn quote_swap(&self, query: &SwapQuery) -> AdapterResult<Quote> {
		let buying = query.token_in.has_symbol("usdc");
		if !buying && !query.token_out.has_symbol("usdc") {
			return Err(AdapterError::fatal(
				"Only swaps with USDC are supported on Hyperliquid.",
			));
		}

		let market_token = if buying {
			&query.token_out
		} else {
			&query.token_in
		};
		let markets = self.spot_markets().await?;
		let market = markets
			.iter()
			.find(|m| m.base.eq_ignore_ascii_case(&market_token.symbol))
			.ok_or_else(|| AdapterError::UnsupportedToken {
				token: market_token.symbol.to_ascii_lowercase(),
				source_id: SourceId::Hyperliquid,
			})?;

		let price = query
			.limit_price
			.filter(|p| p.is_finite() && *p > 0.0)
			.unwrap_or(market.mark_price);
		let usdc_price = if buying {
			query.prices.token_in_usd
		} else {
			query.prices.token_out_usd
		}
		.filter(|p| *p > 0.0)
		.unwrap_or(1.0);

		let order = SpotOrder::price(query, buying, price, usdc_price);
		debug!(
			"Hyperliquid {} {} at {} -> {}",
			order.side, order.market_amount, price, order.output_amount
		);

		let sign_data = json!({
			"market": format!("{}/USDC", market_token.symbol.to_ascii_uppercase()),
			"side": order.side,
			"amount": order.market_amount,
			"price": price,
			"outputAmount": order.output_amount,
		});
		Ok(Quote::signature_only(
			SourceId::Hyperliquid,
			order.amount_in,
			Some(order.amount_out),
			sign_data,
		))
	}
}

/// Sizes of a spot order derived from the request
struct SpotOrder {
	side: &'static str,
	amount_in: U256,
	amount_out: U256,
	/// Order size in base-token units
	market_amount: f64,
	output_amount: f64,
}

impl SpotOrder {
	fn price(query: &SwapQuery, buying: bool, price: f64, usdc_price: f64) -> Self {
		let token_in: &TokenRef = &query.token_in;
		let relative = price / usdc_price;

		let amount_in = match query.amount {
			AmountSpec::ExactIn(amount) => amount,
			AmountSpec::ExactOut(target) => {
				let out_units = query.token_out.to_units(target);
				let in_units = if buying {
					out_units * price / usdc_price
				} else {
					out_units * usdc_price / price
				};
				token_in.from_units(in_units)
			},
		};

		let in_units = token_in.to_units(amount_in);
		let output_amount = if buying {
			in_units / relative
		} else {
			in_units * relative
		};
		let market_amount = if buying { in_units / price } else { in_units };
		let amount_out = query
			.amount
			.amount_out()
			.unwrap_or_else(|| query.token_out.from_units(output_amount));

		Self {
			side: if buying { "buy" } else { "sell" },
			amount_in,
			amount_out,
			market_amount,
			output_amount,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::Address;
	use router_types::{ChainId, QuotePrices};
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn usdc() -> TokenRef {
		TokenRef::erc20(Address::repeat_byte(0x11), "USDC", 6)
	}

	fn hype() -> TokenRef {
		TokenRef::erc20(Address::repeat_byte(0x33), "HYPE", 8)
	}

	fn query(token_in: TokenRef, token_out: TokenRef, amount: AmountSpec) -> SwapQuery {
		SwapQuery {
			chain_id: ChainId::ARBITRUM,
			account: Address::repeat_byte(0xaa),
			token_in,
			token_out,
			amount,
			gas_price: U256::ZERO,
			slippage_bps: 50,
			adapter_count_hint: 1,
			dex_filter: None,
			limit_price: None,
			prices: QuotePrices::default(),
		}
	}

	async fn server_with_markets() -> MockServer {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/info"))
			.and(body_json(json!({ "type": "spotMetaAndAssetCtxs" })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([
				{
					"tokens": [
						{ "name": "USDC", "index": 0, "szDecimals": 8 },
						{ "name": "PURR", "index": 1, "szDecimals": 0 },
						{ "name": "HYPE", "index": 150, "szDecimals": 2 }
					],
					"universe": [
						{ "name": "PURR/USDC", "tokens": [1, 0], "index": 0 },
						{ "name": "@107", "tokens": [150, 0], "index": 1 }
					]
				},
				[
					{ "markPx": "0.2" },
					{ "markPx": "25.0" }
				]
			])))
			.expect(1)
			.mount(&server)
			.await;
		server
	}

	#[tokio::test]
	async fn test_buy_with_usdc_at_mark_price() {
		let server = server_with_markets().await;
		let adapter = HyperliquidAdapter::without_cache(AdapterRuntimeConfig::new(
			SourceId::Hyperliquid,
			server.uri(),
			5_000,
		));

		let quote = adapter
			.quote_swap(&query(
				usdc(),
				hype(),
				AmountSpec::ExactIn(U256::from(100_000_000u64)),
			))
			.await
			.unwrap();

		let sign_data = quote.sign_data.clone().unwrap();
		assert_eq!(sign_data["market"], "HYPE/USDC");
		assert_eq!(sign_data["side"], "buy");
		assert_eq!(sign_data["price"], 25.0);
		assert_eq!(sign_data["amount"], 4.0);
		assert_eq!(quote.amount_out, Some(U256::from(400_000_000u64)));

		// Second quote is served from the market cache
		let mut limited = query(hype(), usdc(), AmountSpec::ExactIn(U256::from(200_000_000u64)));
		limited.limit_price = Some(30.0);
		let quote = adapter.quote_swap(&limited).await.unwrap();
		let sign_data = quote.sign_data.unwrap();
		assert_eq!(sign_data["side"], "sell");
		assert_eq!(sign_data["outputAmount"], 60.0);
	}

	#[tokio::test]
	async fn test_exact_out_sell() {
		let server = server_with_markets().await;
		let adapter = HyperliquidAdapter::new(AdapterRuntimeConfig::new(
			SourceId::Hyperliquid,
			server.uri(),
			5_000,
		));

		// Receive 50 USDC selling HYPE at 25
		let quote = adapter
			.quote_swap(&query(
				hype(),
				usdc(),
				AmountSpec::ExactOut(U256::from(50_000_000u64)),
			))
			.await
			.unwrap();
		assert_eq!(quote.amount_in, U256::from(200_000_000u64));
		assert_eq!(quote.amount_out, Some(U256::from(50_000_000u64)));
	}

	#[tokio::test]
	async fn test_unsupported_pairs() {
		let server = server_with_markets().await;
		let adapter = HyperliquidAdapter::new(AdapterRuntimeConfig::new(
			SourceId::Hyperliquid,
			server.uri(),
			5_000,
		));

		let weth = TokenRef::erc20(Address::repeat_byte(0x44), "WETH", 18);
		let err = adapter
			.quote(&query(hype(), weth, AmountSpec::ExactIn(U256::from(1u64))))
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "Only swaps with USDC are supported on Hyperliquid.");

		let pepe = TokenRef::erc20(Address::repeat_byte(0x55), "PEPE", 18);
		let err = adapter
			.quote(&query(usdc(), pepe, AmountSpec::ExactIn(U256::from(1u64))))
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "pepe is not supported for swap on hyperliquid");
	}
}
