//! Across adapter implementation
//!
//! Fees come from `/suggested-fees`; the deposit transaction is encoded
//! locally against the origin spoke pool the API reports. Relayer fees are
//! subtracted from the output, so the quote carries no extra USD fee.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use router_types::{
	AdapterError, AdapterResult, AdapterRuntimeConfig, BridgeQuery, BridgeQuote, QuoteAdapter,
	QuoteTx, SourceId,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{parse_amount, read_json, ClientStrategy};

pub const DEFAULT_ENDPOINT: &str = "https://app.across.to/api";

sol! {
	/// Across spoke pool deposit entry point
	interface ISpokePool {
		function deposit(
			address recipient,
			address originToken,
			uint256 amount,
			uint256 destinationChainId,
			int64 relayerFeePct,
			uint32 quoteTimestamp,
			bytes message,
			uint256 maxCount
		) external payable;
	}
}

// ================================
// ACROSS API MODELS
// ================================

/// Across suggested fees response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcrossQuoteResponse {
	/// Estimated fill time in seconds
	#[serde(default)]
	pub estimated_fill_time_sec: Option<u64>,
	/// Capital fee total
	pub capital_fee_total: String,
	/// Relay fee percentage, 1e18 = 100%
	pub relay_fee_pct: String,
	/// Relay fee total
	pub relay_fee_total: String,
	/// Quote timestamp
	pub timestamp: String,
	/// Whether amount is too low
	#[serde(default)]
	pub is_amount_too_low: bool,
	/// Spoke pool address on the origin chain
	pub spoke_pool_address: Address,
	/// LP fee breakdown
	pub lp_fee: AcrossFeeBand,
	/// Deposit limits
	#[serde(default)]
	pub limits: Option<AcrossLimits>,
}

/// Across fee breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcrossFeeBand {
	/// Fee percentage
	pub pct: String,
	/// Fee total amount
	pub total: String,
}

/// Across deposit limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcrossLimits {
	/// Minimum deposit amount
	pub min_deposit: String,
	/// Maximum deposit amount
	pub max_deposit: String,
}

impl AcrossQuoteResponse {
	/// Input minus every fee Across takes out of the deposit
	pub fn amount_out(&self, amount: U256) -> AdapterResult<U256> {
		let fees = [
			parse_amount(&self.capital_fee_total, "capitalFeeTotal")?,
			parse_amount(&self.relay_fee_total, "relayFeeTotal")?,
			parse_amount(&self.lp_fee.total, "lpFee.total")?,
		];
		Ok(fees
			.into_iter()
			.fold(amount, |remaining, fee| remaining.saturating_sub(fee)))
	}

	fn deposit_calldata(
		&self,
		recipient: Address,
		origin_token: Address,
		amount: U256,
		destination_chain: u64,
	) -> AdapterResult<Bytes> {
		let relayer_fee_pct = self.relay_fee_pct.parse::<i64>().map_err(|e| {
			AdapterError::invalid_response(format!("Invalid relayFeePct '{}': {}", self.relay_fee_pct, e))
		})?;
		let quote_timestamp = self.timestamp.parse::<u32>().map_err(|e| {
			AdapterError::invalid_response(format!("Invalid timestamp '{}': {}", self.timestamp, e))
		})?;

		let call = ISpokePool::depositCall {
			recipient,
			originToken: origin_token,
			amount,
			destinationChainId: U256::from(destination_chain),
			relayerFeePct: relayer_fee_pct,
			quoteTimestamp: quote_timestamp,
			message: Bytes::new(),
			maxCount: U256::MAX,
		};
		Ok(call.abi_encode().into())
	}
}

/// Across adapter for cross-chain bridge quotes
#[derive(Debug)]
pub struct AcrossAdapter {
	config: AdapterRuntimeConfig,
	client_strategy: ClientStrategy,
}

impl AcrossAdapter {
	/// Create a new Across adapter with client caching
	pub fn new(config: AdapterRuntimeConfig) -> Self {
		Self::with_cache(config, ClientCache::new())
	}

	/// Create Across adapter with custom client cache
	pub fn with_cache(config: AdapterRuntimeConfig, cache: ClientCache) -> Self {
		Self {
			config,
			client_strategy: ClientStrategy::Cached(cache),
		}
	}

	/// Create Across adapter without client caching
	pub fn without_cache(config: AdapterRuntimeConfig) -> Self {
		Self {
			config,
			client_strategy: ClientStrategy::OnDemand,
		}
	}
}

#[async_trait]
impl QuoteAdapter for AcrossAdapter {
	fn source(&self) -> SourceId {
		SourceId::Across
	}

	async fn quote_bridge(&self, query: &BridgeQuery) -> AdapterResult<BridgeQuote> {
		// Across quotes WETH as ETH and the amounts come back inconsistent
		if query.source_token.has_symbol("weth") {
			return Err(AdapterError::UnsupportedToken {
				token: query.source_token.symbol.to_ascii_lowercase(),
				source_id: SourceId::Across,
			});
		}

		let bridging_native = query.source_token.is_native();
		let input_token = match query.source_token.address {
			Some(address) => address,
			None => query
				.source_chain
				.weth_address()
				.ok_or(AdapterError::ChainNotSupported {
					chain_id: query.source_chain,
					source_id: SourceId::Across,
				})?,
		};
		let output_token = match query.dest_token.address {
			Some(address) => address,
			None => query
				.dest_chain
				.weth_address()
				.ok_or(AdapterError::ChainNotSupported {
					chain_id: query.dest_chain,
					source_id: SourceId::Across,
				})?,
		};

		let client = self
			.client_strategy
			.client(&ClientConfig::from(&self.config))?;
		let quote_url = format!("{}/suggested-fees", self.config.base_url());
		debug!(
			"Fetching Across quote from {} - {}:{} -> {}:{}",
			quote_url, query.source_chain, input_token, query.dest_chain, output_token
		);

		let response = client
			.get(&quote_url)
			.query(&[
				("inputToken", input_token.to_string()),
				("outputToken", output_token.to_string()),
				("originChainId", query.source_chain.to_string()),
				("destinationChainId", query.dest_chain.to_string()),
				("amount", query.amount.to_string()),
			])
			.send()
			.await?;
		let across_quote: AcrossQuoteResponse = read_json(response, SourceId::Across).await?;

		if across_quote.is_amount_too_low {
			let minimum = across_quote
				.limits
				.as_ref()
				.map(|l| l.min_deposit.as_str())
				.unwrap_or("unknown");
			return Err(AdapterError::invalid_response(format!(
				"Amount {} is below minimum deposit of {}",
				query.amount, minimum
			)));
		}

		let amount_out = across_quote.amount_out(query.amount)?;
		let data = across_quote.deposit_calldata(
			query.account,
			input_token,
			query.amount,
			query.dest_chain.as_u64(),
		)?;
		let value = if bridging_native {
			query.amount
		} else {
			U256::ZERO
		};

		debug!(
			"Across quoted {} -> {} (fill ~{:?}s)",
			query.amount, amount_out, across_quote.estimated_fill_time_sec
		);

		Ok(BridgeQuote {
			source: SourceId::Across,
			amount_out,
			txs: vec![QuoteTx::new(across_quote.spoke_pool_address, data, value)],
			usd_fee: 0.0,
			skip_approve: bridging_native,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::{ChainId, TokenRef};
	use serde_json::json;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const SPOKE_POOL: &str = "0x5c7bcd6e7de5423a257d81b442095a1a6ced35c5";

	fn fees_body(too_low: bool) -> serde_json::Value {
		json!({
			"estimatedFillTimeSec": 12,
			"capitalFeePct": "100000000000000",
			"capitalFeeTotal": "100000",
			"relayGasFeePct": "0",
			"relayGasFeeTotal": "0",
			"relayFeePct": "1200000000000000",
			"relayFeeTotal": "1200000",
			"lpFeePct": "0",
			"timestamp": "1717000000",
			"isAmountTooLow": too_low,
			"quoteBlock": "20000000",
			"spokePoolAddress": SPOKE_POOL,
			"lpFee": { "pct": "50000000000000", "total": "50000" },
			"limits": {
				"minDeposit": "5000000",
				"maxDeposit": "1000000000000",
				"maxDepositInstant": "1000000000",
				"maxDepositShortDelay": "1000000000",
				"recommendedDepositInstant": "1000000000"
			}
		})
	}

	fn query(source_token: TokenRef) -> BridgeQuery {
		BridgeQuery {
			source_chain: ChainId::ARBITRUM,
			dest_chain: ChainId::BASE,
			account: Address::repeat_byte(0xaa),
			source_token,
			dest_token: TokenRef::erc20(Address::repeat_byte(0x22), "USDC", 6),
			amount: U256::from(1_000_000_000u64),
			adapter_count_hint: 2,
		}
	}

	#[test]
	fn test_amount_out_subtracts_fees() {
		let response: AcrossQuoteResponse = serde_json::from_value(fees_body(false)).unwrap();
		assert_eq!(
			response.amount_out(U256::from(1_000_000_000u64)).unwrap(),
			U256::from(998_650_000u64)
		);
		assert_eq!(
			response.amount_out(U256::from(10u64)).unwrap(),
			U256::ZERO
		);
	}

	#[tokio::test]
	async fn test_erc20_deposit_targets_spoke_pool() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/suggested-fees"))
			.and(query_param("originChainId", "42161"))
			.and(query_param("destinationChainId", "8453"))
			.and(query_param("amount", "1000000000"))
			.respond_with(ResponseTemplate::new(200).set_body_json(fees_body(false)))
			.mount(&server)
			.await;

		let adapter = AcrossAdapter::without_cache(AdapterRuntimeConfig::new(
			SourceId::Across,
			server.uri(),
			5_000,
		));
		let usdc = TokenRef::erc20(Address::repeat_byte(0x11), "USDC", 6);
		let quote = adapter.quote_bridge(&query(usdc)).await.unwrap();

		assert_eq!(quote.amount_out, U256::from(998_650_000u64));
		assert!(!quote.skip_approve);
		assert_eq!(quote.txs.len(), 1);
		let tx = &quote.txs[0];
		assert_eq!(tx.to, SPOKE_POOL.parse::<Address>().unwrap());
		assert_eq!(tx.value, U256::ZERO);
		assert_eq!(&tx.data[..4], ISpokePool::depositCall::SELECTOR.as_slice());

		let decoded = ISpokePool::depositCall::abi_decode(&tx.data).unwrap();
		assert_eq!(decoded.recipient, Address::repeat_byte(0xaa));
		assert_eq!(decoded.destinationChainId, U256::from(8453u64));
		assert_eq!(decoded.relayerFeePct, 1_200_000_000_000_000i64);
	}

	#[tokio::test]
	async fn test_native_deposit_sends_value() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/suggested-fees"))
			.and(query_param(
				"inputToken",
				ChainId::ARBITRUM.weth_address().unwrap().to_string(),
			))
			.respond_with(ResponseTemplate::new(200).set_body_json(fees_body(false)))
			.mount(&server)
			.await;

		let adapter =
			AcrossAdapter::new(AdapterRuntimeConfig::new(SourceId::Across, server.uri(), 5_000));
		let quote = adapter
			.quote_bridge(&query(TokenRef::native(ChainId::ARBITRUM)))
			.await
			.unwrap();

		assert!(quote.skip_approve);
		assert_eq!(quote.txs[0].value, U256::from(1_000_000_000u64));
	}

	#[tokio::test]
	async fn test_amount_too_low_and_weth_have_no_route() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/suggested-fees"))
			.respond_with(ResponseTemplate::new(200).set_body_json(fees_body(true)))
			.mount(&server)
			.await;

		let adapter =
			AcrossAdapter::new(AdapterRuntimeConfig::new(SourceId::Across, server.uri(), 5_000));
		let usdc = TokenRef::erc20(Address::repeat_byte(0x11), "USDC", 6);
		assert!(adapter.bridge_quote(&query(usdc)).await.unwrap().is_none());

		let weth = TokenRef::erc20(Address::repeat_byte(0x33), "WETH", 18);
		let mut sole = query(weth);
		sole.adapter_count_hint = 1;
		let err = adapter.bridge_quote(&sole).await.unwrap_err();
		assert_eq!(err.to_string(), "weth is not supported for swap on across");
	}
}
