//! Relay bridge adapter
//!
//! `/quote` returns the full execution plan as steps of transactions on the
//! origin chain. The quoted output is already net of relayer fees.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use router_types::{
	AdapterError, AdapterResult, AdapterRuntimeConfig, BridgeQuery, BridgeQuote, QuoteAdapter,
	QuoteTx, SourceId, TokenRef,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::http::{parse_amount, parse_quantity, read_json, ClientStrategy};

pub const DEFAULT_ENDPOINT: &str = "https://api.relay.link";

// ================================
// RELAY API MODELS
// ================================

/// `POST /quote` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayQuoteRequest {
	pub user: Address,
	pub recipient: Address,
	pub origin_chain_id: u64,
	pub destination_chain_id: u64,
	pub origin_currency: Address,
	pub destination_currency: Address,
	pub amount: String,
	pub trade_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayTransactionData {
	pub to: Address,
	#[serde(default)]
	pub data: Bytes,
	#[serde(default)]
	pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayStepItem {
	#[serde(default)]
	pub status: Option<String>,
	pub data: RelayTransactionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayStep {
	pub id: String,
	#[serde(default)]
	pub kind: Option<String>,
	#[serde(default)]
	pub items: Vec<RelayStepItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayCurrencyAmount {
	pub amount: String,
	#[serde(default)]
	pub amount_usd: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayDetails {
	pub currency_out: RelayCurrencyAmount,
}

/// `POST /quote` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayQuoteResponse {
	pub steps: Vec<RelayStep>,
	pub details: RelayDetails,
}

impl RelayQuoteResponse {
	/// Origin-chain transactions in execution order.
	///
	/// Relay's own approval step is dropped; the first target gets approved instead.
	fn transactions(&self) -> AdapterResult<Vec<QuoteTx>> {
		self.steps
			.iter()
			.filter(|step| step.kind.as_deref().unwrap_or("transaction") == "transaction")
			.filter(|step| step.id != "approve")
			.flat_map(|step| step.items.iter())
			.map(|item| -> AdapterResult<QuoteTx> {
				let value = match item.data.value.as_deref() {
					Some(value) => parse_quantity(value, "value")?,
					None => Default::default(),
				};
				Ok(QuoteTx::new(item.data.to, item.data.data.clone(), value))
			})
			.collect()
	}
}

/// Relay adapter for cross-chain bridge quotes
#[derive(Debug)]
pub struct RelayAdapter {
	config: AdapterRuntimeConfig,
	client_strategy: ClientStrategy,
}

impl RelayAdapter {
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

	/// Relay addresses native currencies as the zero address
	fn currency(token: &TokenRef) -> Address {
		token.address.unwrap_or(Address::ZERO)
	}
}

#[async_trait]
impl QuoteAdapter for RelayAdapter {
	fn source(&self) -> SourceId {
		SourceId::Relay
	}

	async fn quote_bridge(&self, query: &BridgeQuery) -> AdapterResult<BridgeQuote> {
		let body = RelayQuoteRequest {
			user: query.account,
			recipient: query.account,
			origin_chain_id: query.source_chain.as_u64(),
			destination_chain_id: query.dest_chain.as_u64(),
			origin_currency: Self::currency(&query.source_token),
			destination_currency: Self::currency(&query.dest_token),
			amount: query.amount.to_string(),
			trade_type: "EXACT_INPUT".to_string(),
		};

		let client = self
			.client_strategy
			.client(&ClientConfig::from(&self.config))?;
		let url = format!("{}/quote", self.config.base_url());
		debug!(
			"Fetching Relay quote from {}: {} on {} -> {} on {}",
			url, query.source_token.symbol, query.source_chain, query.dest_token.symbol, query.dest_chain
		);
		let response = client.post(&url).json(&body).send().await?;
		let relay_quote: RelayQuoteResponse = read_json(response, SourceId::Relay).await?;

		let txs = relay_quote.transactions()?;
		if txs.is_empty() {
			return Err(AdapterError::NoLiquidity {
				source_id: SourceId::Relay,
			});
		}
		let amount_out = parse_amount(
			&relay_quote.details.currency_out.amount,
			"currencyOut.amount",
		)?;

		Ok(BridgeQuote {
			source: SourceId::Relay,
			amount_out,
			txs,
			usd_fee: 0.0,
			skip_approve: query.source_token.is_native(),
		})
	}
}
