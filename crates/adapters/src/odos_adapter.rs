//! Odos smart order router adapter
//!
//! Quoting is two-step: `/sor/quote/v2` returns a path id which
//! `/sor/assemble` turns into a transaction. Odos only quotes exact input, so
//! exact-output requests go through the approximate-and-refine helper.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::Client;
use router_types::{
	AdapterError, AdapterResult, AdapterRuntimeConfig, AmountSpec, Quote, QuoteAdapter, QuoteTx,
	SourceId, SwapQuery, TokenRef,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::client_cache::{ClientCache, ClientConfig};
use crate::exact_out::quote_exact_out;
use crate::http::{parse_amount, parse_quantity, read_json, ClientStrategy};

pub const DEFAULT_ENDPOINT: &str = "https://api.odos.xyz";

// ================================
// ODOS API MODELS
// ================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdosInputToken {
	pub amount: String,
	pub token_address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdosOutputToken {
	pub proportion: u32,
	pub token_address: Address,
}

/// `POST /sor/quote/v2` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdosQuoteRequest {
	pub chain_id: u64,
	pub input_tokens: Vec<OdosInputToken>,
	pub output_tokens: Vec<OdosOutputToken>,
	pub referral_code: u32,
	pub slippage_limit_percent: f64,
	pub user_addr: Address,
}

/// `POST /sor/quote/v2` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdosQuoteResponse {
	pub path_id: String,
	pub in_amounts: Vec<String>,
	pub out_amounts: Vec<String>,
}

impl OdosQuoteResponse {
	fn first_amount(amounts: &[String], field: &str) -> AdapterResult<U256> {
		let amount = amounts
			.first()
			.ok_or_else(|| AdapterError::invalid_response(format!("Odos returned no {}", field)))?;
		parse_amount(amount, field)
	}

	fn amount_in(&self) -> AdapterResult<U256> {
		Self::first_amount(&self.in_amounts, "inAmounts")
	}

	fn amount_out(&self) -> AdapterResult<U256> {
		Self::first_amount(&self.out_amounts, "outAmounts")
	}
}

/// `POST /sor/assemble` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdosAssembleRequest {
	pub user_addr: Address,
	pub chain_id: u64,
	pub path_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdosTransaction {
	pub to: Address,
	pub data: Bytes,
	pub value: String,
}

/// `POST /sor/assemble` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdosAssembleResponse {
	pub transaction: OdosTransaction,
	/// Gas estimate in USD
	#[serde(default)]
	pub gas_estimate_value: Option<f64>,
}

/// Odos adapter for same-chain swaps
#[derive(Debug)]
pub struct OdosAdapter {
	config: AdapterRuntimeConfig,
	client_strategy: ClientStrategy,
}

impl OdosAdapter {
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

	/// Odos addresses the native asset as the zero address
	fn token_address(token: &TokenRef) -> Address {
		token.address.unwrap_or(Address::ZERO)
	}

	async fn fetch_quote(
		&self,
		client: &Client,
		query: &SwapQuery,
		amount_in: U256,
	) -> AdapterResult<OdosQuoteResponse> {
		let body = OdosQuoteRequest {
			chain_id: query.chain_id.as_u64(),
			input_tokens: vec![OdosInputToken {
				amount: amount_in.to_string(),
				token_address: Self::token_address(&query.token_in),
			}],
			output_tokens: vec![OdosOutputToken {
				proportion: 1,
				token_address: Self::token_address(&query.token_out),
			}],
			referral_code: 0,
			slippage_limit_percent: query.slippage_bps as f64 / 100.0,
			user_addr: query.account,
		};

		let url = format!("{}/sor/quote/v2", self.config.base_url());
		debug!("Fetching Odos quote from {} for {} in", url, amount_in);
		let response = client.post(&url).json(&body).send().await?;
		read_json(response, SourceId::Odos).await
	}

	async fn assemble(
		&self,
		client: &Client,
		query: &SwapQuery,
		path_id: String,
	) -> AdapterResult<OdosAssembleResponse> {
		let body = OdosAssembleRequest {
			user_addr: query.account,
			chain_id: query.chain_id.as_u64(),
			path_id,
		};
		let url = format!("{}/sor/assemble", self.config.base_url());
		let response = client.post(&url).json(&body).send().await?;
		read_json(response, SourceId::Odos).await
	}

	fn client(&self) -> AdapterResult<Arc<Client>> {
		self.client_strategy.client(&ClientConfig::from(&self.config))
	}
}

#[async_trait]
impl QuoteAdapter for OdosAdapter {
	fn source(&self) -> SourceId {
		SourceId::Odos
	}

	async fn quote_swap(&self, query: &SwapQuery) -> AdapterResult<Quote> {
		let client = self.client()?;

		let (amount_in, amount_out, path_id) = match query.amount {
			AmountSpec::ExactIn(amount) => {
				let quote = self.fetch_quote(&client, query, amount).await?;
				(quote.amount_in()?, quote.amount_out()?, quote.path_id)
			},
			AmountSpec::ExactOut(target) => {
				let (_, amount_out, quote) = quote_exact_out(
					target,
					&query.token_in,
					&query.token_out,
					&query.prices,
					|amount_in| {
						let client = client.clone();
						async move {
							let quote = self.fetch_quote(&client, query, amount_in).await?;
							Ok((quote.amount_out()?, quote))
						}
					},
				)
				.await?;
				(quote.amount_in()?, amount_out, quote.path_id)
			},
		};

		let assembled = self.assemble(&client, query, path_id).await?;
		debug!(
			"Odos quoted {} -> {} (gas ~${:?})",
			amount_in, amount_out, assembled.gas_estimate_value
		);

		let tx = assembled.transaction;
		let value = parse_quantity(&tx.value, "value")?;
		Ok(Quote::with_tx(
			SourceId::Odos,
			amount_in,
			Some(amount_out),
			QuoteTx::new(tx.to, tx.data, value),
		))
	}
}
