//! USD pricing and token metadata lookups

use alloy_primitives::Address;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::models::{ChainId, TokenRef};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceError {
	#[error("Price service request failed: {reason}")]
	Request { reason: String },

	#[error("Price service returned HTTP {status_code}")]
	Status { status_code: u16 },

	#[error("Chain {chain_id} is not known to the price service")]
	UnknownChain { chain_id: ChainId },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenResolveError {
	#[error("Chain {chain_id} has no token list")]
	UnknownChain { chain_id: ChainId },

	#[error("Token lookup failed: {reason}")]
	Lookup { reason: String },
}

/// USD price source
#[async_trait]
pub trait PriceOracle: Send + Sync + Debug {
	/// Price of one whole unit of `token`, `None` when unknown
	async fn get_usd_price(
		&self,
		account: Address,
		token: &TokenRef,
		chain_id: ChainId,
	) -> Result<Option<f64>, PriceError>;
}

/// Token metadata lookup by symbol
#[async_trait]
pub trait TokenResolver: Send + Sync + Debug {
	async fn resolve_token(
		&self,
		symbol: &str,
		chain_id: ChainId,
	) -> Result<Option<TokenRef>, TokenResolveError>;
}
