//! In-process token metadata lookup

use alloy_primitives::{address, Address};
use async_trait::async_trait;
use router_types::{ChainId, TokenRef, TokenResolveError, TokenResolver};
use std::collections::HashMap;

/// Token list keyed by chain and lowercase symbol.
///
/// Every known chain resolves its native symbol and `weth`; further tokens
/// are registered with [`StaticTokenResolver::with_token`].
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
	tokens: HashMap<(ChainId, String), TokenRef>,
}

impl StaticTokenResolver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolver preloaded with USDC on the chains the router routes on
	pub fn with_defaults() -> Self {
		let usdc: [(ChainId, Address); 7] = [
			(ChainId::ETHEREUM, address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")),
			(ChainId::OPTIMISM, address!("0b2C639c533813f4Aa9D7837CAf62653d097Ff85")),
			(ChainId::POLYGON, address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359")),
			(ChainId::BASE, address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")),
			(ChainId::ARBITRUM, address!("af88d065e77c8cC2239327C5EDb3A432268e5831")),
			(ChainId::AVALANCHE, address!("B97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E")),
			(ChainId::ZKSYNC, address!("1d17CBcF0D6D143135aE902365D2E5e2A16538D4")),
		];
		usdc.into_iter().fold(Self::new(), |resolver, (chain_id, address)| {
			resolver.with_token(chain_id, TokenRef::erc20(address, "USDC", 6))
		})
	}

	pub fn with_token(mut self, chain_id: ChainId, token: TokenRef) -> Self {
		self.tokens
			.insert((chain_id, token.symbol.to_lowercase()), token);
		self
	}

	fn builtin(symbol: &str, chain_id: ChainId) -> Option<TokenRef> {
		if symbol.eq_ignore_ascii_case(chain_id.native_symbol()) {
			return Some(TokenRef::native(chain_id));
		}
		if symbol.eq_ignore_ascii_case("weth") {
			return chain_id
				.weth_address()
				.map(|address| TokenRef::erc20(address, "WETH", 18));
		}
		None
	}
}

#[async_trait]
impl TokenResolver for StaticTokenResolver {
	async fn resolve_token(
		&self,
		symbol: &str,
		chain_id: ChainId,
	) -> Result<Option<TokenRef>, TokenResolveError> {
		if chain_id.name().is_none() {
			return Err(TokenResolveError::UnknownChain { chain_id });
		}
		Ok(self
			.tokens
			.get(&(chain_id, symbol.to_lowercase()))
			.cloned()
			.or_else(|| Self::builtin(symbol, chain_id)))
	}
}
