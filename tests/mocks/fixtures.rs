//! Tokens, accounts and router wiring shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use swap_router::alloy_primitives::{Address, U256};
use swap_router::config::Settings;
use swap_router::mocks::{FixedPriceOracle, SimulatedChain};
use swap_router::{
	AmountSpec, BridgeRequest, ChainId, QuoteAdapter, RouteMode, RouteOrchestrator, RouteValidator,
	RouterBuilder, SourceId, StaticTokenResolver, SwapRequest, TokenRef,
};

pub const GWEI: u64 = 1_000_000_000;

pub fn account() -> Address {
	Address::repeat_byte(0xaa)
}

pub fn usdc() -> TokenRef {
	TokenRef::erc20(Address::repeat_byte(0x01), "USDC", 6)
}

pub fn dai() -> TokenRef {
	TokenRef::erc20(Address::repeat_byte(0x02), "DAI", 18)
}

/// Contract each source routes its transactions through
pub fn router_address(source: SourceId) -> Address {
	let index = SourceId::ALL
		.iter()
		.position(|candidate| *candidate == source)
		.unwrap_or_default();
	Address::with_last_byte(0x10 + index as u8)
}

/// Raw USDC amount for whole units
pub fn usdc_units(units: u64) -> U256 {
	U256::from(units) * U256::from(1_000_000u64)
}

pub fn dai_units(units: u64) -> U256 {
	U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn prices() -> FixedPriceOracle {
	FixedPriceOracle::new()
		.with_price("ETH", 3_000.0)
		.with_price("USDC", 1.0)
		.with_price("DAI", 1.0)
}

/// 1000 USDC -> DAI on Base
pub fn swap_request(mode: RouteMode) -> SwapRequest {
	SwapRequest::new(
		ChainId::BASE,
		account(),
		usdc(),
		dai(),
		AmountSpec::ExactIn(usdc_units(1_000)),
		U256::from(GWEI),
	)
	.with_mode(mode)
}

/// 100 USDC from Base to Arbitrum
pub fn bridge_request(mode: RouteMode) -> BridgeRequest {
	BridgeRequest::new(
		ChainId::BASE,
		ChainId::ARBITRUM,
		account(),
		usdc(),
		usdc(),
		usdc_units(100),
		U256::from(GWEI),
	)
	.with_mode(mode)
}

fn builder(chain: &SimulatedChain, adapters: Vec<Arc<dyn QuoteAdapter>>) -> RouterBuilder {
	adapters
		.into_iter()
		.fold(RouterBuilder::new(), |builder, adapter| builder.with_adapter(adapter))
		.with_settings(Settings::default())
		.with_provisioner(Arc::new(chain.clone()))
		.with_rpc_connector(Arc::new(chain.clone()))
		.with_price_oracle(Arc::new(prices()))
		.with_token_resolver(Arc::new(StaticTokenResolver::with_defaults()))
}

/// Router validating every candidate against `chain`
pub fn sandboxed_router(
	chain: &SimulatedChain,
	adapters: Vec<Arc<dyn QuoteAdapter>>,
) -> RouteOrchestrator {
	builder(chain, adapters)
		.build()
		.expect("router should build")
}

/// Router that accepts quotes without a sandbox
pub fn quoted_router(adapters: Vec<Arc<dyn QuoteAdapter>>) -> RouteOrchestrator {
	let validator: Arc<dyn RouteValidator> = Arc::new(super::QuotedValueValidator);
	builder(&SimulatedChain::new(), adapters)
		.with_validator(validator)
		.build()
		.expect("router should build")
}
