//! State shared by every pipeline of one routing call

use alloy_primitives::{Address, U256};
use router_types::{AmountSpec, ChainId, TokenRef};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::sandbox_pool::SandboxPool;

/// One routing call: its id, sandbox pool and deadline.
///
/// Owned by the orchestrator for the length of the call; pipelines that
/// outlive a timeout keep it alive until they settle.
#[derive(Debug)]
pub struct OrchestrationRun {
	pub run_id: Uuid,
	pub pool: SandboxPool,
	/// `None` when a single source is consulted
	pub deadline: Option<Instant>,
}

impl OrchestrationRun {
	pub fn new(run_id: Uuid, pool: SandboxPool, window: Option<Duration>) -> Self {
		Self {
			run_id,
			pool,
			deadline: window.map(|window| Instant::now() + window),
		}
	}

	/// Time left before the deadline, `None` when unbounded
	pub fn remaining(&self) -> Option<Duration> {
		self.deadline
			.map(|deadline| deadline.saturating_duration_since(Instant::now()))
	}
}

/// USD prices resolved once per run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunPrices {
	pub gas_token_usd: f64,
	pub token_in_usd: Option<f64>,
	pub token_out_usd: Option<f64>,
}

impl RunPrices {
	/// Both sides priced, so USD value can be compared across the trade
	pub fn pair(&self) -> Option<(f64, f64)> {
		match (self.token_in_usd, self.token_out_usd) {
			(Some(token_in), Some(token_out)) if token_in > 0.0 && token_out > 0.0 => {
				Some((token_in, token_out))
			},
			_ => None,
		}
	}
}

/// Normalized swap request as validation sees it
#[derive(Debug, Clone)]
pub struct SwapJob {
	pub chain_id: ChainId,
	pub account: Address,
	pub token_in: TokenRef,
	pub token_out: TokenRef,
	pub amount: AmountSpec,
	pub gas_price: U256,
	pub prices: RunPrices,
}

/// Normalized bridge request as validation sees it
#[derive(Debug, Clone)]
pub struct BridgeJob {
	pub source_chain: ChainId,
	pub dest_chain: ChainId,
	pub account: Address,
	pub source_token: TokenRef,
	pub dest_token: TokenRef,
	pub amount: U256,
	pub gas_price: U256,
	pub gas_token_usd: f64,
	pub dest_token_usd: Option<f64>,
}
