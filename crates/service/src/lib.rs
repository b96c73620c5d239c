//! Router Service
//!
//! Route orchestration for the swap router: the per-run sandbox pool,
//! sandbox validation of quotes, slippage filtering and ranking.

pub mod orchestrator;
pub mod ranking;
pub mod run;
pub mod sandbox_pool;
pub mod slippage;
pub mod validator;

pub use orchestrator::RouteOrchestrator;
pub use ranking::{rank_bridges, rank_swaps, RankingPolicy};
pub use run::{BridgeJob, OrchestrationRun, RunPrices, SwapJob};
pub use sandbox_pool::{PoolError, PoolResult, SandboxPool};
pub use slippage::{normalize_slippage, SlippageFilter};
pub use validator::{CandidateValidator, RouteValidator};
