//! Router Types
//!
//! Shared models and traits for the swap router: tokens and chains, quotes
//! and validated routes, the quote source trait, the collaborator interfaces
//! consumed during validation, and the routing error taxonomy.

pub mod adapters;
pub mod constants;
pub mod models;
pub mod pricing;
pub mod quotes;
pub mod retry;
pub mod routes;
pub mod rpc;
pub mod sandbox;

// Re-export alloy primitives and serde_json for convenience
pub use alloy_primitives;
pub use serde_json;

pub use adapters::{
	AdapterError, AdapterResult, AdapterRuntimeConfig, QuoteAdapter, SourceId, SourceKind,
	UnknownSource,
};
pub use models::{from_units_f64, to_units_f64, ChainId, SecretString, TokenRef};
pub use pricing::{PriceError, PriceOracle, TokenResolveError, TokenResolver};
pub use quotes::{AmountSpec, BridgeQuery, BridgeQuote, Quote, QuotePrices, QuoteTx, SwapQuery};
pub use retry::{with_retry, with_retry_if, RetryPolicy};
pub use routes::{
	BridgeRequest, BridgeRoute, Outcome, RouteError, RouteMode, RouteResult, SwapRequest,
	SwapRoute, ValidatedRoute,
};
pub use rpc::{ChainRpc, RpcConnector, RpcError, RpcResult, TransactionReceipt, TransactionRequest};
pub use sandbox::{SandboxError, SandboxInfo, SandboxProvisioner, SandboxResult};
