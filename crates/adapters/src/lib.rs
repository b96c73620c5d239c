//! Router Adapters
//!
//! Quote source adapters for the swap router, the typed registry that maps
//! source ids to them, and the protocol-name hints accepted from callers.

pub mod across_adapter;
pub mod client_cache;
pub mod cowswap_adapter;
pub mod exact_out;
pub mod hints;
mod http;
pub mod hyperliquid_adapter;
pub mod odos_adapter;
pub mod paraswap_adapter;
pub mod registry;
pub mod relay_adapter;
pub mod zerox_adapter;

pub use across_adapter::AcrossAdapter;
pub use client_cache::{ClientCache, ClientConfig};
pub use cowswap_adapter::CowSwapAdapter;
pub use hints::SourceHint;
pub use hyperliquid_adapter::HyperliquidAdapter;
pub use odos_adapter::OdosAdapter;
pub use paraswap_adapter::ParaswapAdapter;
pub use registry::{create_adapter, default_endpoint, AdapterRegistry};
pub use relay_adapter::RelayAdapter;
pub use router_types::{AdapterError, AdapterResult, QuoteAdapter};
pub use zerox_adapter::ZeroXAdapter;
