//! Router Chain
//!
//! HTTP implementations of the collaborators consumed during validation:
//! a failover JSON-RPC client, a Tenderly sandbox provisioner, a DefiLlama
//! price oracle and a static token resolver.

pub mod erc20;
pub mod pricing;
pub mod rpc;
pub mod tenderly;
pub mod tokens;

pub use pricing::DefiLlamaPriceOracle;
pub use rpc::{HttpRpcConnector, JsonRpcClient};
pub use tenderly::{TenderlyConfig, TenderlyProvisioner};
pub use tokens::StaticTokenResolver;
