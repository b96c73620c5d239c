//! Quote requests and responses exchanged with adapters

pub mod request;
pub mod response;

pub use request::{AmountSpec, BridgeQuery, QuotePrices, SwapQuery};
pub use response::{BridgeQuote, Quote, QuoteTx};
