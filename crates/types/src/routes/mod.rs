//! Routing requests, results and the error taxonomy

pub mod errors;
pub mod outcome;
pub mod request;
pub mod route;

pub use errors::{RouteError, RouteResult};
pub use outcome::Outcome;
pub use request::{BridgeRequest, RouteMode, SwapRequest};
pub use route::{BridgeRoute, SwapRoute, ValidatedRoute};
