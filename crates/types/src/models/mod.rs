//! Shared domain models

pub mod chain;
pub mod secret_string;
pub mod token;

pub use chain::ChainId;
pub use secret_string::SecretString;
pub use token::{from_units_f64, to_units_f64, TokenRef};
