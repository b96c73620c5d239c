//! Centralized mocks and fixtures for testing
//!
//! Timing-controlled quote sources, a validator that trusts quotes at face
//! value, and fixtures that wire them into a router.

pub mod adapters;
pub mod fixtures;
pub mod validators;

// Re-export commonly used items for convenience
#[allow(unused_imports)]
pub use adapters::{CallTracker, TimingControlledAdapter};
#[allow(unused_imports)]
pub use validators::QuotedValueValidator;
