//! Router Configuration
//!
//! Settings tree, file and environment loading, and startup logging for the
//! swap router.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, load_config_from, ConfigLoadError};
pub use settings::{
	ChainSettings, ConfigValidationError, LogFormat, LoggingSettings, PricingSettings,
	RoutingSettings, SandboxSettings, Settings, SourceSettings, ValidationSettings,
};
pub use startup_logger::{log_router_configuration, log_service_info, log_startup_complete};
