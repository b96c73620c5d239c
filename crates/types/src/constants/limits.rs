//! Global limits and defaults for configuration and runtime

/// Default bounded fan-out window when more than one source is consulted
pub const DEFAULT_ROUTE_TIMEOUT_MS: u64 = 23_000; // 23s

/// Grace window given to pending sources after the first accepted preview route
pub const DEFAULT_PREVIEW_GRACE_MS: u64 = 500;

/// Maximum relative difference between requested and spent input
pub const DEFAULT_DRIFT_TOLERANCE_PCT: f64 = 5.0;

/// Slippage used when a request omits it or sends garbage
pub const DEFAULT_SLIPPAGE_PCT: f64 = 50.0;

/// Margin the trusted source must win by, and the preferred bridge may lose by
pub const DEFAULT_RANKING_MARGIN_PCT: f64 = 5.0;

/// Default per-request timeout for quote source APIs
pub const DEFAULT_ADAPTER_TIMEOUT_MS: u64 = 10_000; // 10s

/// Candidate transaction submission attempts
pub const DEFAULT_SUBMIT_ATTEMPTS: u32 = 4;

/// First pause between submission attempts, doubled each time
pub const DEFAULT_SUBMIT_BASE_DELAY_MS: u64 = 1_000;

/// Attempts at a whole validation that failed unexpectedly
pub const DEFAULT_VALIDATION_ATTEMPTS: u32 = 2;

/// Fixed pause between whole-validation attempts
pub const DEFAULT_VALIDATION_PAUSE_MS: u64 = 10_000; // 10s

/// Validation failures logged quietly before warnings start
pub const DEFAULT_VALIDATION_SILENT_ATTEMPTS: u32 = 1;

/// Gas asset granted to the account in every sandbox, in whole units
pub const DEFAULT_SYNTHETIC_NATIVE_BALANCE: u64 = 1_000_000;

/// Sandbox funding attempts
pub const DEFAULT_FUND_ATTEMPTS: u32 = 3;

pub const DEFAULT_FUND_BASE_DELAY_MS: u64 = 3_000;

/// Sandbox creation attempts
pub const DEFAULT_SANDBOX_CREATE_ATTEMPTS: u32 = 3;

pub const DEFAULT_SANDBOX_CREATE_BASE_DELAY_MS: u64 = 2_500;

/// Poll cadence while a duplicated sandbox boots
pub const DEFAULT_CLONE_POLL_INTERVAL_MS: u64 = 500;

/// Give up on a duplicated sandbox that is not running after this long
pub const DEFAULT_CLONE_POLL_TIMEOUT_MS: u64 = 10_000; // 10s

/// RPC attempts per endpoint on server or network errors
pub const DEFAULT_RPC_ATTEMPTS: u32 = 3;

pub const DEFAULT_RPC_BASE_DELAY_MS: u64 = 1_000;

/// Receipt polling cadence and bound
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 250;
pub const RECEIPT_TIMEOUT_MS: u64 = 60_000; // 60s
