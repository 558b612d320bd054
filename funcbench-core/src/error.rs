//! Custom error types for funcbench.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.

use thiserror::Error;

/// Top-level error type for the funcbench invocation driver.
/// All errors are explicit variants - no catch-all or generic handling.
#[derive(Debug, Error)]
pub enum InvokerError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // =========================================================================
    // Probe Errors - Fatal, No Subsequent Call Could Succeed
    // =========================================================================
    #[error("Probe call failed - target unreachable: {source}")]
    ProbeFailed {
        #[source]
        source: ClientError,
    },

    // =========================================================================
    // Sustained-Failure Abort - Only When the Policy Is Enabled
    // =========================================================================
    #[error("Aborting after {streak} consecutive failed invocations (last index {last_index})")]
    SustainedFailures { streak: u64, last_index: u64 },

}

/// Configuration errors cause immediate process termination.
/// Used when a flag value is invalid and the run cannot safely start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid port: {port} - {reason}")]
    InvalidPort { port: u16, reason: String },

    #[error("Invalid generator bounds: lower {lower} > upper {upper}")]
    InvalidBounds { lower: i64, upper: i64 },
}

/// Function client errors. Recoverable per call, fatal only during probe.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to initialize client for {address}: {reason}")]
    InitFailed { address: String, reason: String },

    #[error("Client used before init or after close")]
    NotConnected,

    #[error("Request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Target returned error status {status}")]
    BadStatus { status: u16 },
}

/// Simulator hook errors - instrumentation degrades, the run continues.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Insufficient privilege: m5 magic instructions require root access")]
    InsufficientPrivilege,

    #[error("Failed to open {path}: {reason}")]
    OpenFailed { path: &'static str, reason: String },

    #[error("Failed to map m5 op range: {reason}")]
    MapFailed { reason: String },
}

/// Result type alias using InvokerError.
pub type InvokerResult<T> = Result<T, InvokerError>;
