// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Run configuration resolved once at startup.
//!
//! All flag values are validated here before the driver is constructed.
//! Any invalid field results in a ConfigError that prevents the run.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{FunctionName, Port};

/// Input generation strategy for request payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Strictly increasing, never-repeating values derived from the seed.
    Unique,
    /// Uniform random values within the configured bounds.
    Random,
    /// A linear sweep through the configured bounds, wrapping at the end.
    Linear,
}

impl GeneratorKind {
    /// Get the strategy name for logs and error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Random => "random",
            Self::Linear => "linear",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GeneratorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unique" => Ok(Self::Unique),
            "random" => Ok(Self::Random),
            "linear" => Ok(Self::Linear),
            other => Err(ConfigError::InvalidFieldValue {
                field: "gen_type",
                value: other.to_string(),
                reason: "Expected one of: unique, random, linear".to_string(),
            }),
        }
    }
}

/// Immutable configuration for one benchmark run.
///
/// Counts and the delay are unsigned, so the `>= 0` invariants hold by
/// construction; [`RunConfig::validate`] checks the remaining cross-field
/// invariants before a driver is built.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the function being invoked.
    pub function_name: FunctionName,
    /// Host or address of the target service.
    pub url: String,
    /// Port of the target service.
    pub port: Port,
    /// Seed value fed to the input generator.
    pub input: String,
    /// Which method of the target function to invoke.
    pub method: String,
    /// Input generation strategy.
    pub generator: GeneratorKind,
    /// Lower bound for random/linear generation.
    pub lower_bound: i64,
    /// Upper bound for random/linear generation.
    pub upper_bound: i64,
    /// Number of warm-up invocations (0 skips the phase).
    pub warmup_count: u64,
    /// Number of measured invocations.
    pub measured_count: u64,
    /// Pause between consecutive invocations, in microseconds.
    pub delay_micros: u64,
    /// Whether to emit m5 instrumentation markers.
    pub instrumented: bool,
    /// Abort the run after this many consecutive failed invocations.
    /// 0 disables the policy: the run continues through any failure.
    pub max_consecutive_failures: u64,
}

impl RunConfig {
    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "url",
                value: self.url.clone(),
                reason: "Target url cannot be empty".to_string(),
            });
        }

        if self.lower_bound > self.upper_bound {
            return Err(ConfigError::InvalidBounds {
                lower: self.lower_bound,
                upper: self.upper_bound,
            });
        }

        Ok(())
    }

    /// The pacing pause between invocations, `None` when pacing is disabled.
    pub fn pacing(&self) -> Option<Duration> {
        if self.delay_micros > 0 {
            Some(Duration::from_micros(self.delay_micros))
        } else {
            None
        }
    }

    /// Target address in `host:port` form, for logs and client init.
    pub fn address(&self) -> String {
        format!("{}:{}", self.url, self.port)
    }
}

impl Default for RunConfig {
    /// Defaults matching the CLI flag defaults.
    fn default() -> Self {
        Self {
            function_name: FunctionName::new("helloworld").expect("default name is valid"),
            url: "0.0.0.0".to_string(),
            port: Port::new(50051).expect("default port is valid"),
            input: "1".to_string(),
            method: "0".to_string(),
            generator: GeneratorKind::Unique,
            lower_bound: 0,
            upper_bound: 100,
            warmup_count: 0,
            measured_count: 10,
            delay_micros: 0,
            instrumented: false,
            max_consecutive_failures: 0,
        }
    }
}
