// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Request input generation.
//!
//! Produces the next invocation payload on demand. Configuration errors are
//! surfaced at configuration time; [`InputGenerator::next_request`] is
//! infallible and can be called an unbounded number of times.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::GeneratorKind;
use crate::error::ConfigError;
use crate::types::Request;

/// Generates request payloads for the invocation driver.
#[derive(Debug)]
pub struct InputGenerator {
    kind: GeneratorKind,
    seed_value: String,
    method: String,
    lower: i64,
    upper: i64,
    /// Total number of payloads issued so far.
    issued: u64,
    rng: SmallRng,
}

impl InputGenerator {
    /// Create a generator for the given strategy with default settings.
    pub fn new(kind: GeneratorKind) -> Self {
        Self {
            kind,
            seed_value: "1".to_string(),
            method: "0".to_string(),
            lower: 0,
            upper: 100,
            issued: 0,
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Set the seed value used by the unique strategy.
    pub fn set_seed_value(&mut self, value: impl Into<String>) {
        self.seed_value = value.into();
    }

    /// Set the inclusive bounds used by the random and linear strategies.
    pub fn set_bounds(&mut self, lower: i64, upper: i64) -> Result<(), ConfigError> {
        if lower > upper {
            return Err(ConfigError::InvalidBounds { lower, upper });
        }
        self.lower = lower;
        self.upper = upper;
        Ok(())
    }

    /// Set the target method selector stamped onto every payload.
    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    /// Produce the next request payload. Never fails.
    pub fn next_request(&mut self) -> Request {
        let input = match self.kind {
            GeneratorKind::Unique => format!("{}-{}", self.seed_value, self.issued),
            GeneratorKind::Random => self.rng.random_range(self.lower..=self.upper).to_string(),
            GeneratorKind::Linear => {
                // Unsigned distance between the inclusive bounds; the span
                // can exceed i64::MAX, so the math stays in u64.
                let span = self.upper.wrapping_sub(self.lower) as u64;
                let offset = if span == u64::MAX {
                    // Bounds cover the full i64 range: every offset is in bounds.
                    self.issued
                } else {
                    self.issued % (span + 1)
                };
                self.lower.wrapping_add(offset as i64).to_string()
            }
        };
        self.issued += 1;

        Request {
            method: self.method.clone(),
            input,
        }
    }

    /// Total number of payloads issued by this generator.
    pub fn issued(&self) -> u64 {
        self.issued
    }
}
