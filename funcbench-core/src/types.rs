// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers and wire types for the invocation driver.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Validated function name.
/// Must be non-empty, alphanumeric with hyphens/underscores, max 64 chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionName(String);

impl FunctionName {
    /// Create a new FunctionName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ConfigError::InvalidFieldValue {
                field: "function_name",
                value: name,
                reason: "Function name cannot be empty".to_string(),
            });
        }

        if name.len() > 64 {
            return Err(ConfigError::InvalidFieldValue {
                field: "function_name",
                value: name.clone(),
                reason: format!("Function name too long: {} chars (max 64)", name.len()),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidFieldValue {
                field: "function_name",
                value: name,
                reason: "Function name must contain only alphanumeric characters, hyphens, and underscores".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for FunctionName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FunctionName> for String {
    fn from(name: FunctionName) -> Self {
        name.0
    }
}

/// Validated network port.
/// Must be in range 1-65535 (0 is reserved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Create a new Port with validation.
    pub fn new(port: u16) -> Result<Self, ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort {
                port,
                reason: "Port 0 is reserved and cannot be used".to_string(),
            });
        }
        Ok(Self(port))
    }

    /// Get the inner port value.
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = ConfigError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// One invocation payload produced by the input generator.
///
/// The driver treats it as opaque and immutable; only the function client
/// interprets it when building the outgoing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Which method of the target function to invoke.
    pub method: String,
    /// Generated input value for the call.
    pub input: String,
}

/// Opaque result of one invocation, as returned by the function client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Transport-level status of the call.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_valid() {
        assert!(FunctionName::new("helloworld").is_ok());
        assert!(FunctionName::new("aes-python").is_ok());
        assert!(FunctionName::new("fibonacci_go").is_ok());
    }

    #[test]
    fn test_function_name_invalid() {
        assert!(FunctionName::new("").is_err());
        assert!(FunctionName::new("a".repeat(65)).is_err());
        assert!(FunctionName::new("func@name").is_err());
        assert!(FunctionName::new("func name").is_err());
    }

    #[test]
    fn test_port_valid() {
        assert!(Port::new(50051).is_ok());
        assert!(Port::new(1).is_ok());
        assert!(Port::new(65535).is_ok());
    }

    #[test]
    fn test_port_invalid() {
        assert!(Port::new(0).is_err());
    }

    #[test]
    fn test_reply_display() {
        let reply = Reply {
            status: 200,
            body: "Hello, world!".to_string(),
        };
        assert_eq!(reply.to_string(), "[200] Hello, world!");
    }
}
