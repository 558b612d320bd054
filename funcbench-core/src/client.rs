// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Function client contract consumed by the invocation driver.
//!
//! The driver is generic over this trait: the CLI plugs in the HTTP-backed
//! client, tests plug in scripted mocks. The driver issues one request at a
//! time and awaits the reply before proceeding, so implementations never see
//! overlapping calls.

use crate::error::ClientError;
use crate::types::{Reply, Request};

/// One connection to a target function service.
///
/// Any error from [`FunctionClient::request`] is treated by the driver as a
/// recoverable, loggable failure - it is escalated only during the probe.
#[allow(async_fn_in_trait)]
pub trait FunctionClient {
    /// Open the connection to the target service.
    async fn init(&mut self, url: &str, port: u16) -> Result<(), ClientError>;

    /// Execute one request, returning the reply or a per-call failure.
    async fn request(&mut self, request: &Request) -> Result<Reply, ClientError>;

    /// Release the connection. Calling this twice must be a no-op.
    async fn close(&mut self);
}
