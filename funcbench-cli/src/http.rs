// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! HTTP-backed function client.
//!
//! Invokes the target through the gateway convention
//! `POST /function/{name}` with the generated payload as a JSON body.

use funcbench_core::{ClientError, FunctionClient, FunctionName, Reply, Request};

/// One HTTP connection pool to a target function service.
#[derive(Debug)]
pub struct HttpFunctionClient {
    function_name: FunctionName,
    endpoint: Option<String>,
    client: Option<reqwest::Client>,
}

impl HttpFunctionClient {
    /// Create an unconnected client for the given function.
    pub fn new(function_name: FunctionName) -> Self {
        Self {
            function_name,
            endpoint: None,
            client: None,
        }
    }
}

impl FunctionClient for HttpFunctionClient {
    async fn init(&mut self, url: &str, port: u16) -> Result<(), ClientError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::InitFailed {
                address: format!("{}:{}", url, port),
                reason: e.to_string(),
            })?;

        self.endpoint = Some(format!(
            "http://{}:{}/function/{}",
            url, port, self.function_name
        ));
        self.client = Some(client);
        Ok(())
    }

    async fn request(&mut self, request: &Request) -> Result<Reply, ClientError> {
        let (client, endpoint) = match (&self.client, &self.endpoint) {
            (Some(client), Some(endpoint)) => (client, endpoint),
            _ => return Err(ClientError::NotConnected),
        };

        let response = client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::BadStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| ClientError::RequestFailed {
            reason: e.to_string(),
        })?;

        Ok(Reply {
            status: status.as_u16(),
            body,
        })
    }

    async fn close(&mut self) {
        // Dropping the pool closes its connections; a second close is a no-op.
        self.client = None;
        self.endpoint = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_request_before_init_is_rejected() {
        let mut client = HttpFunctionClient::new(FunctionName::new("helloworld").unwrap());
        let request = Request {
            method: "0".to_string(),
            input: "1-0".to_string(),
        };
        let err = client.request(&request).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn test_init_builds_gateway_endpoint() {
        let mut client = HttpFunctionClient::new(FunctionName::new("aes-python").unwrap());
        client.init("127.0.0.1", 50051).await.unwrap();
        assert_eq!(
            client.endpoint.as_deref(),
            Some("http://127.0.0.1:50051/function/aes-python")
        );

        client.close().await;
        client.close().await;
        assert!(client.endpoint.is_none());
    }
}
