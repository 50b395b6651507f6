//! JSON-RPC 2.0 client for the discovery service.

use crate::discovery::InstrumentSource;
use crate::error::{ExplorerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Method returning the instruments found so far
pub const GET_INSTR_LIST: &str = "get_instr_list";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Polls `get_instr_list` on a JSON-RPC endpoint
pub struct RpcInstrumentSource {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcInstrumentSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self) -> RpcRequest<'static> {
        RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: GET_INSTR_LIST,
        }
    }
}

/// Extract the batch text from a response.
///
/// A missing or null result is an empty batch.
fn batch_from_response(response: RpcResponse) -> Result<String> {
    if let Some(err) = response.error {
        return Err(ExplorerError::Discovery(format!(
            "{} failed ({}): {}",
            GET_INSTR_LIST, err.code, err.message
        )));
    }

    match response.result {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(batch)) => Ok(batch),
        Some(other) => Err(ExplorerError::Discovery(format!(
            "{} returned a non-string result: {}",
            GET_INSTR_LIST, other
        ))),
    }
}

#[async_trait]
impl InstrumentSource for RpcInstrumentSource {
    async fn fetch_batch(&self) -> Result<String> {
        let request = self.request();
        tracing::trace!("RPC {} id={} -> {}", request.method, request.id, self.endpoint);

        let response: RpcResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        batch_from_response(response)
    }
}

impl std::fmt::Debug for RpcInstrumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcInstrumentSource")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> RpcResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let source = RpcInstrumentSource::new("http://localhost:3030/", Duration::from_secs(1)).unwrap();
        let first = serde_json::to_value(source.request()).unwrap();
        let second = serde_json::to_value(source.request()).unwrap();

        assert_eq!(first["jsonrpc"], "2.0");
        assert_eq!(first["method"], GET_INSTR_LIST);
        assert_ne!(first["id"], second["id"]);
    }

    #[test]
    fn test_string_result_is_batch() {
        let batch = batch_from_response(response(
            r#"{"jsonrpc":"2.0","id":1,"result":"{\"io_type\":\"Lan\"}\n"}"#,
        ))
        .unwrap();
        assert_eq!(batch, "{\"io_type\":\"Lan\"}\n");
    }

    #[test]
    fn test_null_result_is_empty() {
        let batch = batch_from_response(response(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_error_object_is_discovery_error() {
        let err = batch_from_response(response(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        ))
        .unwrap_err();

        assert!(matches!(err, ExplorerError::Discovery(_)));
        assert!(err.to_string().contains("Method not found"));
    }

    #[test]
    fn test_non_string_result_rejected() {
        let err = batch_from_response(response(r#"{"jsonrpc":"2.0","id":1,"result":[1,2]}"#)).unwrap_err();
        assert!(err.is_recoverable());
    }
}
