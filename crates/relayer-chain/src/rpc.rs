use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::error::ClientError;

/// Thin JSON-RPC 2.0 transport shared by the EVM and UTXO clients.
///
/// Deliberately minimal: one `reqwest::Client`, a request-id counter, and a
/// `call` method that classifies failures into [`ClientError`]'s transient
/// vs. permanent split. Neither client needs more than this - the HTLC
/// script building and transaction signing live outside the core.
pub struct JsonRpcTransport {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
    timeout: Duration,
}

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'a str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Deserialize)]
struct Response<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl JsonRpcTransport {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = Request {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let response = self
            .http
            .post(self.url.clone())
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ClientError::from)?;

        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ClientError::from_status(response.status(), retry_after));
        }

        let parsed: Response<R> = response
            .json()
            .await
            .map_err(|err| ClientError::permanent(format!("malformed rpc response: {err}")))?;

        if let Some(error) = parsed.error {
            return Err(classify_rpc_error(error));
        }

        parsed
            .result
            .ok_or_else(|| ClientError::permanent("rpc response missing result"))
    }
}

/// Classifies a JSON-RPC error object. JSON-RPC has no status-code concept,
/// so the convention followed here is: the standard `-32xxx` range of
/// protocol errors (malformed request, method not found) is `Permanent`,
/// anything else (node-specific, typically meaning "try again", e.g.
/// "request timed out" or "limit exceeded") is `Transient`.
fn classify_rpc_error(error: RpcError) -> ClientError {
    const STANDARD_ERROR_RANGE: std::ops::RangeInclusive<i64> = -32700..=-32600;
    if STANDARD_ERROR_RANGE.contains(&error.code) {
        ClientError::permanent(format!("rpc error {}: {}", error.code, error.message))
    } else {
        ClientError::transient(format!("rpc error {}: {}", error.code, error.message))
    }
}

/// Helper for building positional JSON-RPC params arrays without pulling in
/// a macro dependency.
pub fn params(values: Vec<Value>) -> Value {
    Value::Array(values)
}
