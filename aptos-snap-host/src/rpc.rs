//! JSON-RPC over HTTP

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use aptos_snap::Error;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<&Error> for RpcError {
    fn from(error: &Error) -> Self {
        let message = match error {
            Error::UnknownMethod(_) => "Method not found.".to_string(),
            other => other.to_string(),
        };
        Self { code: error.code(), message }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    fn err(id: Value, error: RpcError) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) }
    }
}

/// HTTP routes for the snap
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Parse the body by hand so malformed input still gets a JSON-RPC error
fn parse_request(body: &[u8]) -> std::result::Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RpcResponse::err(Value::Null, RpcError::new(PARSE_ERROR, format!("Parse error: {}", e))))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| RpcResponse::err(id, RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e))))
}

async fn rpc_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Json<RpcResponse> {
    let RpcRequest { id, method, params } = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => {
            tracing::info!("Malformed RPC request rejected");
            return Json(response);
        }
    };

    let response = match state.router.handle(&method, &params).await {
        Ok(result) => RpcResponse::ok(id, result),
        Err(e) => {
            if e.is_validation() || matches!(e, Error::UserDenied | Error::UnknownMethod(_)) {
                tracing::info!("{} rejected: {}", method, e);
            } else {
                tracing::warn!("{} failed: {}", method, e);
            }
            RpcResponse::err(id, RpcError::from(&e))
        }
    };

    Json(response)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": aptos_snap::VERSION,
        "network": state.provider_config.network.to_string(),
    }))
}
