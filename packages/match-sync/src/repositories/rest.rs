use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::BackendConfig;

#[derive(Debug)]
pub enum RestError {
    Transport(String),
    Status { status: StatusCode, message: String },
    Serialization(String),
}

impl std::fmt::Display for RestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestError::Transport(msg) => write!(f, "Transport error: {}", msg),
            RestError::Status { status, message } => write!(f, "{}: {}", status, message),
            RestError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for RestError {}

/// Thin client for the backend's table and procedure HTTP interface.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl RestClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/rest/v1", config.base_url),
            api_key: config.anon_key.clone(),
            bearer: config.bearer_token().to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    pub async fn select(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, RestError> {
        debug!("GET {} {:?}", table, query);
        let response = self.request(Method::GET, table).query(query).send().await;
        rows(read_body(response).await?)
    }

    pub async fn insert(&self, table: &str, body: &Value) -> Result<Vec<Value>, RestError> {
        debug!("POST {}", table);
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await;
        rows(read_body(response).await?)
    }

    pub async fn rpc(&self, function: &str, args: &Value) -> Result<Value, RestError> {
        debug!("RPC {}", function);
        let response = self
            .request(Method::POST, &format!("rpc/{}", function))
            .json(args)
            .send()
            .await;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Result<reqwest::Response>) -> Result<Value, RestError> {
    let response = response.map_err(|e| RestError::Transport(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| RestError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(RestError::Status {
            status,
            message: error_message(&text),
        });
    }

    // Procedures returning void answer with an empty body.
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| RestError::Serialization(e.to_string()))
}

fn rows(body: Value) -> Result<Vec<Value>, RestError> {
    match body {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

/// Pulls `message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
