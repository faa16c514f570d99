//! Neo4j graph store over the HTTP transactional API.
//!
//! Every query runs in a single auto-commit transaction
//! (`POST {base}/db/{database}/tx/commit`) routed to a reader. Rows come back
//! as positional arrays and are zipped with the column names into records.

use async_trait::async_trait;
use cypherchat_config::GraphConfig;
use cypherchat_core::error::GraphError;
use cypherchat_core::graph::{GraphStore, Record};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub struct Neo4jHttpStore {
    base_url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

impl Neo4jHttpStore {
    pub fn new(
        uri: &str,
        database: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, GraphError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| GraphError::Connection(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: http_base_url(uri)?,
            database: database.into(),
            username,
            password,
            client,
        })
    }

    pub fn from_config(config: &GraphConfig) -> Result<Self, GraphError> {
        let uri = config
            .uri
            .as_deref()
            .ok_or_else(|| GraphError::NotConfigured("NEO4J_URI is not set".into()))?;
        Self::new(
            uri,
            &config.database,
            config.username.clone(),
            config.password.clone(),
        )
    }

    pub fn commit_url(&self) -> String {
        format!("{}/db/{}/tx/commit", self.base_url, self.database)
    }
}

/// Translate a driver-style URI into the HTTP endpoint serving the same
/// server. `bolt`/`neo4j` map to port 7474, their `+s`/`+ssc` variants to
/// HTTPS on the default port. HTTP(S) URIs pass through.
pub fn http_base_url(uri: &str) -> Result<String, GraphError> {
    let uri = uri.trim().trim_end_matches('/');
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| GraphError::NotConfigured(format!("invalid Neo4j URI: {uri}")))?;
    let host = rest.split(':').next().unwrap_or(rest);

    match scheme {
        "http" | "https" => Ok(uri.to_string()),
        "bolt" | "neo4j" => Ok(format!("http://{host}:7474")),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => Ok(format!("https://{host}")),
        other => Err(GraphError::NotConfigured(format!(
            "unsupported Neo4j URI scheme: {other}"
        ))),
    }
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    async fn run_read(
        &self,
        query: &str,
        params: Map<String, Value>,
    ) -> Result<Vec<Record>, GraphError> {
        let body = serde_json::json!({
            "statements": [{
                "statement": query,
                "parameters": params,
                "resultDataContents": ["row"],
            }]
        });

        debug!(database = %self.database, "Running read query");

        let mut request = self
            .client
            .post(self.commit_url())
            .header("access-mode", "READ")
            .json(&body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GraphError::Connection(
                "Neo4j rejected the credentials".into(),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "Neo4j returned error status");
            return Err(GraphError::Protocol(format!("HTTP {status}: {text}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GraphError::Protocol(format!("Failed to parse response: {e}")))?;
        parse_commit_response(payload)
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    code: String,
    message: String,
}

/// Decode a transactional-API payload into records.
pub fn parse_commit_response(payload: Value) -> Result<Vec<Record>, GraphError> {
    let response: CommitResponse =
        serde_json::from_value(payload).map_err(|e| GraphError::Protocol(e.to_string()))?;

    if let Some(error) = response.errors.into_iter().next() {
        return Err(GraphError::Query {
            code: error.code,
            message: error.message,
        });
    }

    let Some(result) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    Ok(result
        .data
        .into_iter()
        .map(|data| {
            result
                .columns
                .iter()
                .cloned()
                .zip(data.row.into_iter().chain(std::iter::repeat(Value::Null)))
                .collect()
        })
        .collect())
}
