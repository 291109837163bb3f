//! Cypher transport.
//!
//! [`HttpGraphClient`] speaks the Neo4j HTTP transactional API: every call is
//! a single auto-committed statement posted to `/db/{database}/tx/commit`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stachat_core::{ConfigurationError, StoreError};
use tracing::{debug, error};

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

/// Executes a parameterised Cypher statement.
#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Row>, StoreError>;
}

/// Quote a label, property or index name for interpolation into Cypher.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Neo4j over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGraphClient {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl HttpGraphClient {
    pub fn new(
        uri: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        database: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let base = http_base_url(uri)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                field: "neo4j".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/db/{}/tx/commit", base, database),
            username: username.into(),
            password: password.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphClient for HttpGraphClient {
    async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Row>, StoreError> {
        debug!(endpoint = %self.endpoint, "Running Cypher statement");

        let body = CommitRequest {
            statements: vec![Statement {
                statement,
                parameters,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    error!("Neo4j request failed: {}", e);
                    StoreError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Connection(format!(
                "authentication rejected ({})",
                status
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Neo4j error ({}): {}", status, text);
            return Err(StoreError::Connection(format!("HTTP {}: {}", status, text)));
        }

        let body: CommitResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        body.into_rows()
    }
}

/// Map a configured Neo4j URI onto the HTTP endpoint base.
///
/// Bolt-style schemes are translated; `+s`/`+ssc` variants select HTTPS. A
/// bolt port (7687) is swapped for the matching HTTP port.
pub fn http_base_url(uri: &str) -> Result<String, ConfigurationError> {
    let uri = uri.trim().trim_end_matches('/');
    let (scheme, rest) = uri.split_once("://").ok_or_else(|| ConfigurationError::Invalid {
        field: "neo4j.uri".to_string(),
        message: format!("'{}' has no scheme", uri),
    })?;

    let secure = match scheme {
        "http" | "neo4j" | "bolt" => false,
        "https" | "neo4j+s" | "neo4j+ssc" | "bolt+s" | "bolt+ssc" => true,
        other => {
            return Err(ConfigurationError::Invalid {
                field: "neo4j.uri".to_string(),
                message: format!("unsupported scheme '{}'", other),
            })
        }
    };

    let host = match rest.strip_suffix(":7687") {
        Some(host) if secure => format!("{}:7473", host),
        Some(host) => format!("{}:7474", host),
        None => rest.to_string(),
    };
    let http_scheme = if secure { "https" } else { "http" };
    Ok(format!("{}://{}", http_scheme, host))
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<CypherError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataRow>,
}

#[derive(Debug, Deserialize)]
struct DataRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CypherError {
    code: String,
    message: String,
}

impl CommitResponse {
    fn into_rows(self) -> Result<Vec<Row>, StoreError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(StoreError::Query {
                code: err.code,
                message: err.message,
            });
        }
        let Some(result) = self.results.into_iter().next() else {
            return Ok(Vec::new());
        };

        result
            .data
            .into_iter()
            .map(|data| {
                if data.row.len() != result.columns.len() {
                    return Err(StoreError::Decode(format!(
                        "row has {} values for {} columns",
                        data.row.len(),
                        result.columns.len()
                    )));
                }
                Ok(result.columns.iter().cloned().zip(data.row).collect())
            })
            .collect()
    }
}
