//! ArangoDB implementation of the database abstraction layer, spoken over the HTTP API
use crate::database::{
    BindVars, ConnectionTarget, Connector, DatabaseClient, DatabaseError, DatabaseHandle,
    QueryCursor, QueryStatistics,
};
use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Documents requested per cursor batch
const BATCH_SIZE: u32 = 1000;

/// Characters escaped in database names and cursor ids placed in a URL path
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'~');

/// Opens HTTP clients for ArangoDB servers
pub struct ArangoConnector {
    request_timeout: Duration,
}

impl ArangoConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for ArangoConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Connector for ArangoConnector {
    async fn connect(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn DatabaseClient>, DatabaseError> {
        let client = ArangoClient::new(target, self.request_timeout)?;
        Ok(Box::new(client))
    }
}

/// Shared HTTP state for one server connection
struct Endpoint {
    http: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl Endpoint {
    /// URL of an API path scoped to a database: `/_db/<name>/<path>`
    fn database_url(&self, database: &str, path: &str) -> Result<Url, DatabaseError> {
        let encoded = utf8_percent_encode(database, PATH_SEGMENT).to_string();
        self.base_url
            .join(&format!("_db/{encoded}/{path}"))
            .map_err(|e| DatabaseError::InvalidUrl(e.to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DatabaseError> {
        request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                DatabaseError::Connection(e.to_string())
            } else {
                DatabaseError::Http(e)
            }
        })
    }
}

/// ArangoDB client for one server
pub struct ArangoClient {
    endpoint: Arc<Endpoint>,
}

impl ArangoClient {
    pub fn new(target: &ConnectionTarget, request_timeout: Duration) -> Result<Self, DatabaseError> {
        let base_url = Url::parse(&format!("{}/", target.url()))
            .map_err(|e| DatabaseError::InvalidUrl(format!("{}: {e}", target.url())))?;

        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create HTTP client: {e}")))?;

        debug!("[ArangoClient::new] Client created for {}", target.url());

        Ok(Self {
            endpoint: Arc::new(Endpoint {
                http,
                base_url,
                username: target.username.clone(),
                password: target.password.clone(),
            }),
        })
    }
}

#[async_trait]
impl DatabaseClient for ArangoClient {
    async fn list_databases(&self) -> Result<Vec<String>, DatabaseError> {
        let url = self.endpoint.database_url("_system", "_api/database/user")?;
        let response = self
            .endpoint
            .send(self.endpoint.request(Method::GET, url))
            .await?;
        let body: ResultEnvelope<Vec<String>> = read_json(response, "_system").await?;
        Ok(body.result)
    }

    async fn open_database(&self, name: &str) -> Result<Box<dyn DatabaseHandle>, DatabaseError> {
        let url = self.endpoint.database_url(name, "_api/database/current")?;
        let response = self
            .endpoint
            .send(self.endpoint.request(Method::GET, url))
            .await?;
        let _: ResultEnvelope<JsonValue> = read_json(response, name).await?;

        debug!("[ArangoClient::open_database] Opened database '{}'", name);
        Ok(Box::new(ArangoDatabase {
            endpoint: Arc::clone(&self.endpoint),
            name: name.to_string(),
        }))
    }
}

/// Handle on one ArangoDB database
pub struct ArangoDatabase {
    endpoint: Arc<Endpoint>,
    name: String,
}

#[async_trait]
impl DatabaseHandle for ArangoDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_collections(&self) -> Result<Vec<String>, DatabaseError> {
        let url = self
            .endpoint
            .database_url(&self.name, "_api/collection?excludeSystem=true")?;
        let response = self
            .endpoint
            .send(self.endpoint.request(Method::GET, url))
            .await?;
        let body: ResultEnvelope<Vec<CollectionInfo>> = read_json(response, &self.name).await?;
        Ok(body.result.into_iter().map(|c| c.name).collect())
    }

    async fn query(
        &self,
        text: &str,
        bind_vars: &BindVars,
    ) -> Result<Box<dyn QueryCursor>, DatabaseError> {
        let url = self.endpoint.database_url(&self.name, "_api/cursor")?;
        let request = CursorRequest {
            query: text,
            bind_vars,
            batch_size: BATCH_SIZE,
        };

        debug!("[ArangoDatabase::query] Running AQL on '{}': {}", self.name, text);

        let response = self
            .endpoint
            .send(self.endpoint.request(Method::POST, url).json(&request))
            .await?;
        let batch: CursorBatch = read_json(response, &self.name).await?;

        let mut cursor = ArangoCursor {
            endpoint: Arc::clone(&self.endpoint),
            database: self.name.clone(),
            id: None,
            has_more: false,
            buffer: VecDeque::new(),
            statistics: QueryStatistics::default(),
        };
        cursor.absorb(batch);
        Ok(Box::new(cursor))
    }
}

/// Cursor that fetches further batches on demand
pub struct ArangoCursor {
    endpoint: Arc<Endpoint>,
    database: String,
    id: Option<String>,
    has_more: bool,
    buffer: VecDeque<JsonValue>,
    statistics: QueryStatistics,
}

impl ArangoCursor {
    fn absorb(&mut self, batch: CursorBatch) {
        self.buffer.extend(batch.result);
        self.has_more = batch.has_more;
        if batch.id.is_some() {
            self.id = batch.id;
        }
        if let Some(stats) = batch.extra.and_then(|extra| extra.stats) {
            self.statistics = stats.into_statistics();
        }
    }

    async fn fetch_next_batch(&mut self) -> Result<(), DatabaseError> {
        let id = self
            .id
            .clone()
            .ok_or_else(|| DatabaseError::Protocol("cursor has more results but no id".into()))?;
        let encoded = utf8_percent_encode(&id, PATH_SEGMENT).to_string();
        let url = self
            .endpoint
            .database_url(&self.database, &format!("_api/cursor/{encoded}"))?;
        let response = self
            .endpoint
            .send(self.endpoint.request(Method::PUT, url))
            .await?;
        let batch: CursorBatch = read_json(response, &self.database).await?;
        self.absorb(batch);
        Ok(())
    }
}

#[async_trait]
impl QueryCursor for ArangoCursor {
    async fn next_document(&mut self) -> Result<Option<JsonValue>, DatabaseError> {
        loop {
            if let Some(document) = self.buffer.pop_front() {
                return Ok(Some(document));
            }
            if !self.has_more {
                return Ok(None);
            }
            self.fetch_next_batch().await?;
        }
    }

    fn statistics(&self) -> QueryStatistics {
        self.statistics.clone()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CursorRequest<'a> {
    query: &'a str,
    bind_vars: &'a BindVars,
    batch_size: u32,
}

#[derive(Deserialize)]
struct ResultEnvelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionInfo {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorBatch {
    #[serde(default)]
    result: Vec<JsonValue>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    extra: Option<CursorExtra>,
}

#[derive(Deserialize)]
struct CursorExtra {
    #[serde(default)]
    stats: Option<CursorStats>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CursorStats {
    execution_time: Option<f64>,
    scanned_full: Option<u64>,
    scanned_index: Option<u64>,
    writes_executed: Option<u64>,
    peak_memory_usage: Option<u64>,
}

impl CursorStats {
    fn into_statistics(self) -> QueryStatistics {
        let documents_scanned = match (self.scanned_full, self.scanned_index) {
            (None, None) => None,
            (full, index) => Some(full.unwrap_or(0) + index.unwrap_or(0)),
        };
        QueryStatistics {
            execution_time: None,
            documents_scanned,
            documents_written: self.writes_executed,
            peak_memory_bytes: self.peak_memory_usage,
            server_execution_time: self
                .execution_time
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_num: i64,
    #[serde(default)]
    error_message: String,
}

/// Decode a successful response, or map the server's error body onto a `DatabaseError`
async fn read_json<T: DeserializeOwned>(
    response: Response,
    database: &str,
) -> Result<T, DatabaseError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| DatabaseError::Protocol(format!("Failed to decode response: {e}")));
    }

    let text = response.text().await.unwrap_or_default();
    Err(classify_error(status, &text, database))
}

fn classify_error(status: StatusCode, body: &str, database: &str) -> DatabaseError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.error_message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match status {
        StatusCode::UNAUTHORIZED => DatabaseError::Authentication(message),
        // 1228: database not found
        StatusCode::NOT_FOUND if parsed.as_ref().is_some_and(|b| b.error_num == 1228) => {
            DatabaseError::DatabaseNotFound(database.to_string())
        }
        _ => DatabaseError::Query {
            code: status.as_u16(),
            error_num: parsed.map(|b| b.error_num).unwrap_or_default(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn endpoint() -> Endpoint {
        let target = ConnectionTarget::new("localhost", 8529, "root", "", false, "");
        Endpoint {
            http: Client::new(),
            base_url: Url::parse(&format!("{}/", target.url())).unwrap(),
            username: target.username,
            password: target.password,
        }
    }

    #[rstest]
    #[case("_system", "_api/cursor", "http://localhost:8529/_db/_system/_api/cursor")]
    #[case("my db", "_api/cursor", "http://localhost:8529/_db/my%20db/_api/cursor")]
    #[case(
        "test_db",
        "_api/collection?excludeSystem=true",
        "http://localhost:8529/_db/test_db/_api/collection?excludeSystem=true"
    )]
    fn test_database_url(#[case] database: &str, #[case] path: &str, #[case] expected: &str) {
        let url = endpoint().database_url(database, path).unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn test_cursor_batch_statistics() {
        let body = r#"{
            "result": [{"_key": "1"}],
            "hasMore": false,
            "extra": {"stats": {
                "writesExecuted": 0,
                "scannedFull": 10,
                "scannedIndex": 5,
                "executionTime": 0.25,
                "peakMemoryUsage": 32768
            }}
        }"#;
        let batch: CursorBatch = serde_json::from_str(body).unwrap();
        let stats = batch.extra.unwrap().stats.unwrap().into_statistics();

        assert_eq!(stats.documents_scanned, Some(15));
        assert_eq!(stats.documents_written, Some(0));
        assert_eq!(stats.peak_memory_bytes, Some(32768));
        assert_eq!(stats.server_execution_time, Some(Duration::from_millis(250)));
        assert_eq!(stats.execution_time, None);
    }

    #[test]
    fn test_missing_statistics_stay_absent() {
        let stats = CursorStats::default().into_statistics();
        assert_eq!(stats, QueryStatistics::default());
    }

    #[test]
    fn test_classify_query_error() {
        let body = r#"{"error":true,"code":400,"errorNum":1501,"errorMessage":"syntax error, unexpected identifier"}"#;
        let error = classify_error(StatusCode::BAD_REQUEST, body, "_system");
        match error {
            DatabaseError::Query {
                code,
                error_num,
                message,
            } => {
                assert_eq!(code, 400);
                assert_eq!(error_num, 1501);
                assert!(message.contains("syntax error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, "", "auth")]
    #[case(
        StatusCode::NOT_FOUND,
        r#"{"error":true,"code":404,"errorNum":1228,"errorMessage":"database not found"}"#,
        "missing"
    )]
    fn test_classify_connection_errors(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] kind: &str,
    ) {
        let error = classify_error(status, body, "nope");
        match kind {
            "auth" => assert!(matches!(error, DatabaseError::Authentication(_))),
            _ => assert!(matches!(error, DatabaseError::DatabaseNotFound(ref name) if name == "nope")),
        }
    }

    #[test]
    fn test_cursor_absorb_keeps_id_across_batches() {
        let mut cursor = ArangoCursor {
            endpoint: Arc::new(endpoint()),
            database: "_system".into(),
            id: None,
            has_more: false,
            buffer: VecDeque::new(),
            statistics: QueryStatistics::default(),
        };
        cursor.absorb(serde_json::from_str(r#"{"result":[1,2],"hasMore":true,"id":"42"}"#).unwrap());
        assert_eq!(cursor.id.as_deref(), Some("42"));
        assert!(cursor.has_more);

        cursor.absorb(serde_json::from_str(r#"{"result":[3],"hasMore":false}"#).unwrap());
        assert_eq!(cursor.id.as_deref(), Some("42"));
        assert_eq!(cursor.buffer.len(), 3);
        assert!(!cursor.has_more);
    }
}
