//! Database abstraction layer for the shell
//! The session engine only talks to the server through these traits
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Database used when a connection does not name one
pub const DEFAULT_DATABASE: &str = "_system";

/// Default ArangoDB HTTP port
pub const DEFAULT_PORT: u16 = 8529;

/// Bind parameters sent along with a query
pub type BindVars = Map<String, JsonValue>;

/// The resolved set of fields needed to open one connection
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    pub database: String,
}

impl ConnectionTarget {
    /// Build a target, falling back to `_system` when no database is given
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        use_tls: bool,
        database: impl Into<String>,
    ) -> Self {
        let database = database.into();
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            use_tls,
            database: if database.trim().is_empty() {
                DEFAULT_DATABASE.to_string()
            } else {
                database
            },
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    /// Endpoint URL without credentials, e.g. `http://localhost:8529`
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("use_tls", &self.use_tls)
            .field("database", &self.database)
            .finish()
    }
}

/// Execution statistics; every field is absent unless the backend reported it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStatistics {
    /// Round-trip time measured by the shell
    pub execution_time: Option<Duration>,
    pub documents_scanned: Option<u64>,
    pub documents_written: Option<u64>,
    pub peak_memory_bytes: Option<u64>,
    /// Execution time as reported by the server
    pub server_execution_time: Option<Duration>,
}

/// Documents produced by one query plus its statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub documents: Vec<JsonValue>,
    pub statistics: QueryStatistics,
}

/// Errors that can occur during database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("Query error [{error_num}] (HTTP {code}): {message}")]
    Query {
        code: u16,
        error_num: i64,
        message: String,
    },

    #[error("Unexpected server response: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Opens clients for connection targets
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        target: &ConnectionTarget,
    ) -> Result<Box<dyn DatabaseClient>, DatabaseError>;
}

/// A server connection, independent of any database on it
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// List databases visible to the connected user
    async fn list_databases(&self) -> Result<Vec<String>, DatabaseError>;

    /// Open a handle on a database, verifying that it exists and is accessible
    async fn open_database(&self, name: &str) -> Result<Box<dyn DatabaseHandle>, DatabaseError>;
}

/// A handle on one database of a connected server
#[async_trait]
pub trait DatabaseHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn list_collections(&self) -> Result<Vec<String>, DatabaseError>;

    async fn query(
        &self,
        text: &str,
        bind_vars: &BindVars,
    ) -> Result<Box<dyn QueryCursor>, DatabaseError>;
}

/// Server-side iterator over query results
#[async_trait]
pub trait QueryCursor: Send {
    /// Next document, or `None` once the results are exhausted
    async fn next_document(&mut self) -> Result<Option<JsonValue>, DatabaseError>;

    /// Statistics reported so far; complete once the cursor is exhausted
    fn statistics(&self) -> QueryStatistics;
}

/// Run a query and drain its cursor.
///
/// A failure while reading discards every document gathered so far; a partial
/// result set is never returned.
pub async fn execute_query(
    database: &dyn DatabaseHandle,
    text: &str,
    bind_vars: &BindVars,
) -> Result<QueryResult, DatabaseError> {
    let started = Instant::now();
    let mut cursor = database.query(text, bind_vars).await?;

    let mut documents = Vec::new();
    while let Some(document) = cursor.next_document().await? {
        documents.push(document);
    }

    let mut statistics = cursor.statistics();
    if statistics.execution_time.is_none() {
        statistics.execution_time = Some(started.elapsed());
    }

    debug!(
        "Query on '{}' returned {} document(s)",
        database.name(),
        documents.len()
    );

    Ok(QueryResult {
        documents,
        statistics,
    })
}
