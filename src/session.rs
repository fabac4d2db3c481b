//! Live shell state and the operations that change which server/database it talks to
//!
//! A switch either replaces the whole active identity or leaves it untouched; a
//! failed connect never tears down the previous connection.

use crate::config::ConfigStore;
use crate::database::{ConnectionTarget, Connector, DatabaseClient, DatabaseError, DatabaseHandle};
use crate::statement::StatementBuffer;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Configuration '{0}' not found")]
    ConfigNotFound(String),

    #[error("Failed to connect to {target}: {source}")]
    ConnectError {
        target: String,
        #[source]
        source: DatabaseError,
    },
}

/// How the active connection was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionLabel {
    /// A named entry from the configuration
    Named(String),
    /// Parameters given directly on the command line
    Manual,
}

impl fmt::Display for ConnectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionLabel::Named(name) => write!(f, "{name}"),
            ConnectionLabel::Manual => write!(f, "manual"),
        }
    }
}

/// Everything that identifies the current connection, replaced as one value
pub struct ActiveConnection {
    pub label: ConnectionLabel,
    pub target: ConnectionTarget,
    pub url: String,
    pub client: Box<dyn DatabaseClient>,
    pub database: Box<dyn DatabaseHandle>,
}

impl ActiveConnection {
    /// Open a client and the target's database
    pub async fn open(
        label: ConnectionLabel,
        target: ConnectionTarget,
        connector: &dyn Connector,
    ) -> Result<Self, ConnectionError> {
        debug!("Connecting to {target:?} as '{label}'");
        let failed = |source| ConnectionError::ConnectError {
            target: describe(&target),
            source,
        };

        let client = connector.connect(&target).await.map_err(failed)?;
        let database = client
            .open_database(&target.database)
            .await
            .map_err(failed)?;

        Ok(ActiveConnection {
            url: target.url(),
            label,
            target,
            client,
            database,
        })
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }
}

impl fmt::Debug for ActiveConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveConnection")
            .field("label", &self.label)
            .field("target", &self.target)
            .field("database", &self.database.name())
            .finish()
    }
}

/// `user@host:port/database`, never including the password
fn describe(target: &ConnectionTarget) -> String {
    format!(
        "{}@{}:{}/{}",
        target.username, target.host, target.port, target.database
    )
}

/// The live shell state, owned by the shell loop
#[derive(Debug)]
pub struct Session {
    active: ActiveConnection,
    pub buffer: StatementBuffer,
}

impl Session {
    pub fn new(active: ActiveConnection) -> Self {
        Session {
            active,
            buffer: StatementBuffer::new(),
        }
    }

    /// Open a connection and start a session on it
    pub async fn connect(
        label: ConnectionLabel,
        target: ConnectionTarget,
        connector: &dyn Connector,
    ) -> Result<Self, ConnectionError> {
        let active = ActiveConnection::open(label, target, connector).await?;
        info!(
            "Connected to {} (database: {})",
            active.url,
            active.database_name()
        );
        Ok(Session::new(active))
    }

    /// Start a session using a named configuration
    pub async fn connect_named(
        name: &str,
        store: &dyn ConfigStore,
        connector: &dyn Connector,
    ) -> Result<Self, ConnectionError> {
        let config = store
            .get(name)
            .ok_or_else(|| ConnectionError::ConfigNotFound(name.to_string()))?;
        Session::connect(
            ConnectionLabel::Named(name.to_string()),
            config.to_target(),
            connector,
        )
        .await
    }

    pub fn active(&self) -> &ActiveConnection {
        &self.active
    }

    pub fn label(&self) -> &ConnectionLabel {
        &self.active.label
    }

    pub fn database(&self) -> &dyn DatabaseHandle {
        self.active.database.as_ref()
    }

    pub fn database_name(&self) -> &str {
        self.active.database_name()
    }

    /// Whether the session is connected through the named configuration
    pub fn is_current(&self, name: &str) -> bool {
        matches!(&self.active.label, ConnectionLabel::Named(current) if current == name)
    }

    /// Prompt label: `name:database` or just `database` for manual connections
    pub fn prompt_label(&self) -> String {
        match &self.active.label {
            ConnectionLabel::Named(name) => format!("{name}:{}", self.database_name()),
            ConnectionLabel::Manual => self.database_name().to_string(),
        }
    }

    /// Reconnect using a named configuration.
    ///
    /// On any failure the current connection stays active.
    pub async fn switch_to(
        &mut self,
        name: &str,
        store: &dyn ConfigStore,
        connector: &dyn Connector,
    ) -> Result<&ActiveConnection, ConnectionError> {
        let config = store.get(name).ok_or_else(|| {
            warn!("Switch to unknown configuration '{name}'");
            ConnectionError::ConfigNotFound(name.to_string())
        })?;

        let next = ActiveConnection::open(
            ConnectionLabel::Named(name.to_string()),
            config.to_target(),
            connector,
        )
        .await
        .inspect_err(|e| warn!("Switch to '{name}' failed: {e}"))?;

        info!("Switched to '{name}' ({})", next.url);
        self.active = next;
        Ok(&self.active)
    }

    /// Change the active database on the current connection
    pub async fn use_database(&mut self, name: &str) -> Result<&ActiveConnection, ConnectionError> {
        let target = ConnectionTarget {
            database: name.to_string(),
            ..self.active.target.clone()
        };

        let database = self
            .active
            .client
            .open_database(name)
            .await
            .map_err(|source| ConnectionError::ConnectError {
                target: describe(&target),
                source,
            })
            .inspect_err(|e| warn!("Use database '{name}' failed: {e}"))?;

        info!("Using database '{name}'");
        self.active.database = database;
        self.active.target = target;
        Ok(&self.active)
    }
}
