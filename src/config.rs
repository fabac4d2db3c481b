use crate::database::{ConnectionTarget, DEFAULT_DATABASE, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the connection written into a freshly created configuration
pub const DEFAULT_CONNECTION_NAME: &str = "local";

const CONFIG_DIR_NAME: &str = "arangocrust";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine the configuration directory")]
    NoConfigDirectory,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Read-only lookup of named connection configurations
pub trait ConfigStore {
    /// Look up a named connection
    fn get(&self, name: &str) -> Option<NamedConnection>;

    /// All configured names, sorted
    fn list_names(&self) -> Vec<String>;

    /// Name used when none is given on the command line (may be empty)
    fn default_name(&self) -> String;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default = "default_console_output")]
    pub console_output: bool,
    #[serde(default = "default_file_output")]
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            console_output: default_console_output(),
            file_output: default_file_output(),
        }
    }
}

/// One named set of connection parameters
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct NamedConnection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub ssl: bool,
}

impl Default for NamedConnection {
    fn default() -> Self {
        NamedConnection {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            ssl: false,
        }
    }
}

impl std::fmt::Debug for NamedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .finish()
    }
}

impl NamedConnection {
    /// Copy the fields needed to open a connection into a fresh target
    pub fn to_target(&self) -> ConnectionTarget {
        ConnectionTarget::new(
            self.host.clone(),
            self.port,
            self.username.clone(),
            self.password.clone(),
            self.ssl,
            self.database.clone(),
        )
    }

    /// Database this connection opens, `_system` when unset
    pub fn database_name(&self) -> &str {
        if self.database.trim().is_empty() {
            DEFAULT_DATABASE
        } else {
            &self.database
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// Connection used when none is named on the command line
    #[serde(default)]
    pub default: String,
    #[serde(default = "default_show_banner")]
    pub show_banner: bool,
    #[serde(default = "default_multiline_prompt_indicator")]
    pub multiline_prompt_indicator: String,
    /// Open query results in the full-screen viewer
    #[serde(default = "default_result_viewer_enabled")]
    pub result_viewer_enabled: bool,
    #[serde(default = "default_pager_enabled")]
    pub pager_enabled: bool,
    #[serde(default = "default_pager_command")]
    pub pager_command: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub databases: BTreeMap<String, NamedConnection>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut databases = BTreeMap::new();
        databases.insert(
            DEFAULT_CONNECTION_NAME.to_string(),
            NamedConnection::default(),
        );

        Config {
            default: DEFAULT_CONNECTION_NAME.to_string(),
            show_banner: default_show_banner(),
            multiline_prompt_indicator: default_multiline_prompt_indicator(),
            result_viewer_enabled: default_result_viewer_enabled(),
            pager_enabled: default_pager_enabled(),
            pager_command: default_pager_command(),
            request_timeout_seconds: default_request_timeout(),
            databases,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_username() -> String {
    "root".to_string()
}

fn default_console_output() -> bool {
    false
}

fn default_file_output() -> bool {
    true
}

fn default_show_banner() -> bool {
    true
}

fn default_multiline_prompt_indicator() -> String {
    "... ".to_string()
}

fn default_result_viewer_enabled() -> bool {
    true
}

fn default_pager_enabled() -> bool {
    true
}

fn default_pager_command() -> String {
    "less -R".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    /// Directory holding the configuration file and the log file
    pub fn get_config_directory() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::NoConfigDirectory)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::get_config_directory()?.join(CONFIG_FILE_NAME))
    }

    /// Load the configuration from its default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load the configuration from `path`, creating it with defaults when missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {}, writing defaults", path.display());
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loaded {} connection config(s) from {}",
            config.databases.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let toml = toml::to_string(self)?;
        fs::write(path, toml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ConfigStore for Config {
    fn get(&self, name: &str) -> Option<NamedConnection> {
        self.databases.get(name).cloned()
    }

    fn list_names(&self) -> Vec<String> {
        // BTreeMap keys are already ordered
        self.databases.keys().cloned().collect()
    }

    fn default_name(&self) -> String {
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn test_missing_file_creates_default_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.default_name(), "local");

        let local = config.get("local").unwrap();
        assert_eq!(local.host, "localhost");
        assert_eq!(local.port, 8529);
        assert_eq!(local.username, "root");
        assert_eq!(local.password, "");
        assert_eq!(local.database, "_system");
        assert!(!local.ssl);
    }

    #[rstest]
    fn test_saved_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.databases.insert(
            "prod".to_string(),
            NamedConnection {
                host: "db.example.com".to_string(),
                port: 8530,
                username: "admin".to_string(),
                password: "secret".to_string(),
                database: "orders".to_string(),
                ssl: true,
            },
        );
        config.default = "prod".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[rstest]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
default = "staging"

[databases.staging]
host = "staging.internal"

[databases.analytics]
host = "10.0.0.4"
port = 9000
database = "metrics"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.list_names(), vec!["analytics", "staging"]);
        assert!(config.result_viewer_enabled);
        assert_eq!(config.logging.level, LogLevel::Info);

        let staging = config.get("staging").unwrap();
        assert_eq!(staging.port, 8529);
        assert_eq!(staging.username, "root");
        assert_eq!(staging.database_name(), "_system");
        assert_eq!(staging.to_target().database, "_system");
    }

    #[rstest]
    fn test_invalid_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default = [unterminated").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[rstest]
    #[case(LogLevel::Trace, "trace")]
    #[case(LogLevel::Warn, "warn")]
    fn test_log_level_display(#[case] level: LogLevel, #[case] expected: &str) {
        assert_eq!(level.to_string(), expected);
    }

    #[test]
    fn test_get_unknown_name() {
        assert!(Config::default().get("prod").is_none());
    }
}
