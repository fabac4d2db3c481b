use crate::database::{ConnectionTarget, DEFAULT_DATABASE, DEFAULT_PORT};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// ArangoCrust - An interactive ArangoDB shell
#[derive(Parser, Clone)]
#[command(name = "arangocrust")]
#[command(version, long_about = None)]
#[command(about = "An interactive ArangoDB shell with multi-line AQL input and a scrollable result viewer")]
pub struct Args {
    /// Named connection from the configuration file (defaults to its `default` entry)
    #[arg(value_name = "CONFIG")]
    pub config_name: Option<String>,

    /// Server host (connects manually, ignoring named configurations)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Username
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password (prompted for when omitted in manual mode)
    #[arg(short = 'P', long)]
    pub password: Option<String>,

    /// Database to open
    #[arg(short, long)]
    pub database: Option<String>,

    /// Connect over HTTPS
    #[arg(short, long)]
    pub ssl: bool,

    /// Use this configuration file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Generate shell completions
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,

    /// Execute a statement or command and exit (repeatable)
    #[arg(short, long, action = clap::ArgAction::Append)]
    pub command: Vec<String>,
}

impl Args {
    /// Whether any connection parameter was given directly on the command line
    pub fn is_manual(&self) -> bool {
        self.host.is_some()
            || self.port.is_some()
            || self.user.is_some()
            || self.password.is_some()
            || self.database.is_some()
            || self.ssl
    }

    /// Connection target from the manual flags, using `password` for the secret
    pub fn manual_target(&self, password: String) -> ConnectionTarget {
        ConnectionTarget::new(
            self.host.clone().unwrap_or_else(|| "localhost".to_string()),
            self.port.unwrap_or(DEFAULT_PORT),
            self.user.clone().unwrap_or_else(|| "root".to_string()),
            password,
            self.ssl,
            self.database
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        )
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("config_name", &self.config_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .field("config_file", &self.config_file)
            .field("completions", &self.completions)
            .field("command", &self.command)
            .finish()
    }
}

/// Supported shells for completion generation
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
