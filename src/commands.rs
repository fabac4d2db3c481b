//! Classification and execution of complete statements
//! Reserved words and slash commands are typed enums; everything else is AQL

use crate::config::ConfigStore;
use crate::database::{BindVars, Connector, DatabaseError, execute_query};
use crate::format::format_query_result;
use crate::session::{ConnectionError, Session};
use strum::{EnumIter, IntoEnumIterator};
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix marking a control command
pub const CONTROL_PREFIX: char = '/';

/// Keywords whose presence keeps a query from being wrapped in `RETURN`
const RESULT_KEYWORDS: [&str; 5] = ["RETURN", "INSERT", "UPDATE", "REMOVE", "REPLACE"];

/// What a complete statement asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Exit,
    Help,
    Control { name: String, args: Vec<String> },
    Query(String),
}

/// Parsed control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    ShowDatabases,
    ShowCollections,
    UseDatabase { name: String },
    ListConfigs,
    SwitchConfig { name: String },
    Current,
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid command syntax: {0}")]
    InvalidSyntax(String),
    #[error("Missing required argument: {0}")]
    MissingArgument(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Query failed: {0}")]
    Query(DatabaseError),
    #[error("Database error: {0}")]
    Database(DatabaseError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Exit,
    Continue,
    /// Plain text printed straight to the terminal
    Output(String),
    /// A formatted query report for the result viewer
    Results(String),
    Error(String),
}

/// Control commands with their metadata, used for help and completion
#[derive(Debug, Clone, Copy, PartialEq, EnumIter)]
pub enum CommandShortcut {
    Databases,
    Collections,
    Use,
    Configs,
    Switch,
    Current,
}

impl CommandShortcut {
    /// Full command form
    pub fn command(&self) -> &'static str {
        match self {
            CommandShortcut::Databases => "/show databases",
            CommandShortcut::Collections => "/show collections",
            CommandShortcut::Use => "/use",
            CommandShortcut::Configs => "/list configs",
            CommandShortcut::Switch => "/switch",
            CommandShortcut::Current => "/current",
        }
    }

    /// Short alias, if any
    pub fn alias(&self) -> Option<&'static str> {
        match self {
            CommandShortcut::Databases => Some("/db"),
            CommandShortcut::Collections => Some("/col"),
            CommandShortcut::Configs => Some("/configs"),
            CommandShortcut::Use | CommandShortcut::Switch | CommandShortcut::Current => None,
        }
    }

    pub fn usage(&self) -> &'static str {
        match self {
            CommandShortcut::Use => "/use <database>",
            CommandShortcut::Switch => "/switch <config>",
            other => other.command(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CommandShortcut::Databases => "List available databases",
            CommandShortcut::Collections => "List collections in the current database",
            CommandShortcut::Use => "Switch to a different database",
            CommandShortcut::Configs => "List configured connections",
            CommandShortcut::Switch => "Reconnect using a configured connection",
            CommandShortcut::Current => "Show the current connection",
        }
    }

    /// Whether the command takes a name argument
    pub fn takes_argument(&self) -> bool {
        matches!(self, CommandShortcut::Use | CommandShortcut::Switch)
    }
}

/// Every spelling a control command can be typed with, for completion
pub fn get_command_names() -> Vec<&'static str> {
    CommandShortcut::iter()
        .flat_map(|shortcut| std::iter::once(shortcut.command()).chain(shortcut.alias()))
        .collect()
}

/// Classify a complete statement
pub fn classify(statement: &str) -> CommandKind {
    let trimmed = statement.trim();

    if let Some(kind) = reserved_word(trimmed) {
        return kind;
    }

    if let Some(rest) = trimmed.strip_prefix(CONTROL_PREFIX) {
        let rest = rest.trim_end().trim_end_matches(';');
        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default().to_lowercase();
        let args = words.map(str::to_string).collect();
        return CommandKind::Control { name, args };
    }

    CommandKind::Query(to_query_text(trimmed))
}

/// `exit`, `quit` or `help`, matched case-insensitively with an optional `;`
pub fn reserved_word(line: &str) -> Option<CommandKind> {
    let word = line.trim();
    let word = word.strip_suffix(';').unwrap_or(word).trim();
    match word.to_lowercase().as_str() {
        "exit" | "quit" => Some(CommandKind::Exit),
        "help" => Some(CommandKind::Help),
        _ => None,
    }
}

/// Lines handled as soon as they are entered rather than buffered
pub fn is_immediate(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with(CONTROL_PREFIX) || reserved_word(trimmed).is_some()
}

/// Wrap bare expressions in `RETURN` so they produce a visible result.
///
/// This is a keyword substring test, not a parse: a keyword inside a string
/// literal or attribute name also suppresses the wrap.
pub fn to_query_text(statement: &str) -> String {
    let upper = statement.to_uppercase();
    if RESULT_KEYWORDS.iter().any(|keyword| upper.contains(keyword)) {
        statement.to_string()
    } else {
        format!("RETURN {statement}")
    }
}

impl ControlCommand {
    /// Parse a control command name and its arguments
    pub fn parse(name: &str, args: &[String]) -> Result<ControlCommand, CommandError> {
        let first = args.first().map(|arg| arg.to_lowercase());

        match name {
            "" => Err(CommandError::InvalidSyntax(format!(
                "expected a command name after '{CONTROL_PREFIX}'"
            ))),
            "show" => match first.as_deref() {
                Some("databases") => Ok(ControlCommand::ShowDatabases),
                Some("collections") => Ok(ControlCommand::ShowCollections),
                Some(other) => Err(CommandError::UnknownCommand(format!("/show {other}"))),
                None => Err(CommandError::MissingArgument(
                    "databases or collections (usage: /show databases)".to_string(),
                )),
            },
            "db" | "databases" => Ok(ControlCommand::ShowDatabases),
            "col" | "collections" => Ok(ControlCommand::ShowCollections),
            "use" => match args.first() {
                Some(database) => Ok(ControlCommand::UseDatabase {
                    name: database.clone(),
                }),
                None => Err(CommandError::MissingArgument(format!(
                    "database name (usage: {})",
                    CommandShortcut::Use.usage()
                ))),
            },
            "list" => match first.as_deref() {
                Some("configs") => Ok(ControlCommand::ListConfigs),
                Some(other) => Err(CommandError::UnknownCommand(format!("/list {other}"))),
                None => Err(CommandError::MissingArgument(
                    "configs (usage: /list configs)".to_string(),
                )),
            },
            "configs" => Ok(ControlCommand::ListConfigs),
            "switch" => match args.first() {
                Some(config) => Ok(ControlCommand::SwitchConfig {
                    name: config.clone(),
                }),
                None => Err(CommandError::MissingArgument(format!(
                    "config name (usage: {})",
                    CommandShortcut::Switch.usage()
                ))),
            },
            "current" => Ok(ControlCommand::Current),
            other => Err(CommandError::UnknownCommand(format!("/{other}"))),
        }
    }

    pub async fn execute(
        &self,
        session: &mut Session,
        store: &dyn ConfigStore,
        connector: &dyn Connector,
    ) -> Result<CommandResult, CommandError> {
        match self {
            ControlCommand::ShowDatabases => {
                let names = session
                    .active()
                    .client
                    .list_databases()
                    .await
                    .map_err(CommandError::Database)?;
                Ok(CommandResult::Output(numbered_list("Databases:", &names)))
            }
            ControlCommand::ShowCollections => {
                let names = session
                    .database()
                    .list_collections()
                    .await
                    .map_err(CommandError::Database)?;
                Ok(CommandResult::Output(numbered_list("Collections:", &names)))
            }
            ControlCommand::UseDatabase { name } => {
                session.use_database(name).await?;
                Ok(CommandResult::Output(format!("Using database '{name}'")))
            }
            ControlCommand::ListConfigs => Ok(CommandResult::Output(list_configs(session, store))),
            ControlCommand::SwitchConfig { name } => {
                let active = session.switch_to(name, store, connector).await?;
                Ok(CommandResult::Output(format!(
                    "Switched to configuration '{name}' ({}:{}, database: {})",
                    active.target.host,
                    active.target.port,
                    active.database_name()
                )))
            }
            ControlCommand::Current => Ok(CommandResult::Output(current_connection(session))),
        }
    }
}

/// Execute a classified statement
pub async fn execute(
    kind: CommandKind,
    session: &mut Session,
    store: &dyn ConfigStore,
    connector: &dyn Connector,
) -> Result<CommandResult, CommandError> {
    match kind {
        CommandKind::Exit => Ok(CommandResult::Exit),
        CommandKind::Help => Ok(CommandResult::Output(generate_help_text())),
        CommandKind::Control { name, args } => {
            let command = ControlCommand::parse(&name, &args)?;
            debug!("Executing control command {command:?}");
            command.execute(session, store, connector).await
        }
        CommandKind::Query(text) => {
            debug!("Executing query on '{}': {text}", session.database_name());
            let result = execute_query(session.database(), &text, &BindVars::new())
                .await
                .map_err(CommandError::Query)?;
            Ok(CommandResult::Results(format_query_result(&result)))
        }
    }
}

/// Classify and execute a statement, turning every failure into a printable result
pub async fn dispatch(
    statement: &str,
    session: &mut Session,
    store: &dyn ConfigStore,
    connector: &dyn Connector,
) -> CommandResult {
    match execute(classify(statement), session, store, connector).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Command failed: {e}");
            CommandResult::Error(e.to_string())
        }
    }
}

fn numbered_list(title: &str, names: &[String]) -> String {
    let mut output = String::from(title);
    for (i, name) in names.iter().enumerate() {
        output.push_str(&format!("\n{}: {name}", i + 1));
    }
    output
}

fn list_configs(session: &Session, store: &dyn ConfigStore) -> String {
    let names = store.list_names();
    if names.is_empty() {
        return "  No database configurations found.".to_string();
    }

    let default = store.default_name();
    let mut output = String::from("Available database configurations:");
    for name in names {
        let Some(config) = store.get(&name) else {
            continue;
        };
        let marker = if session.is_current(&name) {
            "→ "
        } else if name == default {
            "* "
        } else {
            "  "
        };
        output.push_str(&format!(
            "\n{marker}{name}: {}:{}/{}",
            config.host,
            config.port,
            config.database_name()
        ));
    }
    output
}

fn current_connection(session: &Session) -> String {
    let active = session.active();
    [
        "Current connection:".to_string(),
        format!("  Config: {}", active.label),
        format!("  Host: {}", active.target.host),
        format!("  Port: {}", active.target.port),
        format!("  Database: {}", active.database_name()),
        format!("  Username: {}", active.target.username),
        format!("  SSL: {}", active.target.use_tls),
        format!("  URL: {}", active.url),
    ]
    .join("\n")
}

/// Static usage text
pub fn generate_help_text() -> String {
    let mut help = String::new();
    help.push_str("ArangoDB Shell Commands:\n\n");

    for shortcut in CommandShortcut::iter() {
        let spelling = match shortcut.alias() {
            Some(alias) => format!("{}, {alias}", shortcut.usage()),
            None => shortcut.usage().to_string(),
        };
        help.push_str(&format!("  {spelling:<28} {}\n", shortcut.description()));
    }
    help.push_str(&format!("  {:<28} {}\n", "exit, quit", "Exit the shell"));
    help.push_str(&format!("  {:<28} {}\n", "help", "Display this help message"));

    help.push_str("\nAny other input is executed as an AQL query. End a query with ';' to run it;\n");
    help.push_str("lines without ';' continue the query on the next line.\n");
    help.push_str("\nExample queries:\n");
    help.push_str("  RETURN DOCUMENT(\"users/123\");\n");
    help.push_str("  FOR doc IN users RETURN doc;\n");
    help
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, NamedConnection};
    use crate::database::QueryStatistics;
    use crate::database::mock::{MockReply, MockServer};
    use rstest::rstest;
    use serde_json::json;

    fn store() -> Config {
        let mut config = Config::default();
        config.databases.insert(
            "staging".to_string(),
            NamedConnection {
                host: "staging.internal".to_string(),
                port: 8530,
                database: "test_db".to_string(),
                ..Default::default()
            },
        );
        config
    }

    async fn session(server: &MockServer) -> Session {
        Session::connect_named("local", &store(), server).await.unwrap()
    }

    #[rstest]
    #[case("exit", CommandKind::Exit)]
    #[case("QUIT", CommandKind::Exit)]
    #[case("exit;", CommandKind::Exit)]
    #[case("Help", CommandKind::Help)]
    #[case("/db", CommandKind::Control { name: "db".to_string(), args: vec![] })]
    #[case(
        "/Show  Databases",
        CommandKind::Control { name: "show".to_string(), args: vec!["Databases".to_string()] }
    )]
    #[case(
        "/use test_db;",
        CommandKind::Control { name: "use".to_string(), args: vec!["test_db".to_string()] }
    )]
    #[case("use test_db", CommandKind::Query("RETURN use test_db".to_string()))]
    #[case("doc.name", CommandKind::Query("RETURN doc.name".to_string()))]
    #[case("1 + 1", CommandKind::Query("RETURN 1 + 1".to_string()))]
    #[case(
        "INSERT { a: 1 } INTO col",
        CommandKind::Query("INSERT { a: 1 } INTO col".to_string())
    )]
    #[case(
        "FOR x IN col\nRETURN x",
        CommandKind::Query("FOR x IN col\nRETURN x".to_string())
    )]
    #[case("for x in col return x", CommandKind::Query("for x in col return x".to_string()))]
    fn test_classify(#[case] statement: &str, #[case] expected: CommandKind) {
        assert_eq!(classify(statement), expected);
    }

    #[test]
    fn test_keyword_inside_literal_suppresses_wrap() {
        assert_eq!(to_query_text("\"no return here\""), "\"no return here\"");
        assert_eq!(to_query_text("doc.updated"), "doc.updated");
    }

    #[rstest]
    #[case("/exit", true)]
    #[case("/anything", true)]
    #[case("quit", true)]
    #[case("  help;  ", true)]
    #[case("FOR x IN col", false)]
    #[case("helpful", false)]
    fn test_is_immediate(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_immediate(line), expected);
    }

    #[rstest]
    #[case("show", &["databases"], ControlCommand::ShowDatabases)]
    #[case("db", &[], ControlCommand::ShowDatabases)]
    #[case("show", &["COLLECTIONS"], ControlCommand::ShowCollections)]
    #[case("col", &[], ControlCommand::ShowCollections)]
    #[case("use", &["test_db"], ControlCommand::UseDatabase { name: "test_db".to_string() })]
    #[case("list", &["configs"], ControlCommand::ListConfigs)]
    #[case("configs", &[], ControlCommand::ListConfigs)]
    #[case("switch", &["prod"], ControlCommand::SwitchConfig { name: "prod".to_string() })]
    #[case("current", &[], ControlCommand::Current)]
    fn test_parse_control_command(
        #[case] name: &str,
        #[case] args: &[&str],
        #[case] expected: ControlCommand,
    ) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        assert_eq!(ControlCommand::parse(name, &args).unwrap(), expected);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ControlCommand::parse("switch", &[]),
            Err(CommandError::MissingArgument(_))
        ));
        assert!(matches!(
            ControlCommand::parse("use", &[]),
            Err(CommandError::MissingArgument(_))
        ));
        assert!(matches!(
            ControlCommand::parse("frobnicate", &[]),
            Err(CommandError::UnknownCommand(_))
        ));
        assert!(matches!(
            ControlCommand::parse("show", &["users".to_string()]),
            Err(CommandError::UnknownCommand(_))
        ));
        assert!(matches!(
            ControlCommand::parse("", &[]),
            Err(CommandError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_get_command_names() {
        let names = get_command_names();
        for expected in ["/show databases", "/db", "/col", "/use", "/configs", "/switch", "/current"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_help_text_mentions_every_command() {
        let help = generate_help_text();
        for shortcut in CommandShortcut::iter() {
            assert!(help.contains(shortcut.usage()));
        }
        assert!(help.contains("exit, quit"));
    }

    #[tokio::test]
    async fn test_switch_without_argument_is_usage_error() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let result = dispatch("/switch", &mut session, &store(), &server).await;
        assert!(matches!(result, CommandResult::Error(message) if message.contains("Missing required argument")));
        assert_eq!(session.prompt_label(), "local:_system");
    }

    #[tokio::test]
    async fn test_switch_to_missing_config() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let result = dispatch("/switch prod", &mut session, &store(), &server).await;
        assert_eq!(
            result,
            CommandResult::Error("Configuration 'prod' not found".to_string())
        );
        assert!(session.is_current("local"));
    }

    #[tokio::test]
    async fn test_switch_to_named_config() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let result = dispatch("/switch staging", &mut session, &store(), &server).await;
        assert_eq!(
            result,
            CommandResult::Output(
                "Switched to configuration 'staging' (staging.internal:8530, database: test_db)"
                    .to_string()
            )
        );
        assert_eq!(session.prompt_label(), "staging:test_db");
    }

    #[tokio::test]
    async fn test_unknown_command_is_not_fatal() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let result = dispatch("/frobnicate now", &mut session, &store(), &server).await;
        assert_eq!(
            result,
            CommandResult::Error("Unknown command: /frobnicate".to_string())
        );
        assert!(server.executed_queries().is_empty());
    }

    #[tokio::test]
    async fn test_use_without_slash_runs_as_query() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let result = dispatch("use test_db", &mut session, &store(), &server).await;
        assert!(matches!(result, CommandResult::Results(_)));
        assert_eq!(
            server.executed_queries(),
            vec![("_system".to_string(), "RETURN use test_db".to_string())]
        );
        assert_eq!(session.database_name(), "_system");
    }

    #[tokio::test]
    async fn test_use_database_command() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let result = dispatch("/use test_db", &mut session, &store(), &server).await;
        assert_eq!(
            result,
            CommandResult::Output("Using database 'test_db'".to_string())
        );
        assert_eq!(session.prompt_label(), "local:test_db");
    }

    #[tokio::test]
    async fn test_listing_commands() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let databases = dispatch("/db", &mut session, &store(), &server).await;
        assert_eq!(
            databases,
            CommandResult::Output("Databases:\n1: _system\n2: test_db".to_string())
        );

        let collections = dispatch("/show collections", &mut session, &store(), &server).await;
        assert_eq!(
            collections,
            CommandResult::Output("Collections:\n1: _graphs\n2: users".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_configs_marks_current_and_default() {
        let server = MockServer::new();
        let mut session = session(&server).await;
        let mut store = store();
        store.default = "staging".to_string();

        let result = dispatch("/configs", &mut session, &store, &server).await;
        assert_eq!(
            result,
            CommandResult::Output(
                "Available database configurations:\n\
                 → local: localhost:8529/_system\n\
                 * staging: staging.internal:8530/test_db"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_list_configs_empty() {
        let server = MockServer::new();
        let mut session = session(&server).await;
        let mut empty = store();
        empty.databases.clear();

        let result = dispatch("/list configs", &mut session, &empty, &server).await;
        assert_eq!(
            result,
            CommandResult::Output("  No database configurations found.".to_string())
        );
    }

    #[tokio::test]
    async fn test_current_connection() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        let CommandResult::Output(text) = dispatch("/current", &mut session, &store(), &server).await
        else {
            panic!("expected output");
        };
        assert!(text.starts_with("Current connection:"));
        assert!(text.contains("  Config: local"));
        assert!(text.contains("  Port: 8529"));
        assert!(text.contains("  URL: http://localhost:8529"));
    }

    #[tokio::test]
    async fn test_query_results_are_formatted() {
        let server = MockServer::new().reply(
            "FOR u IN users RETURN u.name",
            MockReply::Documents(
                vec![json!("alice"), json!("bob")],
                QueryStatistics {
                    documents_scanned: Some(2),
                    ..Default::default()
                },
            ),
        );
        let mut session = session(&server).await;

        let result = dispatch("FOR u IN users RETURN u.name", &mut session, &store(), &server).await;
        let CommandResult::Results(report) = result else {
            panic!("expected query results");
        };
        assert!(report.contains("alice"));
        assert!(report.contains("bob"));
        assert!(report.contains("Documents read: 2"));
    }

    #[rstest]
    #[case(MockReply::Reject("syntax error, unexpected identifier".to_string()))]
    #[case(MockReply::FailAfter(vec![json!({"_key": "1"})]))]
    #[tokio::test]
    async fn test_query_failure_is_reported(#[case] reply: MockReply) {
        let server = MockServer::new().reply("FOR u IN users RETURN u", reply);
        let mut session = session(&server).await;

        let result = dispatch("FOR u IN users RETURN u", &mut session, &store(), &server).await;
        assert!(matches!(result, CommandResult::Error(message) if message.starts_with("Query failed")));
    }

    #[tokio::test]
    async fn test_exit_and_help() {
        let server = MockServer::new();
        let mut session = session(&server).await;

        assert_eq!(
            dispatch("exit", &mut session, &store(), &server).await,
            CommandResult::Exit
        );
        assert!(matches!(
            dispatch("help", &mut session, &store(), &server).await,
            CommandResult::Output(text) if text.contains("/switch <config>")
        ));
    }
}
