use crate::cli::{Args, Shell};
use crate::commands::{self, CommandResult, is_immediate};
use crate::completion::{CompletionCatalog, ShellCompleter};
use crate::config::{Config, ConfigError, ConfigStore};
use crate::database::Connector;
use crate::database_arango::ArangoConnector;
use crate::prompt::{ContinuationPrompt, ShellPrompt};
use crate::session::{ConnectionError, ConnectionLabel, Session};
use crate::statement::Submission;
use crate::{logging, pager, viewer};
use clap::CommandFactory;
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, DefaultHinter, Emacs, FileBackedHistory, KeyCode, KeyModifiers, MenuBuilder,
    Reedline, ReedlineEvent, ReedlineMenu, Signal, default_emacs_keybindings,
};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const HISTORY_FILE_NAME: &str = "history";
const HISTORY_CAPACITY: usize = 1000;

/// Failures that stop the shell before or outside the interactive loop
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("No configuration given and no default set; pass CONFIG or connection flags")]
    NoConfiguration,

    #[error("Failed to read password: {0}")]
    Password(#[source] io::Error),

    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// The read-dispatch-render loop and everything it owns
pub struct CliCore {
    pub config: Config,
    session: Session,
    connector: Box<dyn Connector>,
    catalog: Arc<Mutex<CompletionCatalog>>,
}

impl CliCore {
    pub fn new(config: Config, connector: Box<dyn Connector>, session: Session) -> Self {
        Self {
            config,
            session,
            connector,
            catalog: Arc::new(Mutex::new(CompletionCatalog::default())),
        }
    }

    /// Main entry point; returns the process exit code
    pub async fn run_with_args(args: Args) -> Result<i32, CliError> {
        if let Some(shell) = args.completions {
            print_completions(shell);
            return Ok(0);
        }

        let config = match &args.config_file {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        let log_dir = log_directory(&args)?;
        let _log_guard = match logging::init(&config.logging, &log_dir) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {e}");
                None
            }
        };
        debug!("arangocrust started");
        log_system_info(&args);

        let connector = ArangoConnector::new(Duration::from_secs(config.request_timeout_seconds));
        let session = connect(&args, &config, &connector).await?;

        let mut cli_core = Self::new(config, Box::new(connector), session);
        cli_core.refresh_catalog().await;

        if !args.command.is_empty() {
            return Ok(cli_core.run_commands(&args.command).await);
        }

        if cli_core.config.show_banner {
            print_banner();
        }
        cli_core.run_interactive_mode().await?;
        Ok(0)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Feed one raw input line through the buffer and dispatch it once complete
    pub async fn handle_line(&mut self, line: &str) -> CommandResult {
        if !self.session.buffer.is_multiline() {
            if line.trim().is_empty() {
                return CommandResult::Continue;
            }
            if is_immediate(line) {
                return self.dispatch(line).await;
            }
        }

        match self.session.buffer.submit(line) {
            Submission::Pending | Submission::Ignored => CommandResult::Continue,
            Submission::Complete(statement) if statement.trim().is_empty() => {
                CommandResult::Continue
            }
            Submission::Complete(statement) => self.dispatch(&statement).await,
        }
    }

    async fn dispatch(&mut self, statement: &str) -> CommandResult {
        let identity = self.identity();
        let result = commands::dispatch(
            statement,
            &mut self.session,
            &self.config,
            self.connector.as_ref(),
        )
        .await;

        if self.identity() != identity {
            self.refresh_catalog().await;
        }
        result
    }

    fn identity(&self) -> (String, String) {
        (self.session.prompt_label(), self.session.active().url.clone())
    }

    /// Reload the names offered by tab completion for the active connection
    async fn refresh_catalog(&self) {
        let databases = self
            .session
            .active()
            .client
            .list_databases()
            .await
            .unwrap_or_else(|e| {
                debug!("Could not list databases for completion: {e}");
                Vec::new()
            });
        let collections = self
            .session
            .database()
            .list_collections()
            .await
            .unwrap_or_else(|e| {
                debug!("Could not list collections for completion: {e}");
                Vec::new()
            });

        if let Ok(mut catalog) = self.catalog.lock() {
            *catalog = CompletionCatalog {
                config_names: self.config.list_names(),
                databases,
                collections,
            };
        }
    }

    /// Run `-c` statements in order; returns 1 if any of them failed
    pub async fn run_commands(&mut self, statements: &[String]) -> i32 {
        let mut exit_code = 0;

        for statement in statements {
            let statement = statement.trim();
            let statement = statement.strip_suffix(';').unwrap_or(statement);
            if statement.trim().is_empty() {
                continue;
            }

            debug!("Executing command: {statement}");
            match self.dispatch(statement).await {
                CommandResult::Exit => break,
                CommandResult::Continue => {}
                CommandResult::Output(text) | CommandResult::Results(text) => println!("{text}"),
                CommandResult::Error(message) => {
                    eprintln!("Error: {message}");
                    exit_code = 1;
                }
            }
        }

        exit_code
    }

    pub async fn run_interactive_mode(&mut self) -> Result<(), CliError> {
        let mut line_editor = self.build_line_editor();

        let active = self.session.active();
        println!(
            "Connected to {} (database: {}). Type help for usage or exit to quit.",
            active.url,
            active.database_name()
        );

        loop {
            let signal = if self.session.buffer.is_multiline() {
                let width = textwrap::core::display_width(&self.session.prompt_label()) + 2;
                let prompt = ContinuationPrompt::new(width, &self.config.multiline_prompt_indicator);
                line_editor.read_line(&prompt)?
            } else {
                let prompt = ShellPrompt::new(
                    self.session.prompt_label(),
                    self.config.multiline_prompt_indicator.as_str(),
                );
                line_editor.read_line(&prompt)?
            };

            match signal {
                Signal::Success(line) => match self.handle_line(&line).await {
                    CommandResult::Exit => {
                        println!("Goodbye!");
                        break;
                    }
                    result => self.render(result),
                },
                Signal::CtrlC => {
                    self.session.buffer.reset();
                    println!("^C");
                }
                Signal::CtrlD => {
                    println!("Goodbye!");
                    break;
                }
            }
        }

        info!("Interactive session ended");
        Ok(())
    }

    fn build_line_editor(&self) -> Reedline {
        let completion_menu = Box::new(ColumnarMenu::default().with_name("completion_menu"));

        let mut keybindings = default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu("completion_menu".to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );
        keybindings.add_binding(
            KeyModifiers::SHIFT,
            KeyCode::BackTab,
            ReedlineEvent::MenuPrevious,
        );

        let hinter = Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        );

        let history = match Config::get_config_directory() {
            Ok(dir) => FileBackedHistory::with_file(HISTORY_CAPACITY, dir.join(HISTORY_FILE_NAME))
                .unwrap_or_else(|e| {
                    debug!("Falling back to in-memory history: {e}");
                    FileBackedHistory::default()
                }),
            Err(_) => FileBackedHistory::default(),
        };

        Reedline::create()
            .use_bracketed_paste(true)
            .with_completer(Box::new(ShellCompleter::new(self.catalog.clone())))
            .with_edit_mode(Box::new(Emacs::new(keybindings)))
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_hinter(hinter)
            .with_history(Box::new(history))
    }

    fn render(&self, result: CommandResult) {
        match result {
            CommandResult::Output(text) => println!("{text}"),
            CommandResult::Results(report) => self.show_report(&report),
            CommandResult::Error(message) => eprintln!("Error: {message}"),
            CommandResult::Exit | CommandResult::Continue => {}
        }
    }

    /// Open a query report in the viewer, or print/page it when the viewer cannot run
    fn show_report(&self, report: &str) {
        if self.config.result_viewer_enabled {
            match viewer::tui_unavailable_reason() {
                None => match viewer::show_results(report) {
                    Ok(()) => return,
                    Err(e) => warn!("Result viewer failed: {e}"),
                },
                Some(reason) => debug!("Result viewer unavailable: {reason}"),
            }
        }

        pager::print_or_page(report, self.config.pager_enabled, &self.config.pager_command);
    }
}

/// Open the initial session from either the manual flags or a named configuration
async fn connect(
    args: &Args,
    config: &Config,
    connector: &dyn Connector,
) -> Result<Session, CliError> {
    if args.is_manual() {
        let target = args.manual_target(manual_password(args)?);
        return Ok(Session::connect(ConnectionLabel::Manual, target, connector).await?);
    }

    let name = args
        .config_name
        .clone()
        .unwrap_or_else(|| config.default_name());
    if name.trim().is_empty() {
        return Err(CliError::NoConfiguration);
    }

    Ok(Session::connect_named(&name, config, connector).await?)
}

fn manual_password(args: &Args) -> Result<String, CliError> {
    if let Some(password) = &args.password {
        return Ok(password.clone());
    }
    if io::stdin().is_terminal() {
        return rpassword::prompt_password("Password: ").map_err(CliError::Password);
    }
    Ok(String::new())
}

/// Logs live next to the configuration file
fn log_directory(args: &Args) -> Result<PathBuf, CliError> {
    if let Some(parent) = args
        .config_file
        .as_ref()
        .and_then(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        return Ok(parent.to_path_buf());
    }
    Ok(Config::get_config_directory()?)
}

fn log_system_info(args: &Args) {
    debug!("Operating System: {}", std::env::consts::OS);
    debug!("Architecture: {}", std::env::consts::ARCH);
    debug!("CLI Arguments: {args:?}");
}

fn print_completions(shell: Shell) {
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
}

fn print_banner() {
    let rows = [
        (Color::Rgb(255, 195, 160), "╔═╗╦═╗╔═╗╔╗╔╔═╗╔═╗╔═╗╦═╗╦ ╦╔═╗╔╦╗"),
        (Color::Rgb(255, 107, 107), "╠═╣╠╦╝╠═╣║║║║ ╦║ ║║  ╠╦╝║ ║╚═╗ ║ "),
        (Color::Rgb(200, 50, 70), "╩ ╩╩╚═╩ ╩╝╚╝╚═╝╚═╝╚═╝╩╚═╚═╝╚═╝ ╩ "),
    ];

    println!();
    for (color, row) in rows {
        println!("  {}", color.bold().paint(row));
    }
    println!();
}
