pub mod cli;
pub mod cli_core;
pub mod commands;
pub mod completion;
pub mod config;
pub mod database; // Driver contracts and query draining
pub mod database_arango; // ArangoDB HTTP implementation
pub mod format;
pub mod logging;
pub mod pager;
pub mod prompt;
pub mod session;
pub mod statement;
pub mod viewer;

pub use config::Config;
pub use session::Session;
pub use statement::StatementBuffer;
