//! External pager, used for long reports when the full-screen viewer is unavailable

use std::io::{self, ErrorKind, IsTerminal, Write};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Whether `content` is taller than a terminal of `terminal_height` rows
pub fn needs_paging(content: &str, terminal_height: u16) -> bool {
    content.lines().count() > usize::from(terminal_height.saturating_sub(1))
}

/// Print `content`, through `pager_cmd` when stdout is a terminal and the content
/// does not fit on screen
pub fn print_or_page(content: &str, pager_enabled: bool, pager_cmd: &str) {
    let fits = match crossterm::terminal::size() {
        Ok((_, height)) => !needs_paging(content, height),
        Err(_) => true,
    };

    if !pager_enabled || fits || !io::stdout().is_terminal() {
        println!("{content}");
        return;
    }

    if let Err(e) = page_output(content, pager_cmd) {
        warn!("Pager '{pager_cmd}' failed: {e}");
    }
}

/// Pipe `content` into the pager; falls back to printing if it cannot be started
pub fn page_output(content: &str, pager_cmd: &str) -> io::Result<()> {
    if content.is_empty() {
        return Ok(());
    }

    let mut parts = pager_cmd.split_whitespace();
    let Some(program) = parts.next() else {
        println!("{content}");
        return Ok(());
    };

    debug!("Paging {} line(s) through '{pager_cmd}'", content.lines().count());

    let child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit()) // Pager should take over the terminal
        .stderr(Stdio::inherit())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            eprintln!("Failed to start pager '{pager_cmd}': {e}. Outputting directly.");
            println!("{content}");
            return Err(e);
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        // BrokenPipe just means the user quit the pager early
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            if e.kind() != ErrorKind::BrokenPipe {
                println!("{content}");
                return Err(e);
            }
        }
    }

    child.wait().map(|_| ())
}
