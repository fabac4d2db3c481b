//! Full-screen result viewer
//!
//! A formatted query report is shown in a centered, bordered box that can be
//! scrolled with the arrow keys and closed with `q` or `Esc`. The viewer runs its
//! own event loop; the shell does not read input until it returns.
//!
//! The state machine in [`app`] and the layout math in [`layout`] are free of
//! terminal I/O; this module only owns terminal setup and the event loop.

mod app;
mod layout;
mod ui;

pub use app::{ResultViewer, ViewerEffect, ViewerEvent, ViewerState, Viewport};
pub use layout::{Dimensions, word_wrap};

use crossterm::{
    event, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::{self, stdout};
use std::panic;
use std::time::Duration;
use tracing::debug;

/// Smallest terminal the viewer is opened in
const MIN_WIDTH: u16 = 20;
const MIN_HEIGHT: u16 = 10;

/// Show a report in the viewer, blocking until the user closes it
pub fn show_results(content: &str) -> Result<(), String> {
    let mut viewer = ResultViewer::new(content);

    // Set up panic hook to restore terminal on panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_viewer_loop(&mut viewer);

    // Restore panic hook
    let _ = panic::take_hook();

    result
}

fn run_viewer_loop(viewer: &mut ResultViewer) -> Result<(), String> {
    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {e}"))?;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)
        .map_err(|e| format!("Failed to enter alternate screen: {e}"))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("Failed to create terminal: {e}"))?;

    terminal
        .clear()
        .map_err(|e| format!("Failed to clear terminal: {e}"))?;

    // The first size is fed in as a resize; without it the viewer stays uninitialized
    match terminal.size() {
        Ok(size) => {
            viewer.handle(ViewerEvent::Resize {
                width: size.width,
                height: size.height,
            });
        }
        Err(e) => debug!("Terminal size unavailable: {e}"),
    }

    let result = loop {
        if let Err(e) = terminal.draw(|frame| ui::render(frame, viewer)) {
            break Err(format!("Failed to draw: {e}"));
        }

        match next_event(Duration::from_millis(100)) {
            Ok(Some(event)) => {
                if viewer.handle(event) == ViewerEffect::Close {
                    break Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => break Err(format!("Event error: {e}")),
        }
    };

    disable_raw_mode().map_err(|e| format!("Failed to disable raw mode: {e}"))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| format!("Failed to leave alternate screen: {e}"))?;

    terminal
        .show_cursor()
        .map_err(|e| format!("Failed to show cursor: {e}"))?;

    result
}

/// Wait up to `timeout` for an event the viewer cares about
fn next_event(timeout: Duration) -> io::Result<Option<ViewerEvent>> {
    if event::poll(timeout)? {
        return Ok(ViewerEvent::from_terminal(event::read()?));
    }
    Ok(None)
}

/// Check whether the viewer can be opened on this terminal
pub fn can_run_tui() -> bool {
    tui_unavailable_reason().is_none()
}

/// Get a message explaining why the viewer cannot run
pub fn tui_unavailable_reason() -> Option<String> {
    if !io::IsTerminal::is_terminal(&io::stdout()) {
        return Some("stdout is not a terminal".to_string());
    }

    match crossterm::terminal::size() {
        Ok((width, height)) if width < MIN_WIDTH || height < MIN_HEIGHT => Some(format!(
            "Terminal too small ({width}x{height}, need at least {MIN_WIDTH}x{MIN_HEIGHT})"
        )),
        Ok(_) => None,
        Err(_) => Some("Could not determine terminal size".to_string()),
    }
}
