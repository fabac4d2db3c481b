//! Viewer state machine and key handling

use super::layout::{Dimensions, word_wrap};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

/// Rows moved by PageUp/PageDown when the viewport height is unknown
const DEFAULT_PAGE: usize = 10;

/// Input the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    Resize { width: u16, height: u16 },
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Close,
}

impl ViewerEvent {
    /// Map a terminal event; keys the viewer does not use map to `None`
    pub fn from_terminal(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) => Self::from_key(key),
            Event::Resize(width, height) => Some(ViewerEvent::Resize { width, height }),
            _ => None,
        }
    }

    pub fn from_key(key: KeyEvent) -> Option<Self> {
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(ViewerEvent::Close),
            KeyCode::Up | KeyCode::Char('k') => Some(ViewerEvent::ScrollUp),
            KeyCode::Down | KeyCode::Char('j') => Some(ViewerEvent::ScrollDown),
            KeyCode::PageUp => Some(ViewerEvent::PageUp),
            KeyCode::PageDown | KeyCode::Char(' ') => Some(ViewerEvent::PageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(ViewerEvent::Top),
            KeyCode::End | KeyCode::Char('G') => Some(ViewerEvent::Bottom),
            _ => None,
        }
    }
}

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEffect {
    /// Nothing visible changed
    None,
    Redraw,
    Close,
}

/// Laid-out content, available once the window size is known
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub dims: Dimensions,
    pub lines: Vec<String>,
    pub scroll: usize,
}

impl Viewport {
    fn new(content: &str, dims: Dimensions) -> Self {
        let wrapped = word_wrap(content, usize::from(dims.content_width));
        Viewport {
            dims,
            lines: wrapped.split('\n').map(str::to_string).collect(),
            scroll: 0,
        }
    }

    pub fn max_scroll(&self) -> usize {
        self.lines
            .len()
            .saturating_sub(usize::from(self.dims.content_height))
    }

    /// Lines currently inside the content area
    pub fn visible_lines(&self) -> &[String] {
        let start = self.scroll.min(self.lines.len());
        let end = (start + usize::from(self.dims.content_height)).min(self.lines.len());
        &self.lines[start..end]
    }

    fn page(&self) -> usize {
        match self.dims.content_height {
            0 => DEFAULT_PAGE,
            height => usize::from(height),
        }
    }

    fn scroll_to(&mut self, offset: usize) -> ViewerEffect {
        let offset = offset.min(self.max_scroll());
        if offset == self.scroll {
            return ViewerEffect::None;
        }
        self.scroll = offset;
        ViewerEffect::Redraw
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState {
    /// No window size reported yet
    Uninitialized,
    Ready(Viewport),
}

/// Modal, scrollable view over a formatted report
#[derive(Debug)]
pub struct ResultViewer {
    /// The report as formatted, never wrapped in place
    content: String,
    state: ViewerState,
}

impl ResultViewer {
    pub fn new(content: impl Into<String>) -> Self {
        ResultViewer {
            content: content.into(),
            state: ViewerState::Uninitialized,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        match &self.state {
            ViewerState::Ready(viewport) => Some(viewport),
            ViewerState::Uninitialized => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ViewerState::Ready(_))
    }

    /// Apply one event
    pub fn handle(&mut self, event: ViewerEvent) -> ViewerEffect {
        if event == ViewerEvent::Close {
            return ViewerEffect::Close;
        }

        if let ViewerEvent::Resize { width, height } = event {
            self.resize(width, height);
            return ViewerEffect::Redraw;
        }

        let ViewerState::Ready(viewport) = &mut self.state else {
            return ViewerEffect::None;
        };

        match event {
            ViewerEvent::ScrollUp => viewport.scroll_to(viewport.scroll.saturating_sub(1)),
            ViewerEvent::ScrollDown => viewport.scroll_to(viewport.scroll.saturating_add(1)),
            ViewerEvent::PageUp => {
                let page = viewport.page();
                viewport.scroll_to(viewport.scroll.saturating_sub(page))
            }
            ViewerEvent::PageDown => {
                let page = viewport.page();
                viewport.scroll_to(viewport.scroll.saturating_add(page))
            }
            ViewerEvent::Top => viewport.scroll_to(0),
            ViewerEvent::Bottom => {
                let bottom = viewport.max_scroll();
                viewport.scroll_to(bottom)
            }
            ViewerEvent::Resize { .. } | ViewerEvent::Close => ViewerEffect::None,
        }
    }

    /// Re-lay out from the original content; the scroll offset survives, clamped
    fn resize(&mut self, width: u16, height: u16) {
        let dims = Dimensions::from_window(width, height);
        let previous_scroll = match &self.state {
            ViewerState::Ready(viewport) => viewport.scroll,
            ViewerState::Uninitialized => 0,
        };

        let mut viewport = Viewport::new(&self.content, dims);
        viewport.scroll = previous_scroll.min(viewport.max_scroll());
        self.state = ViewerState::Ready(viewport);
    }
}
