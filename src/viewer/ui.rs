//! UI rendering for the result viewer

use super::app::{ResultViewer, Viewport};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph},
};

pub const TITLE: &str = "Query Results";
pub const FOOTER_HINT: &str = "↑/↓: Scroll • q/ESC: Close";
pub const PLACEHOLDER: &str = "Initializing...";

const BORDER_COLOR: Color = Color::Indexed(62);
const TITLE_COLOR: Color = Color::Indexed(170);
const HINT_COLOR: Color = Color::Indexed(240);

/// Render the viewer into the whole frame
pub fn render(frame: &mut Frame, viewer: &ResultViewer) {
    let area = frame.area();

    match viewer.viewport() {
        Some(viewport) => render_box(frame, viewport, area),
        None => frame.render_widget(Paragraph::new(PLACEHOLDER), area),
    }
}

fn render_box(frame: &mut Frame, viewport: &Viewport, area: Rect) {
    // Never draw outside the buffer, even if the frame and the last resize disagree
    let box_area = viewport.dims.box_area().intersection(area);
    if box_area.is_empty() {
        return;
    }

    frame.render_widget(Clear, box_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .padding(Padding::new(2, 2, 1, 1));
    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(1), // Separator
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Separator
            Constraint::Length(1), // Footer
        ])
        .split(inner);

    let separator = "─".repeat(usize::from(viewport.dims.content_width));

    let header = Paragraph::new(TITLE)
        .alignment(Alignment::Center)
        .style(Style::default().fg(TITLE_COLOR).add_modifier(Modifier::BOLD));
    frame.render_widget(header, chunks[0]);

    frame.render_widget(Paragraph::new(separator.as_str()), chunks[1]);

    let lines: Vec<Line> = viewport
        .visible_lines()
        .iter()
        .map(|line| Line::raw(line.as_str()))
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[2]);

    frame.render_widget(Paragraph::new(separator.as_str()), chunks[3]);

    let footer = Paragraph::new(FOOTER_HINT)
        .alignment(Alignment::Center)
        .style(Style::default().fg(HINT_COLOR));
    frame.render_widget(footer, chunks[4]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::app::ViewerEvent;
    use ratatui::{Terminal, backend::TestBackend};
    use rstest::rstest;

    fn draw(viewer: &ResultViewer, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, viewer)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut screen = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                screen.push_str(buffer[(x, y)].symbol());
            }
            screen.push('\n');
        }
        screen
    }

    #[test]
    fn test_placeholder_before_first_resize() {
        let viewer = ResultViewer::new("📊 Results:");
        let screen = draw(&viewer, 40, 10);
        assert!(screen.contains(PLACEHOLDER));
        assert!(!screen.contains(TITLE));
    }

    #[test]
    fn test_ready_box_has_header_content_and_footer() {
        let mut viewer = ResultViewer::new("first document\nsecond document");
        viewer.handle(ViewerEvent::Resize {
            width: 80,
            height: 24,
        });

        let screen = draw(&viewer, 80, 24);
        assert!(screen.contains(TITLE));
        assert!(screen.contains("first document"));
        assert!(screen.contains("second document"));
        assert!(screen.contains("q/ESC: Close"));
        assert!(screen.contains('╭'));
        assert!(screen.contains(&"─".repeat(54)));
    }

    #[test]
    fn test_scrolled_content() {
        let content = (1..=30)
            .map(|i| format!("row-{i:02}"))
            .collect::<Vec<_>>()
            .join("\n");
        let mut viewer = ResultViewer::new(content);
        viewer.handle(ViewerEvent::Resize {
            width: 80,
            height: 24,
        });
        viewer.handle(ViewerEvent::Bottom);

        let screen = draw(&viewer, 80, 24);
        assert!(screen.contains("row-30"));
        assert!(!screen.contains("row-01"));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(5, 3)]
    #[case(12, 9)]
    fn test_tiny_window_does_not_panic(#[case] width: u16, #[case] height: u16) {
        let mut viewer = ResultViewer::new("some text that will not fit");
        viewer.handle(ViewerEvent::Resize { width, height });
        draw(&viewer, width, height);
    }

    #[test]
    fn test_frame_smaller_than_last_resize() {
        let mut viewer = ResultViewer::new("text");
        viewer.handle(ViewerEvent::Resize {
            width: 120,
            height: 50,
        });
        draw(&viewer, 30, 10);
    }
}
