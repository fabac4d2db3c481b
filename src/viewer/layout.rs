//! Size math and word wrapping for the result viewer, kept free of terminal I/O

use ratatui::layout::Rect;
use textwrap::core::display_width;

/// Columns taken by the border (1 each side) and horizontal padding (2 each side)
pub const HORIZONTAL_CHROME: u16 = 6;

/// Rows taken by the border, vertical padding, header, footer and both separators
pub const VERTICAL_CHROME: u16 = 8;

/// Window and box sizes derived from one resize event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub window_width: u16,
    pub window_height: u16,
    pub box_width: u16,
    pub box_height: u16,
    pub content_width: u16,
    pub content_height: u16,
}

impl Dimensions {
    /// The box takes three quarters of the window, leaving at least a small margin
    pub fn from_window(width: u16, height: u16) -> Self {
        let box_width = width.saturating_sub(4).min(scale(width));
        let box_height = height.saturating_sub(4).min(scale(height));

        Dimensions {
            window_width: width,
            window_height: height,
            box_width,
            box_height,
            content_width: box_width.saturating_sub(HORIZONTAL_CHROME),
            content_height: box_height.saturating_sub(VERTICAL_CHROME),
        }
    }

    /// Where the box sits when centered in the window
    pub fn box_area(&self) -> Rect {
        Rect::new(
            centered_offset(self.window_width, self.box_width),
            centered_offset(self.window_height, self.box_height),
            self.box_width,
            self.box_height,
        )
    }
}

fn scale(size: u16) -> u16 {
    // u32 so that 3/4 of u16::MAX does not overflow
    (u32::from(size) * 3 / 4) as u16
}

/// Offset centering `size` within `available`; a box larger than the window is
/// kept flush to the top-left
pub fn centered_offset(available: u16, size: u16) -> u16 {
    available.saturating_sub(size) / 2
}

/// Greedy word wrap that keeps every existing line break.
///
/// Lines already within `width` pass through untouched. Longer lines are
/// re-flowed word by word, joining words with single spaces.
pub fn word_wrap(text: &str, width: usize) -> String {
    let mut wrapped = String::with_capacity(text.len());

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            wrapped.push('\n');
        }

        if display_width(line) <= width {
            wrapped.push_str(line);
            continue;
        }

        let mut line_width = 0;
        for word in line.split_whitespace() {
            let word_width = display_width(word);

            if line_width > 0 && line_width + 1 + word_width > width {
                wrapped.push('\n');
                line_width = 0;
            }
            if line_width > 0 {
                wrapped.push(' ');
                line_width += 1;
            }

            wrapped.push_str(word);
            line_width += word_width;
        }
    }

    wrapped
}
