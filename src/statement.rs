//! Multi-line statement accumulation
//!
//! Lines are buffered until one ends with `;`. The terminator is stripped and the
//! buffered lines, with their line breaks, are joined with the final line.

/// Statement terminator
pub const TERMINATOR: char = ';';

/// Outcome of submitting one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The line was swallowed; more input is needed
    Pending,
    /// A blank line outside a statement; nothing happened
    Ignored,
    /// A complete, terminator-stripped statement
    Complete(String),
}

/// Accumulates raw input lines into complete statements
#[derive(Debug, Default, Clone)]
pub struct StatementBuffer {
    pending: String,
    multiline: bool,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line
    pub fn submit(&mut self, line: &str) -> Submission {
        let trimmed = line.trim();

        if trimmed.is_empty() && !self.multiline {
            return Submission::Ignored;
        }

        if let Some(body) = trimmed.strip_suffix(TERMINATOR) {
            let statement = if self.multiline {
                let mut statement = std::mem::take(&mut self.pending);
                statement.push_str(strip_terminator(line));
                statement
            } else {
                body.to_string()
            };
            self.reset();
            return Submission::Complete(statement);
        }

        self.pending.push_str(line);
        self.pending.push('\n');
        self.multiline = true;
        Submission::Pending
    }

    /// Drop any partially entered statement
    pub fn reset(&mut self) {
        self.pending.clear();
        self.multiline = false;
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// Text buffered so far
    pub fn pending(&self) -> &str {
        &self.pending
    }
}

/// Remove the trailing terminator (and whitespace after it) from a raw line,
/// keeping the line's leading indentation
fn strip_terminator(line: &str) -> &str {
    let trimmed_end = line.trim_end();
    trimmed_end.strip_suffix(TERMINATOR).unwrap_or(trimmed_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("RETURN 1;", "RETURN 1")]
    #[case("  RETURN 1 ;  ", "RETURN 1 ")]
    #[case(";", "")]
    fn test_single_line_statement(#[case] line: &str, #[case] expected: &str) {
        let mut buffer = StatementBuffer::new();
        assert_eq!(buffer.submit(line), Submission::Complete(expected.to_string()));
        assert!(!buffer.is_multiline());
    }

    #[test]
    fn test_multiline_statement() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(buffer.submit("FOR x IN col"), Submission::Pending);
        assert!(buffer.is_multiline());
        assert_eq!(
            buffer.submit("RETURN x;"),
            Submission::Complete("FOR x IN col\nRETURN x".to_string())
        );
        assert!(!buffer.is_multiline());
        assert!(buffer.pending().is_empty());
    }

    #[test]
    fn test_never_completes_without_terminator() {
        let mut buffer = StatementBuffer::new();
        let lines = ["FOR u IN users", "  FILTER u.active", "  SORT u.name", "  LIMIT 10"];
        for line in lines {
            assert_eq!(buffer.submit(line), Submission::Pending);
        }
        assert_eq!(
            buffer.submit("  RETURN u;"),
            Submission::Complete(
                "FOR u IN users\n  FILTER u.active\n  SORT u.name\n  LIMIT 10\n  RETURN u"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_blank_line_ignored_when_idle() {
        let mut buffer = StatementBuffer::new();
        assert_eq!(buffer.submit("   "), Submission::Ignored);
        assert!(!buffer.is_multiline());
        assert!(buffer.pending().is_empty());
    }

    #[test]
    fn test_blank_line_kept_inside_statement() {
        let mut buffer = StatementBuffer::new();
        buffer.submit("LET a = 1");
        assert_eq!(buffer.submit(""), Submission::Pending);
        assert_eq!(
            buffer.submit("RETURN a;"),
            Submission::Complete("LET a = 1\n\nRETURN a".to_string())
        );
    }

    #[test]
    fn test_reset_discards_pending_text() {
        let mut buffer = StatementBuffer::new();
        buffer.submit("FOR x IN col");
        buffer.reset();
        assert!(!buffer.is_multiline());
        assert_eq!(buffer.submit("RETURN 2;"), Submission::Complete("RETURN 2".to_string()));
    }
}
