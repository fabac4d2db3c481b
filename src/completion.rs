//! Tab completion for slash commands, AQL keywords and known names

use crate::commands::{CONTROL_PREFIX, CommandShortcut, get_command_names};
use reedline::{Completer, Span, Suggestion};
use std::sync::{Arc, Mutex};
use strum::IntoEnumIterator;
use tracing::debug;

const AQL_KEYWORDS: &[&str] = &[
    "FOR", "IN", "RETURN", "FILTER", "SORT", "LIMIT", "LET", "COLLECT", "INTO", "INSERT",
    "UPDATE", "REPLACE", "REMOVE", "UPSERT", "WITH", "AGGREGATE", "DISTINCT", "ASC", "DESC",
    "AND", "OR", "NOT", "LIKE", "NULL", "TRUE", "FALSE", "OUTBOUND", "INBOUND", "ANY", "GRAPH",
    "SHORTEST_PATH", "OPTIONS", "PRUNE", "SEARCH", "WINDOW", "KEEP", "COUNT",
];

const AQL_FUNCTIONS: &[&str] = &[
    "DOCUMENT", "LENGTH", "SUM", "MIN", "MAX", "AVERAGE", "CONCAT", "UPPER", "LOWER",
    "CONTAINS", "HAS", "MERGE", "UNSET", "ATTRIBUTES", "VALUES", "FIRST", "LAST", "UNIQUE",
    "PUSH", "APPEND", "DATE_NOW", "DATE_ISO8601", "TO_NUMBER", "TO_STRING", "IS_NULL",
];

const RESERVED_WORDS: &[&str] = &["exit", "quit", "help"];

/// Names known about the active connection, refreshed by the shell loop
#[derive(Debug, Clone, Default)]
pub struct CompletionCatalog {
    pub config_names: Vec<String>,
    pub databases: Vec<String>,
    pub collections: Vec<String>,
}

pub struct ShellCompleter {
    catalog: Arc<Mutex<CompletionCatalog>>,
}

impl ShellCompleter {
    pub fn new(catalog: Arc<Mutex<CompletionCatalog>>) -> Self {
        Self { catalog }
    }

    fn catalog(&self) -> CompletionCatalog {
        self.catalog
            .lock()
            .map(|catalog| catalog.clone())
            .unwrap_or_default()
    }

    /// Complete the command word itself, which may contain a space (`/show databases`)
    fn complete_command(&self, typed: &str, start: usize, pos: usize) -> Vec<Suggestion> {
        let typed = typed.to_lowercase();
        let mut suggestions: Vec<Suggestion> = CommandShortcut::iter()
            .flat_map(|shortcut| {
                std::iter::once(shortcut.command())
                    .chain(shortcut.alias())
                    .map(move |spelling| (spelling, shortcut))
            })
            .filter(|(spelling, _)| spelling.starts_with(&typed))
            .map(|(spelling, shortcut)| Suggestion {
                value: spelling.to_string(),
                description: Some(shortcut.description().to_string()),
                span: Span { start, end: pos },
                append_whitespace: shortcut.takes_argument(),
                ..Default::default()
            })
            .collect();
        suggestions.sort_by(|a, b| a.value.cmp(&b.value));
        suggestions
    }

    fn complete_names(names: &[String], word: &str, span: Span, description: &str) -> Vec<Suggestion> {
        names
            .iter()
            .filter(|name| name.starts_with(word))
            .map(|name| Suggestion {
                value: name.clone(),
                description: Some(description.to_string()),
                span,
                append_whitespace: false,
                ..Default::default()
            })
            .collect()
    }

    fn complete_query(&self, line: &str, word: &str, span: Span) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();
        let upper = word.to_uppercase();

        if line[..span.start].trim().is_empty() {
            for reserved in RESERVED_WORDS {
                if reserved.starts_with(&word.to_lowercase()) {
                    suggestions.push(Suggestion {
                        value: reserved.to_string(),
                        description: Some("Shell command".to_string()),
                        span,
                        append_whitespace: false,
                        ..Default::default()
                    });
                }
            }
        }

        for keyword in AQL_KEYWORDS {
            if keyword.starts_with(&upper) {
                suggestions.push(Suggestion {
                    value: keyword.to_string(),
                    description: Some("AQL keyword".to_string()),
                    span,
                    append_whitespace: true,
                    ..Default::default()
                });
            }
        }

        for function in AQL_FUNCTIONS {
            if function.starts_with(&upper) {
                suggestions.push(Suggestion {
                    value: format!("{function}("),
                    description: Some("AQL function".to_string()),
                    span,
                    append_whitespace: false,
                    ..Default::default()
                });
            }
        }

        suggestions.extend(Self::complete_names(
            &self.catalog().collections,
            word,
            span,
            "Collection",
        ));
        suggestions
    }
}

impl Completer for ShellCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let pos = pos.min(line.len());
        let before = &line[..pos];
        let word_start = before
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let word = &before[word_start..];
        let span = Span {
            start: word_start,
            end: pos,
        };

        let leading = before.len() - before.trim_start().len();
        let typed = &before[leading..];

        if typed.starts_with(CONTROL_PREFIX) {
            let catalog = self.catalog();
            let lowered = typed.to_lowercase();

            if lowered.starts_with("/switch ") {
                return Self::complete_names(&catalog.config_names, word, span, "Configuration");
            }
            if lowered.starts_with("/use ") {
                return Self::complete_names(&catalog.databases, word, span, "Database");
            }
            // Still typing the command, possibly its second word
            if get_command_names().iter().any(|name| name.starts_with(&lowered)) {
                return self.complete_command(typed, leading, pos);
            }
            return Vec::new();
        }

        if word.is_empty() {
            return Vec::new();
        }

        debug!("Completing '{word}' at {pos}");
        self.complete_query(line, word, span)
    }
}
