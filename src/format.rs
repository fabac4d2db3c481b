use crate::database::{QueryResult, QueryStatistics};
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::time::Duration;

const INDENT: &str = "   ";
const BYTE_UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

/// Render a query result as the report shown in the result viewer
pub fn format_query_result(result: &QueryResult) -> String {
    let mut report = String::from("📊 Results:\n\n");

    if result.documents.is_empty() {
        report.push_str("(no documents)\n");
    }
    for document in &result.documents {
        report.push_str(&format_document(document));
        report.push('\n');
    }

    report.push_str("\n📈 Statistics:\n");
    for line in statistics_lines(&result.statistics) {
        report.push_str(&line);
        report.push('\n');
    }

    report
}

/// Structured values are pretty-printed and indented; scalars use their plain text form
pub fn format_document(document: &JsonValue) -> String {
    match document {
        JsonValue::Object(_) | JsonValue::Array(_) => {
            let pretty = pretty_json(document);
            let indented: Vec<String> = pretty.lines().map(|line| format!("{INDENT}{line}")).collect();
            format!("\n{}", indented.join("\n"))
        }
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn pretty_json(value: &JsonValue) -> String {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(INDENT.as_bytes());
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);

    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(buffer).unwrap_or_else(|_| value.to_string())
}

/// One line per reported statistic; unreported ones are left out
fn statistics_lines(stats: &QueryStatistics) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(elapsed) = stats.execution_time {
        lines.push(format!("⏱️ Execution time: {}", format_duration(elapsed)));
    }
    if let Some(server_time) = stats.server_execution_time {
        lines.push(format!("🖥️ Server execution time: {}", format_duration(server_time)));
    }
    if let Some(scanned) = stats.documents_scanned {
        lines.push(format!("📄 Documents read: {scanned}"));
    }
    if let Some(written) = stats.documents_written {
        lines.push(format!("✏️ Documents written: {written}"));
    }
    if let Some(peak) = stats.peak_memory_bytes {
        lines.push(format!("💾 Peak memory: {}", format_bytes(peak)));
    }

    lines
}

/// Binary-prefixed size: whole bytes below 1 KB, one decimal above
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut divisor = UNIT;
    let mut exponent = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exponent < BYTE_UNITS.len() - 1 {
        divisor *= UNIT;
        exponent += 1;
        n /= UNIT;
    }

    format!(
        "{:.1} {}B",
        bytes as f64 / divisor as f64,
        BYTE_UNITS[exponent]
    )
}

pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    if micros < 1_000 {
        format!("{micros}µs")
    } else if micros < 1_000_000 {
        format!("{:.3}ms", duration.as_secs_f64() * 1_000.0)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
