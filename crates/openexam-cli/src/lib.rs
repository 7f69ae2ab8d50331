use std::fmt::Write;

use chrono::{DateTime, Utc};
use openexam_core::models::FileRecord;
use openexam_core::DateGroups;

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render grouped files as plain-text sections, one line per file.
pub fn render_groups(groups: &DateGroups) -> String {
    if groups.is_empty() {
        return "No files yet.\n".to_string();
    }

    let mut out = String::new();
    for (label, files) in groups.labelled() {
        let _ = writeln!(out, "{} ({})", label, files.len());
        for file in files {
            let _ = writeln!(out, "  {}", render_file(file));
        }
    }
    out
}

fn render_file(file: &FileRecord) -> String {
    let category = file.category().map(|c| c.as_str()).unwrap_or("unknown");
    let status = if file.is_placeholder() { " (pending)" } else { "" };
    format!(
        "{:<40} {:<12} {} {}{}",
        truncate_string(&file.name, 40),
        category,
        format_timestamp(&file.created_at),
        file.key,
        status
    )
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

/// Initialize tracing for the CLI. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,openexam=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
