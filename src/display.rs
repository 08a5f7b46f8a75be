//! Colored CLI display utilities for relayed turns.
//!
//! This module provides functions for printing colored, formatted output
//! to the terminal while a coding-assistant turn streams.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::decode::UsageReport;
use crate::history::{NativeMessage, NativeSession};
use crate::profile::{Detection, ToolProfile};
use crate::stream::ToolCallRecord;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to at most `max_len` characters, adding an ellipsis if
/// truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Truncate from the front, keeping the tail. Suited to file paths where
/// the file name matters most.
#[must_use]
pub fn truncate_start(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let tail: String = s.chars().skip(count - (max_len - 3)).collect();
    format!("...{tail}")
}

/// Print the start of a turn.
pub fn print_turn_start(tool: &str, cwd: &str) {
    println!(
        "{} {} tool={}, cwd={}",
        timestamp().dimmed(),
        "[TURN]".blue().bold(),
        tool.cyan(),
        cwd.dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print the native session id once it is known.
pub fn print_native_session(session_id: &str, raw_mode: bool) {
    println!(
        "\n{} {} native session={}",
        timestamp().dimmed(),
        "[SESSION]".blue().bold(),
        truncate(session_id, 40, raw_mode).dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print text content.
pub fn print_text(text: &str) {
    print!("{text}");
    let _ = io::stdout().flush();
}

/// Print a completed tool call.
pub fn print_tool_call(record: &ToolCallRecord, raw_mode: bool) {
    println!(
        "\n{} {} {}",
        "[TOOL]".cyan().bold(),
        record.name.bold(),
        record.label.dimmed()
    );
    if raw_mode && !record.preview.is_empty() {
        println!("{}", record.preview.dimmed());
    }
    let _ = io::stdout().flush();
}

/// Print token usage.
pub fn print_usage(usage: &UsageReport) {
    println!(
        "\n{} {} in={} out={} cache_write={} cache_read={}",
        timestamp().dimmed(),
        "[USAGE]".magenta().bold(),
        usage.input_tokens,
        usage.output_tokens,
        usage.cache_creation_input_tokens,
        usage.cache_read_input_tokens
    );
    let _ = io::stdout().flush();
}

/// Print the end of a turn.
pub fn print_turn_end(exit_code: i32) {
    let ts = timestamp();
    if exit_code == 0 {
        println!(
            "\n{} {} Turn completed",
            ts.dimmed(),
            "[TURN]".blue().bold()
        );
    } else {
        println!(
            "\n{} {} Turn ended with exit code {}",
            ts.dimmed(),
            "[TURN]".red().bold(),
            exit_code
        );
    }
    let _ = io::stdout().flush();
}

/// Print a cancelled turn.
pub fn print_cancelled() {
    println!(
        "\n{} {} Turn cancelled",
        timestamp().dimmed(),
        "[TURN]".yellow().bold()
    );
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

/// Print one registered tool, with its detection result when available.
pub fn print_tool(profile: &ToolProfile, detection: Option<&Detection>) {
    let status = match detection {
        Some(d) if d.installed => format!("{} {}", "installed".green(), d.version.dimmed()),
        Some(_) => "not installed".red().to_string(),
        None => String::new(),
    };
    println!(
        "{:<12} {:<16} {:<10} {}",
        profile.id.cyan(),
        profile.name,
        profile.command.dimmed(),
        status
    );
    let _ = io::stdout().flush();
}

/// Print one native session list entry.
pub fn print_native_session_entry(session: &NativeSession, raw_mode: bool) {
    println!(
        "{} {} {}",
        session.timestamp.dimmed(),
        session.session_id.cyan(),
        truncate(&session.title, 80, raw_mode)
    );
    let _ = io::stdout().flush();
}

/// Print one message from a native session transcript.
pub fn print_native_message(message: &NativeMessage) {
    let role = format!("[{}]", message.role.as_str().to_uppercase());
    println!("{} {}", role.bold(), message.content);
    let _ = io::stdout().flush();
}
