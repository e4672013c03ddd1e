//! Wire-level debugging via the `LOUD_WIRE` environment variable.
//!
//! When `LOUD_WIRE` is set to any value, the JSON entry points of
//! [`crate::TranscriptConverter`] print the incoming transcript and the outgoing
//! Converse payload to stderr with pretty formatting and colors.
//!
//! # Usage
//!
//! ```bash
//! LOUD_WIRE=1 cargo run --example convert_transcript
//! ```
//!
//! # Output Format
//!
//! - Green `>>>` for the transcript handed in
//! - Red `<<<` for the payload handed back
//! - Yellow `!!!` for rejected transcripts
//! - Timestamps and conversion ids for correlation
//!
//! Tool result text is truncated to keep output readable; it is usually a JSON blob.

use colored::Colorize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ConverseError;

/// Conversion counter for correlating transcripts with payloads
static CONVERSION_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Cached check for whether LOUD_WIRE is enabled
static ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if LOUD_WIRE debugging is enabled.
///
/// The result is cached after the first check, so `LOUD_WIRE` must be set before
/// the first conversion runs.
#[must_use]
pub fn is_enabled() -> bool {
    *ENABLED.get_or_init(|| std::env::var("LOUD_WIRE").is_ok())
}

/// Get the next conversion id.
#[must_use]
pub fn next_conversion_id() -> usize {
    CONVERSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Maximum length of a tool result text before truncation.
const TRUNCATE_THRESHOLD: usize = 200;

/// Truncate long `text` entries inside `toolResult` blocks.
///
/// Conversation text outside tool results is left alone.
fn truncate_tool_results(value: &mut serde_json::Value, inside_tool_result: bool) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if inside_tool_result && key == "text" {
                    if let serde_json::Value::String(s) = val
                        && s.chars().count() > TRUNCATE_THRESHOLD
                    {
                        let kept: String = s.chars().take(TRUNCATE_THRESHOLD).collect();
                        *s = format!("{kept}...");
                    }
                } else {
                    truncate_tool_results(val, inside_tool_result || key == "toolResult");
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                truncate_tool_results(item, inside_tool_result);
            }
        }
        _ => {}
    }
}

/// Format the current UTC timestamp for log output.
fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Log prefix with timestamp and conversion id.
fn prefix(conversion_id: usize) -> String {
    let ts = timestamp().dimmed();
    format!(
        "{} {} {}",
        "[LOUD_WIRE]".bold(),
        ts,
        format!("[CONV#{}]", conversion_id).cyan()
    )
}

fn print_json(prefix: &str, value: &serde_json::Value) {
    if let Ok(colored) = colored_json::to_colored_json_auto(value) {
        for line in colored.lines() {
            eprintln!("{prefix} {line}");
        }
    } else if let Ok(pretty) = serde_json::to_string_pretty(value) {
        for line in pretty.lines() {
            eprintln!("{prefix} {line}");
        }
    }
}

/// Log the transcript handed to the converter.
pub fn log_transcript(conversion_id: usize, transcript: &serde_json::Value) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(conversion_id);
    let turns = transcript.as_array().map_or(0, Vec::len);
    eprintln!(
        "{prefix} {} {} ({turns} turns)",
        ">>>".green().bold(),
        "Transcript".green()
    );
    print_json(&prefix, transcript);
}

/// Log the Converse payload produced by the converter.
pub fn log_payload(conversion_id: usize, payload: &serde_json::Value) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(conversion_id);
    let messages = payload
        .get("messages")
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len);
    eprintln!(
        "{prefix} {} {} ({messages} messages)",
        "<<<".red().bold(),
        "Payload".red()
    );

    let mut shown = payload.clone();
    truncate_tool_results(&mut shown, false);
    print_json(&prefix, &shown);
}

/// Log a transcript the converter refused.
pub fn log_rejection(conversion_id: usize, error: &ConverseError) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(conversion_id);
    eprintln!("{prefix} {} {}", "!!!".yellow().bold(), error.to_string().yellow());
}
