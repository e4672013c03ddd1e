//! Common test utilities shared across integration test files.
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use converse_rs::{ConversionResult, MessageRole, TranscriptConverter, WireContent};
use serde_json::Value;

/// Converts a JSON transcript with the default converter, panicking on failure.
#[allow(dead_code)]
pub fn convert_fixture(transcript: Value) -> Value {
    TranscriptConverter::default()
        .convert_value(transcript)
        .unwrap_or_else(|e| panic!("conversion failed: {e}"))
}

/// Decodes a payload back into the typed result.
#[allow(dead_code)]
pub fn decode_payload(payload: Value) -> ConversionResult {
    serde_json::from_value(payload).expect("payload should decode as ConversionResult")
}

/// Roles of every message in order.
#[allow(dead_code)]
pub fn roles(result: &ConversionResult) -> Vec<MessageRole> {
    result.messages().iter().map(|m| m.role).collect()
}

/// Ids answered by `toolResult` blocks, in order.
#[allow(dead_code)]
pub fn answered_tool_ids(result: &ConversionResult) -> Vec<String> {
    result
        .messages()
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|block| match block {
            WireContent::ToolResult { tool_use_id, .. } => Some(tool_use_id.clone()),
            _ => None,
        })
        .collect()
}
