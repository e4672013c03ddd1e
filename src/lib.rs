//! # converse-rs
//!
//! Converts a provider-agnostic chat transcript into the message format of the
//! Bedrock Converse API.
//!
//! A transcript is an ordered list of [`Turn`]s: system, user and assistant turns whose
//! content is plain text or a list of [`ContentPart`]s (text and tool calls), with tool
//! results recorded as [`ToolInvocation`]s on the turn that issued the call. The
//! provider wants something stricter: a single system prompt, messages that alternate
//! between `user` and `assistant`, tool results as `user` messages placed right after the
//! tool use, and a conversation that ends on the user side.
//!
//! [`TranscriptConverter`] bridges the two:
//!
//! ```
//! use converse_rs::{ContentPart, ToolInvocation, Turn, convert};
//! use serde_json::json;
//!
//! let turns = vec![
//!     Turn::system("You answer with data."),
//!     Turn::user("What is x?"),
//!     Turn::assistant(vec![ContentPart::tool_call("t1", "lookup", json!({"q": "x"}))])
//!         .with_tool_invocation(ToolInvocation::result("t1", json!({"v": 1}))),
//! ];
//!
//! let result = convert(&turns)?;
//! assert_eq!(result.system(), Some("You answer with data."));
//! assert_eq!(
//!     result.to_json()?["messages"],
//!     json!([
//!         {"role": "user", "content": [{"text": "What is x?"}]},
//!         {"role": "assistant", "content": [
//!             {"toolUse": {"toolUseId": "t1", "name": "lookup", "input": {"q": "x"}}}
//!         ]},
//!         {"role": "user", "content": [
//!             {"toolResult": {"toolUseId": "t1", "content": [{"text": "{\"v\":1}"}]}}
//!         ]}
//!     ])
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Conversion is pure and deterministic. It fails only when the transcript has more than
//! one system turn or does not lead with a user turn; see [`TranscriptViolation`].
//!
//! ## Debugging
//!
//! Set `LOUD_WIRE=1` to have the JSON entry points ([`TranscriptConverter::convert_json`],
//! [`TranscriptConverter::convert_value`]) dump both sides of every conversion to stderr.
//! Diagnostic events go through `tracing`; install a subscriber to see them.

mod converter;
mod errors;
pub mod loud_wire;
mod transcript;
mod wire;

#[cfg(test)]
mod converter_tests;


pub use converter::{
    ConverterBuilder, DEFAULT_ALTERNATION_FILLER, DEFAULT_CONTINUATION_PROMPT,
    ToolResultMatching, TranscriptConverter, convert,
};
pub use errors::{ConverseError, TranscriptViolation};
pub use transcript::{ContentPart, InvocationState, Role, ToolInvocation, Turn, TurnContent};
pub use wire::{ConversionResult, Message, MessageRole, ToolResultContent, WireContent};
