//! Bedrock Converse wire types.
//!
//! These are the shapes the provider accepts: messages that strictly alternate between
//! `user` and `assistant`, each holding a list of single-key content blocks
//! (`{"text": ...}`, `{"toolUse": {...}}`, `{"toolResult": {...}}`).
//!
//! Tool results travel as `user` messages. That is a provider convention, and it is
//! confined to [`Message::tool_result`]; nothing upstream of this module assumes it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Role of a wire message. The provider accepts exactly these two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A content block inside a tool result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ToolResultContent {
    #[serde(rename = "text")]
    Text(String),
}

/// A content block of a wire message.
///
/// Serializes as an externally tagged single-key object, matching the Converse API:
///
/// ```
/// use converse_rs::WireContent;
/// use serde_json::json;
///
/// let block = WireContent::tool_use("t1", "lookup", json!({"q": "x"}));
/// assert_eq!(
///     serde_json::to_value(&block).unwrap(),
///     json!({"toolUse": {"toolUseId": "t1", "name": "lookup", "input": {"q": "x"}}})
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WireContent {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "toolUse", rename_all = "camelCase")]
    ToolUse {
        tool_use_id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "toolResult", rename_all = "camelCase")]
    ToolResult {
        tool_use_id: String,
        content: Vec<ToolResultContent>,
    },
}

impl WireContent {
    /// Builds a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Builds a tool use block.
    pub fn tool_use(tool_use_id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse {
            tool_use_id: tool_use_id.into(),
            name: name.into(),
            input,
        }
    }

    /// Builds a tool result block whose single text entry is the compact JSON
    /// encoding of `result`.
    pub fn tool_result(tool_use_id: impl Into<String>, result: &Value) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: vec![ToolResultContent::Text(result.to_string())],
        }
    }

    /// Returns the text if this is a `Text` block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse { .. })
    }

    #[must_use]
    pub const fn is_tool_result(&self) -> bool {
        matches!(self, Self::ToolResult { .. })
    }
}

/// One message of the converted conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<WireContent>,
}

impl Message {
    /// Creates a message from its role and content blocks.
    pub fn new(role: MessageRole, content: Vec<WireContent>) -> Self {
        Self { role, content }
    }

    /// A message holding a single text block.
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self::new(role, vec![WireContent::text(text)])
    }

    /// A message answering `tool_use_id` with `result`.
    ///
    /// The Converse API expects tool results from the user side of the conversation.
    pub fn tool_result(tool_use_id: impl Into<String>, result: &Value) -> Self {
        Self::new(
            MessageRole::User,
            vec![WireContent::tool_result(tool_use_id, result)],
        )
    }

    /// Joins the message's text blocks with newlines.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(WireContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The converted payload: an optional system prompt and the message list.
///
/// Serializes to `{"system": ..., "messages": [...]}` with `system` always present
/// (explicit `null` when the transcript had no system turn).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

impl ConversionResult {
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Ids of every `toolUse` block, in message order.
    #[must_use]
    pub fn tool_use_ids(&self) -> Vec<&str> {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|block| match block {
                WireContent::ToolUse { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Encodes the payload as a JSON value ready to send as the request body.
    ///
    /// # Errors
    ///
    /// Returns an error only if a tool input holds a value serde_json refuses to encode.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
