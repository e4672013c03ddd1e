//! Input transcript types.
//!
//! This module contains [`Turn`], the unit of the provider-agnostic chat transcript, along
//! with [`ContentPart`] and [`ToolInvocation`]. Decoding is lenient: content part shapes
//! this crate doesn't recognize are captured in [`ContentPart::Unknown`] rather than
//! failing, so transcripts written by newer versions of the host application still load.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Role
// =============================================================================

/// Role of a transcript turn.
///
/// Tool results are not a role of their own: they ride on the turn that produced the
/// tool call (see [`Turn::tool_invocations`]). Any role string other than the three
/// below is rejected during decoding, since the provider has nowhere to put it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model; at most one per transcript.
    System,
    /// Content from the user
    User,
    /// Content from the model
    Assistant,
}

impl Role {
    /// Returns `true` for [`Role::System`].
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

// =============================================================================
// Content Parts
// =============================================================================

/// One semantic unit of a turn's content.
///
/// # Wire Format
///
/// | Variant    | JSON                                                                 |
/// |------------|----------------------------------------------------------------------|
/// | `Text`     | `"hello"` or `{"type": "text", "text": "hello"}`                     |
/// | `ToolCall` | `{"type": "tool-call", "toolCallId": "...", "toolName": "...", "args": {...}}` |
/// | `Unknown`  | anything else, preserved verbatim                                    |
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]`. When a transcript contains a part this
/// library doesn't recognize (an image, a reasoning block, a typo in `type`), it is
/// captured as `ContentPart::Unknown` instead of causing a deserialization error. The
/// converter drops unknown parts and keeps going.
///
/// Enable the `strict-unknown` feature to turn unknown parts into decoding errors.
///
/// # Example
///
/// ```
/// use converse_rs::ContentPart;
/// use serde_json::json;
///
/// let part: ContentPart = serde_json::from_value(json!({"type": "image", "url": "x"})).unwrap();
/// assert!(part.is_unknown());
/// assert_eq!(part.unknown_part_type(), Some("image"));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ContentPart {
    /// Plain text.
    Text { text: String },
    /// A tool invocation requested by the assistant.
    ToolCall {
        /// Identifier the matching [`ToolInvocation`] refers back to
        tool_call_id: String,
        tool_name: String,
        /// Arbitrary JSON arguments; `null` when absent.
        args: Value,
    },
    /// Unrecognized part, kept for debugging and roundtrip serialization.
    Unknown {
        /// The `type` string, or `"<missing type>"`
        part_type: String,
        /// The raw JSON value
        data: Value,
    },
}

impl ContentPart {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a tool call part.
    ///
    /// # Example
    ///
    /// ```
    /// use converse_rs::ContentPart;
    /// use serde_json::json;
    ///
    /// let part = ContentPart::tool_call("t1", "lookup", json!({"q": "x"}));
    /// assert_eq!(part.tool_call_id(), Some("t1"));
    /// ```
    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Self::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
        }
    }

    /// Returns the text if this is a `Text` part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns the call id if this is a `ToolCall` part.
    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCall { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Check if this is an unknown part.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Returns the part type name if this is an unknown part.
    #[must_use]
    pub fn unknown_part_type(&self) -> Option<&str> {
        match self {
            Self::Unknown { part_type, .. } => Some(part_type),
            _ => None,
        }
    }

    /// Returns the raw JSON data if this is an unknown part.
    #[must_use]
    pub fn unknown_data(&self) -> Option<&Value> {
        match self {
            Self::Unknown { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl From<&str> for ContentPart {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for ContentPart {
    fn from(text: String) -> Self {
        Self::Text { text }
    }
}

impl Serialize for ContentPart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            Self::Text { text } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "text")?;
                map.serialize_entry("text", text)?;
                map.end()
            }
            Self::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("type", "tool-call")?;
                map.serialize_entry("toolCallId", tool_call_id)?;
                map.serialize_entry("toolName", tool_name)?;
                map.serialize_entry("args", args)?;
                map.end()
            }
            Self::Unknown { data, .. } => data.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContentPart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[cfg(feature = "strict-unknown")]
        use serde::de::Error as _;

        let value = Value::deserialize(deserializer)?;

        // Bare strings are shorthand for text parts
        if let Value::String(text) = value {
            return Ok(Self::Text { text });
        }

        #[derive(Deserialize)]
        #[serde(tag = "type")]
        enum KnownPart {
            #[serde(rename = "text")]
            Text { text: String },
            #[serde(rename = "tool-call", rename_all = "camelCase")]
            ToolCall {
                tool_call_id: String,
                tool_name: String,
                #[serde(default)]
                args: Value,
            },
        }

        match serde_json::from_value::<KnownPart>(value.clone()) {
            Ok(KnownPart::Text { text }) => Ok(Self::Text { text }),
            Ok(KnownPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            }) => Ok(Self::ToolCall {
                tool_call_id,
                tool_name,
                args,
            }),
            Err(parse_error) => {
                let part_type = value
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("<missing type>")
                    .to_string();

                // The parse error tells a malformed known part apart from a new type
                tracing::warn!(
                    "Encountered unknown ContentPart type '{}'. Parse error: {}. \
                     The part will be preserved in the Unknown variant.",
                    part_type,
                    parse_error
                );

                #[cfg(feature = "strict-unknown")]
                {
                    Err(D::Error::custom(format!(
                        "Unknown ContentPart type '{}'. \
                         Strict mode is enabled via the 'strict-unknown' feature flag.",
                        part_type
                    )))
                }

                #[cfg(not(feature = "strict-unknown"))]
                {
                    Ok(Self::Unknown {
                        part_type,
                        data: value,
                    })
                }
            }
        }
    }
}

// =============================================================================
// Turn Content
// =============================================================================

/// Content of a turn: a plain string or an ordered list of parts.
///
/// A missing or `null` `content` field decodes as empty `Parts`; the turn is still
/// emitted by the converter, just with no content blocks.
///
/// # Example
///
/// ```
/// use converse_rs::TurnContent;
///
/// let content: TurnContent = "Hello!".into();
/// assert_eq!(content.text(), Some("Hello!"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Simple text content
    Text(String),
    /// Ordered content parts
    Parts(Vec<ContentPart>),
}

impl Default for TurnContent {
    fn default() -> Self {
        Self::Parts(Vec::new())
    }
}

impl From<String> for TurnContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for TurnContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<ContentPart>> for TurnContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        Self::Parts(parts)
    }
}

impl TurnContent {
    /// Returns the text content if this is a `Text` variant.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Parts(_) => None,
        }
    }

    /// Returns the content parts if this is a `Parts` variant.
    #[must_use]
    pub fn parts(&self) -> Option<&[ContentPart]> {
        match self {
            Self::Parts(p) => Some(p),
            Self::Text(_) => None,
        }
    }

    /// Flattens the content to a single string.
    ///
    /// Plain text is returned as-is; parts contribute their text pieces joined with
    /// newlines, and everything else is skipped.
    #[must_use]
    pub fn flatten_text(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(ContentPart::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl<'de> Deserialize<'de> for TurnContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(D::Error::custom))
                .collect::<Result<Vec<ContentPart>, _>>()
                .map(Self::Parts),
            Value::Null => Ok(Self::default()),
            other => {
                tracing::warn!(
                    "Turn content is neither a string nor an array ({}). Treating as empty.",
                    other
                );
                Ok(Self::default())
            }
        }
    }
}

// =============================================================================
// Tool Invocations
// =============================================================================

/// Lifecycle state of a tool invocation.
///
/// Only [`InvocationState::Result`] invocations are spliced into the converted
/// conversation; the others are ignored.
///
/// Unrecognized state strings deserialize into `Unknown` (unless `strict-unknown`
/// is enabled), preserving the original value for roundtrip serialization.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum InvocationState {
    /// Arguments are still streaming in
    PartialCall,
    /// The call has been issued but has no result yet
    Call,
    /// The tool ran and `result` is populated
    Result,
    /// Unknown state (for forward compatibility).
    Unknown {
        /// The unrecognized state string
        state_type: String,
        /// The raw JSON value
        data: Value,
    },
}

impl InvocationState {
    fn missing() -> Self {
        Self::Unknown {
            state_type: "<missing state>".to_string(),
            data: Value::Null,
        }
    }

    /// Check if this is an unknown state.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Returns the state type name if this is an unknown state.
    #[must_use]
    pub fn unknown_state_type(&self) -> Option<&str> {
        match self {
            Self::Unknown { state_type, .. } => Some(state_type),
            _ => None,
        }
    }
}

impl Serialize for InvocationState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::PartialCall => serializer.serialize_str("partial-call"),
            Self::Call => serializer.serialize_str("call"),
            Self::Result => serializer.serialize_str("result"),
            Self::Unknown { data, .. } => data.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for InvocationState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[cfg(feature = "strict-unknown")]
        use serde::de::Error as _;

        let value = Value::deserialize(deserializer)?;

        let state_type = match value.as_str() {
            Some("partial-call") => return Ok(Self::PartialCall),
            Some("call") => return Ok(Self::Call),
            Some("result") => return Ok(Self::Result),
            Some(other) => other.to_string(),
            None => format!("<non-string: {}>", value),
        };

        tracing::warn!(
            "Encountered unknown InvocationState '{}'. \
             The state will be preserved in the Unknown variant.",
            state_type
        );

        #[cfg(feature = "strict-unknown")]
        {
            Err(D::Error::custom(format!(
                "Unknown InvocationState '{}'. \
                 Strict mode is enabled via the 'strict-unknown' feature flag.",
                state_type
            )))
        }

        #[cfg(not(feature = "strict-unknown"))]
        {
            Ok(Self::Unknown {
                state_type,
                data: value,
            })
        }
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartialCall => write!(f, "partial-call"),
            Self::Call => write!(f, "call"),
            Self::Result => write!(f, "result"),
            Self::Unknown { state_type, .. } => write!(f, "{}", state_type),
        }
    }
}

/// A tool invocation recorded on the turn that issued it.
///
/// # Example
///
/// ```
/// use converse_rs::ToolInvocation;
/// use serde_json::json;
///
/// let done = ToolInvocation::result("t1", json!({"v": 1}));
/// assert!(done.is_result());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    /// The id of the [`ContentPart::ToolCall`] this invocation belongs to
    pub tool_call_id: String,
    /// Missing on some stored entries; those decode as an unknown state and are ignored
    #[serde(default = "InvocationState::missing")]
    pub state: InvocationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Tool output; `null` until the state reaches `result`
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,
}

impl ToolInvocation {
    /// Creates a finished invocation carrying `result`.
    pub fn result(tool_call_id: impl Into<String>, result: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            state: InvocationState::Result,
            tool_name: None,
            args: None,
            result,
        }
    }

    /// Creates an invocation that has been issued but not yet answered.
    pub fn call(tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            state: InvocationState::Call,
            tool_name: None,
            args: None,
            result: Value::Null,
        }
    }

    /// Sets the tool name.
    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    /// Returns `true` if the tool has produced its result.
    #[must_use]
    pub const fn is_result(&self) -> bool {
        matches!(self.state, InvocationState::Result)
    }
}

// =============================================================================
// Turn
// =============================================================================

/// A single entry in the conversation transcript.
///
/// # Example
///
/// ```
/// use converse_rs::{ContentPart, Role, ToolInvocation, Turn};
/// use serde_json::json;
///
/// let turns = vec![
///     Turn::system("You are terse."),
///     Turn::user("Look up x"),
///     Turn::assistant(vec![ContentPart::tool_call("t1", "lookup", json!({"q": "x"}))])
///         .with_tool_invocation(ToolInvocation::result("t1", json!({"v": 1}))),
/// ];
/// assert_eq!(turns[1].role(), Role::User);
/// assert_eq!(turns[1].text(), Some("Look up x"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    #[serde(default)]
    content: TurnContent,
    #[serde(
        rename = "toolInvocations",
        default,
        deserialize_with = "deserialize_tool_invocations",
        skip_serializing_if = "Option::is_none"
    )]
    tool_invocations: Option<Vec<ToolInvocation>>,
}

/// Decodes `toolInvocations` entry by entry, skipping entries that don't decode.
///
/// With `strict-unknown` enabled a bad entry fails the whole turn instead.
fn deserialize_tool_invocations<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<ToolInvocation>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[cfg(feature = "strict-unknown")]
    use serde::de::Error as _;

    let entries = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            tracing::warn!(
                "toolInvocations is not an array ({}). Treating as absent.",
                other
            );
            return Ok(None);
        }
    };

    let mut invocations = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<ToolInvocation>(entry) {
            Ok(invocation) => invocations.push(invocation),
            #[cfg(feature = "strict-unknown")]
            Err(err) => return Err(D::Error::custom(err)),
            #[cfg(not(feature = "strict-unknown"))]
            Err(err) => {
                tracing::warn!("Skipping malformed tool invocation: {}", err);
            }
        }
    }
    Ok(Some(invocations))
}

impl Turn {
    /// Creates a new turn with the given role and content.
    pub fn new(role: Role, content: impl Into<TurnContent>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_invocations: None,
        }
    }

    /// Creates a system turn.
    pub fn system(content: impl Into<TurnContent>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user turn.
    pub fn user(content: impl Into<TurnContent>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<TurnContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Replaces the tool invocations carried by this turn.
    #[must_use]
    pub fn with_tool_invocations(mut self, invocations: Vec<ToolInvocation>) -> Self {
        self.tool_invocations = Some(invocations);
        self
    }

    /// Appends a single tool invocation.
    #[must_use]
    pub fn with_tool_invocation(mut self, invocation: ToolInvocation) -> Self {
        self.tool_invocations
            .get_or_insert_with(Vec::new)
            .push(invocation);
        self
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &TurnContent {
        &self.content
    }

    /// Tool invocations, or an empty slice when the turn carries none.
    #[must_use]
    pub fn tool_invocations(&self) -> &[ToolInvocation] {
        self.tool_invocations.as_deref().unwrap_or_default()
    }

    /// Returns the text content if this turn holds plain text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.text()
    }
}
