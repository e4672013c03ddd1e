//! Transcript to Converse message conversion.
//!
//! [`TranscriptConverter::convert`] runs three passes over the transcript:
//!
//! 1. **Leading-role check**: the first non-system turn must be a user turn.
//! 2. **System extraction**: at most one system turn, lifted into
//!    [`ConversionResult::system`].
//! 3. **Message assembly**: non-system turns are emitted in order, with a filler
//!    assistant message between back-to-back user turns, tool results spliced in
//!    right after the turn that carries them, and a continuation prompt appended if
//!    the conversation would otherwise end on the assistant.
//!
//! The two checks fail the whole call; everything else (unknown parts, orphaned tool
//! results) is absorbed silently.

use serde_json::Value;

use crate::errors::{ConverseError, TranscriptViolation};
use crate::loud_wire;
use crate::transcript::{ContentPart, Role, Turn, TurnContent};
use crate::wire::{ConversionResult, Message, MessageRole, WireContent};

/// Assistant text inserted between two consecutive user messages.
pub const DEFAULT_ALTERNATION_FILLER: &str = "I understand.";

/// User text appended when the conversation ends on an assistant message.
pub const DEFAULT_CONTINUATION_PROMPT: &str = "Continue.";

/// How tool results are matched against outstanding tool calls.
///
/// # Example
///
/// ```
/// use converse_rs::{ContentPart, ToolInvocation, ToolResultMatching, TranscriptConverter, Turn};
/// use serde_json::json;
///
/// let turns = vec![
///     Turn::user("compare a and b"),
///     Turn::assistant(vec![
///         ContentPart::tool_call("a", "fetch", json!({})),
///         ContentPart::tool_call("b", "fetch", json!({})),
///     ])
///     .with_tool_invocation(ToolInvocation::result("a", json!(1)))
///     .with_tool_invocation(ToolInvocation::result("b", json!(2))),
/// ];
///
/// // Default: only the last call in the turn ("b") is answered.
/// let strict = TranscriptConverter::default().convert(&turns).unwrap();
/// assert_eq!(strict.messages().len(), 3);
///
/// // AllPending answers both.
/// let all = TranscriptConverter::builder()
///     .tool_result_matching(ToolResultMatching::AllPending)
///     .build()
///     .convert(&turns)
///     .unwrap();
/// assert_eq!(all.messages().len(), 4);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ToolResultMatching {
    /// Track only the most recent tool call. A later call overwrites an earlier
    /// one, even within the same turn, and results for overwritten calls are
    /// ignored.
    #[default]
    MostRecent,
    /// Track every tool call that has not been answered yet.
    AllPending,
}

/// Outstanding tool-use ids during message assembly.
#[derive(Debug)]
enum PendingToolUses {
    MostRecent(Option<String>),
    AllPending(Vec<String>),
}

impl PendingToolUses {
    fn new(matching: ToolResultMatching) -> Self {
        match matching {
            ToolResultMatching::MostRecent => Self::MostRecent(None),
            ToolResultMatching::AllPending => Self::AllPending(Vec::new()),
        }
    }

    fn record(&mut self, tool_call_id: &str) {
        match self {
            Self::MostRecent(pending) => *pending = Some(tool_call_id.to_string()),
            Self::AllPending(pending) => {
                if !pending.iter().any(|id| id == tool_call_id) {
                    pending.push(tool_call_id.to_string());
                }
            }
        }
    }

    /// Removes `tool_call_id` from the outstanding set, returning whether it was there.
    fn take(&mut self, tool_call_id: &str) -> bool {
        match self {
            Self::MostRecent(pending) => {
                if pending.as_deref() == Some(tool_call_id) {
                    *pending = None;
                    true
                } else {
                    false
                }
            }
            Self::AllPending(pending) => match pending.iter().position(|id| id == tool_call_id) {
                Some(index) => {
                    pending.remove(index);
                    true
                }
                None => false,
            },
        }
    }
}

/// Converts transcripts into Bedrock Converse payloads.
///
/// The converter is immutable and holds no per-call state, so a single instance can
/// be shared across threads.
///
/// # Example
///
/// ```
/// use converse_rs::{MessageRole, TranscriptConverter, Turn};
///
/// let converter = TranscriptConverter::default();
/// let result = converter
///     .convert(&[Turn::system("Be brief."), Turn::user("hi"), Turn::assistant("hello")])
///     .unwrap();
///
/// assert_eq!(result.system(), Some("Be brief."));
/// // The conversation must end on the user side, so "Continue." is appended.
/// let last = result.last_message().unwrap();
/// assert_eq!(last.role, MessageRole::User);
/// assert_eq!(last.joined_text(), "Continue.");
/// ```
#[derive(Clone, Debug)]
pub struct TranscriptConverter {
    alternation_filler: String,
    continuation_prompt: String,
    tool_result_matching: ToolResultMatching,
}

impl Default for TranscriptConverter {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for `TranscriptConverter` instances.
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    alternation_filler: Option<String>,
    continuation_prompt: Option<String>,
    tool_result_matching: Option<ToolResultMatching>,
}

impl ConverterBuilder {
    /// Sets the assistant text inserted between consecutive user messages.
    /// If not called, defaults to [`DEFAULT_ALTERNATION_FILLER`].
    #[must_use]
    pub fn alternation_filler(mut self, text: impl Into<String>) -> Self {
        self.alternation_filler = Some(text.into());
        self
    }

    /// Sets the user text appended when the conversation ends on the assistant.
    /// If not called, defaults to [`DEFAULT_CONTINUATION_PROMPT`].
    #[must_use]
    pub fn continuation_prompt(mut self, text: impl Into<String>) -> Self {
        self.continuation_prompt = Some(text.into());
        self
    }

    /// Sets the tool result matching policy.
    /// If not called, defaults to [`ToolResultMatching::MostRecent`].
    #[must_use]
    pub const fn tool_result_matching(mut self, matching: ToolResultMatching) -> Self {
        self.tool_result_matching = Some(matching);
        self
    }

    /// Builds the `TranscriptConverter`.
    #[must_use]
    pub fn build(self) -> TranscriptConverter {
        TranscriptConverter {
            alternation_filler: self
                .alternation_filler
                .unwrap_or_else(|| DEFAULT_ALTERNATION_FILLER.to_string()),
            continuation_prompt: self
                .continuation_prompt
                .unwrap_or_else(|| DEFAULT_CONTINUATION_PROMPT.to_string()),
            tool_result_matching: self.tool_result_matching.unwrap_or_default(),
        }
    }
}

impl TranscriptConverter {
    /// Creates a builder with every option at its default.
    #[must_use]
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    /// Returns the configured tool result matching policy.
    #[must_use]
    pub const fn tool_result_matching_policy(&self) -> ToolResultMatching {
        self.tool_result_matching
    }

    /// Converts `turns` into a Converse payload.
    ///
    /// # Errors
    ///
    /// Returns [`ConverseError::InvalidTranscript`] when no user turn leads the
    /// conversation (after any system turns) or when more than one system turn is
    /// present. The leading-role check runs first.
    pub fn convert(&self, turns: &[Turn]) -> Result<ConversionResult, ConverseError> {
        tracing::debug!(turns = turns.len(), "Converting transcript to Converse messages");

        check_leading_user(turns)?;
        let system = extract_system(turns)?;

        let mut messages: Vec<Message> = Vec::with_capacity(turns.len() + 1);
        let mut last_role: Option<MessageRole> = None;
        let mut pending = PendingToolUses::new(self.tool_result_matching);

        for (turn, role) in turns
            .iter()
            .filter_map(|turn| message_role(turn.role()).map(|role| (turn, role)))
        {
            let content = normalize_content(turn.content(), &mut pending);

            if role == MessageRole::User && last_role == Some(MessageRole::User) {
                tracing::debug!("Inserting assistant filler between consecutive user messages");
                messages.push(Message::text(
                    MessageRole::Assistant,
                    self.alternation_filler.as_str(),
                ));
            }

            messages.push(Message::new(role, content));
            last_role = Some(role);

            for invocation in turn.tool_invocations() {
                if invocation.is_result() && pending.take(&invocation.tool_call_id) {
                    messages.push(Message::tool_result(
                        invocation.tool_call_id.as_str(),
                        &invocation.result,
                    ));
                    last_role = Some(MessageRole::User);
                } else {
                    tracing::debug!(
                        tool_call_id = %invocation.tool_call_id,
                        state = %invocation.state,
                        "Ignoring tool invocation with no pending tool use"
                    );
                }
            }
        }

        if messages
            .last()
            .is_some_and(|message| message.role != MessageRole::User)
        {
            tracing::debug!("Conversation ends on assistant; appending continuation prompt");
            messages.push(Message::text(
                MessageRole::User,
                self.continuation_prompt.as_str(),
            ));
        }

        tracing::debug!(
            messages = messages.len(),
            has_system = system.is_some(),
            "Converted transcript"
        );

        Ok(ConversionResult { system, messages })
    }

    /// Decodes a JSON transcript (an array of turns), converts it, and returns the
    /// payload as JSON.
    ///
    /// When `LOUD_WIRE` is set, both sides are dumped to stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ConverseError::Json`] for malformed JSON or unknown role strings, and
    /// [`ConverseError::InvalidTranscript`] as [`convert`](Self::convert) does.
    ///
    /// # Example
    ///
    /// ```
    /// use converse_rs::TranscriptConverter;
    ///
    /// let payload = TranscriptConverter::default()
    ///     .convert_json(r#"[{"role": "user", "content": "hi"}]"#)
    ///     .unwrap();
    /// assert_eq!(payload["messages"][0]["content"][0]["text"], "hi");
    /// assert!(payload["system"].is_null());
    /// ```
    pub fn convert_json(&self, json: &str) -> Result<Value, ConverseError> {
        let value: Value = serde_json::from_str(json)?;
        self.convert_value(value)
    }

    /// Like [`convert_json`](Self::convert_json) for an already-parsed value.
    ///
    /// # Errors
    ///
    /// Same as [`convert_json`](Self::convert_json).
    pub fn convert_value(&self, transcript: Value) -> Result<Value, ConverseError> {
        let conversion_id = loud_wire::next_conversion_id();
        loud_wire::log_transcript(conversion_id, &transcript);

        let turns: Vec<Turn> = serde_json::from_value(transcript)?;
        let result = match self.convert(&turns) {
            Ok(result) => result,
            Err(err) => {
                loud_wire::log_rejection(conversion_id, &err);
                return Err(err);
            }
        };

        let payload = result.to_json()?;
        loud_wire::log_payload(conversion_id, &payload);
        Ok(payload)
    }
}

/// Converts `turns` with the default [`TranscriptConverter`].
///
/// # Errors
///
/// See [`TranscriptConverter::convert`].
pub fn convert(turns: &[Turn]) -> Result<ConversionResult, ConverseError> {
    TranscriptConverter::default().convert(turns)
}

fn message_role(role: Role) -> Option<MessageRole> {
    match role {
        Role::System => None,
        Role::User => Some(MessageRole::User),
        Role::Assistant => Some(MessageRole::Assistant),
    }
}

fn check_leading_user(turns: &[Turn]) -> Result<(), TranscriptViolation> {
    match turns.iter().find(|turn| !turn.role().is_system()) {
        Some(turn) if turn.role() == Role::User => Ok(()),
        _ => Err(TranscriptViolation::MissingLeadingUser),
    }
}

fn extract_system(turns: &[Turn]) -> Result<Option<String>, TranscriptViolation> {
    let mut system_turns = turns.iter().filter(|turn| turn.role().is_system());
    let system = system_turns.next().map(|turn| turn.content().flatten_text());
    if system_turns.next().is_some() {
        return Err(TranscriptViolation::MultipleSystemMessages);
    }
    Ok(system)
}

fn normalize_content(content: &TurnContent, pending: &mut PendingToolUses) -> Vec<WireContent> {
    match content {
        TurnContent::Text(text) => vec![WireContent::text(text.as_str())],
        TurnContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(WireContent::text(text.as_str())),
                ContentPart::ToolCall {
                    tool_call_id,
                    tool_name,
                    args,
                } => {
                    pending.record(tool_call_id);
                    Some(WireContent::tool_use(
                        tool_call_id.as_str(),
                        tool_name.as_str(),
                        args.clone(),
                    ))
                }
                ContentPart::Unknown { part_type, .. } => {
                    tracing::warn!(
                        part_type = %part_type,
                        "Dropping content part the Converse API has no block for"
                    );
                    None
                }
            })
            .collect(),
    }
}
