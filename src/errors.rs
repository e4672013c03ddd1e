use std::fmt;

use thiserror::Error;

/// Defines errors that can occur while converting a transcript.
///
/// # Example: Matching on the violation
///
/// ```
/// use converse_rs::{ConverseError, TranscriptViolation, Turn, convert};
///
/// let err = convert(&[Turn::assistant("hi")]).unwrap_err();
/// match err {
///     ConverseError::InvalidTranscript(TranscriptViolation::MissingLeadingUser) => {}
///     other => panic!("unexpected error: {other}"),
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConverseError {
    /// The transcript breaks one of the structural rules the provider enforces.
    ///
    /// Always fatal: no partial payload is produced.
    #[error("invalid transcript: {0}")]
    InvalidTranscript(TranscriptViolation),
    /// The JSON handed to [`crate::TranscriptConverter::convert_json`] could not be
    /// decoded into turns.
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConverseError {
    /// Returns the violation if this is an `InvalidTranscript` error.
    #[must_use]
    pub fn violation(&self) -> Option<TranscriptViolation> {
        match self {
            Self::InvalidTranscript(violation) => Some(*violation),
            Self::Json(_) => None,
        }
    }
}

impl From<TranscriptViolation> for ConverseError {
    fn from(violation: TranscriptViolation) -> Self {
        Self::InvalidTranscript(violation)
    }
}

/// The structural rule a rejected transcript broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TranscriptViolation {
    /// No non-system turn exists, or the first one is not a user turn.
    MissingLeadingUser,
    /// More than one system turn appears in the transcript.
    MultipleSystemMessages,
}

impl TranscriptViolation {
    /// Human-readable reason, stable enough for callers to match on.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingLeadingUser => {
                "conversation must start with a user message after any system messages"
            }
            Self::MultipleSystemMessages => "multiple system messages are not supported",
        }
    }
}

impl fmt::Display for TranscriptViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}
