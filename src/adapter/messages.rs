//! Inbound protocol message types.
//!
//! The remote service delivers recognition progress as a stream of typed
//! messages. This module defines the tagged union the dispatcher consumes and
//! the serde mapping the reference transport uses to parse text frames.
//!
//! Offsets and durations are in 100-nanosecond ticks from the start of the
//! audio stream.

use serde::{Deserialize, Serialize};

// =============================================================================
// Message Payloads
// =============================================================================

/// The service detected the start of speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechStartMessage {
    /// Position where speech starts, in 100-ns ticks.
    pub offset: u64,
}

/// The service detected the end of speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeechEndMessage {
    /// Position where speech ends, in 100-ns ticks.
    pub offset: u64,
}

/// A partial recognition hypothesis, subject to revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HypothesisMessage {
    pub text: String,
    pub offset: u64,
    #[serde(default)]
    pub duration: u64,
}

/// A stable fragment of the recognition in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FragmentMessage {
    pub text: String,
    pub offset: u64,
    #[serde(default)]
    pub duration: u64,
}

/// The final recognized phrase for an utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhraseMessage {
    /// Service status code. Carried for forward compatibility; the dispatcher
    /// does not branch on it.
    #[serde(default)]
    pub recognition_status: u32,
    #[serde(default)]
    pub display_text: String,
    pub offset: u64,
    #[serde(default)]
    pub duration: u64,
}

/// A turn has started on the service side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TurnStartMessage {
    #[serde(default)]
    pub context: TurnContext,
}

/// Context block attached to a turn-start message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TurnContext {
    /// Opaque tag identifying the turn on the service side.
    #[serde(default)]
    pub service_tag: String,
}

/// An error reported by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub description: String,
}

// =============================================================================
// Tagged Union
// =============================================================================

/// Inbound protocol message, tagged by its wire path.
///
/// Produced by the transport, consumed exactly once by the dispatcher, never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path")]
pub enum ProtocolMessage {
    #[serde(rename = "speech.startDetected")]
    SpeechStart(SpeechStartMessage),
    #[serde(rename = "speech.endDetected")]
    SpeechEnd(SpeechEndMessage),
    #[serde(rename = "speech.hypothesis")]
    Hypothesis(HypothesisMessage),
    #[serde(rename = "speech.fragment")]
    Fragment(FragmentMessage),
    #[serde(rename = "speech.phrase")]
    Phrase(PhraseMessage),
    #[serde(rename = "turn.start")]
    TurnStart(TurnStartMessage),
    #[serde(rename = "turn.end")]
    TurnEnd,
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ProtocolMessage {
    /// Parse a JSON text frame into a protocol message.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Wire path of this message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SpeechStart(_) => "speech.startDetected",
            Self::SpeechEnd(_) => "speech.endDetected",
            Self::Hypothesis(_) => "speech.hypothesis",
            Self::Fragment(_) => "speech.fragment",
            Self::Phrase(_) => "speech.phrase",
            Self::TurnStart(_) => "turn.start",
            Self::TurnEnd => "turn.end",
            Self::Error(_) => "error",
        }
    }

    /// Check if this message carries a final phrase.
    pub fn is_phrase(&self) -> bool {
        matches!(self, Self::Phrase(_))
    }

    /// Check if this message ends the current turn.
    pub fn is_turn_end(&self) -> bool {
        matches!(self, Self::TurnEnd)
    }

    /// Check if this is a service error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
