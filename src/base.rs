//! Shared contracts consumed by every part of the adapter.
//!
//! This module defines the error taxonomy, the event sink the consumer
//! implements, the result factory collaborator, and the read-only property
//! lookup the endpoint resolver draws from.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::messages::ErrorPayload;
use crate::transport::TransportError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by the adapter's own operations.
///
/// Protocol errors reported by the remote service are not represented here:
/// they arrive asynchronously and are delivered as [`EventSink::on_error`]
/// events instead.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Endpoint, recognition mode, or authentication could not be resolved
    /// from the configured properties. Fatal to session start.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A transport operation failed. The session is unusable afterward.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An operation was invoked in the wrong lifecycle state.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

// =============================================================================
// Event Sink
// =============================================================================

/// The consumer-facing notification surface.
///
/// Every method is invoked synchronously from within message dispatch, on the
/// thread the transport delivers messages on. Implementations must not
/// re-enter the transport from inside a callback.
///
/// Offsets are in 100-nanosecond ticks from the start of the audio stream.
pub trait EventSink: Send + Sync {
    /// The service detected the start of speech.
    fn on_speech_start(&self, offset: u64);

    /// The service detected the end of speech.
    fn on_speech_end(&self, offset: u64);

    /// A partial recognition result, subject to change.
    fn on_intermediate_result(&self, offset: u64, result: RecoResult);

    /// A final recognition result for the utterance.
    fn on_final_result(&self, offset: u64, result: RecoResult);

    /// Out-of-band information attached to the stream (e.g. the turn's
    /// context tag).
    fn on_additional_info(&self, offset: u64, payload: &str);

    /// No more events will arrive for this utterance.
    fn on_stream_done(&self);

    /// The remote service reported an error. The session may continue; the
    /// consumer decides whether to terminate it.
    fn on_error(&self, error: &ErrorPayload);
}

// =============================================================================
// Recognition Results
// =============================================================================

/// A recognition result constructed from decoded text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoResult {
    /// The recognized text.
    pub text: String,
    /// Whether this result is final (not subject to change).
    pub is_final: bool,
}

impl RecoResult {
    pub fn new(text: impl Into<String>, is_final: bool) -> Self {
        Self {
            text: text.into(),
            is_final,
        }
    }
}

/// Factory collaborator turning decoded text into result objects.
pub trait ResultFactory: Send + Sync {
    fn create_intermediate_result(&self, text: &str) -> RecoResult;
    fn create_final_result(&self, text: &str) -> RecoResult;
}

/// Default factory producing plain [`RecoResult`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicResultFactory;

impl ResultFactory for BasicResultFactory {
    fn create_intermediate_result(&self, text: &str) -> RecoResult {
        RecoResult::new(text, false)
    }

    fn create_final_result(&self, text: &str) -> RecoResult {
        RecoResult::new(text, true)
    }
}

// =============================================================================
// Property Lookup
// =============================================================================

/// Keys the adapter reads from the property lookup collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyId {
    /// Remote endpoint override (URL or reserved keyword).
    Endpoint,
    /// Subscription key credential.
    SubscriptionKey,
    /// Bearer/authorization token credential.
    AuthToken,
    /// Delegated token credential.
    DelegationToken,
    /// Custom recognition model identifier.
    CustomModelId,
    /// Recognition language (e.g. "en-US").
    RecognitionLanguage,
    /// Recognition mode ("interactive", "conversation", "dictation").
    RecognitionMode,
}

impl PropertyId {
    /// Stable string key for this property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::SubscriptionKey => "subscription-key",
            Self::AuthToken => "auth-token",
            Self::DelegationToken => "delegation-token",
            Self::CustomModelId => "custom-model-id",
            Self::RecognitionLanguage => "recognition-language",
            Self::RecognitionMode => "recognition-mode",
        }
    }

    /// Environment variable consulted by [`PropertyMap::from_env`].
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Endpoint => "RECO_ENDPOINT",
            Self::SubscriptionKey => "RECO_SUBSCRIPTION_KEY",
            Self::AuthToken => "RECO_AUTH_TOKEN",
            Self::DelegationToken => "RECO_DELEGATION_TOKEN",
            Self::CustomModelId => "RECO_CUSTOM_MODEL_ID",
            Self::RecognitionLanguage => "RECO_LANGUAGE",
            Self::RecognitionMode => "RECO_MODE",
        }
    }

    /// All property keys, in resolution order.
    pub fn all() -> &'static [PropertyId] {
        &[
            Self::Endpoint,
            Self::SubscriptionKey,
            Self::AuthToken,
            Self::DelegationToken,
            Self::CustomModelId,
            Self::RecognitionLanguage,
            Self::RecognitionMode,
        ]
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only key/value lookup consumed by the endpoint resolver and the
/// orchestrator.
///
/// Missing keys resolve to the empty string; the resolver treats empty and
/// absent identically.
pub trait PropertyLookup: Send + Sync {
    fn get_string(&self, id: PropertyId) -> String;
}

/// In-memory property lookup backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    values: HashMap<PropertyId, String>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, returning `self` for chaining.
    pub fn with(mut self, id: PropertyId, value: impl Into<String>) -> Self {
        self.values.insert(id, value.into());
        self
    }

    pub fn set(&mut self, id: PropertyId, value: impl Into<String>) {
        self.values.insert(id, value.into());
    }

    /// Build a property map from `RECO_*` environment variables.
    ///
    /// Unset variables are simply absent from the map.
    pub fn from_env() -> Self {
        let mut map = Self::new();
        for id in PropertyId::all() {
            if let Ok(value) = std::env::var(id.env_var()) {
                if !value.is_empty() {
                    map.set(*id, value);
                }
            }
        }
        map
    }
}

impl PropertyLookup for PropertyMap {
    fn get_string(&self, id: PropertyId) -> String {
        self.values.get(&id).cloned().unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================
