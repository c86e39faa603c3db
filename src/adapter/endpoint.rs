//! Endpoint, recognition-mode, and authentication resolution.
//!
//! Pure functions of the property lookup: given the configured properties,
//! deterministically select exactly one endpoint variant, one recognition
//! mode, and at most one authentication method. Nothing here performs I/O or
//! fails; unresolved mode/auth are represented as values and turned into a
//! configuration error by [`EndpointSelection::validate`] before connecting.

use serde::{Deserialize, Serialize};

use crate::base::{AdapterError, PropertyId, PropertyLookup};

/// Reserved endpoint keyword selecting the legacy agent service.
pub const LEGACY_AGENT_KEYWORD: &str = "CORTANA";

// =============================================================================
// Endpoint Variant
// =============================================================================

/// Which remote service flavor the session targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointVariant {
    /// Custom-trained recognition model service.
    IntelligentCustomModel,
    /// Legacy agent endpoint, selected by the reserved keyword.
    LegacyAgent,
    /// Caller-specified endpoint URL, used verbatim.
    CustomUrl(String),
    /// Default speech service.
    DefaultSpeech,
}

impl EndpointVariant {
    /// Check if this variant carries a caller-specified URL.
    pub fn is_custom_url(&self) -> bool {
        matches!(self, Self::CustomUrl(_))
    }
}

// =============================================================================
// Recognition Mode
// =============================================================================

/// Interaction pattern hint sent to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionMode {
    /// Single short utterance, one result. The default.
    #[default]
    Interactive,
    /// Long-form multi-party audio.
    Conversation,
    /// Long-form single-speaker dictation.
    Dictation,
    /// Unresolvable mode property. A configuration error before connecting.
    Unknown,
}

impl RecognitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Conversation => "conversation",
            Self::Dictation => "dictation",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Authentication
// =============================================================================

/// Authentication scheme applied to the transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    SubscriptionKey,
    AuthorizationToken,
    DelegationToken,
}

// =============================================================================
// Resolution
// =============================================================================

/// Select the endpoint variant. First match wins:
/// a non-empty custom-model id, the reserved legacy-agent keyword, any other
/// non-empty endpoint property (used verbatim as a URL), then the default
/// speech service.
pub fn resolve_endpoint(props: &dyn PropertyLookup) -> EndpointVariant {
    let endpoint = props.get_string(PropertyId::Endpoint);
    let custom_model_id = props.get_string(PropertyId::CustomModelId);

    if !custom_model_id.is_empty() {
        EndpointVariant::IntelligentCustomModel
    } else if endpoint.eq_ignore_ascii_case(LEGACY_AGENT_KEYWORD) {
        EndpointVariant::LegacyAgent
    } else if !endpoint.is_empty() {
        EndpointVariant::CustomUrl(endpoint)
    } else {
        EndpointVariant::DefaultSpeech
    }
}

/// Resolve the recognition mode. Empty means interactive; anything not in the
/// known set maps to [`RecognitionMode::Unknown`].
///
/// Only meaningful when the endpoint is not a custom URL; a custom URL
/// encodes its own mode.
pub fn resolve_recognition_mode(props: &dyn PropertyLookup) -> RecognitionMode {
    let value = props.get_string(PropertyId::RecognitionMode);

    if value.is_empty() || value.eq_ignore_ascii_case("interactive") {
        RecognitionMode::Interactive
    } else if value.eq_ignore_ascii_case("conversation") {
        RecognitionMode::Conversation
    } else if value.eq_ignore_ascii_case("dictation") {
        RecognitionMode::Dictation
    } else {
        RecognitionMode::Unknown
    }
}

/// Resolve the authentication method and credential. First non-empty wins:
/// subscription key, authorization token, delegation token. `None` means no
/// credential is configured, which is a configuration error before
/// connecting.
pub fn resolve_authentication(props: &dyn PropertyLookup) -> Option<(AuthMethod, String)> {
    let subscription_key = props.get_string(PropertyId::SubscriptionKey);
    if !subscription_key.is_empty() {
        return Some((AuthMethod::SubscriptionKey, subscription_key));
    }

    let auth_token = props.get_string(PropertyId::AuthToken);
    if !auth_token.is_empty() {
        return Some((AuthMethod::AuthorizationToken, auth_token));
    }

    let delegation_token = props.get_string(PropertyId::DelegationToken);
    if !delegation_token.is_empty() {
        return Some((AuthMethod::DelegationToken, delegation_token));
    }

    None
}

// =============================================================================
// Endpoint Selection
// =============================================================================

/// The full resolution result the orchestrator connects with.
#[derive(Debug, Clone)]
pub struct EndpointSelection {
    pub variant: EndpointVariant,
    pub mode: RecognitionMode,
    pub auth: Option<(AuthMethod, String)>,
}

impl EndpointSelection {
    /// Resolve endpoint, mode, and authentication from the properties.
    pub fn from_properties(props: &dyn PropertyLookup) -> Self {
        Self {
            variant: resolve_endpoint(props),
            mode: resolve_recognition_mode(props),
            auth: resolve_authentication(props),
        }
    }

    /// Reject selections that must not connect: an unresolvable recognition
    /// mode (unless a custom URL carries its own), or no authentication
    /// material at all.
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.mode == RecognitionMode::Unknown && !self.variant.is_custom_url() {
            return Err(AdapterError::Configuration(
                "recognition mode could not be resolved".to_string(),
            ));
        }
        if self.auth.is_none() {
            return Err(AdapterError::Configuration(
                "no authentication credential configured".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::PropertyMap;

    #[test]
    fn test_custom_model_id_wins_over_everything() {
        let props = PropertyMap::new()
            .with(PropertyId::CustomModelId, "m1")
            .with(PropertyId::Endpoint, "CORTANA");

        assert_eq!(
            resolve_endpoint(&props),
            EndpointVariant::IntelligentCustomModel
        );
    }

    #[test]
    fn test_legacy_agent_keyword_is_case_insensitive() {
        for keyword in ["CORTANA", "cortana", "Cortana"] {
            let props = PropertyMap::new().with(PropertyId::Endpoint, keyword);
            assert_eq!(resolve_endpoint(&props), EndpointVariant::LegacyAgent);
        }
    }

    #[test]
    fn test_nonempty_endpoint_is_used_verbatim() {
        let props = PropertyMap::new().with(PropertyId::Endpoint, "wss://my.host/speech?x=1");
        assert_eq!(
            resolve_endpoint(&props),
            EndpointVariant::CustomUrl("wss://my.host/speech?x=1".to_string())
        );
    }

    #[test]
    fn test_empty_properties_select_default_speech() {
        let props = PropertyMap::new();
        assert_eq!(resolve_endpoint(&props), EndpointVariant::DefaultSpeech);
        assert_eq!(
            resolve_recognition_mode(&props),
            RecognitionMode::Interactive
        );
    }

    #[test]
    fn test_mode_resolution_is_case_insensitive() {
        let cases = [
            ("", RecognitionMode::Interactive),
            ("interactive", RecognitionMode::Interactive),
            ("INTERACTIVE", RecognitionMode::Interactive),
            ("Conversation", RecognitionMode::Conversation),
            ("dictation", RecognitionMode::Dictation),
            ("DICTATION", RecognitionMode::Dictation),
            ("freeform", RecognitionMode::Unknown),
        ];

        for (value, expected) in cases {
            let props = PropertyMap::new().with(PropertyId::RecognitionMode, value);
            assert_eq!(resolve_recognition_mode(&props), expected, "value {value:?}");
        }
    }

    #[test]
    fn test_auth_precedence() {
        let props = PropertyMap::new()
            .with(PropertyId::SubscriptionKey, "sub")
            .with(PropertyId::AuthToken, "tok")
            .with(PropertyId::DelegationToken, "del");
        assert_eq!(
            resolve_authentication(&props),
            Some((AuthMethod::SubscriptionKey, "sub".to_string()))
        );

        let props = PropertyMap::new()
            .with(PropertyId::AuthToken, "tok")
            .with(PropertyId::DelegationToken, "del");
        assert_eq!(
            resolve_authentication(&props),
            Some((AuthMethod::AuthorizationToken, "tok".to_string()))
        );

        let props = PropertyMap::new().with(PropertyId::DelegationToken, "del");
        assert_eq!(
            resolve_authentication(&props),
            Some((AuthMethod::DelegationToken, "del".to_string()))
        );

        assert_eq!(resolve_authentication(&PropertyMap::new()), None);
    }

    #[test]
    fn test_validate_rejects_unknown_mode() {
        let props = PropertyMap::new()
            .with(PropertyId::SubscriptionKey, "sub")
            .with(PropertyId::RecognitionMode, "freeform");

        let selection = EndpointSelection::from_properties(&props);
        assert!(selection.validate().is_err());
    }

    #[test]
    fn test_validate_allows_unknown_mode_with_custom_url() {
        // A custom URL encodes its own mode; the mode property is ignored.
        let props = PropertyMap::new()
            .with(PropertyId::SubscriptionKey, "sub")
            .with(PropertyId::Endpoint, "wss://my.host/speech")
            .with(PropertyId::RecognitionMode, "freeform");

        let selection = EndpointSelection::from_properties(&props);
        assert!(selection.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_auth() {
        let selection = EndpointSelection::from_properties(&PropertyMap::new());
        assert!(selection.validate().is_err());
    }
}
