//! Reference WebSocket transport.
//!
//! Connects to the resolved endpoint over a WebSocket, forwards audio as
//! binary frames, and parses inbound text frames into
//! [`ProtocolMessage`](crate::adapter::messages::ProtocolMessage)s delivered
//! to the registered handler on the receive task.
//!
//! ```text
//! ┌────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  send_audio()  │────▶│ audio_tx (mpsc)  │────▶│  WebSocket Task │
//! └────────────────┘     └──────────────────┘     └────────┬────────┘
//!                                                          │ text frames
//!                                                 ┌────────▼────────┐
//!                                                 │ ProtocolHandler │
//!                                                 └─────────────────┘
//! ```
//!
//! Network reliability (retransmission, reconnection) is deliberately not
//! handled here; a failed connection surfaces as an error and the session is
//! done.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::{Transport, TransportError, TransportSession};
use crate::adapter::dispatch::ProtocolHandler;
use crate::adapter::endpoint::{AuthMethod, EndpointVariant, RecognitionMode};
use crate::adapter::messages::ProtocolMessage;

// =============================================================================
// Constants
// =============================================================================

/// Default speech service host.
const DEFAULT_SPEECH_HOST: &str = "wss://speech.platform.bing.com";

/// Recognition path template under the default and custom-model hosts.
const RECOGNITION_PATH: &str = "/speech/recognition";

/// Custom-trained model service host.
const CUSTOM_MODEL_HOST: &str = "wss://websockets.platform.bing.com";

/// Legacy agent endpoint.
const LEGACY_AGENT_URL: &str = "wss://speech.platform.bing.com/agent/api/v1";

/// Handshake timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Graceful-close timeout for the receive task.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounded audio queue: enough for bursts without unbounded memory growth.
const AUDIO_QUEUE_DEPTH: usize = 32;

// =============================================================================
// Transport
// =============================================================================

/// WebSocket-backed [`Transport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open(
        &self,
        endpoint: &EndpointVariant,
        mode: RecognitionMode,
        handler: Arc<dyn ProtocolHandler>,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        Ok(Box::new(WsSession {
            endpoint: endpoint.clone(),
            mode,
            handler,
            auth: None,
            language: None,
            model_id: None,
            audio_tx: None,
            shutdown_tx: None,
            receive_handle: None,
            connected: Arc::new(AtomicBool::new(false)),
        }))
    }
}

// =============================================================================
// Session
// =============================================================================

/// One WebSocket connection to the recognition service.
pub struct WsSession {
    endpoint: EndpointVariant,
    mode: RecognitionMode,
    handler: Arc<dyn ProtocolHandler>,

    auth: Option<(AuthMethod, String)>,
    language: Option<String>,
    model_id: Option<String>,

    /// Audio frames queued for the WebSocket task.
    audio_tx: Option<mpsc::Sender<Bytes>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    receive_handle: Option<tokio::task::JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl WsSession {
    /// Derive the connection URL from the endpoint variant, recognition mode,
    /// and the configured language/model.
    fn build_url(&self) -> Result<Url, TransportError> {
        let base = match &self.endpoint {
            EndpointVariant::CustomUrl(url) => url.clone(),
            EndpointVariant::LegacyAgent => LEGACY_AGENT_URL.to_string(),
            EndpointVariant::DefaultSpeech => {
                format!("{DEFAULT_SPEECH_HOST}{}", self.recognition_path()?)
            }
            EndpointVariant::IntelligentCustomModel => {
                format!("{CUSTOM_MODEL_HOST}{}", self.recognition_path()?)
            }
        };

        let mut url = Url::parse(&base)
            .map_err(|e| TransportError::ConnectionFailed(format!("invalid endpoint URL: {e}")))?;

        // A custom URL is used verbatim; the other variants take the
        // configured language and model as query parameters.
        if !self.endpoint.is_custom_url() {
            if let Some(language) = &self.language {
                url.query_pairs_mut().append_pair("language", language);
            }
            if let Some(model_id) = &self.model_id {
                url.query_pairs_mut().append_pair("cid", model_id);
            }
        }

        Ok(url)
    }

    fn recognition_path(&self) -> Result<String, TransportError> {
        if self.mode == RecognitionMode::Unknown {
            return Err(TransportError::ConnectionFailed(
                "recognition mode is unresolved".to_string(),
            ));
        }
        Ok(format!(
            "{RECOGNITION_PATH}/{}/cognitiveservices/v1",
            self.mode.as_str()
        ))
    }

    fn guard_preconnect(&self, what: &str) -> Result<(), TransportError> {
        if self.audio_tx.is_some() {
            return Err(TransportError::ConnectionFailed(format!(
                "{what} must be set before connect"
            )));
        }
        Ok(())
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        // Stop the receive task if the session is dropped without close().
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

#[async_trait]
impl TransportSession for WsSession {
    fn set_authentication(
        &mut self,
        method: AuthMethod,
        credential: &str,
    ) -> Result<(), TransportError> {
        self.guard_preconnect("authentication")?;
        self.auth = Some((method, credential.to_string()));
        Ok(())
    }

    fn set_language(&mut self, language: &str) -> Result<(), TransportError> {
        self.guard_preconnect("language")?;
        self.language = Some(language.to_string());
        Ok(())
    }

    fn set_model_id(&mut self, model_id: &str) -> Result<(), TransportError> {
        self.guard_preconnect("model id")?;
        self.model_id = Some(model_id.to_string());
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.audio_tx.is_some() {
            return Err(TransportError::ConnectionFailed(
                "session is already connected".to_string(),
            ));
        }

        let url = self.build_url()?;
        let mut request = url.as_str().into_client_request().map_err(|e| {
            TransportError::ConnectionFailed(format!("invalid handshake request: {e}"))
        })?;

        if let Some((method, credential)) = &self.auth {
            let (name, value) = match method {
                AuthMethod::SubscriptionKey => {
                    ("Ocp-Apim-Subscription-Key", credential.clone())
                }
                AuthMethod::AuthorizationToken => ("Authorization", format!("Bearer {credential}")),
                AuthMethod::DelegationToken => ("X-Search-DelegationRPSToken", credential.clone()),
            };
            let value = HeaderValue::from_str(&value).map_err(|e| {
                TransportError::ConnectionFailed(format!("invalid credential: {e}"))
            })?;
            request.headers_mut().insert(name, value);
        }

        let connect_result = timeout(CONNECT_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| {
                TransportError::ConnectionFailed("handshake timed out".to_string())
            })?;

        let (ws_stream, _response) = connect_result
            .map_err(|e| TransportError::ConnectionFailed(format!("handshake failed: {e}")))?;

        info!(url = %url, "recognition WebSocket connected");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(AUDIO_QUEUE_DEPTH);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handler = self.handler.clone();
        let connected = self.connected.clone();
        connected.store(true, Ordering::Release);

        let receive_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Prioritize audio sending for lowest latency.
                    biased;

                    Some(audio) = audio_rx.recv() => {
                        if let Err(e) = ws_sink.send(Message::Binary(audio)).await {
                            warn!(error = %e, "failed to send audio frame");
                            break;
                        }
                    }

                    frame = ws_stream.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                match ProtocolMessage::parse(&text) {
                                    Ok(message) => {
                                        debug!(kind = message.kind(), "protocol message received");
                                        handler.on_message(message);
                                    }
                                    Err(e) => {
                                        warn!(error = %e, raw = %text, "unparseable protocol message");
                                    }
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!(?frame, "service closed the connection");
                                break;
                            }
                            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                            Some(Ok(other)) => {
                                debug!(?other, "ignoring unexpected frame");
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket error");
                                break;
                            }
                            None => {
                                info!("WebSocket stream ended");
                                break;
                            }
                        }
                    }

                    _ = &mut shutdown_rx => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            connected.store(false, Ordering::Release);
            debug!("receive task finished");
        });

        self.audio_tx = Some(audio_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.receive_handle = Some(receive_handle);
        Ok(())
    }

    async fn send_audio(&self, data: Bytes) -> Result<(), TransportError> {
        if data.is_empty() {
            return Err(TransportError::EmptyPayload);
        }

        let audio_tx = self.audio_tx.as_ref().ok_or(TransportError::NotConnected)?;
        if !self.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }

        audio_tx
            .send(data)
            .await
            .map_err(|_| TransportError::SendFailed("receive task is gone".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.receive_handle.take() {
            if timeout(CLOSE_TIMEOUT, handle).await.is_err() {
                return Err(TransportError::CloseFailed(
                    "receive task did not finish in time".to_string(),
                ));
            }
        }

        self.audio_tx = None;
        self.connected.store(false, Ordering::Release);
        debug!("WebSocket session closed");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    impl ProtocolHandler for NoopHandler {
        fn on_speech_start(&self, _m: crate::adapter::messages::SpeechStartMessage) {}
        fn on_speech_end(&self, _m: crate::adapter::messages::SpeechEndMessage) {}
        fn on_hypothesis(&self, _m: crate::adapter::messages::HypothesisMessage) {}
        fn on_fragment(&self, _m: crate::adapter::messages::FragmentMessage) {}
        fn on_phrase(&self, _m: crate::adapter::messages::PhraseMessage) {}
        fn on_turn_start(&self, _m: crate::adapter::messages::TurnStartMessage) {}
        fn on_turn_end(&self) {}
        fn on_error(&self, _e: crate::adapter::messages::ErrorPayload) {}
    }

    fn session(endpoint: EndpointVariant, mode: RecognitionMode) -> WsSession {
        WsSession {
            endpoint,
            mode,
            handler: Arc::new(NoopHandler),
            auth: None,
            language: None,
            model_id: None,
            audio_tx: None,
            shutdown_tx: None,
            receive_handle: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn test_default_speech_url_per_mode() {
        let s = session(EndpointVariant::DefaultSpeech, RecognitionMode::Interactive);
        assert_eq!(
            s.build_url().unwrap().as_str(),
            "wss://speech.platform.bing.com/speech/recognition/interactive/cognitiveservices/v1"
        );

        let s = session(EndpointVariant::DefaultSpeech, RecognitionMode::Dictation);
        assert_eq!(
            s.build_url().unwrap().as_str(),
            "wss://speech.platform.bing.com/speech/recognition/dictation/cognitiveservices/v1"
        );
    }

    #[test]
    fn test_language_and_model_become_query_params() {
        let mut s = session(
            EndpointVariant::IntelligentCustomModel,
            RecognitionMode::Conversation,
        );
        s.language = Some("de-DE".to_string());
        s.model_id = Some("m-42".to_string());

        let url = s.build_url().unwrap();
        assert!(url.as_str().starts_with(
            "wss://websockets.platform.bing.com/speech/recognition/conversation/cognitiveservices/v1?"
        ));
        assert!(url.query_pairs().any(|(k, v)| k == "language" && v == "de-DE"));
        assert!(url.query_pairs().any(|(k, v)| k == "cid" && v == "m-42"));
    }

    #[test]
    fn test_custom_url_is_verbatim() {
        let mut s = session(
            EndpointVariant::CustomUrl("wss://my.host/speech?format=simple".to_string()),
            RecognitionMode::Unknown,
        );
        // Language must not be appended to a custom URL.
        s.language = Some("en-US".to_string());

        assert_eq!(
            s.build_url().unwrap().as_str(),
            "wss://my.host/speech?format=simple"
        );
    }

    #[test]
    fn test_legacy_agent_url() {
        let s = session(EndpointVariant::LegacyAgent, RecognitionMode::Interactive);
        assert_eq!(s.build_url().unwrap().as_str(), LEGACY_AGENT_URL);
    }

    #[test]
    fn test_unresolved_mode_is_rejected() {
        let s = session(EndpointVariant::DefaultSpeech, RecognitionMode::Unknown);
        assert!(matches!(
            s.build_url(),
            Err(TransportError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_send_audio_requires_connection() {
        let s = session(EndpointVariant::DefaultSpeech, RecognitionMode::Interactive);
        let err = s.send_audio(Bytes::from_static(&[1, 2])).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_empty_payload_is_rejected_first() {
        let s = session(EndpointVariant::DefaultSpeech, RecognitionMode::Interactive);
        let err = s.send_audio(Bytes::new()).await.unwrap_err();
        assert!(matches!(err, TransportError::EmptyPayload));
    }

    #[test]
    fn test_setters_rejected_after_connect() {
        let mut s = session(EndpointVariant::DefaultSpeech, RecognitionMode::Interactive);
        let (tx, _rx) = mpsc::channel(1);
        s.audio_tx = Some(tx);

        assert!(s.set_language("en-US").is_err());
        assert!(s.set_model_id("m").is_err());
        assert!(
            s.set_authentication(AuthMethod::SubscriptionKey, "k")
                .is_err()
        );
    }
}
