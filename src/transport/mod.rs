//! Transport seam between the adapter and the remote service connection.
//!
//! The adapter consumes the transport through the [`Transport`] and
//! [`TransportSession`] traits and never sees the wire protocol itself.
//! Inbound protocol messages are delivered to the
//! [`ProtocolHandler`](crate::adapter::dispatch::ProtocolHandler) registered
//! at [`Transport::open`] time, on a thread the transport controls.
//!
//! A reference WebSocket implementation lives in [`ws`]; tests substitute
//! their own mock sessions.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::adapter::dispatch::ProtocolHandler;
use crate::adapter::endpoint::{AuthMethod, EndpointVariant, RecognitionMode};

pub mod ws;

pub use ws::WsTransport;

// =============================================================================
// Error Types
// =============================================================================

/// Errors reported by the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Establishing the connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Sending data over an established connection failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The transport rejected a zero-length audio payload.
    ///
    /// The buffered writer treats this specific failure as a non-error no-op;
    /// it is a known quirk of the underlying send primitive.
    #[error("zero-length audio payload rejected")]
    EmptyPayload,

    /// An operation was attempted on a session that is not connected.
    #[error("not connected")]
    NotConnected,

    /// Closing the connection failed.
    #[error("close failed: {0}")]
    CloseFailed(String),
}

// =============================================================================
// Transport Traits
// =============================================================================

/// Factory for transport sessions.
pub trait Transport: Send + Sync {
    /// Create an unconnected session bound to the given endpoint variant and
    /// recognition mode.
    ///
    /// The `handler` receives every inbound protocol message for the lifetime
    /// of the session. No I/O happens until [`TransportSession::connect`].
    fn open(
        &self,
        endpoint: &EndpointVariant,
        mode: RecognitionMode,
        handler: Arc<dyn ProtocolHandler>,
    ) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// A single live (or about-to-be-live) connection to the remote service.
///
/// The configuration setters apply before [`connect`](Self::connect) finalizes
/// the connection semantics; calling them afterward is an error.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Apply authentication material to the pending connection.
    fn set_authentication(
        &mut self,
        method: AuthMethod,
        credential: &str,
    ) -> Result<(), TransportError>;

    /// Select the recognition language for the pending connection.
    fn set_language(&mut self, language: &str) -> Result<(), TransportError>;

    /// Select a custom model for the pending connection.
    fn set_model_id(&mut self, model_id: &str) -> Result<(), TransportError>;

    /// Establish the connection. After this returns the session transmits
    /// audio and delivers inbound messages to the registered handler.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Transmit a chunk of audio bytes.
    ///
    /// May fail with [`TransportError::EmptyPayload`] when `data` is empty.
    async fn send_audio(&self, data: Bytes) -> Result<(), TransportError>;

    /// Close the connection and release its resources.
    async fn close(&mut self) -> Result<(), TransportError>;
}
