//! In-memory collaborators shared by the integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use reco_adapter::adapter::messages::{ErrorPayload, ProtocolMessage};
use reco_adapter::adapter::{
    AuthMethod, EndpointVariant, ProtocolHandler, RecognitionMode,
};
use reco_adapter::base::{EventSink, RecoResult};
use reco_adapter::transport::{Transport, TransportError, TransportSession};

// =============================================================================
// Mock transport
// =============================================================================

/// State shared between the mock transport, its sessions, and the test body.
#[derive(Default)]
pub struct TransportState {
    pub transmissions: Mutex<Vec<Vec<u8>>>,
    pub handler: Mutex<Option<Arc<dyn ProtocolHandler>>>,
    pub connected: AtomicBool,
    pub closed: AtomicBool,
    pub fail_sends: AtomicBool,
}

impl TransportState {
    /// All transmitted bytes, transmission boundaries erased.
    pub fn byte_stream(&self) -> Vec<u8> {
        self.transmissions.lock().concat()
    }

    pub fn transmission_sizes(&self) -> Vec<usize> {
        self.transmissions.lock().iter().map(Vec::len).collect()
    }

    /// Deliver a protocol message the way the real transport would: through
    /// the handler registered at open time.
    pub fn deliver(&self, message: ProtocolMessage) {
        let handler = self
            .handler
            .lock()
            .clone()
            .expect("transport was never opened");
        handler.on_message(message);
    }
}

#[derive(Default)]
pub struct MockTransport {
    pub state: Arc<TransportState>,
}

impl Transport for MockTransport {
    fn open(
        &self,
        _endpoint: &EndpointVariant,
        _mode: RecognitionMode,
        handler: Arc<dyn ProtocolHandler>,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        *self.state.handler.lock() = Some(handler);
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

pub struct MockSession {
    state: Arc<TransportState>,
}

#[async_trait]
impl TransportSession for MockSession {
    fn set_authentication(
        &mut self,
        _method: AuthMethod,
        _credential: &str,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_language(&mut self, _language: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_model_id(&mut self, _model_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.state.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn send_audio(&self, data: Bytes) -> Result<(), TransportError> {
        // Mirror the zero-length quirk of the real send primitive.
        if data.is_empty() {
            return Err(TransportError::EmptyPayload);
        }
        if self.state.fail_sends.load(Ordering::Acquire) {
            return Err(TransportError::SendFailed("injected failure".to_string()));
        }
        self.state.transmissions.lock().push(data.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state.closed.store(true, Ordering::Release);
        self.state.connected.store(false, Ordering::Release);
        Ok(())
    }
}

// =============================================================================
// Recording sink
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    SpeechStart(u64),
    SpeechEnd(u64),
    Intermediate(u64, String),
    Final(u64, String),
    AdditionalInfo(u64, String),
    StreamDone,
    Error(u32, String),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn on_speech_start(&self, offset: u64) {
        self.events.lock().push(RecordedEvent::SpeechStart(offset));
    }

    fn on_speech_end(&self, offset: u64) {
        self.events.lock().push(RecordedEvent::SpeechEnd(offset));
    }

    fn on_intermediate_result(&self, offset: u64, result: RecoResult) {
        self.events
            .lock()
            .push(RecordedEvent::Intermediate(offset, result.text));
    }

    fn on_final_result(&self, offset: u64, result: RecoResult) {
        self.events
            .lock()
            .push(RecordedEvent::Final(offset, result.text));
    }

    fn on_additional_info(&self, offset: u64, payload: &str) {
        self.events
            .lock()
            .push(RecordedEvent::AdditionalInfo(offset, payload.to_string()));
    }

    fn on_stream_done(&self) {
        self.events.lock().push(RecordedEvent::StreamDone);
    }

    fn on_error(&self, error: &ErrorPayload) {
        self.events
            .lock()
            .push(RecordedEvent::Error(error.code, error.description.clone()));
    }
}
