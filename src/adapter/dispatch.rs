//! Asynchronous message dispatch.
//!
//! The transport delivers inbound protocol messages on a thread it controls;
//! the dispatcher routes each arrival synchronously to exactly one handler
//! method and emits the corresponding recognition event to the consumer's
//! event sink. There is no polling and no buffering: an event either reaches
//! the sink inside the dispatch call or (after shutdown) is dropped.
//!
//! Routing table:
//!
//! | Inbound message    | Emitted event                       |
//! |--------------------|-------------------------------------|
//! | speech.start       | `on_speech_start(offset)`           |
//! | speech.end         | `on_speech_end(offset)`             |
//! | speech.hypothesis  | `on_intermediate_result(offset, r)` |
//! | speech.fragment    | `on_intermediate_result(offset, r)` |
//! | speech.phrase      | `on_final_result(offset, r)`        |
//! | turn.start         | `on_additional_info(0, tag)`        |
//! | turn.end           | `on_stream_done()`                  |
//! | error              | `on_error(payload)`                 |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::adapter::messages::{
    ErrorPayload, FragmentMessage, HypothesisMessage, PhraseMessage, ProtocolMessage,
    SpeechEndMessage, SpeechStartMessage, TurnStartMessage,
};
use crate::base::{EventSink, ResultFactory};

// =============================================================================
// Protocol Handler
// =============================================================================

/// Receiver interface the transport invokes, one method per message kind.
///
/// Implementations must not block on further protocol I/O: re-entering the
/// transport from within a handler can deadlock the receive loop.
pub trait ProtocolHandler: Send + Sync {
    fn on_speech_start(&self, message: SpeechStartMessage);
    fn on_speech_end(&self, message: SpeechEndMessage);
    fn on_hypothesis(&self, message: HypothesisMessage);
    fn on_fragment(&self, message: FragmentMessage);
    fn on_phrase(&self, message: PhraseMessage);
    fn on_turn_start(&self, message: TurnStartMessage);
    fn on_turn_end(&self);
    fn on_error(&self, error: ErrorPayload);

    /// Route a parsed message to the matching handler method.
    fn on_message(&self, message: ProtocolMessage) {
        match message {
            ProtocolMessage::SpeechStart(m) => self.on_speech_start(m),
            ProtocolMessage::SpeechEnd(m) => self.on_speech_end(m),
            ProtocolMessage::Hypothesis(m) => self.on_hypothesis(m),
            ProtocolMessage::Fragment(m) => self.on_fragment(m),
            ProtocolMessage::Phrase(m) => self.on_phrase(m),
            ProtocolMessage::TurnStart(m) => self.on_turn_start(m),
            ProtocolMessage::TurnEnd => self.on_turn_end(),
            ProtocolMessage::Error(e) => self.on_error(e),
        }
    }
}

// =============================================================================
// Message Dispatcher
// =============================================================================

/// Routes inbound protocol messages to the consumer's event sink.
///
/// After [`shutdown`](Self::shutdown) the sink is detached: messages still in
/// flight on the transport thread are dropped with a log line and can never
/// reach the consumer.
pub struct MessageDispatcher {
    sink: Mutex<Option<Arc<dyn EventSink>>>,
    factory: Arc<dyn ResultFactory>,
    terminated: AtomicBool,
}

impl MessageDispatcher {
    pub fn new(sink: Arc<dyn EventSink>, factory: Arc<dyn ResultFactory>) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
            factory,
            terminated: AtomicBool::new(false),
        }
    }

    /// Stop dispatching. Idempotent; called from the terminate path before
    /// the transport session is closed.
    pub fn shutdown(&self) {
        self.terminated.store(true, Ordering::Release);
        self.sink.lock().take();
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// The sink, unless dispatch has been shut down.
    fn live_sink(&self, kind: &'static str) -> Option<Arc<dyn EventSink>> {
        if self.terminated.load(Ordering::Acquire) {
            debug!(kind, "dropping message received after termination");
            return None;
        }
        self.sink.lock().clone()
    }
}

impl ProtocolHandler for MessageDispatcher {
    fn on_speech_start(&self, message: SpeechStartMessage) {
        let Some(sink) = self.live_sink("speech.startDetected") else {
            return;
        };
        debug!(offset = message.offset, "speech start detected");
        sink.on_speech_start(message.offset);
    }

    fn on_speech_end(&self, message: SpeechEndMessage) {
        let Some(sink) = self.live_sink("speech.endDetected") else {
            return;
        };
        debug!(offset = message.offset, "speech end detected");
        sink.on_speech_end(message.offset);
    }

    fn on_hypothesis(&self, message: HypothesisMessage) {
        let Some(sink) = self.live_sink("speech.hypothesis") else {
            return;
        };
        debug!(
            offset = message.offset,
            duration = message.duration,
            text = %message.text,
            "speech hypothesis"
        );
        let result = self.factory.create_intermediate_result(&message.text);
        sink.on_intermediate_result(message.offset, result);
    }

    fn on_fragment(&self, message: FragmentMessage) {
        // Fragments are routed identically to hypotheses.
        let Some(sink) = self.live_sink("speech.fragment") else {
            return;
        };
        debug!(
            offset = message.offset,
            duration = message.duration,
            text = %message.text,
            "speech fragment"
        );
        let result = self.factory.create_intermediate_result(&message.text);
        sink.on_intermediate_result(message.offset, result);
    }

    fn on_phrase(&self, message: PhraseMessage) {
        let Some(sink) = self.live_sink("speech.phrase") else {
            return;
        };
        // The status code is carried but not interpreted.
        debug!(
            offset = message.offset,
            status = message.recognition_status,
            text = %message.display_text,
            "final phrase"
        );
        let result = self.factory.create_final_result(&message.display_text);
        sink.on_final_result(message.offset, result);
    }

    fn on_turn_start(&self, message: TurnStartMessage) {
        let Some(sink) = self.live_sink("turn.start") else {
            return;
        };
        debug!(tag = %message.context.service_tag, "turn started");
        sink.on_additional_info(0, &message.context.service_tag);
    }

    fn on_turn_end(&self) {
        let Some(sink) = self.live_sink("turn.end") else {
            return;
        };
        debug!("turn ended");
        sink.on_stream_done();
    }

    fn on_error(&self, payload: ErrorPayload) {
        let Some(sink) = self.live_sink("error") else {
            return;
        };
        error!(code = payload.code, description = %payload.description, "service error");
        sink.on_error(&payload);
    }
}

// =============================================================================
// Tests
// =============================================================================
