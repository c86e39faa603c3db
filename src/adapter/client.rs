//! Recognition engine adapter orchestrator.
//!
//! Owns the session lifecycle, wires the endpoint resolver, header
//! synthesizer, buffered writer, and message dispatcher together, and exposes
//! the public entry points: `init`, `terminate`, `set_format`, and
//! `process_audio`.
//!
//! Two independent activity streams touch an adapter: the producer feeding
//! audio through `set_format`/`process_audio` (serialized by `&mut self`),
//! and the transport delivering inbound messages to the dispatcher on its
//! own thread. The two paths share no buffer state; the only cross-thread
//! lifecycle signal is the dispatcher's terminated flag, which flips before
//! the transport session is closed so that messages arriving mid-teardown
//! are dropped, not dispatched.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::adapter::dispatch::{MessageDispatcher, ProtocolHandler};
use crate::adapter::dump::AudioDump;
use crate::adapter::endpoint::EndpointSelection;
use crate::adapter::header::{AudioFormat, synthesize_stream_header};
use crate::adapter::writer::{BufferedAudioWriter, WriteStrategy};
use crate::base::{
    AdapterError, AdapterResult, EventSink, PropertyId, PropertyLookup, ResultFactory,
};
use crate::transport::{Transport, TransportSession};

// =============================================================================
// Options
// =============================================================================

/// Configuration applied once at adapter construction.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// Accumulate audio into the service-preferred buffer size before
    /// transmitting. When false every write is forwarded immediately.
    pub buffered_writes: bool,

    /// Mirror all transmitted audio (header included) into a file in this
    /// directory, named by the adapter's session id.
    pub audio_dump_dir: Option<PathBuf>,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            buffered_writes: true,
            audio_dump_dir: None,
        }
    }
}

// =============================================================================
// Adapter
// =============================================================================

/// The adapter binding one audio producer to one remote recognition session.
///
/// Exactly one transport session exists per adapter instance; the adapter is
/// either fully unconnected or fully connected, and a partially-configured
/// session never transmits.
pub struct RecoEngineAdapter {
    transport: Arc<dyn Transport>,
    properties: Arc<dyn PropertyLookup>,
    dispatcher: Arc<MessageDispatcher>,
    options: AdapterOptions,
    session_id: String,
    session: Option<Box<dyn TransportSession>>,
    writer: BufferedAudioWriter,
    terminated: bool,
}

impl RecoEngineAdapter {
    pub fn new(
        transport: Arc<dyn Transport>,
        properties: Arc<dyn PropertyLookup>,
        sink: Arc<dyn EventSink>,
        factory: Arc<dyn ResultFactory>,
        options: AdapterOptions,
    ) -> Self {
        let strategy = if options.buffered_writes {
            WriteStrategy::Buffered
        } else {
            WriteStrategy::PassThrough
        };

        Self {
            transport,
            properties,
            dispatcher: Arc::new(MessageDispatcher::new(sink, factory)),
            options,
            session_id: Uuid::new_v4().to_string(),
            session: None,
            writer: BufferedAudioWriter::new(strategy),
            terminated: false,
        }
    }

    /// Unique id of this adapter instance, used for diagnostics.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Resolve the endpoint and connect the transport session.
    ///
    /// Resolution happens against the properties as they are now; an
    /// unresolvable recognition mode or missing credential is fatal to
    /// session start. Authentication, language, and model id are applied in
    /// that order, each only when configured, before the connection is
    /// finalized.
    pub async fn init(&mut self) -> AdapterResult<()> {
        if self.terminated {
            return Err(AdapterError::Lifecycle(
                "adapter has been terminated".to_string(),
            ));
        }
        if self.session.is_some() {
            return Err(AdapterError::Lifecycle(
                "adapter is already initialized".to_string(),
            ));
        }

        let selection = EndpointSelection::from_properties(&*self.properties);
        selection.validate()?;
        debug!(
            session_id = %self.session_id,
            variant = ?selection.variant,
            mode = %selection.mode,
            "endpoint resolved"
        );

        let handler: Arc<dyn ProtocolHandler> = self.dispatcher.clone();
        let mut session = self
            .transport
            .open(&selection.variant, selection.mode, handler)?;

        if let Some((method, credential)) = &selection.auth {
            session.set_authentication(*method, credential)?;
        }

        let language = self.properties.get_string(PropertyId::RecognitionLanguage);
        if !language.is_empty() {
            session.set_language(&language)?;
        }

        let model_id = self.properties.get_string(PropertyId::CustomModelId);
        if !model_id.is_empty() {
            session.set_model_id(&model_id)?;
        }

        session.connect().await?;

        if let Some(dir) = &self.options.audio_dump_dir {
            self.writer
                .attach_dump(AudioDump::create(dir, &self.session_id));
        }

        self.session = Some(session);
        info!(session_id = %self.session_id, "recognition session connected");
        Ok(())
    }

    /// Begin a new audio segment (`Some`) or end the current one (`None`).
    ///
    /// A format seeds the writer with the service-preferred buffer capacity
    /// and sends the synthesized stream header through the writer as the
    /// segment's first bytes. `None` signals "no more audio": the
    /// accumulated remainder is drained to the transport and the buffer is
    /// released.
    pub async fn set_format(&mut self, format: Option<&AudioFormat>) -> AdapterResult<()> {
        let session = self.session.as_deref().ok_or_else(|| {
            AdapterError::Lifecycle("set_format called before init".to_string())
        })?;

        match format {
            Some(format) => {
                self.writer.set_capacity(format.preferred_buffer_size());
                let header = synthesize_stream_header(format);
                debug!(
                    session_id = %self.session_id,
                    header_len = header.len(),
                    capacity = self.writer.capacity(),
                    "audio segment opened"
                );
                self.writer.write(session, &header).await?;
            }
            None => {
                debug!(session_id = %self.session_id, "audio segment flushed");
                self.writer.flush(session).await?;
            }
        }

        Ok(())
    }

    /// Feed audio bytes into the current segment.
    pub async fn process_audio(&mut self, data: &[u8]) -> AdapterResult<()> {
        let session = self.session.as_deref().ok_or_else(|| {
            AdapterError::Lifecycle("process_audio called before init".to_string())
        })?;

        self.writer.write(session, data).await?;
        Ok(())
    }

    /// Tear the session down.
    ///
    /// Dispatch stops first so that messages in flight are dropped rather
    /// than delivered during teardown; the accumulated audio is then drained,
    /// the transport closed, and the diagnostic dump finished. The adapter is
    /// unusable afterward.
    pub async fn terminate(&mut self) -> AdapterResult<()> {
        let mut session = self.session.take().ok_or_else(|| {
            AdapterError::Lifecycle("terminate called on an uninitialized adapter".to_string())
        })?;

        self.dispatcher.shutdown();

        let flush_result = self.writer.flush(session.as_ref()).await;
        let close_result = session.close().await;
        self.writer.close_dump();
        self.terminated = true;

        info!(session_id = %self.session_id, "recognition session terminated");
        flush_result.and(close_result)?;
        Ok(())
    }
}
