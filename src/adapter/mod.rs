//! Streaming speech-recognition protocol adapter.
//!
//! Sits between a local audio capture pipeline and a remote recognition
//! service connection: audio flows in through [`RecoEngineAdapter::set_format`]
//! and [`RecoEngineAdapter::process_audio`], gets framed with a one-time
//! binary stream header, batched into service-preferred chunks, and
//! transmitted; recognition progress flows back asynchronously from the
//! transport and is translated into a linear sequence of events on the
//! consumer's [`EventSink`](crate::base::EventSink).
//!
//! ```text
//! set_format ──▶ header synthesis ─┐
//!                                  ▼
//! process_audio ──────▶ buffered writer ──────▶ transport session
//!
//! transport thread ──▶ message dispatcher ──▶ event sink
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reco_adapter::adapter::{AdapterOptions, AudioFormat, RecoEngineAdapter};
//! use reco_adapter::base::{
//!     BasicResultFactory, EventSink, PropertyId, PropertyMap, RecoResult,
//! };
//! use reco_adapter::adapter::messages::ErrorPayload;
//! use reco_adapter::transport::WsTransport;
//!
//! struct PrintSink;
//!
//! impl EventSink for PrintSink {
//!     fn on_speech_start(&self, offset: u64) {
//!         println!("speech started at {offset}");
//!     }
//!     fn on_speech_end(&self, _offset: u64) {}
//!     fn on_intermediate_result(&self, _offset: u64, result: RecoResult) {
//!         println!("partial: {}", result.text);
//!     }
//!     fn on_final_result(&self, _offset: u64, result: RecoResult) {
//!         println!("final: {}", result.text);
//!     }
//!     fn on_additional_info(&self, _offset: u64, _payload: &str) {}
//!     fn on_stream_done(&self) {
//!         println!("done");
//!     }
//!     fn on_error(&self, error: &ErrorPayload) {
//!         eprintln!("service error {}: {}", error.code, error.description);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let properties = PropertyMap::new()
//!         .with(PropertyId::SubscriptionKey, "your-subscription-key")
//!         .with(PropertyId::RecognitionLanguage, "en-US");
//!
//!     let mut adapter = RecoEngineAdapter::new(
//!         Arc::new(WsTransport),
//!         Arc::new(properties),
//!         Arc::new(PrintSink),
//!         Arc::new(BasicResultFactory),
//!         AdapterOptions::default(),
//!     );
//!
//!     adapter.init().await?;
//!     adapter.set_format(Some(&AudioFormat::pcm(16000, 1, 16))).await?;
//!
//!     let audio = vec![0u8; 3200]; // 100 ms of PCM from the capture pipeline
//!     adapter.process_audio(&audio).await?;
//!
//!     adapter.set_format(None).await?; // end of utterance: flush
//!     adapter.terminate().await?;
//!     Ok(())
//! }
//! ```

mod client;
pub mod dispatch;
mod dump;
pub mod endpoint;
pub mod header;
pub mod messages;
pub mod writer;


pub use client::{AdapterOptions, RecoEngineAdapter};
pub use dispatch::{MessageDispatcher, ProtocolHandler};
pub use endpoint::{
    AuthMethod, EndpointSelection, EndpointVariant, LEGACY_AGENT_KEYWORD, RecognitionMode,
    resolve_authentication, resolve_endpoint, resolve_recognition_mode,
};
pub use header::{
    AudioFormat, FORMAT_TAG_PCM, SERVICE_PREFERRED_BUFFER_MS, synthesize_stream_header,
};
pub use messages::ProtocolMessage;
pub use writer::{BufferedAudioWriter, WriteStrategy};
