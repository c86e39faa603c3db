//! Protocol-adapter layer between a local audio capture pipeline and a remote
//! speech-recognition service connection.
//!
//! See [`adapter`] for the orchestrator and the data flow, [`transport`] for
//! the connection seam and the reference WebSocket implementation, and
//! [`base`] for the contracts shared with the consumer (event sink, result
//! factory, property lookup).

pub mod adapter;
pub mod base;
pub mod transport;

// Re-export commonly used items for convenience
pub use adapter::{
    AdapterOptions, AudioFormat, AuthMethod, EndpointSelection, EndpointVariant,
    MessageDispatcher, ProtocolHandler, ProtocolMessage, RecoEngineAdapter, RecognitionMode,
    synthesize_stream_header,
};
pub use base::{
    AdapterError, AdapterResult, BasicResultFactory, EventSink, PropertyId, PropertyLookup,
    PropertyMap, RecoResult, ResultFactory,
};
pub use transport::{Transport, TransportError, TransportSession, WsTransport};
