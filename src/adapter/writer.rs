//! Buffered audio writer.
//!
//! Turns an arbitrary sequence of variable-length audio writes (including the
//! stream header, which is just an initial synthetic write) into a sequence
//! of fixed-size transmissions, amortizing transport overhead while
//! preserving byte order exactly.
//!
//! The accumulation buffer is owned exclusively by this writer and only
//! touched from the audio-producing path; it is never shared with message
//! dispatch.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::adapter::dump::AudioDump;
use crate::transport::{TransportError, TransportSession};

// =============================================================================
// Write Strategy
// =============================================================================

/// How audio writes reach the transport. Chosen once at configuration time,
/// not re-decided per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteStrategy {
    /// Accumulate into a fixed-capacity buffer; transmit full buffers.
    #[default]
    Buffered,
    /// Forward every write to the transport immediately.
    PassThrough,
}

// =============================================================================
// Buffered Audio Writer
// =============================================================================

/// Accumulates audio bytes and flushes fixed-size chunks to the transport.
///
/// Capacity is derived from the audio format
/// ([`AudioFormat::preferred_buffer_size`](crate::adapter::header::AudioFormat::preferred_buffer_size));
/// until a format is set the capacity is zero and every write passes through
/// unbuffered.
pub struct BufferedAudioWriter {
    strategy: WriteStrategy,
    capacity: usize,
    buffer: Option<Box<[u8]>>,
    filled: usize,
    dump: Option<AudioDump>,
}

impl BufferedAudioWriter {
    pub fn new(strategy: WriteStrategy) -> Self {
        Self {
            strategy,
            capacity: 0,
            buffer: None,
            filled: 0,
            dump: None,
        }
    }

    /// Set the accumulation capacity for subsequent allocations. An already
    /// allocated buffer keeps its size until the next flush releases it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently retained in the accumulation buffer.
    pub fn buffered(&self) -> usize {
        self.filled
    }

    pub(crate) fn attach_dump(&mut self, dump: Option<AudioDump>) {
        self.dump = dump;
    }

    pub(crate) fn close_dump(&mut self) {
        if let Some(dump) = self.dump.take() {
            dump.finish();
        }
    }

    /// Write audio bytes. Zero-byte writes are no-ops.
    pub async fn write(
        &mut self,
        session: &dyn TransportSession,
        data: &[u8],
    ) -> Result<(), TransportError> {
        if data.is_empty() {
            return Ok(());
        }

        if self.strategy == WriteStrategy::PassThrough || self.capacity == 0 {
            return self.transmit(session, data).await;
        }

        self.write_buffered(session, data, false).await
    }

    /// Transmit whatever is accumulated and release the buffer. A flush with
    /// nothing buffered produces zero transmissions.
    pub async fn flush(&mut self, session: &dyn TransportSession) -> Result<(), TransportError> {
        if self.strategy == WriteStrategy::PassThrough || self.capacity == 0 {
            return Ok(());
        }

        self.write_buffered(session, &[], true).await
    }

    async fn write_buffered(
        &mut self,
        session: &dyn TransportSession,
        mut data: &[u8],
        flush: bool,
    ) -> Result<(), TransportError> {
        loop {
            let buffer_full =
                self.buffer.is_some() && self.filled == self.buffer.as_ref().map_or(0, |b| b.len());

            if flush || buffer_full {
                if self.filled > 0 {
                    // Move the buffer out so the transmit borrow does not
                    // alias the dump mirror.
                    let buffer = self.buffer.take().expect("filled implies allocated");
                    let result = self.transmit(session, &buffer[..self.filled]).await;
                    self.buffer = Some(buffer);
                    result?;
                }
                self.filled = 0;
            }

            if flush {
                self.buffer = None;
                self.filled = 0;
            }

            if data.is_empty() {
                break;
            }

            let capacity = self.capacity;
            let buffer = self
                .buffer
                .get_or_insert_with(|| vec![0u8; capacity].into_boxed_slice());

            let remaining = buffer.len() - self.filled;
            let n = data.len().min(remaining);
            buffer[self.filled..self.filled + n].copy_from_slice(&data[..n]);
            self.filled += n;
            data = &data[n..];
        }

        Ok(())
    }

    /// Send one chunk to the transport, mirroring it to the diagnostic dump.
    ///
    /// A zero-length rejection is swallowed when the chunk really was empty;
    /// the send primitive rejects empty payloads even though an empty send is
    /// the only way some transports express a flush.
    async fn transmit(
        &mut self,
        session: &dyn TransportSession,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        trace!(len = bytes.len(), "transmitting audio chunk");

        match session.send_audio(Bytes::copy_from_slice(bytes)).await {
            Err(TransportError::EmptyPayload) if bytes.is_empty() => {}
            Err(e) => {
                debug!(error = %e, "audio transmission failed");
                return Err(e);
            }
            Ok(()) => {}
        }

        if let Some(dump) = self.dump.as_mut() {
            dump.write(bytes);
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
