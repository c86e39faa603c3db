//! Audio format descriptor and one-shot stream-header synthesis.
//!
//! The remote service expects each audio segment to open with a minimal
//! RIFF/WAVE-style preamble describing the samples that follow. The true
//! payload length is not known up front, so the container and data sizes are
//! written as zero placeholders; downstream consumers treat them as advisory
//! only.

use bytes::Bytes;

/// PCM format tag.
pub const FORMAT_TAG_PCM: u16 = 1;

/// Duration target, in milliseconds, used to derive the service-preferred
/// accumulation buffer size from the audio format.
pub const SERVICE_PREFERRED_BUFFER_MS: u32 = 100;

const TAG_LEN: usize = 4;
const SIZE_LEN: usize = 4;

// =============================================================================
// Audio Format Descriptor
// =============================================================================

/// Describes the audio samples of one logical utterance.
///
/// Supplied once per utterance via `set_format`; not retained beyond header
/// synthesis and buffer-capacity derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    /// Bytes per sample frame across all channels.
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Opaque extra format bytes appended verbatim to the serialized
    /// descriptor.
    pub extra: Vec<u8>,
}

impl AudioFormat {
    /// Construct a PCM format, deriving block alignment and byte rate.
    pub fn pcm(samples_per_sec: u32, channels: u16, bits_per_sample: u16) -> Self {
        let block_align = channels * (bits_per_sample / 8);
        Self {
            format_tag: FORMAT_TAG_PCM,
            channels,
            samples_per_sec,
            avg_bytes_per_sec: samples_per_sec * u32::from(block_align),
            block_align,
            bits_per_sample,
            extra: Vec::new(),
        }
    }

    /// Exact byte length of the serialized descriptor: six little-endian
    /// fixed fields plus the opaque extra bytes.
    pub fn serialized_len(&self) -> usize {
        2 + 2 + 4 + 4 + 2 + 2 + self.extra.len()
    }

    /// Service-preferred accumulation buffer capacity for this format:
    /// `samples_per_sec × block_align × 100 ms`.
    pub fn preferred_buffer_size(&self) -> usize {
        (self.samples_per_sec as usize * self.block_align as usize
            * SERVICE_PREFERRED_BUFFER_MS as usize)
            / 1000
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.format_tag.to_le_bytes());
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.samples_per_sec.to_le_bytes());
        out.extend_from_slice(&self.avg_bytes_per_sec.to_le_bytes());
        out.extend_from_slice(&self.block_align.to_le_bytes());
        out.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        out.extend_from_slice(&self.extra);
    }
}

// =============================================================================
// Header Synthesis
// =============================================================================

/// Synthesize the binary stream header for one audio segment.
///
/// Layout: `"RIFF"` + placeholder size, `"WAVE"`, `"fmt "` + exact descriptor
/// length + serialized descriptor, `"data"` + placeholder size. Byte-for-byte
/// identical output for identical input.
pub fn synthesize_stream_header(format: &AudioFormat) -> Bytes {
    let format_len = format.serialized_len();
    let header_len = TAG_LEN + SIZE_LEN        // 'RIFF' + placeholder
        + TAG_LEN                              // 'WAVE'
        + TAG_LEN + SIZE_LEN + format_len      // 'fmt ' + size + descriptor
        + TAG_LEN + SIZE_LEN; // 'data' + placeholder

    let mut out = Vec::with_capacity(header_len);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&0u32.to_le_bytes());

    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&(format_len as u32).to_le_bytes());
    format.write_into(&mut out);

    out.extend_from_slice(b"data");
    out.extend_from_slice(&0u32.to_le_bytes());

    debug_assert_eq!(out.len(), header_len);
    Bytes::from(out)
}

// =============================================================================
// Tests
// =============================================================================
