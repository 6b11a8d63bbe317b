//! Frame decoding: FEC stages, then payload opening
//!
//! [`FrameDecoder::decode_fec`] takes one aligned convolved frame through
//! the inner decoder, the decoded-domain marker check and the outer
//! decoder. [`FrameDecoder::open`] then applies the configured
//! [`FrameLayout`]: for the secured layout the checksum is verified before
//! the data region is decrypted, so a corrupted block is never handed to
//! the cipher.

use crate::bits::pack_bits;
use crate::constants::{
    FrameLayout, DATA_REGION_LEN, DECODED_FRAME_LEN, FRAME_BIT_LEN, LENGTH_FIELD_LEN,
    RS_DATA_LEN, SYNC_MARKER_LEN,
};
use crate::error::FrameError;
use crate::fec::{InnerDecoder, OuterDecoder};
use crate::frame::{checked_region, parse_fields, read_length};
use crate::scanner::AccessCode;
use crate::security::{decrypt_data, verify_checksum, CipherKey};
use crate::types::{CorrectionCounters, DecodedFrame, DecodedPayload};
use bytes::Bytes;

#[cfg(feature = "fec-rs")]
use crate::fec::{ReedSolomon255, Viterbi27};

#[cfg(feature = "logging")]
use tracing::{debug, info, warn};

/// Decoder with the production inner and outer codecs
#[cfg(feature = "fec-rs")]
pub type StandardFrameDecoder = FrameDecoder<Viterbi27, ReedSolomon255>;

/// Decodes aligned frames with pluggable FEC services
#[derive(Debug, Clone)]
pub struct FrameDecoder<I, O> {
    inner: I,
    outer: O,
    key: Option<CipherKey>,
    layout: FrameLayout,
    decoded_code: AccessCode,
}

#[cfg(feature = "fec-rs")]
impl FrameDecoder<Viterbi27, ReedSolomon255> {
    /// Decoder using [`Viterbi27`] and [`ReedSolomon255`], secured layout, no key
    pub fn standard() -> Self {
        Self::new(Viterbi27::new(), ReedSolomon255::new())
    }
}

impl<I: InnerDecoder, O: OuterDecoder> FrameDecoder<I, O> {
    /// Create a decoder for the secured layout without key material
    pub fn new(inner: I, outer: O) -> Self {
        Self {
            inner,
            outer,
            key: None,
            layout: FrameLayout::Secured,
            decoded_code: AccessCode::DECODED,
        }
    }

    /// Set the data region key
    pub fn with_key(mut self, key: CipherKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Set or clear the data region key
    pub fn with_optional_key(mut self, key: Option<CipherKey>) -> Self {
        self.key = key;
        self
    }

    /// Select the block layout
    pub fn with_layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Override the decoded-domain marker threshold
    pub fn with_decoded_threshold(mut self, threshold: u32) -> Self {
        self.decoded_code = self.decoded_code.with_threshold(threshold);
        self
    }

    /// Active block layout
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// True when key material is configured
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Inner decode service
    pub fn inner(&self) -> &I {
        &self.inner
    }

    /// Outer decode service
    pub fn outer(&self) -> &O {
        &self.outer
    }

    /// Run both FEC stages on one convolved frame (one bit per byte)
    ///
    /// Only the first [`FRAME_BIT_LEN`] bits are used.
    pub fn decode_fec(&self, frame_bits: &[u8]) -> Result<DecodedFrame, FrameError> {
        if frame_bits.len() < FRAME_BIT_LEN {
            return Err(FrameError::IncompleteFrame {
                expected: FRAME_BIT_LEN,
                actual: frame_bits.len(),
            });
        }

        let convolved = pack_bits(&frame_bits[..FRAME_BIT_LEN]);
        let inner = self.inner.decode_inner(&convolved)?;
        if inner.bytes.len() != DECODED_FRAME_LEN {
            return Err(FrameError::InnerDecodeFailure(format!(
                "expected {} decoded bytes, got {}",
                DECODED_FRAME_LEN,
                inner.bytes.len()
            )));
        }

        let marker_matches = self
            .decoded_code
            .score_le_bytes(&inner.bytes[..SYNC_MARKER_LEN]);
        if marker_matches < self.decoded_code.threshold {
            return Err(FrameError::InnerDecodeFailure(format!(
                "decoded marker matched {} of {} bits",
                marker_matches, self.decoded_code.width
            )));
        }

        let outer = self.outer.decode_outer(&inner.bytes[SYNC_MARKER_LEN..])?;
        let block: [u8; RS_DATA_LEN] = outer.data.as_slice().try_into().map_err(|_| {
            FrameError::OuterDecodeFailure(format!(
                "expected {} data bytes, got {}",
                RS_DATA_LEN,
                outer.data.len()
            ))
        })?;

        #[cfg(feature = "logging")]
        debug!(
            "FEC decode ok: marker {}/{}, {} bits and {} symbols corrected",
            marker_matches,
            self.decoded_code.width,
            inner.corrected_bits,
            outer.corrected_symbols
        );

        Ok(DecodedFrame {
            marker_matches,
            block,
            counters: CorrectionCounters {
                inner_bits: inner.corrected_bits,
                outer_symbols: outer.corrected_symbols,
            },
        })
    }

    /// Recover the application payload from an FEC-decoded frame
    pub fn open(
        &self,
        frame: &DecodedFrame,
        offset: Option<usize>,
    ) -> Result<DecodedPayload, FrameError> {
        let payload = match self.layout {
            FrameLayout::Secured => self.open_secured(frame, offset)?,
            FrameLayout::Plain => self.open_plain(frame, offset),
        };

        #[cfg(feature = "logging")]
        info!(
            "Decoded frame at {:?}: {} bytes (inner {} bits, outer {} symbols corrected)",
            offset,
            payload.data.len(),
            payload.counters.inner_bits,
            payload.counters.outer_symbols
        );

        Ok(payload)
    }

    fn open_secured(
        &self,
        frame: &DecodedFrame,
        offset: Option<usize>,
    ) -> Result<DecodedPayload, FrameError> {
        let fields = parse_fields(&frame.block);
        verify_checksum(checked_region(&frame.block), fields.checksum)?;

        let key = self.key.as_ref().ok_or_else(|| {
            FrameError::DecryptionUnavailable("no key material configured".to_string())
        })?;
        let plaintext = decrypt_data(key, &fields.data)?;

        let declared = usize::from(fields.length);
        let truncated = declared > DATA_REGION_LEN;
        if truncated {
            #[cfg(feature = "logging")]
            warn!(
                "Declared length {} exceeds the {}-byte data region, truncating",
                declared, DATA_REGION_LEN
            );
        }

        Ok(DecodedPayload {
            offset,
            declared_length: fields.length,
            routing_header: Some(fields.routing_header),
            control_header: Some(fields.control_header),
            data: Bytes::copy_from_slice(&plaintext[..declared.min(DATA_REGION_LEN)]),
            truncated,
            counters: frame.counters,
        })
    }

    fn open_plain(&self, frame: &DecodedFrame, offset: Option<usize>) -> DecodedPayload {
        let declared = read_length(&frame.block);
        let end = usize::from(declared).clamp(LENGTH_FIELD_LEN, RS_DATA_LEN);
        let truncated = usize::from(declared) > RS_DATA_LEN;
        if truncated {
            #[cfg(feature = "logging")]
            warn!(
                "Declared length {} exceeds the {}-byte block, truncating",
                declared, RS_DATA_LEN
            );
        }

        DecodedPayload {
            offset,
            declared_length: declared,
            routing_header: None,
            control_header: None,
            data: Bytes::copy_from_slice(&frame.block[LENGTH_FIELD_LEN..end]),
            truncated,
            counters: frame.counters,
        }
    }

    /// Decode one pre-aligned datagram of [`FRAME_BIT_LEN`] bits
    ///
    /// The datagram source has already located the frame, so the
    /// convolved-domain marker is not searched for; the decoded-domain
    /// marker is still checked.
    pub fn decode_datagram(&self, bits: &[u8]) -> Result<DecodedPayload, FrameError> {
        let frame = self.decode_fec(bits)?;
        self.open(&frame, None)
    }
}
