//! Transmit-side frame encoding
//!
//! Builds frames the way the spacecraft does, for test vectors, benches and
//! the `pack` command:
//! 1. Block (223 bytes): length (u16 LE), routing header, control header,
//!    data region encrypted with AES-128-CBC, CRC-32 (u32 LE)
//! 2. Outer code: 32 parity bytes appended
//! 3. Sync marker prepended (259 bytes)
//! 4. Inner code from the zero state (518 bytes, 4144 bits)
//!
//! The result is one datagram. Streams additionally get differential
//! encoding, see [`assemble_stream`].

use crate::bits::unpack_bits;
use crate::constants::{
    FrameLayout, CHECKSUM_OFFSET, CONTROL_HEADER_LEN, DATA_REGION_LEN, DECODED_FRAME_LEN,
    LENGTH_FIELD_LEN, ROUTING_HEADER_LEN, RS_DATA_LEN, SYNC_MARKER,
};
use crate::error::FrameError;
use crate::fec::{InnerEncoder, OuterEncoder};
use crate::frame::checked_region;
use crate::security::{crc32, encrypt_data, CipherKey};
use bytes::{BufMut, Bytes, BytesMut};

#[cfg(feature = "fec-rs")]
use crate::fec::{ReedSolomon255, Viterbi27};

/// Builder for constructing frames
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    layout: FrameLayout,
    key: Option<CipherKey>,
    routing_header: [u8; ROUTING_HEADER_LEN],
    control_header: [u8; CONTROL_HEADER_LEN],
    payload: Bytes,
    declared_length: Option<u16>,
}

impl FrameBuilder {
    /// Secured frame encrypted under `key`
    pub fn secured(key: CipherKey) -> Self {
        Self {
            layout: FrameLayout::Secured,
            key: Some(key),
            routing_header: [0u8; ROUTING_HEADER_LEN],
            control_header: [0u8; CONTROL_HEADER_LEN],
            payload: Bytes::new(),
            declared_length: None,
        }
    }

    /// Length-prefixed frame without checksum or encryption
    pub fn plain() -> Self {
        Self {
            layout: FrameLayout::Plain,
            key: None,
            routing_header: [0u8; ROUTING_HEADER_LEN],
            control_header: [0u8; CONTROL_HEADER_LEN],
            payload: Bytes::new(),
            declared_length: None,
        }
    }

    /// Set the routing header (secured layout)
    pub fn routing_header(mut self, header: [u8; ROUTING_HEADER_LEN]) -> Self {
        self.routing_header = header;
        self
    }

    /// Set the control header (secured layout)
    pub fn control_header(mut self, header: [u8; CONTROL_HEADER_LEN]) -> Self {
        self.control_header = header;
        self
    }

    /// Set the payload
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Write `length` into the length field instead of the payload size
    pub fn declared_length(mut self, length: u16) -> Self {
        self.declared_length = Some(length);
        self
    }

    /// Build the 223-byte block fed to the outer encoder
    pub fn build_block(&self) -> Result<[u8; RS_DATA_LEN], FrameError> {
        let capacity = self.layout.capacity();
        if self.payload.len() > capacity {
            return Err(FrameError::PayloadTooLarge {
                len: self.payload.len(),
                max: capacity,
            });
        }

        let mut buf = BytesMut::with_capacity(RS_DATA_LEN);
        match self.layout {
            FrameLayout::Secured => {
                let key = self.key.as_ref().ok_or_else(|| {
                    FrameError::DecryptionUnavailable("no key material configured".to_string())
                })?;
                let mut plain = [0u8; DATA_REGION_LEN];
                plain[..self.payload.len()].copy_from_slice(&self.payload);

                buf.put_u16_le(self.declared_length.unwrap_or(self.payload.len() as u16));
                buf.put_slice(&self.routing_header);
                buf.put_slice(&self.control_header);
                buf.put_slice(&encrypt_data(key, &plain)?);
                buf.put_u32_le(0);
            }
            FrameLayout::Plain => {
                // The plain length field counts itself
                let length = (self.payload.len() + LENGTH_FIELD_LEN) as u16;
                buf.put_u16_le(self.declared_length.unwrap_or(length));
                buf.put_slice(&self.payload);
                buf.resize(RS_DATA_LEN, 0);
            }
        }

        let mut block = [0u8; RS_DATA_LEN];
        block.copy_from_slice(&buf);
        if self.layout == FrameLayout::Secured {
            let checksum = crc32(checked_region(&block));
            block[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_le_bytes());
        }
        Ok(block)
    }

    /// Build the 259-byte decoded frame: sync marker and outer codeword
    pub fn build_decoded_with<O: OuterEncoder>(&self, outer: &O) -> Result<Vec<u8>, FrameError> {
        let codeword = outer.encode_outer(&self.build_block()?)?;
        let mut frame = Vec::with_capacity(DECODED_FRAME_LEN);
        frame.extend_from_slice(&SYNC_MARKER);
        frame.extend_from_slice(&codeword);
        Ok(frame)
    }

    /// Build one convolved frame as bits (one bit per byte)
    pub fn build_bits_with<I: InnerEncoder, O: OuterEncoder>(
        &self,
        inner: &I,
        outer: &O,
    ) -> Result<Vec<u8>, FrameError> {
        let decoded = self.build_decoded_with(outer)?;
        Ok(unpack_bits(&inner.encode_inner(&decoded)))
    }

    /// Build one convolved frame with the production codecs
    #[cfg(feature = "fec-rs")]
    pub fn build_bits(&self) -> Result<Vec<u8>, FrameError> {
        self.build_bits_with(&Viterbi27::new(), &ReedSolomon255::new())
    }
}

/// Join convolved frames into a transmit stream
///
/// `idle_bits` alternating filler bits go before each frame. When
/// `differential` is set the whole stream is differentially encoded.
pub fn assemble_stream(frames: &[Vec<u8>], idle_bits: usize, differential: bool) -> Vec<u8> {
    let mut stream = Vec::new();
    for frame in frames {
        stream.extend((0..idle_bits).map(|i| (i & 1) as u8));
        stream.extend_from_slice(frame);
    }
    if differential {
        crate::differential::differential_encode(&stream)
    } else {
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DATA_OFFSET;
    use crate::frame::parse_fields;

    fn key() -> CipherKey {
        CipherKey::new([7u8; 16])
    }

    #[test]
    fn test_secured_block_layout() {
        let block = FrameBuilder::secured(key())
            .routing_header([0xa, 0xb, 0xc, 0xd])
            .control_header([1, 2, 3, 4, 5])
            .payload(&b"abc"[..])
            .build_block()
            .unwrap();

        let fields = parse_fields(&block);
        assert_eq!(fields.length, 3);
        assert_eq!(fields.routing_header.0, [0xa, 0xb, 0xc, 0xd]);
        assert_eq!(fields.control_header.0, [1, 2, 3, 4, 5]);
        assert_ne!(&block[DATA_OFFSET..DATA_OFFSET + 3], b"abc");
        assert_eq!(fields.checksum, crc32(&block[2..CHECKSUM_OFFSET]));
    }

    #[test]
    fn test_payload_too_large() {
        let result = FrameBuilder::secured(key())
            .payload(vec![0u8; DATA_REGION_LEN + 1])
            .build_block();
        assert_eq!(
            result,
            Err(FrameError::PayloadTooLarge {
                len: DATA_REGION_LEN + 1,
                max: DATA_REGION_LEN
            })
        );

        // The plain layout has room for more
        assert!(FrameBuilder::plain()
            .payload(vec![0u8; DATA_REGION_LEN + 1])
            .build_block()
            .is_ok());
    }

    #[test]
    fn test_plain_block_layout() {
        let block = FrameBuilder::plain().payload(&b"hi"[..]).build_block().unwrap();
        assert_eq!(&block[..4], &[4, 0, b'h', b'i']);
        assert!(block[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_assemble_stream_lengths() {
        let frames = vec![vec![1u8; 10], vec![0u8; 10]];
        let stream = assemble_stream(&frames, 6, false);
        assert_eq!(stream.len(), 32);
        assert_eq!(&stream[..6], &[0, 1, 0, 1, 0, 1]);
        assert_eq!(&stream[6..16], &[1u8; 10][..]);

        let encoded = assemble_stream(&frames, 6, true);
        assert_eq!(crate::differential::differential_decode(&encoded), stream);
    }

    #[cfg(feature = "fec-rs")]
    #[test]
    fn test_frame_starts_with_convolved_marker() {
        use crate::bits::bits_to_u64;
        use crate::constants::{CONVOLVED_MARKER_WORD, FRAME_BIT_LEN};

        let bits = FrameBuilder::plain().payload(&b"x"[..]).build_bits().unwrap();
        assert_eq!(bits.len(), FRAME_BIT_LEN);
        assert_eq!(bits_to_u64(&bits[..64]), CONVOLVED_MARKER_WORD);
    }
}
