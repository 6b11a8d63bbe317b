//! Constants and limits for the downlink frame format
//!
//! Every length below the declared payload-length field is fixed at compile
//! time. The convolved frame on the wire is the inner-encoded sync marker
//! followed by the inner-encoded outer-code block:
//!
//! ```text
//! (RS_BLOCK_LEN + SYNC_MARKER_LEN) * INNER_CODE_RATE * 8 = 4144 bits
//! ```

use serde::{Deserialize, Serialize};

/// Number of bits in a byte
pub const BITS_PER_BYTE: usize = 8;

/// Inverse rate of the inner convolutional code (rate 1/2)
pub const INNER_CODE_RATE: usize = 2;

/// Constraint length of the inner convolutional code
pub const INNER_CONSTRAINT_LEN: usize = 7;

/// First generator polynomial of the inner code
pub const INNER_POLY_A: u8 = 0x4f;

/// Second generator polynomial of the inner code (its output is inverted on the wire)
pub const INNER_POLY_B: u8 = 0x6d;

/// Outer Reed-Solomon codeword length in bytes
pub const RS_BLOCK_LEN: usize = 255;

/// Outer Reed-Solomon parity length in bytes
pub const RS_PARITY_LEN: usize = 32;

/// Outer Reed-Solomon data length in bytes
pub const RS_DATA_LEN: usize = RS_BLOCK_LEN - RS_PARITY_LEN;

/// Decoded (plain) sync marker length in bytes
pub const SYNC_MARKER_LEN: usize = 4;

/// Decoded sync marker as it appears on the wire before inner encoding.
///
/// Read little-endian this is `0xE15AE893`.
pub const SYNC_MARKER: [u8; SYNC_MARKER_LEN] = [0x93, 0xe8, 0x5a, 0xe1];

/// Decoded sync marker as a little-endian integer
pub const SYNC_MARKER_WORD: u32 = 0xe15a_e893;

/// Sync marker after inner encoding from the all-zero encoder state
pub const CONVOLVED_MARKER_WORD: u64 = 0xb9f8_b220_b1cf_12bc;

/// Width of the convolved marker in bits
pub const CONVOLVED_MARKER_BITS: u32 = 64;

/// Width of the decoded marker in bits
pub const DECODED_MARKER_BITS: u32 = 32;

/// Minimum agreeing bits for a convolved-domain marker match (~78%)
pub const CONVOLVED_MARKER_THRESHOLD: u32 = 50;

/// Minimum agreeing bits for a decoded-domain marker match (~81%)
pub const DECODED_MARKER_THRESHOLD: u32 = 26;

/// Decoded frame length: plain marker followed by one outer-code block
pub const DECODED_FRAME_LEN: usize = SYNC_MARKER_LEN + RS_BLOCK_LEN;

/// Convolved frame length in bytes
pub const FRAME_BYTE_LEN: usize = DECODED_FRAME_LEN * INNER_CODE_RATE;

/// Convolved frame length in bits
pub const FRAME_BIT_LEN: usize = FRAME_BYTE_LEN * BITS_PER_BYTE;

/// Bits the scan offset is pulled back after a decoded frame, absorbing
/// transmitter timing drift between consecutive frames
pub const RESYNC_OVERLAP_BITS: usize = 10 * BITS_PER_BYTE;

/// Size of the little-endian payload length field
pub const LENGTH_FIELD_LEN: usize = 2;

/// Size of the routing (CSP) header
pub const ROUTING_HEADER_LEN: usize = 4;

/// Size of the control header
pub const CONTROL_HEADER_LEN: usize = 5;

/// Size of the encrypted data region (a whole number of cipher blocks)
pub const DATA_REGION_LEN: usize = 208;

/// Size of the trailing CRC-32 checksum
pub const CHECKSUM_LEN: usize = 4;

/// Offset of the length field in the outer-decoded block
pub const LENGTH_OFFSET: usize = 0;

/// Offset of the routing header
pub const ROUTING_HEADER_OFFSET: usize = LENGTH_OFFSET + LENGTH_FIELD_LEN;

/// Offset of the control header
pub const CONTROL_HEADER_OFFSET: usize = ROUTING_HEADER_OFFSET + ROUTING_HEADER_LEN;

/// Offset of the data region
pub const DATA_OFFSET: usize = CONTROL_HEADER_OFFSET + CONTROL_HEADER_LEN;

/// Offset of the trailing checksum
pub const CHECKSUM_OFFSET: usize = DATA_OFFSET + DATA_REGION_LEN;

/// Cipher block size in bytes
pub const CIPHER_BLOCK_LEN: usize = 16;

/// Symmetric key length in bytes
pub const KEY_LEN: usize = 16;

/// Default UDP port used by the upstream datagram tagger
pub const DEFAULT_DATAGRAM_PORT: u16 = 52001;

const _: () = assert!(CHECKSUM_OFFSET + CHECKSUM_LEN == RS_DATA_LEN);
const _: () = assert!(DATA_REGION_LEN % CIPHER_BLOCK_LEN == 0);
const _: () = assert!(FRAME_BIT_LEN == 4144);

/// Wire layout of the outer-decoded block
///
/// One decoder instance only ever uses one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLayout {
    /// Length field, routing header, control header, encrypted data region
    /// and trailing CRC-32
    #[default]
    Secured,
    /// Length-prefixed free-form payload without checksum or encryption.
    ///
    /// The length field counts itself, so application bytes are
    /// `block[2..length]`.
    Plain,
}

impl FrameLayout {
    /// Largest number of application bytes a frame can carry
    pub const fn capacity(&self) -> usize {
        match self {
            FrameLayout::Secured => DATA_REGION_LEN,
            FrameLayout::Plain => RS_DATA_LEN - LENGTH_FIELD_LEN,
        }
    }
}
