//! Forward Error Correction adapters
//!
//! The concatenated code is treated as two black-box services behind a
//! uniform contract: bytes in, corrected bytes plus a correction count out,
//! or a failure. A failure aborts the current frame attempt, never the scan,
//! and is never retried.
//!
//! Production bindings are [`Viterbi27`] for the inner code and, with the
//! `fec-rs` feature, [`ReedSolomon255`] for the outer code. The [`fixture`]
//! module holds deterministic doubles for protocol tests.

use crate::error::FrameError;

pub mod fixture;
#[cfg(feature = "fec-rs")]
mod reed_solomon;
mod viterbi;

#[cfg(feature = "fec-rs")]
pub use reed_solomon::ReedSolomon255;
pub use viterbi::Viterbi27;

/// Output of the inner (convolutional) decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerDecoded {
    /// Decoded bytes, half the length of the convolved input
    pub bytes: Vec<u8>,
    /// Channel bits the decoder corrected
    pub corrected_bits: usize,
}

/// Output of the outer (block) decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterDecoded {
    /// Corrected data bytes with parity stripped
    pub data: Vec<u8>,
    /// Symbols the decoder corrected
    pub corrected_symbols: usize,
}

/// Inner decode service
pub trait InnerDecoder {
    /// Decode a convolved block packed MSB-first
    fn decode_inner(&self, convolved: &[u8]) -> Result<InnerDecoded, FrameError>;
}

/// Outer decode service
pub trait OuterDecoder {
    /// Decode one outer-code block (sync marker already stripped)
    fn decode_outer(&self, block: &[u8]) -> Result<OuterDecoded, FrameError>;
}

/// Inner encode service, used to build transmit-side frames
pub trait InnerEncoder {
    /// Convolve `data`, returning packed bytes of twice the length
    fn encode_inner(&self, data: &[u8]) -> Vec<u8>;
}

/// Outer encode service, used to build transmit-side frames
pub trait OuterEncoder {
    /// Append parity to one block of data
    fn encode_outer(&self, data: &[u8]) -> Result<Vec<u8>, FrameError>;
}

impl<T: InnerDecoder + ?Sized> InnerDecoder for &T {
    fn decode_inner(&self, convolved: &[u8]) -> Result<InnerDecoded, FrameError> {
        (**self).decode_inner(convolved)
    }
}

impl<T: OuterDecoder + ?Sized> OuterDecoder for &T {
    fn decode_outer(&self, block: &[u8]) -> Result<OuterDecoded, FrameError> {
        (**self).decode_outer(block)
    }
}

impl<T: InnerDecoder + ?Sized> InnerDecoder for Box<T> {
    fn decode_inner(&self, convolved: &[u8]) -> Result<InnerDecoded, FrameError> {
        (**self).decode_inner(convolved)
    }
}

impl<T: OuterDecoder + ?Sized> OuterDecoder for Box<T> {
    fn decode_outer(&self, block: &[u8]) -> Result<OuterDecoded, FrameError> {
        (**self).decode_outer(block)
    }
}
