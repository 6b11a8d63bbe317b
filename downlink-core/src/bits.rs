//! Bit buffers and bit/byte packing
//!
//! Bits are stored one per byte (`0` or `1`), the way the demodulator's
//! slicer delivers them. Packing is most-significant-bit first per byte,
//! matching the transmitter.

use crate::constants::BITS_PER_BYTE;

/// Slice BPSK soft symbols into hard-decision bits (`v >= 0.0` is a one)
///
/// A squelched `0.0` slices to one; see `StreamConfig::idle_reset_symbols`.
pub fn hard_decisions(symbols: &[f32]) -> Vec<u8> {
    symbols.iter().map(|&v| u8::from(v >= 0.0)).collect()
}

/// Pack bits MSB-first into bytes
///
/// A trailing partial byte is zero-padded on the right.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(BITS_PER_BYTE)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (j, &bit)| acc | ((bit & 1) << (7 - j)))
        })
        .collect()
}

/// Unpack bytes into bits, MSB first
pub fn unpack_bits(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * BITS_PER_BYTE);
    for &byte in bytes {
        for j in (0..BITS_PER_BYTE).rev() {
            bits.push((byte >> j) & 1);
        }
    }
    bits
}

/// Pack up to 64 bits MSB-first into an integer
pub fn bits_to_u64(bits: &[u8]) -> u64 {
    debug_assert!(bits.len() <= 64);
    bits.iter().fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit & 1))
}

/// Append-only bit buffer with an absolute position for its first bit
///
/// The stream orchestrator drops bits it can never rescan; `base` keeps
/// reported offsets absolute since the last reset.
#[derive(Debug, Clone, Default)]
pub struct BitStream {
    bits: Vec<u8>,
    base: usize,
}

impl BitStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bits (only the lowest bit of each byte is kept)
    pub fn extend(&mut self, bits: &[u8]) {
        self.bits.extend(bits.iter().map(|b| b & 1));
    }

    /// Bits currently held
    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    /// Number of bits currently held
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True when no bits are held
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Absolute position of the first held bit
    pub fn base(&self) -> usize {
        self.base
    }

    /// Absolute position one past the last held bit
    pub fn end(&self) -> usize {
        self.base + self.bits.len()
    }

    /// Drop every bit before absolute position `position`
    pub fn discard_before(&mut self, position: usize) {
        let local = position.saturating_sub(self.base).min(self.bits.len());
        if local > 0 {
            self.bits.drain(..local);
            self.base += local;
        }
    }

    /// Discard all bits and restart absolute positions at zero
    pub fn reset(&mut self) {
        self.bits.clear();
        self.base = 0;
    }
}
