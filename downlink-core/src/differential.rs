//! Differential bit decoding
//!
//! The transmitter differentially encodes so the receiver never has to
//! resolve the 180° phase ambiguity of the BPSK carrier. Each output bit is
//! the XOR of the current and previous *input* bit; the previous bit starts
//! at zero.

/// Differential decoder carrying the previous input bit across calls
///
/// Decoding a buffer in chunks gives the same result as decoding it whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferentialDecoder {
    prev: u8,
}

impl DifferentialDecoder {
    /// Create a decoder whose previous bit is zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk of bits
    pub fn decode(&mut self, bits: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bits.len());
        for &bit in bits {
            let bit = bit & 1;
            out.push(bit ^ self.prev);
            self.prev = bit;
        }
        out
    }

    /// Forget the carried bit
    pub fn reset(&mut self) {
        self.prev = 0;
    }
}

/// Decode a whole bit sequence
pub fn differential_decode(bits: &[u8]) -> Vec<u8> {
    DifferentialDecoder::new().decode(bits)
}

/// Transmitter-side differential encoding: `out[i] = in[i] ^ out[i-1]`
pub fn differential_encode(bits: &[u8]) -> Vec<u8> {
    let mut prev = 0u8;
    bits.iter()
        .map(|&bit| {
            prev ^= bit & 1;
            prev
        })
        .collect()
}
