//! K=7, rate 1/2 convolutional code with hard-decision Viterbi decoding
//!
//! Polynomials are `0x4F` and `0x6D` applied to a shift register that takes
//! new bits at the least significant end; the second output is inverted.
//! Blocks are not terminated: the encoder starts in the zero state and the
//! decoder traces back from the best final state.

use super::{InnerDecoded, InnerDecoder, InnerEncoder};
use crate::bits::{pack_bits, unpack_bits};
use crate::constants::{INNER_CODE_RATE, INNER_CONSTRAINT_LEN, INNER_POLY_A, INNER_POLY_B};
use crate::error::FrameError;

const NUM_STATES: usize = 1 << (INNER_CONSTRAINT_LEN - 1);
const REGISTER_MASK: u8 = (1 << INNER_CONSTRAINT_LEN) - 1;
const UNREACHED: u32 = u32::MAX / 2;

fn parity(x: u8) -> u8 {
    (x.count_ones() & 1) as u8
}

/// Channel symbols for a full 7-bit register
fn branch_symbols(register: u8) -> [u8; INNER_CODE_RATE] {
    [
        parity(register & INNER_POLY_A),
        parity(register & INNER_POLY_B) ^ 1,
    ]
}

/// Convolve a bit sequence (one bit per byte) from the zero state
pub fn convolve_bits(bits: &[u8]) -> Vec<u8> {
    let mut register = 0u8;
    let mut out = Vec::with_capacity(bits.len() * INNER_CODE_RATE);
    for &bit in bits {
        register = ((register << 1) | (bit & 1)) & REGISTER_MASK;
        out.extend_from_slice(&branch_symbols(register));
    }
    out
}

/// Hard-decision Viterbi decoder for the downlink's inner code
#[derive(Debug, Clone, Copy, Default)]
pub struct Viterbi27;

impl Viterbi27 {
    /// Create a decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode channel symbols (one bit per byte) into data bits
    fn decode_bits(&self, symbols: &[u8]) -> Vec<u8> {
        let steps = symbols.len() / INNER_CODE_RATE;

        let mut metrics = [UNREACHED; NUM_STATES];
        metrics[0] = 0;
        // One bit per state per step: which predecessor survived
        let mut decisions: Vec<u64> = Vec::with_capacity(steps);

        for pair in symbols.chunks_exact(INNER_CODE_RATE) {
            let mut next = [UNREACHED; NUM_STATES];
            let mut survivors = 0u64;

            for (state, slot) in next.iter_mut().enumerate() {
                let mut best = u32::MAX;
                let mut choice = 0usize;

                for oldest in 0..2usize {
                    let prev = (state >> 1) | (oldest << (INNER_CONSTRAINT_LEN - 2));
                    let register = (state | (oldest << (INNER_CONSTRAINT_LEN - 1))) as u8;
                    let expected = branch_symbols(register);
                    let distance = u32::from(expected[0] ^ (pair[0] & 1))
                        + u32::from(expected[1] ^ (pair[1] & 1));
                    let metric = metrics[prev].saturating_add(distance);
                    if metric < best {
                        best = metric;
                        choice = oldest;
                    }
                }

                *slot = best;
                if choice == 1 {
                    survivors |= 1 << state;
                }
            }

            metrics = next;
            decisions.push(survivors);
        }

        let mut state = metrics
            .iter()
            .enumerate()
            .min_by_key(|(_, &m)| m)
            .map(|(s, _)| s)
            .unwrap_or(0);

        let mut bits = vec![0u8; steps];
        for (step, survivors) in decisions.iter().enumerate().rev() {
            bits[step] = (state & 1) as u8;
            let oldest = ((survivors >> state) & 1) as usize;
            state = (state >> 1) | (oldest << (INNER_CONSTRAINT_LEN - 2));
        }
        bits
    }
}

impl InnerEncoder for Viterbi27 {
    fn encode_inner(&self, data: &[u8]) -> Vec<u8> {
        pack_bits(&convolve_bits(&unpack_bits(data)))
    }
}

impl InnerDecoder for Viterbi27 {
    fn decode_inner(&self, convolved: &[u8]) -> Result<InnerDecoded, FrameError> {
        if convolved.is_empty() || convolved.len() % INNER_CODE_RATE != 0 {
            return Err(FrameError::InnerDecodeFailure(format!(
                "convolved block of {} bytes is not a whole number of symbol pairs",
                convolved.len()
            )));
        }

        let symbols = unpack_bits(convolved);
        let bits = self.decode_bits(&symbols);

        // Corrections are the symbols that disagree with the survivor path
        let corrected_bits = convolve_bits(&bits)
            .iter()
            .zip(&symbols)
            .filter(|(a, b)| a != b)
            .count();

        Ok(InnerDecoded {
            bytes: pack_bits(&bits),
            corrected_bits,
        })
    }
}
