//! RS(255,223) outer code over GF(2^8)
//!
//! Field arithmetic comes from `reed_solomon_erasure::galois_8` (primitive
//! polynomial 0x11D, generator 2). The erasure coder in that crate only
//! rebuilds shards at known positions, so error location is done here:
//! syndromes, Berlekamp-Massey, Chien search and Forney's formula.
//!
//! Codewords are systematic, data first and parity last, with the first
//! byte as the highest-degree coefficient. Generator roots are
//! `2^1 ..= 2^32`.

use super::{OuterDecoded, OuterDecoder, OuterEncoder};
use crate::constants::{RS_BLOCK_LEN, RS_DATA_LEN, RS_PARITY_LEN};
use crate::error::FrameError;
use reed_solomon_erasure::galois_8::{div, exp, mul};

const ALPHA: u8 = 2;
const FIELD_ORDER: usize = 255;

/// Evaluate a polynomial stored lowest degree first
fn eval_low_first(poly: &[u8], x: u8) -> u8 {
    poly.iter().rev().fold(0u8, |acc, &c| mul(acc, x) ^ c)
}

/// Reed-Solomon codec with 32 parity symbols
#[derive(Debug, Clone)]
pub struct ReedSolomon255 {
    parity_len: usize,
    /// Generator polynomial, highest degree first, monic
    generator: Vec<u8>,
}

impl ReedSolomon255 {
    /// Create the downlink's RS(255,223) codec
    pub fn new() -> Self {
        let parity_len = RS_PARITY_LEN;
        let mut generator = vec![1u8];
        for i in 0..parity_len {
            let root = exp(ALPHA, i + 1);
            let mut next = generator.clone();
            next.push(0);
            for (j, &g) in generator.iter().enumerate() {
                next[j + 1] ^= mul(g, root);
            }
            generator = next;
        }

        Self {
            parity_len,
            generator,
        }
    }

    /// Maximum number of symbol errors a block can carry and still decode
    pub fn capacity(&self) -> usize {
        self.parity_len / 2
    }

    fn syndromes(&self, codeword: &[u8]) -> Vec<u8> {
        (0..self.parity_len)
            .map(|j| {
                let x = exp(ALPHA, j + 1);
                codeword.iter().fold(0u8, |acc, &c| mul(acc, x) ^ c)
            })
            .collect()
    }

    /// Berlekamp-Massey: error locator polynomial, lowest degree first
    fn error_locator(&self, syndromes: &[u8]) -> Vec<u8> {
        let n = self.parity_len;
        let mut locator = vec![0u8; n + 1];
        let mut previous = vec![0u8; n + 1];
        locator[0] = 1;
        previous[0] = 1;

        let mut errors = 0usize;
        let mut shift = 1usize;
        let mut last_discrepancy = 1u8;

        for step in 0..n {
            let mut discrepancy = syndromes[step];
            for i in 1..=errors {
                discrepancy ^= mul(locator[i], syndromes[step - i]);
            }

            if discrepancy == 0 {
                shift += 1;
                continue;
            }

            let scale = div(discrepancy, last_discrepancy);
            let saved = locator.clone();
            for i in 0..=(n - shift) {
                locator[i + shift] ^= mul(scale, previous[i]);
            }

            if 2 * errors <= step {
                errors = step + 1 - errors;
                previous = saved;
                last_discrepancy = discrepancy;
                shift = 1;
            } else {
                shift += 1;
            }
        }

        locator.truncate(errors + 1);
        locator
    }

    fn correct(&self, codeword: &mut [u8]) -> Result<usize, FrameError> {
        let syndromes = self.syndromes(codeword);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        let locator = self.error_locator(&syndromes);
        let errors = locator.len() - 1;
        if errors > self.capacity() {
            return Err(FrameError::OuterDecodeFailure(format!(
                "{} symbol errors exceed capacity {}",
                errors,
                self.capacity()
            )));
        }

        // Error evaluator: S(x) * locator(x) mod x^parity_len
        let mut evaluator = vec![0u8; self.parity_len];
        for (i, slot) in evaluator.iter_mut().enumerate() {
            for j in 0..=i.min(errors) {
                *slot ^= mul(syndromes[i - j], locator[j]);
            }
        }

        // Formal derivative keeps only the odd-degree terms
        let derivative: Vec<u8> = (1..locator.len())
            .map(|i| if i % 2 == 1 { locator[i] } else { 0 })
            .collect();

        let n = codeword.len();
        let mut found = 0usize;
        for power in 0..n {
            let x_inv = exp(ALPHA, (FIELD_ORDER - power) % FIELD_ORDER);
            if eval_low_first(&locator, x_inv) != 0 {
                continue;
            }

            let denominator = eval_low_first(&derivative, x_inv);
            if denominator == 0 {
                return Err(FrameError::OuterDecodeFailure(
                    "degenerate error locator".to_string(),
                ));
            }
            codeword[n - 1 - power] ^= div(eval_low_first(&evaluator, x_inv), denominator);
            found += 1;
        }

        if found != errors {
            return Err(FrameError::OuterDecodeFailure(format!(
                "locator has {} roots for {} errors",
                found, errors
            )));
        }
        if self.syndromes(codeword).iter().any(|&s| s != 0) {
            return Err(FrameError::OuterDecodeFailure(
                "residual syndrome after correction".to_string(),
            ));
        }

        Ok(errors)
    }
}

impl Default for ReedSolomon255 {
    fn default() -> Self {
        Self::new()
    }
}

impl OuterDecoder for ReedSolomon255 {
    fn decode_outer(&self, block: &[u8]) -> Result<OuterDecoded, FrameError> {
        if block.len() != RS_BLOCK_LEN {
            return Err(FrameError::OuterDecodeFailure(format!(
                "expected a {}-byte block, got {}",
                RS_BLOCK_LEN,
                block.len()
            )));
        }

        let mut codeword = block.to_vec();
        let corrected_symbols = self.correct(&mut codeword)?;
        codeword.truncate(RS_DATA_LEN);

        Ok(OuterDecoded {
            data: codeword,
            corrected_symbols,
        })
    }
}

impl OuterEncoder for ReedSolomon255 {
    fn encode_outer(&self, data: &[u8]) -> Result<Vec<u8>, FrameError> {
        if data.len() != RS_DATA_LEN {
            return Err(FrameError::PayloadTooLarge {
                len: data.len(),
                max: RS_DATA_LEN,
            });
        }

        // Remainder of data * x^parity_len divided by the generator
        let mut remainder = vec![0u8; self.parity_len];
        for &byte in data {
            let factor = byte ^ remainder[0];
            remainder.rotate_left(1);
            remainder[self.parity_len - 1] = 0;
            if factor != 0 {
                for (r, &g) in remainder.iter_mut().zip(&self.generator[1..]) {
                    *r ^= mul(g, factor);
                }
            }
        }

        let mut codeword = Vec::with_capacity(RS_BLOCK_LEN);
        codeword.extend_from_slice(data);
        codeword.extend_from_slice(&remainder);
        Ok(codeword)
    }
}
