//! Access code scanner for noisy hard-decision bit streams
//!
//! Candidates are scored by Hamming distance: the window is packed into an
//! integer, XORed against the known pattern, and the number of agreeing bits
//! (`width - popcount`) is compared with a threshold set below 100% so that
//! channel bit errors are tolerated.

use crate::bits::bits_to_u64;
use crate::constants::{
    CONVOLVED_MARKER_BITS, CONVOLVED_MARKER_THRESHOLD, CONVOLVED_MARKER_WORD,
    DECODED_MARKER_BITS, DECODED_MARKER_THRESHOLD, SYNC_MARKER_WORD,
};
use crate::error::FrameError;

#[cfg(feature = "logging")]
use tracing::trace;

/// A fixed bit pattern with a match threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessCode {
    /// Pattern, right-aligned (the first transmitted bit is the most significant)
    pub pattern: u64,
    /// Pattern width in bits (1..=64)
    pub width: u32,
    /// Minimum number of agreeing bits for a match
    pub threshold: u32,
}

impl AccessCode {
    /// Sync marker in the convolved domain, searched for in the raw bit stream
    pub const CONVOLVED: Self = Self {
        pattern: CONVOLVED_MARKER_WORD,
        width: CONVOLVED_MARKER_BITS,
        threshold: CONVOLVED_MARKER_THRESHOLD,
    };

    /// Sync marker after inner decoding, read little-endian from the first four bytes
    pub const DECODED: Self = Self {
        pattern: SYNC_MARKER_WORD as u64,
        width: DECODED_MARKER_BITS,
        threshold: DECODED_MARKER_THRESHOLD,
    };

    /// Same pattern with a different threshold
    pub const fn with_threshold(self, threshold: u32) -> Self {
        Self {
            pattern: self.pattern,
            width: self.width,
            threshold,
        }
    }

    /// Number of bit errors a match may contain
    pub const fn tolerance(&self) -> u32 {
        self.width.saturating_sub(self.threshold)
    }

    fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// Number of bits of `word` agreeing with the pattern
    pub fn score(&self, word: u64) -> u32 {
        let differing = ((word ^ self.pattern) & self.mask()).count_ones();
        self.width - differing
    }

    /// True when `word` agrees with the pattern in at least `threshold` bits
    pub fn accepts(&self, word: u64) -> bool {
        self.score(word) >= self.threshold
    }

    /// Score the window starting at `offset`, or `None` if it runs past the end
    pub fn score_at(&self, bits: &[u8], offset: usize) -> Option<u32> {
        let end = offset.checked_add(self.width as usize)?;
        bits.get(offset..end).map(|w| self.score(bits_to_u64(w)))
    }

    /// Score a marker stored as little-endian bytes
    pub fn score_le_bytes(&self, bytes: &[u8]) -> u32 {
        let word = bytes
            .iter()
            .take(8)
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        self.score(word)
    }
}

/// A position where the access code matched within tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Bit offset of the first marker bit
    pub offset: usize,
    /// Number of agreeing bits
    pub matches: u32,
}

/// Search forward from `start` for the first window accepted by `code`
///
/// Only offsets leaving at least `span` bits (a whole frame) are inspected,
/// so a candidate can always be handed to the frame decoder. When nothing
/// matches, the error carries the best score seen.
pub fn find_access_code(
    bits: &[u8],
    start: usize,
    code: &AccessCode,
    span: usize,
) -> Result<Candidate, FrameError> {
    let width = code.width as usize;
    let span = span.max(width);
    if start.checked_add(span).map_or(true, |end| end > bits.len()) {
        return Err(FrameError::SyncNotFound { best_matches: 0 });
    }
    let last = bits.len() - span;

    let mask = code.mask();
    let mut word = bits_to_u64(&bits[start..start + width]);
    let mut best = 0u32;
    let mut pos = start;

    loop {
        let matches = code.score(word);
        if matches >= code.threshold {
            #[cfg(feature = "logging")]
            trace!("Access code candidate at bit {} ({} matching)", pos, matches);

            return Ok(Candidate {
                offset: pos,
                matches,
            });
        }
        best = best.max(matches);

        if pos == last {
            break;
        }
        // Slide the window one bit
        word = ((word << 1) | u64::from(bits[pos + width] & 1)) & mask;
        pos += 1;
    }

    Err(FrameError::SyncNotFound { best_matches: best })
}
