//! Deterministic codec doubles
//!
//! These stand in for the real codecs when exercising the resynchronization
//! and payload logic: they return fixed bytes or scripted failures and count
//! how often they were called.

use super::{InnerDecoded, InnerDecoder, OuterDecoded, OuterDecoder};
use crate::constants::RS_DATA_LEN;
use crate::error::FrameError;
use std::cell::Cell;

#[derive(Debug, Clone)]
enum Script<T> {
    Return(T),
    Fail(String),
}

/// Inner decoder that returns a fixed result regardless of input
#[derive(Debug, Clone)]
pub struct FixtureInner {
    script: Script<Vec<u8>>,
    corrected_bits: usize,
    calls: Cell<usize>,
}

impl FixtureInner {
    /// Always return `bytes` as the decoded frame
    pub fn returning(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            script: Script::Return(bytes.into()),
            corrected_bits: 0,
            calls: Cell::new(0),
        }
    }

    /// Always fail with `reason`
    pub fn failing(reason: &str) -> Self {
        Self {
            script: Script::Fail(reason.to_string()),
            corrected_bits: 0,
            calls: Cell::new(0),
        }
    }

    /// Report `bits` corrections on every successful decode
    pub fn with_corrected_bits(mut self, bits: usize) -> Self {
        self.corrected_bits = bits;
        self
    }

    /// Number of decode calls so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl InnerDecoder for FixtureInner {
    fn decode_inner(&self, _convolved: &[u8]) -> Result<InnerDecoded, FrameError> {
        self.calls.set(self.calls.get() + 1);
        match &self.script {
            Script::Return(bytes) => Ok(InnerDecoded {
                bytes: bytes.clone(),
                corrected_bits: self.corrected_bits,
            }),
            Script::Fail(reason) => Err(FrameError::InnerDecodeFailure(reason.clone())),
        }
    }
}

/// Outer decoder double
#[derive(Debug, Clone)]
pub struct FixtureOuter {
    script: Option<Script<Vec<u8>>>,
    corrected_symbols: usize,
    calls: Cell<usize>,
}

impl FixtureOuter {
    /// Strip parity without correcting anything
    pub fn passthrough() -> Self {
        Self {
            script: None,
            corrected_symbols: 0,
            calls: Cell::new(0),
        }
    }

    /// Always return `data` as the corrected block
    pub fn returning(data: impl Into<Vec<u8>>) -> Self {
        Self {
            script: Some(Script::Return(data.into())),
            corrected_symbols: 0,
            calls: Cell::new(0),
        }
    }

    /// Always fail with `reason`
    pub fn failing(reason: &str) -> Self {
        Self {
            script: Some(Script::Fail(reason.to_string())),
            corrected_symbols: 0,
            calls: Cell::new(0),
        }
    }

    /// Report `symbols` corrections on every successful decode
    pub fn with_corrected_symbols(mut self, symbols: usize) -> Self {
        self.corrected_symbols = symbols;
        self
    }

    /// Number of decode calls so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl OuterDecoder for FixtureOuter {
    fn decode_outer(&self, block: &[u8]) -> Result<OuterDecoded, FrameError> {
        self.calls.set(self.calls.get() + 1);
        let data = match &self.script {
            None => block[..RS_DATA_LEN.min(block.len())].to_vec(),
            Some(Script::Return(data)) => data.clone(),
            Some(Script::Fail(reason)) => {
                return Err(FrameError::OuterDecodeFailure(reason.clone()))
            }
        };
        Ok(OuterDecoded {
            data,
            corrected_symbols: self.corrected_symbols,
        })
    }
}
