//! Decoder configuration
//!
//! Loaded from JSON; every field has a default so a config file only needs
//! what it changes:
//!
//! ```json
//! {
//!   "key": "2b7e151628aed2a6abf7158809cf4f3c",
//!   "layout": "secured",
//!   "convolved_threshold": 50,
//!   "initial_offset": 0
//! }
//! ```
//!
//! The `DOWNLINK_KEY` environment variable overrides the file's key.

use crate::constants::{
    FrameLayout, CONVOLVED_MARKER_BITS, CONVOLVED_MARKER_THRESHOLD, DECODED_MARKER_BITS,
    DECODED_MARKER_THRESHOLD, FRAME_BIT_LEN, RESYNC_OVERLAP_BITS,
};
use crate::decoder::FrameDecoder;
use crate::error::ConfigError;
use crate::fec::{InnerDecoder, OuterDecoder};
use crate::scanner::AccessCode;
use crate::security::CipherKey;
use crate::stream::{EndOfBufferPolicy, StreamConfig, StreamDecoder};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "fec-rs")]
use crate::decoder::StandardFrameDecoder;
#[cfg(feature = "fec-rs")]
use crate::fec::{ReedSolomon255, Viterbi27};

/// Environment variable holding key material
pub const KEY_ENV_VAR: &str = "DOWNLINK_KEY";

/// Decoder settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Key material: 32 hex characters or a `0xNN,...` list
    pub key: Option<String>,
    /// Block layout
    pub layout: FrameLayout,
    /// Convolved-domain marker threshold (of 64 bits)
    pub convolved_threshold: u32,
    /// Decoded-domain marker threshold (of 32 bits)
    pub decoded_threshold: u32,
    /// Offset pull-back after a decoded frame, in bits
    pub resync_overlap_bits: usize,
    /// Bits skipped before the first search and after every reset
    pub initial_offset: usize,
    /// Differentially decode streamed bits
    pub differential: bool,
    /// Behaviour near the end of the buffer
    pub end_of_buffer: EndOfBufferPolicy,
    /// Run of zero-valued symbols treated as loss of signal
    pub idle_reset_symbols: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            key: None,
            layout: FrameLayout::Secured,
            convolved_threshold: CONVOLVED_MARKER_THRESHOLD,
            decoded_threshold: DECODED_MARKER_THRESHOLD,
            resync_overlap_bits: RESYNC_OVERLAP_BITS,
            initial_offset: 0,
            differential: true,
            end_of_buffer: EndOfBufferPolicy::AwaitMoreData,
            idle_reset_symbols: None,
        }
    }
}

impl fmt::Debug for DecoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderConfig")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("layout", &self.layout)
            .field("convolved_threshold", &self.convolved_threshold)
            .field("decoded_threshold", &self.decoded_threshold)
            .field("resync_overlap_bits", &self.resync_overlap_bits)
            .field("initial_offset", &self.initial_offset)
            .field("differential", &self.differential)
            .field("end_of_buffer", &self.end_of_buffer)
            .field("idle_reset_symbols", &self.idle_reset_symbols)
            .finish()
    }
}

impl DecoderConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Apply [`KEY_ENV_VAR`] if set
    pub fn with_env_overrides(self) -> Self {
        self.with_key_override(std::env::var(KEY_ENV_VAR).ok())
    }

    /// Replace the key when `key` is present
    pub fn with_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key {
            self.key = Some(key);
        }
        self
    }

    /// Parse the configured key, if any
    pub fn cipher_key(&self) -> Result<Option<CipherKey>, ConfigError> {
        self.key.as_deref().map(str::parse).transpose()
    }

    /// Check every setting; any error here is fatal
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cipher_key()?;

        if self.convolved_threshold > CONVOLVED_MARKER_BITS {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.convolved_threshold,
                width: CONVOLVED_MARKER_BITS,
            });
        }
        if self.decoded_threshold > DECODED_MARKER_BITS {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.decoded_threshold,
                width: DECODED_MARKER_BITS,
            });
        }
        if self.resync_overlap_bits >= FRAME_BIT_LEN {
            return Err(ConfigError::InvalidOverlap {
                overlap: self.resync_overlap_bits,
                frame: FRAME_BIT_LEN,
            });
        }
        Ok(())
    }

    /// Streaming parameters
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            convolved_code: AccessCode::CONVOLVED.with_threshold(self.convolved_threshold),
            resync_overlap_bits: self.resync_overlap_bits,
            initial_offset: self.initial_offset,
            differential: self.differential,
            end_of_buffer: self.end_of_buffer,
            idle_reset_symbols: self.idle_reset_symbols,
        }
    }

    /// Validate and build a frame decoder around the given codecs
    pub fn build_frame_decoder_with<I: InnerDecoder, O: OuterDecoder>(
        &self,
        inner: I,
        outer: O,
    ) -> Result<FrameDecoder<I, O>, ConfigError> {
        self.validate()?;
        Ok(FrameDecoder::new(inner, outer)
            .with_optional_key(self.cipher_key()?)
            .with_layout(self.layout)
            .with_decoded_threshold(self.decoded_threshold))
    }

    /// Validate and build a frame decoder with the production codecs
    #[cfg(feature = "fec-rs")]
    pub fn build_frame_decoder(&self) -> Result<StandardFrameDecoder, ConfigError> {
        self.build_frame_decoder_with(Viterbi27::new(), ReedSolomon255::new())
    }

    /// Validate and build a stream decoder with the production codecs
    #[cfg(feature = "fec-rs")]
    pub fn build_stream_decoder(
        &self,
    ) -> Result<StreamDecoder<Viterbi27, ReedSolomon255>, ConfigError> {
        Ok(StreamDecoder::with_config(
            self.build_frame_decoder()?,
            self.stream_config(),
        ))
    }

    /// Validate and build a stream decoder around the given codecs
    pub fn build_stream_decoder_with<I: InnerDecoder, O: OuterDecoder>(
        &self,
        inner: I,
        outer: O,
    ) -> Result<StreamDecoder<I, O>, ConfigError> {
        Ok(StreamDecoder::with_config(
            self.build_frame_decoder_with(inner, outer)?,
            self.stream_config(),
        ))
    }
}
