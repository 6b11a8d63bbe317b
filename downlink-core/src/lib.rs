//! # Downlink Core
//!
//! Frame synchronization and concatenated FEC/security decoding for a BPSK
//! satellite downlink: hard-decision bits in, authenticated and decrypted
//! payloads out.
//!
//! ## Modules
//!
//! - `bits`: bit packing and the absolute-offset bit buffer
//! - `differential`: differential decoding of the raw bit stream
//! - `scanner`: sync marker search under bit errors
//! - `fec`: inner (Viterbi) and outer (Reed-Solomon) codec services
//! - `frame`: fixed-offset field extraction
//! - `security`: CRC-32 check and AES-128-CBC payload cipher
//! - `decoder`: per-frame pipeline and datagram mode
//! - `stream`: streaming resynchronization
//! - `encoder`: transmit-side frame construction
//! - `config`: JSON configuration

#![warn(missing_docs)]

pub mod bits;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod differential;
pub mod encoder;
pub mod error;
pub mod fec;
pub mod frame;
pub mod scanner;
pub mod security;
pub mod stream;
pub mod types;

// Re-export commonly used types
pub use config::DecoderConfig;
pub use constants::FrameLayout;
pub use decoder::FrameDecoder;
#[cfg(feature = "fec-rs")]
pub use decoder::StandardFrameDecoder;
pub use encoder::FrameBuilder;
pub use error::{ConfigError, DecodeStage, FrameError};
pub use security::CipherKey;
pub use stream::{DecodeStats, FrameEvent, FrameFailure, StreamConfig, StreamDecoder};
pub use types::{CorrectionCounters, DecodedFrame, DecodedPayload};

/// Result type alias for frame operations
pub type Result<T> = core::result::Result<T, FrameError>;
