//! Error types for downlink decoding

use core::fmt;

/// Pipeline stage an error originated from, used as log context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStage {
    /// Convolved-domain access code search
    Sync,
    /// Inner (convolutional) decode and decoded-domain marker confirmation
    Inner,
    /// Outer (Reed-Solomon) decode
    Outer,
    /// Checksum verification
    Integrity,
    /// Payload decryption
    Decrypt,
    /// Input framing before any codec ran
    Input,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeStage::Sync => "sync",
            DecodeStage::Inner => "inner",
            DecodeStage::Outer => "outer",
            DecodeStage::Integrity => "integrity",
            DecodeStage::Decrypt => "decrypt",
            DecodeStage::Input => "input",
        };
        f.write_str(name)
    }
}

/// Frame-level errors
///
/// All of these are recoverable: the stream orchestrator logs them and keeps
/// scanning.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// No candidate passed the convolved-domain threshold
    #[error("No sync marker found (best match {best_matches} bits)")]
    SyncNotFound {
        /// Best agreement seen at the inspected position(s)
        best_matches: u32,
    },

    /// Inner decoder rejected the block, or the decoded marker failed its threshold
    #[error("Inner decode failed: {0}")]
    InnerDecodeFailure(String),

    /// Outer block code exceeded its correction capacity
    #[error("Outer decode failed: {0}")]
    OuterDecodeFailure(String),

    /// Trailing checksum did not match the computed one
    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    IntegrityMismatch {
        /// Checksum carried in the frame trailer
        expected: u32,
        /// Checksum computed over the received bytes
        actual: u32,
    },

    /// Key material missing or malformed, or the cipher rejected the data
    #[error("Decryption unavailable: {0}")]
    DecryptionUnavailable(String),

    /// Payload does not fit the frame's data region
    #[error("Payload size {len} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Requested payload length
        len: usize,
        /// Capacity of the layout
        max: usize,
    },

    /// Not enough input to hold a complete frame
    #[error("Incomplete frame: expected {expected} bits, got {actual}")]
    IncompleteFrame {
        /// The number of bits expected.
        expected: usize,
        /// The number of bits actually found.
        actual: usize,
    },
}

impl FrameError {
    /// Stage of the pipeline that produced this error
    pub fn stage(&self) -> DecodeStage {
        match self {
            FrameError::SyncNotFound { .. } => DecodeStage::Sync,
            FrameError::InnerDecodeFailure(_) => DecodeStage::Inner,
            FrameError::OuterDecodeFailure(_) => DecodeStage::Outer,
            FrameError::IntegrityMismatch { .. } => DecodeStage::Integrity,
            FrameError::DecryptionUnavailable(_) => DecodeStage::Decrypt,
            FrameError::PayloadTooLarge { .. } | FrameError::IncompleteFrame { .. } => {
                DecodeStage::Input
            }
        }
    }

    /// True when the FEC stages succeeded and only the payload could not be opened
    pub fn is_payload_error(&self) -> bool {
        matches!(self.stage(), DecodeStage::Integrity | DecodeStage::Decrypt)
    }
}

/// Fatal configuration errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Key material could not be parsed into 16 bytes
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// A marker threshold exceeds the marker width
    #[error("Threshold {threshold} exceeds marker width {width}")]
    InvalidThreshold {
        /// Configured threshold
        threshold: u32,
        /// Width of the marker it applies to
        width: u32,
    },

    /// Resync overlap must be shorter than a frame
    #[error("Resync overlap {overlap} bits must be shorter than the {frame}-bit frame")]
    InvalidOverlap {
        /// Configured overlap
        overlap: usize,
        /// Frame length in bits
        frame: usize,
    },

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
