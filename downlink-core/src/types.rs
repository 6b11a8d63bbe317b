//! Core types for decoded downlink frames

use crate::constants::RS_DATA_LEN;
use crate::frame::{ControlHeader, RoutingHeader};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Work done by the two FEC stages on one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionCounters {
    /// Channel bits corrected by the inner decoder
    pub inner_bits: usize,
    /// Symbols corrected by the outer decoder
    pub outer_symbols: usize,
}

/// A frame that passed both marker checks and both FEC stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Agreeing bits of the decoded-domain marker
    pub marker_matches: u32,
    /// Outer-decoded block, parity stripped
    pub block: [u8; RS_DATA_LEN],
    /// Corrections applied on the way here
    pub counters: CorrectionCounters,
}

/// Application payload recovered from one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// Absolute bit offset of the frame in the stream, `None` in datagram mode
    pub offset: Option<usize>,
    /// Declared length field, before clamping
    pub declared_length: u16,
    /// Routing header (secured layout only)
    pub routing_header: Option<RoutingHeader>,
    /// Control header (secured layout only)
    pub control_header: Option<ControlHeader>,
    /// Meaningful plaintext bytes
    pub data: Bytes,
    /// True when the declared length ran past the data region and was clamped
    pub truncated: bool,
    /// FEC work for this frame
    pub counters: CorrectionCounters,
}

impl DecodedPayload {
    /// Payload as text, replacing invalid UTF-8
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
