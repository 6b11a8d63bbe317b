//! Fixed-offset field extraction from an outer-decoded block

use crate::constants::{
    CHECKSUM_LEN, CHECKSUM_OFFSET, CONTROL_HEADER_LEN, CONTROL_HEADER_OFFSET, DATA_OFFSET,
    DATA_REGION_LEN, LENGTH_FIELD_LEN, LENGTH_OFFSET, ROUTING_HEADER_LEN, ROUTING_HEADER_OFFSET,
    RS_DATA_LEN,
};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Opaque routing (CSP) header carried ahead of the encrypted data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingHeader(pub [u8; ROUTING_HEADER_LEN]);

impl fmt::Display for RoutingHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Opaque control header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlHeader(pub [u8; CONTROL_HEADER_LEN]);

impl fmt::Display for ControlHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Fields of a secured block, unvalidated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFields {
    /// Declared number of meaningful plaintext bytes
    pub length: u16,
    /// Routing header
    pub routing_header: RoutingHeader,
    /// Control header
    pub control_header: ControlHeader,
    /// Encrypted data region
    pub data: [u8; DATA_REGION_LEN],
    /// Trailing checksum as carried on the wire
    pub checksum: u32,
}

fn array_at<const N: usize>(block: &[u8; RS_DATA_LEN], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&block[offset..offset + N]);
    out
}

/// Read the little-endian length prefix
pub fn read_length(block: &[u8; RS_DATA_LEN]) -> u16 {
    u16::from_le_bytes(array_at::<LENGTH_FIELD_LEN>(block, LENGTH_OFFSET))
}

/// Split a block into its fields
///
/// Offsets are fixed; the length field is reported as read and never used
/// to locate anything.
pub fn parse_fields(block: &[u8; RS_DATA_LEN]) -> FrameFields {
    FrameFields {
        length: read_length(block),
        routing_header: RoutingHeader(array_at(block, ROUTING_HEADER_OFFSET)),
        control_header: ControlHeader(array_at(block, CONTROL_HEADER_OFFSET)),
        data: array_at(block, DATA_OFFSET),
        checksum: u32::from_le_bytes(array_at::<CHECKSUM_LEN>(block, CHECKSUM_OFFSET)),
    }
}

/// Bytes covered by the checksum: routing header through the end of the data region
pub fn checked_region(block: &[u8; RS_DATA_LEN]) -> &[u8] {
    &block[ROUTING_HEADER_OFFSET..CHECKSUM_OFFSET]
}
