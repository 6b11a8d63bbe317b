//! Never-panic harnesses for downlink-core
//!
//! Each entry point takes arbitrary bytes. Wire them into cargo-fuzz
//! targets or call them from tests:
//!
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run a target: cargo fuzz run fuzz_stream

use downlink_core::{
    bits::unpack_bits,
    constants::{FrameLayout, FRAME_BIT_LEN, RS_BLOCK_LEN},
    fec::{OuterDecoder, ReedSolomon255},
    frame::parse_fields,
    scanner::{find_access_code, AccessCode},
    stream::StreamDecoder,
    CipherKey, FrameDecoder,
};

/// Scan arbitrary bits for the convolved marker
pub fn fuzz_scan(data: &[u8]) {
    let bits = unpack_bits(data);
    let start = data.first().copied().unwrap_or(0) as usize;
    let _ = find_access_code(&bits, start, &AccessCode::CONVOLVED, FRAME_BIT_LEN);
}

/// Stream arbitrary bytes through the full decoder, split in two pushes
pub fn fuzz_stream(data: &[u8]) {
    let bits = unpack_bits(data);
    let split = data.first().copied().unwrap_or(0) as usize * 37 % (bits.len() + 1);

    let mut decoder = StreamDecoder::new(FrameDecoder::standard().with_key(CipherKey::new([0; 16])));
    decoder.push_bits(&bits[..split]);
    let _ = decoder.poll();
    decoder.push_bits(&bits[split..]);
    let _ = decoder.poll();
}

/// Decode arbitrary bits as one pre-aligned datagram in both layouts
pub fn fuzz_datagram(data: &[u8]) {
    let bits = unpack_bits(data);
    let _ = FrameDecoder::standard()
        .with_key(CipherKey::new([0x5a; 16]))
        .decode_datagram(&bits);
    let _ = FrameDecoder::standard()
        .with_layout(FrameLayout::Plain)
        .decode_datagram(&bits);
}

/// Run the outer decoder on an arbitrary block
pub fn fuzz_outer(data: &[u8]) {
    let _ = ReedSolomon255::new().decode_outer(data);

    if data.len() >= RS_BLOCK_LEN {
        if let Ok(decoded) = ReedSolomon255::new().decode_outer(&data[..RS_BLOCK_LEN]) {
            if let Ok(block) = decoded.data.as_slice().try_into() {
                let _ = parse_fields(&block);
            }
        }
    }
}

/// Parse arbitrary text as key material
pub fn fuzz_parse_key(data: &[u8]) {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = text.parse::<CipherKey>();
    }
}
