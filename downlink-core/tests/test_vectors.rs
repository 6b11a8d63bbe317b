//! Datagram test vectors
//!
//! Each vector is one pre-aligned frame. Codec doubles isolate the payload
//! logic; the last vectors run the production codecs.

use downlink_core::{
    constants::{
        FrameLayout, CHECKSUM_OFFSET, FRAME_BIT_LEN, RS_BLOCK_LEN, RS_DATA_LEN, SYNC_MARKER,
    },
    error::{DecodeStage, FrameError},
    fec::fixture::{FixtureInner, FixtureOuter},
    CipherKey, FrameBuilder, FrameDecoder,
};

/// Plaintext fixture: "CUBESAT TLM 0042" followed by a counter
const PLAINTEXT_HEX: &str = "4355424553415420544c4d2030303432000102030405";
const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f";

fn key() -> CipherKey {
    KEY_HEX.parse().unwrap()
}

fn plaintext() -> Vec<u8> {
    hex::decode(PLAINTEXT_HEX).unwrap()
}

fn secured_block() -> [u8; RS_DATA_LEN] {
    FrameBuilder::secured(key())
        .routing_header([0x8a, 0x05, 0x10, 0x00])
        .control_header([0x00, 0x01, 0x00, 0x00, 0x2a])
        .payload(plaintext())
        .build_block()
        .unwrap()
}

/// Inner decoder output for `block`: marker, block, zeroed parity
fn inner_output(block: &[u8; RS_DATA_LEN]) -> Vec<u8> {
    let mut out = SYNC_MARKER.to_vec();
    out.extend_from_slice(block);
    out.resize(SYNC_MARKER.len() + RS_BLOCK_LEN, 0);
    out
}

fn datagram() -> Vec<u8> {
    vec![0u8; FRAME_BIT_LEN]
}

#[test]
fn vector_clean_secured_frame() {
    let decoder = FrameDecoder::new(
        FixtureInner::returning(inner_output(&secured_block())),
        FixtureOuter::passthrough(),
    )
    .with_key(key());

    let payload = decoder.decode_datagram(&datagram()).unwrap();
    assert_eq!(payload.declared_length as usize, plaintext().len());
    assert_eq!(payload.data.to_vec(), plaintext());
    assert_eq!(payload.routing_header.unwrap().to_string(), "8a051000");
    assert_eq!(payload.control_header.unwrap().0[4], 0x2a);
    assert_eq!(payload.counters.inner_bits, 0);
    assert_eq!(payload.counters.outer_symbols, 0);
    assert_eq!(payload.offset, None);
}

#[test]
fn vector_checksum_bit_flip() {
    let mut block = secured_block();
    block[CHECKSUM_OFFSET + 1] ^= 0x04;

    let decoder = FrameDecoder::new(
        FixtureInner::returning(inner_output(&block)),
        FixtureOuter::passthrough(),
    )
    .with_key(key());

    // Both FEC stages succeed
    let frame = decoder.decode_fec(&datagram()).unwrap();
    assert_eq!(frame.marker_matches, 32);
    assert_eq!(decoder.inner().calls(), 1);
    assert_eq!(decoder.outer().calls(), 1);

    // The payload does not
    let err = decoder.open(&frame, None).unwrap_err();
    assert!(matches!(err, FrameError::IntegrityMismatch { .. }));
    assert_eq!(err.stage(), DecodeStage::Integrity);
    assert!(err.is_payload_error());
}

#[test]
fn vector_length_field_outside_checksum() {
    // The length field is not covered; a damaged length still verifies and is clamped
    let mut block = secured_block();
    block[0] = 0xff;
    block[1] = 0x7f;

    let decoder = FrameDecoder::new(
        FixtureInner::returning(inner_output(&block)),
        FixtureOuter::passthrough(),
    )
    .with_key(key());

    let payload = decoder.decode_datagram(&datagram()).unwrap();
    assert!(payload.truncated);
    assert_eq!(&payload.data[..plaintext().len()], &plaintext()[..]);
}

#[test]
fn vector_wrong_key_garbles_but_verifies() {
    let decoder = FrameDecoder::new(
        FixtureInner::returning(inner_output(&secured_block())),
        FixtureOuter::passthrough(),
    )
    .with_key(CipherKey::new([0xee; 16]));

    // The checksum covers ciphertext, so only the plaintext is wrong
    let payload = decoder.decode_datagram(&datagram()).unwrap();
    assert_ne!(payload.data.to_vec(), plaintext());
}

#[test]
fn vector_decoded_marker_too_damaged() {
    let mut bytes = inner_output(&secured_block());
    bytes[1] ^= 0xff;
    bytes[2] ^= 0x01;

    let decoder = FrameDecoder::new(FixtureInner::returning(bytes), FixtureOuter::passthrough())
        .with_key(key());
    let err = decoder.decode_datagram(&datagram()).unwrap_err();
    assert_eq!(err.stage(), DecodeStage::Inner);
    assert_eq!(decoder.outer().calls(), 0);
}

#[test]
fn vector_decoded_marker_within_tolerance() {
    let mut bytes = inner_output(&secured_block());
    bytes[3] ^= 0x3f;

    let decoder = FrameDecoder::new(FixtureInner::returning(bytes), FixtureOuter::passthrough())
        .with_key(key());
    let frame = decoder.decode_fec(&datagram()).unwrap();
    assert_eq!(frame.marker_matches, 26);
}

#[test]
fn vector_plain_layout() {
    let block = FrameBuilder::plain()
        .payload(&b"HELLO FROM ORBIT"[..])
        .build_block()
        .unwrap();

    let decoder = FrameDecoder::new(
        FixtureInner::returning(inner_output(&block)).with_corrected_bits(9),
        FixtureOuter::passthrough().with_corrected_symbols(1),
    )
    .with_layout(FrameLayout::Plain);

    let payload = decoder.decode_datagram(&datagram()).unwrap();
    assert_eq!(payload.text_lossy(), "HELLO FROM ORBIT");
    assert_eq!(payload.declared_length, 18);
    assert_eq!(payload.counters.inner_bits, 9);
    assert_eq!(payload.counters.outer_symbols, 1);
}

#[test]
fn vector_truncated_datagram() {
    let decoder = FrameDecoder::new(
        FixtureInner::returning(inner_output(&secured_block())),
        FixtureOuter::passthrough(),
    );
    let err = decoder.decode_datagram(&[1u8; 4000]).unwrap_err();
    assert_eq!(
        err,
        FrameError::IncompleteFrame {
            expected: FRAME_BIT_LEN,
            actual: 4000
        }
    );
}

#[cfg(feature = "fec-rs")]
mod production_codecs {
    use super::*;

    fn datagram_bits() -> Vec<u8> {
        FrameBuilder::secured(key())
            .routing_header([0x8a, 0x05, 0x10, 0x00])
            .payload(plaintext())
            .build_bits()
            .unwrap()
    }

    #[test]
    fn vector_real_codecs_clean() {
        let payload = FrameDecoder::standard()
            .with_key(key())
            .decode_datagram(&datagram_bits())
            .unwrap();
        assert_eq!(payload.data.to_vec(), plaintext());
    }

    #[test]
    fn vector_real_codecs_with_channel_errors() {
        let mut bits = datagram_bits();
        let mut flipped = 0;
        for i in (50..bits.len()).step_by(101) {
            bits[i] ^= 1;
            flipped += 1;
        }

        let payload = FrameDecoder::standard()
            .with_key(key())
            .decode_datagram(&bits)
            .unwrap();
        assert_eq!(payload.data.to_vec(), plaintext());
        assert_eq!(payload.counters.inner_bits, flipped);
    }

    #[test]
    fn vector_real_codecs_inverted_datagram() {
        // A datagram from the wrong phase has no recognizable decoded marker
        let bits: Vec<u8> = datagram_bits().iter().map(|b| b ^ 1).collect();
        let err = FrameDecoder::standard()
            .with_key(key())
            .decode_datagram(&bits)
            .unwrap_err();
        assert_eq!(err.stage(), DecodeStage::Inner);
    }
}
