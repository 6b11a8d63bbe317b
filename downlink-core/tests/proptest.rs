//! Property-based tests using proptest

use downlink_core::{
    bits::{bits_to_u64, unpack_bits},
    constants::{
        CHECKSUM_OFFSET, CONVOLVED_MARKER_WORD, DATA_REGION_LEN, FRAME_BIT_LEN, RS_DATA_LEN,
    },
    differential::{differential_decode, differential_encode, DifferentialDecoder},
    frame::{checked_region, parse_fields},
    scanner::{find_access_code, AccessCode},
    security::{crc32, decrypt_data, encrypt_data, CipherKey},
    FrameBuilder,
};
use proptest::prelude::*;

fn marker_bits() -> Vec<u8> {
    unpack_bits(&CONVOLVED_MARKER_WORD.to_be_bytes())
}

/// Filler bits that never contain a near-copy of the marker
fn filler(len: usize) -> Vec<u8> {
    vec![0u8; len]
}

proptest! {
    #[test]
    fn prop_exact_marker_found_at_offset(k in 0usize..2000, tail in 0usize..64) {
        let mut bits = filler(k);
        bits.extend(marker_bits());
        bits.extend(filler(tail));

        let found = find_access_code(&bits, 0, &AccessCode::CONVOLVED, 64).unwrap();
        prop_assert_eq!(found.offset, k);
        prop_assert_eq!(found.matches, 64);
    }

    #[test]
    fn prop_tolerance_boundary(
        k in 0usize..500,
        positions in prop::sample::subsequence((0..64usize).collect::<Vec<_>>(), 15)
    ) {
        let code = AccessCode::CONVOLVED;
        let tolerated = code.tolerance() as usize;

        let mut marker = marker_bits();
        for &p in &positions[..tolerated] {
            marker[p] ^= 1;
        }
        let mut bits = filler(k);
        bits.extend(&marker);
        prop_assert_eq!(code.score_at(&bits, k), Some(code.threshold));
        let found = find_access_code(&bits, k, &code, 64).unwrap();
        prop_assert_eq!(found.offset, k);

        // One more flip and the offset no longer qualifies
        bits[k + positions[tolerated]] ^= 1;
        prop_assert!(!code.accepts(bits_to_u64(&bits[k..k + 64])));
    }

    #[test]
    fn prop_differential_round_trip(bits in prop::collection::vec(0u8..2, 0..4096)) {
        prop_assert_eq!(differential_decode(&differential_encode(&bits)), bits);
    }

    #[test]
    fn prop_differential_chunking_is_transparent(
        bits in prop::collection::vec(0u8..2, 1..2048),
        split in 0usize..2048
    ) {
        let split = split.min(bits.len());
        let mut decoder = DifferentialDecoder::new();
        let mut out = decoder.decode(&bits[..split]);
        out.extend(decoder.decode(&bits[split..]));
        prop_assert_eq!(out, differential_decode(&bits));
    }

    #[test]
    fn prop_checksum_covers_exact_range(
        block in prop::collection::vec(any::<u8>(), RS_DATA_LEN),
        index in 0usize..RS_DATA_LEN,
        mask in 1u8..=255
    ) {
        let original: [u8; RS_DATA_LEN] = block.try_into().unwrap();
        let mut mutated = original;
        mutated[index] ^= mask;

        let before = crc32(checked_region(&original));
        let after = crc32(checked_region(&mutated));
        if (2..CHECKSUM_OFFSET).contains(&index) {
            // A single-byte change is always caught by CRC-32
            prop_assert_ne!(before, after);
        } else {
            prop_assert_eq!(before, after);
        }
    }

    #[test]
    fn prop_decrypt_inverts_encrypt(
        key in any::<[u8; 16]>(),
        data in prop::collection::vec(any::<u8>(), DATA_REGION_LEN)
    ) {
        let key = CipherKey::new(key);
        let plain: [u8; DATA_REGION_LEN] = data.try_into().unwrap();
        let cipher = encrypt_data(&key, &plain).unwrap();
        prop_assert_eq!(decrypt_data(&key, &cipher).unwrap(), plain);
    }

    #[test]
    fn prop_builder_sets_length_and_checksum(
        payload in prop::collection::vec(any::<u8>(), 0..=DATA_REGION_LEN)
    ) {
        let block = FrameBuilder::secured(CipherKey::new([0x11; 16]))
            .payload(payload.clone())
            .build_block()
            .unwrap();
        let fields = parse_fields(&block);
        prop_assert_eq!(usize::from(fields.length), payload.len());
        prop_assert_eq!(fields.checksum, crc32(checked_region(&block)));
    }

    #[test]
    fn prop_scan_never_panics(
        bits in prop::collection::vec(0u8..2, 0..(FRAME_BIT_LEN * 2)),
        start in 0usize..10_000
    ) {
        let _ = find_access_code(&bits, start, &AccessCode::CONVOLVED, FRAME_BIT_LEN);
    }
}
