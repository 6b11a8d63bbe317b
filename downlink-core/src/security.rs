//! Checksum verification and payload cipher
//!
//! # Security
//!
//! The data region is AES-128-CBC with an all-zero IV and a long-lived
//! key. Identical plaintexts therefore encrypt to identical ciphertexts and
//! equal prefixes are visible on the wire. The mode is kept for
//! compatibility with the transmitter; it offers confidentiality against
//! casual observers only. The checksum is not a MAC.

use crate::constants::{CIPHER_BLOCK_LEN, DATA_REGION_LEN, KEY_LEN};
use crate::error::{ConfigError, FrameError};
use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use core::fmt;
use core::str::FromStr;

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

const ZERO_IV: [u8; CIPHER_BLOCK_LEN] = [0u8; CIPHER_BLOCK_LEN];

/// CRC-32/ISO-HDLC (the zlib/Ethernet CRC)
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Compare the carried checksum with one computed over `region`
pub fn verify_checksum(region: &[u8], expected: u32) -> Result<(), FrameError> {
    let actual = crc32(region);
    if actual != expected {
        return Err(FrameError::IntegrityMismatch { expected, actual });
    }
    Ok(())
}

/// 128-bit symmetric key for the data region
///
/// Parses from 32 hex characters (`"00112233..."`) or a comma-separated
/// byte list (`"0x00, 0x11, ..."`). `Debug` never prints key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    /// Wrap raw key bytes
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn parse_hex(s: &str) -> Result<Self, ConfigError> {
        if s.len() != KEY_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidKey(format!(
                "expected {} hex digits, got {} characters",
                KEY_LEN * 2,
                s.chars().count()
            )));
        }
        let mut key = [0u8; KEY_LEN];
        for (i, byte) in key.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| ConfigError::InvalidKey(format!("bad hex digits {:?}", pair)))?;
        }
        Ok(Self(key))
    }

    fn parse_list(s: &str) -> Result<Self, ConfigError> {
        let items: Vec<&str> = s.split(',').map(str::trim).collect();
        if items.len() != KEY_LEN {
            return Err(ConfigError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                items.len()
            )));
        }
        let mut key = [0u8; KEY_LEN];
        for (byte, item) in key.iter_mut().zip(items) {
            let digits = item
                .strip_prefix("0x")
                .or_else(|| item.strip_prefix("0X"))
                .unwrap_or(item);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidKey(format!("bad byte {:?}", item)));
            }
            *byte = u8::from_str_radix(digits, 16)
                .map_err(|_| ConfigError::InvalidKey(format!("bad byte {:?}", item)))?;
        }
        Ok(Self(key))
    }
}

impl FromStr for CipherKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            Self::parse_list(s)
        } else {
            Self::parse_hex(s)
        }
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

/// Decrypt the data region, returning the whole 208-byte plaintext
pub fn decrypt_data(
    key: &CipherKey,
    ciphertext: &[u8; DATA_REGION_LEN],
) -> Result<[u8; DATA_REGION_LEN], FrameError> {
    let mut buf = *ciphertext;
    Aes128CbcDec::new(&(*key.as_bytes()).into(), &ZERO_IV.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|e| FrameError::DecryptionUnavailable(format!("cipher rejected data: {}", e)))?;
    Ok(buf)
}

/// Encrypt a zero-padded data region (transmit side)
pub fn encrypt_data(
    key: &CipherKey,
    plaintext: &[u8; DATA_REGION_LEN],
) -> Result<[u8; DATA_REGION_LEN], FrameError> {
    let mut buf = *plaintext;
    Aes128CbcEnc::new(&(*key.as_bytes()).into(), &ZERO_IV.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, DATA_REGION_LEN)
        .map_err(|e| FrameError::DecryptionUnavailable(format!("cipher rejected data: {}", e)))?;
    Ok(buf)
}
