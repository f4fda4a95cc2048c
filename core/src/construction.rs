// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DNSCrypt crypto constructions ("es-version").
//
// Both constructions use NaCl secretbox framing: the 16-byte Poly1305 tag is
// prepended to the ciphertext and the Poly1305 key is taken from the first 32
// bytes of keystream block 0. This is NOT the IETF XChaCha20-Poly1305 AEAD.
//
//   XSalsa20Poly1305   (0x0001): X25519 -> HSalsa20  -> XSalsa20 secretbox
//   XChacha20Poly1305  (0x0002): X25519 -> HChaCha20 -> XChaCha20 secretbox

use std::fmt;
use std::str::FromStr;

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XChaCha20Poly1305, XSalsa20Poly1305};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// X25519 key size (bytes).
pub const KEY_SIZE: usize = 32;
/// Derived symmetric key size (bytes).
pub const SHARED_KEY_SIZE: usize = 32;
/// Extended nonce size shared by both constructions (bytes).
pub const NONCE_SIZE: usize = 24;
/// Poly1305 authentication tag size (bytes).
pub const TAG_SIZE: usize = 16;

const XSALSA20_POLY1305: u16 = 0x0001;
const XCHACHA20_POLY1305: u16 = 0x0002;

/// Crypto construction advertised by a certificate.
///
/// Unknown wire values are kept in [`CryptoConstruction::Undefined`] so that a
/// certificate from a newer resolver still parses; they only fail once
/// somebody tries to derive a key or seal/open with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CryptoConstruction {
    XSalsa20Poly1305,
    XChacha20Poly1305,
    Undefined(u16),
}

impl CryptoConstruction {
    /// Decode the 16-bit wire value. Never fails.
    pub fn from_wire(value: u16) -> Self {
        match value {
            XSALSA20_POLY1305 => CryptoConstruction::XSalsa20Poly1305,
            XCHACHA20_POLY1305 => CryptoConstruction::XChacha20Poly1305,
            other => CryptoConstruction::Undefined(other),
        }
    }

    pub fn to_wire(self) -> u16 {
        match self {
            CryptoConstruction::XSalsa20Poly1305 => XSALSA20_POLY1305,
            CryptoConstruction::XChacha20Poly1305 => XCHACHA20_POLY1305,
            CryptoConstruction::Undefined(raw) => raw,
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, CryptoConstruction::Undefined(_))
    }

    /// Resolve the cipher implementation for this construction.
    pub fn cipher(self) -> Result<&'static dyn Cipher> {
        match self {
            CryptoConstruction::XSalsa20Poly1305 => Ok(&XSalsa20Cipher),
            CryptoConstruction::XChacha20Poly1305 => Ok(&XChaCha20Cipher),
            CryptoConstruction::Undefined(raw) => Err(Error::UnsupportedConstruction(raw)),
        }
    }
}

impl fmt::Display for CryptoConstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoConstruction::XSalsa20Poly1305 => f.write_str("xsalsa20poly1305"),
            CryptoConstruction::XChacha20Poly1305 => f.write_str("xchacha20poly1305"),
            CryptoConstruction::Undefined(raw) => write!(f, "undefined({raw:#06x})"),
        }
    }
}

impl FromStr for CryptoConstruction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "xsalsa20poly1305" => Ok(CryptoConstruction::XSalsa20Poly1305),
            "xchacha20poly1305" => Ok(CryptoConstruction::XChacha20Poly1305),
            _ => Err(Error::UnsupportedConstruction(0)),
        }
    }
}

impl TryFrom<String> for CryptoConstruction {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<CryptoConstruction> for String {
    fn from(c: CryptoConstruction) -> Self {
        c.to_string()
    }
}

/// Key derivation and secretbox seal/open for one construction.
///
/// Implementations are stateless; the key is passed on every call.
pub trait Cipher: Send + Sync {
    /// Turn a raw X25519 output into the symmetric box key.
    fn derive_key(&self, dh: &[u8; KEY_SIZE]) -> [u8; SHARED_KEY_SIZE];

    /// Returns `tag || ciphertext`.
    fn seal(
        &self,
        key: &[u8; SHARED_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    fn open(
        &self,
        key: &[u8; SHARED_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

struct XSalsa20Cipher;

impl Cipher for XSalsa20Cipher {
    fn derive_key(&self, dh: &[u8; KEY_SIZE]) -> [u8; SHARED_KEY_SIZE] {
        use salsa20::cipher::consts::U10;
        use salsa20::cipher::generic_array::GenericArray;

        // crypto_box_beforenm: HSalsa20 keyed by the DH output, all-zero input
        let derived = salsa20::hsalsa::<U10>(GenericArray::from_slice(dh), &GenericArray::default());
        let mut key = [0u8; SHARED_KEY_SIZE];
        key.copy_from_slice(&derived);
        key
    }

    fn seal(
        &self,
        key: &[u8; SHARED_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        XSalsa20Poly1305::new(Key::from_slice(key))
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| Error::EncryptionFailed)
    }

    fn open(
        &self,
        key: &[u8; SHARED_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        XSalsa20Poly1305::new(Key::from_slice(key))
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::AuthenticationFailed)
    }
}

struct XChaCha20Cipher;

impl Cipher for XChaCha20Cipher {
    fn derive_key(&self, dh: &[u8; KEY_SIZE]) -> [u8; SHARED_KEY_SIZE] {
        use chacha20::cipher::consts::U10;
        use chacha20::cipher::generic_array::GenericArray;

        let derived = chacha20::hchacha::<U10>(GenericArray::from_slice(dh), &GenericArray::default());
        let mut key = [0u8; SHARED_KEY_SIZE];
        key.copy_from_slice(&derived);
        key
    }

    fn seal(
        &self,
        key: &[u8; SHARED_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        XChaCha20Poly1305::new(Key::from_slice(key))
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| Error::EncryptionFailed)
    }

    fn open(
        &self,
        key: &[u8; SHARED_KEY_SIZE],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        XChaCha20Poly1305::new(Key::from_slice(key))
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::AuthenticationFailed)
    }
}
