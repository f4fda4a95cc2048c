// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// X25519 key pairs and shared-key derivation.

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, trace};
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::construction::{CryptoConstruction, KEY_SIZE, SHARED_KEY_SIZE};
use crate::error::{Error, Result};

/// X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

/// X25519 secret key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

/// Symmetric key derived from a key agreement under one construction.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; SHARED_KEY_SIZE]);

/// An X25519 key pair: a client's ephemeral pair or a resolver's short-term pair.
#[derive(Clone)]
pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw secret bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        PublicKey(*x25519_dalek::PublicKey::from(&secret).as_bytes())
    }
}

impl SharedKey {
    pub fn from_bytes(bytes: [u8; SHARED_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SHARED_KEY_SIZE] {
        &self.0
    }
}

fn key_from_slice(bytes: &[u8]) -> Result<[u8; KEY_SIZE]> {
    bytes.try_into().map_err(|_| Error::InvalidKeyMaterial {
        expected: KEY_SIZE,
        got: bytes.len(),
    })
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        key_from_slice(bytes).map(Self)
    }
}

impl TryFrom<&[u8]> for SecretKey {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        key_from_slice(bytes).map(Self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&hex::encode(self.0)).finish()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedKey([REDACTED])")
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a key pair from the given CSPRNG.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        let secret = SecretKey(bytes);
        bytes.zeroize();
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }
}

/// Generate a new X25519 key pair from the OS random source.
pub fn generate_keypair() -> KeyPair {
    KeyPair::generate(&mut OsRng)
}

/// Derive the symmetric key for `construction` from our secret key and the
/// peer's public key.
///
/// X25519 first, then HSalsa20 (XSalsa20Poly1305) or HChaCha20
/// (XChacha20Poly1305) over the raw DH output with an all-zero input block.
/// Both sides of an exchange arrive at the same key.
pub fn compute_shared_key(
    construction: CryptoConstruction,
    secret_key: &SecretKey,
    public_key: &PublicKey,
) -> Result<SharedKey> {
    let cipher = construction.cipher()?;

    let secret = StaticSecret::from(secret_key.0);
    let dh = secret.diffie_hellman(&x25519_dalek::PublicKey::from(public_key.0));
    if !dh.was_contributory() {
        debug!(%construction, "rejected low-order peer public key");
        return Err(Error::WeakPublicKey);
    }

    let key = SharedKey(cipher.derive_key(dh.as_bytes()));
    trace!(%construction, "derived shared key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn both_sides_agree() {
        let client = generate_keypair();
        let server = generate_keypair();

        for c in [
            CryptoConstruction::XSalsa20Poly1305,
            CryptoConstruction::XChacha20Poly1305,
        ] {
            let k1 = compute_shared_key(c, &client.secret, &server.public).unwrap();
            let k2 = compute_shared_key(c, &server.secret, &client.public).unwrap();
            assert_eq!(k1, k2);
        }
    }

    #[test]
    fn constructions_derive_different_keys() {
        let client = generate_keypair();
        let server = generate_keypair();

        let salsa = compute_shared_key(
            CryptoConstruction::XSalsa20Poly1305,
            &client.secret,
            &server.public,
        )
        .unwrap();
        let chacha = compute_shared_key(
            CryptoConstruction::XChacha20Poly1305,
            &client.secret,
            &server.public,
        )
        .unwrap();
        assert_ne!(salsa, chacha);
    }

    #[test]
    fn undefined_construction_is_rejected() {
        let kp = generate_keypair();
        let result = compute_shared_key(CryptoConstruction::Undefined(0x00ff), &kp.secret, &kp.public);
        assert!(matches!(result, Err(Error::UnsupportedConstruction(0x00ff))));
    }

    #[test]
    fn low_order_point_is_rejected() {
        let kp = generate_keypair();
        let zero = PublicKey::from_bytes([0u8; KEY_SIZE]);
        let result = compute_shared_key(CryptoConstruction::XChacha20Poly1305, &kp.secret, &zero);
        assert!(matches!(result, Err(Error::WeakPublicKey)));
    }

    #[test]
    fn wrong_length_key_material() {
        let short: &[u8] = &[1u8; 31];
        let long: &[u8] = &[1u8; 33];
        assert!(matches!(
            PublicKey::try_from(short),
            Err(Error::InvalidKeyMaterial { expected: 32, got: 31 })
        ));
        assert!(matches!(
            SecretKey::try_from(long),
            Err(Error::InvalidKeyMaterial { expected: 32, got: 33 })
        ));
        assert!(PublicKey::try_from(&[1u8; 32][..]).is_ok());
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let a = KeyPair::generate(&mut ChaCha20Rng::seed_from_u64(42));
        let b = KeyPair::generate(&mut ChaCha20Rng::seed_from_u64(42));
        let c = KeyPair::generate(&mut ChaCha20Rng::seed_from_u64(43));
        assert_eq!(a.public, b.public);
        assert_ne!(a.public, c.public);
        assert_eq!(KeyPair::from_secret(a.secret.clone()).public, a.public);
    }

    #[test]
    fn debug_redacts_secrets() {
        let kp = generate_keypair();
        let dbg = format!("{kp:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains(&hex::encode(kp.secret.as_bytes())));
    }
}
