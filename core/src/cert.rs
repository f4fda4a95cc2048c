// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DNSCrypt resolver certificate.
//
// Wire format (124 bytes, big-endian integers):
//   [  0.. 4] cert magic "DNSC"
//   [  4.. 6] es-version (crypto construction)
//   [  6.. 8] protocol minor version
//   [  8..72] Ed25519 signature over bytes 72..124
//   [ 72..104] resolver short-term X25519 public key
//   [104..112] client magic
//   [112..116] serial
//   [116..120] ts-start (not before)
//   [120..124] ts-end   (not after)

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::construction::{CryptoConstruction, KEY_SIZE};
use crate::error::{Error, Result};
use crate::keys::{KeyPair, PublicKey};

/// Certificate magic: "DNSC".
pub const CERT_MAGIC: [u8; 4] = *b"DNSC";
/// Serialized certificate size (bytes).
pub const CERT_SIZE: usize = 124;
/// Ed25519 signature size (bytes).
pub const SIGNATURE_SIZE: usize = 64;
/// Client magic size (bytes).
pub const CLIENT_MAGIC_SIZE: usize = 8;

const SIGNATURE_OFFSET: usize = 8;
const SIGNED_OFFSET: usize = SIGNATURE_OFFSET + SIGNATURE_SIZE;
/// Size of the signed tail: resolver pk, client magic, serial, ts-start, ts-end.
pub const SIGNED_SIZE: usize = CERT_SIZE - SIGNED_OFFSET;

/// A resolver certificate as it appears on the wire.
///
/// Carries only public material. The resolver's short-term secret key is
/// returned separately by [`CertIssuer::issue`] so it can never be
/// serialized along with the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cert {
    pub es_version: CryptoConstruction,
    pub minor_version: u16,
    pub signature: [u8; SIGNATURE_SIZE],
    pub resolver_pk: PublicKey,
    pub client_magic: [u8; CLIENT_MAGIC_SIZE],
    pub serial: u32,
    pub not_before: u32,
    pub not_after: u32,
}

impl Default for Cert {
    fn default() -> Self {
        Self {
            es_version: CryptoConstruction::Undefined(0),
            minor_version: 0,
            signature: [0u8; SIGNATURE_SIZE],
            resolver_pk: PublicKey::from_bytes([0u8; KEY_SIZE]),
            client_magic: [0u8; CLIENT_MAGIC_SIZE],
            serial: 0,
            not_before: 0,
            not_after: 0,
        }
    }
}

fn read_array<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

impl Cert {
    /// Serialize to the fixed 124-byte wire layout.
    pub fn serialize(&self) -> [u8; CERT_SIZE] {
        let mut b = [0u8; CERT_SIZE];
        b[..4].copy_from_slice(&CERT_MAGIC);
        b[4..6].copy_from_slice(&self.es_version.to_wire().to_be_bytes());
        b[6..8].copy_from_slice(&self.minor_version.to_be_bytes());
        b[SIGNATURE_OFFSET..SIGNED_OFFSET].copy_from_slice(&self.signature);
        b[SIGNED_OFFSET..].copy_from_slice(&self.signed_region());
        b
    }

    /// Parse a certificate. Does not verify the signature or the dates.
    ///
    /// Unknown es-versions are kept as [`CryptoConstruction::Undefined`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CERT_SIZE {
            return Err(Error::CertTooShort {
                min: CERT_SIZE,
                got: bytes.len(),
            });
        }
        if bytes.len() > CERT_SIZE {
            return Err(Error::CertTrailingData {
                expected: CERT_SIZE,
                got: bytes.len(),
            });
        }
        if bytes[..4] != CERT_MAGIC {
            return Err(Error::CertMagic);
        }

        Ok(Self {
            es_version: CryptoConstruction::from_wire(u16::from_be_bytes(read_array(bytes, 4))),
            minor_version: u16::from_be_bytes(read_array(bytes, 6)),
            signature: read_array(bytes, SIGNATURE_OFFSET),
            resolver_pk: PublicKey::from_bytes(read_array(bytes, 72)),
            client_magic: read_array(bytes, 104),
            serial: u32::from_be_bytes(read_array(bytes, 112)),
            not_before: u32::from_be_bytes(read_array(bytes, 116)),
            not_after: u32::from_be_bytes(read_array(bytes, 120)),
        })
    }

    /// The bytes covered by the signature, in wire order.
    pub fn signed_region(&self) -> [u8; SIGNED_SIZE] {
        let mut b = [0u8; SIGNED_SIZE];
        b[..32].copy_from_slice(self.resolver_pk.as_bytes());
        b[32..40].copy_from_slice(&self.client_magic);
        b[40..44].copy_from_slice(&self.serial.to_be_bytes());
        b[44..48].copy_from_slice(&self.not_before.to_be_bytes());
        b[48..52].copy_from_slice(&self.not_after.to_be_bytes());
        b
    }

    /// Sign the certificate with the provider's long-term Ed25519 key.
    pub fn sign(&mut self, provider_key: &SigningKey) {
        self.signature = provider_key.sign(&self.signed_region()).to_bytes();
    }

    /// Check the signature against the provider's public key.
    ///
    /// Returns `false` on any mismatch, including a never-signed certificate.
    pub fn verify_signature(&self, provider_key: &VerifyingKey) -> bool {
        let signature = Signature::from_bytes(&self.signature);
        provider_key
            .verify(&self.signed_region(), &signature)
            .is_ok()
    }

    /// `not_before <= now <= not_after`, with `now` in UNIX seconds.
    pub fn is_valid_at(&self, now: u32) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

impl TryFrom<&[u8]> for Cert {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Cert::deserialize(bytes)
    }
}

/// Parameters for a new certificate.
#[derive(Debug, Clone, Copy)]
pub struct CertParams {
    pub construction: CryptoConstruction,
    pub serial: u32,
    pub not_before: u32,
    pub not_after: u32,
}

/// A freshly issued certificate together with the resolver key pair it advertises.
#[derive(Debug, Clone)]
pub struct IssuedCert {
    pub cert: Cert,
    pub resolver_keys: KeyPair,
}

/// Issues certificates on behalf of a DNSCrypt provider.
pub struct CertIssuer {
    provider_key: SigningKey,
}

impl CertIssuer {
    pub fn new(provider_key: SigningKey) -> Self {
        Self { provider_key }
    }

    pub fn provider_public_key(&self) -> VerifyingKey {
        self.provider_key.verifying_key()
    }

    /// Issue a certificate for a fresh resolver key pair drawn from `rng`.
    pub fn issue<R: RngCore + CryptoRng + ?Sized>(
        &self,
        params: CertParams,
        rng: &mut R,
    ) -> Result<IssuedCert> {
        self.issue_for(params, KeyPair::generate(rng))
    }

    /// Issue a certificate for an existing resolver key pair.
    ///
    /// The client magic is the first 8 bytes of the resolver public key, so
    /// two certificates for different resolver keys never share one.
    pub fn issue_for(&self, params: CertParams, resolver_keys: KeyPair) -> Result<IssuedCert> {
        params.construction.cipher()?;

        let mut client_magic = [0u8; CLIENT_MAGIC_SIZE];
        client_magic.copy_from_slice(&resolver_keys.public.as_bytes()[..CLIENT_MAGIC_SIZE]);

        let mut cert = Cert {
            es_version: params.construction,
            minor_version: 0,
            signature: [0u8; SIGNATURE_SIZE],
            resolver_pk: resolver_keys.public,
            client_magic,
            serial: params.serial,
            not_before: params.not_before,
            not_after: params.not_after,
        };
        cert.sign(&self.provider_key);

        debug!(
            serial = cert.serial,
            construction = %cert.es_version,
            not_before = cert.not_before,
            not_after = cert.not_after,
            "issued certificate"
        );

        Ok(IssuedCert {
            cert,
            resolver_keys,
        })
    }
}

/// Pick the certificate a client should use out of several published ones.
///
/// Candidates that fail to parse, carry a bad signature, are outside their
/// validity window at `now`, or use an undefined construction are skipped.
/// Among the rest the highest serial wins; on equal serials the higher
/// construction value wins.
pub fn select_cert<'a, I>(candidates: I, provider_key: &VerifyingKey, now: u32) -> Option<Cert>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut best: Option<Cert> = None;

    for (index, raw) in candidates.into_iter().enumerate() {
        let cert = match Cert::deserialize(raw) {
            Ok(cert) => cert,
            Err(e) => {
                debug!(index, error = %e, "skipping unparsable certificate");
                continue;
            }
        };
        if !cert.es_version.is_supported() {
            debug!(index, construction = %cert.es_version, "skipping certificate with unsupported construction");
            continue;
        }
        if !cert.is_valid_at(now) {
            debug!(index, serial = cert.serial, "skipping certificate outside its validity window");
            continue;
        }
        if !cert.verify_signature(provider_key) {
            debug!(index, serial = cert.serial, "skipping certificate with bad signature");
            continue;
        }

        let better = match &best {
            None => true,
            Some(current) => {
                (cert.serial, cert.es_version.to_wire())
                    > (current.serial, current.es_version.to_wire())
            }
        };
        if better {
            best = Some(cert);
        }
    }

    best
}
