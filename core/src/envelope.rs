// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encrypted DNSCrypt envelopes.
//
// Query (client -> resolver):
//   [ 8 bytes: client magic (from the certificate in use)]
//   [32 bytes: client X25519 public key]
//   [12 bytes: client half-nonce]
//   [N bytes:  secretbox(padded DNS query), tag first]
//
// Response (resolver -> client):
//   [ 8 bytes: resolver magic "r6fnvWj8"]
//   [24 bytes: client half-nonce || resolver half-nonce]
//   [N bytes:  secretbox(padded DNS response), tag first]
//
// The full 24-byte nonce of a query is its 12 random bytes followed by 12
// zero bytes. A response must echo the query's 12 bytes before its own 12.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::debug;

use crate::cert::{Cert, CLIENT_MAGIC_SIZE};
use crate::construction::{CryptoConstruction, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};
use crate::keys::{compute_shared_key, PublicKey, SecretKey, SharedKey};
use crate::padding::{pad, unpad, MAX_DNS_PACKET_SIZE, MIN_DNS_PACKET_SIZE};

/// Magic prefix of every resolver response.
pub const RESOLVER_MAGIC: [u8; 8] = [0x72, 0x36, 0x66, 0x6e, 0x76, 0x57, 0x6a, 0x38];
/// Half of the nonce contributed by each side.
pub const HALF_NONCE_SIZE: usize = NONCE_SIZE / 2;

const QUERY_HEADER_SIZE: usize = CLIENT_MAGIC_SIZE + KEY_SIZE + HALF_NONCE_SIZE;
const RESPONSE_HEADER_SIZE: usize = RESOLVER_MAGIC.len() + NONCE_SIZE;

/// Smallest envelope `EncryptedQuery::decrypt` will look at.
pub const MIN_QUERY_SIZE: usize = QUERY_HEADER_SIZE + TAG_SIZE + MIN_DNS_PACKET_SIZE;
/// Smallest envelope `EncryptedResponse::decrypt` will look at.
pub const MIN_RESPONSE_SIZE: usize = RESPONSE_HEADER_SIZE + TAG_SIZE + MIN_DNS_PACKET_SIZE;

fn check_packet(packet: &[u8]) -> Result<()> {
    if packet.len() < MIN_DNS_PACKET_SIZE {
        return Err(Error::PacketTooShort {
            min: MIN_DNS_PACKET_SIZE,
            got: packet.len(),
        });
    }
    if packet.len() > MAX_DNS_PACKET_SIZE {
        return Err(Error::PacketTooLong {
            max: MAX_DNS_PACKET_SIZE,
            got: packet.len(),
        });
    }
    Ok(())
}

/// An encrypted DNS query.
#[derive(Debug, Clone)]
pub struct EncryptedQuery {
    /// Construction in use, taken from the certificate. Not sent on the wire.
    pub es_version: CryptoConstruction,
    pub client_magic: [u8; CLIENT_MAGIC_SIZE],
    pub client_pk: PublicKey,
    pub nonce: [u8; NONCE_SIZE],
}

/// Result of opening a query on the resolver side.
#[derive(Debug)]
pub struct DecryptedQuery {
    pub packet: Vec<u8>,
    /// Key to seal the matching response with.
    pub shared_key: SharedKey,
}

impl EncryptedQuery {
    /// A query addressed to the resolver advertised by `cert`.
    pub fn new(cert: &Cert, client_pk: PublicKey) -> Self {
        Self {
            es_version: cert.es_version,
            client_magic: cert.client_magic,
            client_pk,
            nonce: [0u8; NONCE_SIZE],
        }
    }

    /// Encrypt `packet` with a fresh nonce from the OS random source.
    pub fn encrypt(&mut self, packet: &[u8], shared_key: &SharedKey) -> Result<Vec<u8>> {
        self.encrypt_with_rng(packet, shared_key, &mut OsRng)
    }

    pub fn encrypt_with_rng<R: RngCore + CryptoRng + ?Sized>(
        &mut self,
        packet: &[u8],
        shared_key: &SharedKey,
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let cipher = self.es_version.cipher()?;
        check_packet(packet)?;

        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce[..HALF_NONCE_SIZE]);

        let sealed = cipher.seal(shared_key.as_bytes(), &nonce, &pad(packet))?;
        self.nonce = nonce;

        let mut wire = Vec::with_capacity(QUERY_HEADER_SIZE + sealed.len());
        wire.extend_from_slice(&self.client_magic);
        wire.extend_from_slice(self.client_pk.as_bytes());
        wire.extend_from_slice(&self.nonce[..HALF_NONCE_SIZE]);
        wire.extend_from_slice(&sealed);
        Ok(wire)
    }

    /// Resolver side: open a query with the resolver's short-term secret key.
    ///
    /// `self.client_magic` must be set to the magic of the certificate the
    /// resolver is serving. On success the client public key and nonce are
    /// recorded in `self`; on failure `self` is left untouched.
    pub fn decrypt(&mut self, query: &[u8], resolver_sk: &SecretKey) -> Result<DecryptedQuery> {
        if query.len() < MIN_QUERY_SIZE {
            debug!(got = query.len(), "dropping short query");
            return Err(Error::MessageTooShort {
                min: MIN_QUERY_SIZE,
                got: query.len(),
            });
        }
        if query[..CLIENT_MAGIC_SIZE] != self.client_magic {
            debug!("dropping query with unknown client magic");
            return Err(Error::ClientMagic);
        }

        let client_pk = PublicKey::try_from(&query[CLIENT_MAGIC_SIZE..CLIENT_MAGIC_SIZE + KEY_SIZE])?;
        let shared_key = compute_shared_key(self.es_version, resolver_sk, &client_pk)?;

        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..HALF_NONCE_SIZE]
            .copy_from_slice(&query[CLIENT_MAGIC_SIZE + KEY_SIZE..QUERY_HEADER_SIZE]);

        let cipher = self.es_version.cipher()?;
        let padded = cipher.open(shared_key.as_bytes(), &nonce, &query[QUERY_HEADER_SIZE..])?;
        let packet = unpad(&padded)?.to_vec();

        self.client_pk = client_pk;
        self.nonce = nonce;
        Ok(DecryptedQuery { packet, shared_key })
    }

    /// A response bound to this query's client half-nonce.
    pub fn response(&self) -> EncryptedResponse {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..HALF_NONCE_SIZE].copy_from_slice(&self.nonce[..HALF_NONCE_SIZE]);
        EncryptedResponse {
            es_version: self.es_version,
            nonce,
        }
    }

    /// Client side: open the resolver's answer to this query.
    ///
    /// In addition to everything [`EncryptedResponse::decrypt`] checks, the
    /// response nonce must start with this query's half-nonce.
    pub fn decrypt_response(&self, response: &[u8], shared_key: &SharedKey) -> Result<Vec<u8>> {
        let mut r = self.response();
        let packet = r.decrypt(response, shared_key)?;
        if r.nonce[..HALF_NONCE_SIZE] != self.nonce[..HALF_NONCE_SIZE] {
            debug!("dropping response bound to another query");
            return Err(Error::NonceMismatch);
        }
        Ok(packet)
    }
}

/// An encrypted DNS response.
#[derive(Debug, Clone)]
pub struct EncryptedResponse {
    /// Construction in use, taken from the certificate. Not sent on the wire.
    pub es_version: CryptoConstruction,
    /// Client half-nonce followed by resolver half-nonce.
    pub nonce: [u8; NONCE_SIZE],
}

impl EncryptedResponse {
    pub fn new(es_version: CryptoConstruction) -> Self {
        Self {
            es_version,
            nonce: [0u8; NONCE_SIZE],
        }
    }

    /// Encrypt `packet`. The client half of `self.nonce` is kept, the
    /// resolver half is drawn from the OS random source.
    pub fn encrypt(&mut self, packet: &[u8], shared_key: &SharedKey) -> Result<Vec<u8>> {
        self.encrypt_with_rng(packet, shared_key, &mut OsRng)
    }

    pub fn encrypt_with_rng<R: RngCore + CryptoRng + ?Sized>(
        &mut self,
        packet: &[u8],
        shared_key: &SharedKey,
        rng: &mut R,
    ) -> Result<Vec<u8>> {
        let cipher = self.es_version.cipher()?;
        check_packet(packet)?;

        let mut nonce = self.nonce;
        rng.fill_bytes(&mut nonce[HALF_NONCE_SIZE..]);

        let sealed = cipher.seal(shared_key.as_bytes(), &nonce, &pad(packet))?;
        self.nonce = nonce;

        let mut wire = Vec::with_capacity(RESPONSE_HEADER_SIZE + sealed.len());
        wire.extend_from_slice(&RESOLVER_MAGIC);
        wire.extend_from_slice(&self.nonce);
        wire.extend_from_slice(&sealed);
        Ok(wire)
    }

    /// Open a response. On success the nonce is recorded in `self`.
    pub fn decrypt(&mut self, response: &[u8], shared_key: &SharedKey) -> Result<Vec<u8>> {
        if response.len() < MIN_RESPONSE_SIZE {
            debug!(got = response.len(), "dropping short response");
            return Err(Error::MessageTooShort {
                min: MIN_RESPONSE_SIZE,
                got: response.len(),
            });
        }
        if response[..RESOLVER_MAGIC.len()] != RESOLVER_MAGIC {
            debug!("dropping response with bad resolver magic");
            return Err(Error::ResolverMagic);
        }
        let cipher = self.es_version.cipher()?;

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&response[RESOLVER_MAGIC.len()..RESPONSE_HEADER_SIZE]);

        let padded = cipher.open(shared_key.as_bytes(), &nonce, &response[RESPONSE_HEADER_SIZE..])?;
        let packet = unpad(&padded)?.to_vec();

        self.nonce = nonce;
        Ok(packet)
    }
}
