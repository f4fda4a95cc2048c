// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DNSCrypt Core: resolver certificates and encrypted query/response framing
//
// Cryptographic stack (DNSCrypt v2):
//   Key agreement: X25519
//   Constructions: XSalsa20-Poly1305  (HSalsa20 key derivation), es-version 1
//                  XChaCha20-Poly1305 (HChaCha20 key derivation), es-version 2
//   Certificates:  Ed25519 signatures by the provider key
//   RNG:           OsRng, or any caller-supplied CryptoRng
//
// Everything here is synchronous and performs no I/O. Fetching certificates
// from DNS and moving envelopes over UDP/TCP is up to the caller.

pub mod cert;
pub mod construction;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod padding;
pub mod txt;

pub use cert::{select_cert, Cert, CertIssuer, CertParams, IssuedCert, CERT_SIZE};
pub use construction::{Cipher, CryptoConstruction};
pub use envelope::{DecryptedQuery, EncryptedQuery, EncryptedResponse};
pub use error::{Error, ErrorKind, Result};
pub use keys::{compute_shared_key, generate_keypair, KeyPair, PublicKey, SecretKey, SharedKey};
pub use txt::{escape_txt, unescape_txt, unpack_txt_string};

// Provider signing keys are plain ed25519-dalek types.
pub use ed25519_dalek::{SigningKey, VerifyingKey};
