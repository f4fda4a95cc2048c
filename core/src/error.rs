// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for DNSCrypt certificate parsing, key agreement and envelope crypto.

/// Coarse classification of [`Error`].
///
/// Callers that only need to decide whether to drop an inbound message can
/// match on this instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong length, bad magic, truncated segment, bad padding.
    MalformedInput,
    /// AEAD tag check failed on open.
    AuthenticationFailed,
    /// Crypto construction tag is not one we can seal/open with.
    UnsupportedConstruction,
    /// Key has the wrong size or produced a degenerate shared secret.
    InvalidKeyMaterial,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("certificate too short: need {min} bytes, got {got}")]
    CertTooShort { min: usize, got: usize },

    #[error("certificate has trailing data: expected {expected} bytes, got {got}")]
    CertTrailingData { expected: usize, got: usize },

    #[error("invalid certificate magic")]
    CertMagic,

    #[error("message too short: need at least {min} bytes, got {got}")]
    MessageTooShort { min: usize, got: usize },

    #[error("DNS packet too short: need at least {min} bytes, got {got}")]
    PacketTooShort { min: usize, got: usize },

    #[error("DNS packet too long: at most {max} bytes, got {got}")]
    PacketTooLong { max: usize, got: usize },

    #[error("invalid resolver magic")]
    ResolverMagic,

    #[error("invalid client magic")]
    ClientMagic,

    #[error("response nonce does not match query nonce")]
    NonceMismatch,

    #[error("invalid padding")]
    InvalidPadding,

    #[error("TXT segment declares {declared} bytes but only {remaining} remain")]
    TxtSegmentTruncated { declared: usize, remaining: usize },

    #[error("invalid TXT escape sequence at offset {0}")]
    TxtEscape(usize),

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed: authentication failure or data corruption")]
    AuthenticationFailed,

    #[error("unsupported crypto construction: {0:#06x}")]
    UnsupportedConstruction(u16),

    #[error("invalid key material: expected {expected} bytes, got {got}")]
    InvalidKeyMaterial { expected: usize, got: usize },

    #[error("weak public key: key agreement produced a non-contributory secret")]
    WeakPublicKey,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            Error::UnsupportedConstruction(_) => ErrorKind::UnsupportedConstruction,
            Error::InvalidKeyMaterial { .. } | Error::WeakPublicKey => {
                ErrorKind::InvalidKeyMaterial
            }
            Error::CertTooShort { .. }
            | Error::CertTrailingData { .. }
            | Error::CertMagic
            | Error::MessageTooShort { .. }
            | Error::PacketTooShort { .. }
            | Error::PacketTooLong { .. }
            | Error::ResolverMagic
            | Error::ClientMagic
            | Error::NonceMismatch
            | Error::InvalidPadding
            | Error::TxtSegmentTruncated { .. }
            | Error::TxtEscape(_)
            | Error::EncryptionFailed => ErrorKind::MalformedInput,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
