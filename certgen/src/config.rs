// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Issuance defaults for `dnscrypt-certgen issue`.
//!
//! Loaded from an optional TOML file, then `DNSCRYPT_*` environment
//! variables. Command-line flags override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dnscrypt_core::CryptoConstruction;
use serde::{Deserialize, Serialize};

/// Defaults applied when issuing a certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueConfig {
    /// Encryption construction announced in the certificate (default: xchacha20poly1305)
    #[serde(default = "default_construction")]
    pub construction: CryptoConstruction,

    /// Length of the validity window in seconds (default: 86400)
    #[serde(default = "default_validity_secs")]
    pub validity_secs: u64,

    /// Start the window this many seconds in the past, for clock skew (default: 0)
    #[serde(default)]
    pub backdate_secs: u64,

    /// File holding the hex-encoded Ed25519 provider secret key
    #[serde(default)]
    pub provider_secret_file: Option<PathBuf>,
}

fn default_construction() -> CryptoConstruction {
    CryptoConstruction::XChacha20Poly1305
}

fn default_validity_secs() -> u64 {
    86400 // one day, rotate daily
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            construction: default_construction(),
            validity_secs: default_validity_secs(),
            backdate_secs: 0,
            provider_secret_file: None,
        }
    }
}

impl IssueConfig {
    /// Load from `path` (if given) layered under `DNSCRYPT_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(config::Environment::with_prefix("DNSCRYPT"))
            .build()?
            .try_deserialize()
    }

    pub fn validity(&self) -> Duration {
        Duration::from_secs(self.validity_secs)
    }

    pub fn backdate(&self) -> Duration {
        Duration::from_secs(self.backdate_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = IssueConfig::default();
        assert_eq!(cfg.construction, CryptoConstruction::XChacha20Poly1305);
        assert_eq!(cfg.validity(), Duration::from_secs(86400));
        assert_eq!(cfg.backdate(), Duration::ZERO);
        assert!(cfg.provider_secret_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("dnscrypt-certgen-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "construction = \"xsalsa20poly1305\"").unwrap();
        writeln!(file, "validity_secs = 3600").unwrap();
        drop(file);

        let cfg = IssueConfig::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.construction, CryptoConstruction::XSalsa20Poly1305);
        assert_eq!(cfg.validity_secs, 3600);
        assert_eq!(cfg.backdate_secs, 0);
    }

    #[test]
    fn test_unknown_construction_is_rejected() {
        let path = std::env::temp_dir().join(format!("dnscrypt-certgen-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "construction = \"aes256gcm\"\n").unwrap();

        let result = IssueConfig::load(Some(&path));
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("dnscrypt-certgen-does-not-exist.toml");
        assert!(IssueConfig::load(Some(&path)).is_err());
    }
}
