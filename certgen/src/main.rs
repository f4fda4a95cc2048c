// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// dnscrypt-certgen: provider key and resolver certificate tooling
//
// A DNSCrypt provider holds a long-term Ed25519 key. Resolvers run with a
// short-term X25519 key pair announced in a certificate signed by that key
// and published as a TXT record at 2.dnscrypt-cert.<provider name>.
//
//   keygen   new provider key pair
//   issue    sign a certificate for a fresh resolver key pair
//   inspect  decode a published certificate and check it

mod config;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use base64::Engine;
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dnscrypt_core::{
    escape_txt, unescape_txt, Cert, CertIssuer, CertParams, CryptoConstruction, SigningKey,
    VerifyingKey, CERT_SIZE,
};
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::config::IssueConfig;

#[derive(Parser)]
#[command(name = "dnscrypt-certgen", about = "Issue and inspect DNSCrypt resolver certificates")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new Ed25519 provider key pair and print it hex-encoded
    Keygen,
    /// Issue a certificate for a fresh resolver key pair
    Issue(IssueArgs),
    /// Decode a certificate and report its fields
    Inspect(InspectArgs),
}

#[derive(ClapArgs)]
struct IssueArgs {
    /// Ed25519 provider secret key (hex, 32 bytes)
    #[arg(long, conflicts_with = "provider_secret_file")]
    provider_secret: Option<String>,

    /// Path to file containing the hex-encoded provider secret key
    #[arg(long, conflicts_with = "provider_secret")]
    provider_secret_file: Option<PathBuf>,

    /// Encryption construction (xsalsa20poly1305 or xchacha20poly1305)
    #[arg(long)]
    construction: Option<CryptoConstruction>,

    /// Certificate serial (default: current Unix time)
    #[arg(long)]
    serial: Option<u32>,

    /// Validity window (e.g. "24h", "90m")
    #[arg(long, value_parser = parse_duration)]
    valid_for: Option<Duration>,

    /// TOML file with issuance defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(ClapArgs)]
struct InspectArgs {
    #[command(flatten)]
    source: CertSource,

    /// Provider public key (hex or base64) to verify the signature against
    #[arg(long)]
    provider_public: Option<String>,
}

#[derive(ClapArgs)]
#[group(required = true, multiple = false)]
struct CertSource {
    /// Certificate in TXT presentation form, as printed by dig
    #[arg(long)]
    txt: Option<String>,

    /// Certificate as hex
    #[arg(long)]
    hex: Option<String>,

    /// File holding the certificate in TXT presentation form
    #[arg(long)]
    file: Option<PathBuf>,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Some(hours) = s.strip_suffix('h') {
        let h: u64 = hours.parse().map_err(|e| format!("invalid hours: {e}"))?;
        let secs = h.checked_mul(3600).ok_or_else(|| format!("{h}h is too long"))?;
        Ok(Duration::from_secs(secs))
    } else if let Some(mins) = s.strip_suffix('m') {
        let m: u64 = mins.parse().map_err(|e| format!("invalid minutes: {e}"))?;
        let secs = m.checked_mul(60).ok_or_else(|| format!("{m}m is too long"))?;
        Ok(Duration::from_secs(secs))
    } else if let Some(secs) = s.strip_suffix('s') {
        let s: u64 = secs.parse().map_err(|e| format!("invalid seconds: {e}"))?;
        Ok(Duration::from_secs(s))
    } else {
        let s: u64 = s.parse().map_err(|e| format!("invalid duration: {e}"))?;
        Ok(Duration::from_secs(s))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Keygen => keygen(),
        Command::Issue(issue_args) => issue(issue_args),
        Command::Inspect(inspect_args) => inspect(inspect_args),
    }
}

/// Generate and print a new provider key pair.
fn keygen() -> anyhow::Result<()> {
    let sk = SigningKey::generate(&mut OsRng);
    let pk = sk.verifying_key();

    println!("DNSCrypt provider key pair (Ed25519)");
    println!("====================================");
    println!();
    println!("Public Key  (32 bytes, hex):");
    println!("{}", hex::encode(pk.as_bytes()));
    println!();
    println!("Secret Key  (32 bytes, hex):");
    println!("{}", hex::encode(sk.to_bytes()));
    println!();
    println!("Publish the public key in the provider's DNS stamp.");
    println!("Keep the secret key offline; it is only needed to issue certificates.");

    Ok(())
}

fn issue(args: IssueArgs) -> anyhow::Result<()> {
    let cfg = IssueConfig::load(args.config.as_deref())
        .context("loading issuance configuration")?;

    let provider_key = load_provider_secret(&args, &cfg)?;
    let issuer = CertIssuer::new(provider_key);

    let now = unix_now()?;
    let validity = args.valid_for.unwrap_or_else(|| cfg.validity());
    let not_before = now.saturating_sub(secs_u32(cfg.backdate())?);
    let not_after = now
        .checked_add(secs_u32(validity)?)
        .context("validity window ends after 2106")?;

    let params = CertParams {
        construction: args.construction.unwrap_or(cfg.construction),
        serial: args.serial.unwrap_or(now),
        not_before,
        not_after,
    };
    let issued = issuer.issue(params, &mut OsRng)?;
    let wire = issued.cert.serialize();

    info!(
        serial = issued.cert.serial,
        construction = %issued.cert.es_version,
        not_after = %format_ts(issued.cert.not_after),
        "issued certificate"
    );

    println!("Certificate ({CERT_SIZE} bytes, TXT presentation form):");
    println!("{}", escape_txt(&wire));
    println!();
    println!("Certificate (hex):");
    println!("{}", hex::encode(wire));
    println!();
    println!("Resolver secret key (32 bytes, hex):");
    println!("{}", hex::encode(issued.resolver_keys.secret.as_bytes()));
    println!();
    println!("Client magic: {}", hex::encode(issued.cert.client_magic));
    println!("Valid:        {} .. {}", format_ts(not_before), format_ts(not_after));

    Ok(())
}

fn inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = if let Some(ref txt) = args.source.txt {
        unescape_txt(txt)?
    } else if let Some(ref h) = args.source.hex {
        hex::decode(h.trim()).context("certificate is not valid hex")?
    } else if let Some(ref path) = args.source.file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        unescape_txt(&text)?
    } else {
        anyhow::bail!("provide --txt, --hex or --file");
    };

    let cert = Cert::deserialize(&bytes)?;
    let now = unix_now()?;

    println!("Construction:    {} ({:#06x})", cert.es_version, cert.es_version.to_wire());
    println!("Minor version:   {}", cert.minor_version);
    println!("Serial:          {}", cert.serial);
    println!("Resolver key:    {}", hex::encode(cert.resolver_pk.as_bytes()));
    println!("Client magic:    {}", hex::encode(cert.client_magic));
    println!("Not before:      {}", format_ts(cert.not_before));
    println!("Not after:       {}", format_ts(cert.not_after));
    println!("Signature:       {}", hex::encode(cert.signature));

    if cert.is_valid_at(now) {
        println!("Validity:        current");
    } else {
        warn!(now, "certificate is outside its validity window");
        println!("Validity:        NOT valid at {}", format_ts(now));
    }

    if let Some(ref provider) = args.provider_public {
        let key = parse_provider_public(provider)?;
        if cert.verify_signature(&key) {
            println!("Signature check: ok");
        } else {
            println!("Signature check: FAILED");
            anyhow::bail!("certificate signature does not verify against the provider key");
        }
    }

    Ok(())
}

fn load_provider_secret(args: &IssueArgs, cfg: &IssueConfig) -> anyhow::Result<SigningKey> {
    let encoded = if let Some(ref h) = args.provider_secret {
        h.clone()
    } else if let Some(path) = args
        .provider_secret_file
        .as_deref()
        .or(cfg.provider_secret_file.as_deref())
    {
        read_secret_file(path)?
    } else {
        anyhow::bail!(
            "provide --provider-secret (hex) or --provider-secret-file\n\
             generate a provider key with: dnscrypt-certgen keygen"
        );
    };

    let bytes: [u8; 32] = hex::decode(encoded.trim())
        .context("provider secret is not valid hex")?
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("provider secret must be 32 bytes, got {}", b.len()))?;
    Ok(SigningKey::from_bytes(&bytes))
}

fn read_secret_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Accepts the key as hex or standard base64.
fn parse_provider_public(s: &str) -> anyhow::Result<VerifyingKey> {
    let s = s.trim();
    let bytes = match hex::decode(s) {
        Ok(b) => b,
        Err(_) => base64::engine::general_purpose::STANDARD
            .decode(s)
            .context("provider public key is neither hex nor base64")?,
    };
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("provider public key must be 32 bytes, got {}", b.len()))?;
    Ok(VerifyingKey::from_bytes(&bytes)?)
}

fn unix_now() -> anyhow::Result<u32> {
    u32::try_from(Utc::now().timestamp()).context("system clock is outside the u32 timestamp range")
}

fn secs_u32(d: Duration) -> anyhow::Result<u32> {
    u32::try_from(d.as_secs()).context("duration does not fit in 32 bits")
}

fn format_ts(ts: u32) -> String {
    DateTime::<Utc>::from_timestamp(i64::from(ts), 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}
