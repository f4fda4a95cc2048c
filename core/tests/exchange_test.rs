// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! End-to-end client/resolver exchange: certificate -> shared key -> query -> response.

use dnscrypt_core::envelope::HALF_NONCE_SIZE;
use dnscrypt_core::{
    compute_shared_key, generate_keypair, select_cert, Cert, CertIssuer, CertParams,
    CryptoConstruction, EncryptedQuery, Error, ErrorKind, IssuedCert, SigningKey,
};
use rand::rngs::OsRng;
use rand::RngCore;

const NOW: u32 = 1_700_000_000;

/// Minimal DNS query for example.com A.
const QUERY: &[u8] = &[
    0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, b'e', b'x',
    b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, 0x00, 0x01, 0x00, 0x01,
];

struct Resolver {
    issuer: CertIssuer,
    issued: IssuedCert,
}

impl Resolver {
    fn new(construction: CryptoConstruction) -> Self {
        let issuer = CertIssuer::new(SigningKey::generate(&mut OsRng));
        let issued = issuer
            .issue(
                CertParams {
                    construction,
                    serial: 1,
                    not_before: NOW - 60,
                    not_after: NOW + 60,
                },
                &mut OsRng,
            )
            .unwrap();
        Self { issuer, issued }
    }

    /// Open a query and answer it with `answer`.
    fn answer(&self, wire: &[u8], answer: &[u8]) -> Result<Vec<u8>, Error> {
        let mut query = EncryptedQuery::new(&self.issued.cert, generate_keypair().public);
        let opened = query.decrypt(wire, &self.issued.resolver_keys.secret)?;
        assert_eq!(opened.packet, QUERY);
        query.response().encrypt(answer, &opened.shared_key)
    }
}

fn answer_packet() -> Vec<u8> {
    let mut answer = QUERY.to_vec();
    answer[2] = 0x81;
    answer[3] = 0x80;
    answer.extend_from_slice(&[0xc0, 0x0c, 0, 1, 0, 1, 0, 0, 0x0e, 0x10, 0, 4, 93, 184, 216, 34]);
    answer
}

fn exchange(construction: CryptoConstruction) {
    let resolver = Resolver::new(construction);

    // client side: pick and trust the certificate
    let record = resolver.issued.cert.serialize();
    let cert = select_cert([&record[..]], &resolver.issuer.provider_public_key(), NOW).unwrap();
    assert_eq!(cert.es_version, construction);

    let client = generate_keypair();
    let shared_key = compute_shared_key(cert.es_version, &client.secret, &cert.resolver_pk).unwrap();

    let mut query = EncryptedQuery::new(&cert, client.public);
    let wire = query.encrypt(QUERY, &shared_key).unwrap();
    assert_eq!(&wire[..8], &cert.client_magic);

    let response = resolver.answer(&wire, &answer_packet()).unwrap();
    assert_eq!(&response[8..8 + HALF_NONCE_SIZE], &query.nonce[..HALF_NONCE_SIZE]);

    let answer = query.decrypt_response(&response, &shared_key).unwrap();
    assert_eq!(answer, answer_packet());
}

#[test]
fn test_exchange_xsalsa20poly1305() {
    exchange(CryptoConstruction::XSalsa20Poly1305);
}

#[test]
fn test_exchange_xchacha20poly1305() {
    exchange(CryptoConstruction::XChacha20Poly1305);
}

fn client_for(cert: &Cert) -> (EncryptedQuery, dnscrypt_core::SharedKey) {
    let client = generate_keypair();
    let key = compute_shared_key(cert.es_version, &client.secret, &cert.resolver_pk).unwrap();
    (EncryptedQuery::new(cert, client.public), key)
}

#[test]
fn test_response_to_another_query_is_rejected() {
    let resolver = Resolver::new(CryptoConstruction::XChacha20Poly1305);
    let cert = &resolver.issued.cert;
    let (mut query, key) = client_for(cert);

    let first = query.encrypt(QUERY, &key).unwrap();
    let first_nonce = query.nonce;
    let response = resolver.answer(&first, &answer_packet()).unwrap();

    // client sends a second query with the same key before the answer arrives
    query.encrypt(QUERY, &key).unwrap();
    assert_ne!(query.nonce, first_nonce);

    let err = query.decrypt_response(&response, &key).unwrap_err();
    assert!(matches!(err, Error::NonceMismatch));
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn test_resolver_rejects_foreign_client_magic() {
    let resolver = Resolver::new(CryptoConstruction::XSalsa20Poly1305);
    let other = Resolver::new(CryptoConstruction::XSalsa20Poly1305);
    let (mut query, key) = client_for(&other.issued.cert);

    let wire = query.encrypt(QUERY, &key).unwrap();
    assert!(matches!(
        resolver.answer(&wire, &answer_packet()),
        Err(Error::ClientMagic)
    ));
}

#[test]
fn test_resolver_rejects_tampered_query() {
    let resolver = Resolver::new(CryptoConstruction::XChacha20Poly1305);
    let (mut query, key) = client_for(&resolver.issued.cert);
    let wire = query.encrypt(QUERY, &key).unwrap();

    // flip a bit in the client half-nonce, then in the ciphertext
    for offset in [8 + 32, wire.len() - 1] {
        let mut tampered = wire.clone();
        tampered[offset] ^= 0x80;
        let err = resolver.answer(&tampered, &answer_packet()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    }
}

#[test]
fn test_resolver_rejects_short_and_random_queries() {
    let resolver = Resolver::new(CryptoConstruction::XSalsa20Poly1305);
    let magic = resolver.issued.cert.client_magic;

    assert!(matches!(
        resolver.answer(&[], &answer_packet()),
        Err(Error::MessageTooShort { .. })
    ));

    let mut garbage = vec![0u8; dnscrypt_core::envelope::MIN_QUERY_SIZE];
    OsRng.fill_bytes(&mut garbage);
    garbage[..8].copy_from_slice(&magic);
    let err = resolver.answer(&garbage, &answer_packet()).unwrap_err();
    assert_ne!(err.kind(), ErrorKind::UnsupportedConstruction);
}
