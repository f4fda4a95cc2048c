// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Randomized property tests for certificates, key agreement and envelopes.

use dnscrypt_core::cert::{CLIENT_MAGIC_SIZE, SIGNATURE_SIZE};
use dnscrypt_core::padding::MIN_DNS_PACKET_SIZE;
use dnscrypt_core::{
    compute_shared_key, Cert, CryptoConstruction, EncryptedResponse, Error, KeyPair, PublicKey,
    SigningKey, CERT_SIZE,
};
use proptest::prelude::*;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn construction() -> impl Strategy<Value = CryptoConstruction> {
    prop_oneof![
        Just(CryptoConstruction::XSalsa20Poly1305),
        Just(CryptoConstruction::XChacha20Poly1305),
    ]
}

fn any_construction() -> impl Strategy<Value = CryptoConstruction> {
    any::<u16>().prop_map(CryptoConstruction::from_wire)
}

fn cert() -> impl Strategy<Value = Cert> {
    (
        any_construction(),
        any::<u16>(),
        prop::array::uniform32(any::<u8>()),
        prop::array::uniform8(any::<u8>()),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(
            |(es_version, minor_version, pk, client_magic, serial, not_before, not_after)| Cert {
                es_version,
                minor_version,
                signature: [0u8; SIGNATURE_SIZE],
                resolver_pk: PublicKey::from_bytes(pk),
                client_magic,
                serial,
                not_before,
                not_after,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn cert_roundtrip(c in cert(), seed in any::<u64>()) {
        let mut c = c;
        c.sign(&SigningKey::generate(&mut ChaCha20Rng::seed_from_u64(seed)));

        let bytes = c.serialize();
        prop_assert_eq!(bytes.len(), CERT_SIZE);
        let parsed = Cert::deserialize(&bytes).unwrap();
        prop_assert_eq!(&parsed, &c);
        prop_assert_eq!(parsed.serialize(), bytes);
    }

    #[test]
    fn signature_detects_single_byte_flips(
        c in cert(),
        seed in any::<u64>(),
        offset in 8usize..CERT_SIZE,
        flip in 1u8..=255,
    ) {
        let provider = SigningKey::generate(&mut ChaCha20Rng::seed_from_u64(seed));
        let mut c = c;
        c.sign(&provider);
        prop_assert!(c.verify_signature(&provider.verifying_key()));

        let mut bytes = c.serialize();
        bytes[offset] ^= flip;
        let tampered = Cert::deserialize(&bytes).unwrap();
        prop_assert!(!tampered.verify_signature(&provider.verifying_key()));
    }

    #[test]
    fn unsigned_cert_never_verifies(c in cert(), seed in any::<u64>()) {
        let provider = SigningKey::generate(&mut ChaCha20Rng::seed_from_u64(seed));
        prop_assert!(!c.verify_signature(&provider.verifying_key()));
    }

    #[test]
    fn shared_keys_agree(c in construction(), a in any::<u64>(), b in any::<u64>()) {
        prop_assume!(a != b);
        let alice = KeyPair::generate(&mut ChaCha20Rng::seed_from_u64(a));
        let bob = KeyPair::generate(&mut ChaCha20Rng::seed_from_u64(b));

        let k1 = compute_shared_key(c, &alice.secret, &bob.public).unwrap();
        let k2 = compute_shared_key(c, &bob.secret, &alice.public).unwrap();
        prop_assert_eq!(k1, k2);
    }

    #[test]
    fn response_roundtrip(
        c in construction(),
        packet in prop::collection::vec(any::<u8>(), MIN_DNS_PACKET_SIZE..1500),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let client = KeyPair::generate(&mut rng);
        let server = KeyPair::generate(&mut rng);
        let stranger = KeyPair::generate(&mut rng);

        let server_key = compute_shared_key(c, &server.secret, &client.public).unwrap();
        let client_key = compute_shared_key(c, &client.secret, &server.public).unwrap();
        let wrong_key = compute_shared_key(c, &stranger.secret, &server.public).unwrap();

        let wire = EncryptedResponse::new(c)
            .encrypt_with_rng(&packet, &server_key, &mut rng)
            .unwrap();

        let decrypted = EncryptedResponse::new(c).decrypt(&wire, &client_key).unwrap();
        prop_assert_eq!(decrypted, packet);

        let result = EncryptedResponse::new(c).decrypt(&wire, &wrong_key);
        prop_assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[test]
    fn decrypt_never_accepts_garbage(
        c in construction(),
        garbage in prop::collection::vec(any::<u8>(), 0..400),
        seed in any::<u64>(),
    ) {
        let key = dnscrypt_core::SharedKey::from_bytes({
            let mut k = [0u8; 32];
            rand_chacha::rand_core::RngCore::fill_bytes(&mut ChaCha20Rng::seed_from_u64(seed), &mut k);
            k
        });
        prop_assert!(EncryptedResponse::new(c).decrypt(&garbage, &key).is_err());
    }
}

#[test]
fn client_magic_size_matches_wire_layout() {
    // resolver pk (32) + client magic (8) sit between the signature and the serial
    assert_eq!(8 + SIGNATURE_SIZE + 32 + CLIENT_MAGIC_SIZE + 12, CERT_SIZE);
}
