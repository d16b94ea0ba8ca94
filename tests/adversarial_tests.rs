//! Adversarial tests for pgpcrypt
//!
//! These tests feed tampered, truncated, malicious and malformed input to the
//! decryptor and key ring parsers and check that each failure lands in the
//! right error category without panicking.

use pgpcrypt::{
    compression::CompressionAlgorithm,
    crypto::encryption::{chunk_size, DEFAULT_CHUNK_SIZE_OCTET},
    crypto::{
        AeadAlgorithm, ChunkCipher, Passphrase, PublicKey, PublicKeyAlgorithm, S2kParams,
        SessionKey, SymmetricAlgorithm,
    },
    keyring::{
        select_encryption_key, GeneratedKeyRing, KeyRingBuilder, PublicKeyRingBundle,
        SecretKeyRingBundle,
    },
    message::{decrypt, encrypt, Decryptor, Encryptor},
    packet::{
        CompressedDataPacket, LiteralDataPacket, Packet, PacketHeader, PacketReader, PacketTag,
        SeipdPacket,
    },
    PgpError,
};
use rand::{rngs::OsRng, Rng};

fn ring() -> GeneratedKeyRing {
    KeyRingBuilder::new("Target <target@example.com>")
        .subkey(PublicKeyAlgorithm::Mlkem1024)
        .s2k_params(S2kParams::new(1, 1, 10).unwrap())
        .build()
        .unwrap()
}

fn secret_bundle(generated: &GeneratedKeyRing) -> SecretKeyRingBundle {
    SecretKeyRingBundle::from_bytes(&generated.secret.to_bytes()).unwrap()
}

fn recipient(generated: &GeneratedKeyRing) -> PublicKey {
    let public = PublicKeyRingBundle::new(vec![generated.public.clone()]).unwrap();
    select_encryption_key(&public).unwrap()
}

fn message_for(generated: &GeneratedKeyRing, plaintext: &[u8]) -> Vec<u8> {
    encrypt(plaintext, &recipient(generated), CompressionAlgorithm::Zip)
        .unwrap()
        .into_bytes()
}

/// Offset of the first byte of the data packet body
fn data_body_offset(message: &[u8]) -> usize {
    let mut reader = PacketReader::new(message);
    reader.next().unwrap().unwrap();
    let header_start = reader.offset();
    let (_, header_len) = PacketHeader::from_bytes(&message[header_start..]).unwrap();
    header_start + header_len
}

/// Seal arbitrary inner packet bytes under a fresh session key
fn seal(inner: &[u8], recipient: &PublicKey) -> Vec<u8> {
    let session_key = SessionKey::generate(SymmetricAlgorithm::Aes256, &mut OsRng);
    let pkesk = session_key.wrap_for(recipient).unwrap();
    let salt: [u8; 32] = OsRng.gen();
    let mut sealer =
        ChunkCipher::new(&session_key, AeadAlgorithm::Gcm, DEFAULT_CHUNK_SIZE_OCTET, &salt).unwrap();
    let mut encrypted = Vec::new();
    for chunk in inner.chunks(chunk_size(DEFAULT_CHUNK_SIZE_OCTET)) {
        encrypted.extend_from_slice(&sealer.seal_chunk(chunk).unwrap());
    }
    encrypted.extend_from_slice(&sealer.finish().unwrap());

    let data = SeipdPacket {
        cipher: SymmetricAlgorithm::Aes256,
        aead: AeadAlgorithm::Gcm,
        chunk_size_octet: DEFAULT_CHUNK_SIZE_OCTET,
        salt,
        encrypted,
    };
    let mut out = Packet::new(PacketTag::PublicKeyEncryptedSessionKey, pkesk.to_bytes()).to_bytes();
    out.extend_from_slice(
        &Packet::new(PacketTag::SymEncryptedIntegrityProtectedData, data.to_bytes()).to_bytes(),
    );
    out
}

fn literal(data: &[u8]) -> Vec<u8> {
    Packet::new(
        PacketTag::LiteralData,
        LiteralDataPacket::binary("", 0, data.to_vec()).to_bytes(),
    )
    .to_bytes()
}

/// Flipping any ciphertext bit must fail authentication
#[test]
fn test_tampered_ciphertext_is_corrupt_stream() {
    let generated = ring();
    let secret = secret_bundle(&generated);
    let message = message_for(&generated, b"integrity protected payload");
    let body = data_body_offset(&message);

    // Salt, first chunk and final tag
    for position in [body + 10, body + 40, message.len() - 1] {
        let mut tampered = message.clone();
        tampered[position] ^= 0x01;

        let err = decrypt(&tampered, &secret, &Passphrase::empty()).unwrap_err();
        assert!(
            matches!(err, PgpError::CorruptStream(_)),
            "position {}: {:?}",
            position,
            err
        );
        assert_eq!(err.exit_code(), 7);
    }
}

#[test]
fn test_truncated_message_is_corrupt_stream() {
    let generated = ring();
    let secret = secret_bundle(&generated);
    let message = message_for(&generated, b"cut short");

    for cut in [1, 16, 40] {
        let truncated = &message[..message.len() - cut];
        assert!(matches!(
            decrypt(truncated, &secret, &Passphrase::empty()),
            Err(PgpError::CorruptStream(_))
        ));
    }
}

/// The session key says AES-256; a header claiming AES-128 is rejected
#[test]
fn test_cipher_mismatch_is_corrupt_stream() {
    let generated = ring();
    let secret = secret_bundle(&generated);
    let mut message = message_for(&generated, b"mismatch");
    let body = data_body_offset(&message);

    assert_eq!(message[body + 1], SymmetricAlgorithm::Aes256.to_byte());
    message[body + 1] = SymmetricAlgorithm::Aes128.to_byte();
    match decrypt(&message, &secret, &Passphrase::empty()) {
        Err(PgpError::CorruptStream(msg)) => assert!(msg.contains("AES-128"), "{}", msg),
        other => panic!("Expected CorruptStream, got {:?}", other),
    }

    message[body + 1] = 99;
    assert!(matches!(
        decrypt(&message, &secret, &Passphrase::empty()),
        Err(PgpError::CorruptStream(_))
    ));
}

#[test]
fn test_legacy_encrypted_data_is_unsupported() {
    let generated = ring();
    let legacy = Packet::new(PacketTag::SymmetricallyEncryptedData, vec![0xAA; 64]).to_bytes();

    let err = decrypt(&legacy, &secret_bundle(&generated), &Passphrase::empty()).unwrap_err();
    assert!(matches!(err, PgpError::UnsupportedContent(_)));
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn test_random_garbage_never_panics() {
    let generated = ring();
    let secret = secret_bundle(&generated);
    let mut rng = OsRng;

    for _ in 0..300 {
        let len = rng.gen_range(1..2048);
        let mut garbage = vec![0u8; len];
        rng.fill(&mut garbage[..]);

        assert!(decrypt(&garbage, &secret, &Passphrase::empty()).is_err());
        let _ = PublicKeyRingBundle::from_bytes(&garbage);
        let _ = SecretKeyRingBundle::from_bytes(&garbage);
        for packet in PacketReader::new(&garbage) {
            if packet.is_err() {
                break;
            }
        }
    }
}

/// Mutations of a valid message: every outcome is an error or the original plaintext
#[test]
fn test_mutated_messages_never_panic() {
    let generated = ring();
    let secret = secret_bundle(&generated);
    let message = message_for(&generated, b"mutation target");
    let mut rng = OsRng;

    for _ in 0..100 {
        let mut mutated = message.clone();
        let position = rng.gen_range(0..mutated.len());
        mutated[position] = rng.gen();

        if let Ok(plaintext) = decrypt(&mutated, &secret, &Passphrase::empty()) {
            assert_eq!(plaintext, b"mutation target");
        }
    }
}

#[test]
fn test_decompression_bomb_is_bounded() {
    let generated = ring();
    let secret = secret_bundle(&generated);
    let bomb = vec![0u8; 8 * 1024 * 1024];
    let message = Encryptor::default()
        .encrypt(&bomb, &recipient(&generated))
        .unwrap();
    assert!(message.len() < 64 * 1024);

    let result = Decryptor::new(&secret)
        .with_max_decompressed_size(1024 * 1024)
        .decrypt(message.as_bytes(), &Passphrase::empty());
    assert!(matches!(result, Err(PgpError::CorruptStream(_))));
}

#[test]
fn test_corrupt_deflate_stream() {
    let generated = ring();
    let container = Packet::new(
        PacketTag::CompressedData,
        CompressedDataPacket::new(CompressionAlgorithm::Zlib, vec![0xDE, 0xAD, 0xBE, 0xEF])
            .to_bytes(),
    );
    let message = seal(&container.to_bytes(), &recipient(&generated));

    assert!(matches!(
        decrypt(&message, &secret_bundle(&generated), &Passphrase::empty()),
        Err(PgpError::CorruptStream(_))
    ));
}

#[test]
fn test_unknown_compression_is_unsupported() {
    let generated = ring();
    let container = Packet::new(PacketTag::CompressedData, vec![42, 1, 2, 3]);
    let message = seal(&container.to_bytes(), &recipient(&generated));

    assert!(matches!(
        decrypt(&message, &secret_bundle(&generated), &Passphrase::empty()),
        Err(PgpError::UnsupportedContent(_))
    ));
}

#[test]
fn test_container_with_two_literals_is_corrupt() {
    let generated = ring();
    let mut inner = literal(b"first");
    inner.extend_from_slice(&literal(b"second"));
    let container = Packet::new(
        PacketTag::CompressedData,
        CompressedDataPacket::new(CompressionAlgorithm::Uncompressed, inner).to_bytes(),
    );
    let message = seal(&container.to_bytes(), &recipient(&generated));

    assert!(matches!(
        decrypt(&message, &secret_bundle(&generated), &Passphrase::empty()),
        Err(PgpError::CorruptStream(_))
    ));
}

#[test]
fn test_duplicate_key_id_is_corrupt_key_ring() {
    let generated = ring();

    let mut secret = generated.secret.to_bytes();
    secret.extend_from_slice(&generated.secret.to_bytes());
    let err = SecretKeyRingBundle::from_bytes(&secret).unwrap_err();
    assert!(matches!(err, PgpError::CorruptKeyRing(_)));
    assert_eq!(err.exit_code(), 3);

    let mut public = generated.public.to_bytes();
    public.extend_from_slice(&generated.public.to_bytes());
    assert!(matches!(
        PublicKeyRingBundle::from_bytes(&public),
        Err(PgpError::CorruptKeyRing(_))
    ));
}

/// A ring claiming a 2 TiB Argon2 memory cost is refused before any unlock
#[test]
fn test_oversized_argon2_cost_rejected_at_load() {
    let generated = KeyRingBuilder::new("Target")
        .subkey(PublicKeyAlgorithm::Mlkem1024)
        .passphrase(Passphrase::new("pw"))
        .s2k_params(S2kParams::new(1, 1, 10).unwrap())
        .build()
        .unwrap();
    let mut bytes = generated.secret.to_bytes();

    // usage octet, AES-256, GCM, Argon2, salt(16), then passes | lanes | exponent
    let protection = [0xFDu8, 9, 3, 4];
    let starts: Vec<usize> = bytes
        .windows(protection.len())
        .enumerate()
        .filter(|&(i, w)| w == protection && bytes.get(i + 20..i + 23) == Some(&[1u8, 1, 10][..]))
        .map(|(i, _)| i)
        .collect();
    assert!(!starts.is_empty());
    for start in starts {
        bytes[start + 22] = 31;
    }

    let err = SecretKeyRingBundle::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, PgpError::CorruptKeyRing(_)), "{:?}", err);
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_truncated_key_ring_is_corrupt() {
    let generated = ring();
    let bytes = generated.public.to_bytes();

    for cut in [1, 100, bytes.len() / 2] {
        assert!(matches!(
            PublicKeyRingBundle::from_bytes(&bytes[..bytes.len() - cut]),
            Err(PgpError::CorruptKeyRing(_))
        ));
    }
}

#[test]
fn test_message_is_not_a_key_ring() {
    let generated = ring();
    let message = message_for(&generated, b"not keys");
    assert!(matches!(
        PublicKeyRingBundle::from_bytes(&message),
        Err(PgpError::CorruptKeyRing(_))
    ));
}
