//! Property tests driven by random inputs
//!
//! Each property is checked over many generated cases: random payload sizes
//! and contents, every compression algorithm and cipher, random chunk sizes,
//! and arbitrary bytes fed to the parsers.

use pgpcrypt::{
    armor::{self, ArmorType},
    compression::{compress, decompress, CompressionAlgorithm},
    crypto::{Passphrase, PublicKeyAlgorithm, S2kParams, SymmetricAlgorithm},
    keyring::{select_encryption_key, KeyRingBuilder, SecretKeyRingBundle},
    message::{decrypt, EncryptOptions, Encryptor},
    packet::{LiteralDataPacket, PacketHeader, PacketReader, UserIdPacket},
    stream::ObjectStream,
};
use rand::{rngs::OsRng, seq::SliceRandom, Rng};

const COMPRESSIONS: [CompressionAlgorithm; 4] = [
    CompressionAlgorithm::Uncompressed,
    CompressionAlgorithm::Zip,
    CompressionAlgorithm::Zlib,
    CompressionAlgorithm::BZip2,
];

/// Property: decrypt(encrypt(m)) == m for any payload and option set
#[test]
fn property_encryption_decryption_roundtrip() {
    let mut rng = OsRng;
    let generated = KeyRingBuilder::new("Property <p@example.com>")
        .subkey(PublicKeyAlgorithm::Mlkem1024)
        .passphrase(Passphrase::new("pw"))
        .s2k_params(S2kParams::new(1, 1, 10).unwrap())
        .build()
        .unwrap();
    let secret = SecretKeyRingBundle::new(vec![generated.secret]).unwrap();
    let recipient = select_encryption_key(&secret).unwrap();
    let passphrase = Passphrase::new("pw");

    for _ in 0..30 {
        let size = rng.gen_range(0..20_000);
        let mut plaintext = vec![0u8; size];
        rng.fill(&mut plaintext[..]);

        let options = EncryptOptions {
            compression: *COMPRESSIONS.choose(&mut rng).unwrap(),
            cipher: *[SymmetricAlgorithm::Aes128, SymmetricAlgorithm::Aes256]
                .choose(&mut rng)
                .unwrap(),
            chunk_size_octet: rng.gen_range(0..=4),
            ..EncryptOptions::default()
        };
        let message = Encryptor::new(options.clone())
            .encrypt(&plaintext, &recipient)
            .unwrap();

        let decrypted = decrypt(message.as_bytes(), &secret, &passphrase)
            .unwrap_or_else(|e| panic!("Roundtrip failed for {:?}: {}", options, e));
        assert_eq!(decrypted, plaintext, "Roundtrip property violated for {:?}", options);
    }
}

/// Property: decompress(compress(d)) == d for every algorithm
#[test]
fn property_compression_roundtrip() {
    let mut rng = OsRng;

    for _ in 0..50 {
        let size = rng.gen_range(0..10_000);
        // Low-entropy data so compression actually does work
        let data: Vec<u8> = (0..size).map(|_| rng.gen_range(b'a'..=b'e')).collect();

        for algorithm in COMPRESSIONS {
            let compressed = compress(algorithm, &data).unwrap();
            let restored = decompress(algorithm, &compressed, data.len().max(1)).unwrap();
            assert_eq!(restored, data, "{} roundtrip failed", algorithm);
        }
    }
}

/// Property: armor decoding inverts encoding for any binary input
#[test]
fn property_armor_roundtrip() {
    let mut rng = OsRng;

    for _ in 0..100 {
        let size = rng.gen_range(0..3000);
        let mut data = vec![0u8; size];
        rng.fill(&mut data[..]);

        let armored = armor::encode(&data, ArmorType::Message);
        assert!(armor::is_armored(armored.as_bytes()));
        assert_eq!(armor::decode(&armored).unwrap().data, data);
        assert_eq!(&*armor::decoder_stream(armored.as_bytes()).unwrap(), &data[..]);
    }
}

/// Property: literal packet metadata survives serialization
#[test]
fn property_literal_metadata_preserved() {
    let mut rng = OsRng;

    for _ in 0..100 {
        let name_len = rng.gen_range(0..64);
        let file_name: String = (0..name_len)
            .map(|_| rng.gen_range(b'a'..=b'z') as char)
            .collect();
        let modified: u32 = rng.gen();
        let mut data = vec![0u8; rng.gen_range(0..500)];
        rng.fill(&mut data[..]);

        let packet = LiteralDataPacket::binary(file_name.clone(), modified, data.clone());
        let parsed = LiteralDataPacket::from_bytes(&packet.to_bytes()).unwrap();
        assert_eq!(parsed.file_name, file_name);
        assert_eq!(parsed.modified, modified);
        assert_eq!(parsed.data, data);
    }
}

/// Property: parsers reject arbitrary input without panicking
#[test]
fn property_invalid_input_rejection() {
    let mut rng = OsRng;

    for _ in 0..500 {
        let size = rng.gen_range(0..2000);
        let mut random_data = vec![0u8; size];
        rng.fill(&mut random_data[..]);

        let result = std::panic::catch_unwind(|| {
            let _ = PacketHeader::from_bytes(&random_data);
            let _ = UserIdPacket::from_bytes(&random_data);
            let _ = LiteralDataPacket::from_bytes(&random_data);
            let _ = PacketReader::new(&random_data).take(64).count();
            let _ = ObjectStream::new(&random_data).take(64).count();
            for algorithm in COMPRESSIONS {
                let _ = decompress(algorithm, &random_data, 1 << 20);
            }
        });
        assert!(result.is_ok(), "Parser panicked on {} random bytes", size);
    }
}

/// Property: definite header lengths in every encoding width parse back
#[test]
fn property_header_lengths_roundtrip() {
    let mut rng = OsRng;

    for _ in 0..200 {
        let length = match rng.gen_range(0..3) {
            0 => rng.gen_range(0..192),
            1 => rng.gen_range(192..8384),
            _ => rng.gen_range(8384..u32::MAX as usize),
        };
        let header = PacketHeader::new(pgpcrypt::packet::PacketTag::LiteralData, length);
        let bytes = header.to_bytes();
        let (parsed, consumed) = PacketHeader::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed, header);
    }
}
