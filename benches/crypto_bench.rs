//! Benchmarks for the encrypt and decrypt pipelines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pgpcrypt::{
    compression::CompressionAlgorithm,
    crypto::{KeyPair, Passphrase, PublicKeyAlgorithm, S2kParams},
    keyring::{select_encryption_key, KeyRingBuilder, SecretKeyRingBundle},
    message::{decrypt, encrypt},
};

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_generation");
    group.bench_function("mlkem1024", |b| {
        b.iter(|| KeyPair::generate(PublicKeyAlgorithm::Mlkem1024, false))
    });
    group.bench_function("mldsa87", |b| {
        b.iter(|| KeyPair::generate(PublicKeyAlgorithm::Mldsa87, true))
    });
    group.finish();
}

fn fixture(passphrase: Option<&str>) -> SecretKeyRingBundle {
    let mut builder = KeyRingBuilder::new("Bench <bench@example.com>")
        .subkey(PublicKeyAlgorithm::Mlkem1024)
        .s2k_params(S2kParams::default());
    if let Some(passphrase) = passphrase {
        builder = builder.passphrase(Passphrase::new(passphrase));
    }
    SecretKeyRingBundle::new(vec![builder.build().unwrap().secret]).unwrap()
}

fn bench_encrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt");
    let secret = fixture(None);
    let recipient = select_encryption_key(&secret).unwrap();

    for size in [64usize, 1024, 64 * 1024, 1024 * 1024] {
        let plaintext = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        for compression in [CompressionAlgorithm::Uncompressed, CompressionAlgorithm::Zip] {
            group.bench_with_input(
                BenchmarkId::new(compression.name(), size),
                &plaintext,
                |b, plaintext| {
                    b.iter(|| encrypt(black_box(plaintext), &recipient, compression).unwrap())
                },
            );
        }
    }
    group.finish();
}

fn bench_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt");
    let secret = fixture(None);
    let recipient = select_encryption_key(&secret).unwrap();
    let passphrase = Passphrase::empty();

    for size in [64usize, 1024, 64 * 1024, 1024 * 1024] {
        let message = encrypt(&vec![0x5Au8; size], &recipient, CompressionAlgorithm::Zip).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &message, |b, message| {
            b.iter(|| decrypt(black_box(message.as_bytes()), &secret, &passphrase).unwrap())
        });
    }
    group.finish();
}

fn bench_protected_key_unlock(c: &mut Criterion) {
    let mut group = c.benchmark_group("protected_key");
    group.sample_size(10);
    let secret = fixture(Some("bench passphrase"));
    let recipient = select_encryption_key(&secret).unwrap();
    let passphrase = Passphrase::new("bench passphrase");
    let message = encrypt(b"small", &recipient, CompressionAlgorithm::Zip).unwrap();

    // Dominated by the Argon2id cost of unlocking the secret key
    group.bench_function("decrypt_with_unlock", |b| {
        b.iter(|| decrypt(black_box(message.as_bytes()), &secret, &passphrase).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_key_generation,
    bench_encrypt,
    bench_decrypt,
    bench_protected_key_unlock
);
criterion_main!(benches);
