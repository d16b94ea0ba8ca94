//! Per-message session keys and their ML-KEM wrapping.
//!
//! The session key is wrapped for a recipient by encapsulating to their
//! ML-KEM-1024 public key, deriving a key-encryption key from the shared
//! secret with HKDF-SHA3-256, and sealing `algorithm || key || checksum`
//! with AES-256-GCM. The packet's version, key id and algorithm are bound
//! in as associated data.

use crate::crypto::{PrivateKey, PublicKey, SymmetricAlgorithm, MLKEM1024_CIPHERTEXT_SIZE};
use crate::error::{PgpError, Result};
use crate::packet::session::PkeskPacket;
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use pqcrypto_mlkem::mlkem1024;
use pqcrypto_traits::kem::{Ciphertext, SharedSecret};
use rand::{CryptoRng, RngCore};
use sha3::Sha3_256;
use std::fmt;
use zeroize::Zeroizing;

const KEK_SALT: &[u8] = b"pgpcrypt pkesk v3 key wrap";
const KEK_SIZE: usize = 32;
const KEK_NONCE_SIZE: usize = 12;

/// Symmetric key protecting one message, wiped on drop
pub struct SessionKey {
    algorithm: SymmetricAlgorithm,
    key: Zeroizing<Vec<u8>>,
}

impl SessionKey {
    /// Draw a fresh random key for the given cipher
    pub fn generate<R: CryptoRng + RngCore>(algorithm: SymmetricAlgorithm, rng: &mut R) -> Self {
        let mut key = Zeroizing::new(vec![0u8; algorithm.key_size()]);
        rng.fill_bytes(&mut key);
        Self { algorithm, key }
    }

    /// Rebuild from raw key bytes
    pub fn from_parts(algorithm: SymmetricAlgorithm, key: Zeroizing<Vec<u8>>) -> Result<Self> {
        if key.len() != algorithm.key_size() {
            return Err(PgpError::crypto(format!(
                "Session key for {} must be {} bytes, got {}",
                algorithm,
                algorithm.key_size(),
                key.len()
            )));
        }
        Ok(Self { algorithm, key })
    }

    /// Cipher this key is for
    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Two-octet additive checksum over the key bytes
    pub fn checksum(&self) -> u16 {
        checksum(&self.key)
    }

    /// Wrap this key for a recipient public key
    pub fn wrap_for(&self, recipient: &PublicKey) -> Result<PkeskPacket> {
        let public_key = recipient.as_mlkem1024()?;
        let (shared_secret, kem_ciphertext) = {
            let (shared_secret, kem_ciphertext) = mlkem1024::encapsulate(&public_key);
            (Zeroizing::new(shared_secret.as_bytes().to_vec()), kem_ciphertext)
        };

        let binding = PkeskPacket::binding(recipient.key_id(), recipient.algorithm());
        let (kek, nonce) = derive_kek(&shared_secret, &binding)?;

        let mut plaintext = Zeroizing::new(Vec::with_capacity(self.key.len() + 3));
        plaintext.push(self.algorithm.to_byte());
        plaintext.extend_from_slice(&self.key);
        plaintext.extend_from_slice(&self.checksum().to_be_bytes());

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(kek.as_ref()));
        let wrapped_key = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: &binding,
                },
            )
            .map_err(|e| PgpError::crypto(format!("Failed to wrap session key: {}", e)))?;

        Ok(PkeskPacket {
            key_id: recipient.key_id(),
            algorithm: recipient.algorithm(),
            kem_ciphertext: kem_ciphertext.as_bytes().to_vec(),
            wrapped_key,
        })
    }

    /// Recover a session key from an entry addressed to `private_key`
    pub fn unwrap_from(packet: &PkeskPacket, private_key: &PrivateKey) -> Result<Self> {
        if !crate::crypto::key_ids_equal(packet.key_id, private_key.key_id()) {
            return Err(PgpError::crypto(format!(
                "Session key entry is for {:016X}, not {:016X}",
                packet.key_id,
                private_key.key_id()
            )));
        }
        if packet.algorithm != private_key.algorithm() {
            return Err(PgpError::crypto(format!(
                "Session key entry uses {}, key is {}",
                packet.algorithm,
                private_key.algorithm()
            )));
        }

        if packet.kem_ciphertext.len() != MLKEM1024_CIPHERTEXT_SIZE {
            return Err(PgpError::crypto(format!(
                "ML-KEM-1024 ciphertext must be {} bytes, got {}",
                MLKEM1024_CIPHERTEXT_SIZE,
                packet.kem_ciphertext.len()
            )));
        }
        let kem_ciphertext = mlkem1024::Ciphertext::from_bytes(&packet.kem_ciphertext)
            .map_err(|_| PgpError::crypto("Invalid ML-KEM-1024 ciphertext"))?;
        // pqcrypto secrets cannot be wiped in place; keep them scoped to this block
        let shared_secret = {
            let secret_key = private_key.as_mlkem1024()?;
            let shared_secret = mlkem1024::decapsulate(&kem_ciphertext, &secret_key);
            Zeroizing::new(shared_secret.as_bytes().to_vec())
        };

        let binding = packet.binding_bytes();
        let (kek, nonce) = derive_kek(&shared_secret, &binding)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(kek.as_ref()));
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &packet.wrapped_key,
                    aad: &binding,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| PgpError::crypto("Session key unwrap failed authentication"))?;

        if plaintext.len() < 3 {
            return Err(PgpError::crypto("Unwrapped session key is truncated"));
        }
        let algorithm = SymmetricAlgorithm::from_byte(plaintext[0]).ok_or_else(|| {
            PgpError::crypto(format!(
                "Unsupported session key cipher id {}",
                plaintext[0]
            ))
        })?;
        let split = plaintext.len() - 2;
        let key = Zeroizing::new(plaintext[1..split].to_vec());
        let expected = u16::from_be_bytes([plaintext[split], plaintext[split + 1]]);

        let session_key = Self::from_parts(algorithm, key)?;
        if session_key.checksum() != expected {
            return Err(PgpError::crypto("Session key checksum mismatch"));
        }
        Ok(session_key)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Sum of all bytes modulo 65536
pub(crate) fn checksum(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |acc, &byte| acc.wrapping_add(byte as u16))
}

fn derive_kek(
    shared_secret: &[u8],
    binding: &[u8],
) -> Result<(Zeroizing<[u8; KEK_SIZE]>, [u8; KEK_NONCE_SIZE])> {
    let hk = Hkdf::<Sha3_256>::new(Some(KEK_SALT), shared_secret);
    let mut okm = Zeroizing::new([0u8; KEK_SIZE + KEK_NONCE_SIZE]);
    hk.expand(binding, okm.as_mut())
        .map_err(|_| PgpError::crypto("HKDF expansion failed"))?;

    let mut kek = Zeroizing::new([0u8; KEK_SIZE]);
    kek.copy_from_slice(&okm[..KEK_SIZE]);
    let mut nonce = [0u8; KEK_NONCE_SIZE];
    nonce.copy_from_slice(&okm[KEK_SIZE..]);
    Ok((kek, nonce))
}
