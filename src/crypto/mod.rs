//! Cryptographic primitives for pgpcrypt.
//!
//! - **ML-KEM-1024**: key encapsulation used to wrap per-message session keys
//! - **ML-DSA-87**: signing keys (recognized in key rings, never used to encrypt)
//! - **AES-GCM**: chunked bulk encryption and passphrase protection of secret keys
//! - **SHA3-256**: key ids, fingerprints and HKDF

use crate::error::{PgpError, Result};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

pub mod encryption;
pub mod keys;
pub mod password;
pub mod session;

pub use encryption::{decrypt_packet, encrypted_len, ChunkCipher};
pub use keys::{KeyPair, PrivateKey, PublicKey, SecretKey};
pub use password::{KeyProtection, Passphrase, S2kParams};
pub use session::SessionKey;

/// ML-KEM-1024 public key size in bytes
pub const MLKEM1024_PUBLIC_KEY_SIZE: usize = 1568;
/// ML-KEM-1024 secret key size in bytes
pub const MLKEM1024_SECRET_KEY_SIZE: usize = 3168;
/// ML-KEM-1024 ciphertext size in bytes
pub const MLKEM1024_CIPHERTEXT_SIZE: usize = 1568;
/// ML-DSA-87 public key size in bytes
pub const MLDSA87_PUBLIC_KEY_SIZE: usize = 2592;
/// ML-DSA-87 secret key size in bytes
pub const MLDSA87_SECRET_KEY_SIZE: usize = 4896;

/// Public-key algorithm identifiers carried in key and session key packets.
///
/// Both live in the OpenPGP private/experimental range (100-110).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyAlgorithm {
    /// ML-KEM-1024 key encapsulation
    Mlkem1024 = 100,
    /// ML-DSA-87 digital signatures
    Mldsa87 = 101,
}

impl PublicKeyAlgorithm {
    /// Returns the algorithm name as a string
    pub fn name(&self) -> &'static str {
        match self {
            PublicKeyAlgorithm::Mlkem1024 => "ML-KEM-1024",
            PublicKeyAlgorithm::Mldsa87 => "ML-DSA-87",
        }
    }

    /// Wire identifier
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            100 => Some(Self::Mlkem1024),
            101 => Some(Self::Mldsa87),
            _ => None,
        }
    }

    /// Capabilities a key of this algorithm carries
    pub fn usage(&self) -> KeyUsage {
        match self {
            PublicKeyAlgorithm::Mlkem1024 => KeyUsage::encrypt_only(),
            PublicKeyAlgorithm::Mldsa87 => KeyUsage::sign_and_certify(),
        }
    }

    /// Expected public key material size
    pub fn public_key_size(&self) -> usize {
        match self {
            PublicKeyAlgorithm::Mlkem1024 => MLKEM1024_PUBLIC_KEY_SIZE,
            PublicKeyAlgorithm::Mldsa87 => MLDSA87_PUBLIC_KEY_SIZE,
        }
    }

    /// Expected secret key material size
    pub fn secret_key_size(&self) -> usize {
        match self {
            PublicKeyAlgorithm::Mlkem1024 => MLKEM1024_SECRET_KEY_SIZE,
            PublicKeyAlgorithm::Mldsa87 => MLDSA87_SECRET_KEY_SIZE,
        }
    }
}

impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Symmetric cipher identifiers (RFC 4880 numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymmetricAlgorithm {
    /// AES with 128-bit key
    Aes128 = 7,
    /// AES with 256-bit key
    Aes256 = 9,
}

impl SymmetricAlgorithm {
    /// Returns the algorithm name as a string
    pub fn name(&self) -> &'static str {
        match self {
            SymmetricAlgorithm::Aes128 => "AES-128",
            SymmetricAlgorithm::Aes256 => "AES-256",
        }
    }

    /// Wire identifier
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            7 => Some(Self::Aes128),
            9 => Some(Self::Aes256),
            _ => None,
        }
    }

    /// Key size in bytes
    pub fn key_size(&self) -> usize {
        match self {
            SymmetricAlgorithm::Aes128 => 16,
            SymmetricAlgorithm::Aes256 => 32,
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SymmetricAlgorithm {
    type Err = PgpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "aes128" => Ok(Self::Aes128),
            "aes256" => Ok(Self::Aes256),
            other => Err(PgpError::config(format!(
                "Unknown cipher '{}' (expected aes128 or aes256)",
                other
            ))),
        }
    }
}

/// AEAD mode identifiers (RFC 9580 numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadAlgorithm {
    /// Galois/Counter Mode
    Gcm = 3,
}

impl AeadAlgorithm {
    /// Wire identifier
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Parse a wire identifier
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            3 => Some(Self::Gcm),
            _ => None,
        }
    }
}

/// Key usage flags indicating how a key may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage {
    /// Key may be used for encryption
    pub encrypt: bool,
    /// Key may be used for digital signatures
    pub sign: bool,
    /// Key may be used to certify other keys
    pub certify: bool,
    /// Key may be used for authentication
    pub authenticate: bool,
}

impl KeyUsage {
    /// Creates a new KeyUsage with all permissions disabled
    pub fn none() -> Self {
        Self {
            encrypt: false,
            sign: false,
            certify: false,
            authenticate: false,
        }
    }

    /// Creates a new KeyUsage for encryption only
    pub fn encrypt_only() -> Self {
        Self {
            encrypt: true,
            ..Self::none()
        }
    }

    /// Creates a new KeyUsage for signing and certification
    pub fn sign_and_certify() -> Self {
        Self {
            sign: true,
            certify: true,
            ..Self::none()
        }
    }

    /// Names of the enabled capabilities
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.encrypt, "encrypt"),
            (self.sign, "sign"),
            (self.certify, "certify"),
            (self.authenticate, "authenticate"),
        ]
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, name)| *name)
        .collect()
    }
}

/// Cryptographic hash function using SHA3-256
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the 64-bit key id from public key packet fields.
///
/// The id is the last 8 bytes of SHA3-256 over algorithm, creation time and
/// key material, so it is stable across export and re-import.
pub fn generate_key_id(key_material: &[u8], algorithm: PublicKeyAlgorithm, created: u32) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update([algorithm.to_byte()]);
    hasher.update(created.to_be_bytes());
    hasher.update(key_material);
    let hash = hasher.finalize();

    let mut key_id_bytes = [0u8; 8];
    key_id_bytes.copy_from_slice(&hash[24..32]);
    u64::from_be_bytes(key_id_bytes)
}

/// Constant-time comparison of key IDs
pub fn key_ids_equal(a: u64, b: u64) -> bool {
    a.to_be_bytes().ct_eq(&b.to_be_bytes()).into()
}

/// Current time as an OpenPGP 32-bit timestamp
pub fn now_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_properties() {
        assert_eq!(PublicKeyAlgorithm::Mlkem1024.name(), "ML-KEM-1024");
        assert_eq!(PublicKeyAlgorithm::from_byte(101), Some(PublicKeyAlgorithm::Mldsa87));
        assert_eq!(PublicKeyAlgorithm::from_byte(1), None);
        assert!(PublicKeyAlgorithm::Mlkem1024.usage().encrypt);
        assert!(!PublicKeyAlgorithm::Mldsa87.usage().encrypt);
        assert!(PublicKeyAlgorithm::Mldsa87.usage().sign);
    }

    #[test]
    fn test_symmetric_algorithm_parsing() {
        assert_eq!("aes256".parse::<SymmetricAlgorithm>().unwrap(), SymmetricAlgorithm::Aes256);
        assert_eq!("AES-128".parse::<SymmetricAlgorithm>().unwrap(), SymmetricAlgorithm::Aes128);
        assert!("cast5".parse::<SymmetricAlgorithm>().is_err());
        assert_eq!(SymmetricAlgorithm::from_byte(9), Some(SymmetricAlgorithm::Aes256));
        assert_eq!(SymmetricAlgorithm::Aes128.key_size(), 16);
    }

    #[test]
    fn test_key_usage_names() {
        assert_eq!(KeyUsage::encrypt_only().names(), vec!["encrypt"]);
        assert_eq!(KeyUsage::sign_and_certify().names(), vec!["sign", "certify"]);
        assert!(KeyUsage::none().names().is_empty());
    }

    #[test]
    fn test_key_id_is_deterministic() {
        let material = [7u8; 64];
        let a = generate_key_id(&material, PublicKeyAlgorithm::Mlkem1024, 1_700_000_000);
        let b = generate_key_id(&material, PublicKeyAlgorithm::Mlkem1024, 1_700_000_000);
        let c = generate_key_id(&material, PublicKeyAlgorithm::Mlkem1024, 1_700_000_001);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(key_ids_equal(a, b));
        assert!(!key_ids_equal(a, c));
    }

    #[test]
    fn test_hash_data() {
        assert_eq!(hash_data(b"test data"), hash_data(b"test data"));
        assert_ne!(hash_data(b"a"), hash_data(b"b"));
    }
}
