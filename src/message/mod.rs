//! The encrypt and decrypt pipelines.
//!
//! Encryption wraps a payload in a literal packet, compresses it into a
//! container, and seals the container under a fresh session key that is
//! wrapped for one recipient. Decryption walks the same layers in reverse.

pub mod decrypt;
pub mod encrypt;

pub use decrypt::{decrypt, Decryptor};
pub use encrypt::{encrypt, EncryptOptions, Encryptor};

use crate::armor::{self, ArmorType};
use crate::compression::CompressionAlgorithm;
use crate::crypto::SymmetricAlgorithm;

/// A complete encrypted message and what it was made with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherMessage {
    /// Key id the session key was wrapped for
    pub recipient_key_id: u64,
    /// Bulk cipher of the data packet
    pub symmetric_algorithm: SymmetricAlgorithm,
    /// Compression of the inner container
    pub compression: CompressionAlgorithm,
    bytes: Vec<u8>,
}

impl CipherMessage {
    pub(crate) fn new(
        recipient_key_id: u64,
        symmetric_algorithm: SymmetricAlgorithm,
        compression: CompressionAlgorithm,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            recipient_key_id,
            symmetric_algorithm,
            compression,
            bytes,
        }
    }

    /// Binary packet encoding
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the binary packet encoding
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// ASCII-armored encoding
    pub fn to_armored(&self) -> String {
        armor::encode(&self.bytes, ArmorType::Message)
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the encoding is empty (never the case for encryptor output)
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
