//! Public key and secret key packet bodies (tags 5, 6, 7, 14).
//!
//! Public part: `version(4) | created(u32) | algorithm | bit length(u16) | material`.
//!
//! Secret part follows the public part and is one of:
//! - `0x00 | length(u32) | material | checksum(u16)` for unprotected keys
//! - `0xFD | 0x09 (AES-256) | 0x03 (GCM) | 0x04 (Argon2) | salt(16) | passes |
//!   parallelism | memory exponent | nonce(12) | length(u32) | ciphertext`

use crate::crypto::password::{NONCE_SIZE, SALT_SIZE};
use crate::crypto::session::checksum;
use crate::crypto::{generate_key_id, KeyProtection, PublicKeyAlgorithm, S2kParams};
use crate::error::{PgpError, Result};
use crate::validation::{Validator, MAX_KEY_SIZE};
use zeroize::Zeroizing;

/// Key packet version written and accepted
pub const KEY_VERSION: u8 = 4;

const S2K_UNPROTECTED: u8 = 0x00;
const S2K_AEAD: u8 = 0xFD;
const S2K_CIPHER_AES256: u8 = 9;
const S2K_AEAD_GCM: u8 = 3;
const S2K_ARGON2: u8 = 4;

/// Public key packet body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyPacket {
    /// Key creation time (Unix timestamp)
    pub created: u32,
    /// Public key algorithm
    pub algorithm: PublicKeyAlgorithm,
    /// Public key material
    pub material: Vec<u8>,
}

impl PublicKeyPacket {
    /// Create a public key packet
    pub fn new(algorithm: PublicKeyAlgorithm, created: u32, material: Vec<u8>) -> Self {
        Self {
            created,
            algorithm,
            material,
        }
    }

    /// Key id derived from the packet fields
    pub fn key_id(&self) -> u64 {
        generate_key_id(&self.material, self.algorithm, self.created)
    }

    /// Serialize to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + self.material.len());
        bytes.push(KEY_VERSION);
        bytes.extend_from_slice(&self.created.to_be_bytes());
        bytes.push(self.algorithm.to_byte());
        bytes.extend_from_slice(&((self.material.len() * 8) as u16).to_be_bytes());
        bytes.extend_from_slice(&self.material);
        bytes
    }

    /// Parse from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (packet, consumed) = Self::parse(data)?;
        if consumed != data.len() {
            return Err(PgpError::packet("Trailing data in public key packet"));
        }
        Ok(packet)
    }

    /// Parse the public part, returning it and the bytes consumed
    pub(crate) fn parse(data: &[u8]) -> Result<(Self, usize)> {
        let version = Validator::validate_u8_from_bytes(data, 0)?;
        if version != KEY_VERSION {
            return Err(PgpError::packet(format!(
                "Unsupported key packet version: {}",
                version
            )));
        }

        let created = Validator::validate_u32_from_bytes(data, 1)?;
        let algorithm_id = Validator::validate_u8_from_bytes(data, 5)?;
        let algorithm = PublicKeyAlgorithm::from_byte(algorithm_id).ok_or_else(|| {
            PgpError::packet(format!("Unsupported public key algorithm: {}", algorithm_id))
        })?;

        let bit_length = Validator::validate_u16_from_bytes(data, 6)? as usize;
        if bit_length % 8 != 0 {
            return Err(PgpError::packet(format!(
                "Key material bit length {} is not byte aligned",
                bit_length
            )));
        }
        let byte_length = bit_length / 8;
        Validator::validate_length_field(byte_length, MAX_KEY_SIZE)?;
        if byte_length != algorithm.public_key_size() {
            return Err(PgpError::packet(format!(
                "{} public key must be {} bytes, got {}",
                algorithm,
                algorithm.public_key_size(),
                byte_length
            )));
        }

        let material = Validator::validate_slice_extraction(data, 8, byte_length)?.to_vec();
        Ok((
            Self {
                created,
                algorithm,
                material,
            },
            8 + byte_length,
        ))
    }
}

/// Secret key packet body
#[derive(Debug)]
pub struct SecretKeyPacket {
    /// Public part
    pub public: PublicKeyPacket,
    /// Secret material, possibly sealed
    pub protection: KeyProtection,
}

impl SecretKeyPacket {
    /// Serialize to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        Self::encode(&self.public, &self.protection)
    }

    /// Serialize a public part and protection without owning them
    pub fn encode(public: &PublicKeyPacket, protection: &KeyProtection) -> Vec<u8> {
        let mut bytes = public.to_bytes();
        match protection {
            KeyProtection::Unprotected { material } => {
                bytes.push(S2K_UNPROTECTED);
                bytes.extend_from_slice(&(material.len() as u32).to_be_bytes());
                bytes.extend_from_slice(material);
                bytes.extend_from_slice(&checksum(material).to_be_bytes());
            }
            KeyProtection::Argon2Aead {
                params,
                salt,
                nonce,
                ciphertext,
            } => {
                bytes.extend_from_slice(&[S2K_AEAD, S2K_CIPHER_AES256, S2K_AEAD_GCM, S2K_ARGON2]);
                bytes.extend_from_slice(salt);
                bytes.extend_from_slice(&[params.passes, params.parallelism, params.memory_exponent]);
                bytes.extend_from_slice(nonce);
                bytes.extend_from_slice(&(ciphertext.len() as u32).to_be_bytes());
                bytes.extend_from_slice(ciphertext);
            }
        }
        bytes
    }

    /// Parse from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (public, mut offset) = PublicKeyPacket::parse(data)?;
        let usage = Validator::validate_u8_from_bytes(data, offset)?;
        offset += 1;

        let protection = match usage {
            S2K_UNPROTECTED => {
                let length = Validator::validate_u32_from_bytes(data, offset)? as usize;
                offset += 4;
                Validator::validate_length_field(length, MAX_KEY_SIZE)?;
                let material =
                    Zeroizing::new(Validator::validate_slice_extraction(data, offset, length)?.to_vec());
                offset += length;
                let expected = Validator::validate_u16_from_bytes(data, offset)?;
                offset += 2;
                if checksum(&material) != expected {
                    return Err(PgpError::packet("Secret key checksum mismatch"));
                }
                KeyProtection::unprotected(material)
            }
            S2K_AEAD => {
                let header = Validator::validate_slice_extraction(data, offset, 3)?;
                if header != [S2K_CIPHER_AES256, S2K_AEAD_GCM, S2K_ARGON2] {
                    return Err(PgpError::packet(format!(
                        "Unsupported secret key protection: {:02X?}",
                        header
                    )));
                }
                offset += 3;
                let salt: [u8; SALT_SIZE] = Validator::validate_array_extraction(data, offset)?;
                offset += SALT_SIZE;
                let [passes, parallelism, memory_exponent]: [u8; 3] =
                    Validator::validate_array_extraction(data, offset)?;
                offset += 3;
                let params = S2kParams::new(passes, parallelism, memory_exponent)?;
                let nonce: [u8; NONCE_SIZE] = Validator::validate_array_extraction(data, offset)?;
                offset += NONCE_SIZE;
                let length = Validator::validate_u32_from_bytes(data, offset)? as usize;
                offset += 4;
                Validator::validate_length_field(length, MAX_KEY_SIZE)?;
                let ciphertext = Validator::validate_slice_extraction(data, offset, length)?.to_vec();
                offset += length;
                KeyProtection::Argon2Aead {
                    params,
                    salt,
                    nonce,
                    ciphertext,
                }
            }
            other => {
                return Err(PgpError::packet(format!(
                    "Unsupported secret key usage octet: 0x{:02X}",
                    other
                )))
            }
        };

        if offset != data.len() {
            return Err(PgpError::packet("Trailing data in secret key packet"));
        }
        Ok(Self { public, protection })
    }
}
