//! Session key and encrypted data packets.
//!
//! PKESK v3 (tag 1):
//! `0x03 | key id(8) | algorithm | ct length(u16) | ML-KEM ciphertext | wrapped length(u8) | wrapped key`
//!
//! SEIPD v2 (tag 18):
//! `0x02 | cipher | aead | chunk size octet | salt(32) | sealed chunks | final tag`

use crate::crypto::encryption::MAX_CHUNK_SIZE_OCTET;
use crate::crypto::{AeadAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};
use crate::error::{PgpError, Result};
use crate::validation::Validator;

/// PKESK version written and accepted
pub const PKESK_VERSION: u8 = 3;

/// SEIPD version written and accepted
pub const SEIPD_VERSION: u8 = 2;

/// Bytes of SEIPD body before the sealed chunks
pub const SEIPD_PREFIX_LEN: usize = 36;

/// Public-key encrypted session key packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkeskPacket {
    /// Key id of the recipient key
    pub key_id: u64,
    /// Recipient key algorithm
    pub algorithm: PublicKeyAlgorithm,
    /// ML-KEM encapsulation
    pub kem_ciphertext: Vec<u8>,
    /// AEAD-sealed `cipher | session key | checksum`
    pub wrapped_key: Vec<u8>,
}

impl PkeskPacket {
    /// Header fields bound into the key wrap: `version | key id | algorithm`
    pub fn binding(key_id: u64, algorithm: PublicKeyAlgorithm) -> [u8; 10] {
        let mut binding = [0u8; 10];
        binding[0] = PKESK_VERSION;
        binding[1..9].copy_from_slice(&key_id.to_be_bytes());
        binding[9] = algorithm.to_byte();
        binding
    }

    /// Binding bytes for this packet
    pub fn binding_bytes(&self) -> [u8; 10] {
        Self::binding(self.key_id, self.algorithm)
    }

    /// Serialize to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(13 + self.kem_ciphertext.len() + self.wrapped_key.len());
        bytes.extend_from_slice(&self.binding_bytes());
        bytes.extend_from_slice(&(self.kem_ciphertext.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&self.kem_ciphertext);
        bytes.push(self.wrapped_key.len() as u8);
        bytes.extend_from_slice(&self.wrapped_key);
        bytes
    }

    /// Parse from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let version = Validator::validate_u8_from_bytes(data, 0)?;
        if version != PKESK_VERSION {
            return Err(PgpError::packet(format!(
                "Unsupported session key packet version: {}",
                version
            )));
        }
        let key_id = Validator::validate_u64_from_bytes(data, 1)?;
        let algorithm_id = Validator::validate_u8_from_bytes(data, 9)?;
        let algorithm = PublicKeyAlgorithm::from_byte(algorithm_id).ok_or_else(|| {
            PgpError::packet(format!(
                "Unsupported session key algorithm: {}",
                algorithm_id
            ))
        })?;

        let ct_len = Validator::validate_u16_from_bytes(data, 10)? as usize;
        let kem_ciphertext = Validator::validate_slice_extraction(data, 12, ct_len)?.to_vec();
        let mut offset = 12 + ct_len;
        let wrapped_len = Validator::validate_u8_from_bytes(data, offset)? as usize;
        offset += 1;
        let wrapped_key = Validator::validate_slice_extraction(data, offset, wrapped_len)?.to_vec();
        if offset + wrapped_len != data.len() {
            return Err(PgpError::packet("Trailing data in session key packet"));
        }

        Ok(Self {
            key_id,
            algorithm,
            kem_ciphertext,
            wrapped_key,
        })
    }
}

/// Symmetrically encrypted integrity protected data packet, version 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeipdPacket {
    /// Bulk cipher
    pub cipher: SymmetricAlgorithm,
    /// AEAD mode
    pub aead: AeadAlgorithm,
    /// Chunk size exponent: chunks are `2^(c + 6)` bytes
    pub chunk_size_octet: u8,
    /// HKDF salt
    pub salt: [u8; 32],
    /// Sealed chunks followed by the final tag
    pub encrypted: Vec<u8>,
}

impl SeipdPacket {
    /// Associated data for every chunk: packet tag, version and parameters
    pub fn info(cipher: SymmetricAlgorithm, aead: AeadAlgorithm, chunk_size_octet: u8) -> [u8; 5] {
        [
            0xC0 | 18,
            SEIPD_VERSION,
            cipher.to_byte(),
            aead.to_byte(),
            chunk_size_octet,
        ]
    }

    /// Body bytes preceding the chunk stream
    pub fn prefix(
        cipher: SymmetricAlgorithm,
        aead: AeadAlgorithm,
        chunk_size_octet: u8,
        salt: &[u8; 32],
    ) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SEIPD_PREFIX_LEN);
        bytes.extend_from_slice(&[
            SEIPD_VERSION,
            cipher.to_byte(),
            aead.to_byte(),
            chunk_size_octet,
        ]);
        bytes.extend_from_slice(salt);
        bytes
    }

    /// Serialize to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Self::prefix(self.cipher, self.aead, self.chunk_size_octet, &self.salt);
        bytes.extend_from_slice(&self.encrypted);
        bytes
    }

    /// Parse from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let version = Validator::validate_u8_from_bytes(data, 0)?;
        if version != SEIPD_VERSION {
            return Err(PgpError::unsupported_content(format!(
                "Unsupported encrypted data packet version: {}",
                version
            )));
        }
        let cipher_id = Validator::validate_u8_from_bytes(data, 1)?;
        let cipher = SymmetricAlgorithm::from_byte(cipher_id)
            .ok_or_else(|| PgpError::packet(format!("Unsupported cipher: {}", cipher_id)))?;
        let aead_id = Validator::validate_u8_from_bytes(data, 2)?;
        let aead = AeadAlgorithm::from_byte(aead_id)
            .ok_or_else(|| PgpError::packet(format!("Unsupported AEAD mode: {}", aead_id)))?;
        let chunk_size_octet = Validator::validate_u8_from_bytes(data, 3)?;
        if chunk_size_octet > MAX_CHUNK_SIZE_OCTET {
            return Err(PgpError::packet(format!(
                "Chunk size octet {} too large",
                chunk_size_octet
            )));
        }
        let salt: [u8; 32] = Validator::validate_array_extraction(data, 4)?;

        Ok(Self {
            cipher,
            aead,
            chunk_size_octet,
            salt,
            encrypted: data[SEIPD_PREFIX_LEN..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkesk_layout() {
        let packet = PkeskPacket {
            key_id: 0x0102030405060708,
            algorithm: PublicKeyAlgorithm::Mlkem1024,
            kem_ciphertext: vec![0xAA; 4],
            wrapped_key: vec![0xBB; 3],
        };
        let bytes = packet.to_bytes();
        assert_eq!(&bytes[..10], &[3, 1, 2, 3, 4, 5, 6, 7, 8, 100]);
        assert_eq!(&bytes[10..12], &[0, 4]);
        assert_eq!(bytes[16], 3);
        assert_eq!(PkeskPacket::from_bytes(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_pkesk_rejects_bad_input() {
        assert!(PkeskPacket::from_bytes(&[6, 0, 0]).is_err());
        let mut bytes = PkeskPacket {
            key_id: 1,
            algorithm: PublicKeyAlgorithm::Mlkem1024,
            kem_ciphertext: vec![1; 8],
            wrapped_key: vec![2; 8],
        }
        .to_bytes();
        bytes.push(0);
        assert!(PkeskPacket::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_seipd_layout() {
        let packet = SeipdPacket {
            cipher: SymmetricAlgorithm::Aes256,
            aead: AeadAlgorithm::Gcm,
            chunk_size_octet: 12,
            salt: [5; 32],
            encrypted: vec![1, 2, 3],
        };
        let bytes = packet.to_bytes();
        assert_eq!(&bytes[..4], &[2, 9, 3, 12]);
        assert_eq!(bytes.len(), SEIPD_PREFIX_LEN + 3);
        assert_eq!(SeipdPacket::from_bytes(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_seipd_v1_unsupported() {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&[0; 40]);
        assert!(matches!(
            SeipdPacket::from_bytes(&bytes),
            Err(PgpError::UnsupportedContent(_))
        ));
    }
}
