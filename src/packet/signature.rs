//! One-pass signature packet (tag 4).
//!
//! Signatures are recognized so that signed payloads can be reported
//! precisely, but they are never verified.

use crate::error::{PgpError, Result};
use crate::validation::Validator;

/// One-pass signature packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnePassSignaturePacket {
    /// Signature type (0x00 binary document, 0x01 text document, ...)
    pub signature_type: u8,
    /// Hash algorithm id
    pub hash_algorithm: u8,
    /// Public key algorithm id
    pub public_key_algorithm: u8,
    /// Signing key id
    pub key_id: u64,
    /// False when another one-pass signature follows for the same data
    pub last: bool,
}

impl OnePassSignaturePacket {
    /// Serialize to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(13);
        bytes.extend_from_slice(&[
            3,
            self.signature_type,
            self.hash_algorithm,
            self.public_key_algorithm,
        ]);
        bytes.extend_from_slice(&self.key_id.to_be_bytes());
        bytes.push(u8::from(self.last));
        bytes
    }

    /// Parse from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != 13 {
            return Err(PgpError::packet(format!(
                "One-pass signature packet must be 13 bytes, got {}",
                data.len()
            )));
        }
        let version = data[0];
        if version != 3 {
            return Err(PgpError::packet(format!(
                "Unsupported one-pass signature version: {}",
                version
            )));
        }
        Ok(Self {
            signature_type: data[1],
            hash_algorithm: data[2],
            public_key_algorithm: data[3],
            key_id: Validator::validate_u64_from_bytes(data, 4)?,
            last: data[12] != 0,
        })
    }
}
