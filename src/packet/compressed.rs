//! Compressed data packet (tag 8): `algorithm | compressed bytes`.

use crate::compression::CompressionAlgorithm;
use crate::error::{PgpError, Result};
use crate::validation::Validator;

/// Compressed data packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedDataPacket {
    /// Algorithm the data was compressed with
    pub algorithm: CompressionAlgorithm,
    /// Compressed packet stream
    pub data: Vec<u8>,
}

impl CompressedDataPacket {
    /// Create a compressed data packet
    pub fn new(algorithm: CompressionAlgorithm, data: Vec<u8>) -> Self {
        Self { algorithm, data }
    }

    /// Serialize to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.data.len());
        bytes.push(self.algorithm.to_byte());
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Parse from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let algorithm_id = Validator::validate_u8_from_bytes(data, 0)?;
        let algorithm = CompressionAlgorithm::from_byte(algorithm_id).ok_or_else(|| {
            PgpError::unsupported_content(format!(
                "Unsupported compression algorithm: {}",
                algorithm_id
            ))
        })?;
        Ok(Self {
            algorithm,
            data: data[1..].to_vec(),
        })
    }
}
