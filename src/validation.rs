//! Input validation and security limits for pgpcrypt
//!
//! Every parser in the crate reads integers and slices through [`Validator`]
//! so that truncated or hostile input surfaces as an error instead of a panic.

use crate::error::{PgpError, Result};

/// Maximum plaintext accepted by the encryptor (512MB)
///
/// Whole-file buffering is part of the design, so this bounds memory use.
pub const MAX_MESSAGE_SIZE: usize = 512 * 1024 * 1024;

/// Maximum allowed packet body size (1GB)
pub const MAX_PACKET_SIZE: usize = 1024 * 1024 * 1024;

/// Default ceiling for decompressed payloads (1GB)
pub const MAX_DECOMPRESSED_SIZE: usize = 1024 * 1024 * 1024;

/// Maximum allowed key material size (10KB - generous for post-quantum keys)
pub const MAX_KEY_SIZE: usize = 10 * 1024;

/// Maximum allowed User ID length (1KB)
pub const MAX_USER_ID_LENGTH: usize = 1024;

/// Maximum allowed number of packets in a single stream
pub const MAX_PACKETS_PER_MESSAGE: usize = 100_000;

/// Maximum allowed number of keys across a key ring bundle
pub const MAX_KEYS_PER_KEYRING: usize = 10000;

/// Maximum allowed number of session key entries in one message
pub const MAX_SESSION_KEY_ENTRIES: usize = 1000;

/// Validation functions for input data
pub struct Validator;

impl Validator {
    /// Validate plaintext size
    pub fn validate_message_size(data: &[u8]) -> Result<()> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(PgpError::validation(format!(
                "Message too large: {} bytes exceeds maximum of {} bytes",
                data.len(),
                MAX_MESSAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Validate packet size
    pub fn validate_packet_size(size: usize) -> Result<()> {
        if size > MAX_PACKET_SIZE {
            return Err(PgpError::validation(format!(
                "Packet too large: {} bytes exceeds maximum of {} bytes",
                size, MAX_PACKET_SIZE
            )));
        }
        Ok(())
    }

    /// Validate User ID string
    pub fn validate_user_id(user_id: &str) -> Result<()> {
        if user_id.len() > MAX_USER_ID_LENGTH {
            return Err(PgpError::validation(format!(
                "User ID too long: {} bytes exceeds maximum of {} bytes",
                user_id.len(),
                MAX_USER_ID_LENGTH
            )));
        }

        if user_id.contains('\0') {
            return Err(PgpError::validation("User ID contains null bytes"));
        }

        if user_id
            .chars()
            .any(|c| c.is_control() && c != '\t' && c != '\n' && c != '\r')
        {
            return Err(PgpError::validation(
                "User ID contains invalid control characters",
            ));
        }

        if user_id.trim().is_empty() {
            return Err(PgpError::validation("User ID cannot be empty"));
        }

        Ok(())
    }

    /// Validate packet count in a stream
    pub fn validate_packet_count(count: usize) -> Result<()> {
        if count > MAX_PACKETS_PER_MESSAGE {
            return Err(PgpError::validation(format!(
                "Too many packets: {} exceeds maximum of {}",
                count, MAX_PACKETS_PER_MESSAGE
            )));
        }
        Ok(())
    }

    /// Validate keyring size
    pub fn validate_keyring_size(count: usize) -> Result<()> {
        if count > MAX_KEYS_PER_KEYRING {
            return Err(PgpError::validation(format!(
                "Too many keys in keyring: {} exceeds maximum of {}",
                count, MAX_KEYS_PER_KEYRING
            )));
        }
        Ok(())
    }

    /// Read a single byte with bounds checking
    pub fn validate_u8_from_bytes(data: &[u8], offset: usize) -> Result<u8> {
        data.get(offset).copied().ok_or_else(|| {
            PgpError::validation(format!(
                "Insufficient data for u8: need {} bytes, have {} bytes",
                offset + 1,
                data.len()
            ))
        })
    }

    /// Validate integer parsing with bounds checking
    pub fn validate_u16_from_bytes(data: &[u8], offset: usize) -> Result<u16> {
        let bytes = Self::validate_slice_extraction(data, offset, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Validate integer parsing with bounds checking
    pub fn validate_u32_from_bytes(data: &[u8], offset: usize) -> Result<u32> {
        let bytes = Self::validate_slice_extraction(data, offset, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Validate integer parsing with bounds checking
    pub fn validate_u64_from_bytes(data: &[u8], offset: usize) -> Result<u64> {
        let bytes = Self::validate_slice_extraction(data, offset, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    /// Validate slice extraction with bounds checking
    pub fn validate_slice_extraction(data: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
        let end = offset.checked_add(length).ok_or_else(|| {
            PgpError::validation(format!(
                "Slice bounds overflow: offset {} length {}",
                offset, length
            ))
        })?;
        data.get(offset..end).ok_or_else(|| {
            PgpError::validation(format!(
                "Slice out of bounds: trying to extract {} bytes at offset {} from {} byte array",
                length,
                offset,
                data.len()
            ))
        })
    }

    /// Read a fixed-size array with bounds checking
    pub fn validate_array_extraction<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
        let bytes = Self::validate_slice_extraction(data, offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Validate that a length field is reasonable (not obviously malicious)
    pub fn validate_length_field(length: usize, max_reasonable: usize) -> Result<()> {
        if length > max_reasonable {
            return Err(PgpError::validation(format!(
                "Suspiciously large length field: {} exceeds reasonable maximum of {}",
                length, max_reasonable
            )));
        }
        Ok(())
    }
}
