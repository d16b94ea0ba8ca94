//! Literal data packet (tag 11).

use crate::error::Result;
use crate::validation::Validator;

/// Literal data format octet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralFormat {
    /// Binary data ('b')
    Binary,
    /// Text with local line endings ('t')
    Text,
    /// UTF-8 text ('u')
    Utf8,
    /// Anything else, preserved as-is
    Other(u8),
}

impl LiteralFormat {
    /// Wire octet
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Binary => b'b',
            Self::Text => b't',
            Self::Utf8 => b'u',
            Self::Other(byte) => byte,
        }
    }

    /// Parse wire octet
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'b' => Self::Binary,
            b't' => Self::Text,
            b'u' => Self::Utf8,
            other => Self::Other(other),
        }
    }
}

/// Literal data packet: the innermost payload of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDataPacket {
    /// Data format
    pub format: LiteralFormat,
    /// Original file name (metadata only, at most 255 bytes on the wire)
    pub file_name: String,
    /// Modification time (Unix timestamp)
    pub modified: u32,
    /// Payload bytes
    pub data: Vec<u8>,
}

impl LiteralDataPacket {
    /// Binary literal packet
    pub fn binary(file_name: impl Into<String>, modified: u32, data: Vec<u8>) -> Self {
        Self {
            format: LiteralFormat::Binary,
            file_name: file_name.into(),
            modified,
            data,
        }
    }

    /// Serialize to packet body bytes.
    ///
    /// Names longer than 255 bytes are cut at the last character boundary that fits.
    pub fn to_bytes(&self) -> Vec<u8> {
        let name = truncate_name(&self.file_name);
        let mut bytes = Vec::with_capacity(6 + name.len() + self.data.len());
        bytes.push(self.format.to_byte());
        bytes.push(name.len() as u8);
        bytes.extend_from_slice(name.as_bytes());
        bytes.extend_from_slice(&self.modified.to_be_bytes());
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Parse from packet body bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = LiteralFormat::from_byte(Validator::validate_u8_from_bytes(data, 0)?);
        let name_len = Validator::validate_u8_from_bytes(data, 1)? as usize;
        let name = Validator::validate_slice_extraction(data, 2, name_len)?;
        let modified = Validator::validate_u32_from_bytes(data, 2 + name_len)?;
        let payload = &data[6 + name_len..];

        Ok(Self {
            format,
            file_name: String::from_utf8_lossy(name).into_owned(),
            modified,
            data: payload.to_vec(),
        })
    }
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= 255 {
        return name;
    }
    let mut end = 255;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
