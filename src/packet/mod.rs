//! OpenPGP packet framing (RFC 4880 section 4).
//!
//! Packets are always written in the new format with a definite length.
//! The reader also accepts old-format headers, partial body lengths and
//! indeterminate lengths, so output from other implementations frames
//! correctly.

use crate::error::{PgpError, Result};
use crate::validation::{Validator, MAX_PACKET_SIZE};

pub mod compressed;
pub mod key;
pub mod literal;
pub mod session;
pub mod signature;

pub use compressed::CompressedDataPacket;
pub use key::{PublicKeyPacket, SecretKeyPacket};
pub use literal::{LiteralDataPacket, LiteralFormat};
pub use session::{PkeskPacket, SeipdPacket};
pub use signature::OnePassSignaturePacket;

/// Body of a marker packet
pub const MARKER_BODY: &[u8] = b"PGP";

/// Packet tags defined in RFC 4880 and RFC 9580
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketTag {
    /// Public-Key Encrypted Session Key Packet
    PublicKeyEncryptedSessionKey,
    /// Signature Packet
    Signature,
    /// Symmetric-Key Encrypted Session Key Packet
    SymmetricKeyEncryptedSessionKey,
    /// One-Pass Signature Packet
    OnePassSignature,
    /// Secret-Key Packet
    SecretKey,
    /// Public-Key Packet
    PublicKey,
    /// Secret-Subkey Packet
    SecretSubkey,
    /// Compressed Data Packet
    CompressedData,
    /// Symmetrically Encrypted Data Packet (no integrity protection)
    SymmetricallyEncryptedData,
    /// Marker Packet
    Marker,
    /// Literal Data Packet
    LiteralData,
    /// Trust Packet
    Trust,
    /// User ID Packet
    UserId,
    /// Public-Subkey Packet
    PublicSubkey,
    /// User Attribute Packet
    UserAttribute,
    /// Sym. Encrypted and Integrity Protected Data Packet
    SymEncryptedIntegrityProtectedData,
    /// Modification Detection Code Packet
    ModificationDetectionCode,
    /// Any tag this crate has no structure for
    Other(u8),
}

impl PacketTag {
    /// Convert to wire tag
    pub fn to_byte(self) -> u8 {
        match self {
            Self::PublicKeyEncryptedSessionKey => 1,
            Self::Signature => 2,
            Self::SymmetricKeyEncryptedSessionKey => 3,
            Self::OnePassSignature => 4,
            Self::SecretKey => 5,
            Self::PublicKey => 6,
            Self::SecretSubkey => 7,
            Self::CompressedData => 8,
            Self::SymmetricallyEncryptedData => 9,
            Self::Marker => 10,
            Self::LiteralData => 11,
            Self::Trust => 12,
            Self::UserId => 13,
            Self::PublicSubkey => 14,
            Self::UserAttribute => 17,
            Self::SymEncryptedIntegrityProtectedData => 18,
            Self::ModificationDetectionCode => 19,
            Self::Other(tag) => tag,
        }
    }

    /// Convert from wire tag
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::PublicKeyEncryptedSessionKey,
            2 => Self::Signature,
            3 => Self::SymmetricKeyEncryptedSessionKey,
            4 => Self::OnePassSignature,
            5 => Self::SecretKey,
            6 => Self::PublicKey,
            7 => Self::SecretSubkey,
            8 => Self::CompressedData,
            9 => Self::SymmetricallyEncryptedData,
            10 => Self::Marker,
            11 => Self::LiteralData,
            12 => Self::Trust,
            13 => Self::UserId,
            14 => Self::PublicSubkey,
            17 => Self::UserAttribute,
            18 => Self::SymEncryptedIntegrityProtectedData,
            19 => Self::ModificationDetectionCode,
            other => Self::Other(other),
        }
    }
}

/// How a packet body's length is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    /// Exact length known up front
    Definite(usize),
    /// First chunk of a partial-length body; more length octets follow it
    Partial(usize),
    /// Old-format body running to the end of the input
    Indeterminate,
}

/// Packet header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet tag
    pub tag: PacketTag,
    /// Body length framing
    pub length: BodyLength,
    /// Whether the header used the new format
    pub new_format: bool,
}

impl PacketHeader {
    /// Create a new-format header with a definite length
    pub fn new(tag: PacketTag, length: usize) -> Self {
        Self {
            tag,
            length: BodyLength::Definite(length),
            new_format: true,
        }
    }

    /// Serialize the header.
    ///
    /// Definite and partial lengths use the new format. Indeterminate
    /// lengths only exist in the old format and are written that way.
    pub fn to_bytes(&self) -> Vec<u8> {
        let tag = self.tag.to_byte();
        let mut bytes = Vec::with_capacity(6);
        match self.length {
            BodyLength::Definite(length) => {
                bytes.push(0xC0 | (tag & 0x3F));
                encode_length(length, &mut bytes);
            }
            BodyLength::Partial(length) => {
                bytes.push(0xC0 | (tag & 0x3F));
                bytes.push(0xE0 | (length.trailing_zeros() as u8 & 0x1F));
            }
            BodyLength::Indeterminate => {
                bytes.push(0x80 | ((tag & 0x0F) << 2) | 0x03);
            }
        }
        bytes
    }

    /// Parse a packet header, returning it and the number of bytes consumed
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        let first_byte = Validator::validate_u8_from_bytes(data, 0)
            .map_err(|_| PgpError::packet("Empty packet header"))?;

        if (first_byte & 0x80) == 0 {
            return Err(PgpError::packet(format!(
                "Invalid packet header: MSB not set (0x{:02X})",
                first_byte
            )));
        }

        if (first_byte & 0x40) != 0 {
            let tag = PacketTag::from_byte(first_byte & 0x3F);
            let (length, length_bytes) = parse_length(data, 1)?;
            Ok((
                Self {
                    tag,
                    length,
                    new_format: true,
                },
                1 + length_bytes,
            ))
        } else {
            let tag = PacketTag::from_byte((first_byte >> 2) & 0x0F);
            let (length, length_bytes) = match first_byte & 0x03 {
                0 => (
                    BodyLength::Definite(Validator::validate_u8_from_bytes(data, 1)? as usize),
                    1,
                ),
                1 => (
                    BodyLength::Definite(Validator::validate_u16_from_bytes(data, 1)? as usize),
                    2,
                ),
                2 => (
                    BodyLength::Definite(Validator::validate_u32_from_bytes(data, 1)? as usize),
                    4,
                ),
                _ => (BodyLength::Indeterminate, 0),
            };
            Ok((
                Self {
                    tag,
                    length,
                    new_format: false,
                },
                1 + length_bytes,
            ))
        }
    }
}

/// Append a new-format definite length
fn encode_length(length: usize, out: &mut Vec<u8>) {
    if length < 192 {
        out.push(length as u8);
    } else if length < 8384 {
        let encoded = length - 192;
        out.push(192 + (encoded >> 8) as u8);
        out.push((encoded & 0xFF) as u8);
    } else {
        out.push(0xFF);
        out.extend_from_slice(&(length as u32).to_be_bytes());
    }
}

/// Parse new-format length octets at `offset`
fn parse_length(data: &[u8], offset: usize) -> Result<(BodyLength, usize)> {
    let first = Validator::validate_u8_from_bytes(data, offset)? as usize;
    match first {
        0..=191 => Ok((BodyLength::Definite(first), 1)),
        192..=223 => {
            let second = Validator::validate_u8_from_bytes(data, offset + 1)? as usize;
            Ok((BodyLength::Definite(((first - 192) << 8) + second + 192), 2))
        }
        224..=254 => Ok((BodyLength::Partial(1usize << (first & 0x1F)), 1)),
        _ => {
            let length = Validator::validate_u32_from_bytes(data, offset + 1)? as usize;
            Ok((BodyLength::Definite(length), 5))
        }
    }
}

/// A complete packet with its body reassembled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet header
    pub header: PacketHeader,
    /// Packet body data
    pub body: Vec<u8>,
}

impl Packet {
    /// Create a new packet
    pub fn new(tag: PacketTag, body: Vec<u8>) -> Self {
        let header = PacketHeader::new(tag, body.len());
        Self { header, body }
    }

    /// Marker packet
    pub fn marker() -> Self {
        Self::new(PacketTag::Marker, MARKER_BODY.to_vec())
    }

    /// Packet tag
    pub fn tag(&self) -> PacketTag {
        self.header.tag
    }

    /// Serialize packet to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Parse exactly one packet from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = PacketReader::new(data);
        let packet = reader
            .next()
            .ok_or_else(|| PgpError::packet("No packet present"))??;
        if reader.offset() != data.len() {
            return Err(PgpError::packet("Trailing data after packet"));
        }
        Ok(packet)
    }
}

/// Iterator over the packets in a byte slice.
///
/// Stops after the first error.
pub struct PacketReader<'a> {
    data: &'a [u8],
    offset: usize,
    count: usize,
    failed: bool,
}

impl<'a> PacketReader<'a> {
    /// Start reading at the beginning of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            count: 0,
            failed: false,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_packet(&mut self) -> Result<Packet> {
        let rest = &self.data[self.offset..];
        let (header, mut pos) = PacketHeader::from_bytes(rest)?;

        let body = match header.length {
            BodyLength::Definite(length) => {
                Validator::validate_packet_size(length)?;
                let body = Validator::validate_slice_extraction(rest, pos, length)
                    .map_err(|_| PgpError::packet("Incomplete packet body"))?;
                pos += length;
                body.to_vec()
            }
            BodyLength::Indeterminate => {
                let body = &rest[pos..];
                Validator::validate_packet_size(body.len())?;
                pos = rest.len();
                body.to_vec()
            }
            BodyLength::Partial(first) => {
                let mut body = Vec::new();
                let mut chunk = first;
                loop {
                    let part = Validator::validate_slice_extraction(rest, pos, chunk)
                        .map_err(|_| PgpError::packet("Incomplete partial body chunk"))?;
                    body.extend_from_slice(part);
                    pos += chunk;
                    Validator::validate_length_field(body.len(), MAX_PACKET_SIZE)?;

                    let (next, used) = parse_length(rest, pos)?;
                    pos += used;
                    match next {
                        BodyLength::Partial(length) => chunk = length,
                        BodyLength::Definite(length) => {
                            let part = Validator::validate_slice_extraction(rest, pos, length)
                                .map_err(|_| PgpError::packet("Incomplete final body chunk"))?;
                            body.extend_from_slice(part);
                            pos += length;
                            break;
                        }
                        BodyLength::Indeterminate => {
                            return Err(PgpError::packet("Invalid partial body continuation"))
                        }
                    }
                }
                Validator::validate_packet_size(body.len())?;
                body
            }
        };

        self.offset += pos;
        Ok(Packet {
            header: PacketHeader {
                tag: header.tag,
                length: BodyLength::Definite(body.len()),
                new_format: header.new_format,
            },
            body,
        })
    }
}

impl Iterator for PacketReader<'_> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        self.count += 1;
        let result =
            Validator::validate_packet_count(self.count).and_then(|_| self.read_packet());
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// User ID packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdPacket {
    /// User ID string (typically "Name <email>")
    pub user_id: String,
}

impl UserIdPacket {
    /// Create a new User ID packet
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Serialize to packet body bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.user_id.as_bytes().to_vec()
    }

    /// Parse from packet body bytes with validation
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let user_id = String::from_utf8(data.to_vec())
            .map_err(|_| PgpError::validation("Invalid UTF-8 in User ID"))?;
        Validator::validate_user_id(&user_id)?;
        Ok(Self { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_tag_conversion() {
        assert_eq!(PacketTag::PublicKey.to_byte(), 6);
        assert_eq!(PacketTag::from_byte(6), PacketTag::PublicKey);
        assert_eq!(PacketTag::from_byte(60), PacketTag::Other(60));
        assert_eq!(PacketTag::Other(60).to_byte(), 60);
    }

    #[test]
    fn test_packet_header_length_encoding() {
        let tag = PacketTag::PublicKey.to_byte();
        let test_cases = vec![
            (50, vec![0xC0 | tag, 50]),
            // 200 = 192 + 8
            (200, vec![0xC0 | tag, 192, 8]),
            (10000, vec![0xC0 | tag, 255, 0, 0, 39, 16]),
        ];

        for (length, expected_bytes) in test_cases {
            let header = PacketHeader::new(PacketTag::PublicKey, length);
            let bytes = header.to_bytes();
            assert_eq!(bytes, expected_bytes);

            let (parsed, consumed) = PacketHeader::from_bytes(&bytes).unwrap();
            assert_eq!(parsed.length, BodyLength::Definite(length));
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn test_old_format_headers() {
        // Old format, tag 11, one-octet length
        let data = [0x80 | (11 << 2), 3, b'a', b'b', b'c'];
        let packet = Packet::from_bytes(&data).unwrap();
        assert_eq!(packet.tag(), PacketTag::LiteralData);
        assert!(!packet.header.new_format);
        assert_eq!(packet.body, b"abc");

        // Old format, tag 8, two-octet length
        let data = [0x80 | (8 << 2) | 1, 0, 2, 0xAA, 0xBB];
        assert_eq!(Packet::from_bytes(&data).unwrap().body, vec![0xAA, 0xBB]);

        // Old format, indeterminate length runs to end of input
        let data = [0x80 | (11 << 2) | 3, 1, 2, 3, 4];
        let packet = Packet::from_bytes(&data).unwrap();
        assert_eq!(packet.body, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_partial_body_lengths() {
        // 0xE1 = partial chunk of 2 bytes, then a definite final chunk of 3
        let data = [0xC0 | 11, 0xE1, 1, 2, 3, 3, 4, 5];
        let packet = Packet::from_bytes(&data).unwrap();
        assert_eq!(packet.body, vec![1, 2, 3, 4, 5]);

        // Truncated final chunk
        let data = [0xC0 | 11, 0xE1, 1, 2, 5, 3];
        assert!(Packet::from_bytes(&data).is_err());
    }

    #[test]
    fn test_reader_iterates_and_fuses() {
        let mut data = Packet::new(PacketTag::Marker, MARKER_BODY.to_vec()).to_bytes();
        data.extend(Packet::new(PacketTag::UserId, b"bob".to_vec()).to_bytes());
        data.push(0x00);

        let mut reader = PacketReader::new(&data);
        assert_eq!(reader.next().unwrap().unwrap().tag(), PacketTag::Marker);
        assert_eq!(reader.next().unwrap().unwrap().tag(), PacketTag::UserId);
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_truncated_body_rejected() {
        let mut bytes = Packet::new(PacketTag::UserId, vec![b'x'; 300]).to_bytes();
        bytes.truncate(100);
        assert!(Packet::from_bytes(&bytes).is_err());
        assert!(PacketHeader::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_user_id_packet() {
        let packet = UserIdPacket::new("Alice <alice@example.com>");
        let parsed = UserIdPacket::from_bytes(&packet.to_bytes()).unwrap();
        assert_eq!(parsed, packet);
        assert!(UserIdPacket::from_bytes(&[0xFF, 0xFE]).is_err());
    }
}
