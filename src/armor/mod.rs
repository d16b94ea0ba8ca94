//! ASCII armor encoding and decoding for OpenPGP messages and key rings.
//!
//! Armor is a transport encoding only. Every consumer in this crate goes
//! through [`decoder_stream`], which accepts either raw binary packets or an
//! armored block and always hands back the binary form.

use crate::error::{PgpError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// CRC-24 polynomial used for armor checksums
const CRC24_POLY: u32 = 0x1864CFB;
const CRC24_INIT: u32 = 0xB704CE;

/// Base64 characters per armored line
const LINE_WIDTH: usize = 64;

const BEGIN_PREFIX: &str = "-----BEGIN ";
const END_PREFIX: &str = "-----END ";
const DASHES: &str = "-----";

/// ASCII armor block types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmorType {
    /// Encrypted message
    Message,
    /// Public key ring
    PublicKey,
    /// Secret key ring
    PrivateKey,
    /// Detached signature
    Signature,
    /// Any other block label
    Custom(String),
}

impl ArmorType {
    /// Get the armor header string for this type
    pub fn header_string(&self) -> &str {
        match self {
            ArmorType::Message => "PGP MESSAGE",
            ArmorType::PublicKey => "PGP PUBLIC KEY BLOCK",
            ArmorType::PrivateKey => "PGP PRIVATE KEY BLOCK",
            ArmorType::Signature => "PGP SIGNATURE",
            ArmorType::Custom(s) => s,
        }
    }

    /// Parse armor type from header string
    pub fn from_header_string(header: &str) -> Self {
        match header {
            "PGP MESSAGE" => ArmorType::Message,
            "PGP PUBLIC KEY BLOCK" => ArmorType::PublicKey,
            "PGP PRIVATE KEY BLOCK" | "PGP SECRET KEY BLOCK" => ArmorType::PrivateKey,
            "PGP SIGNATURE" => ArmorType::Signature,
            s => ArmorType::Custom(s.to_string()),
        }
    }
}

/// ASCII armored data with headers
#[derive(Debug, Clone)]
pub struct ArmoredData {
    /// The type of armored data
    pub armor_type: ArmorType,
    /// Armor headers (key-value pairs)
    pub headers: BTreeMap<String, String>,
    /// The decoded binary data
    pub data: Vec<u8>,
}

impl ArmoredData {
    /// Get a header value
    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers.get(key)
    }
}

/// Calculate CRC-24 checksum used in armor trailers
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;

    for &byte in data {
        crc ^= (byte as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if (crc & 0x1000000) != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }

    crc & 0xFFFFFF
}

/// Encode binary data as ASCII armored text
pub fn encode(data: &[u8], armor_type: ArmorType) -> String {
    encode_with_headers(data, armor_type, &BTreeMap::new())
}

/// Encode binary data as ASCII armored text with custom headers
pub fn encode_with_headers(
    data: &[u8],
    armor_type: ArmorType,
    headers: &BTreeMap<String, String>,
) -> String {
    let label = armor_type.header_string();
    let mut output = String::with_capacity(data.len() * 4 / 3 + 128);

    output.push_str(&format!("{BEGIN_PREFIX}{label}{DASHES}\n"));
    for (key, value) in headers {
        output.push_str(&format!("{}: {}\n", key, value));
    }
    // Blank line separates headers from the body even when there are none
    output.push('\n');

    let body = STANDARD.encode(data);
    // Base64 output is pure ASCII, so byte offsets are char boundaries
    let mut start = 0;
    while start < body.len() {
        let end = (start + LINE_WIDTH).min(body.len());
        output.push_str(&body[start..end]);
        output.push('\n');
        start = end;
    }

    let checksum = crc24(data).to_be_bytes();
    output.push('=');
    output.push_str(&STANDARD.encode(&checksum[1..]));
    output.push('\n');

    output.push_str(&format!("{END_PREFIX}{label}{DASHES}\n"));
    output
}

/// Decode ASCII armored text to binary data.
///
/// The CRC-24 trailer line is accepted but not verified.
pub fn decode(armored_text: &str) -> Result<ArmoredData> {
    let mut lines = armored_text.lines().map(str::trim);

    let armor_type = loop {
        let line = lines
            .next()
            .ok_or_else(|| PgpError::armor("No armor header found"))?;
        if let Some(label) = line
            .strip_prefix(BEGIN_PREFIX)
            .and_then(|rest| rest.strip_suffix(DASHES))
        {
            break ArmorType::from_header_string(label);
        }
    };

    let mut headers = BTreeMap::new();
    let mut body = String::new();
    let mut in_headers = true;
    let mut saw_end = false;

    for line in lines.by_ref() {
        if let Some(label) = line
            .strip_prefix(END_PREFIX)
            .and_then(|rest| rest.strip_suffix(DASHES))
        {
            if ArmorType::from_header_string(label) != armor_type {
                return Err(PgpError::armor(format!(
                    "End header mismatch: expected '{}', got '{}'",
                    armor_type.header_string(),
                    label
                )));
            }
            saw_end = true;
            break;
        }

        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if let Some((key, value)) = line.split_once(": ") {
                headers.insert(key.trim().to_string(), value.trim().to_string());
                continue;
            }
            // Some producers omit the blank separator line
            in_headers = false;
        }

        if line.is_empty() {
            continue;
        }
        if line.starts_with('=') && line.len() == 5 {
            // CRC-24 trailer
            continue;
        }
        if !is_base64_line(line) {
            return Err(PgpError::armor(format!("Invalid base64 data: {}", line)));
        }
        body.push_str(line);
    }

    if !saw_end {
        return Err(PgpError::armor("Missing end header"));
    }

    let data = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| PgpError::armor(format!("Invalid base64 body: {}", e)))?;

    Ok(ArmoredData {
        armor_type,
        headers,
        data,
    })
}

/// Returns true if the input looks like an armored block rather than binary packets
pub fn is_armored(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(BEGIN_PREFIX.as_bytes())
}

/// Normalizes binary or armored input into binary packet data.
///
/// Binary input is borrowed as-is; armored input is decoded into an owned buffer.
pub fn decoder_stream(data: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !is_armored(data) {
        return Ok(Cow::Borrowed(data));
    }

    let text = std::str::from_utf8(data)
        .map_err(|_| PgpError::armor("Armored input is not valid UTF-8"))?;
    let armored = decode(text)?;
    tracing::debug!(
        armor_type = armored.armor_type.header_string(),
        decoded_size = armored.data.len(),
        "Decoded armored input"
    );
    Ok(Cow::Owned(armored.data))
}

/// Check if a line contains valid base64 characters
fn is_base64_line(line: &str) -> bool {
    !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}
