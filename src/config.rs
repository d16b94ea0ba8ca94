//! Runtime configuration with environment overrides.

use crate::compression::CompressionAlgorithm;
use crate::crypto::encryption::{DEFAULT_CHUNK_SIZE_OCTET, MAX_CHUNK_SIZE_OCTET};
use crate::crypto::SymmetricAlgorithm;
use crate::error::{PgpError, Result};
use crate::validation::MAX_DECOMPRESSED_SIZE;

/// Environment variable selecting the compression algorithm
pub const ENV_COMPRESSION: &str = "PGPCRYPT_COMPRESSION";
/// Environment variable selecting the bulk cipher
pub const ENV_CIPHER: &str = "PGPCRYPT_CIPHER";
/// Environment variable setting the chunk size octet
pub const ENV_CHUNK_SIZE: &str = "PGPCRYPT_CHUNK_SIZE";
/// Environment variable enabling armored output
pub const ENV_ARMOR: &str = "PGPCRYPT_ARMOR";
/// Environment variable bounding decompressed payloads
pub const ENV_MAX_DECOMPRESSED: &str = "PGPCRYPT_MAX_DECOMPRESSED";

/// Settings for encryption and decryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Compression applied before encryption
    pub compression: CompressionAlgorithm,
    /// Bulk cipher for new messages
    pub cipher: SymmetricAlgorithm,
    /// Chunk size exponent for new messages
    pub chunk_size_octet: u8,
    /// Write armored output
    pub armor: bool,
    /// Largest decompressed payload accepted when decrypting
    pub max_decompressed_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compression: CompressionAlgorithm::Zip,
            cipher: SymmetricAlgorithm::Aes256,
            chunk_size_octet: DEFAULT_CHUNK_SIZE_OCTET,
            armor: false,
            max_decompressed_size: MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl Config {
    /// Defaults overridden by `PGPCRYPT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by values from `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_COMPRESSION) {
            config.compression = value.trim().parse()?;
        }
        if let Some(value) = lookup(ENV_CIPHER) {
            config.cipher = value.trim().parse()?;
        }
        if let Some(value) = lookup(ENV_CHUNK_SIZE) {
            config.chunk_size_octet = value.trim().parse().map_err(|_| {
                PgpError::config(format!("{} must be a number, got '{}'", ENV_CHUNK_SIZE, value))
            })?;
        }
        if let Some(value) = lookup(ENV_ARMOR) {
            config.armor = parse_bool(ENV_ARMOR, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_DECOMPRESSED) {
            config.max_decompressed_size = value.trim().parse().map_err(|_| {
                PgpError::config(format!(
                    "{} must be a byte count, got '{}'",
                    ENV_MAX_DECOMPRESSED, value
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_octet > MAX_CHUNK_SIZE_OCTET {
            return Err(PgpError::config(format!(
                "Chunk size octet {} exceeds maximum {}",
                self.chunk_size_octet, MAX_CHUNK_SIZE_OCTET
            )));
        }
        if self.max_decompressed_size == 0 {
            return Err(PgpError::config("Decompression limit must be positive"));
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(PgpError::config(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.compression, CompressionAlgorithm::Zip);
        assert_eq!(config.cipher, SymmetricAlgorithm::Aes256);
        assert!(!config.armor);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_COMPRESSION, "bzip2"),
            (ENV_CIPHER, "aes128"),
            (ENV_CHUNK_SIZE, "4"),
            (ENV_ARMOR, "true"),
            (ENV_MAX_DECOMPRESSED, "4096"),
        ]))
        .unwrap();

        assert_eq!(config.compression, CompressionAlgorithm::BZip2);
        assert_eq!(config.cipher, SymmetricAlgorithm::Aes128);
        assert_eq!(config.chunk_size_octet, 4);
        assert!(config.armor);
        assert_eq!(config.max_decompressed_size, 4096);
    }

    #[test]
    fn test_invalid_values() {
        for pairs in [
            [(ENV_COMPRESSION, "lz4")],
            [(ENV_CIPHER, "idea")],
            [(ENV_CHUNK_SIZE, "99")],
            [(ENV_ARMOR, "maybe")],
            [(ENV_MAX_DECOMPRESSED, "0")],
        ] {
            assert!(matches!(
                Config::from_lookup(lookup(&pairs)),
                Err(PgpError::Config(_))
            ));
        }
    }
}
