//! Compression algorithms for the compressed data packet.
//!
//! Zip is raw DEFLATE (RFC 1951), Zlib adds the RFC 1950 wrapper, BZip2 is
//! the bzip2 stream format. Decompression is bounded so a small packet
//! cannot expand without limit.

use crate::error::{PgpError, Result};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Compression algorithm identifiers (RFC 4880 section 9.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionAlgorithm {
    /// Stored without compression
    Uncompressed,
    /// Raw DEFLATE
    #[default]
    Zip,
    /// DEFLATE with zlib framing
    Zlib,
    /// bzip2
    BZip2,
}

impl CompressionAlgorithm {
    /// Wire identifier
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Uncompressed => 0,
            Self::Zip => 1,
            Self::Zlib => 2,
            Self::BZip2 => 3,
        }
    }

    /// Parse a wire identifier
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Uncompressed),
            1 => Some(Self::Zip),
            2 => Some(Self::Zlib),
            3 => Some(Self::BZip2),
            _ => None,
        }
    }

    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uncompressed => "none",
            Self::Zip => "zip",
            Self::Zlib => "zlib",
            Self::BZip2 => "bzip2",
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = PgpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            "zip" | "deflate" => Ok(Self::Zip),
            "zlib" => Ok(Self::Zlib),
            "bzip2" | "bz2" => Ok(Self::BZip2),
            other => Err(PgpError::config(format!(
                "Unknown compression '{}' (expected none, zip, zlib or bzip2)",
                other
            ))),
        }
    }
}

/// Compress `data` with `algorithm`
pub fn compress(algorithm: CompressionAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
    let compressed = match algorithm {
        CompressionAlgorithm::Uncompressed => return Ok(data.to_vec()),
        CompressionAlgorithm::Zip => {
            let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()?
        }
        CompressionAlgorithm::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()?
        }
        CompressionAlgorithm::BZip2 => {
            let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(data)?;
            encoder.finish()?
        }
    };

    tracing::debug!(
        algorithm = %algorithm,
        input = data.len(),
        output = compressed.len(),
        "Compressed payload"
    );
    Ok(compressed)
}

/// Decompress `data`, failing once the output would exceed `limit` bytes
pub fn decompress(algorithm: CompressionAlgorithm, data: &[u8], limit: usize) -> Result<Vec<u8>> {
    if algorithm == CompressionAlgorithm::Uncompressed {
        if data.len() > limit {
            return Err(exceeded(limit));
        }
        return Ok(data.to_vec());
    }

    let decoder: Box<dyn Read + '_> = match algorithm {
        CompressionAlgorithm::Zip => Box::new(DeflateDecoder::new(data)),
        CompressionAlgorithm::Zlib => Box::new(ZlibDecoder::new(data)),
        CompressionAlgorithm::BZip2 => Box::new(BzDecoder::new(data)),
        CompressionAlgorithm::Uncompressed => Box::new(data),
    };

    let mut output = Vec::new();
    decoder
        .take(limit as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| PgpError::corrupt_stream(format!("{} decompression failed: {}", algorithm, e)))?;

    if output.len() > limit {
        return Err(exceeded(limit));
    }
    Ok(output)
}

fn exceeded(limit: usize) -> PgpError {
    PgpError::corrupt_stream(format!(
        "Decompressed payload exceeds limit of {} bytes",
        limit
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CompressionAlgorithm; 4] = [
        CompressionAlgorithm::Uncompressed,
        CompressionAlgorithm::Zip,
        CompressionAlgorithm::Zlib,
        CompressionAlgorithm::BZip2,
    ];

    #[test]
    fn test_each_algorithm_restores_input() {
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(50);
        for algorithm in ALL {
            let compressed = compress(algorithm, &data).unwrap();
            assert_eq!(decompress(algorithm, &compressed, data.len()).unwrap(), data);
        }
    }

    #[test]
    fn test_compression_shrinks_repetitive_input() {
        let data = vec![b'a'; 10_000];
        assert!(compress(CompressionAlgorithm::Zip, &data).unwrap().len() < 1000);
        assert_eq!(
            compress(CompressionAlgorithm::Uncompressed, &data).unwrap().len(),
            data.len()
        );
    }

    #[test]
    fn test_decompression_limit() {
        let data = vec![0u8; 100_000];
        let compressed = compress(CompressionAlgorithm::Zlib, &data).unwrap();
        assert!(matches!(
            decompress(CompressionAlgorithm::Zlib, &compressed, 1000),
            Err(PgpError::CorruptStream(_))
        ));
        assert!(decompress(CompressionAlgorithm::Uncompressed, &data, 10).is_err());
    }

    #[test]
    fn test_corrupt_input_is_stream_error() {
        let err = decompress(CompressionAlgorithm::Zlib, b"definitely not zlib", 1024).unwrap_err();
        assert!(matches!(err, PgpError::CorruptStream(_)));
    }

    #[test]
    fn test_names_parse() {
        for algorithm in ALL {
            assert_eq!(algorithm.name().parse::<CompressionAlgorithm>().unwrap(), algorithm);
            assert_eq!(CompressionAlgorithm::from_byte(algorithm.to_byte()), Some(algorithm));
        }
        assert!("lzma".parse::<CompressionAlgorithm>().is_err());
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::Zip);
    }
}
