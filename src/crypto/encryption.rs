//! Chunked AEAD bulk encryption for the integrity-protected data packet.
//!
//! The session key and a random 32-byte salt feed HKDF-SHA3-256, which
//! yields the message key and a 4-byte IV prefix. The payload is split into
//! chunks of `2^(c + 6)` bytes, each sealed with nonce `iv || index` and the
//! packet header as associated data. A final tag over the empty string,
//! bound to the total plaintext length, detects truncation.

use crate::crypto::{AeadAlgorithm, SessionKey, SymmetricAlgorithm};
use crate::error::{PgpError, Result};
use crate::packet::session::SeipdPacket;
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha3::Sha3_256;
use zeroize::Zeroizing;

/// Default chunk size octet: 2^18 = 256 KiB chunks
pub const DEFAULT_CHUNK_SIZE_OCTET: u8 = 12;

/// Largest accepted chunk size octet (4 MiB chunks)
pub const MAX_CHUNK_SIZE_OCTET: u8 = 16;

/// Authentication tag size
pub const TAG_SIZE: usize = 16;

const IV_SIZE: usize = 4;

/// Chunk size in bytes for a chunk size octet
pub fn chunk_size(chunk_size_octet: u8) -> usize {
    1usize << (chunk_size_octet as u32 + 6)
}

/// Length of the sealed chunk stream plus final tag for a plaintext length
pub fn encrypted_len(plaintext_len: usize, chunk_size_octet: u8) -> usize {
    let chunks = plaintext_len.div_ceil(chunk_size(chunk_size_octet));
    plaintext_len + chunks * TAG_SIZE + TAG_SIZE
}

enum BulkCipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl BulkCipher {
    fn new(algorithm: SymmetricAlgorithm, key: &[u8]) -> Result<Self> {
        let invalid = |_| PgpError::crypto(format!("Invalid {} key length", algorithm));
        Ok(match algorithm {
            SymmetricAlgorithm::Aes128 => Self::Aes128(Aes128Gcm::new_from_slice(key).map_err(invalid)?),
            SymmetricAlgorithm::Aes256 => Self::Aes256(Aes256Gcm::new_from_slice(key).map_err(invalid)?),
        })
    }

    fn seal(&self, nonce: &[u8; 12], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload { msg, aad };
        match self {
            Self::Aes128(cipher) => cipher.encrypt(nonce, payload),
            Self::Aes256(cipher) => cipher.encrypt(nonce, payload),
        }
        .map_err(|_| PgpError::crypto("Chunk encryption failed"))
    }

    fn open(&self, nonce: &[u8; 12], msg: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);
        let payload = Payload { msg, aad };
        match self {
            Self::Aes128(cipher) => cipher.decrypt(nonce, payload),
            Self::Aes256(cipher) => cipher.decrypt(nonce, payload),
        }
        .map_err(|_| PgpError::crypto("Chunk authentication failed"))
    }
}

/// Stateful sealer/opener for one data packet
pub struct ChunkCipher {
    cipher: BulkCipher,
    iv: [u8; IV_SIZE],
    info: [u8; 5],
    index: u64,
    total: u64,
}

impl ChunkCipher {
    /// Derive the message key for a packet header
    pub fn new(
        session_key: &SessionKey,
        aead: AeadAlgorithm,
        chunk_size_octet: u8,
        salt: &[u8; 32],
    ) -> Result<Self> {
        if chunk_size_octet > MAX_CHUNK_SIZE_OCTET {
            return Err(PgpError::crypto(format!(
                "Chunk size octet {} exceeds maximum {}",
                chunk_size_octet, MAX_CHUNK_SIZE_OCTET
            )));
        }
        let algorithm = session_key.algorithm();
        let info = SeipdPacket::info(algorithm, aead, chunk_size_octet);

        let key_size = algorithm.key_size();
        let hk = Hkdf::<Sha3_256>::new(Some(salt), session_key.as_bytes());
        let mut okm = Zeroizing::new(vec![0u8; key_size + IV_SIZE]);
        hk.expand(&info, &mut okm)
            .map_err(|_| PgpError::crypto("HKDF expansion failed"))?;

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&okm[key_size..]);

        Ok(Self {
            cipher: BulkCipher::new(algorithm, &okm[..key_size])?,
            iv,
            info,
            index: 0,
            total: 0,
        })
    }

    fn nonce(&self) -> [u8; 12] {
        let mut nonce = [0u8; 12];
        nonce[..IV_SIZE].copy_from_slice(&self.iv);
        nonce[IV_SIZE..].copy_from_slice(&self.index.to_be_bytes());
        nonce
    }

    fn final_aad(&self) -> [u8; 13] {
        let mut aad = [0u8; 13];
        aad[..5].copy_from_slice(&self.info);
        aad[5..].copy_from_slice(&self.total.to_be_bytes());
        aad
    }

    /// Seal the next chunk
    pub fn seal_chunk(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let sealed = self.cipher.seal(&self.nonce(), chunk, &self.info)?;
        self.index += 1;
        self.total += chunk.len() as u64;
        Ok(sealed)
    }

    /// Open the next chunk
    pub fn open_chunk(&mut self, sealed: &[u8]) -> Result<Vec<u8>> {
        let chunk = self.cipher.open(&self.nonce(), sealed, &self.info)?;
        self.index += 1;
        self.total += chunk.len() as u64;
        Ok(chunk)
    }

    /// Produce the final authentication tag
    pub fn finish(self) -> Result<Vec<u8>> {
        self.cipher.seal(&self.nonce(), &[], &self.final_aad())
    }

    /// Check the final authentication tag
    pub fn verify_final(self, tag: &[u8]) -> Result<()> {
        self.cipher
            .open(&self.nonce(), tag, &self.final_aad())
            .map(|_| ())
            .map_err(|_| PgpError::crypto("Final authentication tag mismatch (truncated message?)"))
    }
}

/// Decrypt and authenticate the chunk stream of a data packet.
///
/// A session key for a different cipher than the packet header names fails
/// authentication; callers report that mismatch themselves.
pub fn decrypt_packet(packet: &SeipdPacket, session_key: &SessionKey) -> Result<Vec<u8>> {
    let data = &packet.encrypted;
    if data.len() < TAG_SIZE {
        return Err(PgpError::crypto("Encrypted data shorter than final tag"));
    }
    let (chunks, final_tag) = data.split_at(data.len() - TAG_SIZE);

    let mut opener = ChunkCipher::new(session_key, packet.aead, packet.chunk_size_octet, &packet.salt)?;
    let sealed_chunk_size = chunk_size(packet.chunk_size_octet) + TAG_SIZE;
    let mut plaintext = Vec::with_capacity(chunks.len());
    for sealed in chunks.chunks(sealed_chunk_size) {
        plaintext.extend_from_slice(&opener.open_chunk(sealed)?);
    }
    opener.verify_final(final_tag)?;

    Ok(plaintext)
}
