//! Encryption pipeline: literal → compressed container → sealed data packet.

use crate::compression::CompressionAlgorithm;
use crate::config::Config;
use crate::crypto::encryption::{chunk_size, encrypted_len, DEFAULT_CHUNK_SIZE_OCTET};
use crate::crypto::{
    now_timestamp, AeadAlgorithm, ChunkCipher, PublicKey, SessionKey, SymmetricAlgorithm,
};
use crate::error::{PgpError, Result};
use crate::message::CipherMessage;
use crate::packet::session::SEIPD_PREFIX_LEN;
use crate::packet::{LiteralDataPacket, Packet, PacketHeader, PacketTag, SeipdPacket};
use crate::stream::literal_in_container;
use crate::validation::Validator;
use rand::rngs::OsRng;
use rand::RngCore;
use std::io::Write;
use tracing::{debug, info};

/// Encryption settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptOptions {
    /// Compression of the inner container
    pub compression: CompressionAlgorithm,
    /// Bulk cipher
    pub cipher: SymmetricAlgorithm,
    /// Chunk size exponent
    pub chunk_size_octet: u8,
    /// File name recorded in the literal packet
    pub file_name: String,
    /// Modification time recorded in the literal packet; `None` means now
    pub modified: Option<u32>,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            compression: CompressionAlgorithm::Zip,
            cipher: SymmetricAlgorithm::Aes256,
            chunk_size_octet: DEFAULT_CHUNK_SIZE_OCTET,
            file_name: String::new(),
            modified: None,
        }
    }
}

impl From<&Config> for EncryptOptions {
    fn from(config: &Config) -> Self {
        Self {
            compression: config.compression,
            cipher: config.cipher,
            chunk_size_octet: config.chunk_size_octet,
            ..Self::default()
        }
    }
}

/// Encrypts payloads for a single recipient
#[derive(Debug, Clone, Default)]
pub struct Encryptor {
    options: EncryptOptions,
}

impl Encryptor {
    /// Encryptor with explicit options
    pub fn new(options: EncryptOptions) -> Self {
        Self { options }
    }

    /// Encryptor using the algorithms from a configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(EncryptOptions::from(config))
    }

    /// Record a file name in the literal packet
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.options.file_name = file_name.into();
        self
    }

    /// Record a modification time in the literal packet
    pub fn with_modified(mut self, modified: u32) -> Self {
        self.options.modified = Some(modified);
        self
    }

    /// Current options
    pub fn options(&self) -> &EncryptOptions {
        &self.options
    }

    /// Encrypt into an in-memory message
    pub fn encrypt(&self, plaintext: &[u8], recipient: &PublicKey) -> Result<CipherMessage> {
        let mut bytes = Vec::new();
        self.encrypt_to(plaintext, recipient, &mut bytes)?;
        Ok(CipherMessage::new(
            recipient.key_id(),
            self.options.cipher,
            self.options.compression,
            bytes,
        ))
    }

    /// Encrypt and write the message packets, returning the bytes written.
    ///
    /// The compressed container is built in full first: the data packet
    /// header carries a definite length that depends on its size.
    pub fn encrypt_to<W: Write>(
        &self,
        plaintext: &[u8],
        recipient: &PublicKey,
        mut writer: W,
    ) -> Result<usize> {
        if !recipient.can_encrypt() {
            return Err(PgpError::key_unsuitable(format!(
                "Key {:016X} ({}) cannot encrypt",
                recipient.key_id(),
                recipient.algorithm()
            )));
        }
        Validator::validate_message_size(plaintext)?;
        let options = &self.options;

        // Pass one: literal packet inside its compressed container
        let literal = LiteralDataPacket::binary(
            options.file_name.clone(),
            options.modified.unwrap_or_else(now_timestamp),
            plaintext.to_vec(),
        );
        let container = literal_in_container(options.compression, &literal)?.to_bytes();
        drop(literal);
        debug!(
            plaintext = plaintext.len(),
            container = container.len(),
            compression = %options.compression,
            "Built compressed container"
        );

        // Pass two: session key entry, then the sealed data packet
        let mut rng = OsRng;
        let session_key = SessionKey::generate(options.cipher, &mut rng);
        let pkesk = session_key.wrap_for(recipient)?;
        let mut salt = [0u8; 32];
        rng.fill_bytes(&mut salt);

        let mut sealer =
            ChunkCipher::new(&session_key, AeadAlgorithm::Gcm, options.chunk_size_octet, &salt)?;

        let mut written = 0;
        let pkesk_packet = Packet::new(PacketTag::PublicKeyEncryptedSessionKey, pkesk.to_bytes());
        written += write(&mut writer, &pkesk_packet.to_bytes())?;

        let body_len = SEIPD_PREFIX_LEN + encrypted_len(container.len(), options.chunk_size_octet);
        let header = PacketHeader::new(PacketTag::SymEncryptedIntegrityProtectedData, body_len);
        written += write(&mut writer, &header.to_bytes())?;
        written += write(
            &mut writer,
            &SeipdPacket::prefix(options.cipher, AeadAlgorithm::Gcm, options.chunk_size_octet, &salt),
        )?;
        for chunk in container.chunks(chunk_size(options.chunk_size_octet)) {
            written += write(&mut writer, &sealer.seal_chunk(chunk)?)?;
        }
        written += write(&mut writer, &sealer.finish()?)?;
        writer.flush()?;

        info!(
            key_id = %format!("{:016X}", recipient.key_id()),
            cipher = %options.cipher,
            compression = %options.compression,
            plaintext = plaintext.len(),
            output = written,
            "Encrypted message"
        );
        Ok(written)
    }
}

fn write<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<usize> {
    writer.write_all(bytes)?;
    Ok(bytes.len())
}

/// Encrypt `plaintext` for `recipient` with default options and the given compression
pub fn encrypt(
    plaintext: &[u8],
    recipient: &PublicKey,
    compression: CompressionAlgorithm,
) -> Result<CipherMessage> {
    Encryptor::new(EncryptOptions {
        compression,
        ..EncryptOptions::default()
    })
    .encrypt(plaintext, recipient)
}
