//! Decryption pipeline: sealed data packet → compressed container → literal.

use crate::armor;
use crate::compression::decompress;
use crate::config::Config;
use crate::crypto::{decrypt_packet, Passphrase, SessionKey};
use crate::error::{PgpError, Result};
use crate::keyring::SecretKeyRingBundle;
use crate::packet::{LiteralDataPacket, PkeskPacket};
use crate::stream::{EncryptedDataList, EncryptedSessionKey, ObjectStream, PgpObject};
use crate::validation::{Validator, MAX_DECOMPRESSED_SIZE};
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// Decrypts messages with keys from a secret key ring bundle
#[derive(Debug)]
pub struct Decryptor<'a> {
    secret_keys: &'a SecretKeyRingBundle,
    max_decompressed_size: usize,
}

impl<'a> Decryptor<'a> {
    /// Decryptor over the given secret keys
    pub fn new(secret_keys: &'a SecretKeyRingBundle) -> Self {
        Self {
            secret_keys,
            max_decompressed_size: MAX_DECOMPRESSED_SIZE,
        }
    }

    /// Decryptor using the limits from a configuration
    pub fn from_config(secret_keys: &'a SecretKeyRingBundle, config: &Config) -> Self {
        Self::new(secret_keys).with_max_decompressed_size(config.max_decompressed_size)
    }

    /// Cap on the decompressed payload size
    pub fn with_max_decompressed_size(mut self, limit: usize) -> Self {
        self.max_decompressed_size = limit;
        self
    }

    /// Decrypt a binary or armored message and return its content
    pub fn decrypt(&self, data: &[u8], passphrase: &Passphrase) -> Result<Vec<u8>> {
        Ok(self.decrypt_literal(data, passphrase)?.data)
    }

    /// Decrypt a binary or armored message and return the literal packet
    pub fn decrypt_literal(&self, data: &[u8], passphrase: &Passphrase) -> Result<LiteralDataPacket> {
        self.open(data, passphrase)
            .map_err(PgpError::in_stream_context)
    }

    /// Read a whole message, decrypt it, and write the content.
    ///
    /// Returns the number of content bytes written.
    pub fn decrypt_stream<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        passphrase: &Passphrase,
    ) -> Result<usize> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let content = self.decrypt(&data, passphrase)?;
        writer.write_all(&content)?;
        writer.flush()?;
        Ok(content.len())
    }

    fn open(&self, data: &[u8], passphrase: &Passphrase) -> Result<LiteralDataPacket> {
        Validator::validate_message_size(data)?;
        let binary = armor::decoder_stream(data)?;
        let mut objects = ObjectStream::new(&binary);

        let mut object = objects.next_object()?;
        if matches!(object, Some(PgpObject::Marker)) {
            object = objects.next_object()?;
        }
        let list = match object {
            Some(PgpObject::EncryptedDataList(list)) => list,
            Some(other) => {
                return Err(PgpError::corrupt_stream(format!(
                    "Expected encrypted data, found {}",
                    other.kind()
                )))
            }
            None => return Err(PgpError::corrupt_stream("No encrypted data found")),
        };
        match objects.next_object() {
            Ok(Some(extra)) => {
                warn!(object = %extra.kind(), "Ignoring data after the encrypted data packet")
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring unparseable data after the encrypted data packet"),
        }

        let session_key = self.resolve_session_key(&list, passphrase)?;
        if session_key.algorithm() != list.data.cipher {
            return Err(PgpError::corrupt_stream(format!(
                "Session key is for {} but the data packet uses {}",
                session_key.algorithm(),
                list.data.cipher
            )));
        }
        let plaintext = decrypt_packet(&list.data, &session_key)
            .map_err(|e| PgpError::corrupt_stream(format!("Integrity check failed: {}", e)))?;
        drop(session_key);

        let literal = self.unwrap_payload(&plaintext)?;
        info!(
            cipher = %list.data.cipher,
            size = literal.data.len(),
            "Decrypted message"
        );
        Ok(literal)
    }

    /// Try each session key entry in order until one unwraps
    fn resolve_session_key(
        &self,
        list: &EncryptedDataList,
        passphrase: &Passphrase,
    ) -> Result<SessionKey> {
        let mut attempted = Vec::new();

        for entry in &list.entries {
            let pkesk = match entry {
                EncryptedSessionKey::PublicKey(pkesk) => pkesk,
                EncryptedSessionKey::Passphrase(_) => {
                    warn!("Skipping passphrase-encrypted session key entry");
                    continue;
                }
            };
            attempted.push(pkesk.key_id);

            match self.try_entry(pkesk, passphrase) {
                Ok(session_key) => {
                    debug!(
                        key_id = %format!("{:016X}", pkesk.key_id),
                        cipher = %session_key.algorithm(),
                        "Recovered session key"
                    );
                    return Ok(session_key);
                }
                Err(e) => debug!(
                    key_id = %format!("{:016X}", pkesk.key_id),
                    error = %e,
                    "Session key entry not usable"
                ),
            }
        }

        Err(PgpError::NoMatchingKey { attempted })
    }

    fn try_entry(&self, pkesk: &PkeskPacket, passphrase: &Passphrase) -> Result<SessionKey> {
        let secret_key = self
            .secret_keys
            .get_secret_key(pkesk.key_id)
            .ok_or_else(|| PgpError::crypto("No secret key with this id"))?;
        let private_key = secret_key.extract_private_key(passphrase)?;
        SessionKey::unwrap_from(pkesk, &private_key)
    }

    fn unwrap_payload(&self, plaintext: &[u8]) -> Result<LiteralDataPacket> {
        let mut objects = ObjectStream::new(plaintext);
        let first = objects
            .next_object()?
            .ok_or_else(|| PgpError::corrupt_stream("Decrypted payload is empty"))?;

        match first {
            PgpObject::Compressed(container) => {
                let data = decompress(
                    container.algorithm,
                    &container.data,
                    self.max_decompressed_size,
                )?;
                let mut inner = ObjectStream::new(&data);
                let object = inner
                    .next_object()?
                    .ok_or_else(|| PgpError::corrupt_stream("Compressed container is empty"))?;
                let literal = literal_payload(object)?;
                if inner.next_object()?.is_some() {
                    return Err(PgpError::corrupt_stream(
                        "Compressed container holds more than one literal payload",
                    ));
                }
                Ok(literal)
            }
            other => literal_payload(other),
        }
    }
}

fn literal_payload(object: PgpObject) -> Result<LiteralDataPacket> {
    match object {
        PgpObject::Literal(literal) => Ok(literal),
        PgpObject::SignatureList(_) => Err(PgpError::unsupported_content(
            "signed, non-literal payload unsupported",
        )),
        PgpObject::Compressed(_) => Err(PgpError::unsupported_content(
            "Nested compressed data is not supported",
        )),
        other @ (PgpObject::Marker
        | PgpObject::EncryptedDataList(_)
        | PgpObject::PublicKeyRing(_)
        | PgpObject::SecretKeyRing(_)
        | PgpObject::Unknown { .. }) => Err(PgpError::unsupported_content(format!(
            "Expected literal data, found {}",
            other.kind()
        ))),
    }
}

/// Decrypt `data` with keys from `secret_keys`, unlocking them with `passphrase`
pub fn decrypt(
    data: &[u8],
    secret_keys: &SecretKeyRingBundle,
    passphrase: &Passphrase,
) -> Result<Vec<u8>> {
    Decryptor::new(secret_keys).decrypt(data, passphrase)
}
