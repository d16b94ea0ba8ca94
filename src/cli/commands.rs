//! Command implementations for the pgpcrypt CLI.

use crate::cli::utils::{
    modified_timestamp, read_file, read_passphrase, write_file, PassphraseSource,
};
use crate::compression::CompressionAlgorithm;
use crate::config::Config;
use crate::crypto::{Passphrase, PublicKey, SymmetricAlgorithm};
use crate::error::Result;
use crate::keyring::{
    load_secret_key_ring, resolve_recipient_key, PublicKeyRingBundle, SecretKeyRingBundle,
};
use crate::message::{Decryptor, EncryptOptions, Encryptor};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// Execute the encrypt command
pub fn encrypt(
    input: &Path,
    output: &Path,
    public_key_ring: &Path,
    compression: Option<CompressionAlgorithm>,
    cipher: Option<SymmetricAlgorithm>,
    armor: bool,
    config: &Config,
) -> Result<()> {
    let recipient = resolve_recipient_key(&read_file(public_key_ring)?)?;

    let mut options = EncryptOptions::from(config);
    if let Some(compression) = compression {
        options.compression = compression;
    }
    if let Some(cipher) = cipher {
        options.cipher = cipher;
    }
    options.file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let plaintext = read_file(input)?;
    options.modified = modified_timestamp(input)?;
    let message = Encryptor::new(options).encrypt(&plaintext, &recipient)?;
    if armor || config.armor {
        write_file(output, message.to_armored().as_bytes())?;
    } else {
        write_file(output, message.as_bytes())?;
    }

    info!(
        input = %input.display(),
        output = %output.display(),
        key_id = %format!("{:016X}", recipient.key_id()),
        "Encrypted file"
    );
    Ok(())
}

/// Execute the decrypt command
pub fn decrypt(
    input: &Path,
    output: &Path,
    secret_key_ring: &Path,
    passphrase_source: &PassphraseSource,
    config: &Config,
) -> Result<()> {
    let secret_keys = load_secret_key_ring(File::open(secret_key_ring)?)?;
    let data = read_file(input)?;

    let needs_passphrase = secret_keys
        .rings()
        .iter()
        .flat_map(|ring| ring.keys())
        .any(|key| key.is_protected());
    let passphrase = if needs_passphrase {
        read_passphrase(passphrase_source)?
    } else {
        debug!("No protected keys in ring, skipping passphrase");
        Passphrase::empty()
    };

    let content = Decryptor::from_config(&secret_keys, config).decrypt(&data, &passphrase)?;
    write_file(output, &content)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        size = content.len(),
        "Decrypted file"
    );
    Ok(())
}

/// One row of the key listing
#[derive(Debug, Serialize)]
pub struct KeySummary {
    pub key_id: String,
    pub fingerprint: String,
    pub algorithm: String,
    pub master: bool,
    pub usage: Vec<&'static str>,
    pub created: u32,
    pub created_at: String,
    pub user_ids: Vec<String>,
    /// `None` for public rings
    pub protected: Option<bool>,
}

impl KeySummary {
    fn new(key: &PublicKey, user_ids: &[String], protected: Option<bool>) -> Self {
        Self {
            key_id: format!("{:016X}", key.key_id()),
            fingerprint: hex::encode_upper(key.fingerprint()),
            algorithm: key.algorithm().to_string(),
            master: key.is_master(),
            usage: key.usage().names(),
            created: key.created(),
            created_at: format_timestamp(key.created()),
            user_ids: user_ids.to_vec(),
            protected,
        }
    }
}

/// Format a key creation time for display
fn format_timestamp(ts: u32) -> String {
    Utc.timestamp_opt(i64::from(ts), 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Summaries of every key in a key ring file, public rings tried first
pub fn summarize_key_ring(data: &[u8]) -> Result<Vec<KeySummary>> {
    match PublicKeyRingBundle::from_bytes(data) {
        Ok(bundle) => Ok(bundle
            .rings()
            .iter()
            .flat_map(|ring| {
                ring.keys()
                    .iter()
                    .map(move |key| KeySummary::new(key, ring.user_ids(), None))
            })
            .collect()),
        Err(public_err) => {
            debug!(error = %public_err, "Not a public key ring, trying secret key ring");
            let bundle = SecretKeyRingBundle::from_bytes(data)?;
            Ok(bundle
                .rings()
                .iter()
                .flat_map(|ring| {
                    ring.keys().iter().map(move |key| {
                        KeySummary::new(key.public_key(), ring.user_ids(), Some(key.is_protected()))
                    })
                })
                .collect())
        }
    }
}

/// Execute the list-keys command
pub fn list_keys(key_ring: &Path, json: bool) -> Result<()> {
    let summaries = summarize_key_ring(&read_file(key_ring)?)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        serde_json::to_writer_pretty(&mut out, &summaries).map_err(io::Error::from)?;
        writeln!(out)?;
        return Ok(());
    }

    for summary in &summaries {
        let kind = if summary.master { "master" } else { "subkey" };
        let lock = match summary.protected {
            Some(true) => " [protected]",
            Some(false) => " [unprotected]",
            None => "",
        };
        writeln!(
            out,
            "{} {} {:<10} {} {}{}",
            kind,
            summary.key_id,
            summary.algorithm,
            summary.created_at,
            summary.usage.join(","),
            lock
        )?;
        writeln!(out, "  fingerprint {}", summary.fingerprint)?;
        if summary.master {
            for user_id in &summary.user_ids {
                writeln!(out, "  uid {}", user_id)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{PublicKeyAlgorithm, S2kParams};
    use crate::keyring::KeyRingBuilder;
    use tempfile::tempdir;

    #[test]
    fn test_encrypt_records_file_name_and_mtime() {
        let dir = tempdir().unwrap();
        let generated = KeyRingBuilder::new("dave")
            .subkey(PublicKeyAlgorithm::Mlkem1024)
            .s2k_params(S2kParams::new(1, 1, 10).unwrap())
            .build()
            .unwrap();
        let ring = dir.path().join("public.pgp");
        let input = dir.path().join("notes.txt");
        let output = dir.path().join("notes.txt.pgp");
        write_file(&ring, &generated.public.to_bytes()).unwrap();
        write_file(&input, b"meeting notes").unwrap();

        encrypt(&input, &output, &ring, None, None, false, &Config::default()).unwrap();

        let secret = SecretKeyRingBundle::new(vec![generated.secret]).unwrap();
        let literal = Decryptor::new(&secret)
            .decrypt_literal(&read_file(&output).unwrap(), &Passphrase::empty())
            .unwrap();
        assert_eq!(literal.file_name, "notes.txt");
        assert_eq!(Some(literal.modified), modified_timestamp(&input).unwrap());
        assert_eq!(literal.data, b"meeting notes");
    }

    #[test]
    fn test_summaries_for_both_ring_kinds() {
        let generated = KeyRingBuilder::new("carol")
            .subkey(PublicKeyAlgorithm::Mlkem1024)
            .passphrase(Passphrase::new("pw"))
            .s2k_params(S2kParams::new(1, 1, 10).unwrap())
            .build()
            .unwrap();

        let public = summarize_key_ring(&generated.public.to_bytes()).unwrap();
        assert_eq!(public.len(), 2);
        assert!(public[0].master);
        assert_eq!(public[0].user_ids, vec!["carol".to_string()]);
        assert_eq!(public[1].usage, vec!["encrypt"]);
        assert!(public.iter().all(|s| s.protected.is_none()));

        let secret = summarize_key_ring(generated.secret.to_armored().as_bytes()).unwrap();
        assert_eq!(secret[1].key_id, public[1].key_id);
        assert_eq!(secret[1].fingerprint, public[1].fingerprint);
        assert_eq!(public[0].fingerprint.len(), 64);
        assert!(public[0].created_at.ends_with("UTC"));
        assert!(secret.iter().all(|s| s.protected == Some(true)));
    }
}
