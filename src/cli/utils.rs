//! File and passphrase helpers for CLI operations.

use crate::crypto::Passphrase;
use crate::error::{PgpError, Result};
use rpassword::prompt_password;
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use zeroize::Zeroizing;

/// Where the decryption passphrase comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassphraseSource {
    /// Named environment variable
    Env(String),
    /// First line of a file
    File(PathBuf),
    /// Interactive prompt without echo
    Prompt,
}

impl PassphraseSource {
    /// Pick the source from the optional command-line flags
    pub fn from_flags(env_var: Option<String>, file: Option<PathBuf>) -> Self {
        match (env_var, file) {
            (Some(name), _) => Self::Env(name),
            (None, Some(path)) => Self::File(path),
            (None, None) => Self::Prompt,
        }
    }
}

/// Read file contents
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = fs::File::open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Last-write time of a file as a Unix timestamp, if the platform reports one
pub fn modified_timestamp(path: &Path) -> Result<Option<u32>> {
    let modified = fs::metadata(path)?.modified().ok();
    Ok(modified
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .and_then(|since| u32::try_from(since.as_secs()).ok()))
}

/// Write file contents
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.flush()?;
    Ok(())
}

/// Obtain the passphrase from its source
pub fn read_passphrase(source: &PassphraseSource) -> Result<Passphrase> {
    match source {
        PassphraseSource::Env(name) => env::var(name).map(Passphrase::new).map_err(|_| {
            PgpError::config(format!("Passphrase variable {} is not set", name))
        }),
        PassphraseSource::File(path) => {
            let contents = Zeroizing::new(fs::read_to_string(path)?);
            let line = contents.lines().next().unwrap_or("");
            Ok(Passphrase::new(line))
        }
        PassphraseSource::Prompt => {
            let passphrase = prompt_password("Enter passphrase: ")?;
            Ok(Passphrase::new(passphrase))
        }
    }
}
