//! Command-line argument definitions.

use crate::compression::CompressionAlgorithm;
use crate::crypto::SymmetricAlgorithm;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hybrid post-quantum OpenPGP file encryption
#[derive(Parser, Debug)]
#[command(name = "pgpcrypt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Encrypt and decrypt files with post-quantum OpenPGP keys")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt a file for the encryption key of a key ring
    Encrypt {
        /// File to encrypt
        input: PathBuf,

        /// Where to write the encrypted message
        output: PathBuf,

        /// Public (or secret) key ring holding the recipient key
        public_key_ring: PathBuf,

        /// Compression: none, zip, zlib or bzip2
        #[arg(long)]
        compression: Option<CompressionAlgorithm>,

        /// Bulk cipher: aes128 or aes256
        #[arg(long)]
        cipher: Option<SymmetricAlgorithm>,

        /// Write ASCII-armored output
        #[arg(long)]
        armor: bool,
    },

    /// Decrypt a message with a secret key ring
    Decrypt {
        /// Encrypted message, binary or armored
        input: PathBuf,

        /// Where to write the decrypted content
        output: PathBuf,

        /// Secret key ring
        secret_key_ring: PathBuf,

        /// Read the passphrase from this environment variable
        #[arg(long, value_name = "VAR", conflicts_with = "passphrase_file")]
        passphrase_env: Option<String>,

        /// Read the passphrase from the first line of this file
        #[arg(long, value_name = "PATH")]
        passphrase_file: Option<PathBuf>,
    },

    /// List the keys of a public or secret key ring
    ListKeys {
        /// Key ring file, binary or armored
        key_ring: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
