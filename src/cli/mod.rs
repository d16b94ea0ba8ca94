//! Command-line interface for pgpcrypt.
//!
//! A thin wrapper over the library: `encrypt`, `decrypt` and `list-keys`
//! read files, resolve keys and passphrases, and hand off to the pipelines.

pub mod args;
pub mod commands;
pub mod utils;

use crate::config::Config;
use crate::Result;
use clap::Parser;

pub use args::{Cli, Command};
pub use utils::PassphraseSource;

/// Main entry point for the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    execute(cli.command, &config)
}

/// Run one parsed command
pub fn execute(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Encrypt {
            input,
            output,
            public_key_ring,
            compression,
            cipher,
            armor,
        } => commands::encrypt(
            &input,
            &output,
            &public_key_ring,
            compression,
            cipher,
            armor,
            config,
        ),
        Command::Decrypt {
            input,
            output,
            secret_key_ring,
            passphrase_env,
            passphrase_file,
        } => commands::decrypt(
            &input,
            &output,
            &secret_key_ring,
            &PassphraseSource::from_flags(passphrase_env, passphrase_file),
            config,
        ),
        Command::ListKeys { key_ring, json } => commands::list_keys(&key_ring, json),
    }
}
