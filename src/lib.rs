//! # pgpcrypt
//!
//! Hybrid public-key file encryption in the OpenPGP message model, with
//! post-quantum keys. A random session key seals the data; the session key
//! is wrapped for one recipient with ML-KEM-1024.
//!
//! ## Message layout
//!
//! - **Session key entry**: PKESK v3 carrying an ML-KEM-1024 ciphertext and
//!   the AES-256-GCM wrapped session key
//! - **Encrypted data**: SEIPD v2, chunked AES-GCM with an HKDF-SHA3-256
//!   derived message key
//! - **Payload**: a compressed container (none, zip, zlib or bzip2) holding
//!   one literal data packet
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgpcrypt::compression::CompressionAlgorithm;
//! use pgpcrypt::crypto::{Passphrase, PublicKeyAlgorithm};
//! use pgpcrypt::keyring::{select_encryption_key, KeyRingBuilder, SecretKeyRingBundle};
//! use pgpcrypt::message::{decrypt, encrypt};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generated = KeyRingBuilder::new("Alice <alice@example.com>")
//!     .subkey(PublicKeyAlgorithm::Mlkem1024)
//!     .build()?;
//! let secret = SecretKeyRingBundle::new(vec![generated.secret])?;
//! let recipient = select_encryption_key(&secret)?;
//!
//! let message = encrypt(b"hello world!", &recipient, CompressionAlgorithm::Zip)?;
//! let content = decrypt(message.as_bytes(), &secret, &Passphrase::empty())?;
//! assert_eq!(content, b"hello world!");
//! # Ok(())
//! # }
//! ```

pub mod armor;
pub mod cli;
pub mod compression;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keyring;
pub mod message;
pub mod packet;
pub mod stream;
pub mod validation;

pub use config::Config;
pub use error::{PgpError, Result};
pub use message::{decrypt, encrypt, CipherMessage, Decryptor, Encryptor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
