//! Error types for pgpcrypt operations.

use thiserror::Error;

/// Result type alias for pgpcrypt operations.
pub type Result<T> = std::result::Result<T, PgpError>;

/// Main error type for pgpcrypt operations.
#[derive(Error, Debug)]
pub enum PgpError {
    /// Key ring bytes could not be parsed
    #[error("Corrupt key ring: {0}")]
    CorruptKeyRing(String),

    /// No key in any ring carries the encrypt capability
    #[error("No encryption key: {0}")]
    NoEncryptionKey(String),

    /// The supplied recipient key cannot be used for encryption
    #[error("Key unsuitable: {0}")]
    KeyUnsuitable(String),

    /// No local secret key resolves any session key entry
    #[error("{}", no_matching_key_message(.attempted))]
    NoMatchingKey {
        /// Key ids named by the session key entries, in message order
        attempted: Vec<u64>,
    },

    /// The decrypted payload is not a literal data object
    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    /// Malformed or out-of-order object sequence
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Packet parsing or construction errors
    #[error("Packet error: {0}")]
    Packet(String),

    /// Armor encoding/decoding errors
    #[error("Armor error: {0}")]
    Armor(String),

    /// Cryptographic operation errors
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Passphrase-related errors
    #[error("Passphrase error: {0}")]
    Passphrase(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

fn no_matching_key_message(attempted: &[u64]) -> String {
    if attempted.is_empty() {
        return "No matching key: message carries no public-key session key entries".to_string();
    }
    let ids: Vec<String> = attempted.iter().map(|id| format!("{:016X}", id)).collect();
    format!(
        "No matching key: no secret key unlocked any of [{}]",
        ids.join(", ")
    )
}

impl PgpError {
    /// Creates a new corrupt key ring error.
    pub fn corrupt_key_ring<T: ToString>(msg: T) -> Self {
        Self::CorruptKeyRing(msg.to_string())
    }

    /// Creates a new no-encryption-key error.
    pub fn no_encryption_key<T: ToString>(msg: T) -> Self {
        Self::NoEncryptionKey(msg.to_string())
    }

    /// Creates a new key unsuitable error.
    pub fn key_unsuitable<T: ToString>(msg: T) -> Self {
        Self::KeyUnsuitable(msg.to_string())
    }

    /// Creates a new unsupported content error.
    pub fn unsupported_content<T: ToString>(msg: T) -> Self {
        Self::UnsupportedContent(msg.to_string())
    }

    /// Creates a new corrupt stream error.
    pub fn corrupt_stream<T: ToString>(msg: T) -> Self {
        Self::CorruptStream(msg.to_string())
    }

    /// Creates a new packet error.
    pub fn packet<T: ToString>(msg: T) -> Self {
        Self::Packet(msg.to_string())
    }

    /// Creates a new armor error.
    pub fn armor<T: ToString>(msg: T) -> Self {
        Self::Armor(msg.to_string())
    }

    /// Creates a new cryptographic error.
    pub fn crypto<T: ToString>(msg: T) -> Self {
        Self::Crypto(msg.to_string())
    }

    /// Creates a new passphrase error.
    pub fn passphrase<T: ToString>(msg: T) -> Self {
        Self::Passphrase(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Folds low-level parse failures into `CorruptStream`.
    ///
    /// I/O failures and errors that are already part of the message
    /// taxonomy pass through unchanged.
    pub fn in_stream_context(self) -> Self {
        match self {
            Self::Io(_)
            | Self::CorruptStream(_)
            | Self::UnsupportedContent(_)
            | Self::NoMatchingKey { .. } => self,
            other => Self::CorruptStream(other.to_string()),
        }
    }

    /// Folds low-level parse failures into `CorruptKeyRing`.
    pub fn in_keyring_context(self) -> Self {
        match self {
            Self::Io(_) | Self::CorruptKeyRing(_) => self,
            other => Self::CorruptKeyRing(other.to_string()),
        }
    }

    /// Process exit code used by the command line wrapper.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CorruptKeyRing(_) => 3,
            Self::NoEncryptionKey(_) | Self::KeyUnsuitable(_) => 4,
            Self::NoMatchingKey { .. } => 5,
            Self::UnsupportedContent(_) => 6,
            Self::CorruptStream(_) => 7,
            Self::Io(_) => 8,
            Self::Config(_) => 9,
            _ => 1,
        }
    }
}
