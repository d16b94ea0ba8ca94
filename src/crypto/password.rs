//! Passphrase protection of secret key material using Argon2id and AES-GCM.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use argon2::{Argon2, Params};
use rand::{CryptoRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{PgpError, Result};

/// Salt size for Argon2 (128 bits)
pub const SALT_SIZE: usize = 16;

/// AES-GCM nonce size
pub const NONCE_SIZE: usize = 12;

/// Passphrase used to unlock secret keys.
///
/// The buffer is wiped when the value is dropped.
#[derive(Clone)]
pub struct Passphrase(String);

impl Passphrase {
    /// Create a new passphrase from a string
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(passphrase.into())
    }

    /// An empty passphrase, sufficient for unprotected keys
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Get passphrase as bytes
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Check if passphrase is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

impl Drop for Passphrase {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Largest accepted Argon2 memory exponent (2 GiB)
pub const MAX_MEMORY_EXPONENT: u8 = 21;

/// Argon2id cost parameters stored alongside protected key material.
///
/// Memory cost is encoded as an exponent: `1 << memory_exponent` KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S2kParams {
    /// Number of passes
    pub passes: u8,
    /// Degree of parallelism
    pub parallelism: u8,
    /// Base-2 logarithm of the memory cost in KiB
    pub memory_exponent: u8,
}

impl S2kParams {
    /// Build parameters, rejecting values Argon2 cannot run with
    pub fn new(passes: u8, parallelism: u8, memory_exponent: u8) -> Result<Self> {
        let params = Self {
            passes,
            parallelism,
            memory_exponent,
        };
        params.argon2_params()?;
        Ok(params)
    }

    fn argon2_params(&self) -> Result<Params> {
        if self.memory_exponent > MAX_MEMORY_EXPONENT {
            return Err(PgpError::passphrase(format!(
                "Argon2 memory exponent {} exceeds maximum {}",
                self.memory_exponent, MAX_MEMORY_EXPONENT
            )));
        }
        Params::new(
            1u32 << self.memory_exponent,
            self.passes as u32,
            self.parallelism as u32,
            Some(32),
        )
        .map_err(|e| PgpError::passphrase(format!("Invalid Argon2 parameters: {}", e)))
    }
}

impl Default for S2kParams {
    /// 2 passes, single lane, 16 MiB
    fn default() -> Self {
        Self {
            passes: 2,
            parallelism: 1,
            memory_exponent: 14,
        }
    }
}

/// How a secret key's material is stored
pub enum KeyProtection {
    /// Material stored in the clear
    Unprotected {
        /// Raw secret key material
        material: Zeroizing<Vec<u8>>,
    },
    /// Material sealed with an Argon2id-derived AES-256-GCM key
    Argon2Aead {
        /// Argon2 cost parameters
        params: S2kParams,
        /// Argon2 salt
        salt: [u8; SALT_SIZE],
        /// AES-GCM nonce
        nonce: [u8; NONCE_SIZE],
        /// Sealed material including the authentication tag
        ciphertext: Vec<u8>,
    },
}

impl KeyProtection {
    /// Store material without a passphrase
    pub fn unprotected(material: Zeroizing<Vec<u8>>) -> Self {
        Self::Unprotected { material }
    }

    /// Seal material under a passphrase.
    ///
    /// `aad` binds the sealed material to its public key fields.
    pub fn lock<R: CryptoRng + RngCore>(
        material: &[u8],
        passphrase: &Passphrase,
        params: S2kParams,
        aad: &[u8],
        rng: &mut R,
    ) -> Result<Self> {
        let mut salt = [0u8; SALT_SIZE];
        rng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce);

        let key = derive_key(passphrase, &salt, &params)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: material,
                    aad,
                },
            )
            .map_err(|e| PgpError::crypto(format!("Failed to protect secret key: {}", e)))?;

        Ok(Self::Argon2Aead {
            params,
            salt,
            nonce,
            ciphertext,
        })
    }

    /// Recover the secret material
    pub fn unlock(&self, passphrase: &Passphrase, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Unprotected { material } => Ok(material.clone()),
            Self::Argon2Aead {
                params,
                salt,
                nonce,
                ciphertext,
            } => {
                let key = derive_key(passphrase, salt, params)?;
                let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
                cipher
                    .decrypt(
                        Nonce::from_slice(nonce),
                        Payload {
                            msg: ciphertext,
                            aad,
                        },
                    )
                    .map(Zeroizing::new)
                    .map_err(|_| {
                        PgpError::passphrase("Failed to unlock secret key (wrong passphrase?)")
                    })
            }
        }
    }

    /// Whether a passphrase is required to unlock
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Argon2Aead { .. })
    }
}

impl fmt::Debug for KeyProtection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unprotected { .. } => f.write_str("KeyProtection::Unprotected([REDACTED])"),
            Self::Argon2Aead { params, .. } => f
                .debug_struct("KeyProtection::Argon2Aead")
                .field("params", params)
                .finish_non_exhaustive(),
        }
    }
}

/// Derive a 256-bit key from a passphrase using Argon2id
fn derive_key(
    passphrase: &Passphrase,
    salt: &[u8; SALT_SIZE],
    params: &S2kParams,
) -> Result<Zeroizing<[u8; 32]>> {
    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params.argon2_params()?,
    );

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, key.as_mut())
        .map_err(|e| PgpError::passphrase(format!("Passphrase hashing failed: {}", e)))?;
    Ok(key)
}
