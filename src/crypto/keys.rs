//! Public, secret and private key handles.
//!
//! A [`PublicKey`] wraps a parsed public key packet together with its derived
//! key id. A [`SecretKey`] adds the (possibly passphrase-protected) secret
//! material, and a [`PrivateKey`] is the unlocked form that exists only for
//! the duration of a session key unwrap.

use crate::crypto::{
    generate_key_id, hash_data, now_timestamp, KeyProtection, KeyUsage, Passphrase,
    PublicKeyAlgorithm, S2kParams,
};
use crate::error::{PgpError, Result};
use crate::packet::key::{PublicKeyPacket, SecretKeyPacket};
use crate::packet::{Packet, PacketTag};
use pqcrypto_mldsa::mldsa87;
use pqcrypto_mlkem::mlkem1024::{
    self, PublicKey as Mlkem1024PublicKey, SecretKey as Mlkem1024SecretKey,
};
use pqcrypto_traits::kem::{PublicKey as KemPublicKey, SecretKey as KemSecretKey};
use pqcrypto_traits::sign::{PublicKey as SignPublicKey, SecretKey as SignSecretKey};
use rand::{CryptoRng, RngCore};
use std::fmt;
use zeroize::Zeroizing;

/// A public key from a key ring
#[derive(Clone)]
pub struct PublicKey {
    packet: PublicKeyPacket,
    key_id: u64,
    is_master: bool,
}

impl PublicKey {
    /// Wrap a parsed key packet, deriving its key id
    pub fn from_packet(packet: PublicKeyPacket, is_master: bool) -> Self {
        let key_id = packet.key_id();
        Self {
            packet,
            key_id,
            is_master,
        }
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    /// True for the primary key of a ring, false for subkeys
    pub fn is_master(&self) -> bool {
        self.is_master
    }

    /// Returns the algorithm used by this key
    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.packet.algorithm
    }

    /// Creation timestamp
    pub fn created(&self) -> u32 {
        self.packet.created
    }

    /// Capabilities of this key
    pub fn usage(&self) -> KeyUsage {
        self.packet.algorithm.usage()
    }

    /// Whether the key carries the encrypt capability
    pub fn can_encrypt(&self) -> bool {
        self.usage().encrypt
    }

    /// Raw public key material
    pub fn as_bytes(&self) -> &[u8] {
        &self.packet.material
    }

    /// Underlying packet
    pub fn packet(&self) -> &PublicKeyPacket {
        &self.packet
    }

    /// Serialize as a public key or public subkey packet
    pub fn to_packet(&self) -> Packet {
        let tag = if self.is_master {
            PacketTag::PublicKey
        } else {
            PacketTag::PublicSubkey
        };
        Packet::new(tag, self.packet.to_bytes())
    }

    /// SHA3-256 fingerprint of the public key packet body
    pub fn fingerprint(&self) -> [u8; 32] {
        hash_data(&self.packet.to_bytes())
    }

    /// Reconstruct the ML-KEM-1024 key for encapsulation
    pub(crate) fn as_mlkem1024(&self) -> Result<Mlkem1024PublicKey> {
        if self.algorithm() != PublicKeyAlgorithm::Mlkem1024 {
            return Err(PgpError::key_unsuitable(format!(
                "Key {:016X} is {}, not an encryption key",
                self.key_id,
                self.algorithm()
            )));
        }
        Mlkem1024PublicKey::from_bytes(&self.packet.material)
            .map_err(|_| PgpError::crypto("Failed to reconstruct ML-KEM-1024 public key"))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm())
            .field("key_id", &format_args!("{:016X}", self.key_id))
            .field("is_master", &self.is_master)
            .field("key_size", &self.packet.material.len())
            .finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicKey({}, ID: {:016X})",
            self.algorithm(),
            self.key_id()
        )
    }
}

/// A secret key from a key ring, with its material still locked
pub struct SecretKey {
    public: PublicKey,
    protection: KeyProtection,
}

impl SecretKey {
    /// Wrap a parsed secret key packet
    pub fn from_packet(packet: SecretKeyPacket, is_master: bool) -> Self {
        Self {
            public: PublicKey::from_packet(packet.public, is_master),
            protection: packet.protection,
        }
    }

    /// Public half of this key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.public.key_id()
    }

    /// True for the primary key of a ring
    pub fn is_master(&self) -> bool {
        self.public.is_master()
    }

    /// Whether a passphrase is needed to unlock
    pub fn is_protected(&self) -> bool {
        self.protection.is_protected()
    }

    /// Serialize as a secret key or secret subkey packet
    pub fn to_packet(&self) -> Packet {
        let tag = if self.is_master() {
            PacketTag::SecretKey
        } else {
            PacketTag::SecretSubkey
        };
        Packet::new(
            tag,
            SecretKeyPacket::encode(self.public.packet(), &self.protection),
        )
    }

    /// Unlock the secret material with a passphrase.
    ///
    /// Unprotected keys ignore the passphrase.
    pub fn extract_private_key(&self, passphrase: &Passphrase) -> Result<PrivateKey> {
        let aad = self.public.packet().to_bytes();
        let material = self.protection.unlock(passphrase, &aad)?;
        PrivateKey::new(self.key_id(), self.public.algorithm(), material)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("algorithm", &self.public.algorithm())
            .field("key_id", &format_args!("{:016X}", self.key_id()))
            .field("is_master", &self.is_master())
            .field("is_protected", &self.is_protected())
            .finish()
    }
}

/// Unlocked secret key material, wiped on drop
pub struct PrivateKey {
    key_id: u64,
    algorithm: PublicKeyAlgorithm,
    material: Zeroizing<Vec<u8>>,
}

impl PrivateKey {
    fn new(
        key_id: u64,
        algorithm: PublicKeyAlgorithm,
        material: Zeroizing<Vec<u8>>,
    ) -> Result<Self> {
        if material.len() != algorithm.secret_key_size() {
            return Err(PgpError::crypto(format!(
                "Secret material for {} has {} bytes, expected {}",
                algorithm,
                material.len(),
                algorithm.secret_key_size()
            )));
        }
        Ok(Self {
            key_id,
            algorithm,
            material,
        })
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.key_id
    }

    /// Returns the algorithm used by this key
    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    /// Reconstruct the ML-KEM-1024 key for decapsulation
    pub(crate) fn as_mlkem1024(&self) -> Result<Mlkem1024SecretKey> {
        if self.algorithm != PublicKeyAlgorithm::Mlkem1024 {
            return Err(PgpError::crypto(format!(
                "Key {:016X} is {}, cannot decapsulate",
                self.key_id, self.algorithm
            )));
        }
        Mlkem1024SecretKey::from_bytes(&self.material)
            .map_err(|_| PgpError::crypto("Failed to reconstruct ML-KEM-1024 secret key"))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm)
            .field("key_id", &format_args!("{:016X}", self.key_id))
            .finish_non_exhaustive()
    }
}

/// A freshly generated key with its secret material in the clear
pub struct KeyPair {
    public: PublicKey,
    secret: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Generates a new key of the given algorithm
    ///
    /// The pqcrypto backends draw from their own system CSPRNG.
    pub fn generate(algorithm: PublicKeyAlgorithm, is_master: bool) -> Self {
        let (public_bytes, secret) = match algorithm {
            PublicKeyAlgorithm::Mlkem1024 => {
                let (pk, sk) = mlkem1024::keypair();
                (
                    KemPublicKey::as_bytes(&pk).to_vec(),
                    Zeroizing::new(KemSecretKey::as_bytes(&sk).to_vec()),
                )
            }
            PublicKeyAlgorithm::Mldsa87 => {
                let (pk, sk) = mldsa87::keypair();
                (
                    SignPublicKey::as_bytes(&pk).to_vec(),
                    Zeroizing::new(SignSecretKey::as_bytes(&sk).to_vec()),
                )
            }
        };

        let packet = PublicKeyPacket::new(algorithm, now_timestamp(), public_bytes);
        Self {
            public: PublicKey::from_packet(packet, is_master),
            secret,
        }
    }

    /// Returns the public key component
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the key's unique identifier
    pub fn key_id(&self) -> u64 {
        self.public.key_id()
    }

    /// Checks that the key id matches the public material
    pub fn is_valid(&self) -> bool {
        crate::crypto::key_ids_equal(
            self.public.key_id(),
            generate_key_id(
                self.public.as_bytes(),
                self.public.algorithm(),
                self.public.created(),
            ),
        ) && self.secret.len() == self.public.algorithm().secret_key_size()
    }

    /// Convert into a secret key, sealing the material when a passphrase is given
    pub fn into_secret_key<R: CryptoRng + RngCore>(
        self,
        passphrase: Option<&Passphrase>,
        params: S2kParams,
        rng: &mut R,
    ) -> Result<SecretKey> {
        let protection = match passphrase {
            Some(passphrase) => {
                let aad = self.public.packet().to_bytes();
                KeyProtection::lock(&self.secret, passphrase, params, &aad, rng)?
            }
            None => KeyProtection::unprotected(self.secret),
        };
        Ok(SecretKey {
            public: self.public,
            protection,
        })
    }
}

impl fmt::Display for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyPair({}, ID: {:016X})",
            self.public.algorithm(),
            self.key_id()
        )
    }
}
