//! Key ring generation for fixtures and benchmarks.

use crate::crypto::{KeyPair, Passphrase, PublicKeyAlgorithm, S2kParams};
use crate::error::Result;
use crate::keyring::{PublicKeyRing, SecretKeyRing};
use crate::validation::Validator;
use rand::rngs::OsRng;
use tracing::info;

/// Matching secret and public rings from one generation run
#[derive(Debug)]
pub struct GeneratedKeyRing {
    /// Secret ring, locked with the builder's passphrase if one was set
    pub secret: SecretKeyRing,
    /// Public halves of the same keys
    pub public: PublicKeyRing,
}

/// Builder for a fresh key ring
#[derive(Debug)]
pub struct KeyRingBuilder {
    user_ids: Vec<String>,
    master: PublicKeyAlgorithm,
    subkeys: Vec<PublicKeyAlgorithm>,
    passphrase: Option<Passphrase>,
    s2k: S2kParams,
}

impl KeyRingBuilder {
    /// Start a ring with an ML-DSA-87 master key and no subkeys
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_ids: vec![user_id.into()],
            master: PublicKeyAlgorithm::Mldsa87,
            subkeys: Vec::new(),
            passphrase: None,
            s2k: S2kParams::default(),
        }
    }

    /// Attach another user id
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_ids.push(user_id.into());
        self
    }

    /// Algorithm of the master key
    pub fn master_algorithm(mut self, algorithm: PublicKeyAlgorithm) -> Self {
        self.master = algorithm;
        self
    }

    /// Add a subkey
    pub fn subkey(mut self, algorithm: PublicKeyAlgorithm) -> Self {
        self.subkeys.push(algorithm);
        self
    }

    /// Lock every secret key with this passphrase
    pub fn passphrase(mut self, passphrase: Passphrase) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    /// Argon2id cost for the passphrase lock
    pub fn s2k_params(mut self, params: S2kParams) -> Self {
        self.s2k = params;
        self
    }

    /// Generate the keys
    pub fn build(self) -> Result<GeneratedKeyRing> {
        for user_id in &self.user_ids {
            Validator::validate_user_id(user_id)?;
        }

        let mut rng = OsRng;
        let passphrase = self.passphrase.as_ref();
        let mut keys = Vec::with_capacity(1 + self.subkeys.len());
        keys.push(KeyPair::generate(self.master, true).into_secret_key(passphrase, self.s2k, &mut rng)?);
        for &algorithm in &self.subkeys {
            keys.push(KeyPair::generate(algorithm, false).into_secret_key(passphrase, self.s2k, &mut rng)?);
        }

        let secret = SecretKeyRing::from_keys(keys, self.user_ids)?;
        let public = secret.to_public_ring();
        info!(
            key_id = %format!("{:016X}", secret.key_id()),
            subkeys = self.subkeys.len(),
            protected = passphrase.is_some(),
            "Generated key ring"
        );
        Ok(GeneratedKeyRing { secret, public })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_shapes_ring() {
        let generated = KeyRingBuilder::new("Alice <alice@example.com>")
            .user_id("alice@work.example")
            .subkey(PublicKeyAlgorithm::Mlkem1024)
            .build()
            .unwrap();

        assert_eq!(generated.secret.keys().len(), 2);
        assert_eq!(generated.public.user_ids().len(), 2);
        assert_eq!(generated.public.master_key().algorithm(), PublicKeyAlgorithm::Mldsa87);
        assert!(generated.public.subkeys()[0].can_encrypt());
        assert!(!generated.secret.master_key().is_protected());
    }

    #[test]
    fn test_passphrase_protects_all_keys() {
        let generated = KeyRingBuilder::new("bob")
            .subkey(PublicKeyAlgorithm::Mlkem1024)
            .passphrase(Passphrase::new("pw"))
            .s2k_params(S2kParams::new(1, 1, 10).unwrap())
            .build()
            .unwrap();

        assert!(generated.secret.keys().iter().all(|k| k.is_protected()));
    }

    #[test]
    fn test_invalid_user_id_rejected() {
        assert!(KeyRingBuilder::new("").build().is_err());
    }
}
