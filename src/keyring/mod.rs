//! Key rings and key ring bundles.
//!
//! A ring is one master key plus its subkeys and user ids. A bundle is the
//! ordered list of rings read from one key ring file. Bundles are built once
//! from caller-supplied bytes and are read-only afterwards.

use crate::armor::{self, ArmorType};
use crate::crypto::{key_ids_equal, PublicKey, SecretKey};
use crate::error::{PgpError, Result};
use crate::packet::{Packet, PacketTag, PublicKeyPacket, SecretKeyPacket, UserIdPacket};
use crate::stream::{ObjectStream, PgpObject};
use crate::validation::Validator;
use std::collections::HashSet;
use std::io::Read;
use tracing::{debug, info};

pub mod builder;
pub mod selector;

pub use builder::{GeneratedKeyRing, KeyRingBuilder};
pub use selector::{resolve_recipient_key, select_encryption_key};

/// Read access to the public keys of a bundle, in ring order then key order
pub trait KeyRingBundle {
    /// All public keys, masters before their subkeys
    fn public_keys(&self) -> Box<dyn Iterator<Item = &PublicKey> + '_>;
}

fn check_unique(key_ids: impl Iterator<Item = u64>) -> Result<()> {
    let mut seen = HashSet::new();
    for key_id in key_ids {
        if !seen.insert(key_id) {
            return Err(PgpError::corrupt_key_ring(format!(
                "Duplicate key id {:016X} in ring",
                key_id
            )));
        }
    }
    Ok(())
}

fn user_id_packets(user_ids: &[String]) -> impl Iterator<Item = Packet> + '_ {
    user_ids
        .iter()
        .map(|uid| Packet::new(PacketTag::UserId, UserIdPacket::new(uid.as_str()).to_bytes()))
}

/// A public master key with its subkeys and user ids
#[derive(Debug, Clone)]
pub struct PublicKeyRing {
    keys: Vec<PublicKey>,
    user_ids: Vec<String>,
}

impl PublicKeyRing {
    /// Assemble a ring from parsed packets
    pub fn from_packets(
        master: PublicKeyPacket,
        subkeys: Vec<PublicKeyPacket>,
        user_ids: Vec<String>,
    ) -> Result<Self> {
        let keys = std::iter::once(PublicKey::from_packet(master, true))
            .chain(subkeys.into_iter().map(|p| PublicKey::from_packet(p, false)))
            .collect();
        Self::from_keys(keys, user_ids)
    }

    /// Assemble a ring from keys; the first key must be the master
    pub fn from_keys(keys: Vec<PublicKey>, user_ids: Vec<String>) -> Result<Self> {
        match keys.first() {
            Some(master) if master.is_master() => {}
            _ => return Err(PgpError::corrupt_key_ring("Key ring must start with a master key")),
        }
        if keys.iter().skip(1).any(PublicKey::is_master) {
            return Err(PgpError::corrupt_key_ring("Key ring has more than one master key"));
        }
        check_unique(keys.iter().map(PublicKey::key_id))?;
        Ok(Self { keys, user_ids })
    }

    /// The master key
    pub fn master_key(&self) -> &PublicKey {
        &self.keys[0]
    }

    /// Subkeys in ring order
    pub fn subkeys(&self) -> &[PublicKey] {
        &self.keys[1..]
    }

    /// All keys, master first
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// User ids attached to the master key
    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    /// Key id of the master key
    pub fn key_id(&self) -> u64 {
        self.master_key().key_id()
    }

    /// Find a key in this ring by id
    pub fn get_public_key(&self, key_id: u64) -> Option<&PublicKey> {
        self.keys.iter().find(|k| key_ids_equal(k.key_id(), key_id))
    }

    /// Packets in export order: master, user ids, subkeys
    pub fn to_packets(&self) -> Vec<Packet> {
        std::iter::once(self.master_key().to_packet())
            .chain(user_id_packets(&self.user_ids))
            .chain(self.subkeys().iter().map(PublicKey::to_packet))
            .collect()
    }

    /// Binary export
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_packets().iter().flat_map(Packet::to_bytes).collect()
    }

    /// Armored export
    pub fn to_armored(&self) -> String {
        armor::encode(&self.to_bytes(), ArmorType::PublicKey)
    }
}

/// A secret master key with its secret subkeys and user ids
#[derive(Debug)]
pub struct SecretKeyRing {
    keys: Vec<SecretKey>,
    user_ids: Vec<String>,
}

impl SecretKeyRing {
    /// Assemble a ring from parsed packets
    pub fn from_packets(
        master: SecretKeyPacket,
        subkeys: Vec<SecretKeyPacket>,
        user_ids: Vec<String>,
    ) -> Result<Self> {
        let keys = std::iter::once(SecretKey::from_packet(master, true))
            .chain(subkeys.into_iter().map(|p| SecretKey::from_packet(p, false)))
            .collect();
        Self::from_keys(keys, user_ids)
    }

    /// Assemble a ring from keys; the first key must be the master
    pub fn from_keys(keys: Vec<SecretKey>, user_ids: Vec<String>) -> Result<Self> {
        match keys.first() {
            Some(master) if master.is_master() => {}
            _ => return Err(PgpError::corrupt_key_ring("Key ring must start with a master key")),
        }
        if keys.iter().skip(1).any(SecretKey::is_master) {
            return Err(PgpError::corrupt_key_ring("Key ring has more than one master key"));
        }
        check_unique(keys.iter().map(SecretKey::key_id))?;
        Ok(Self { keys, user_ids })
    }

    /// The master key
    pub fn master_key(&self) -> &SecretKey {
        &self.keys[0]
    }

    /// All keys, master first
    pub fn keys(&self) -> &[SecretKey] {
        &self.keys
    }

    /// User ids attached to the master key
    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    /// Key id of the master key
    pub fn key_id(&self) -> u64 {
        self.master_key().key_id()
    }

    /// Find a secret key in this ring by id
    pub fn get_secret_key(&self, key_id: u64) -> Option<&SecretKey> {
        self.keys.iter().find(|k| key_ids_equal(k.key_id(), key_id))
    }

    /// Public halves of this ring as a public ring
    pub fn to_public_ring(&self) -> PublicKeyRing {
        PublicKeyRing {
            keys: self.keys.iter().map(|k| k.public_key().clone()).collect(),
            user_ids: self.user_ids.clone(),
        }
    }

    /// Packets in export order: master, user ids, subkeys
    pub fn to_packets(&self) -> Vec<Packet> {
        std::iter::once(self.master_key().to_packet())
            .chain(user_id_packets(&self.user_ids))
            .chain(self.keys[1..].iter().map(SecretKey::to_packet))
            .collect()
    }

    /// Binary export
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_packets().iter().flat_map(Packet::to_bytes).collect()
    }

    /// Armored export
    pub fn to_armored(&self) -> String {
        armor::encode(&self.to_bytes(), ArmorType::PrivateKey)
    }
}

/// Walk decoded objects and keep the rings `accept` yields
fn collect_rings<T>(
    data: &[u8],
    mut accept: impl FnMut(PgpObject) -> Result<Option<T>>,
) -> Result<Vec<T>> {
    let data = armor::decoder_stream(data)?;
    let mut rings = Vec::new();
    for object in ObjectStream::new(&data) {
        if let Some(ring) = accept(object?)? {
            rings.push(ring);
            Validator::validate_keyring_size(rings.len())?;
        }
    }
    Ok(rings)
}

fn unexpected(object: &PgpObject, expected: &str) -> PgpError {
    PgpError::corrupt_key_ring(format!(
        "Found {} where a {} was expected",
        object.kind(),
        expected
    ))
}

/// All public key rings read from one source
#[derive(Debug, Clone, Default)]
pub struct PublicKeyRingBundle {
    rings: Vec<PublicKeyRing>,
}

impl PublicKeyRingBundle {
    /// Build a bundle, rejecting repeated master keys
    pub fn new(rings: Vec<PublicKeyRing>) -> Result<Self> {
        check_unique(rings.iter().map(PublicKeyRing::key_id))?;
        Ok(Self { rings })
    }

    /// Parse binary or armored key ring data
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let bundle = collect_rings(data, |object| match object {
            PgpObject::PublicKeyRing(ring) => Ok(Some(ring)),
            PgpObject::Marker => Ok(None),
            other @ (PgpObject::SecretKeyRing(_)
            | PgpObject::EncryptedDataList(_)
            | PgpObject::Compressed(_)
            | PgpObject::Literal(_)
            | PgpObject::SignatureList(_)
            | PgpObject::Unknown { .. }) => Err(unexpected(&other, "public key ring")),
        })
        .and_then(Self::new)
        .map_err(PgpError::in_keyring_context)?;

        debug!(rings = bundle.len(), "Loaded public key ring bundle");
        Ok(bundle)
    }

    /// Rings in source order
    pub fn rings(&self) -> &[PublicKeyRing] {
        &self.rings
    }

    /// Number of rings
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    /// True when no rings were read
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Find any key by id
    pub fn get_public_key(&self, key_id: u64) -> Option<&PublicKey> {
        self.rings.iter().find_map(|ring| ring.get_public_key(key_id))
    }

    /// Find the ring containing a key id
    pub fn get_key_ring(&self, key_id: u64) -> Option<&PublicKeyRing> {
        self.rings
            .iter()
            .find(|ring| ring.get_public_key(key_id).is_some())
    }

    /// Binary export
    pub fn to_bytes(&self) -> Vec<u8> {
        self.rings.iter().flat_map(PublicKeyRing::to_bytes).collect()
    }

    /// Armored export
    pub fn to_armored(&self) -> String {
        armor::encode(&self.to_bytes(), ArmorType::PublicKey)
    }
}

impl KeyRingBundle for PublicKeyRingBundle {
    fn public_keys(&self) -> Box<dyn Iterator<Item = &PublicKey> + '_> {
        Box::new(self.rings.iter().flat_map(|ring| ring.keys().iter()))
    }
}

/// All secret key rings read from one source
#[derive(Debug, Default)]
pub struct SecretKeyRingBundle {
    rings: Vec<SecretKeyRing>,
}

impl SecretKeyRingBundle {
    /// Build a bundle, rejecting repeated master keys
    pub fn new(rings: Vec<SecretKeyRing>) -> Result<Self> {
        check_unique(rings.iter().map(SecretKeyRing::key_id))?;
        Ok(Self { rings })
    }

    /// Parse binary or armored key ring data
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let bundle = collect_rings(data, |object| match object {
            PgpObject::SecretKeyRing(ring) => Ok(Some(ring)),
            PgpObject::Marker => Ok(None),
            other @ (PgpObject::PublicKeyRing(_)
            | PgpObject::EncryptedDataList(_)
            | PgpObject::Compressed(_)
            | PgpObject::Literal(_)
            | PgpObject::SignatureList(_)
            | PgpObject::Unknown { .. }) => Err(unexpected(&other, "secret key ring")),
        })
        .and_then(Self::new)
        .map_err(PgpError::in_keyring_context)?;

        debug!(rings = bundle.len(), "Loaded secret key ring bundle");
        Ok(bundle)
    }

    /// Rings in source order
    pub fn rings(&self) -> &[SecretKeyRing] {
        &self.rings
    }

    /// Number of rings
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    /// True when no rings were read
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Find a secret key by id.
    ///
    /// Every key is compared so lookup time does not depend on the match position.
    pub fn get_secret_key(&self, key_id: u64) -> Option<&SecretKey> {
        let mut found = None;
        for key in self.rings.iter().flat_map(|ring| ring.keys().iter()) {
            if key_ids_equal(key.key_id(), key_id) && found.is_none() {
                found = Some(key);
            }
        }
        found
    }

    /// Public halves of every ring
    pub fn to_public_bundle(&self) -> PublicKeyRingBundle {
        PublicKeyRingBundle {
            rings: self.rings.iter().map(SecretKeyRing::to_public_ring).collect(),
        }
    }

    /// Binary export
    pub fn to_bytes(&self) -> Vec<u8> {
        self.rings.iter().flat_map(SecretKeyRing::to_bytes).collect()
    }

    /// Armored export
    pub fn to_armored(&self) -> String {
        armor::encode(&self.to_bytes(), ArmorType::PrivateKey)
    }
}

impl KeyRingBundle for SecretKeyRingBundle {
    fn public_keys(&self) -> Box<dyn Iterator<Item = &PublicKey> + '_> {
        Box::new(
            self.rings
                .iter()
                .flat_map(|ring| ring.keys().iter().map(SecretKey::public_key)),
        )
    }
}

/// Read a public key ring bundle from binary or armored input
pub fn load_public_key_ring<R: Read>(mut reader: R) -> Result<PublicKeyRingBundle> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let bundle = PublicKeyRingBundle::from_bytes(&data)?;
    info!(rings = bundle.len(), "Public key ring loaded");
    Ok(bundle)
}

/// Read a secret key ring bundle from binary or armored input
pub fn load_secret_key_ring<R: Read>(mut reader: R) -> Result<SecretKeyRingBundle> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    let bundle = SecretKeyRingBundle::from_bytes(&data)?;
    info!(rings = bundle.len(), "Secret key ring loaded");
    Ok(bundle)
}
