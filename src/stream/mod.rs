//! Sequential decoding of packets into higher-level objects.
//!
//! [`ObjectStream`] reads packets one at a time and groups the ones that
//! belong together: session key entries with the encrypted data packet that
//! follows them, runs of signatures, and key packets with their user ids and
//! subkeys. The sequence is lazy, finite and cannot be restarted.

use crate::compression::CompressionAlgorithm;
use crate::error::{PgpError, Result};
use crate::keyring::{PublicKeyRing, SecretKeyRing};
use crate::packet::{
    CompressedDataPacket, LiteralDataPacket, OnePassSignaturePacket, Packet, PacketReader,
    PacketTag, PkeskPacket, PublicKeyPacket, SecretKeyPacket, SeipdPacket, UserIdPacket,
};
use crate::validation::MAX_SESSION_KEY_ENTRIES;
use std::iter::Peekable;

/// One entry of an encrypted data list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedSessionKey {
    /// Session key wrapped for a public key
    PublicKey(PkeskPacket),
    /// Passphrase-encrypted session key (kept raw, never used)
    Passphrase(Packet),
}

/// Session key entries and the data packet they unlock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedDataList {
    /// Entries in message order
    pub entries: Vec<EncryptedSessionKey>,
    /// The encrypted data packet
    pub data: SeipdPacket,
}

impl EncryptedDataList {
    /// Key ids of the public-key entries, in message order
    pub fn recipient_key_ids(&self) -> Vec<u64> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                EncryptedSessionKey::PublicKey(pkesk) => Some(pkesk.key_id),
                EncryptedSessionKey::Passphrase(_) => None,
            })
            .collect()
    }
}

/// A run of signature-related packets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureList {
    /// One-pass signature headers preceding signed data
    OnePass(Vec<OnePassSignaturePacket>),
    /// Signature packets (kept raw, never verified)
    Signatures(Vec<Packet>),
}

/// A decoded top-level object
#[derive(Debug)]
pub enum PgpObject {
    /// Marker packet
    Marker,
    /// Session key entries followed by encrypted data
    EncryptedDataList(EncryptedDataList),
    /// Compressed container
    Compressed(CompressedDataPacket),
    /// Literal payload
    Literal(LiteralDataPacket),
    /// One-pass signatures or signatures
    SignatureList(SignatureList),
    /// Public key with its user ids and subkeys
    PublicKeyRing(PublicKeyRing),
    /// Secret key with its user ids and subkeys
    SecretKeyRing(SecretKeyRing),
    /// Any packet without a grouping rule
    Unknown {
        /// Packet tag
        tag: PacketTag,
        /// Raw body
        body: Vec<u8>,
    },
}

impl PgpObject {
    /// Short description for diagnostics
    pub fn kind(&self) -> String {
        match self {
            PgpObject::Marker => "marker".to_string(),
            PgpObject::EncryptedDataList(_) => "encrypted data list".to_string(),
            PgpObject::Compressed(c) => format!("compressed data ({})", c.algorithm),
            PgpObject::Literal(_) => "literal data".to_string(),
            PgpObject::SignatureList(SignatureList::OnePass(_)) => {
                "one-pass signature list".to_string()
            }
            PgpObject::SignatureList(SignatureList::Signatures(_)) => {
                "signature list".to_string()
            }
            PgpObject::PublicKeyRing(_) => "public key ring".to_string(),
            PgpObject::SecretKeyRing(_) => "secret key ring".to_string(),
            PgpObject::Unknown { tag, .. } => format!("packet tag {}", tag.to_byte()),
        }
    }
}

/// Lazy decoder from bytes to [`PgpObject`]s
pub struct ObjectStream<'a> {
    packets: Peekable<PacketReader<'a>>,
    failed: bool,
}

impl<'a> ObjectStream<'a> {
    /// Decode objects from binary packet data
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            packets: PacketReader::new(data).peekable(),
            failed: false,
        }
    }

    /// Decode the next object, or `None` at end of input
    pub fn next_object(&mut self) -> Result<Option<PgpObject>> {
        let packet = match self.packets.next() {
            None => return Ok(None),
            Some(packet) => packet?,
        };

        let object = match packet.tag() {
            PacketTag::Marker => PgpObject::Marker,
            PacketTag::PublicKeyEncryptedSessionKey
            | PacketTag::SymmetricKeyEncryptedSessionKey => {
                let first = session_key_entry(packet)?;
                PgpObject::EncryptedDataList(self.read_encrypted_list(vec![first])?)
            }
            PacketTag::SymEncryptedIntegrityProtectedData
            | PacketTag::SymmetricallyEncryptedData => {
                PgpObject::EncryptedDataList(EncryptedDataList {
                    entries: Vec::new(),
                    data: data_packet(packet)?,
                })
            }
            PacketTag::CompressedData => {
                PgpObject::Compressed(CompressedDataPacket::from_bytes(&packet.body)?)
            }
            PacketTag::LiteralData => {
                PgpObject::Literal(LiteralDataPacket::from_bytes(&packet.body)?)
            }
            PacketTag::OnePassSignature => {
                let mut list = vec![OnePassSignaturePacket::from_bytes(&packet.body)?];
                while let Some(next) = self.take_if(|tag| tag == PacketTag::OnePassSignature) {
                    list.push(OnePassSignaturePacket::from_bytes(&next.body)?);
                }
                PgpObject::SignatureList(SignatureList::OnePass(list))
            }
            PacketTag::Signature => {
                let mut list = vec![packet];
                while let Some(next) = self.take_if(|tag| tag == PacketTag::Signature) {
                    list.push(next);
                }
                PgpObject::SignatureList(SignatureList::Signatures(list))
            }
            PacketTag::PublicKey => PgpObject::PublicKeyRing(self.read_public_ring(packet)?),
            PacketTag::SecretKey => PgpObject::SecretKeyRing(self.read_secret_ring(packet)?),
            PacketTag::SecretSubkey
            | PacketTag::PublicSubkey
            | PacketTag::Trust
            | PacketTag::UserId
            | PacketTag::UserAttribute
            | PacketTag::ModificationDetectionCode
            | PacketTag::Other(_) => PgpObject::Unknown {
                tag: packet.tag(),
                body: packet.body,
            },
        };
        Ok(Some(object))
    }

    /// Consume the next packet only if its tag is accepted
    fn take_if(&mut self, accept: impl Fn(PacketTag) -> bool) -> Option<Packet> {
        self.packets
            .next_if(|item| matches!(item, Ok(packet) if accept(packet.tag())))
            .and_then(Result::ok)
    }

    fn read_encrypted_list(&mut self, mut entries: Vec<EncryptedSessionKey>) -> Result<EncryptedDataList> {
        while let Some(packet) = self.take_if(|tag| {
            matches!(
                tag,
                PacketTag::PublicKeyEncryptedSessionKey
                    | PacketTag::SymmetricKeyEncryptedSessionKey
            )
        }) {
            entries.push(session_key_entry(packet)?);
            if entries.len() > MAX_SESSION_KEY_ENTRIES {
                return Err(PgpError::corrupt_stream(format!(
                    "More than {} session key entries",
                    MAX_SESSION_KEY_ENTRIES
                )));
            }
        }

        match self.packets.next() {
            Some(Ok(packet))
                if matches!(
                    packet.tag(),
                    PacketTag::SymEncryptedIntegrityProtectedData
                        | PacketTag::SymmetricallyEncryptedData
                ) =>
            {
                Ok(EncryptedDataList {
                    entries,
                    data: data_packet(packet)?,
                })
            }
            Some(Ok(packet)) => Err(PgpError::corrupt_stream(format!(
                "Session key entries followed by packet tag {} instead of encrypted data",
                packet.tag().to_byte()
            ))),
            Some(Err(e)) => Err(e),
            None => Err(PgpError::corrupt_stream(
                "Session key entries not followed by encrypted data",
            )),
        }
    }

    fn read_public_ring(&mut self, master: Packet) -> Result<PublicKeyRing> {
        let master = PublicKeyPacket::from_bytes(&master.body)?;
        let mut subkeys = Vec::new();
        let mut user_ids = Vec::new();

        while let Some(packet) = self.take_if(|tag| {
            matches!(
                tag,
                PacketTag::UserId
                    | PacketTag::UserAttribute
                    | PacketTag::Signature
                    | PacketTag::Trust
                    | PacketTag::PublicSubkey
            )
        }) {
            match packet.tag() {
                PacketTag::UserId => user_ids.push(UserIdPacket::from_bytes(&packet.body)?.user_id),
                PacketTag::PublicSubkey => subkeys.push(PublicKeyPacket::from_bytes(&packet.body)?),
                // Certifications, attributes and trust ride along uninterpreted
                _ => {}
            }
        }

        PublicKeyRing::from_packets(master, subkeys, user_ids)
    }

    fn read_secret_ring(&mut self, master: Packet) -> Result<SecretKeyRing> {
        let master = SecretKeyPacket::from_bytes(&master.body)?;
        let mut subkeys = Vec::new();
        let mut user_ids = Vec::new();

        while let Some(packet) = self.take_if(|tag| {
            matches!(
                tag,
                PacketTag::UserId
                    | PacketTag::UserAttribute
                    | PacketTag::Signature
                    | PacketTag::Trust
                    | PacketTag::SecretSubkey
            )
        }) {
            match packet.tag() {
                PacketTag::UserId => user_ids.push(UserIdPacket::from_bytes(&packet.body)?.user_id),
                PacketTag::SecretSubkey => subkeys.push(SecretKeyPacket::from_bytes(&packet.body)?),
                _ => {}
            }
        }

        SecretKeyRing::from_packets(master, subkeys, user_ids)
    }
}

impl Iterator for ObjectStream<'_> {
    type Item = Result<PgpObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_object() {
            Ok(object) => object.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn session_key_entry(packet: Packet) -> Result<EncryptedSessionKey> {
    match packet.tag() {
        PacketTag::PublicKeyEncryptedSessionKey => Ok(EncryptedSessionKey::PublicKey(
            PkeskPacket::from_bytes(&packet.body)?,
        )),
        _ => Ok(EncryptedSessionKey::Passphrase(packet)),
    }
}

fn data_packet(packet: Packet) -> Result<SeipdPacket> {
    if packet.tag() == PacketTag::SymmetricallyEncryptedData {
        return Err(PgpError::unsupported_content(
            "Encrypted data without integrity protection is not supported",
        ));
    }
    SeipdPacket::from_bytes(&packet.body)
}

/// Compressed container around one literal payload, as produced by the encryptor
pub fn literal_in_container(
    algorithm: CompressionAlgorithm,
    literal: &LiteralDataPacket,
) -> Result<Packet> {
    let literal_packet = Packet::new(PacketTag::LiteralData, literal.to_bytes());
    let compressed = crate::compression::compress(algorithm, &literal_packet.to_bytes())?;
    Ok(Packet::new(
        PacketTag::CompressedData,
        CompressedDataPacket::new(algorithm, compressed).to_bytes(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AeadAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};

    fn seipd() -> Packet {
        let data = SeipdPacket {
            cipher: SymmetricAlgorithm::Aes256,
            aead: AeadAlgorithm::Gcm,
            chunk_size_octet: 12,
            salt: [0; 32],
            encrypted: vec![0; 16],
        };
        Packet::new(PacketTag::SymEncryptedIntegrityProtectedData, data.to_bytes())
    }

    fn pkesk(key_id: u64) -> Packet {
        let entry = PkeskPacket {
            key_id,
            algorithm: PublicKeyAlgorithm::Mlkem1024,
            kem_ciphertext: vec![1; 8],
            wrapped_key: vec![2; 8],
        };
        Packet::new(PacketTag::PublicKeyEncryptedSessionKey, entry.to_bytes())
    }

    fn concat(packets: &[Packet]) -> Vec<u8> {
        packets.iter().flat_map(Packet::to_bytes).collect()
    }

    #[test]
    fn test_groups_session_keys_with_data() {
        let data = concat(&[Packet::marker(), pkesk(1), pkesk(2), seipd()]);
        let mut stream = ObjectStream::new(&data);

        assert!(matches!(stream.next_object().unwrap(), Some(PgpObject::Marker)));
        match stream.next_object().unwrap() {
            Some(PgpObject::EncryptedDataList(list)) => {
                assert_eq!(list.recipient_key_ids(), vec![1, 2]);
            }
            other => panic!("unexpected object: {:?}", other),
        }
        assert!(stream.next_object().unwrap().is_none());
    }

    #[test]
    fn test_session_keys_without_data_is_corrupt() {
        let data = concat(&[pkesk(1)]);
        assert!(matches!(
            ObjectStream::new(&data).next_object(),
            Err(PgpError::CorruptStream(_))
        ));

        let literal = LiteralDataPacket::binary("", 0, vec![]);
        let data = concat(&[pkesk(1), Packet::new(PacketTag::LiteralData, literal.to_bytes())]);
        assert!(matches!(
            ObjectStream::new(&data).next_object(),
            Err(PgpError::CorruptStream(_))
        ));
    }

    #[test]
    fn test_legacy_data_packet_unsupported() {
        let data = concat(&[
            pkesk(1),
            Packet::new(PacketTag::SymmetricallyEncryptedData, vec![0; 20]),
        ]);
        assert!(matches!(
            ObjectStream::new(&data).next_object(),
            Err(PgpError::UnsupportedContent(_))
        ));
    }

    #[test]
    fn test_signature_runs_grouped() {
        let ops = OnePassSignaturePacket {
            signature_type: 0,
            hash_algorithm: 10,
            public_key_algorithm: 101,
            key_id: 7,
            last: true,
        };
        let data = concat(&[
            Packet::new(PacketTag::OnePassSignature, ops.to_bytes()),
            Packet::new(PacketTag::OnePassSignature, ops.to_bytes()),
            Packet::new(PacketTag::LiteralData, LiteralDataPacket::binary("", 0, vec![1]).to_bytes()),
            Packet::new(PacketTag::Signature, vec![4, 0]),
        ]);
        let objects: Vec<PgpObject> = ObjectStream::new(&data).map(Result::unwrap).collect();

        assert_eq!(objects.len(), 3);
        assert!(matches!(&objects[0], PgpObject::SignatureList(SignatureList::OnePass(l)) if l.len() == 2));
        assert!(matches!(&objects[1], PgpObject::Literal(_)));
        assert!(matches!(&objects[2], PgpObject::SignatureList(SignatureList::Signatures(l)) if l.len() == 1));
    }

    #[test]
    fn test_container_holds_literal() {
        let literal = LiteralDataPacket::binary("f", 1, b"hello".to_vec());
        let packet = literal_in_container(CompressionAlgorithm::Zip, &literal).unwrap();
        let data = packet.to_bytes();

        match ObjectStream::new(&data).next_object().unwrap() {
            Some(PgpObject::Compressed(c)) => assert_eq!(c.algorithm, CompressionAlgorithm::Zip),
            other => panic!("unexpected object: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_and_errors_fuse() {
        let mut data = concat(&[Packet::new(PacketTag::Other(60), vec![1, 2])]);
        data.push(0x3F);
        let mut stream = ObjectStream::new(&data);

        assert!(matches!(
            stream.next(),
            Some(Ok(PgpObject::Unknown { tag: PacketTag::Other(60), .. }))
        ));
        assert!(matches!(stream.next(), Some(Err(_))));
        assert!(stream.next().is_none());
    }
}
