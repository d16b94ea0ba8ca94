//! Encryption key selection.

use crate::crypto::PublicKey;
use crate::error::{PgpError, Result};
use crate::keyring::{KeyRingBundle, PublicKeyRingBundle, SecretKeyRingBundle};
use tracing::debug;

/// Pick the key to encrypt to.
///
/// Rings are scanned in order. The first encryption-capable subkey wins;
/// the first encryption-capable master key is used only when no subkey
/// qualifies.
pub fn select_encryption_key<B: KeyRingBundle + ?Sized>(bundle: &B) -> Result<PublicKey> {
    let mut master = None;
    let mut subkey = None;

    for key in bundle.public_keys() {
        if !key.can_encrypt() {
            continue;
        }
        if key.is_master() {
            master.get_or_insert(key);
        } else {
            subkey.get_or_insert(key);
            break;
        }
    }

    let selected = subkey
        .or(master)
        .ok_or_else(|| PgpError::no_encryption_key("No key in the key ring can encrypt"))?;
    debug!(
        key_id = %format!("{:016X}", selected.key_id()),
        is_master = selected.is_master(),
        algorithm = %selected.algorithm(),
        "Selected encryption key"
    );
    Ok(selected.clone())
}

/// Select the encryption key from key ring bytes.
///
/// The bytes are parsed as a public key ring first and as a secret key ring
/// only if that fails. Selection runs on whichever parse succeeded; when
/// both fail the secret ring error is returned.
pub fn resolve_recipient_key(data: &[u8]) -> Result<PublicKey> {
    match PublicKeyRingBundle::from_bytes(data) {
        Ok(bundle) => select_encryption_key(&bundle),
        Err(public_err) => {
            debug!(error = %public_err, "Not a public key ring, trying secret key ring");
            let bundle = SecretKeyRingBundle::from_bytes(data)?;
            select_encryption_key(&bundle)
        }
    }
}
