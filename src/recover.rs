//! Key unwrap engine.
//!
//! Recovers the AES key the secure element derived and returned masked:
//!
//! ```text
//! mask = SHA256( shared_secret (32) || nonce[..16] )
//! key  = ( encrypted_result XOR mask )[..16]
//! ```
//!
//! The element applies the same mask rule to its own KDF output before the
//! result leaves the chip, so the plaintext key never appears on the bus.
//!
//! There is no integrity check. A corrupted result, a wrong secret or a stale
//! nonce all yield a wrong key rather than an error; adding a MAC here would
//! change the contract with the device.
//!
//! Everything in this module is pure: no I/O, no shared state, safe to call
//! from any number of threads at once.

use zeroize::Zeroize;

use crate::crypto;
use crate::error::KdfWrapError;
use crate::keys::{
    DerivationNonce, DerivedAesKey, EncryptedDerivationResult, SessionMask,
    SharedProtectionSecret, AES_KEY_LEN, NONCE_MASK_LEN, SECRET_LEN,
};

/// Build the session mask for one exchange.
pub fn session_mask(secret: &SharedProtectionSecret, nonce: &DerivationNonce) -> SessionMask {
    mask_from_parts(secret, nonce.mask_input())
}

/// Mask construction over an arbitrary nonce prefix source.
///
/// `nonce_prefix` must be at least `NONCE_MASK_LEN` bytes; only that many are
/// used. Shared with the encrypted provisioning write, whose host nonce is
/// 20 bytes long.
pub(crate) fn mask_from_parts(secret: &SharedProtectionSecret, nonce_prefix: &[u8]) -> SessionMask {
    let mut buffer = [0u8; SECRET_LEN + NONCE_MASK_LEN];
    buffer[..SECRET_LEN].copy_from_slice(secret.as_bytes());
    buffer[SECRET_LEN..].copy_from_slice(&nonce_prefix[..NONCE_MASK_LEN]);

    let mask = SessionMask::from_bytes(crypto::sha256(&buffer));
    buffer.zeroize();
    mask
}

/// Recover the derived key from a typed exchange.
pub fn recover(
    secret: &SharedProtectionSecret,
    nonce: &DerivationNonce,
    encrypted: &EncryptedDerivationResult,
) -> DerivedAesKey {
    let mask = session_mask(secret, nonce);
    let mut unwrapped = crypto::xor(encrypted.as_bytes(), mask.as_bytes());

    let mut key = [0u8; AES_KEY_LEN];
    key.copy_from_slice(&unwrapped[..AES_KEY_LEN]);
    unwrapped.zeroize();

    DerivedAesKey::from_bytes(key)
}

/// Recover the derived key from raw buffers.
///
/// All three inputs must be exactly 32 bytes. Any mismatch is rejected with
/// `InvalidInputLength` before hashing.
pub fn recover_key(
    shared_secret: &[u8],
    nonce: &[u8],
    encrypted_result: &[u8],
) -> Result<DerivedAesKey, KdfWrapError> {
    let secret = SharedProtectionSecret::from_slice(shared_secret)?;
    let nonce = DerivationNonce::from_slice(nonce)?;
    let encrypted = EncryptedDerivationResult::from_slice(encrypted_result)?;
    Ok(recover(&secret, &nonce, &encrypted))
}

/// Apply a session mask to a 32-byte block. The element side of `recover`.
pub(crate) fn apply_mask(mask: &SessionMask, block: &[u8; 32]) -> [u8; 32] {
    crypto::xor(block, mask.as_bytes())
}
