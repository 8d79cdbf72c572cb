//! Data model for one recovery exchange.
//!
//! Every buffer that crosses the host/element boundary has a fixed length and
//! a dedicated type. Constructors from slices reject any length mismatch with
//! `InvalidInputLength` instead of truncating or padding.
//!
//! Secret-bearing types (`SharedProtectionSecret`, `SessionMask`,
//! `DerivedAesKey`) are zeroised on drop and redact themselves in `Debug`.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KdfWrapError;

/// Length of the shared I/O protection secret.
pub const SECRET_LEN: usize = 32;

/// Length of the nonce returned by the device.
pub const NONCE_LEN: usize = 32;

/// Number of leading nonce bytes that feed the session mask.
pub const NONCE_MASK_LEN: usize = 16;

/// Length of the encrypted KDF result returned by the device.
pub const RESULT_LEN: usize = 32;

/// Length of the recovered AES key.
pub const AES_KEY_LEN: usize = 16;

/// Length of the host nonce used for encrypted provisioning writes.
pub const HOST_NONCE_LEN: usize = 20;

/// Copy `bytes` into a fixed array, or report which input had the wrong size.
pub(crate) fn fixed<const N: usize>(
    field: &'static str,
    bytes: &[u8],
) -> Result<[u8; N], KdfWrapError> {
    bytes
        .try_into()
        .map_err(|_| KdfWrapError::InvalidInputLength {
            field,
            expected: N,
            actual: bytes.len(),
        })
}

// ---------------------------------------------------------------------------
// Shared protection secret
// ---------------------------------------------------------------------------

/// The I/O protection secret known to both the host and the secure element.
///
/// - Not `Clone`. The owner lends it by reference for the duration of a call.
/// - Zeroised on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedProtectionSecret {
    bytes: [u8; SECRET_LEN],
}

impl SharedProtectionSecret {
    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KdfWrapError> {
        Ok(Self::from_bytes(fixed("shared_secret", bytes)?))
    }

    /// Raw bytes; needed to provision the protection slot.
    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for SharedProtectionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedProtectionSecret([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Nonce and encrypted result (public on the bus)
// ---------------------------------------------------------------------------

/// The nonce the device generated for one KDF invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationNonce {
    bytes: [u8; NONCE_LEN],
}

impl DerivationNonce {
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KdfWrapError> {
        Ok(Self::from_bytes(fixed("nonce", bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.bytes
    }

    /// The leading bytes that take part in the session mask.
    pub fn mask_input(&self) -> &[u8] {
        &self.bytes[..NONCE_MASK_LEN]
    }
}

/// The KDF output as it travels on the bus, masked under a session pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedDerivationResult {
    bytes: [u8; RESULT_LEN],
}

impl EncryptedDerivationResult {
    pub fn from_bytes(bytes: [u8; RESULT_LEN]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KdfWrapError> {
        Ok(Self::from_bytes(fixed("encrypted_result", bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; RESULT_LEN] {
        &self.bytes
    }
}

// ---------------------------------------------------------------------------
// Session mask
// ---------------------------------------------------------------------------

/// The one-time pad for a single exchange. Never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionMask {
    bytes: [u8; RESULT_LEN],
}

impl SessionMask {
    pub(crate) fn from_bytes(bytes: [u8; RESULT_LEN]) -> Self {
        Self { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; RESULT_LEN] {
        &self.bytes
    }
}

impl PartialEq for SessionMask {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl fmt::Debug for SessionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionMask([REDACTED])")
    }
}

// ---------------------------------------------------------------------------
// Derived key
// ---------------------------------------------------------------------------

/// The recovered AES-128 key.
///
/// Zeroised on drop. Equality is byte equality; `Debug` redacts.
#[derive(Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct DerivedAesKey {
    bytes: [u8; AES_KEY_LEN],
}

impl DerivedAesKey {
    pub(crate) fn from_bytes(bytes: [u8; AES_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Borrow the key for use with a host-side cipher.
    pub fn as_bytes(&self) -> &[u8; AES_KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DerivedAesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedAesKey([REDACTED])")
    }
}
