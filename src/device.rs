//! The secure element seen from the host.
//!
//! `SecureElement` is the contract the recovery protocol consumes. One value
//! of a type implementing it is one device session: every method takes
//! `&mut self`, so calls against a session are serialised by the borrow
//! checker rather than by a lock. Blocking, timeouts and retries belong to the
//! implementation's transport.

use crate::error::KdfWrapError;
use crate::keys::{DerivationNonce, EncryptedDerivationResult, HOST_NONCE_LEN};
use crate::mode::KdfMode;

/// Number of data slots on the device.
pub const SLOT_COUNT: u16 = 16;

/// Size of one data slot in bytes.
pub const SLOT_LEN: usize = 32;

/// Length of the caller-supplied KDF message.
pub const MESSAGE_LEN: usize = 16;

/// Addressable data slot.
pub type SlotId = u16;

/// What the device returns from an encrypted-output KDF call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfOutput {
    pub encrypted_result: EncryptedDerivationResult,
    pub nonce: DerivationNonce,
}

/// Operations a host needs from a secure element.
pub trait SecureElement {
    /// Run the device-internal KDF.
    ///
    /// `message` is caller-chosen input; `details` carries algorithm-specific
    /// parameters. Fails with `KdfWrapError::Device` on any non-success
    /// status.
    fn derive_key(
        &mut self,
        mode: KdfMode,
        source_slot: SlotId,
        details: u32,
        message: &[u8; MESSAGE_LEN],
    ) -> Result<KdfOutput, KdfWrapError>;

    /// Plain-text write of a full slot.
    fn write_slot(&mut self, slot: SlotId, data: &[u8; SLOT_LEN]) -> Result<(), KdfWrapError>;

    /// Write a slot whose payload the host masked under the I/O protection
    /// key held in `io_slot`, using `host_nonce` as the mask nonce.
    fn write_encrypted(
        &mut self,
        slot: SlotId,
        masked: &[u8; SLOT_LEN],
        io_slot: SlotId,
        host_nonce: &[u8; HOST_NONCE_LEN],
    ) -> Result<(), KdfWrapError>;

    /// Permanently lock a slot against further writes.
    fn lock_slot(&mut self, slot: SlotId) -> Result<(), KdfWrapError>;
}
