//! In-memory secure element.
//!
//! Behaves like a CryptoAuth-class device on the host side of the bus: it
//! holds slot contents the host cannot read back, runs its KDF internally and
//! only ever returns the result masked under the I/O protection key.
//!
//! The internal KDF is HMAC-SHA256 keyed by the source slot over a fixed
//! label and the `details` word. The caller's message is validated but takes
//! no part in the derivation, so one slot always yields one key.

use zeroize::Zeroize;

use crate::config::DeviceConfig;
use crate::crypto;
use crate::device::{KdfOutput, SecureElement, SlotId, MESSAGE_LEN, SLOT_COUNT, SLOT_LEN};
use crate::error::{DeviceStatus, KdfWrapError};
use crate::keys::{
    DerivationNonce, EncryptedDerivationResult, SharedProtectionSecret, AES_KEY_LEN,
    HOST_NONCE_LEN, NONCE_LEN, NONCE_MASK_LEN, RESULT_LEN,
};
use crate::mode::{KdfAlgorithm, KdfMode, KdfSource, KdfTarget};
use crate::recover;

/// Bus address the simulated device answers on.
pub const SIMULATED_ADDRESS: u8 = 0xC0;

/// Label mixed into the simulated AES-mode derivation.
const KDF_LABEL: &[u8] = b"kdfwrap/sim/aes-kdf";

#[derive(Default)]
struct Slot {
    data: Option<[u8; SLOT_LEN]>,
    locked: bool,
}

/// A simulated secure element session.
pub struct SimulatedElement {
    slots: Vec<Slot>,
    io_slot: SlotId,
}

impl SimulatedElement {
    /// Open a session with the device described by `config`.
    ///
    /// Fails with `Transport` if nothing answers at the configured address or
    /// the configured I/O protection slot does not exist.
    pub fn initialize(config: &DeviceConfig) -> Result<Self, KdfWrapError> {
        if config.address != SIMULATED_ADDRESS {
            tracing::error!(address = config.address, "no device answered");
            return Err(KdfWrapError::Transport(format!(
                "no device at address 0x{:02X}",
                config.address
            )));
        }
        if config.io_protection_slot >= SLOT_COUNT {
            return Err(KdfWrapError::Transport(format!(
                "io protection slot {} is not addressable",
                config.io_protection_slot
            )));
        }

        tracing::info!(
            address = config.address,
            io_slot = config.io_protection_slot,
            "secure element session opened"
        );
        Ok(Self {
            slots: (0..SLOT_COUNT).map(|_| Slot::default()).collect(),
            io_slot: config.io_protection_slot,
        })
    }

    /// Whether `slot` has been locked.
    pub fn is_locked(&self, slot: SlotId) -> bool {
        self.slots
            .get(slot as usize)
            .map(|s| s.locked)
            .unwrap_or(false)
    }

    fn slot(&self, slot: SlotId) -> Result<&Slot, KdfWrapError> {
        self.slots
            .get(slot as usize)
            .ok_or(KdfWrapError::Device(DeviceStatus::InvalidId))
    }

    fn writable_slot(&mut self, slot: SlotId) -> Result<&mut Slot, KdfWrapError> {
        let entry = self
            .slots
            .get_mut(slot as usize)
            .ok_or(KdfWrapError::Device(DeviceStatus::InvalidId))?;
        if entry.locked {
            tracing::warn!(slot, "write to locked slot refused");
            return Err(DeviceStatus::SlotLocked.into());
        }
        Ok(entry)
    }

    fn io_key(&self, io_slot: SlotId) -> Result<SharedProtectionSecret, KdfWrapError> {
        self.slot(io_slot)?
            .data
            .map(SharedProtectionSecret::from_bytes)
            .ok_or(KdfWrapError::Device(DeviceStatus::ExecutionError))
    }
}

impl SecureElement for SimulatedElement {
    fn derive_key(
        &mut self,
        mode: KdfMode,
        source_slot: SlotId,
        details: u32,
        _message: &[u8; MESSAGE_LEN],
    ) -> Result<KdfOutput, KdfWrapError> {
        tracing::debug!(mode = mode.bits(), source_slot, details, "kdf request");

        if mode.algorithm()? != KdfAlgorithm::Aes
            || mode.source() != KdfSource::Slot
            || mode.target()? != KdfTarget::OutputEnc
        {
            tracing::warn!(mode = mode.bits(), "unsupported kdf mode");
            return Err(DeviceStatus::BadParam.into());
        }
        let mut parent = self
            .slot(source_slot)?
            .data
            .ok_or(KdfWrapError::Device(DeviceStatus::InvalidId))?;
        let io_key = self.io_key(self.io_slot)?;

        let mut block = [0u8; RESULT_LEN];
        let mut digest = crypto::hmac_sha256(&parent, &[KDF_LABEL, &details.to_be_bytes()]);
        block[..AES_KEY_LEN].copy_from_slice(&digest[..AES_KEY_LEN]);
        digest.zeroize();
        parent.zeroize();

        let nonce: [u8; NONCE_LEN] = crypto::random_bytes()?;
        let mask = recover::mask_from_parts(&io_key, &nonce[..NONCE_MASK_LEN]);
        let encrypted = recover::apply_mask(&mask, &block);
        block.zeroize();

        Ok(KdfOutput {
            encrypted_result: EncryptedDerivationResult::from_bytes(encrypted),
            nonce: DerivationNonce::from_bytes(nonce),
        })
    }

    fn write_slot(&mut self, slot: SlotId, data: &[u8; SLOT_LEN]) -> Result<(), KdfWrapError> {
        self.writable_slot(slot)?.data = Some(*data);
        tracing::info!(slot, "slot written");
        Ok(())
    }

    fn write_encrypted(
        &mut self,
        slot: SlotId,
        masked: &[u8; SLOT_LEN],
        io_slot: SlotId,
        host_nonce: &[u8; HOST_NONCE_LEN],
    ) -> Result<(), KdfWrapError> {
        let io_key = self.io_key(io_slot)?;
        let mask = recover::mask_from_parts(&io_key, &host_nonce[..NONCE_MASK_LEN]);
        let plain = recover::apply_mask(&mask, masked);

        self.writable_slot(slot)?.data = Some(plain);
        tracing::info!(slot, io_slot, "encrypted slot write");
        Ok(())
    }

    fn lock_slot(&mut self, slot: SlotId) -> Result<(), KdfWrapError> {
        let entry = self
            .slots
            .get_mut(slot as usize)
            .ok_or(KdfWrapError::Device(DeviceStatus::InvalidId))?;
        entry.locked = true;
        tracing::info!(slot, "slot locked");
        Ok(())
    }
}

impl Drop for SimulatedElement {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(data) = slot.data.as_mut() {
                data.zeroize();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element() -> SimulatedElement {
        SimulatedElement::initialize(&DeviceConfig::default()).unwrap()
    }

    #[test]
    fn test_initialize_rejects_wrong_address() {
        let cfg = DeviceConfig {
            address: 0x6A,
            ..DeviceConfig::default()
        };
        assert!(matches!(
            SimulatedElement::initialize(&cfg),
            Err(KdfWrapError::Transport(_))
        ));
    }

    #[test]
    fn test_derive_requires_encrypted_output_mode() {
        let mut se = element();
        se.write_slot(6, &[1u8; SLOT_LEN]).unwrap();
        se.write_slot(5, &[2u8; SLOT_LEN]).unwrap();

        let plain_output = KdfMode(KdfMode::ALG_AES | KdfMode::SOURCE_SLOT | KdfMode::TARGET_OUTPUT);
        assert!(matches!(
            se.derive_key(plain_output, 5, 0, &[0; MESSAGE_LEN]),
            Err(KdfWrapError::Device(DeviceStatus::BadParam))
        ));
        assert!(se
            .derive_key(KdfMode::AES_SLOT_TO_ENCRYPTED_OUTPUT, 5, 0, &[0; MESSAGE_LEN])
            .is_ok());
    }

    #[test]
    fn test_derive_from_empty_slot_fails() {
        let mut se = element();
        se.write_slot(6, &[1u8; SLOT_LEN]).unwrap();
        assert!(matches!(
            se.derive_key(KdfMode::default(), 5, 0, &[0; MESSAGE_LEN]),
            Err(KdfWrapError::Device(DeviceStatus::InvalidId))
        ));
        assert!(matches!(
            se.derive_key(KdfMode::default(), SLOT_COUNT, 0, &[0; MESSAGE_LEN]),
            Err(KdfWrapError::Device(DeviceStatus::InvalidId))
        ));
    }

    #[test]
    fn test_derive_without_io_key_fails() {
        let mut se = element();
        se.write_slot(5, &[2u8; SLOT_LEN]).unwrap();
        assert!(matches!(
            se.derive_key(KdfMode::default(), 5, 0, &[0; MESSAGE_LEN]),
            Err(KdfWrapError::Device(DeviceStatus::ExecutionError))
        ));
    }

    #[test]
    fn test_locked_slot_refuses_writes() {
        let mut se = element();
        se.write_slot(6, &[1u8; SLOT_LEN]).unwrap();
        se.lock_slot(6).unwrap();
        assert!(se.is_locked(6));
        assert!(matches!(
            se.write_slot(6, &[3u8; SLOT_LEN]),
            Err(KdfWrapError::Device(DeviceStatus::SlotLocked))
        ));
        assert!(matches!(
            se.write_encrypted(6, &[3u8; SLOT_LEN], 6, &[0u8; HOST_NONCE_LEN]),
            Err(KdfWrapError::Device(DeviceStatus::SlotLocked))
        ));
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let mut se = element();
        se.write_slot(6, &[1u8; SLOT_LEN]).unwrap();
        se.write_slot(5, &[2u8; SLOT_LEN]).unwrap();
        let a = se.derive_key(KdfMode::default(), 5, 0, &[0; MESSAGE_LEN]).unwrap();
        let b = se.derive_key(KdfMode::default(), 5, 0, &[0; MESSAGE_LEN]).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.encrypted_result, b.encrypted_result);
    }
}
