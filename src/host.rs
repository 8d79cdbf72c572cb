//! Host-side protocol driver.
//!
//! `Host` owns the deployment configuration (including the shared secret) and
//! the recovery log. It drives a `SecureElement` through provisioning and key
//! recovery. Device failures abort the current step and are returned as-is;
//! nothing here retries.

use zeroize::Zeroizing;

use crate::audit::{RecoveryLog, RecoveryRecord, RecoverySink};
use crate::config::{Config, RunMode};
use crate::device::{KdfOutput, SecureElement, SlotId, MESSAGE_LEN, SLOT_LEN};
use crate::error::KdfWrapError;
use crate::keys::{DerivedAesKey, AES_KEY_LEN, NONCE_MASK_LEN};
use crate::recover;

/// One completed exchange: what crossed the bus, and the key recovered from it.
#[derive(Debug)]
pub struct Recovery {
    pub output: KdfOutput,
    pub key: DerivedAesKey,
}

/// Result of `Host::run`.
#[derive(Debug)]
pub enum RunOutcome {
    /// A provisioning step wrote `slot`.
    Provisioned { slot: SlotId },
    /// One entry per recovery iteration, in order.
    Recovered(Vec<Recovery>),
}

/// The host end of the protocol.
#[derive(Debug)]
pub struct Host {
    config: Config,
    log: RecoveryLog,
}

impl Host {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            log: RecoveryLog::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Forward every recovery record to `sink` as well as the in-memory log.
    pub fn add_recovery_sink(&mut self, sink: Box<dyn RecoverySink>) {
        self.log.add_forward_sink(sink);
    }

    pub fn recovery_log(&self) -> &RecoveryLog {
        &self.log
    }

    /// Execute one run mode against `element`.
    pub fn run<E: SecureElement + ?Sized>(
        &mut self,
        element: &mut E,
        mode: RunMode,
    ) -> Result<RunOutcome, KdfWrapError> {
        match mode {
            RunMode::ProvisionIoProtectionKey => {
                let slot = self.provision_io_protection_key(element)?;
                Ok(RunOutcome::Provisioned { slot })
            }
            RunMode::ProvisionParentKey => {
                let slot = self.provision_parent_key(element)?;
                Ok(RunOutcome::Provisioned { slot })
            }
            RunMode::Recover { iterations } => {
                let mut recoveries = Vec::with_capacity(iterations as usize);
                for _ in 0..iterations {
                    recoveries.push(self.recover(element)?);
                }
                Ok(RunOutcome::Recovered(recoveries))
            }
        }
    }

    /// Plain write of the shared secret into the I/O protection slot.
    pub fn provision_io_protection_key<E: SecureElement + ?Sized>(
        &self,
        element: &mut E,
    ) -> Result<SlotId, KdfWrapError> {
        let slot = self.config.device.io_protection_slot;
        element.write_slot(slot, self.config.shared_secret.as_bytes())?;
        tracing::info!(slot, "io protection key provisioned");
        Ok(slot)
    }

    /// Encrypted write of the parent key.
    ///
    /// The 16-byte key is zero-padded to a full slot and masked with
    /// `SHA256(shared_secret || host_nonce[..16])` before it leaves the host.
    pub fn provision_parent_key<E: SecureElement + ?Sized>(
        &self,
        element: &mut E,
    ) -> Result<SlotId, KdfWrapError> {
        let parent = self
            .config
            .parent_key
            .as_ref()
            .ok_or_else(|| KdfWrapError::Config("parent_key is required to provision".into()))?;

        let mut block = Zeroizing::new([0u8; SLOT_LEN]);
        block[..AES_KEY_LEN].copy_from_slice(&parent[..]);

        let host_nonce = &self.config.host_nonce;
        let mask =
            recover::mask_from_parts(&self.config.shared_secret, &host_nonce[..NONCE_MASK_LEN]);
        let masked = recover::apply_mask(&mask, &block);

        let device = &self.config.device;
        element.write_encrypted(
            device.parent_key_slot,
            &masked,
            device.io_protection_slot,
            host_nonce,
        )?;
        tracing::info!(slot = device.parent_key_slot, "parent key provisioned");
        Ok(device.parent_key_slot)
    }

    /// Derive on the device with the configured message and recover the key.
    pub fn recover<E: SecureElement + ?Sized>(
        &mut self,
        element: &mut E,
    ) -> Result<Recovery, KdfWrapError> {
        let message = self.config.kdf.message;
        self.recover_with_message(element, &message)
    }

    /// Derive on the device with an explicit message and recover the key.
    pub fn recover_with_message<E: SecureElement + ?Sized>(
        &mut self,
        element: &mut E,
        message: &[u8; MESSAGE_LEN],
    ) -> Result<Recovery, KdfWrapError> {
        let slot = self.config.device.parent_key_slot;
        let kdf = &self.config.kdf;

        let output = element
            .derive_key(kdf.mode, slot, kdf.details, message)
            .map_err(|e| {
                tracing::error!(slot, error = %e, "kdf failed, recovery aborted");
                e
            })?;

        let key = recover::recover(
            &self.config.shared_secret,
            &output.nonce,
            &output.encrypted_result,
        );

        let record = RecoveryRecord::new(slot, kdf.mode, &output.nonce);
        tracing::debug!(slot, nonce_prefix = %record.nonce_prefix, "key recovered");
        self.log.append(record)?;

        Ok(Recovery { output, key })
    }
}
