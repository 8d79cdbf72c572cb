//! Deployment configuration.
//!
//! Configuration is JSON. Byte fields are hex strings and are checked for
//! exact length on load:
//!
//! ```json
//! {
//!   "device": { "address": 192, "parent_key_slot": 5, "io_protection_slot": 6 },
//!   "shared_secret": "4d8f5c21...d295",
//!   "parent_key": "11874a43...73f8",
//!   "host_nonce": "b67b9734...279a",
//!   "kdf": { "mode": 55, "details": 0, "message": "000000..." },
//!   "mode": { "kind": "recover", "iterations": 2 }
//! }
//! ```
//!
//! Only `shared_secret` is required. `parent_key` is needed solely to
//! provision the parent slot.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::device::{SlotId, MESSAGE_LEN};
use crate::error::KdfWrapError;
use crate::keys::{fixed, SharedProtectionSecret, AES_KEY_LEN, HOST_NONCE_LEN};
use crate::mode::KdfMode;
use crate::simulator::SIMULATED_ADDRESS;

const DEMO_SHARED_SECRET: [u8; 32] = [
    0x4D, 0x8F, 0x5C, 0x21, 0x3C, 0x15, 0x02, 0x0F, 0x24, 0x13, 0x89, 0x0F, 0x5A, 0x2A, 0xAA, 0x8A,
    0x70, 0x36, 0x61, 0xB9, 0x18, 0xAD, 0xB5, 0x1B, 0x7C, 0x8B, 0xD3, 0x70, 0xCE, 0xF2, 0xD2, 0x95,
];

const DEMO_PARENT_KEY: [u8; AES_KEY_LEN] = [
    0x11, 0x87, 0x4A, 0x43, 0xF9, 0xE2, 0x62, 0xD7, 0xB0, 0x3E, 0xB7, 0x7D, 0x7A, 0x65, 0x73, 0xF8,
];

const DEMO_HOST_NONCE: [u8; HOST_NONCE_LEN] = [
    0xB6, 0x7B, 0x97, 0x34, 0xD7, 0x79, 0x77, 0x7F, 0x35, 0x11, 0x9F, 0xC8, 0x77, 0xA6, 0x5C, 0xE0,
    0x58, 0x00, 0x27, 0x9A,
];

/// What a run of the host does. Replaces build-time provisioning switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunMode {
    /// Write the shared secret into the I/O protection slot.
    ProvisionIoProtectionKey,
    /// Write the parent key into its slot, masked under the shared secret.
    ProvisionParentKey,
    /// Derive and recover the key `iterations` times.
    Recover {
        #[serde(default = "default_iterations")]
        iterations: u8,
    },
}

fn default_iterations() -> u8 {
    2
}

impl Default for RunMode {
    fn default() -> Self {
        Self::Recover {
            iterations: default_iterations(),
        }
    }
}

/// How to reach the device and which slots hold what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Bus address of the secure element.
    pub address: u8,
    /// Slot holding the parent key the KDF reads.
    pub parent_key_slot: SlotId,
    /// Slot holding the shared I/O protection secret.
    pub io_protection_slot: SlotId,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: SIMULATED_ADDRESS,
            parent_key_slot: 5,
            io_protection_slot: 6,
        }
    }
}

/// KDF call parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfConfig {
    pub mode: KdfMode,
    pub details: u32,
    pub message: [u8; MESSAGE_LEN],
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            mode: KdfMode::AES_SLOT_TO_ENCRYPTED_OUTPUT,
            details: 0,
            message: [0u8; MESSAGE_LEN],
        }
    }
}

/// Validated configuration.
pub struct Config {
    pub device: DeviceConfig,
    pub shared_secret: SharedProtectionSecret,
    pub parent_key: Option<Zeroizing<[u8; AES_KEY_LEN]>>,
    pub host_nonce: [u8; HOST_NONCE_LEN],
    pub kdf: KdfConfig,
    pub mode: RunMode,
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("device", &self.device)
            .field("shared_secret", &"[REDACTED]")
            .field("parent_key", &self.parent_key.as_ref().map(|_| "[REDACTED]"))
            .field("host_nonce", &hex::encode(self.host_nonce))
            .field("kdf", &self.kdf)
            .field("mode", &self.mode)
            .finish()
    }
}

#[derive(Deserialize)]
struct RawKdfConfig {
    #[serde(default)]
    mode: KdfMode,
    #[serde(default)]
    details: u32,
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    device: DeviceConfig,
    shared_secret: String,
    parent_key: Option<String>,
    host_nonce: Option<String>,
    kdf: Option<RawKdfConfig>,
    #[serde(default)]
    mode: RunMode,
}

fn decode_hex<const N: usize>(field: &'static str, text: &str) -> Result<[u8; N], KdfWrapError> {
    let bytes = Zeroizing::new(
        hex::decode(text.trim()).map_err(|e| KdfWrapError::Config(format!("{}: {}", field, e)))?,
    );
    fixed(field, &bytes)
}

impl Config {
    /// The reference deployment: slots 5 and 6, zero message, two recoveries.
    pub fn demo() -> Self {
        Self {
            device: DeviceConfig::default(),
            shared_secret: SharedProtectionSecret::from_bytes(DEMO_SHARED_SECRET),
            parent_key: Some(Zeroizing::new(DEMO_PARENT_KEY)),
            host_nonce: DEMO_HOST_NONCE,
            kdf: KdfConfig::default(),
            mode: RunMode::default(),
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, KdfWrapError> {
        let raw: RawConfig =
            serde_json::from_str(text).map_err(|e| KdfWrapError::Config(e.to_string()))?;

        let shared_secret =
            SharedProtectionSecret::from_bytes(decode_hex("shared_secret", &raw.shared_secret)?);
        let parent_key = raw
            .parent_key
            .as_deref()
            .map(|text| decode_hex("parent_key", text).map(Zeroizing::new))
            .transpose()?;
        let host_nonce = match raw.host_nonce.as_deref() {
            Some(text) => decode_hex("host_nonce", text)?,
            None => DEMO_HOST_NONCE,
        };
        let kdf = match raw.kdf {
            Some(k) => KdfConfig {
                mode: k.mode,
                details: k.details,
                message: match k.message.as_deref() {
                    Some(text) => decode_hex("kdf.message", text)?,
                    None => [0u8; MESSAGE_LEN],
                },
            },
            None => KdfConfig::default(),
        };

        if raw.device.parent_key_slot == raw.device.io_protection_slot {
            return Err(KdfWrapError::Config(
                "parent key and io protection key must live in different slots".into(),
            ));
        }

        let config = Self {
            device: raw.device,
            shared_secret,
            parent_key,
            host_nonce,
            kdf,
            mode: raw.mode,
        };
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KdfWrapError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| KdfWrapError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_HEX: &str = "4d8f5c213c15020f2413890f5a2aaa8a703661b918adb51b7c8bd370cef2d295";

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = format!(r#"{{ "shared_secret": "{}" }}"#, SECRET_HEX);
        let cfg = Config::from_json(&json).unwrap();

        assert_eq!(cfg.shared_secret.as_bytes(), &DEMO_SHARED_SECRET);
        assert_eq!(cfg.device, DeviceConfig::default());
        assert_eq!(cfg.kdf, KdfConfig::default());
        assert_eq!(cfg.mode, RunMode::Recover { iterations: 2 });
        assert!(cfg.parent_key.is_none());
    }

    #[test]
    fn test_full_json() {
        let json = format!(
            r#"{{
                "device": {{ "address": 192, "parent_key_slot": 9, "io_protection_slot": 10 }},
                "shared_secret": "{}",
                "parent_key": "11874a43f9e262d7b03eb77d7a6573f8",
                "kdf": {{ "mode": 55, "details": 7, "message": "0102030405060708090a0b0c0d0e0f10" }},
                "mode": {{ "kind": "provision_parent_key" }}
            }}"#,
            SECRET_HEX
        );
        let cfg = Config::from_json(&json).unwrap();

        assert_eq!(cfg.device.parent_key_slot, 9);
        assert_eq!(cfg.device.io_protection_slot, 10);
        assert_eq!(cfg.parent_key.as_deref(), Some(&DEMO_PARENT_KEY));
        assert_eq!(cfg.kdf.details, 7);
        assert_eq!(cfg.kdf.message[15], 0x10);
        assert_eq!(cfg.mode, RunMode::ProvisionParentKey);
    }

    #[test]
    fn test_short_secret_rejected() {
        let json = r#"{ "shared_secret": "4d8f5c21" }"#;
        assert!(matches!(
            Config::from_json(json),
            Err(KdfWrapError::InvalidInputLength {
                field: "shared_secret",
                expected: 32,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_bad_hex_and_slot_clash_rejected() {
        let json = r#"{ "shared_secret": "zz" }"#;
        assert!(matches!(Config::from_json(json), Err(KdfWrapError::Config(_))));

        let json = format!(
            r#"{{ "shared_secret": "{}", "device": {{ "parent_key_slot": 6 }} }}"#,
            SECRET_HEX
        );
        assert!(matches!(Config::from_json(&json), Err(KdfWrapError::Config(_))));
    }

    #[test]
    fn test_debug_redacts() {
        let printed = format!("{:?}", Config::demo());
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("4d8f5c21"));
    }
}
