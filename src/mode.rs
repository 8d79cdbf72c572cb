//! KDF command mode byte.
//!
//! The mode selects three independent fields packed into one byte:
//!
//! ```text
//! bit  7 | 6 5 |  4 3 2 | 1 0
//!      - | alg | target | source
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DeviceStatus, KdfWrapError};

/// Where the KDF reads its input key from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfSource {
    TempKey,
    TempKeyUpper,
    AltKeyBuf,
    Slot,
}

/// Where the KDF writes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfTarget {
    TempKey,
    TempKeyUpper,
    Slot,
    AltKeyBuf,
    Output,
    OutputEnc,
}

/// Which derivation family the KDF runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    Prf,
    Aes,
    Hkdf,
}

/// A raw KDF mode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KdfMode(pub u8);

impl KdfMode {
    pub const SOURCE_TEMPKEY: u8 = 0x00;
    pub const SOURCE_TEMPKEY_UP: u8 = 0x01;
    pub const SOURCE_ALTKEYBUF: u8 = 0x02;
    pub const SOURCE_SLOT: u8 = 0x03;
    pub const SOURCE_MASK: u8 = 0x03;

    pub const TARGET_TEMPKEY: u8 = 0x00;
    pub const TARGET_TEMPKEY_UP: u8 = 0x04;
    pub const TARGET_SLOT: u8 = 0x08;
    pub const TARGET_ALTKEYBUF: u8 = 0x0C;
    pub const TARGET_OUTPUT: u8 = 0x10;
    pub const TARGET_OUTPUT_ENC: u8 = 0x14;
    pub const TARGET_MASK: u8 = 0x1C;

    pub const ALG_PRF: u8 = 0x00;
    pub const ALG_AES: u8 = 0x20;
    pub const ALG_HKDF: u8 = 0x40;
    pub const ALG_MASK: u8 = 0x60;

    /// AES derivation from a key slot, result returned masked for the bus.
    pub const AES_SLOT_TO_ENCRYPTED_OUTPUT: KdfMode =
        KdfMode(Self::ALG_AES | Self::SOURCE_SLOT | Self::TARGET_OUTPUT_ENC);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn source(self) -> KdfSource {
        match self.0 & Self::SOURCE_MASK {
            Self::SOURCE_TEMPKEY => KdfSource::TempKey,
            Self::SOURCE_TEMPKEY_UP => KdfSource::TempKeyUpper,
            Self::SOURCE_ALTKEYBUF => KdfSource::AltKeyBuf,
            _ => KdfSource::Slot,
        }
    }

    /// Decode the target field. Unassigned encodings are a bad parameter.
    pub fn target(self) -> Result<KdfTarget, KdfWrapError> {
        match self.0 & Self::TARGET_MASK {
            Self::TARGET_TEMPKEY => Ok(KdfTarget::TempKey),
            Self::TARGET_TEMPKEY_UP => Ok(KdfTarget::TempKeyUpper),
            Self::TARGET_SLOT => Ok(KdfTarget::Slot),
            Self::TARGET_ALTKEYBUF => Ok(KdfTarget::AltKeyBuf),
            Self::TARGET_OUTPUT => Ok(KdfTarget::Output),
            Self::TARGET_OUTPUT_ENC => Ok(KdfTarget::OutputEnc),
            _ => Err(DeviceStatus::BadParam.into()),
        }
    }

    /// Decode the algorithm field. `0x60` is reserved.
    pub fn algorithm(self) -> Result<KdfAlgorithm, KdfWrapError> {
        match self.0 & Self::ALG_MASK {
            Self::ALG_PRF => Ok(KdfAlgorithm::Prf),
            Self::ALG_AES => Ok(KdfAlgorithm::Aes),
            Self::ALG_HKDF => Ok(KdfAlgorithm::Hkdf),
            _ => Err(DeviceStatus::BadParam.into()),
        }
    }
}

impl Default for KdfMode {
    fn default() -> Self {
        Self::AES_SLOT_TO_ENCRYPTED_OUTPUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_protocol_mode_decodes() {
        let mode = KdfMode::AES_SLOT_TO_ENCRYPTED_OUTPUT;
        assert_eq!(mode.bits(), 0x37);
        assert_eq!(mode.source(), KdfSource::Slot);
        assert_eq!(mode.target().unwrap(), KdfTarget::OutputEnc);
        assert_eq!(mode.algorithm().unwrap(), KdfAlgorithm::Aes);
    }

    #[test]
    fn test_reserved_encodings_rejected() {
        assert!(KdfMode(0x60).algorithm().is_err());
        assert!(KdfMode(0x18).target().is_err());
        assert_eq!(KdfMode(0x10).target().unwrap(), KdfTarget::Output);
    }
}
