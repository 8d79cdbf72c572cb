//! Error types for kdfwrap.
//!
//! Each variant is a distinct failure mode of the recovery protocol. Messages
//! name *what* failed and never include key material, masks or secrets.

use std::fmt;

/// A vendor status code reported by the secure element.
///
/// Codes mirror the status byte a CryptoAuth-class device returns on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// A command parameter (mode, details, length) was rejected.
    BadParam,
    /// The referenced slot does not exist or holds no key.
    InvalidId,
    /// A payload had the wrong size for the target.
    InvalidSize,
    /// The device could not complete the command with its current contents.
    ExecutionError,
    /// The target slot is locked against writes.
    SlotLocked,
    /// The bus transaction failed.
    CommFail,
    /// The device session was never initialised.
    NotInitialized,
}

impl DeviceStatus {
    /// The raw status byte.
    pub fn code(self) -> u8 {
        match self {
            Self::BadParam => 0xE2,
            Self::InvalidId => 0xE3,
            Self::InvalidSize => 0xE4,
            Self::ExecutionError => 0xF4,
            Self::SlotLocked => 0x02,
            Self::CommFail => 0xF0,
            Self::NotInitialized => 0xFD,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status 0x{:02X}", self.code())
    }
}

/// The single error type for all kdfwrap operations.
#[derive(Debug)]
pub enum KdfWrapError {
    /// An input buffer did not have the exact length the protocol requires.
    /// Nothing is hashed or XORed once this is returned.
    InvalidInputLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The secure element could not be reached or the bus is misconfigured.
    Transport(String),

    /// The secure element answered with a non-success status.
    Device(DeviceStatus),

    /// The system's random number generator failed to produce bytes.
    RandomnessFailure,

    /// The configuration could not be parsed or is inconsistent.
    Config(String),

    /// A recovery record could not be written to an audit sink.
    Audit(String),
}

impl fmt::Display for KdfWrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInputLength {
                field,
                expected,
                actual,
            } => write!(
                f,
                "invalid input length for {}: expected {} bytes, got {}",
                field, expected, actual
            ),
            Self::Transport(reason) => write!(f, "transport error: {}", reason),
            Self::Device(status) => write!(f, "device error: {}", status),
            Self::RandomnessFailure => write!(f, "randomness source failed"),
            Self::Config(reason) => write!(f, "invalid configuration: {}", reason),
            Self::Audit(reason) => write!(f, "audit sink failed: {}", reason),
        }
    }
}

impl std::error::Error for KdfWrapError {}

impl From<DeviceStatus> for KdfWrapError {
    fn from(status: DeviceStatus) -> Self {
        Self::Device(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_never_carries_payload_bytes() {
        let err = KdfWrapError::InvalidInputLength {
            field: "nonce",
            expected: 32,
            actual: 31,
        };
        assert_eq!(
            err.to_string(),
            "invalid input length for nonce: expected 32 bytes, got 31"
        );

        let err: KdfWrapError = DeviceStatus::BadParam.into();
        assert_eq!(err.to_string(), "device error: status 0xE2");
    }
}
