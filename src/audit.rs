//! Recovery audit trail.
//!
//! Records every successful key recovery. The log is append-only and holds no
//! key material: a record names the slot, the mode byte and the first bytes of
//! the device nonce. Supports pluggable sinks for forwarding records.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::SlotId;
use crate::error::KdfWrapError;
use crate::keys::DerivationNonce;
use crate::mode::KdfMode;

/// Number of nonce bytes kept in a record.
const NONCE_PREFIX_LEN: usize = 4;

/// A sink that receives recovery records.
pub trait RecoverySink: Send {
    /// Append a record. Called once per recovered key.
    fn append(&mut self, record: &RecoveryRecord) -> Result<(), KdfWrapError>;
}

/// A permanent record of one key recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    /// The slot the device derived from.
    pub slot: SlotId,
    /// The KDF mode byte used.
    pub mode: KdfMode,
    /// Hex of the leading nonce bytes, enough to correlate with a bus trace.
    pub nonce_prefix: String,
    /// When the key was recovered.
    pub timestamp: DateTime<Utc>,
}

impl RecoveryRecord {
    pub fn new(slot: SlotId, mode: KdfMode, nonce: &DerivationNonce) -> Self {
        Self {
            slot,
            mode,
            nonce_prefix: hex::encode(&nonce.as_bytes()[..NONCE_PREFIX_LEN]),
            timestamp: Utc::now(),
        }
    }
}

/// An append-only log of recoveries.
#[derive(Default)]
pub struct RecoveryLog {
    records: Vec<RecoveryRecord>,
    forward_sinks: Vec<Box<dyn RecoverySink>>,
}

impl std::fmt::Debug for RecoveryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryLog")
            .field("records", &self.records)
            .field("forward_sinks", &self.forward_sinks.len())
            .finish()
    }
}

impl RecoveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to receive a copy of every record.
    pub fn add_forward_sink(&mut self, sink: Box<dyn RecoverySink>) {
        self.forward_sinks.push(sink);
    }

    /// Append a record and forward it to every sink.
    ///
    /// The in-memory log always keeps the record; the first sink failure is
    /// returned after all sinks have been tried.
    pub fn append(&mut self, record: RecoveryRecord) -> Result<(), KdfWrapError> {
        let mut first_err = None;
        for sink in self.forward_sinks.iter_mut() {
            if let Err(e) = sink.append(&record) {
                tracing::error!(error = %e, "recovery sink failed");
                first_err.get_or_insert(e);
            }
        }
        self.records.push(record);
        first_err.map_or(Ok(()), Err)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecoveryRecord> {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes recovery records as JSON lines to a file, appending if it exists.
pub struct FileRecoverySink {
    file: std::fs::File,
}

impl FileRecoverySink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl RecoverySink for FileRecoverySink {
    fn append(&mut self, record: &RecoveryRecord) -> Result<(), KdfWrapError> {
        let line = serde_json::to_string(record).map_err(|e| KdfWrapError::Audit(e.to_string()))?;
        writeln!(self.file, "{line}").map_err(|e| KdfWrapError::Audit(e.to_string()))?;
        self.file
            .flush()
            .map_err(|e| KdfWrapError::Audit(e.to_string()))
    }
}
