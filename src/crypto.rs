//! Low-level cryptographic primitives.
//!
//! This is the only module in the crate that imports `ring` directly. Every
//! other module hashes, XORs and draws randomness through the functions here.
//!
//! Primitive choices:
//! - **Mask hash**: SHA-256 (32-byte digest)
//! - **Randomness**: `ring::rand::SystemRandom`
//! - **Simulated device KDF**: HMAC-SHA256

use ring::digest::{self, SHA256};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::KdfWrapError;

/// Size of the SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// One-shot SHA-256 over `data`.
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let d = digest::digest(&SHA256, data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(d.as_ref());
    out
}

/// Byte-wise XOR of two equal-length buffers.
pub fn xor<const N: usize>(a: &[u8; N], b: &[u8; N]) -> [u8; N] {
    let mut out = [0u8; N];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}

/// Fill a fixed-size buffer from the system RNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N], KdfWrapError> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; N];
    rng.fill(&mut buf)
        .map_err(|_| KdfWrapError::RandomnessFailure)?;
    Ok(buf)
}

/// HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[&[u8]]) -> [u8; DIGEST_LEN] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let mut ctx = hmac::Context::with_key(&key);
    for part in data {
        ctx.update(part);
    }
    let tag = ctx.sign();
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(tag.as_ref());
    out
}
