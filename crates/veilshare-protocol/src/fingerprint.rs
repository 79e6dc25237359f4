//! Passphrase fingerprint wire format.
//!
//! The server never sees the passphrase itself, only this deterministic
//! derivative. Equality must be checked in constant time; see
//! `veilshare_session::verifier`.

use serde::Deserialize;
use serde::Serialize;

pub const FINGERPRINT_IV_LEN: usize = 12;
pub const FINGERPRINT_DATA_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
}

impl Fingerprint {
    /// Bytes compared for equality: `iv || data`, concatenated so a single
    /// constant-time comparison covers the whole fingerprint.
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.iv.len() + self.data.len());
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}
