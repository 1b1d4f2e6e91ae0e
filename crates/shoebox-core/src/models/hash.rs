//! MD5 content digests used for deduplication and verification.

use base64::Engine;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 16-byte MD5 digest of a file's full content.
///
/// Equality is exact byte comparison; there is no normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    pub const LEN: usize = 16;

    pub fn compute(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    pub fn from_array(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns `None` unless `bytes` is exactly 16 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn from_base64(value: &str) -> Option<Self> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(value.trim())
            .ok()?;
        Self::from_slice(&decoded)
    }

    /// Accepts either case; surrounding quotes (as on ETags) are stripped.
    pub fn from_hex(value: &str) -> Option<Self> {
        let decoded = hex::decode(value.trim().trim_matches('"')).ok()?;
        Self::from_slice(&decoded)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Uppercase hex, as spliced into `KeepBoth` blob names.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_hex())
    }
}
