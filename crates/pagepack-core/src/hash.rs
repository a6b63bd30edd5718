//! Content hashing for partition images

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest of a partition image.
///
/// Recorded in the build manifest so two builds can be compared without
/// keeping the images around.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute a hash from bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Get the hash as a hex string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the hash as a prefixed hex string (e.g., "sha256:abcdef...")
    pub fn to_prefixed_hex(&self) -> String {
        format!("sha256:{}", self.to_hex())
    }

    /// Parse a prefixed hex string back into a ContentHash
    pub fn from_prefixed_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix("sha256:")?;
        if hex.len() != 64 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_hashing() {
        assert_eq!(
            ContentHash::from_bytes(b"<p>hi</p>"),
            ContentHash::from_bytes(b"<p>hi</p>")
        );
        assert_ne!(
            ContentHash::from_bytes(b"<p>hi</p>"),
            ContentHash::from_bytes(b"<p>ho</p>")
        );
    }

    #[test]
    fn test_empty_input_digest() {
        let h = ContentHash::from_bytes(b"");
        assert_eq!(
            h.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_prefixed_hex_roundtrip() {
        let h = ContentHash::from_bytes(b"page content");
        let parsed = ContentHash::from_prefixed_hex(&h.to_prefixed_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_from_prefixed_hex_invalid() {
        assert!(ContentHash::from_prefixed_hex("md5:abc").is_none());
        assert!(ContentHash::from_prefixed_hex("sha256:tooshort").is_none());
    }
}
