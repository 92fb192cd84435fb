//! Content hashing for stored artifacts
//!
//! [`ContentHash`] is the Blake3 digest recorded in every
//! [`ArtifactMeta`](crate::ArtifactMeta), so metadata alone tells whether an
//! artifact changed between two listings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blake3 digest of an artifact's text, serialized as lowercase hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Digest of `content`
    #[must_use]
    pub fn of(content: &str) -> Self {
        Self(*blake3::hash(content.as_bytes()).as_bytes())
    }

    /// First 8 bytes as hex, for log lines
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_string()
    }
}

impl TryFrom<String> for ContentHash {
    type Error = hex::FromHexError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let mut digest = [0u8; 32];
        hex::decode_to_slice(text, &mut digest)?;
        Ok(Self(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_text_equal_digest() {
        assert_eq!(ContentHash::of("abc"), ContentHash::of("abc"));
        assert_ne!(ContentHash::of("abc"), ContentHash::of("abd"));
    }

    #[test]
    fn serializes_as_hex_string() {
        let h = ContentHash::of("export const x = 1;\n");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        assert_eq!(serde_json::from_str::<ContentHash>(&json).unwrap(), h);
        assert_eq!(h.short().len(), 16);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(serde_json::from_str::<ContentHash>("\"zz\"").is_err());
    }
}
