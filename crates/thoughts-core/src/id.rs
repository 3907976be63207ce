//! Stable key newtypes for the two indexes.
//!
//! Keys are distinct newtype wrappers so that a `ValueKey` cannot be used
//! where a `ContextKey` is expected. Both are derived, never chosen: see
//! `thoughts_storage::hash` for how they are computed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized form of a value. Two values with the same key are the same
/// thought for indexing purposes, regardless of display casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueKey(pub String);

/// Digest of a normalized context (ancestor chain).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextKey(pub [u8; 32]);

impl ValueKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ContextKey {
    /// Lowercase hex encoding of the full digest.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Short form; the full digest is noise in logs.
impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..6] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_key_display_is_short_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[5] = 0x01;
        let key = ContextKey(bytes);
        assert_eq!(format!("{}", key), "ab0000000001");
        assert_eq!(key.to_hex().len(), 64);
    }

    #[test]
    fn value_key_display() {
        assert_eq!(format!("{}", ValueKey("a b".into())), "a b");
    }

    #[test]
    fn serde_roundtrip() {
        let key = ContextKey([7u8; 32]);
        let json = serde_json::to_string(&key).unwrap();
        let back: ContextKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
