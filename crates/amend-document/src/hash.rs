//! Content fingerprints for document snapshots
//!
//! A [`ContentHash`] is a Blake3 digest over a sequence of text parts.
//! Documents hash their paragraph stream (kind, text, comments) so a backup
//! can be checked against the state it was copied from without comparing
//! paragraphs one by one.

use std::fmt::{self, Display, Formatter};

/// Blake3 digest of a sequence of text parts
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash `parts` in order
    ///
    /// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]`
    /// produce different digests.
    #[must_use]
    pub fn compute_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Leading 8 bytes as hex, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}
