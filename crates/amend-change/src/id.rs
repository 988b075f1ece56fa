//! Change identifiers

use std::fmt::{self, Display, Formatter};

/// Identifier of a change within one plan, conventionally `CHG-###`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
    /// Wrap an arbitrary id string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `CHG-###` id for the 1-based position `n`
    #[must_use]
    pub fn sequential(n: usize) -> Self {
        Self(format!("CHG-{n:03}"))
    }

    /// Borrow as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_is_zero_padded() {
        assert_eq!(ChangeId::sequential(1).as_str(), "CHG-001");
        assert_eq!(ChangeId::sequential(42).to_string(), "CHG-042");
        assert_eq!(ChangeId::sequential(1234).as_str(), "CHG-1234");
    }
}
