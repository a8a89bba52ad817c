//! Entity identifier.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identifier of an entity within one document.
///
/// Ids are:
/// - Positive integers when allocated by the store
/// - Unique within a document at creation time
/// - Never reassigned after the entity is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::invalid_identifier(s));
        }
        trimmed
            .parse()
            .map(Self)
            .map_err(|_| CoreError::invalid_identifier(s))
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_decimal() {
        assert_eq!(EntityId::new(42).to_string(), "42");
    }

    #[test]
    fn parse() {
        assert_eq!("7".parse::<EntityId>().unwrap(), EntityId::new(7));
        assert_eq!(" 12 ".parse::<EntityId>().unwrap().as_u64(), 12);
        assert!("".parse::<EntityId>().is_err());
        assert!("-1".parse::<EntityId>().is_err());
        assert!("1.5".parse::<EntityId>().is_err());
        assert!("abc".parse::<EntityId>().is_err());
    }

    #[test]
    fn ordering() {
        assert!(EntityId::new(2) < EntityId::new(10));
    }
}
