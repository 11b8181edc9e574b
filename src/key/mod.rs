//! Key material for the byte rotation transform.
//!
//! A key is read as a raw string from a [`KeyProvider`], trimmed, parsed as a
//! base-10 signed integer and reduced into `0..=255`. Every worker parses its
//! own key; nothing here is cached.

pub mod provider;

pub use provider::{EnvKey, FileKey, KeyProvider, StaticKey};

use crate::error::KeyError;
use std::fmt;
use std::num::IntErrorKind;

/// Normalized rotation amount in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(u8);

impl Key {
    pub fn new(value: u8) -> Self {
        Key(value)
    }

    /// Reduce any integer into the byte range, keeping negative keys positive.
    ///
    /// ```
    /// use cryptpool::key::Key;
    ///
    /// assert_eq!(Key::from_integer(1000).value(), 232);
    /// assert_eq!(Key::from_integer(-1).value(), 255);
    /// ```
    pub fn from_integer(raw: i64) -> Self {
        Key(raw.rem_euclid(256) as u8)
    }

    /// Parse raw key material.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KeyError::Missing);
        }

        match trimmed.parse::<i64>() {
            Ok(value) => Ok(Key::from_integer(value)),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    Err(KeyError::Range(trimmed.to_string()))
                }
                _ => Err(KeyError::Parse(trimmed.to_string())),
            },
        }
    }

    /// Read and parse a key from a provider.
    pub fn load(provider: &dyn KeyProvider) -> Result<Self, KeyError> {
        let raw = provider.raw_key()?;
        Self::parse(&raw)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_values() {
        assert_eq!(Key::parse("0").unwrap().value(), 0);
        assert_eq!(Key::parse("42").unwrap().value(), 42);
        assert_eq!(Key::parse("255").unwrap().value(), 255);
        assert_eq!(Key::parse("256").unwrap().value(), 0);
    }

    #[test]
    fn test_parse_normalizes_modulo_256() {
        assert_eq!(Key::parse("1000").unwrap(), Key::new(232));
        assert_eq!(Key::parse("-3").unwrap(), Key::new(253));
        assert_eq!(Key::parse("-256").unwrap(), Key::new(0));
        assert_eq!(Key::parse("+7").unwrap(), Key::new(7));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(Key::parse("  17\n").unwrap(), Key::new(17));
        assert_eq!(Key::parse("\t5\r\n").unwrap(), Key::new(5));
    }

    #[test]
    fn test_empty_key_is_config_error() {
        assert!(matches!(Key::parse(""), Err(KeyError::Missing)));
        assert!(matches!(Key::parse(" \n\t"), Err(KeyError::Missing)));
    }

    #[test]
    fn test_non_numeric_key_is_parse_error() {
        assert!(matches!(Key::parse("abc"), Err(KeyError::Parse(s)) if s == "abc"));
        assert!(matches!(Key::parse("12abc"), Err(KeyError::Parse(_))));
        assert!(matches!(Key::parse("1.5"), Err(KeyError::Parse(_))));
    }

    #[test]
    fn test_overflowing_key_is_range_error() {
        assert!(matches!(
            Key::parse("99999999999999999999"),
            Err(KeyError::Range(_))
        ));
        assert!(matches!(
            Key::parse("-99999999999999999999"),
            Err(KeyError::Range(_))
        ));
    }

    #[test]
    fn test_load_from_provider() {
        let provider = StaticKey::new(" 300 ");
        assert_eq!(Key::load(&provider).unwrap(), Key::new(44));
    }
}
