//! Parser option flags
//!
//! Bit values match the libxml2 HTML parser options so option words coming
//! from other tooling can be passed through with `from_bits_retain`.

use std::ops::{BitAnd, BitOr, BitOrAssign, Sub};

use serde::{Deserialize, Serialize};

/// Set of parser flags, combined with `|`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParseOptions(u32);

impl ParseOptions {
    /// Relaxed parsing: keep the tree despite errors
    pub const RECOVER: Self = Self(1 << 0);
    /// Do not default a doctype if not found
    pub const NO_DEFAULT_DOCTYPE: Self = Self(1 << 2);
    /// Suppress error reports
    pub const NO_ERROR: Self = Self(1 << 5);
    /// Suppress warning reports
    pub const NO_WARNING: Self = Self(1 << 6);
    /// Pedantic error reporting
    pub const PEDANTIC: Self = Self(1 << 7);
    /// Remove blank nodes
    pub const NO_BLANKS: Self = Self(1 << 8);
    /// Forbid network access
    pub const NO_NETWORK: Self = Self(1 << 11);
    /// Do not add implied html/head/body elements
    pub const NO_IMPLIED: Self = Self(1 << 13);
    /// Compact small text nodes
    pub const COMPACT: Self = Self(1 << 16);
    /// Ignore the encoding hint inside the document
    pub const IGNORE_ENCODING: Self = Self(1 << 21);

    /// Forgiving defaults for real-world markup
    pub const DEFAULT: Self = Self(
        Self::RECOVER.0 | Self::NO_NETWORK.0 | Self::NO_ERROR.0 | Self::NO_WARNING.0,
    );

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw option word
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from a raw word, keeping bits without a named flag
    pub const fn from_bits_retain(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every flag of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for ParseOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ParseOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl BitAnd for ParseOptions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Sub for ParseOptions {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 & !rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libxml_bit_values() {
        assert_eq!(ParseOptions::RECOVER.bits(), 1);
        assert_eq!(ParseOptions::NO_DEFAULT_DOCTYPE.bits(), 4);
        assert_eq!(ParseOptions::NO_NETWORK.bits(), 2048);
        assert_eq!(ParseOptions::NO_IMPLIED.bits(), 8192);
        assert_eq!(ParseOptions::COMPACT.bits(), 65536);
    }

    #[test]
    fn test_default_combination() {
        let default = ParseOptions::default();
        assert_eq!(default, ParseOptions::DEFAULT);
        assert!(default.contains(ParseOptions::RECOVER | ParseOptions::NO_NETWORK));
        assert!(default.contains(ParseOptions::NO_ERROR | ParseOptions::NO_WARNING));
        assert!(!default.contains(ParseOptions::PEDANTIC));
        assert_eq!(default.bits(), 1 | 32 | 64 | 2048);
    }

    #[test]
    fn test_combine_and_remove() {
        let mut opts = ParseOptions::empty();
        assert!(opts.is_empty());
        opts |= ParseOptions::NO_BLANKS;
        opts.insert(ParseOptions::COMPACT);
        assert!(opts.contains(ParseOptions::NO_BLANKS));

        opts.remove(ParseOptions::NO_BLANKS);
        assert_eq!(opts, ParseOptions::COMPACT);
        assert_eq!(ParseOptions::DEFAULT - ParseOptions::RECOVER, ParseOptions::from_bits_retain(2048 | 32 | 64));
    }

    #[test]
    fn test_unknown_bits_pass_through() {
        let opts = ParseOptions::from_bits_retain(1 << 30) | ParseOptions::RECOVER;
        assert_eq!(opts.bits(), (1 << 30) | 1);
        assert_eq!((opts & ParseOptions::RECOVER), ParseOptions::RECOVER);
    }
}
