//! Core types: Symbol

use std::fmt;

/// Maximum ticker length in bytes.
pub const SYMBOL_MAX_LEN: usize = 8;

/// Ticker symbol stored inline (no heap allocation), so it is `Copy`.
///
/// Holds up to [`SYMBOL_MAX_LEN`] ASCII bytes, e.g. `"AAPL"` or `"BRK.B"`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; SYMBOL_MAX_LEN],
    len: u8,
}

impl Symbol {
    /// Create a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `s` is empty, longer than 8 bytes, or not ASCII.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol {s:?}: must be 1..=8 ASCII bytes"),
        }
    }

    /// Create a symbol, returning `None` if `s` does not fit.
    pub fn try_new(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > SYMBOL_MAX_LEN || !s.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; SYMBOL_MAX_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII input.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Symbol::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid symbol {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_str() {
        assert_eq!(Symbol::new("AAPL").as_str(), "AAPL");
        assert_eq!(Symbol::new("BRK.B").as_str(), "BRK.B");
        assert_eq!(Symbol::new("ABCDEFGH").as_str(), "ABCDEFGH");
    }

    #[test]
    fn try_new_rejects() {
        assert!(Symbol::try_new("").is_none());
        assert!(Symbol::try_new("TOOLONGNAME").is_none());
        assert!(Symbol::try_new("ÄPL").is_none());
    }

    #[test]
    #[should_panic(expected = "invalid symbol")]
    fn new_panics_on_overflow() {
        let _ = Symbol::new("NINECHARS");
    }

    #[test]
    fn display_pads() {
        assert_eq!(format!("{:6}|", Symbol::new("GM")), "GM    |");
        assert_eq!(format!("{:?}", Symbol::new("GM")), "Symbol(GM)");
    }

    #[test]
    fn equality() {
        assert_eq!(Symbol::new("MS"), Symbol::new("MS"));
        assert_ne!(Symbol::new("MS"), Symbol::new("MSFT"));
    }
}
