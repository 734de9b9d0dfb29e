//! Token text storage.
//!
//! Most lexemes in scenario text are short (`speed`, `+`, `30`), so their
//! text is kept in a fixed-size inline buffer.  Long identifiers and string
//! literals are promoted to a heap allocation.  Callers never see the
//! difference: [`TokenText::as_str`] works the same for both.

use std::fmt;
use std::ops::Deref;

/// Bytes of text stored inline before a token is promoted to the heap.
pub const INLINE_CAPACITY: usize = 22;

/// Owned text of a single token.
#[derive(Clone)]
pub enum TokenText {
    Inline { len: u8, buf: [u8; INLINE_CAPACITY] },
    Heap(Box<str>),
}

impl TokenText {
    pub fn new(s: &str) -> Self {
        if s.len() <= INLINE_CAPACITY {
            let mut buf = [0u8; INLINE_CAPACITY];
            buf[..s.len()].copy_from_slice(s.as_bytes());
            TokenText::Inline {
                len: s.len() as u8,
                buf,
            }
        } else {
            TokenText::Heap(s.into())
        }
    }

    /// Borrow the text, regardless of where it is stored.
    pub fn as_str(&self) -> &str {
        match self {
            // The inline bytes were copied from a whole `&str`, so they are
            // always valid UTF-8.
            TokenText::Inline { len, buf } => {
                std::str::from_utf8(&buf[..*len as usize]).unwrap_or_default()
            }
            TokenText::Heap(s) => s,
        }
    }

    /// Returns `true` if the text was promoted to heap storage.
    pub fn is_large(&self) -> bool {
        matches!(self, TokenText::Heap(_))
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenText {
    fn default() -> Self {
        TokenText::new("")
    }
}

impl Deref for TokenText {
    type Target = str;
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq for TokenText {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl PartialEq<str> for TokenText {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for TokenText {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<&str> for TokenText {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for TokenText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for TokenText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_stays_inline() {
        let t = TokenText::new("speed");
        assert!(!t.is_large());
        assert_eq!(t.as_str(), "speed");
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn exact_capacity_stays_inline() {
        let s = "a".repeat(INLINE_CAPACITY);
        let t = TokenText::new(&s);
        assert!(!t.is_large());
        assert_eq!(t.as_str(), s);
    }

    #[test]
    fn long_text_is_promoted() {
        let s = "vehicle_lead_longitudinal_velocity";
        let t = TokenText::new(s);
        assert!(t.is_large());
        assert_eq!(t.as_str(), s);
    }

    #[test]
    fn multibyte_text() {
        // '€' is 3 bytes in UTF-8
        let t = TokenText::new("€€");
        assert!(!t.is_large());
        assert_eq!(t.len(), 6);
        assert_eq!(&*t, "€€");
    }

    #[test]
    fn equality_ignores_storage() {
        let a = TokenText::new("x");
        let b = TokenText::Heap("x".into());
        assert_eq!(a, b);
        assert_eq!(a, "x");
    }

    #[test]
    fn empty_default() {
        let t = TokenText::default();
        assert!(t.is_empty());
        assert_eq!(format!("{t}"), "");
    }
}
