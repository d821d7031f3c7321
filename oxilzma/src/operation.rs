//! Operations of the LZMA stream.
//!
//! The encoder reduces its input to a sequence of operations: literal bytes
//! and back-references ("matches") into the dictionary. The match finder
//! produces them and the encoder state turns them into range coded symbols.

use std::fmt;

/// Minimum match length.
pub const MIN_MATCH_LEN: usize = 2;

/// Maximum match length.
pub const MAX_MATCH_LEN: usize = MIN_MATCH_LEN + 16 + 256 - 1;

/// Minimum match distance.
pub const MIN_DISTANCE: u32 = 1;

/// Maximum match distance.
///
/// The stream stores `distance - 1`; the all-ones value of that field is
/// reserved for the end-of-stream marker.
pub const MAX_DISTANCE: u32 = u32::MAX;

/// A single literal or match operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A literal byte.
    Literal(u8),
    /// A back-reference of `len` bytes starting `distance` bytes back.
    Match {
        /// Backward distance (1 is the previous byte).
        distance: u32,
        /// Number of bytes to copy.
        len: u16,
    },
}

impl Operation {
    /// Create a literal operation.
    pub fn literal(byte: u8) -> Self {
        Self::Literal(byte)
    }

    /// Create a match operation.
    pub fn new_match(distance: u32, len: usize) -> Self {
        Self::Match {
            distance,
            len: len as u16,
        }
    }

    /// Number of input bytes the operation covers.
    pub fn len(&self) -> usize {
        match *self {
            Self::Literal(_) => 1,
            Self::Match { len, .. } => len as usize,
        }
    }

    /// Operations always cover at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns true for a match.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    /// Check the operation against the format bounds.
    ///
    /// Returns a description of the violated bound. Encountering an invalid
    /// operation means the encoder itself is broken.
    pub fn verify(&self) -> std::result::Result<(), &'static str> {
        match *self {
            Self::Literal(_) => Ok(()),
            Self::Match { distance, len } => {
                if !(MIN_DISTANCE..=MAX_DISTANCE).contains(&distance) {
                    return Err("operation distance out of range");
                }
                if !(MIN_MATCH_LEN..=MAX_MATCH_LEN).contains(&(len as usize)) {
                    return Err("operation length out of range");
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Literal(c) => {
                let shown = if c.is_ascii_graphic() || c == b' ' {
                    c as char
                } else {
                    '.'
                };
                write!(f, "L{{{}/{:02x}}}", shown, c)
            }
            Self::Match { distance, len } => write!(f, "M{{{},{}}}", distance, len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_match_len() {
        assert_eq!(MAX_MATCH_LEN, 273);
    }

    #[test]
    fn test_literal_always_valid() {
        for c in [0u8, b'a', 0xFF] {
            assert!(Operation::literal(c).verify().is_ok());
            assert_eq!(Operation::literal(c).len(), 1);
            assert!(!Operation::literal(c).is_match());
        }
    }

    #[test]
    fn test_match_bounds() {
        assert!(Operation::new_match(1, 2).verify().is_ok());
        let longest = Operation::new_match(MAX_DISTANCE, MAX_MATCH_LEN);
        assert!(longest.verify().is_ok());
        assert!(longest.is_match());

        assert!(Operation::new_match(0, 2).verify().is_err());
        assert!(Operation::new_match(1, 1).verify().is_err());
        assert!(Operation::new_match(1, MAX_MATCH_LEN + 1).verify().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::literal(b'a').to_string(), "L{a/61}");
        assert_eq!(Operation::literal(0x0a).to_string(), "L{./0a}");
        assert_eq!(Operation::new_match(12, 5).to_string(), "M{12,5}");
    }
}
