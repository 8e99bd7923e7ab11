//! A fixed-capacity, on-disk string used to embed names directly inside a
//! `Codec` value (§9: the source's `string32`/`string64` fixed-width
//! buffers for usernames, station names, and train ids, kept here instead
//! of a heap `String` so `User`/`Train`/`Order` stay `Copy` and fit inside a
//! B+-tree leaf page record).

use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use storage::record::{Bounded, Codec};

#[derive(Debug, Error)]
pub enum FixedStrError {
    #[error("string {0:?} ({1} bytes) exceeds the {2}-byte fixed capacity")]
    TooLong(String, usize, usize),
}

/// A string of at most `N` bytes, stored as a length byte plus an `N`-byte
/// buffer. Ordering compares `(len, bytes)`, which is a valid total order
/// for `Codec`'s purposes (duplicate detection, sentinel comparison) even
/// though it is not the same order as a lexicographic string compare.
#[derive(Clone, Copy)]
pub struct FixedStr<const N: usize> {
    len: u8,
    bytes: [u8; N],
}

impl<const N: usize> FixedStr<N> {
    pub fn new(s: &str) -> Result<Self, FixedStrError> {
        let b = s.as_bytes();
        if b.len() > N || b.len() > u8::MAX as usize {
            return Err(FixedStrError::TooLong(s.to_string(), b.len(), N));
        }
        let mut bytes = [0u8; N];
        bytes[..b.len()].copy_from_slice(b);
        Ok(Self {
            len: b.len() as u8,
            bytes,
        })
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self {
            len: 0,
            bytes: [0u8; N],
        }
    }
}

impl<const N: usize> PartialEq for FixedStr<N> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bytes == other.bytes
    }
}
impl<const N: usize> Eq for FixedStr<N> {}

impl<const N: usize> PartialOrd for FixedStr<N> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<const N: usize> Ord for FixedStr<N> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.len, self.bytes).cmp(&(other.len, other.bytes))
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedStr({:?})", self.as_str())
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<const N: usize> Codec for FixedStr<N> {
    const WIDTH: usize = 1 + N;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(self.len)?;
        w.write_all(&self.bytes)
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        let len = r.read_u8()?;
        let mut bytes = [0u8; N];
        r.read_exact(&mut bytes)?;
        Ok(Self { len, bytes })
    }
}

impl<const N: usize> Bounded for FixedStr<N> {
    const MAX: Self = Self {
        len: u8::MAX,
        bytes: [0xFFu8; N],
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let s = FixedStr::<16>::new("alice").unwrap();
        let mut buf = Vec::new();
        s.encode(&mut buf).unwrap();
        let decoded = FixedStr::<16>::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded.as_str(), "alice");
    }

    #[test]
    fn rejects_strings_over_capacity() {
        assert!(FixedStr::<4>::new("toolong").is_err());
    }

    #[test]
    fn max_sorts_above_real_values() {
        let s = FixedStr::<8>::new("zzzzzzz").unwrap();
        assert!(s < FixedStr::<8>::MAX);
    }
}
