//! Growable String
//!
//! Names and paths used by actors, pages and the asset registry. On disk a
//! string is a little-endian `u16` length followed by the bytes and a
//! trailing NUL; the length counts the NUL, so the empty string is stored
//! as length 1.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BvrString {
    value: String,
}

impl BvrString {
    pub fn new(value: &str) -> Self {
        Self { value: value.to_string() }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Length in bytes, without the terminator.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Length as stored on disk (bytes plus the NUL terminator).
    pub fn len_prefixed(&self) -> usize {
        self.value.len() + 1
    }

    /// Append `other` to the end.
    pub fn concat(&mut self, other: &str) {
        self.value.push_str(other);
    }

    /// Insert `value` at byte `offset`.
    ///
    /// Offsets past the end append. An offset inside a multi-byte character
    /// moves back to the start of that character.
    pub fn insert(&mut self, offset: usize, value: &str) {
        let mut offset = offset.min(self.value.len());
        while !self.value.is_char_boundary(offset) {
            offset -= 1;
        }
        self.value.insert_str(offset, value);
    }

    /// Append the length-prefixed form to `out`.
    ///
    /// Strings longer than `u16::MAX - 1` bytes are truncated at a character
    /// boundary so the prefix stays valid.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut end = self.value.len().min(u16::MAX as usize - 1);
        while !self.value.is_char_boundary(end) {
            end -= 1;
        }
        out.extend_from_slice(&((end + 1) as u16).to_le_bytes());
        out.extend_from_slice(&self.value.as_bytes()[..end]);
        out.push(0);
    }

    /// Parse a length-prefixed string from the front of `bytes`.
    ///
    /// Returns the string and the number of bytes consumed, or `None` if the
    /// input is truncated. Everything from the first NUL on is dropped and
    /// invalid UTF-8 is replaced.
    pub fn read_from(bytes: &[u8]) -> Option<(Self, usize)> {
        let prefix: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
        let len = u16::from_le_bytes(prefix) as usize;
        let body = bytes.get(2..2 + len)?;
        let text = match body.iter().position(|&b| b == 0) {
            Some(nul) => &body[..nul],
            None => body,
        };
        let value = String::from_utf8_lossy(text).into_owned();
        Some((Self { value }, 2 + len))
    }
}

impl fmt::Display for BvrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for BvrString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BvrString {
    fn from(value: String) -> Self {
        Self { value }
    }
}

impl AsRef<str> for BvrString {
    fn as_ref(&self) -> &str {
        &self.value
    }
}
