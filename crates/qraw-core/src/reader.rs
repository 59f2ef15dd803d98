//! Byte cursor over a memory-mapped raw file
//!
//! The header of a raw file is line-oriented UTF-8 text; everything after the
//! data sentinel belongs to the payload decoder. The cursor walks the text
//! part line by line and hands the untouched remainder to the caller.

use crate::types::{RawError, Result};

pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Everything not yet consumed, without advancing
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Next text line without the trailing newline (a trailing `\r` is
    /// stripped as well). Returns `None` at end of input.
    pub fn read_line(&mut self) -> Result<Option<&'a str>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }

        let rest = &self.data[self.pos..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;

        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };

        std::str::from_utf8(line)
            .map(Some)
            .map_err(|_| RawError::Format("header is not valid UTF-8".into()))
    }
}
