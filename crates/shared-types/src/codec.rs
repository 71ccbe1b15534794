//! # Big-Endian Codec Helpers
//!
//! Cursor-style reader and append-only writer used by the parcel header and
//! every message variant. All integers are big-endian; variable-length
//! fields carry a 4-byte length prefix.

use crate::errors::CodecError;

/// Cursor over a borrowed buffer. Each read slices off the front.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Wrap a buffer.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Unconsumed tail.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    /// Look at the next byte without consuming it.
    #[must_use]
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.first().copied()
    }

    /// Take `n` raw bytes.
    pub fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], CodecError> {
        if self.buf.len() < n {
            return Err(CodecError::Truncated {
                field,
                needed: n,
                remaining: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Take a fixed-size array.
    pub fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        Ok(self.array::<1>(field)?[0])
    }

    pub fn u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.array(field)?))
    }

    pub fn u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.array(field)?))
    }

    pub fn u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.array(field)?))
    }

    /// Take a `u32` length followed by that many bytes.
    pub fn prefixed(&mut self, field: &'static str) -> Result<&'a [u8], CodecError> {
        let len = self.u32(field)? as usize;
        self.take(field, len)
    }

    /// Take a length-prefixed UTF-8 string.
    pub fn prefixed_str(&mut self, field: &'static str) -> Result<String, CodecError> {
        let bytes = self.prefixed(field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field })
    }
}

/// Append-only big-endian writer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(v);
        self
    }

    /// Write a `u32` length prefix followed by the bytes.
    ///
    /// Callers bound `v` well below `u32::MAX` (parcel payloads are capped
    /// at 512 KiB).
    pub fn put_prefixed(&mut self, v: &[u8]) -> &mut Self {
        self.put_u32(v.len() as u32);
        self.put_bytes(v)
    }

    pub fn put_prefixed_str(&mut self, v: &str) -> &mut Self {
        self.put_prefixed(v.as_bytes())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Overwrite four bytes at `offset` with a big-endian `u32`.
    /// Out-of-range offsets are ignored.
    pub fn patch_u32(&mut self, offset: usize, v: u32) {
        if let Some(slot) = self.buf.get_mut(offset..offset + 4) {
            slot.copy_from_slice(&v.to_be_bytes());
        }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
