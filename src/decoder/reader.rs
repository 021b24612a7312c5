//! Byte cursor over module input.
//!
//! All reads are bounds-checked and report failures as [`DecodeError`]s
//! carrying the byte offset at which the read started, so a caller can point
//! at the offending construct in the original input.

use byteorder::{ByteOrder, LittleEndian};

use super::{DecodeError, DecodeErrorKind};

pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Reader<'a> {
        Reader { bytes, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn has_at_least(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    /// Build a [`DecodeError`] at the current position.
    pub fn err(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError {
            offset: self.pos,
            kind,
        }
    }

    /// Build a [`DecodeError`] at an explicit position.
    pub fn err_at(&self, offset: usize, kind: DecodeErrorKind) -> DecodeError {
        DecodeError { offset, kind }
    }

    pub fn read_byte(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        match self.bytes.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                Ok(byte)
            }
            None => Err(self.err(DecodeErrorKind::UnexpectedEof(what))),
        }
    }

    pub fn read_bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        if !self.has_at_least(len) {
            return Err(self.err(DecodeErrorKind::UnexpectedEof(what)));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize, what: &'static str) -> Result<(), DecodeError> {
        if !self.has_at_least(len) {
            return Err(self.err(DecodeErrorKind::UnexpectedEof(what)));
        }
        self.pos += len;
        Ok(())
    }

    /// Fixed-width little-endian u32 (used only for the version field).
    pub fn read_u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4, what)?;
        Ok(LittleEndian::read_u32(bytes))
    }

    fn read_vu(&mut self, bits: u32, what: &'static str) -> Result<u64, DecodeError> {
        let start = self.pos;
        let max_bytes = (bits + 6) / 7;
        let mut result: u64 = 0;
        for i in 0..max_bytes {
            let byte = self.read_byte(what)?;
            let payload = (byte & 0x7f) as u64;
            // The final byte may only carry the bits that still fit.
            if i == max_bytes - 1 && payload >= 1 << (bits - 7 * (max_bytes - 1)) {
                return Err(self.err_at(start, DecodeErrorKind::BadInteger));
            }
            result |= payload << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(self.err_at(start, DecodeErrorKind::BadInteger))
    }

    pub fn read_vu64(&mut self, what: &'static str) -> Result<u64, DecodeError> {
        self.read_vu(64, what)
    }

    pub fn read_vu32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        self.read_vu(32, what).map(|v| v as u32)
    }

    /// Single-byte boolean flag (0 or 1).
    pub fn read_vu1(&mut self, what: &'static str) -> Result<bool, DecodeError> {
        let start = self.pos;
        match self.read_byte(what)? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(self.err_at(
                start,
                DecodeErrorKind::Malformed(format!("expected 0 or 1 flag, got {b}")),
            )),
        }
    }

    fn read_vs(&mut self, bits: u32, what: &'static str) -> Result<i64, DecodeError> {
        let start = self.pos;
        let max_bytes = (bits + 6) / 7;
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        for _ in 0..max_bytes {
            let byte = self.read_byte(what)?;
            result |= (((byte & 0x7f) as i64) << shift) as i64;
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 64 && (byte & 0x40) != 0 {
                    result |= -1i64 << shift;
                }
                if bits < 64 {
                    // Reject values outside the target range.
                    let min = -(1i64 << (bits - 1));
                    let max = (1i64 << (bits - 1)) - 1;
                    if result < min || result > max {
                        return Err(self.err_at(start, DecodeErrorKind::BadInteger));
                    }
                }
                return Ok(result);
            }
        }
        Err(self.err_at(start, DecodeErrorKind::BadInteger))
    }

    pub fn read_vs64(&mut self, what: &'static str) -> Result<i64, DecodeError> {
        self.read_vs(64, what)
    }

    pub fn read_vs32(&mut self, what: &'static str) -> Result<i32, DecodeError> {
        self.read_vs(32, what).map(|v| v as i32)
    }

    /// Signed 33-bit LEB128, used by block types.
    pub fn read_vs33(&mut self, what: &'static str) -> Result<i64, DecodeError> {
        self.read_vs(33, what)
    }

    pub fn read_f32(&mut self, what: &'static str) -> Result<f32, DecodeError> {
        let bytes = self.read_bytes(4, what)?;
        Ok(LittleEndian::read_f32(bytes))
    }

    pub fn read_f64(&mut self, what: &'static str) -> Result<f64, DecodeError> {
        let bytes = self.read_bytes(8, what)?;
        Ok(LittleEndian::read_f64(bytes))
    }

    /// Length-prefixed UTF-8 name.
    pub fn read_name(&mut self) -> Result<String, DecodeError> {
        let len = self.read_vu32("name length")? as usize;
        let start = self.pos;
        let bytes = self.read_bytes(len, "name bytes")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| self.err_at(start, DecodeErrorKind::InvalidUtf8))
    }

    /// Length-prefixed raw byte vector.
    pub fn read_byte_vec(&mut self, what: &'static str) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_vu32(what)? as usize;
        Ok(self.read_bytes(len, what)?.to_vec())
    }

    /// Reject a declared item count that could not possibly fit in the
    /// remaining input (each item needs at least one byte).
    pub fn check_count(&self, count: u32, what: &'static str) -> Result<(), DecodeError> {
        if count as usize > self.remaining() {
            return Err(DecodeError {
                offset: self.pos,
                kind: DecodeErrorKind::Malformed(format!(
                    "{what} count {count} exceeds remaining input"
                )),
            });
        }
        Ok(())
    }
}
