//! Primitive reads over a JFR chunk.
//!
//! Version 2 chunks may store integers LEB128-compressed (up to 9 bytes,
//! the last byte contributing a full 8 bits). Otherwise integers are
//! fixed-width big-endian. Floats and bytes are never compressed.

use crate::utils::error::DecodeError;
use byteorder::{BigEndian, ByteOrder};

pub(crate) type Result<T> = std::result::Result<T, DecodeError>;

pub(crate) fn invalid(msg: impl Into<String>) -> DecodeError {
    DecodeError::Jfr(msg.into())
}

#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    compressed: bool,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8], compressed: bool) -> Self {
        Self {
            buf,
            pos: 0,
            compressed,
        }
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the buffer
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(invalid(format!(
                "seek to {} past end of chunk ({} bytes)",
                pos,
                self.buf.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                invalid(format!(
                    "unexpected end of data reading {} bytes at offset {}",
                    n, self.pos
                ))
            })?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn boolean(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    fn varint(&mut self) -> Result<u64> {
        let mut result = 0u64;
        for i in 0..8 {
            let b = self.u8()?;
            result |= u64::from(b & 0x7f) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(result);
            }
        }
        let b = self.u8()?;
        Ok(result | (u64::from(b) << 56))
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        if self.compressed {
            return Ok(self.varint()? as i16);
        }
        Ok(BigEndian::read_i16(self.bytes(2)?))
    }

    pub(crate) fn char(&mut self) -> Result<u16> {
        if self.compressed {
            return Ok(self.varint()? as u16);
        }
        Ok(BigEndian::read_u16(self.bytes(2)?))
    }

    pub(crate) fn int(&mut self) -> Result<i32> {
        if self.compressed {
            return Ok(self.varint()? as i32);
        }
        Ok(BigEndian::read_i32(self.bytes(4)?))
    }

    pub(crate) fn long(&mut self) -> Result<i64> {
        if self.compressed {
            return Ok(self.varint()? as i64);
        }
        Ok(BigEndian::read_i64(self.bytes(8)?))
    }

    pub(crate) fn float(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.bytes(4)?))
    }

    pub(crate) fn double(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.bytes(8)?))
    }

    /// Element count of an array or table
    pub(crate) fn count(&mut self) -> Result<usize> {
        let n = self.int()?;
        usize::try_from(n).map_err(|_| invalid(format!("negative count {}", n)))
    }
}
