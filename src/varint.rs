//! Variable-length integer encoding
//!
//! 7 payload bits per byte, least-significant group first, bit 7 set on every
//! byte except the last. Used on its own and for every length/count prefix.
//!
//! Decoding never reads more than [`MAX_VARINT_SIZE`] bytes. By default an
//! over-long or over-wide encoding is truncated to 64 bits, matching deployed
//! peers; [`VarInt::strict`] reports [`Error::VarIntOverflow`] instead.

use crate::cursor::Cursor;
use crate::datatype::{DataType, SizeRule};
use crate::error::{Error, Result};
use crate::value::Value;

/// Maximum bytes a u64 varint occupies (and the most a decode will read)
pub const MAX_VARINT_SIZE: usize = 10;

/// Number of bytes `value` encodes to
#[inline]
pub const fn size_u64(value: u64) -> usize {
    let mut value = value;
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

/// Encode a u64 as varint into the given buffer
///
/// Returns the number of bytes written, or Error::ShortBuffer if insufficient space.
#[inline]
pub fn encode_u64(value: u64, buf: &mut [u8]) -> Result<usize> {
    let mut value = value;
    let mut pos = 0;

    loop {
        if pos >= buf.len() {
            return Err(Error::ShortBuffer);
        }

        if value < 0x80 {
            buf[pos] = value as u8;
            return Ok(pos + 1);
        }

        buf[pos] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        pos += 1;
    }
}

/// Decode a varint, truncating anything past 64 bits
///
/// Returns (value, bytes_consumed).
#[inline]
pub fn decode_u64(buf: &[u8]) -> Result<(u64, usize)> {
    decode_capped(buf).map(|(value, len, _)| (value, len))
}

/// Decode a varint, rejecting encodings that do not fit in 64 bits
///
/// Returns (value, bytes_consumed).
#[inline]
pub fn decode_u64_strict(buf: &[u8]) -> Result<(u64, usize)> {
    match decode_capped(buf)? {
        (_, _, true) => Err(Error::VarIntOverflow),
        (value, len, false) => Ok((value, len)),
    }
}

/// Returns (value, bytes_consumed, overflowed)
fn decode_capped(buf: &[u8]) -> Result<(u64, usize, bool)> {
    let mut result = 0u64;
    let mut shift = 0u32;
    let mut overflowed = false;

    for pos in 0..MAX_VARINT_SIZE {
        let byte = *buf.get(pos).ok_or(Error::UnexpectedEof)?;

        // Only one payload bit of the 10th byte fits in a u64.
        if pos == MAX_VARINT_SIZE - 1 && byte > 1 {
            overflowed = true;
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Ok((result, pos + 1, overflowed));
        }

        shift += 7;
    }

    Ok((result, MAX_VARINT_SIZE, true))
}

/// Write a varint at the cursor
#[inline]
pub fn write(value: u64, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
    let remaining = buf.get_mut(cursor.offset()..).ok_or(Error::ShortBuffer)?;
    let len = encode_u64(value, remaining)?;
    cursor.advance(len);
    Ok(())
}

/// Read a varint at the cursor, truncating past 64 bits
#[inline]
pub fn read(buf: &[u8], cursor: &mut Cursor) -> Result<u64> {
    let remaining = buf.get(cursor.offset()..).ok_or(Error::UnexpectedEof)?;
    let (value, len) = decode_u64(remaining)?;
    cursor.advance(len);
    Ok(value)
}

/// Read a length or count prefix
#[inline]
pub(crate) fn read_len(buf: &[u8], cursor: &mut Cursor) -> Result<usize> {
    usize::try_from(read(buf, cursor)?).map_err(|_| Error::UnexpectedEof)
}

/// What a [`VarInt`] codec does with encodings wider than 64 bits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Keep the low 64 bits
    #[default]
    Truncate,
    /// Fail with [`Error::VarIntOverflow`]
    Reject,
}

/// Variable-length unsigned integer codec over [`Value::VarInt`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VarInt {
    overflow: Overflow,
}

impl VarInt {
    /// Lenient codec: capped read, silent truncation
    pub const fn new() -> Self {
        Self {
            overflow: Overflow::Truncate,
        }
    }

    /// Capped read that reports overflow as an error
    pub const fn strict() -> Self {
        Self {
            overflow: Overflow::Reject,
        }
    }

    /// Overflow policy of this codec
    pub const fn overflow(&self) -> Overflow {
        self.overflow
    }

    /// Read a typed value at the cursor using this codec's overflow policy
    pub fn read_u64(&self, buf: &[u8], cursor: &mut Cursor) -> Result<u64> {
        let remaining = buf.get(cursor.offset()..).ok_or(Error::UnexpectedEof)?;
        let (value, len) = match self.overflow {
            Overflow::Truncate => decode_u64(remaining)?,
            Overflow::Reject => decode_u64_strict(remaining)?,
        };
        cursor.advance(len);
        Ok(value)
    }
}

impl DataType for VarInt {
    fn name(&self) -> &'static str {
        "varint"
    }

    fn size(&self) -> SizeRule {
        SizeRule::Computed
    }

    fn size_of(&self, value: &Value) -> Result<usize> {
        match *value {
            Value::VarInt(v) => Ok(size_u64(v)),
            _ => Err(self.mismatch(value)),
        }
    }

    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match *value {
            Value::VarInt(v) => write(v, buf, cursor),
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
        self.read_u64(buf, cursor).map(Value::VarInt)
    }
}
