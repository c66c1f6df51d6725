//! The `DataType` capability: size rule, encode and decode for one value kind

use std::fmt;
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::value::Value;

/// How many bytes a codec occupies on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRule {
    /// Same byte count for every value
    Fixed(usize),
    /// Depends on the value; see [`DataType::size_of`]
    Computed,
}

/// Size, encode and decode for one wire-representable value kind.
///
/// Implementations must advance the cursor by exactly `size_of(value)` bytes
/// when encoding `value`, and by the same count when decoding it back. The
/// two-pass create path (size, allocate, write) relies on this.
pub trait DataType: fmt::Debug + Send + Sync {
    /// Codec name, reported in type mismatch errors
    fn name(&self) -> &'static str;

    /// Fixed byte count, or `Computed` if it depends on the value
    fn size(&self) -> SizeRule;

    /// Encoded length of `value`
    ///
    /// Codecs with a computed size rule override this.
    fn size_of(&self, _value: &Value) -> Result<usize> {
        match self.size() {
            SizeRule::Fixed(n) => Ok(n),
            SizeRule::Computed => Err(Error::Unsized(self.name())),
        }
    }

    /// Write `value` at the cursor
    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()>;

    /// Read a value at the cursor
    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value>;

    /// Build the mismatch error for a value this codec cannot encode
    fn mismatch(&self, value: &Value) -> Error {
        Error::TypeMismatch {
            expected: self.name(),
            found: value.kind(),
        }
    }
}

macro_rules! forward_data_type {
    ($($ptr:ident),*) => {
        $(
            impl<T: DataType + ?Sized> DataType for $ptr<T> {
                #[inline]
                fn name(&self) -> &'static str {
                    (**self).name()
                }

                #[inline]
                fn size(&self) -> SizeRule {
                    (**self).size()
                }

                #[inline]
                fn size_of(&self, value: &Value) -> Result<usize> {
                    (**self).size_of(value)
                }

                #[inline]
                fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
                    (**self).encode(value, buf, cursor)
                }

                #[inline]
                fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
                    (**self).decode(buf, cursor)
                }
            }
        )*
    };
}

forward_data_type!(Arc, Box);

/// Bounds-checked mutable window of `len` bytes at the cursor
#[inline]
pub(crate) fn claim<'b>(buf: &'b mut [u8], cursor: &mut Cursor, len: usize) -> Result<&'b mut [u8]> {
    let start = cursor.offset();
    let end = start.checked_add(len).ok_or(Error::ShortBuffer)?;
    if end > buf.len() {
        return Err(Error::ShortBuffer);
    }
    cursor.advance(len);
    Ok(&mut buf[start..end])
}

/// Bounds-checked window of `len` bytes at the cursor
#[inline]
pub(crate) fn take<'b>(buf: &'b [u8], cursor: &mut Cursor, len: usize) -> Result<&'b [u8]> {
    let start = cursor.offset();
    let end = start.checked_add(len).ok_or(Error::UnexpectedEof)?;
    if end > buf.len() {
        return Err(Error::UnexpectedEof);
    }
    cursor.advance(len);
    Ok(&buf[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_advances_cursor() {
        let mut buf = [0u8; 4];
        let mut cursor = Cursor::new();
        claim(&mut buf, &mut cursor, 3).unwrap().copy_from_slice(&[1, 2, 3]);
        assert_eq!(cursor.offset(), 3);
        assert_eq!(claim(&mut buf, &mut cursor, 2), Err(Error::ShortBuffer));
        assert_eq!(cursor.offset(), 3);
        assert_eq!(buf, [1, 2, 3, 0]);
    }

    #[test]
    fn test_take_past_end() {
        let buf = [9u8; 2];
        let mut cursor = Cursor::new();
        assert_eq!(take(&buf, &mut cursor, 2).unwrap(), &[9, 9]);
        assert_eq!(take(&buf, &mut cursor, 1), Err(Error::UnexpectedEof));
    }
}
