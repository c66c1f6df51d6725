//! Fixed-width primitive codecs
//!
//! Every multi-byte primitive is big-endian. Each codec is a unit struct with
//! typed `read`/`write` functions plus a [`DataType`] impl over [`Value`].

use crate::cursor::Cursor;
use crate::datatype::{claim, take, DataType, SizeRule};
use crate::error::Result;
use crate::value::Value;

macro_rules! fixed_codec {
    ($(#[$doc:meta])* $codec:ident, $ty:ty, $variant:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $codec;

        impl $codec {
            /// Encoded width in bytes
            pub const SIZE: usize = core::mem::size_of::<$ty>();

            /// Write a value (big-endian) at the cursor
            #[inline]
            pub fn write(value: $ty, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
                claim(buf, cursor, Self::SIZE)?.copy_from_slice(&value.to_be_bytes());
                Ok(())
            }

            /// Read a value (big-endian) at the cursor
            #[inline]
            pub fn read(buf: &[u8], cursor: &mut Cursor) -> Result<$ty> {
                let mut bytes = [0u8; core::mem::size_of::<$ty>()];
                bytes.copy_from_slice(take(buf, cursor, Self::SIZE)?);
                Ok(<$ty>::from_be_bytes(bytes))
            }
        }

        impl DataType for $codec {
            fn name(&self) -> &'static str {
                $name
            }

            fn size(&self) -> SizeRule {
                SizeRule::Fixed(Self::SIZE)
            }

            fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
                match *value {
                    Value::$variant(v) => Self::write(v, buf, cursor),
                    _ => Err(self.mismatch(value)),
                }
            }

            fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
                Self::read(buf, cursor).map(Value::$variant)
            }
        }
    };
}

fixed_codec!(
    /// Signed 8-bit integer, two's complement
    Int8, i8, I8, "int8"
);
fixed_codec!(
    /// Unsigned 8-bit integer
    UInt8, u8, U8, "uint8"
);
fixed_codec!(
    /// Signed 16-bit integer, two's complement
    Int16, i16, I16, "int16"
);
fixed_codec!(
    /// Unsigned 16-bit integer
    UInt16, u16, U16, "uint16"
);
fixed_codec!(
    /// Signed 32-bit integer, two's complement
    Int32, i32, I32, "int32"
);
fixed_codec!(
    /// Unsigned 32-bit integer
    UInt32, u32, U32, "uint32"
);
fixed_codec!(
    /// IEEE-754 single precision float
    Float32, f32, F32, "float32"
);
fixed_codec!(
    /// IEEE-754 double precision float
    Float64, f64, F64, "float64"
);

/// Boolean as one byte. Writes `0`/`1`; any byte other than `1` reads as false.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bool;

impl Bool {
    /// Encoded width in bytes
    pub const SIZE: usize = 1;

    /// Write a boolean at the cursor
    #[inline]
    pub fn write(value: bool, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        UInt8::write(value as u8, buf, cursor)
    }

    /// Read a boolean at the cursor
    #[inline]
    pub fn read(buf: &[u8], cursor: &mut Cursor) -> Result<bool> {
        Ok(UInt8::read(buf, cursor)? == 1)
    }
}

impl DataType for Bool {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn size(&self) -> SizeRule {
        SizeRule::Fixed(Self::SIZE)
    }

    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match *value {
            Value::Bool(v) => Self::write(v, buf, cursor),
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
        Self::read(buf, cursor).map(Value::Bool)
    }
}
