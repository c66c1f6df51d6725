//! Composite codecs built from other codecs
//!
//! Every composite writes a varint length or count prefix before its payload,
//! so variable-length content needs no terminator.
//!
//! | Codec | Payload | Size |
//! |---|---|---|
//! | [`Bytes`] | raw bytes | varint(len) + len |
//! | [`Str`] | one byte per code point, or UTF-8 | varint(len) + len |
//! | [`ArrayOf`] | each element with the element codec | varint(count) + Σ element |
//! | [`StructArray`] | each element as a full field pass | varint(count) + Σ record |
//! | [`MapOf`] | key then value, in key order | varint(count) + Σ (key + value) |

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::datatype::{claim, take, DataType, SizeRule};
use crate::definition::FieldDefinition;
use crate::error::{Error, Result};
use crate::primitive::{Int16, Int32, Int8, UInt16, UInt32, UInt8};
use crate::value::{MapKey, Value};
use crate::varint::{self, VarInt};

/// Upper bound for a decoded collection's preallocation. Array elements and map
/// keys take at least one byte each, so a count larger than the rest of the
/// buffer is bogus.
#[inline]
fn capacity_hint(count: usize, buf: &[u8], cursor: &Cursor) -> usize {
    count.min(buf.len().saturating_sub(cursor.offset()))
}

/// Length-prefixed raw byte sequence
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Bytes;

impl Bytes {
    /// Encoded length of `bytes`
    #[inline]
    pub fn size_bytes(bytes: &[u8]) -> usize {
        varint::size_u64(bytes.len() as u64) + bytes.len()
    }

    /// Write `bytes` with its length prefix
    #[inline]
    pub fn write(bytes: &[u8], buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        varint::write(bytes.len() as u64, buf, cursor)?;
        claim(buf, cursor, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Read a length-prefixed byte sequence, borrowing from `buf`
    #[inline]
    pub fn read<'b>(buf: &'b [u8], cursor: &mut Cursor) -> Result<&'b [u8]> {
        let len = varint::read_len(buf, cursor)?;
        take(buf, cursor, len)
    }
}

impl DataType for Bytes {
    fn name(&self) -> &'static str {
        "bytes"
    }

    fn size(&self) -> SizeRule {
        SizeRule::Computed
    }

    fn size_of(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Bytes(bytes) => Ok(Self::size_bytes(bytes)),
            _ => Err(self.mismatch(value)),
        }
    }

    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match value {
            Value::Bytes(bytes) => Self::write(bytes, buf, cursor),
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
        Self::read(buf, cursor).map(|bytes| Value::Bytes(bytes.to_vec()))
    }
}

/// Byte layout of a [`Str`] codec
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    /// One byte per code point, prefixed with the code point count.
    /// Code points above 255 keep only their low byte.
    #[default]
    Latin1,
    /// UTF-8 bytes prefixed with the byte count
    Utf8,
}

/// Length-prefixed text
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Str {
    encoding: StringEncoding,
}

impl Str {
    /// One byte per code point; wire compatible with existing peers
    pub const fn latin1() -> Self {
        Self {
            encoding: StringEncoding::Latin1,
        }
    }

    /// UTF-8 payload, validated on decode
    pub const fn utf8() -> Self {
        Self {
            encoding: StringEncoding::Utf8,
        }
    }

    /// Encoding used by this codec
    pub const fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// Encoded length of `s`
    pub fn size_str(&self, s: &str) -> usize {
        let len = match self.encoding {
            StringEncoding::Latin1 => s.chars().count(),
            StringEncoding::Utf8 => s.len(),
        };
        varint::size_u64(len as u64) + len
    }

    /// Write `s` with its length prefix
    pub fn write_str(&self, s: &str, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match self.encoding {
            StringEncoding::Latin1 => {
                let len = s.chars().count();
                varint::write(len as u64, buf, cursor)?;
                let out = claim(buf, cursor, len)?;
                for (slot, c) in out.iter_mut().zip(s.chars()) {
                    *slot = c as u32 as u8;
                }
                Ok(())
            }
            StringEncoding::Utf8 => Bytes::write(s.as_bytes(), buf, cursor),
        }
    }

    /// Read a length-prefixed string
    pub fn read_string(&self, buf: &[u8], cursor: &mut Cursor) -> Result<String> {
        let bytes = Bytes::read(buf, cursor)?;
        match self.encoding {
            StringEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            StringEncoding::Utf8 => core::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| Error::InvalidUtf8),
        }
    }
}

impl DataType for Str {
    fn name(&self) -> &'static str {
        "str"
    }

    fn size(&self) -> SizeRule {
        SizeRule::Computed
    }

    fn size_of(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Str(s) => Ok(self.size_str(s)),
            _ => Err(self.mismatch(value)),
        }
    }

    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match value {
            Value::Str(s) => self.write_str(s, buf, cursor),
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
        self.read_string(buf, cursor).map(Value::Str)
    }
}

/// Count-prefixed array, each element encoded with `T`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArrayOf<T> {
    element: T,
}

impl<T: DataType> ArrayOf<T> {
    /// Array of elements encoded with `element`
    pub fn new(element: T) -> Self {
        Self { element }
    }

    /// Element codec
    pub fn element(&self) -> &T {
        &self.element
    }

    /// Zero-width elements would let a bare count prefix stand for any
    /// number of values.
    fn check_width(&self) -> Result<()> {
        match self.element.size() {
            SizeRule::Fixed(0) => Err(Error::ZeroWidth(self.element.name())),
            _ => Ok(()),
        }
    }
}

impl<T: DataType> DataType for ArrayOf<T> {
    fn name(&self) -> &'static str {
        "array"
    }

    fn size(&self) -> SizeRule {
        SizeRule::Computed
    }

    fn size_of(&self, value: &Value) -> Result<usize> {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(self.mismatch(value)),
        };
        self.check_width()?;

        let prefix = varint::size_u64(items.len() as u64);
        match self.element.size() {
            SizeRule::Fixed(n) => Ok(prefix + n * items.len()),
            SizeRule::Computed => items
                .iter()
                .try_fold(prefix, |acc, item| -> Result<usize> {
                    Ok(acc + self.element.size_of(item)?)
                }),
        }
    }

    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(self.mismatch(value)),
        };
        self.check_width()?;

        varint::write(items.len() as u64, buf, cursor)?;
        for item in items {
            self.element.encode(item, buf, cursor)?;
        }
        Ok(())
    }

    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
        self.check_width()?;
        let count = varint::read_len(buf, cursor)?;
        let mut items = Vec::with_capacity(capacity_hint(count, buf, cursor));
        for _ in 0..count {
            items.push(self.element.decode(buf, cursor)?);
        }
        Ok(Value::Array(items))
    }
}

/// Count-prefixed array of records, each a full pass over one definition
pub type StructArray = ArrayOf<Arc<FieldDefinition>>;

/// Struct array over `definition`
pub fn struct_array(definition: impl Into<Arc<FieldDefinition>>) -> StructArray {
    ArrayOf::new(definition.into())
}

mod sealed {
    pub trait Sealed {}
}

/// Codecs allowed as map keys: strings and integers.
///
/// Structural and floating point codecs have no stable key encoding and do
/// not implement this trait.
pub trait KeyType: DataType + sealed::Sealed {
    /// Encoded length of `key`
    fn key_size(&self, key: &MapKey) -> Result<usize>;

    /// Write `key` at the cursor
    fn encode_key(&self, key: &MapKey, buf: &mut [u8], cursor: &mut Cursor) -> Result<()>;

    /// Read a key at the cursor
    fn decode_key(&self, buf: &[u8], cursor: &mut Cursor) -> Result<MapKey>;

    /// Build the mismatch error for a key this codec cannot encode
    fn key_mismatch(&self, key: &MapKey) -> Error {
        Error::TypeMismatch {
            expected: self.name(),
            found: key.kind(),
        }
    }
}

macro_rules! fixed_key {
    ($($codec:ident => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $codec {}

            impl KeyType for $codec {
                fn key_size(&self, key: &MapKey) -> Result<usize> {
                    match key {
                        MapKey::$variant(_) => Ok(Self::SIZE),
                        _ => Err(self.key_mismatch(key)),
                    }
                }

                fn encode_key(&self, key: &MapKey, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
                    match *key {
                        MapKey::$variant(v) => Self::write(v, buf, cursor),
                        _ => Err(self.key_mismatch(key)),
                    }
                }

                fn decode_key(&self, buf: &[u8], cursor: &mut Cursor) -> Result<MapKey> {
                    Self::read(buf, cursor).map(MapKey::$variant)
                }
            }
        )*
    };
}

fixed_key! {
    Int8 => I8,
    UInt8 => U8,
    Int16 => I16,
    UInt16 => U16,
    Int32 => I32,
    UInt32 => U32,
}

impl sealed::Sealed for VarInt {}

impl KeyType for VarInt {
    fn key_size(&self, key: &MapKey) -> Result<usize> {
        match *key {
            MapKey::VarInt(v) => Ok(varint::size_u64(v)),
            _ => Err(self.key_mismatch(key)),
        }
    }

    fn encode_key(&self, key: &MapKey, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match *key {
            MapKey::VarInt(v) => varint::write(v, buf, cursor),
            _ => Err(self.key_mismatch(key)),
        }
    }

    fn decode_key(&self, buf: &[u8], cursor: &mut Cursor) -> Result<MapKey> {
        self.read_u64(buf, cursor).map(MapKey::VarInt)
    }
}

impl sealed::Sealed for Str {}

impl KeyType for Str {
    fn key_size(&self, key: &MapKey) -> Result<usize> {
        match key {
            MapKey::Str(s) => Ok(self.size_str(s)),
            _ => Err(self.key_mismatch(key)),
        }
    }

    fn encode_key(&self, key: &MapKey, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match key {
            MapKey::Str(s) => self.write_str(s, buf, cursor),
            _ => Err(self.key_mismatch(key)),
        }
    }

    fn decode_key(&self, buf: &[u8], cursor: &mut Cursor) -> Result<MapKey> {
        self.read_string(buf, cursor).map(MapKey::Str)
    }
}

/// Count-prefixed key/value map.
///
/// Entries are written in key order, since map values are `BTreeMap`s, and
/// decoded by plain insertion in the order read; a repeated key keeps the
/// last value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapOf<K, V> {
    key: K,
    value: V,
}

impl<K: KeyType, V: DataType> MapOf<K, V> {
    /// Map with keys encoded by `key` and values by `value`
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    fn entries<'v>(&self, value: &'v Value) -> Result<&'v BTreeMap<MapKey, Value>> {
        match value {
            Value::Map(entries) => Ok(entries),
            _ => Err(self.mismatch(value)),
        }
    }
}

impl<K: KeyType, V: DataType> DataType for MapOf<K, V> {
    fn name(&self) -> &'static str {
        "map"
    }

    fn size(&self) -> SizeRule {
        SizeRule::Computed
    }

    fn size_of(&self, value: &Value) -> Result<usize> {
        let entries = self.entries(value)?;
        entries
            .iter()
            .try_fold(varint::size_u64(entries.len() as u64), |acc, (k, v)| -> Result<usize> {
                Ok(acc + self.key.key_size(k)? + self.value.size_of(v)?)
            })
    }

    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        let entries = self.entries(value)?;
        varint::write(entries.len() as u64, buf, cursor)?;
        for (k, v) in entries {
            self.key.encode_key(k, buf, cursor)?;
            self.value.encode(v, buf, cursor)?;
        }
        Ok(())
    }

    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
        let count = varint::read_len(buf, cursor)?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let k = self.key.decode_key(buf, cursor)?;
            let v = self.value.decode(buf, cursor)?;
            entries.insert(k, v);
        }
        Ok(Value::Map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Bool;
    use crate::value::Record;
    use proptest::prelude::*;

    fn to_bytes<T: DataType>(codec: &T, value: &Value) -> Vec<u8> {
        let mut buf = vec![0u8; codec.size_of(value).unwrap()];
        let mut cursor = Cursor::new();
        codec.encode(value, &mut buf, &mut cursor).unwrap();
        assert_eq!(cursor.offset(), buf.len());
        buf
    }

    fn from_bytes<T: DataType>(codec: &T, buf: &[u8]) -> Value {
        let mut cursor = Cursor::new();
        let value = codec.decode(buf, &mut cursor).unwrap();
        assert_eq!(cursor.offset(), buf.len());
        value
    }

    #[test]
    fn test_bytes_layout() {
        let value = Value::Bytes(vec![0xDE, 0xAD]);
        assert_eq!(to_bytes(&Bytes, &value), [0x02, 0xDE, 0xAD]);
        assert_eq!(from_bytes(&Bytes, &[0x02, 0xDE, 0xAD]), value);
        assert_eq!(to_bytes(&Bytes, &Value::Bytes(vec![])), [0x00]);
    }

    #[test]
    fn test_bytes_long_prefix() {
        let value = Value::Bytes(vec![7; 200]);
        let bytes = to_bytes(&Bytes, &value);
        assert_eq!(&bytes[..2], &[0xC8, 0x01]);
        assert_eq!(bytes.len(), 202);
        assert_eq!(from_bytes(&Bytes, &bytes), value);
    }

    #[test]
    fn test_latin1_string() {
        let codec = Str::latin1();
        assert_eq!(to_bytes(&codec, &Value::from("ab")), [0x02, 0x61, 0x62]);
        assert_eq!(to_bytes(&codec, &Value::from("é")), [0x01, 0xE9]);
        assert_eq!(from_bytes(&codec, &[0x01, 0xE9]), Value::from("é"));
    }

    #[test]
    fn test_latin1_truncates_wide_code_points() {
        let codec = Str::latin1();
        // U+20AC keeps only its low byte.
        assert_eq!(codec.size_str("€"), 2);
        assert_eq!(to_bytes(&codec, &Value::from("€")), [0x01, 0xAC]);
        assert_eq!(from_bytes(&codec, &[0x01, 0xAC]), Value::from("\u{AC}"));
    }

    #[test]
    fn test_utf8_string() {
        let codec = Str::utf8();
        let value = Value::from("€x");
        let bytes = to_bytes(&codec, &value);
        assert_eq!(bytes, [0x04, 0xE2, 0x82, 0xAC, 0x78]);
        assert_eq!(from_bytes(&codec, &bytes), value);

        let mut cursor = Cursor::new();
        assert_eq!(
            codec.decode(&[0x01, 0xFF], &mut cursor),
            Err(Error::InvalidUtf8)
        );
    }

    #[test]
    fn test_string_length_prefix_overruns() {
        let mut cursor = Cursor::new();
        assert_eq!(
            Str::latin1().decode(&[0x05, 0x61], &mut cursor),
            Err(Error::UnexpectedEof)
        );
    }

    #[test]
    fn test_array_of_fixed() {
        let codec = ArrayOf::new(UInt16);
        let value = Value::Array(vec![Value::U16(1), Value::U16(0x0203)]);
        assert_eq!(codec.size_of(&value).unwrap(), 5);
        assert_eq!(to_bytes(&codec, &value), [0x02, 0x00, 0x01, 0x02, 0x03]);
        assert_eq!(from_bytes(&codec, &[0x02, 0x00, 0x01, 0x02, 0x03]), value);
    }

    #[test]
    fn test_array_of_strings() {
        let codec = ArrayOf::new(Str::latin1());
        let value = Value::Array(vec!["a".into(), "".into(), "xyz".into()]);
        let bytes = to_bytes(&codec, &value);
        assert_eq!(bytes, [0x03, 0x01, b'a', 0x00, 0x03, b'x', b'y', b'z']);
        assert_eq!(from_bytes(&codec, &bytes), value);
    }

    #[test]
    fn test_nested_arrays() {
        let codec = ArrayOf::new(ArrayOf::new(Bool));
        let value = Value::Array(vec![
            Value::Array(vec![true.into(), false.into()]),
            Value::Array(vec![]),
        ]);
        assert_eq!(from_bytes(&codec, &to_bytes(&codec, &value)), value);
    }

    #[test]
    fn test_array_element_mismatch() {
        let codec = ArrayOf::new(UInt8);
        let value = Value::Array(vec![Value::U8(1), Value::Str("x".into())]);
        let mut buf = [0u8; 8];
        let mut cursor = Cursor::new();
        assert!(matches!(
            codec.encode(&value, &mut buf, &mut cursor),
            Err(Error::TypeMismatch { expected: "uint8", .. })
        ));
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        // Count claims u32::MAX elements but the buffer ends immediately.
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        let mut cursor = Cursor::new();
        assert_eq!(
            ArrayOf::new(UInt8).decode(&buf, &mut cursor),
            Err(Error::UnexpectedEof)
        );
    }

    #[test]
    fn test_struct_array() {
        let point = FieldDefinition::builder()
            .field("x", Int16)
            .field("y", Int16)
            .build()
            .unwrap();
        let codec = struct_array(point);

        let value = Value::Array(vec![
            Record::new().with("x", 1i16).with("y", -1i16).into(),
            Record::new().with("x", 256i16).with("y", 0i16).into(),
        ]);
        let bytes = to_bytes(&codec, &value);
        assert_eq!(bytes, [0x02, 0x00, 0x01, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(from_bytes(&codec, &bytes), value);
        assert_eq!(from_bytes(&codec, &[0x00]), Value::Array(vec![]));
    }

    #[test]
    fn test_struct_array_rejects_zero_width_elements() {
        let codec = struct_array(FieldDefinition::builder().build().unwrap());
        let mut buf = [0u8; varint::MAX_VARINT_SIZE];
        let len = varint::encode_u64(u64::MAX, &mut buf).unwrap();

        let mut cursor = Cursor::new();
        assert_eq!(
            codec.decode(&buf[..len], &mut cursor),
            Err(Error::ZeroWidth("struct"))
        );
        assert_eq!(cursor.offset(), 0);

        let empty = Value::Array(vec![Record::new().into(); 3]);
        assert_eq!(codec.size_of(&empty), Err(Error::ZeroWidth("struct")));
        let mut out = [0u8; 4];
        assert_eq!(
            codec.encode(&empty, &mut out, &mut Cursor::new()),
            Err(Error::ZeroWidth("struct"))
        );
    }

    #[test]
    fn test_map_string_keys() {
        let codec = MapOf::new(Str::latin1(), UInt8);
        let mut entries = BTreeMap::new();
        entries.insert(MapKey::from("b"), Value::U8(2));
        entries.insert(MapKey::from("a"), Value::U8(1));
        let value = Value::Map(entries);

        let bytes = to_bytes(&codec, &value);
        assert_eq!(bytes, [0x02, 0x01, b'a', 0x01, 0x01, b'b', 0x02]);
        assert_eq!(from_bytes(&codec, &bytes), value);
    }

    #[test]
    fn test_map_duplicate_key_keeps_last() {
        let codec = MapOf::new(UInt8, Bool);
        let decoded = from_bytes(&codec, &[0x02, 0x07, 0x01, 0x07, 0x00]);
        let entries = decoded.as_map().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[&MapKey::U8(7)], Value::Bool(false));
    }

    #[test]
    fn test_map_key_mismatch() {
        let codec = MapOf::new(VarInt::new(), Bool);
        let mut entries = BTreeMap::new();
        entries.insert(MapKey::from("k"), Value::Bool(true));
        assert_eq!(
            codec.size_of(&Value::Map(entries)),
            Err(Error::TypeMismatch {
                expected: "varint",
                found: "str"
            })
        );
    }

    proptest! {
        #[test]
        fn prop_latin1_roundtrip(s in "[\\x00-\\xFF]{0,300}") {
            let codec = Str::latin1();
            let value = Value::Str(s);
            let bytes = to_bytes(&codec, &value);
            prop_assert_eq!(bytes.len(), codec.size_of(&value).unwrap());
            prop_assert_eq!(from_bytes(&codec, &bytes), value);
        }

        #[test]
        fn prop_map_roundtrip(entries in proptest::collection::btree_map(any::<u64>(), any::<i32>(), 0..64)) {
            let codec = MapOf::new(VarInt::new(), Int32);
            let value = Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (MapKey::VarInt(k), Value::I32(v)))
                    .collect(),
            );
            let bytes = to_bytes(&codec, &value);
            prop_assert_eq!(from_bytes(&codec, &bytes), value);
        }
    }
}
