//! Dynamic values carried through field definitions
//!
//! Primitive codecs have typed read/write functions of their own; `Value` is
//! what flows through heterogeneous layouts (records, arrays, maps).

use std::collections::BTreeMap;

/// A wire-representable value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Signed 8-bit integer
    I8(i8),
    /// Unsigned 8-bit integer
    U8(u8),
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Signed 32-bit integer
    I32(i32),
    /// Unsigned 32-bit integer
    U32(u32),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Variable-length unsigned integer
    VarInt(u64),
    /// Raw byte sequence
    Bytes(Vec<u8>),
    /// Text
    Str(String),
    /// Generic array or struct array elements
    Array(Vec<Value>),
    /// Nested struct
    Struct(Record),
    /// Key/value map
    Map(BTreeMap<MapKey, Value>),
}

impl Value {
    /// Short kind name used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I8(_) => "int8",
            Value::U8(_) => "uint8",
            Value::I16(_) => "int16",
            Value::U16(_) => "uint16",
            Value::I32(_) => "int32",
            Value::U32(_) => "uint32",
            Value::F32(_) => "float32",
            Value::F64(_) => "float64",
            Value::VarInt(_) => "varint",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "str",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Map(_) => "map",
        }
    }

    /// Widen any unsigned integer value to `u64`
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::U8(v) => Some(v as u64),
            Value::U16(v) => Some(v as u64),
            Value::U32(v) => Some(v as u64),
            Value::VarInt(v) => Some(v),
            _ => None,
        }
    }

    /// Widen any signed integer value to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Float value of either width
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow raw bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow array elements
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow a nested record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(record) => Some(record),
            _ => None,
        }
    }

    /// Borrow map entries
    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    f32 => F32,
    f64 => F64,
    u64 => VarInt,
    Vec<u8> => Bytes,
    String => Str,
    Vec<Value> => Array,
    Record => Struct,
    BTreeMap<MapKey, Value> => Map,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Str(s) => Value::Str(s),
            MapKey::I8(v) => Value::I8(v),
            MapKey::U8(v) => Value::U8(v),
            MapKey::I16(v) => Value::I16(v),
            MapKey::U16(v) => Value::U16(v),
            MapKey::I32(v) => Value::I32(v),
            MapKey::U32(v) => Value::U32(v),
            MapKey::VarInt(v) => Value::VarInt(v),
        }
    }
}

/// Map key: strings and integers only, so every key has one encoding
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// Text key
    Str(String),
    /// Signed 8-bit key
    I8(i8),
    /// Unsigned 8-bit key
    U8(u8),
    /// Signed 16-bit key
    I16(i16),
    /// Unsigned 16-bit key
    U16(u16),
    /// Signed 32-bit key
    I32(i32),
    /// Unsigned 32-bit key
    U32(u32),
    /// Variable-length key
    VarInt(u64),
}

impl MapKey {
    /// Short kind name used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            MapKey::Str(_) => "str",
            MapKey::I8(_) => "int8",
            MapKey::U8(_) => "uint8",
            MapKey::I16(_) => "int16",
            MapKey::U16(_) => "uint16",
            MapKey::I32(_) => "int32",
            MapKey::U32(_) => "uint32",
            MapKey::VarInt(_) => "varint",
        }
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::Str(v.to_owned())
    }
}

impl From<String> for MapKey {
    fn from(v: String) -> Self {
        MapKey::Str(v)
    }
}

impl From<u32> for MapKey {
    fn from(v: u32) -> Self {
        MapKey::U32(v)
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> Self {
        MapKey::VarInt(v)
    }
}

/// Field values keyed by field name
///
/// Wire order comes from the definition, never from the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = Record::new().with("name", "ab").with("user", 5u8);
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name").and_then(Value::as_str), Some("ab"));
        assert_eq!(record.get("user").and_then(Value::as_u64), Some(5));
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_record_insert_replaces() {
        let mut record = Record::new();
        assert_eq!(record.insert("x", 1u8), None);
        assert_eq!(record.insert("x", 2u8), Some(Value::U8(1)));
        assert_eq!(record.get("x"), Some(&Value::U8(2)));
    }

    #[test]
    fn test_record_from_iter() {
        let record: Record = vec![("a", Value::Bool(true)), ("b", Value::I16(-3))]
            .into_iter()
            .collect();
        let names: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(300u16).as_u64(), Some(300));
        assert_eq!(Value::from(-7i8).as_i64(), Some(-7));
        assert_eq!(Value::from(1.5f32).as_f64(), Some(1.5));
        assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
        assert_eq!(Value::from("x").as_u64(), None);
        assert_eq!(Value::from(MapKey::from("k")), Value::Str("k".into()));
    }

    #[test]
    fn test_map_key_ordering() {
        let mut keys = vec![MapKey::from("b"), MapKey::from("a"), MapKey::from("c")];
        keys.sort();
        assert_eq!(keys, [MapKey::from("a"), MapKey::from("b"), MapKey::from("c")]);
    }
}
