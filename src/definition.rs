//! Ordered field definitions and identifier-tagged packet definitions
//!
//! A [`FieldDefinition`] is compiled once from a [`StructLayout`] (name to
//! codec, unordered) and an explicit field order. The order alone decides the
//! wire layout: fields are written back to back with no delimiters, so a
//! decoder must use the same order to stay aligned.
//!
//! ```text
//! +------------------+---------+---------+-----+---------+
//! | Identifier varint| field 1 | field 2 | ... | field N |
//! +------------------+---------+---------+-----+---------+
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::datatype::{DataType, SizeRule};
use crate::error::{Error, Result};
use crate::value::{Record, Value};
use crate::varint;

/// Field name to codec mapping; iteration order carries no meaning
#[derive(Debug, Default, Clone)]
pub struct StructLayout {
    types: HashMap<String, Arc<dyn DataType>>,
}

impl StructLayout {
    /// Empty layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, codec: impl DataType + 'static) -> Self {
        self.insert(name, Arc::new(codec));
        self
    }

    /// Insert or replace the codec for `name`
    pub fn insert(&mut self, name: impl Into<String>, codec: Arc<dyn DataType>) {
        self.types.insert(name.into(), codec);
    }

    /// Codec registered for `name`
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DataType>> {
        self.types.get(name)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no fields are declared
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// One named field of a definition
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    codec: Arc<dyn DataType>,
}

impl Field {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field codec
    pub fn codec(&self) -> &dyn DataType {
        &*self.codec
    }
}

/// Ordered list of named codecs driving aggregate size, encode and decode.
///
/// Immutable once built; share it freely between concurrent passes.
#[derive(Clone)]
pub struct FieldDefinition {
    fields: Vec<Field>,
    fixed_size: Option<usize>,
}

impl FieldDefinition {
    /// Start a definition whose wire order is the order fields are added
    pub fn builder() -> FieldDefinitionBuilder {
        FieldDefinitionBuilder::default()
    }

    /// Compile `layout` into wire order `order`.
    ///
    /// `order` must name every layout field exactly once.
    pub fn compile(mut layout: StructLayout, order: &[&str]) -> Result<Self> {
        let mut fields = Vec::with_capacity(order.len());
        for &name in order {
            match layout.types.remove(name) {
                Some(codec) => fields.push(Field {
                    name: name.to_owned(),
                    codec,
                }),
                None if fields.iter().any(|f: &Field| f.name == name) => {
                    return Err(Error::FieldOrder(format!("duplicate field `{name}`")));
                }
                None => return Err(Error::FieldOrder(format!("unknown field `{name}`"))),
            }
        }

        if let Some(missing) = layout.types.keys().min() {
            return Err(Error::FieldOrder(format!(
                "field `{missing}` missing from order"
            )));
        }

        Ok(Self::from_fields(fields))
    }

    fn from_fields(fields: Vec<Field>) -> Self {
        let fixed_size = fields.iter().try_fold(0, |acc, field| match field.codec.size() {
            SizeRule::Fixed(n) => Some(acc + n),
            SizeRule::Computed => None,
        });
        Self { fields, fixed_size }
    }

    /// Fields in wire order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the definition has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn value_of<'r>(record: &'r Record, name: &str) -> Result<&'r Value> {
        record
            .get(name)
            .ok_or_else(|| Error::MissingField(name.to_owned()))
    }

    /// Exact encoded length of `record`.
    ///
    /// Fixed-size fields add their constant without looking at the record.
    pub fn compute_size(&self, record: &Record) -> Result<usize> {
        if let Some(size) = self.fixed_size {
            return Ok(size);
        }

        let mut size = 0;
        for field in &self.fields {
            size += match field.codec.size() {
                SizeRule::Fixed(n) => n,
                SizeRule::Computed => field.codec.size_of(Self::value_of(record, &field.name)?)?,
            };
        }
        Ok(size)
    }

    /// Write every field of `record` in declared order
    pub fn encode(&self, record: &Record, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        for field in &self.fields {
            field
                .codec
                .encode(Self::value_of(record, &field.name)?, buf, cursor)?;
        }
        Ok(())
    }

    /// Read every field in declared order
    pub fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Record> {
        let mut record = Record::new();
        for field in &self.fields {
            record.insert(field.name.as_str(), field.codec.decode(buf, cursor)?);
        }
        Ok(record)
    }

    /// Size, allocate and encode `record` into a new buffer
    pub fn to_bytes(&self, record: &Record) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.compute_size(record)?];
        let mut cursor = Cursor::new();
        self.encode(record, &mut buf, &mut cursor)?;
        debug_assert_eq!(cursor.offset(), buf.len());
        Ok(buf)
    }

    /// Decode a buffer holding exactly one record
    pub fn from_bytes(&self, buf: &[u8]) -> Result<Record> {
        let mut cursor = Cursor::new();
        let record = self.decode(buf, &mut cursor)?;
        if cursor.offset() != buf.len() {
            return Err(Error::TrailingBytes {
                consumed: cursor.offset(),
                len: buf.len(),
            });
        }
        Ok(record)
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|field| (&field.name, field.codec.name())))
            .finish()
    }
}

/// A nested struct: its fields inline, no prefix
impl DataType for FieldDefinition {
    fn name(&self) -> &'static str {
        "struct"
    }

    fn size(&self) -> SizeRule {
        match self.fixed_size {
            Some(n) => SizeRule::Fixed(n),
            None => SizeRule::Computed,
        }
    }

    fn size_of(&self, value: &Value) -> Result<usize> {
        match value {
            Value::Struct(record) => self.compute_size(record),
            _ => Err(self.mismatch(value)),
        }
    }

    fn encode(&self, value: &Value, buf: &mut [u8], cursor: &mut Cursor) -> Result<()> {
        match value {
            Value::Struct(record) => FieldDefinition::encode(self, record, buf, cursor),
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Value> {
        FieldDefinition::decode(self, buf, cursor).map(Value::Struct)
    }
}

/// Builder for [`FieldDefinition`]; wire order is insertion order
#[derive(Default)]
pub struct FieldDefinitionBuilder {
    fields: Vec<Field>,
}

impl FieldDefinitionBuilder {
    /// Append a field
    pub fn field(self, name: impl Into<String>, codec: impl DataType + 'static) -> Self {
        self.shared_field(name, Arc::new(codec))
    }

    /// Append a field with an already shared codec
    pub fn shared_field(mut self, name: impl Into<String>, codec: Arc<dyn DataType>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            codec,
        });
        self
    }

    /// Finish the definition, rejecting duplicate field names
    pub fn build(self) -> Result<FieldDefinition> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::FieldOrder(format!(
                    "duplicate field `{}`",
                    field.name
                )));
            }
        }
        Ok(FieldDefinition::from_fields(self.fields))
    }
}

/// A field definition tagged with a message identifier
#[derive(Debug, Clone)]
pub struct PacketDefinition {
    id: u64,
    fields: FieldDefinition,
}

impl PacketDefinition {
    /// Tag `fields` with identifier `id`
    pub fn new(id: u64, fields: FieldDefinition) -> Self {
        Self { id, fields }
    }

    /// Message identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Body definition
    pub fn fields(&self) -> &FieldDefinition {
        &self.fields
    }

    /// Encoded length of identifier plus body
    pub fn size(&self, record: &Record) -> Result<usize> {
        Ok(varint::size_u64(self.id) + self.fields.compute_size(record)?)
    }

    /// Encode `record` into a buffer of exactly [`size`](Self::size) bytes
    pub fn create(&self, record: &Record) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.size(record)?];
        let mut cursor = Cursor::new();
        let written = self.write(record, &mut buf, &mut cursor)?;
        debug_assert_eq!(written, buf.len());
        Ok(buf)
    }

    /// Write identifier and body at the cursor, then reset it.
    ///
    /// Returns the offset the pass ended at.
    pub fn write(&self, record: &Record, buf: &mut [u8], cursor: &mut Cursor) -> Result<usize> {
        let result = varint::write(self.id, buf, cursor)
            .and_then(|()| self.fields.encode(record, buf, cursor))
            .map(|()| cursor.offset());
        cursor.reset();
        result
    }

    /// Read the body; the identifier must already have been consumed
    pub fn decode_body(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Record> {
        self.fields.decode(buf, cursor)
    }

    /// Decode a complete message of this definition
    pub fn decode(&self, buf: &[u8]) -> Result<Record> {
        let mut cursor = Cursor::new();
        let id = varint::read(buf, &mut cursor)?;
        if id != self.id {
            return Err(Error::IdMismatch {
                expected: self.id,
                found: id,
            });
        }

        let record = self.decode_body(buf, &mut cursor)?;
        if cursor.offset() != buf.len() {
            return Err(Error::TrailingBytes {
                consumed: cursor.offset(),
                len: buf.len(),
            });
        }
        Ok(record)
    }
}
