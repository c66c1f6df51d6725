//! Message-level encode/decode over a set of registered packet definitions
//!
//! This is the surface a transport consumes: one call turns a definition and
//! a record into a buffer, another turns a received buffer into an identifier
//! and a record. Connection handling and listener fan-out stay with the
//! transport.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cursor::Cursor;
use crate::definition::PacketDefinition;
use crate::error::{Error, Result};
use crate::value::Record;
use crate::varint;

/// Outcome of decoding one message buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A registered definition decoded the body
    Message {
        /// Packet identifier
        id: u64,
        /// Decoded fields
        record: Record,
    },
    /// No definition is registered for `id`; the body was not read
    Unregistered {
        /// Packet identifier
        id: u64,
    },
}

impl Decoded {
    /// Identifier read from the buffer
    pub fn id(&self) -> u64 {
        match *self {
            Decoded::Message { id, .. } | Decoded::Unregistered { id } => id,
        }
    }
}

/// The active definition set of one connection, keyed by identifier
#[derive(Debug, Default, Clone)]
pub struct Protocol {
    definitions: HashMap<u64, Arc<PacketDefinition>>,
}

impl Protocol {
    /// Empty definition set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` under its identifier
    pub fn register(&mut self, definition: PacketDefinition) -> Result<Arc<PacketDefinition>> {
        let id = definition.id();
        if self.definitions.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }

        debug!(id, fields = definition.fields().len(), "registered packet definition");
        let definition = Arc::new(definition);
        self.definitions.insert(id, Arc::clone(&definition));
        Ok(definition)
    }

    /// Definition registered for `id`
    pub fn get(&self, id: u64) -> Option<&Arc<PacketDefinition>> {
        self.definitions.get(&id)
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Encode `record` with the definition registered for `id`
    pub fn encode(&self, id: u64, record: &Record) -> Result<Vec<u8>> {
        let definition = self.get(id).ok_or(Error::Unregistered(id))?;
        encode_message(definition, record)
    }

    /// Decode one complete message buffer
    pub fn decode(&self, buf: &[u8]) -> Result<Decoded> {
        self.decode_with(buf, &mut Cursor::new())
    }

    /// Decode one complete message buffer using a caller-owned read cursor.
    ///
    /// The cursor must start at zero and is reset once the pass ends, whether
    /// or not it succeeded, so it can serve the next buffer.
    pub fn decode_with(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Decoded> {
        let result = self.decode_at(buf, cursor);
        cursor.reset();
        result
    }

    fn decode_at(&self, buf: &[u8], cursor: &mut Cursor) -> Result<Decoded> {
        let id = varint::read(buf, cursor)?;

        let Some(definition) = self.get(id) else {
            warn!(id, len = buf.len(), "discarding message with unregistered packet id");
            return Ok(Decoded::Unregistered { id });
        };

        let record = definition.decode_body(buf, cursor)?;
        if cursor.offset() != buf.len() {
            return Err(Error::TrailingBytes {
                consumed: cursor.offset(),
                len: buf.len(),
            });
        }

        trace!(id, len = buf.len(), "decoded message");
        Ok(Decoded::Message { id, record })
    }
}

/// Encode `record` as a complete message of `definition`.
///
/// The buffer is exactly `definition.size(record)` bytes long.
pub fn encode_message(definition: &PacketDefinition, record: &Record) -> Result<Vec<u8>> {
    let buf = definition.create(record)?;
    trace!(id = definition.id(), len = buf.len(), "encoded message");
    Ok(buf)
}

/// Decode `buf` against the definitions registered in `protocol`
pub fn decode_message(buf: &[u8], protocol: &Protocol) -> Result<Decoded> {
    protocol.decode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Str;
    use crate::definition::FieldDefinition;
    use crate::primitive::{Bool, UInt8};

    fn protocol() -> Protocol {
        let mut protocol = Protocol::new();
        protocol
            .register(PacketDefinition::new(
                2,
                FieldDefinition::builder()
                    .field("name", Str::latin1())
                    .field("user", UInt8)
                    .build()
                    .unwrap(),
            ))
            .unwrap();
        protocol
            .register(PacketDefinition::new(
                300,
                FieldDefinition::builder().field("ok", Bool).build().unwrap(),
            ))
            .unwrap();
        protocol
    }

    #[test]
    fn test_encode_decode_by_id() {
        let protocol = protocol();
        let record = Record::new().with("ok", true);
        let bytes = protocol.encode(300, &record).unwrap();
        assert_eq!(bytes, [0xAC, 0x02, 0x01]);

        let decoded = decode_message(&bytes, &protocol).unwrap();
        assert_eq!(decoded, Decoded::Message { id: 300, record });
        assert_eq!(decoded.id(), 300);
    }

    #[test]
    fn test_unregistered_id_is_not_an_error() {
        let protocol = protocol();
        let decoded = protocol.decode(&[0x07, 0x01, 0x02, 0x03]).unwrap();
        assert_eq!(decoded, Decoded::Unregistered { id: 7 });
        assert_eq!(protocol.encode(7, &Record::new()), Err(Error::Unregistered(7)));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut protocol = protocol();
        let again = PacketDefinition::new(2, FieldDefinition::builder().build().unwrap());
        assert_eq!(protocol.register(again).unwrap_err(), Error::DuplicateId(2));
        assert_eq!(protocol.len(), 2);
    }

    #[test]
    fn test_decode_with_resets_cursor() {
        let protocol = protocol();
        let mut cursor = Cursor::new();

        let first = protocol.encode(2, &Record::new().with("name", "ab").with("user", 5u8));
        let second = protocol.encode(300, &Record::new().with("ok", false));
        for bytes in [first.unwrap(), second.unwrap()] {
            assert!(matches!(
                protocol.decode_with(&bytes, &mut cursor),
                Ok(Decoded::Message { .. })
            ));
            assert_eq!(cursor.offset(), 0);
        }

        assert_eq!(
            protocol.decode_with(&[0x02, 0x05], &mut cursor),
            Err(Error::UnexpectedEof)
        );
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn test_trailing_bytes() {
        assert_eq!(
            protocol().decode(&[0xAC, 0x02, 0x01, 0x00]),
            Err(Error::TrailingBytes {
                consumed: 3,
                len: 4
            })
        );
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(protocol().decode(&[]), Err(Error::UnexpectedEof));
    }
}
