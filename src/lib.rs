//! wirepack: compact binary wire format for message-oriented duplex links
//!
//! Application values are described by ordered field definitions built from
//! typed codecs, and encoded with no per-field tags or delimiters. Each
//! message is prefixed with a varint packet identifier for demultiplexing.
//!
//! # Message Format
//!
//! ```text
//! +--------------------+---------+---------+-----+---------+
//! | Identifier varint  | field 1 | field 2 | ... | field N |
//! +--------------------+---------+---------+-----+---------+
//! ```
//!
//! | Type | Bytes | Encoding |
//! |---|---|---|
//! | int8/16/32, uint8/16/32 | 1/2/4 | two's complement / raw, big-endian |
//! | float32/64 | 4/8 | IEEE-754, big-endian |
//! | bool | 1 | `0x00` or `0x01` |
//! | varint | 1-10 | 7-bit groups, low group first, MSB continuation |
//! | bytes / str | varint + N | length-prefixed |
//! | array / struct array | varint + Σ | count-prefixed elements |
//! | map | varint + Σ | count-prefixed key/value pairs |
//!
//! Encoding is two-pass: the definition computes the exact message size, a
//! buffer of that size is allocated, then fields are written in declared
//! order through a [`Cursor`].
//!
//! # Example
//!
//! ```rust
//! use wirepack::*;
//!
//! let fields = FieldDefinition::builder()
//!     .field("name", Str::latin1())
//!     .field("user", UInt8)
//!     .build()?;
//!
//! let mut protocol = Protocol::new();
//! protocol.register(PacketDefinition::new(2, fields))?;
//!
//! let record = Record::new().with("name", "ab").with("user", 5u8);
//! let bytes = protocol.encode(2, &record)?;
//! assert_eq!(bytes, [0x02, 0x02, b'a', b'b', 0x05]);
//!
//! match protocol.decode(&bytes)? {
//!     Decoded::Message { id, record: decoded } => {
//!         assert_eq!(id, 2);
//!         assert_eq!(decoded, record);
//!     }
//!     Decoded::Unregistered { .. } => unreachable!(),
//! }
//! # Ok::<(), wirepack::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod composite;
pub mod cursor;
pub mod datatype;
pub mod definition;
pub mod error;
pub mod primitive;
pub mod protocol;
pub mod value;
pub mod varint;

// Re-export main types
pub use composite::{struct_array, ArrayOf, Bytes, KeyType, MapOf, Str, StringEncoding, StructArray};
pub use cursor::Cursor;
pub use datatype::{DataType, SizeRule};
pub use definition::{Field, FieldDefinition, FieldDefinitionBuilder, PacketDefinition, StructLayout};
pub use error::{Error, Result};
pub use primitive::{Bool, Float32, Float64, Int16, Int32, Int8, UInt16, UInt32, UInt8};
pub use protocol::{decode_message, encode_message, Decoded, Protocol};
pub use value::{MapKey, Record, Value};
pub use varint::{VarInt, MAX_VARINT_SIZE};
