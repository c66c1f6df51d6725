//! Basic usage example for wirepack
//!
//! Run with: cargo run --example basic_usage

use std::collections::BTreeMap;

use wirepack::*;

const LOGIN: u64 = 2;
const ROSTER: u64 = 4;

fn main() -> Result<()> {
    println!("wirepack Basic Usage Example");
    println!("============================");

    // Definitions are built once and shared by every message of their shape.
    let mut protocol = Protocol::new();

    let login = StructLayout::new()
        .with("user", UInt8)
        .with("name", Str::latin1());
    protocol.register(PacketDefinition::new(
        LOGIN,
        FieldDefinition::compile(login, &["name", "user"])?,
    ))?;

    let user = FieldDefinition::builder()
        .field("id", UInt32)
        .field("nick", Str::utf8())
        .build()?;
    protocol.register(PacketDefinition::new(
        ROSTER,
        FieldDefinition::builder()
            .field("room", Str::latin1())
            .field("users", struct_array(user))
            .field("status", MapOf::new(VarInt::new(), Bool))
            .build()?,
    ))?;

    // Example 1: the smallest message
    println!("\n1. Login Message:");
    {
        let record = Record::new().with("name", "ab").with("user", 5u8);
        let bytes = protocol.encode(LOGIN, &record)?;
        println!("  Encoded {} bytes: {:02X?}", bytes.len(), bytes);

        if let Decoded::Message { id, record } = protocol.decode(&bytes)? {
            println!("  Decoded id={} record={:?}", id, record);
        }
    }

    // Example 2: nested struct array and map
    println!("\n2. Roster Message:");
    {
        let users = vec![
            Value::from(Record::new().with("id", 1u32).with("nick", "ada")),
            Value::from(Record::new().with("id", 2u32).with("nick", "grace")),
        ];
        let mut status = BTreeMap::new();
        status.insert(MapKey::VarInt(1), Value::Bool(true));
        status.insert(MapKey::VarInt(2), Value::Bool(false));

        let record = Record::new()
            .with("room", "lobby")
            .with("users", users)
            .with("status", status);
        let definition = protocol.get(ROSTER).ok_or(Error::Unregistered(ROSTER))?;
        println!("  Computed size: {} bytes", definition.size(&record)?);

        let bytes = encode_message(definition, &record)?;
        println!("  Encoded {} bytes", bytes.len());

        match decode_message(&bytes, &protocol)? {
            Decoded::Message { record: decoded, .. } => {
                println!("  Roundtrip ok: {}", decoded == record);
            }
            Decoded::Unregistered { id } => println!("  Unregistered id {}", id),
        }
    }

    // Example 3: a message this side has no definition for
    println!("\n3. Unregistered Message:");
    {
        let decoded = protocol.decode(&[0x63, 0x01, 0x02])?;
        println!("  {:?}", decoded);
    }

    // Example 4: reusing one write buffer and cursor
    println!("\n4. Buffer Reuse:");
    {
        let definition = protocol.get(LOGIN).ok_or(Error::Unregistered(LOGIN))?;
        let mut buf = [0u8; 64];
        let mut cursor = Cursor::new();
        for (i, name) in ["x", "yy", "zzz"].iter().enumerate() {
            let record = Record::new().with("name", *name).with("user", i as u8);
            let len = definition.write(&record, &mut buf, &mut cursor)?;
            println!("  {:02X?}", &buf[..len]);
        }
    }

    Ok(())
}
