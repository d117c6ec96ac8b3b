//! A hand-rolled protobuf encoder/decoder covering just the wire shapes the
//! Cursor Codec needs (varint and length-delimited fields). Avoids pulling
//! in `prost` and a build-time codegen step for a handful of fixed messages.

/// Appends `value` to `buf` as a protobuf varint.
pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

fn write_tag(buf: &mut Vec<u8>, field_number: u32, wire_type: u8) {
    write_varint(buf, ((field_number as u64) << 3) | wire_type as u64);
}

/// Writes a varint-typed (wire type 0) field.
pub fn write_varint_field(buf: &mut Vec<u8>, field_number: u32, value: u64) {
    write_tag(buf, field_number, 0);
    write_varint(buf, value);
}

/// Writes a length-delimited (wire type 2) field: a string, bytes blob, or
/// nested message already encoded into `bytes`.
pub fn write_bytes_field(buf: &mut Vec<u8>, field_number: u32, bytes: &[u8]) {
    write_tag(buf, field_number, 2);
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

pub fn write_string_field(buf: &mut Vec<u8>, field_number: u32, value: &str) {
    write_bytes_field(buf, field_number, value.as_bytes());
}

/// Encodes a nested message by running `build` over a fresh buffer, then
/// writes it as a length-delimited field.
pub fn write_message_field(buf: &mut Vec<u8>, field_number: u32, build: impl FnOnce(&mut Vec<u8>)) {
    let mut nested = Vec::new();
    build(&mut nested);
    write_bytes_field(buf, field_number, &nested);
}

#[derive(Debug)]
pub enum DecodeError {
    Truncated,
    UnsupportedWireType(u8),
}

#[derive(Debug, Clone, Copy)]
pub enum WireValue<'a> {
    Varint(u64),
    LenDelimited(&'a [u8]),
    Fixed64(u64),
    Fixed32(u32),
}

fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *data.get(*pos).ok_or(DecodeError::Truncated)?;
        *pos += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Decodes every top-level field in a protobuf message, in wire order.
/// Sufficient for the inner Cursor response messages: no field is
/// interpreted until the caller matches on its field number.
pub fn read_fields(data: &[u8]) -> Result<Vec<(u32, WireValue<'_>)>, DecodeError> {
    let mut fields = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let tag = read_varint(data, &mut pos)?;
        let field_number = (tag >> 3) as u32;
        let wire_type = (tag & 0x7) as u8;
        let value = match wire_type {
            0 => WireValue::Varint(read_varint(data, &mut pos)?),
            2 => {
                let len = read_varint(data, &mut pos)? as usize;
                let end = pos.checked_add(len).ok_or(DecodeError::Truncated)?;
                let slice = data.get(pos..end).ok_or(DecodeError::Truncated)?;
                pos = end;
                WireValue::LenDelimited(slice)
            }
            1 => {
                let end = pos.checked_add(8).ok_or(DecodeError::Truncated)?;
                let slice = data.get(pos..end).ok_or(DecodeError::Truncated)?;
                pos = end;
                WireValue::Fixed64(u64::from_le_bytes(slice.try_into().unwrap()))
            }
            5 => {
                let end = pos.checked_add(4).ok_or(DecodeError::Truncated)?;
                let slice = data.get(pos..end).ok_or(DecodeError::Truncated)?;
                pos = end;
                WireValue::Fixed32(u32::from_le_bytes(slice.try_into().unwrap()))
            }
            other => return Err(DecodeError::UnsupportedWireType(other)),
        };
        fields.push((field_number, value));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_round_trips_through_read_fields() {
        let mut buf = Vec::new();
        write_varint_field(&mut buf, 4, 300);
        let fields = read_fields(&buf).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, 4);
        assert!(matches!(fields[0].1, WireValue::Varint(300)));
    }

    #[test]
    fn nested_message_round_trips() {
        let mut buf = Vec::new();
        write_message_field(&mut buf, 5, |inner| {
            write_string_field(inner, 1, "gpt");
        });
        let fields = read_fields(&buf).unwrap();
        let WireValue::LenDelimited(nested) = fields[0].1 else {
            panic!("expected length-delimited field");
        };
        let inner_fields = read_fields(nested).unwrap();
        let WireValue::LenDelimited(name) = inner_fields[0].1 else {
            panic!("expected nested string field");
        };
        assert_eq!(name, b"gpt");
    }

    #[test]
    fn truncated_input_is_an_error() {
        let buf = vec![0x0a, 0x05, b'h', b'i'];
        assert!(matches!(read_fields(&buf), Err(DecodeError::Truncated)));
    }
}
