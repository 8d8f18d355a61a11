/*
 * value.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Scambio, a MAPI/RPC client protocol engine.
 *
 * Scambio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Scambio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Scambio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Typed property values and their wire forms. Integers are little-endian,
//! strings are NUL-terminated (UTF-16LE for Unicode), binary is prefixed
//! with a 16-bit byte count, CLSIDs are 16 raw bytes, and system times are
//! 64-bit FILETIMEs. No implicit numeric widening anywhere: a PT_I2 cell
//! stays an i16.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{MapiError, MapiStatus};
use crate::property::tag::PropType;

/// A decoded property value. `NotFound` is a value, not an error: a server
/// reporting an absent column still produces a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    I2(i16),
    Long(i32),
    Double(f64),
    Boolean(bool),
    I8(i64),
    String8(String),
    Unicode(String),
    /// 64-bit FILETIME (100ns ticks since 1601-01-01).
    SysTime(u64),
    Clsid([u8; 16]),
    Binary(Vec<u8>),
    /// Server substituted an error code for this column.
    Error(MapiStatus),
    /// Server reported the column as absent.
    NotFound,
    Null,
}

pub(crate) fn need(buf: &Bytes, n: usize) -> Result<(), MapiError> {
    if buf.remaining() < n {
        Err(MapiError::CallFailed(format!(
            "reply truncated: need {} bytes, have {}",
            n,
            buf.remaining()
        )))
    } else {
        Ok(())
    }
}

/// Read a NUL-terminated byte string.
pub(crate) fn get_cstring(buf: &mut Bytes) -> Result<String, MapiError> {
    let mut raw = Vec::new();
    loop {
        need(buf, 1)?;
        let b = buf.get_u8();
        if b == 0 {
            break;
        }
        raw.push(b);
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Read a NUL-terminated UTF-16LE string.
pub(crate) fn get_wstring(buf: &mut Bytes) -> Result<String, MapiError> {
    let mut units = Vec::new();
    loop {
        need(buf, 2)?;
        let u = buf.get_u16_le();
        if u == 0 {
            break;
        }
        units.push(u);
    }
    Ok(String::from_utf16_lossy(&units))
}

pub(crate) fn put_cstring(out: &mut BytesMut, s: &str) {
    out.put_slice(s.as_bytes());
    out.put_u8(0);
}

pub(crate) fn put_wstring(out: &mut BytesMut, s: &str) {
    for u in s.encode_utf16() {
        out.put_u16_le(u);
    }
    out.put_u16_le(0);
}

impl PropValue {
    /// Decode one value of the given type from the reply stream.
    pub fn decode(prop_type: PropType, buf: &mut Bytes) -> Result<PropValue, MapiError> {
        match prop_type {
            PropType::I2 => {
                need(buf, 2)?;
                Ok(PropValue::I2(buf.get_i16_le()))
            }
            PropType::Long => {
                need(buf, 4)?;
                Ok(PropValue::Long(buf.get_i32_le()))
            }
            PropType::Double => {
                need(buf, 8)?;
                Ok(PropValue::Double(buf.get_f64_le()))
            }
            PropType::Boolean => {
                need(buf, 1)?;
                Ok(PropValue::Boolean(buf.get_u8() != 0))
            }
            PropType::I8 => {
                need(buf, 8)?;
                Ok(PropValue::I8(buf.get_i64_le()))
            }
            PropType::String8 => Ok(PropValue::String8(get_cstring(buf)?)),
            PropType::Unicode => Ok(PropValue::Unicode(get_wstring(buf)?)),
            PropType::SysTime => {
                need(buf, 8)?;
                Ok(PropValue::SysTime(buf.get_u64_le()))
            }
            PropType::Clsid => {
                need(buf, 16)?;
                let mut guid = [0u8; 16];
                buf.copy_to_slice(&mut guid);
                Ok(PropValue::Clsid(guid))
            }
            PropType::Binary => {
                need(buf, 2)?;
                let len = buf.get_u16_le() as usize;
                need(buf, len)?;
                let mut data = vec![0u8; len];
                buf.copy_to_slice(&mut data);
                Ok(PropValue::Binary(data))
            }
            PropType::Error => {
                need(buf, 4)?;
                Ok(PropValue::Error(MapiStatus(buf.get_u32_le())))
            }
            PropType::Null | PropType::Unspecified => Ok(PropValue::Null),
        }
    }

    /// Encode this value for a request payload.
    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            PropValue::I2(v) => out.put_i16_le(*v),
            PropValue::Long(v) => out.put_i32_le(*v),
            PropValue::Double(v) => out.put_f64_le(*v),
            PropValue::Boolean(v) => out.put_u8(u8::from(*v)),
            PropValue::I8(v) => out.put_i64_le(*v),
            PropValue::String8(s) => put_cstring(out, s),
            PropValue::Unicode(s) => put_wstring(out, s),
            PropValue::SysTime(v) => out.put_u64_le(*v),
            PropValue::Clsid(guid) => out.put_slice(guid),
            PropValue::Binary(data) => {
                out.put_u16_le(data.len() as u16);
                out.put_slice(data);
            }
            PropValue::Error(status) => out.put_u32_le(status.0),
            PropValue::NotFound | PropValue::Null => {}
        }
    }

    /// True when the server reported the column as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PropValue::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(prop_type: PropType, wire: &[u8]) -> PropValue {
        let mut buf = Bytes::copy_from_slice(wire);
        let v = PropValue::decode(prop_type, &mut buf).unwrap();
        assert_eq!(buf.remaining(), 0, "trailing bytes after decode");
        v
    }

    #[test]
    fn decodes_fixed_width_values() {
        assert_eq!(decode_one(PropType::I2, &[0xFE, 0xFF]), PropValue::I2(-2));
        assert_eq!(
            decode_one(PropType::Long, &[0x39, 0x30, 0x00, 0x00]),
            PropValue::Long(12345)
        );
        assert_eq!(decode_one(PropType::Boolean, &[0x01]), PropValue::Boolean(true));
        assert_eq!(
            decode_one(PropType::I8, &[1, 0, 0, 0, 0, 0, 0, 0]),
            PropValue::I8(1)
        );
    }

    #[test]
    fn decodes_strings_and_binary() {
        assert_eq!(
            decode_one(PropType::String8, b"inbox\0"),
            PropValue::String8("inbox".into())
        );
        assert_eq!(
            decode_one(PropType::Unicode, &[0x68, 0x00, 0x69, 0x00, 0x00, 0x00]),
            PropValue::Unicode("hi".into())
        );
        assert_eq!(
            decode_one(PropType::Binary, &[0x03, 0x00, 0xAA, 0xBB, 0xCC]),
            PropValue::Binary(vec![0xAA, 0xBB, 0xCC])
        );
    }

    #[test]
    fn no_widening_between_integer_types() {
        let v = decode_one(PropType::I2, &[0x07, 0x00]);
        assert_eq!(v, PropValue::I2(7));
        assert_ne!(v, PropValue::Long(7));
    }

    #[test]
    fn truncated_value_is_an_error() {
        let mut buf = Bytes::copy_from_slice(&[0x01]);
        assert!(PropValue::decode(PropType::Long, &mut buf).is_err());
        let mut buf = Bytes::copy_from_slice(b"no terminator");
        assert!(PropValue::decode(PropType::String8, &mut buf).is_err());
    }

    #[test]
    fn encode_matches_decode() {
        let mut out = BytesMut::new();
        PropValue::Unicode("abc".into()).encode(&mut out);
        let mut buf = out.freeze();
        assert_eq!(
            PropValue::decode(PropType::Unicode, &mut buf).unwrap(),
            PropValue::Unicode("abc".into())
        );
    }
}
