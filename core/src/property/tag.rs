/*
 * tag.rs
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

//! Property tags. A tag is a 32-bit value packing a 16-bit property id in
//! the high half and a 16-bit type code in the low half.

/// Wire type codes (PT_*). The multi-value bit (0x1000) is kept out of the
/// enum; test for it with [`PropType::MV_FLAG`] on the raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PropType {
    Unspecified = 0x0000,
    Null = 0x0001,
    I2 = 0x0002,
    Long = 0x0003,
    Double = 0x0005,
    Error = 0x000A,
    Boolean = 0x000B,
    I8 = 0x0014,
    String8 = 0x001E,
    Unicode = 0x001F,
    SysTime = 0x0040,
    Clsid = 0x0048,
    Binary = 0x0102,
}

impl PropType {
    /// Multi-value flag bit in the raw type code.
    pub const MV_FLAG: u16 = 0x1000;

    pub fn from_code(code: u16) -> Option<PropType> {
        match code {
            0x0000 => Some(PropType::Unspecified),
            0x0001 => Some(PropType::Null),
            0x0002 => Some(PropType::I2),
            0x0003 => Some(PropType::Long),
            0x0005 => Some(PropType::Double),
            0x000A => Some(PropType::Error),
            0x000B => Some(PropType::Boolean),
            0x0014 => Some(PropType::I8),
            0x001E => Some(PropType::String8),
            0x001F => Some(PropType::Unicode),
            0x0040 => Some(PropType::SysTime),
            0x0048 => Some(PropType::Clsid),
            0x0102 => Some(PropType::Binary),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// A property tag: `id << 16 | type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropTag(pub u32);

impl PropTag {
    pub const fn new(id: u16, type_code: u16) -> PropTag {
        PropTag(((id as u32) << 16) | type_code as u32)
    }

    pub fn id(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn type_code(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn prop_type(self) -> Option<PropType> {
        PropType::from_code(self.type_code())
    }

    /// Same id, PT_ERROR type. This is what servers substitute in a row
    /// when a requested column cannot be returned.
    pub fn as_error(self) -> PropTag {
        PropTag::new(self.id(), PropType::Error.code())
    }

    // Well-known tags used by the engine and its callers.
    pub const DISPLAY_NAME: PropTag = PropTag::new(0x3001, 0x001F);
    pub const SUBJECT: PropTag = PropTag::new(0x0037, 0x001F);
    pub const MESSAGE_CLASS: PropTag = PropTag::new(0x001A, 0x001F);
    pub const MESSAGE_SIZE: PropTag = PropTag::new(0x0E08, 0x0003);
    pub const MESSAGE_FLAGS: PropTag = PropTag::new(0x0E07, 0x0003);
    pub const FOLDER_ID: PropTag = PropTag::new(0x6748, 0x0014);
    pub const MESSAGE_ID: PropTag = PropTag::new(0x674A, 0x0014);
    pub const CONTENT_COUNT: PropTag = PropTag::new(0x3602, 0x0003);
    pub const CONTENT_UNREAD: PropTag = PropTag::new(0x3603, 0x0003);
    pub const FOLDER_CHILD_COUNT: PropTag = PropTag::new(0x6638, 0x0003);
}
