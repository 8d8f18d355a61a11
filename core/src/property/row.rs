/*
 * row.rs
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

//! Column sets and row decoding. Rows on the wire carry no tags of their
//! own; cells are decoded positionally against the column set the client
//! declared, so the declared order is authoritative.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{MapiError, MapiStatus};
use crate::property::tag::PropTag;
use crate::property::value::{need, PropValue};

/// Leading byte of a row body: 0x00 every cell present, 0x01 per-cell flags.
const ROW_PLAIN: u8 = 0x00;
const ROW_FLAGGED: u8 = 0x01;

/// Per-cell flag in a flagged row.
const CELL_PRESENT: u8 = 0x00;
const CELL_ABSENT: u8 = 0x01;
const CELL_ERROR: u8 = 0x0A;

/// An ordered set of property tags declared by the client. Duplicate tags
/// are rejected up front; the server would bind both cells to the same id
/// and the reply would be ambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    tags: Vec<PropTag>,
}

impl ColumnSet {
    /// Build a column set. Rejects duplicate tags, and rejects an empty
    /// list: every operation that takes a column set decodes or requests
    /// at least one cell, so an empty set could never be transmitted
    /// usefully.
    pub fn new(tags: Vec<PropTag>) -> Result<ColumnSet, MapiError> {
        if tags.is_empty() {
            return Err(MapiError::InvalidParameter("empty column set".into()));
        }
        for (i, tag) in tags.iter().enumerate() {
            if tags[..i].contains(tag) {
                return Err(MapiError::InvalidParameter(format!(
                    "duplicate column tag 0x{:08x}",
                    tag.0
                )));
            }
        }
        Ok(ColumnSet { tags })
    }

    pub fn tags(&self) -> &[PropTag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Wire form: 16-bit count, then each tag as a 32-bit LE value, in
    /// declared order.
    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u16_le(self.tags.len() as u16);
        for tag in &self.tags {
            out.put_u32_le(tag.0);
        }
    }

    /// Parse a tag array from a reply (count-prefixed, same as the request
    /// form). Used by replies that restate the columns they decoded with.
    pub fn decode(buf: &mut Bytes) -> Result<ColumnSet, MapiError> {
        need(buf, 2)?;
        let count = buf.get_u16_le() as usize;
        let mut tags = Vec::with_capacity(count);
        for _ in 0..count {
            need(buf, 4)?;
            tags.push(PropTag(buf.get_u32_le()));
        }
        ColumnSet::new(tags)
    }
}

/// One decoded row: cells in column order, tag retained per cell. An
/// absent column decodes to [`PropValue::NotFound`] with the requested
/// tag rewritten to its PT_ERROR form, matching what the server reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<(PropTag, PropValue)>,
}

impl Row {
    pub fn new(cells: Vec<(PropTag, PropValue)>) -> Row {
        Row { cells }
    }

    /// Look up a cell by the tag it was requested under. Matches on the
    /// property id, so an error-substituted cell is still found.
    pub fn find(&self, tag: PropTag) -> Option<&PropValue> {
        self.cells
            .iter()
            .find(|(t, _)| t.id() == tag.id())
            .map(|(_, v)| v)
    }

    pub fn cells(&self) -> &[(PropTag, PropValue)] {
        &self.cells
    }

    /// Decode a row body against the declared columns. The leading byte
    /// selects plain (every cell present, typed per column) or flagged
    /// (one flag byte per cell: present, absent, or error substitution).
    pub fn decode(columns: &ColumnSet, buf: &mut Bytes) -> Result<Row, MapiError> {
        need(buf, 1)?;
        let kind = buf.get_u8();
        let flagged = match kind {
            ROW_PLAIN => false,
            ROW_FLAGGED => true,
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unknown row flag byte 0x{:02x}",
                    other
                )))
            }
        };
        let mut cells = Vec::with_capacity(columns.len());
        for tag in columns.tags() {
            let prop_type = tag.prop_type().ok_or_else(|| {
                MapiError::InvalidParameter(format!("column 0x{:08x} has unknown type", tag.0))
            })?;
            if !flagged {
                cells.push((*tag, PropValue::decode(prop_type, buf)?));
                continue;
            }
            need(buf, 1)?;
            match buf.get_u8() {
                CELL_PRESENT => cells.push((*tag, PropValue::decode(prop_type, buf)?)),
                CELL_ABSENT => cells.push((tag.as_error(), PropValue::NotFound)),
                CELL_ERROR => {
                    need(buf, 4)?;
                    let status = MapiStatus(buf.get_u32_le());
                    cells.push((tag.as_error(), PropValue::Error(status)));
                }
                other => {
                    return Err(MapiError::CallFailed(format!(
                        "unknown cell flag 0x{:02x}",
                        other
                    )))
                }
            }
        }
        Ok(Row { cells })
    }
}

/// The rows of one reply. Never spans responses; paging is the caller's
/// loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::tag::PropType;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![PropTag::SUBJECT, PropTag::MESSAGE_SIZE]).unwrap()
    }

    #[test]
    fn duplicate_tags_rejected() {
        let err = ColumnSet::new(vec![PropTag::SUBJECT, PropTag::SUBJECT]).unwrap_err();
        assert!(matches!(err, MapiError::InvalidParameter(_)));
    }

    #[test]
    fn empty_column_set_rejected() {
        assert!(ColumnSet::new(Vec::new()).is_err());
    }

    #[test]
    fn column_order_survives_encode() {
        let cols = columns();
        let mut out = BytesMut::new();
        cols.encode(&mut out);
        let mut buf = out.freeze();
        let back = ColumnSet::decode(&mut buf).unwrap();
        assert_eq!(back.tags(), cols.tags());
    }

    #[test]
    fn plain_row_decodes_positionally() {
        let mut wire = BytesMut::new();
        wire.put_u8(0x00);
        PropValue::Unicode("hello".into()).encode(&mut wire);
        PropValue::Long(42).encode(&mut wire);
        let row = Row::decode(&columns(), &mut wire.freeze()).unwrap();
        assert_eq!(row.find(PropTag::SUBJECT), Some(&PropValue::Unicode("hello".into())));
        assert_eq!(row.find(PropTag::MESSAGE_SIZE), Some(&PropValue::Long(42)));
    }

    #[test]
    fn flagged_row_absence_is_data() {
        let mut wire = BytesMut::new();
        wire.put_u8(0x01);
        wire.put_u8(0x01); // subject absent
        wire.put_u8(0x00); // size present
        PropValue::Long(9).encode(&mut wire);
        let row = Row::decode(&columns(), &mut wire.freeze()).unwrap();
        assert_eq!(row.find(PropTag::SUBJECT), Some(&PropValue::NotFound));
        assert_eq!(row.find(PropTag::MESSAGE_SIZE), Some(&PropValue::Long(9)));
    }

    #[test]
    fn flagged_row_error_substitution() {
        let mut wire = BytesMut::new();
        wire.put_u8(0x01);
        wire.put_u8(0x0A);
        wire.put_u32_le(MapiStatus::NO_ACCESS.0);
        wire.put_u8(0x00);
        PropValue::Long(1).encode(&mut wire);
        let row = Row::decode(&columns(), &mut wire.freeze()).unwrap();
        match row.find(PropTag::SUBJECT) {
            Some(PropValue::Error(status)) => assert_eq!(*status, MapiStatus::NO_ACCESS),
            other => panic!("expected error cell, got {:?}", other),
        }
        let (tag, _) = row.cells()[0];
        assert_eq!(tag.prop_type(), Some(PropType::Error));
    }

    #[test]
    fn short_row_is_an_error_not_a_panic() {
        let mut wire = BytesMut::new();
        wire.put_u8(0x00);
        PropValue::Unicode("x".into()).encode(&mut wire);
        // second column missing entirely
        assert!(Row::decode(&columns(), &mut wire.freeze()).is_err());
    }
}
