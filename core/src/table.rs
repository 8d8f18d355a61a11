/*
 * table.rs
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

//! Table cursor bookkeeping. The server keeps the real cursor; this state
//! tracks what the client has declared and where it believes the cursor
//! stands, so rows can be decoded positionally and misuse is caught before
//! anything hits the wire.

use crate::error::MapiError;
use crate::property::ColumnSet;

/// Cursor lifecycle: columns must be declared before rows are queried;
/// an empty batch marks the cursor exhausted until it is repositioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Unbound,
    ColumnsSet,
    Positioned,
    Exhausted,
}

/// Per-table state stored in the table object's payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    columns: Option<ColumnSet>,
    cursor: CursorState,
    /// Row count the server estimated when the table was opened. Advisory.
    pub estimated_rows: u32,
}

impl TableState {
    pub fn new(estimated_rows: u32) -> TableState {
        TableState {
            columns: None,
            cursor: CursorState::Unbound,
            estimated_rows,
        }
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    pub fn columns(&self) -> Option<&ColumnSet> {
        self.columns.as_ref()
    }

    /// Declare the column set. Replaces any previous declaration and puts
    /// the cursor back at the start of the lifecycle.
    pub(crate) fn set_columns(&mut self, columns: ColumnSet) {
        self.columns = Some(columns);
        self.cursor = CursorState::ColumnsSet;
    }

    /// Columns to decode rows against, or the local error QueryRows must
    /// report before transmitting anything.
    pub(crate) fn columns_for_query(&self) -> Result<&ColumnSet, MapiError> {
        self.columns.as_ref().ok_or_else(|| {
            MapiError::InvalidParameter("query before a column set was declared".into())
        })
    }

    pub(crate) fn advanced(&mut self, rows_returned: usize) {
        self.cursor = if rows_returned == 0 {
            CursorState::Exhausted
        } else {
            CursorState::Positioned
        };
    }

    pub(crate) fn repositioned(&mut self) {
        if self.columns.is_some() {
            self.cursor = CursorState::ColumnsSet;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropTag;

    #[test]
    fn query_before_columns_is_local_error() {
        let state = TableState::new(10);
        assert!(matches!(
            state.columns_for_query(),
            Err(MapiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn lifecycle_tracks_batches() {
        let mut state = TableState::new(2);
        state.set_columns(ColumnSet::new(vec![PropTag::SUBJECT]).unwrap());
        assert_eq!(state.cursor(), CursorState::ColumnsSet);
        state.advanced(2);
        assert_eq!(state.cursor(), CursorState::Positioned);
        state.advanced(0);
        assert_eq!(state.cursor(), CursorState::Exhausted);
        state.repositioned();
        assert_eq!(state.cursor(), CursorState::ColumnsSet);
    }

    #[test]
    fn set_columns_replaces_previous_declaration() {
        let mut state = TableState::new(0);
        state.set_columns(ColumnSet::new(vec![PropTag::SUBJECT]).unwrap());
        state.advanced(1);
        let wider = ColumnSet::new(vec![PropTag::SUBJECT, PropTag::MESSAGE_SIZE]).unwrap();
        state.set_columns(wider.clone());
        assert_eq!(state.columns(), Some(&wider));
        assert_eq!(state.cursor(), CursorState::ColumnsSet);
    }
}
