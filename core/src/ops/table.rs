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

//! Table cursor operations. The server's row count is an estimate, so the
//! paging loop in [`Session::fetch_rows`] trusts only what actually comes
//! back: a short or empty batch ends the walk.

use bytes::{BufMut, BytesMut};

use crate::codec::{ReplyBody, RopCode, RopExpectation, RopRequest};
use crate::error::MapiError;
use crate::object::MapiObject;
use crate::property::{ColumnSet, RowSet};
use crate::session::Session;

/// Where a seek starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SeekOrigin {
    Beginning = 0x00,
    Current = 0x01,
    End = 0x02,
}

/// Which way QueryRows walks from the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadDirection {
    Backward = 0x00,
    Forward = 0x01,
}

impl Session {
    /// Declare the columns for subsequent row queries. Replaces any
    /// previous declaration on this table.
    pub fn set_columns(
        &mut self,
        table: &mut MapiObject,
        columns: ColumnSet,
    ) -> Result<(), MapiError> {
        self.check_object(table)?;
        table
            .table_state()
            .ok_or_else(|| MapiError::InvalidParameter("object is not a table".into()))?;

        let mut req = RopRequest::new();
        let input = req.add_handle(table.handle())?;
        let mut payload = BytesMut::new();
        payload.put_u8(0); // apply synchronously
        columns.encode(&mut payload);
        req.add_rop(RopCode::SetColumns, table.logon_id(), input, payload.to_vec());

        let resp = self.transact(&req, &[RopExpectation::SetColumns])?;
        resp.single()?.ok()?;
        if let Some(state) = table.table_state_mut() {
            state.set_columns(columns);
        }
        Ok(())
    }

    /// Fetch up to `count` rows in the given direction, advancing the
    /// cursor by what actually came back. Querying before declaring
    /// columns is a local error; nothing is transmitted.
    pub fn query_rows(
        &mut self,
        table: &mut MapiObject,
        count: u16,
        direction: ReadDirection,
    ) -> Result<RowSet, MapiError> {
        self.check_object(table)?;
        if count == 0 {
            return Err(MapiError::InvalidParameter("row count of zero".into()));
        }
        let columns = table
            .table_state()
            .ok_or_else(|| MapiError::InvalidParameter("object is not a table".into()))?
            .columns_for_query()?
            .clone();

        let mut req = RopRequest::new();
        let input = req.add_handle(table.handle())?;
        let mut payload = BytesMut::new();
        payload.put_u8(0); // advance cursor
        payload.put_u8(direction as u8);
        payload.put_u16_le(count);
        req.add_rop(RopCode::QueryRows, table.logon_id(), input, payload.to_vec());

        let resp = self.transact(&req, &[RopExpectation::QueryRows(columns)])?;
        let reply = resp.single()?;
        let rows = match reply.ok()? {
            ReplyBody::QueryRows { rows, .. } => rows.clone(),
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected query rows reply body {:?}",
                    other
                )))
            }
        };
        if let Some(state) = table.table_state_mut() {
            state.advanced(rows.len());
        }
        Ok(RowSet { rows })
    }

    /// Current cursor position as (numerator, denominator). The
    /// denominator is the server's size estimate, not a promise.
    pub fn query_position(&mut self, table: &MapiObject) -> Result<(u32, u32), MapiError> {
        self.check_object(table)?;
        table
            .table_state()
            .ok_or_else(|| MapiError::InvalidParameter("object is not a table".into()))?;

        let mut req = RopRequest::new();
        let input = req.add_handle(table.handle())?;
        req.add_rop(RopCode::QueryPosition, table.logon_id(), input, Vec::new());

        let resp = self.transact(&req, &[RopExpectation::QueryPosition])?;
        let reply = resp.single()?;
        match reply.ok()? {
            ReplyBody::QueryPosition {
                numerator,
                denominator,
            } => Ok((*numerator, *denominator)),
            other => Err(MapiError::CallFailed(format!(
                "unexpected query position reply body {:?}",
                other
            ))),
        }
    }

    /// Move the cursor. Returns how many rows were actually moved, which
    /// may be fewer than asked near the table edges.
    pub fn seek_row(
        &mut self,
        table: &mut MapiObject,
        origin: SeekOrigin,
        offset: i32,
    ) -> Result<i32, MapiError> {
        self.check_object(table)?;
        table
            .table_state()
            .ok_or_else(|| MapiError::InvalidParameter("object is not a table".into()))?;

        let mut req = RopRequest::new();
        let input = req.add_handle(table.handle())?;
        let mut payload = BytesMut::new();
        payload.put_u8(origin as u8);
        payload.put_i32_le(offset);
        payload.put_u8(1); // report rows moved
        req.add_rop(RopCode::SeekRow, table.logon_id(), input, payload.to_vec());

        let resp = self.transact(&req, &[RopExpectation::SeekRow])?;
        let reply = resp.single()?;
        let moved = match reply.ok()? {
            ReplyBody::SeekRow { rows_sought, .. } => *rows_sought,
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected seek reply body {:?}",
                    other
                )))
            }
        };
        if let Some(state) = table.table_state_mut() {
            state.repositioned();
        }
        Ok(moved)
    }

    /// Walk the whole table forward in batches of `batch_size`. Only an
    /// empty batch ends the walk; a short non-empty batch just means the
    /// server capped that response, not that the table is done.
    pub fn fetch_rows(
        &mut self,
        table: &mut MapiObject,
        batch_size: u16,
    ) -> Result<RowSet, MapiError> {
        if batch_size == 0 {
            return Err(MapiError::InvalidParameter("batch size of zero".into()));
        }
        let mut all = RowSet::default();
        loop {
            let batch = self.query_rows(table, batch_size, ReadDirection::Forward)?;
            if batch.is_empty() {
                return Ok(all);
            }
            all.rows.extend(batch.rows);
        }
    }
}
