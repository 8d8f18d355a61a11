/*
 * props.rs
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

//! Property retrieval on any bound object.

use bytes::{BufMut, BytesMut};

use crate::codec::{ReplyBody, RopCode, RopExpectation, RopRequest};
use crate::error::MapiError;
use crate::object::MapiObject;
use crate::property::{ColumnSet, Row};
use crate::session::Session;

impl Session {
    /// Fetch the requested properties of a bound object as one row.
    /// Columns the object does not have come back as `NotFound` cells,
    /// not as an operation failure.
    pub fn get_props(&mut self, obj: &MapiObject, columns: &ColumnSet) -> Result<Row, MapiError> {
        self.check_object(obj)?;

        let mut req = RopRequest::new();
        let input = req.add_handle(obj.handle())?;
        let mut payload = BytesMut::new();
        payload.put_u16_le(0); // no size limit
        payload.put_u16_le(1); // unicode strings
        columns.encode(&mut payload);
        req.add_rop(RopCode::GetProps, obj.logon_id(), input, payload.to_vec());

        let resp = self.transact(&req, &[RopExpectation::GetProps(columns.clone())])?;
        let reply = resp.single()?;
        match reply.ok()? {
            ReplyBody::GetProps(row) => Ok(row.clone()),
            other => Err(MapiError::CallFailed(format!(
                "unexpected get props reply body {:?}",
                other
            ))),
        }
    }
}
