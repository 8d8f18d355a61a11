/*
 * release.rs
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

//! Releasing server handles. Local state resets only once the server has
//! confirmed the release; after a transport failure the object stays
//! bound so the caller can retry or leave it to logoff.

use crate::codec::{RopCode, RopExpectation, RopRequest};
use crate::error::MapiError;
use crate::object::MapiObject;
use crate::session::Session;

impl Session {
    /// Release the server-side object. A second release of the same
    /// object is a no-op: nothing is transmitted for an unbound object.
    pub fn release(&mut self, obj: &mut MapiObject) -> Result<(), MapiError> {
        self.ensure_active()?;
        if obj.session() != self.id() {
            return Err(MapiError::InvalidParameter(
                "object belongs to another session".into(),
            ));
        }
        if obj.is_invalid() {
            return Ok(());
        }

        let mut req = RopRequest::new();
        let input = req.add_handle(obj.handle())?;
        req.add_rop(RopCode::Release, obj.logon_id(), input, Vec::new());
        self.transact(&req, &[RopExpectation::Release])?;

        self.registry.unregister(obj.handle());
        obj.reset();
        Ok(())
    }
}
