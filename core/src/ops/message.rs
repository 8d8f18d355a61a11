/*
 * message.rs
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

//! Opening an existing message by folder and message id.

use bytes::{BufMut, BytesMut};

use crate::codec::response::OpenMessageReply;
use crate::codec::{ReplyBody, RopCode, RopExpectation, RopRequest};
use crate::error::MapiError;
use crate::object::MapiObject;
use crate::session::Session;

const CODEPAGE_OF_LOGON: u16 = 0x0FFF;

/// Access requested when opening a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpenMessageMode {
    ReadOnly = 0x00,
    ReadWrite = 0x01,
    /// Read-write when permitted, read-only otherwise.
    BestAccess = 0x03,
}

impl Session {
    /// Open the message identified by folder and message id against a
    /// store (or folder) object, binding `message` to it. A deleted or
    /// unknown id surfaces as `NotFound` from the server.
    pub fn open_message(
        &mut self,
        parent: &MapiObject,
        folder_id: u64,
        message_id: u64,
        mode: OpenMessageMode,
        message: &mut MapiObject,
    ) -> Result<OpenMessageReply, MapiError> {
        self.check_object(parent)?;
        self.check_fresh(message)?;

        let mut req = RopRequest::new();
        let input = req.add_handle(parent.handle())?;
        let out = req.add_output_handle()?;
        let mut payload = BytesMut::new();
        payload.put_u8(out);
        payload.put_u16_le(CODEPAGE_OF_LOGON);
        payload.put_u64_le(folder_id);
        payload.put_u8(mode as u8);
        payload.put_u64_le(message_id);
        req.add_rop(
            RopCode::OpenMessage,
            parent.logon_id(),
            input,
            payload.to_vec(),
        );

        let resp = self.transact(&req, &[RopExpectation::OpenMessage])?;
        let reply = resp.single()?;
        let body = match reply.ok()? {
            ReplyBody::OpenMessage(body) => body.clone(),
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected open message reply body {:?}",
                    other
                )))
            }
        };
        let handle = resp.handle(out)?;
        message.bind(handle, parent.logon_id(), message_id);
        self.registry.register(handle);
        Ok(body)
    }
}
