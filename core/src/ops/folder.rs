/*
 * folder.rs
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

//! Folder operations: opening folders, creating and deleting messages,
//! and opening the contents and hierarchy tables.

use bytes::{BufMut, BytesMut};

use crate::codec::response::OpenFolderReply;
use crate::codec::{ReplyBody, RopCode, RopExpectation, RopRequest};
use crate::error::MapiError;
use crate::object::{MapiObject, ObjectPayload};
use crate::session::Session;
use crate::table::TableState;

/// Codepage id placed in create/open message requests; 0x0FFF asks the
/// server to use the logon codepage.
const CODEPAGE_OF_LOGON: u16 = 0x0FFF;

impl Session {
    /// Open the folder with the given id under a parent object (a store
    /// or a folder) and bind `folder` to it.
    pub fn open_folder(
        &mut self,
        parent: &MapiObject,
        folder_id: u64,
        folder: &mut MapiObject,
    ) -> Result<OpenFolderReply, MapiError> {
        self.check_object(parent)?;
        self.check_fresh(folder)?;

        let mut req = RopRequest::new();
        let input = req.add_handle(parent.handle())?;
        let out = req.add_output_handle()?;
        let mut payload = BytesMut::new();
        payload.put_u8(out);
        payload.put_u64_le(folder_id);
        payload.put_u8(0); // open mode
        req.add_rop(RopCode::OpenFolder, parent.logon_id(), input, payload.to_vec());

        let resp = self.transact(&req, &[RopExpectation::OpenFolder])?;
        let reply = resp.single()?;
        let body = match reply.ok()? {
            ReplyBody::OpenFolder(body) => body.clone(),
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected open folder reply body {:?}",
                    other
                )))
            }
        };
        let handle = resp.handle(out)?;
        folder.bind(handle, parent.logon_id(), folder_id);
        self.registry.register(handle);
        Ok(body)
    }

    /// Create a message in the folder and bind `message` to it. Returns
    /// the message id when the server assigns one up front.
    pub fn create_message(
        &mut self,
        folder: &MapiObject,
        message: &mut MapiObject,
    ) -> Result<Option<u64>, MapiError> {
        self.check_object(folder)?;
        self.check_fresh(message)?;

        let mut req = RopRequest::new();
        let input = req.add_handle(folder.handle())?;
        let out = req.add_output_handle()?;
        let mut payload = BytesMut::new();
        payload.put_u8(out);
        payload.put_u16_le(CODEPAGE_OF_LOGON);
        payload.put_u64_le(folder.id());
        payload.put_u8(0); // not folder-associated
        req.add_rop(
            RopCode::CreateMessage,
            folder.logon_id(),
            input,
            payload.to_vec(),
        );

        let resp = self.transact(&req, &[RopExpectation::CreateMessage])?;
        let reply = resp.single()?;
        let message_id = match reply.ok()? {
            ReplyBody::CreateMessage { message_id } => *message_id,
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected create message reply body {:?}",
                    other
                )))
            }
        };
        let handle = resp.handle(out)?;
        message.bind(handle, folder.logon_id(), message_id.unwrap_or(0));
        self.registry.register(handle);
        Ok(message_id)
    }

    /// Delete messages from the folder. The whole batch succeeds or
    /// fails; a partial completion reported by the server is surfaced.
    pub fn delete_messages(
        &mut self,
        folder: &MapiObject,
        message_ids: &[u64],
    ) -> Result<(), MapiError> {
        self.check_object(folder)?;
        if message_ids.is_empty() {
            return Err(MapiError::InvalidParameter("no message ids to delete".into()));
        }
        if message_ids.len() > u16::MAX as usize {
            return Err(MapiError::InvalidParameter(
                "too many message ids for one delete".into(),
            ));
        }

        let mut req = RopRequest::new();
        let input = req.add_handle(folder.handle())?;
        let mut payload = BytesMut::new();
        payload.put_u8(0); // synchronous
        payload.put_u8(0); // no non-read notification
        payload.put_u16_le(message_ids.len() as u16);
        for id in message_ids {
            payload.put_u64_le(*id);
        }
        req.add_rop(
            RopCode::DeleteMessages,
            folder.logon_id(),
            input,
            payload.to_vec(),
        );

        let resp = self.transact(&req, &[RopExpectation::DeleteMessages])?;
        let reply = resp.single()?;
        match reply.ok()? {
            ReplyBody::DeleteMessages {
                partial_completion: false,
            } => Ok(()),
            ReplyBody::DeleteMessages {
                partial_completion: true,
            } => Err(MapiError::CallFailed(
                "server deleted only part of the batch".into(),
            )),
            other => Err(MapiError::CallFailed(format!(
                "unexpected delete reply body {:?}",
                other
            ))),
        }
    }

    /// Open the contents table of a folder. Returns the server's row
    /// count estimate, which is also cached in the table state.
    pub fn get_contents_table(
        &mut self,
        folder: &MapiObject,
        table: &mut MapiObject,
    ) -> Result<u32, MapiError> {
        self.open_table(folder, table, RopCode::GetContentsTable)
    }

    /// Open the hierarchy (subfolder) table of a folder.
    pub fn get_hierarchy_table(
        &mut self,
        folder: &MapiObject,
        table: &mut MapiObject,
    ) -> Result<u32, MapiError> {
        self.open_table(folder, table, RopCode::GetHierarchyTable)
    }

    fn open_table(
        &mut self,
        folder: &MapiObject,
        table: &mut MapiObject,
        code: RopCode,
    ) -> Result<u32, MapiError> {
        self.check_object(folder)?;
        self.check_fresh(table)?;

        let mut req = RopRequest::new();
        let input = req.add_handle(folder.handle())?;
        let out = req.add_output_handle()?;
        let payload = vec![out, 0]; // output index, table flags
        req.add_rop(code, folder.logon_id(), input, payload);

        let expectation = if code == RopCode::GetContentsTable {
            RopExpectation::GetContentsTable
        } else {
            RopExpectation::GetHierarchyTable
        };
        let resp = self.transact(&req, &[expectation])?;
        let reply = resp.single()?;
        let row_count = match reply.ok()? {
            ReplyBody::Table { row_count } => *row_count,
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected table reply body {:?}",
                    other
                )))
            }
        };
        let handle = resp.handle(out)?;
        table.bind(handle, folder.logon_id(), folder.id());
        table.set_payload(ObjectPayload::Table(TableState::new(row_count)));
        self.registry.register(handle);
        Ok(row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Profile, Session, SessionId};
    use crate::transport::RpcTransport;
    use bytes::Bytes;

    struct NullTransport;
    impl RpcTransport for NullTransport {
        fn transaction(&mut self, _request: Bytes) -> Result<Bytes, MapiError> {
            Err(MapiError::CallFailed("no server".into()))
        }
    }

    fn session() -> Session {
        Session::new(
            SessionId(1),
            Profile::new("work", "jdoe"),
            Box::new(NullTransport),
        )
    }

    #[test]
    fn delete_with_no_ids_is_rejected_locally() {
        let mut session = session();
        let mut folder = session.object();
        folder.bind(4, 0, 0x10);
        // fails before any transaction: NullTransport would return CallFailed
        assert!(matches!(
            session.delete_messages(&folder, &[]),
            Err(MapiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn unbound_parent_is_rejected_locally() {
        let mut session = session();
        let parent = session.object();
        let mut child = session.object();
        assert!(matches!(
            session.open_folder(&parent, 0x10, &mut child),
            Err(MapiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn bound_target_is_rejected_locally() {
        let mut session = session();
        let mut parent = session.object();
        parent.bind(4, 0, 0x10);
        let mut child = session.object();
        child.bind(5, 0, 0x11);
        assert!(matches!(
            session.open_folder(&parent, 0x12, &mut child),
            Err(MapiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn transport_failure_leaves_target_unbound() {
        let mut session = session();
        let mut folder = session.object();
        folder.bind(4, 0, 0x10);
        let mut message = session.object();
        assert!(matches!(
            session.create_message(&folder, &mut message),
            Err(MapiError::CallFailed(_))
        ));
        assert!(message.is_invalid());
        assert!(session.handle_registry().is_empty());
    }
}
