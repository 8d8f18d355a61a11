/*
 * store.rs
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

//! Store logon. The Logon operation binds a store object to the mailbox
//! named by its distinguished name and hands back the well-known folder
//! ids, which are cached in the object payload so later folder-role
//! lookups stay local.

use bytes::{BufMut, BytesMut};

use crate::codec::{RopCode, RopExpectation, RopRequest};
use crate::error::MapiError;
use crate::object::{MapiObject, ObjectPayload, StoreInfo};
use crate::property::value::put_cstring;
use crate::session::Session;

/// Private-mailbox logon.
const LOGON_FLAG_PRIVATE: u8 = 0x01;
/// Replica ids in replies are scoped per mailbox database.
const OPEN_FLAG_USE_PER_MDB_REPLID_MAPPING: u32 = 0x0100_0000;
/// Logon targets the account's home database.
const OPEN_FLAG_HOME_LOGON: u32 = 0x0000_0400;

/// Folder roles resolvable against a logged-on store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRole {
    TopInformationStore,
    Inbox,
    Outbox,
    SentItems,
    DeletedItems,
    CommonViews,
    Schedule,
    Search,
    Views,
    Shortcuts,
    Calendar,
    Contacts,
    Tasks,
    Notes,
    Journal,
    Drafts,
}

impl Session {
    /// Log on to the mailbox store. Binds `obj` as the store object and
    /// caches the well-known folder ids and mailbox identity from the
    /// reply.
    pub fn open_msg_store(&mut self, obj: &mut MapiObject) -> Result<(), MapiError> {
        self.check_fresh(obj)?;
        let essdn = self.resolve_mailbox_dn()?;
        let logon_id = self.allocate_logon_id()?;

        let mut req = RopRequest::new();
        let out = req.add_output_handle()?;
        let mut payload = BytesMut::new();
        payload.put_u8(LOGON_FLAG_PRIVATE);
        payload.put_u32_le(OPEN_FLAG_USE_PER_MDB_REPLID_MAPPING | OPEN_FLAG_HOME_LOGON);
        payload.put_u32_le(0); // store state
        put_cstring(&mut payload, &essdn);
        req.add_rop(RopCode::Logon, logon_id, out, payload.to_vec());

        let resp = self.transact(&req, &[RopExpectation::Logon])?;
        let reply = resp.single()?;
        let body = match reply.ok()? {
            crate::codec::ReplyBody::Logon(body) => body.clone(),
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected logon reply body {:?}",
                    other
                )))
            }
        };
        let handle = resp.handle(out)?;
        obj.bind(handle, logon_id, body.folders.root);
        obj.set_payload(ObjectPayload::Store(StoreInfo {
            mailbox_guid: body.mailbox_guid,
            repl_id: body.repl_id,
            repl_guid: body.repl_guid,
            store_state: body.store_state,
            folders: body.folders,
        }));
        self.registry.register(handle);
        Ok(())
    }

    /// Resolve a folder role against the ids cached at logon. Roles the
    /// logon reply does not carry resolve to `NotFound`; nothing is
    /// transmitted either way.
    pub fn get_default_folder(
        &self,
        store: &MapiObject,
        role: FolderRole,
    ) -> Result<u64, MapiError> {
        self.check_object(store)?;
        let info = store
            .store_info()
            .ok_or_else(|| MapiError::InvalidParameter("object is not a store".into()))?;
        let folders = &info.folders;
        let fid = match role {
            FolderRole::TopInformationStore => folders.top_information_store,
            FolderRole::Inbox => folders.inbox,
            FolderRole::Outbox => folders.outbox,
            FolderRole::SentItems => folders.sent_items,
            FolderRole::DeletedItems => folders.deleted_items,
            FolderRole::CommonViews => folders.common_views,
            FolderRole::Schedule => folders.schedule,
            FolderRole::Search => folders.search,
            FolderRole::Views => folders.views,
            FolderRole::Shortcuts => folders.shortcuts,
            FolderRole::Calendar
            | FolderRole::Contacts
            | FolderRole::Tasks
            | FolderRole::Notes
            | FolderRole::Journal
            | FolderRole::Drafts => return Err(MapiError::NotFound),
        };
        if fid == 0 {
            return Err(MapiError::NotFound);
        }
        Ok(fid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::WellKnownFolders;
    use crate::session::SessionId;
    use crate::session::{Profile, Session};
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

    fn store_object(session: &Session) -> MapiObject {
        let mut obj = session.object();
        obj.bind(5, 0, 0x1);
        obj.set_payload(ObjectPayload::Store(StoreInfo {
            mailbox_guid: [0; 16],
            repl_id: 1,
            repl_guid: [1; 16],
            store_state: 0,
            folders: WellKnownFolders {
                root: 0x1,
                inbox: 0x5,
                outbox: 0x6,
                sent_items: 0x7,
                deleted_items: 0x8,
                top_information_store: 0x4,
                ..Default::default()
            },
        }));
        obj
    }

    #[test]
    fn cached_roles_resolve_locally() {
        let session = session();
        let store = store_object(&session);
        assert_eq!(
            session.get_default_folder(&store, FolderRole::Inbox).unwrap(),
            0x5
        );
        assert_eq!(
            session
                .get_default_folder(&store, FolderRole::SentItems)
                .unwrap(),
            0x7
        );
    }

    #[test]
    fn extended_roles_are_not_found() {
        let session = session();
        let store = store_object(&session);
        assert!(matches!(
            session.get_default_folder(&store, FolderRole::Calendar),
            Err(MapiError::NotFound)
        ));
    }

    #[test]
    fn zero_fid_is_not_found() {
        let session = session();
        let store = store_object(&session);
        assert!(matches!(
            session.get_default_folder(&store, FolderRole::Views),
            Err(MapiError::NotFound)
        ));
    }

    #[test]
    fn non_store_object_is_rejected() {
        let session = session();
        let mut obj = session.object();
        obj.bind(6, 0, 0);
        assert!(matches!(
            session.get_default_folder(&obj, FolderRole::Inbox),
            Err(MapiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn logon_requires_mailbox_dn() {
        let mut session = session();
        let mut obj = session.object();
        let err = session.open_msg_store(&mut obj).unwrap_err();
        assert!(matches!(err, MapiError::InvalidParameter(_)));
        assert!(obj.is_invalid());
    }
}
