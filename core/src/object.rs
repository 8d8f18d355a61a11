/*
 * object.rs
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

//! Client-side object handles. A [`MapiObject`] is a local stand-in for a
//! server-side object (store, folder, message, table); the server names it
//! by a 32-bit handle returned in the response handle array. An object
//! starts unbound (sentinel handle) and returns to that state only when a
//! Release has been confirmed by the server.

use std::collections::HashSet;

use crate::session::SessionId;
use crate::table::TableState;

/// Sentinel for an object with no server-side handle.
pub const INVALID_HANDLE: u32 = 0xFFFF_FFFF;

/// Folder ids the server hands back at logon, in reply order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WellKnownFolders {
    pub root: u64,
    pub deferred_action: u64,
    pub spooler_queue: u64,
    pub top_information_store: u64,
    pub inbox: u64,
    pub outbox: u64,
    pub sent_items: u64,
    pub deleted_items: u64,
    pub common_views: u64,
    pub schedule: u64,
    pub search: u64,
    pub views: u64,
    pub shortcuts: u64,
}

/// Mailbox facts cached from the Logon reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub mailbox_guid: [u8; 16],
    pub repl_id: u16,
    pub repl_guid: [u8; 16],
    pub store_state: u32,
    pub folders: WellKnownFolders,
}

/// State attached to an object beyond its handle. The variant says what
/// kind of server object the handle names.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ObjectPayload {
    #[default]
    None,
    Store(StoreInfo),
    Table(TableState),
}

/// A client-side handle to a server-side object.
#[derive(Debug, Clone, PartialEq)]
pub struct MapiObject {
    id: u64,
    handle: u32,
    logon_id: u8,
    session: SessionId,
    payload: ObjectPayload,
}

impl MapiObject {
    /// A fresh unbound object for the given session. Purely local; nothing
    /// is transmitted until an operation binds it.
    pub(crate) fn new(session: SessionId) -> MapiObject {
        MapiObject {
            id: 0,
            handle: INVALID_HANDLE,
            logon_id: 0,
            session,
            payload: ObjectPayload::None,
        }
    }

    /// Folder or message id of the server object, zero when unknown.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn logon_id(&self) -> u8 {
        self.logon_id
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// True when the object holds no server-side handle.
    pub fn is_invalid(&self) -> bool {
        self.handle == INVALID_HANDLE
    }

    pub fn payload(&self) -> &ObjectPayload {
        &self.payload
    }

    /// Cached store facts, when this object is a logged-on store.
    pub fn store_info(&self) -> Option<&StoreInfo> {
        match &self.payload {
            ObjectPayload::Store(info) => Some(info),
            _ => None,
        }
    }

    pub fn table_state(&self) -> Option<&TableState> {
        match &self.payload {
            ObjectPayload::Table(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn table_state_mut(&mut self) -> Option<&mut TableState> {
        match &mut self.payload {
            ObjectPayload::Table(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn bind(&mut self, handle: u32, logon_id: u8, id: u64) {
        self.handle = handle;
        self.logon_id = logon_id;
        self.id = id;
    }

    pub(crate) fn set_payload(&mut self, payload: ObjectPayload) {
        self.payload = payload;
    }

    /// Back to the unbound state. Only called once a Release (or logoff)
    /// has been confirmed.
    pub(crate) fn reset(&mut self) {
        self.id = 0;
        self.handle = INVALID_HANDLE;
        self.logon_id = 0;
        self.payload = ObjectPayload::None;
    }
}

/// Live handles of one session, so logoff can force-release whatever the
/// caller forgot. Membership only; the objects themselves stay with the
/// caller.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    live: HashSet<u32>,
}

impl HandleRegistry {
    pub fn register(&mut self, handle: u32) {
        if handle != INVALID_HANDLE {
            self.live.insert(handle);
        }
    }

    pub fn unregister(&mut self, handle: u32) {
        self.live.remove(&handle);
    }

    pub fn contains(&self, handle: u32) -> bool {
        self.live.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<u32> {
        self.live.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_object_is_invalid() {
        let obj = MapiObject::new(SessionId(1));
        assert!(obj.is_invalid());
        assert_eq!(obj.id(), 0);
        assert_eq!(obj.payload(), &ObjectPayload::None);
    }

    #[test]
    fn bind_and_reset_round_trip() {
        let mut obj = MapiObject::new(SessionId(1));
        obj.bind(42, 3, 0xDEAD);
        assert!(!obj.is_invalid());
        assert_eq!(obj.handle(), 42);
        assert_eq!(obj.logon_id(), 3);
        obj.reset();
        assert!(obj.is_invalid());
        assert_eq!(obj.logon_id(), 0);
    }

    #[test]
    fn registry_ignores_sentinel() {
        let mut reg = HandleRegistry::default();
        reg.register(INVALID_HANDLE);
        assert!(reg.is_empty());
        reg.register(7);
        assert!(reg.contains(7));
        reg.unregister(7);
        assert!(reg.is_empty());
    }
}
