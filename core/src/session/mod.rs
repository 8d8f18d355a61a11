/*
 * mod.rs
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

//! Sessions. A [`Session`] owns one EMSMDB provider binding, an optional
//! directory-service binding, the live-handle registry, and the
//! notification subscription table. Every remote operation is a method on
//! the session; objects carry the id of the session that bound them and
//! are checked on each call.

pub mod context;
pub mod profile;

pub use context::MapiContext;
pub use profile::{Profile, ProfileStore};

use crate::codec::{RopCode, RopExpectation, RopRequest, RopResponse};
use crate::error::MapiError;
use crate::notify::NotificationRegistry;
use crate::object::{HandleRegistry, MapiObject};
use crate::transport::{NspiTransport, RpcTransport};

/// Identifies the context session an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

pub struct Session {
    id: SessionId,
    profile: Profile,
    transport: Box<dyn RpcTransport>,
    nspi: Option<Box<dyn NspiTransport>>,
    pub(crate) registry: HandleRegistry,
    pub(crate) notifications: NotificationRegistry,
    next_logon_id: u8,
    active: bool,
}

impl std::fmt::Debug for Session {
    // the transport boxes are opaque
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("profile", &self.profile.name)
            .field("active", &self.active)
            .field("handles", &self.registry.len())
            .field("subscriptions", &self.notifications.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(id: SessionId, profile: Profile, transport: Box<dyn RpcTransport>) -> Session {
        Session {
            id,
            profile,
            transport,
            nspi: None,
            registry: HandleRegistry::default(),
            notifications: NotificationRegistry::default(),
            next_logon_id: 0,
            active: true,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Attach the directory-service binding. Used at store logon to
    /// resolve the mailbox DN when the profile has none.
    pub fn attach_nspi(&mut self, nspi: Box<dyn NspiTransport>) {
        self.nspi = Some(nspi);
    }

    /// A fresh unbound object for this session. Local only.
    pub fn object(&self) -> MapiObject {
        MapiObject::new(self.id)
    }

    pub fn handle_registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Release every handle still registered, drop all subscriptions, and
    /// retire the session. Release failures are ignored; the server
    /// reclaims handles when the binding goes away.
    pub fn logoff(&mut self) -> Result<(), MapiError> {
        self.ensure_active()?;
        for handle in self.registry.drain() {
            let mut req = RopRequest::new();
            let idx = match req.add_handle(handle) {
                Ok(idx) => idx,
                Err(_) => continue,
            };
            req.add_rop(RopCode::Release, 0, idx, Vec::new());
            let _ = self.transact(&req, &[RopExpectation::Release]);
        }
        self.notifications = NotificationRegistry::default();
        self.active = false;
        Ok(())
    }

    pub(crate) fn ensure_active(&self) -> Result<(), MapiError> {
        if self.active {
            Ok(())
        } else {
            Err(MapiError::SessionLimit)
        }
    }

    /// Object must belong to this session and hold a live handle.
    pub(crate) fn check_object(&self, obj: &MapiObject) -> Result<(), MapiError> {
        self.ensure_active()?;
        if obj.session() != self.id {
            return Err(MapiError::InvalidParameter(
                "object belongs to another session".into(),
            ));
        }
        if obj.is_invalid() {
            return Err(MapiError::InvalidParameter(
                "object holds no server handle".into(),
            ));
        }
        Ok(())
    }

    /// Object must belong to this session and be unbound, ready to take a
    /// handle from a reply.
    pub(crate) fn check_fresh(&self, obj: &MapiObject) -> Result<(), MapiError> {
        self.ensure_active()?;
        if obj.session() != self.id {
            return Err(MapiError::InvalidParameter(
                "object belongs to another session".into(),
            ));
        }
        if !obj.is_invalid() {
            return Err(MapiError::InvalidParameter(
                "object is already bound; release it first".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn allocate_logon_id(&mut self) -> Result<u8, MapiError> {
        if self.next_logon_id == u8::MAX {
            return Err(MapiError::NotEnoughResources("logon ids exhausted".into()));
        }
        let id = self.next_logon_id;
        self.next_logon_id += 1;
        Ok(id)
    }

    pub(crate) fn resolve_mailbox_dn(&mut self) -> Result<String, MapiError> {
        if let Some(dn) = &self.profile.mailbox_dn {
            return Ok(dn.clone());
        }
        let username = self.profile.username.clone();
        if let Some(nspi) = &mut self.nspi {
            if let Some(dn) = nspi.resolve_dn(&username)? {
                return Ok(dn);
            }
        }
        Err(MapiError::InvalidParameter(format!(
            "no mailbox DN for account {}",
            username
        )))
    }

    /// One blocking round trip. Notify replies riding on the response are
    /// routed to subscriptions before the response is handed back.
    pub(crate) fn transact(
        &mut self,
        request: &RopRequest,
        expected: &[RopExpectation],
    ) -> Result<RopResponse, MapiError> {
        self.ensure_active()?;
        let wire = request.encode()?;
        let raw = self.transport.transaction(wire)?;
        let response = RopResponse::decode(raw, expected)?;
        for notify in &response.notifications {
            self.notifications.route(notify);
        }
        Ok(response)
    }
}
