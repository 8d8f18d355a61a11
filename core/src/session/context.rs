/*
 * context.rs
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

//! The engine context. Explicit and caller-owned: every context stands
//! alone with its own profile store, and several can coexist in one
//! process. Initialization is retry-safe; a failed attempt leaves nothing
//! behind.

use std::path::Path;

use crate::error::MapiError;
use crate::session::profile::ProfileStore;
use crate::session::{Session, SessionId};
use crate::transport::RpcTransport;

#[derive(Debug)]
pub struct MapiContext {
    store: ProfileStore,
    next_session: u32,
}

impl MapiContext {
    /// Open the profile store at `path`, or at the default location when
    /// no path is given.
    pub fn initialize(path: Option<&Path>) -> Result<MapiContext, MapiError> {
        let store = match path {
            Some(p) => ProfileStore::open(p)?,
            None => ProfileStore::open(&ProfileStore::default_path()?)?,
        };
        Ok(MapiContext {
            store,
            next_session: 0,
        })
    }

    pub fn profile_store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn profile_store_mut(&mut self) -> &mut ProfileStore {
        &mut self.store
    }

    /// Bind a session to the named profile (or the default one) over the
    /// given provider transport. The session owns the transport from here
    /// on; nothing is transmitted until the first operation.
    pub fn logon(
        &mut self,
        profile_name: Option<&str>,
        transport: Box<dyn RpcTransport>,
    ) -> Result<Session, MapiError> {
        let profile = self.store.get(profile_name)?.clone();
        self.next_session += 1;
        Ok(Session::new(SessionId(self.next_session), profile, transport))
    }
}
