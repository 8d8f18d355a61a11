/*
 * transport.rs
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

//! Provider transport seams. The engine frames requests and decodes
//! replies; carrying the bytes over DCE/RPC (and authenticating the
//! binding) is the caller's concern, injected at logon.

use bytes::Bytes;

use crate::error::MapiError;

/// One blocking round trip on the EMSMDB provider binding. A transport
/// failure must surface as [`MapiError::CallFailed`]; the engine then
/// treats the operation's outcome as unknown and leaves local object
/// state untouched.
pub trait RpcTransport: Send {
    fn transaction(&mut self, request: Bytes) -> Result<Bytes, MapiError>;
}

/// The directory-service provider binding. Only the lookup the engine
/// itself needs is modelled: resolving an account to its mailbox
/// distinguished name at logon when the profile does not carry one.
pub trait NspiTransport: Send {
    fn resolve_dn(&mut self, username: &str) -> Result<Option<String>, MapiError>;
}
