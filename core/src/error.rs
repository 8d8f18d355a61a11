/*
 * error.rs
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

//! Engine errors and server-side status codes. Transport failures
//! (`CallFailed`) are kept distinct from protocol-level failures
//! (`Protocol`): the former means the request may never have reached the
//! server, the latter means the server answered and said no.

use std::fmt;

/// Status code carried in a ROP reply. Zero is success; everything else is
/// a server-side MAPI error (MAPI_E_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapiStatus(pub u32);

impl MapiStatus {
    pub const SUCCESS: MapiStatus = MapiStatus(0);
    pub const NO_SUPPORT: MapiStatus = MapiStatus(0x8004_0102);
    pub const CALL_FAILED: MapiStatus = MapiStatus(0x8000_4005);
    pub const NOT_ENOUGH_MEMORY: MapiStatus = MapiStatus(0x8007_000E);
    pub const INVALID_PARAMETER: MapiStatus = MapiStatus(0x8007_0057);
    pub const NO_ACCESS: MapiStatus = MapiStatus(0x8007_0005);
    pub const NOT_FOUND: MapiStatus = MapiStatus(0x8004_010F);
    pub const LOGON_FAILED: MapiStatus = MapiStatus(0x8004_0111);
    pub const SESSION_LIMIT: MapiStatus = MapiStatus(0x8004_0112);
    pub const NETWORK_ERROR: MapiStatus = MapiStatus(0x8004_0115);
    pub const END_OF_SESSION: MapiStatus = MapiStatus(0x8004_0200);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Symbolic name for the well-known codes, if this is one of them.
    pub fn name(self) -> Option<&'static str> {
        match self {
            MapiStatus::SUCCESS => Some("MAPI_E_SUCCESS"),
            MapiStatus::NO_SUPPORT => Some("MAPI_E_NO_SUPPORT"),
            MapiStatus::CALL_FAILED => Some("MAPI_E_CALL_FAILED"),
            MapiStatus::NOT_ENOUGH_MEMORY => Some("MAPI_E_NOT_ENOUGH_MEMORY"),
            MapiStatus::INVALID_PARAMETER => Some("MAPI_E_INVALID_PARAMETER"),
            MapiStatus::NO_ACCESS => Some("MAPI_E_NO_ACCESS"),
            MapiStatus::NOT_FOUND => Some("MAPI_E_NOT_FOUND"),
            MapiStatus::LOGON_FAILED => Some("MAPI_E_LOGON_FAILED"),
            MapiStatus::SESSION_LIMIT => Some("MAPI_E_SESSION_LIMIT"),
            MapiStatus::NETWORK_ERROR => Some("MAPI_E_NETWORK_ERROR"),
            MapiStatus::END_OF_SESSION => Some("MAPI_E_END_OF_SESSION"),
            _ => None,
        }
    }
}

impl fmt::Display for MapiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(n) => write!(f, "{}", n),
            None => write!(f, "0x{:08x}", self.0),
        }
    }
}

/// Errors from session, codec, table, id set, or notification operations.
#[derive(Debug)]
pub enum MapiError {
    /// Operation requires an initialized context or a live session.
    NotInitialized,
    /// Caller-supplied argument rejected before anything was transmitted.
    InvalidParameter(String),
    /// A local resource (handle slot, buffer, socket) could not be obtained.
    NotEnoughResources(String),
    /// The transport failed; the request may or may not have been executed.
    CallFailed(String),
    /// The server answered with a non-zero status code.
    Protocol(MapiStatus),
    /// The named profile, folder role, or object does not exist.
    NotFound,
    /// The session is no longer usable (logged off or torn down).
    SessionLimit,
}

impl MapiError {
    /// Classify a reply status: zero is Ok, MAPI_E_NOT_FOUND becomes the
    /// dedicated variant, anything else is a protocol error.
    pub fn from_status(status: MapiStatus) -> Result<(), MapiError> {
        if status.is_success() {
            Ok(())
        } else if status == MapiStatus::NOT_FOUND {
            Err(MapiError::NotFound)
        } else {
            Err(MapiError::Protocol(status))
        }
    }
}

impl fmt::Display for MapiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapiError::NotInitialized => write!(f, "context not initialized"),
            MapiError::InvalidParameter(m) => write!(f, "invalid parameter: {}", m),
            MapiError::NotEnoughResources(m) => write!(f, "not enough resources: {}", m),
            MapiError::CallFailed(m) => write!(f, "call failed: {}", m),
            MapiError::Protocol(status) => write!(f, "server error {}", status),
            MapiError::NotFound => write!(f, "not found"),
            MapiError::SessionLimit => write!(f, "session unavailable"),
        }
    }
}

impl std::error::Error for MapiError {}

impl From<std::io::Error> for MapiError {
    fn from(e: std::io::Error) -> Self {
        MapiError::CallFailed(e.to_string())
    }
}
