/*
 * lib.rs
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

//! Client-side engine for the Exchange remote-operation (ROP) protocol:
//! profile and session management, the request/response codec, typed
//! property values, object handles, table cursors, replica id sets, and
//! push-notification plumbing. The DCE/RPC wire itself is supplied by the
//! caller through the [`transport::RpcTransport`] trait.

pub mod codec;
pub mod error;
pub mod idset;
pub mod notify;
pub mod object;
pub mod ops;
pub mod property;
pub mod session;
pub mod table;
pub mod transport;

pub use error::{MapiError, MapiStatus};
pub use object::MapiObject;
pub use session::{MapiContext, Session};
