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

//! Remote operations, grouped by the kind of object they act on. Each is
//! a method on [`crate::session::Session`]: local argument checks first,
//! one transaction, then local state updated only from a confirmed reply.

pub mod folder;
pub mod message;
pub mod notify;
pub mod props;
pub mod release;
pub mod store;
pub mod table;

pub use message::OpenMessageMode;
pub use store::FolderRole;
pub use table::{ReadDirection, SeekOrigin};
