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

//! The ROP request/response codec. A transaction buffer carries a batch of
//! remote operations plus a trailing handle array; replies come back in
//! the same shape with a status code per operation. All integers are
//! little-endian.

pub mod request;
pub mod response;

pub use request::RopRequest;
pub use response::{ReplyBody, RopExpectation, RopReply, RopResponse};

/// Remote operation numbers ([MS-OXCROPS]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RopCode {
    Release = 0x01,
    OpenFolder = 0x02,
    OpenMessage = 0x03,
    GetHierarchyTable = 0x04,
    GetContentsTable = 0x05,
    CreateMessage = 0x06,
    GetProps = 0x07,
    SetColumns = 0x12,
    QueryRows = 0x15,
    QueryPosition = 0x17,
    SeekRow = 0x18,
    DeleteMessages = 0x1E,
    Notify = 0x28,
    RegisterNotification = 0x29,
    Logon = 0xFE,
}

impl RopCode {
    pub fn opnum(self) -> u8 {
        self as u8
    }

    pub fn from_opnum(opnum: u8) -> Option<RopCode> {
        match opnum {
            0x01 => Some(RopCode::Release),
            0x02 => Some(RopCode::OpenFolder),
            0x03 => Some(RopCode::OpenMessage),
            0x04 => Some(RopCode::GetHierarchyTable),
            0x05 => Some(RopCode::GetContentsTable),
            0x06 => Some(RopCode::CreateMessage),
            0x07 => Some(RopCode::GetProps),
            0x12 => Some(RopCode::SetColumns),
            0x15 => Some(RopCode::QueryRows),
            0x17 => Some(RopCode::QueryPosition),
            0x18 => Some(RopCode::SeekRow),
            0x1E => Some(RopCode::DeleteMessages),
            0x28 => Some(RopCode::Notify),
            0x29 => Some(RopCode::RegisterNotification),
            0xFE => Some(RopCode::Logon),
            _ => None,
        }
    }
}
