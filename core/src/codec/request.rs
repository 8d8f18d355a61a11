/*
 * request.rs
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

//! Request framing. The buffer starts with the total length (`mapi_len`),
//! then the length of the ROP region including its own two bytes, then
//! each operation as opnum, logon id, handle index, payload, and finally
//! the handle array. Output slots in the handle array hold the sentinel;
//! the server fills them in the reply.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::RopCode;
use crate::error::MapiError;
use crate::object::INVALID_HANDLE;

struct Rop {
    code: RopCode,
    logon_id: u8,
    handle_idx: u8,
    payload: Vec<u8>,
}

/// One transaction buffer under construction.
pub struct RopRequest {
    rops: Vec<Rop>,
    handles: Vec<u32>,
}

impl Default for RopRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl RopRequest {
    pub fn new() -> RopRequest {
        RopRequest {
            rops: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Add an input handle and return its index in the handle array.
    pub fn add_handle(&mut self, handle: u32) -> Result<u8, MapiError> {
        self.push_handle(handle)
    }

    /// Reserve an output slot (sentinel on the wire) and return its index.
    pub fn add_output_handle(&mut self) -> Result<u8, MapiError> {
        self.push_handle(INVALID_HANDLE)
    }

    fn push_handle(&mut self, handle: u32) -> Result<u8, MapiError> {
        if self.handles.len() >= u8::MAX as usize {
            return Err(MapiError::NotEnoughResources(
                "handle array exhausted".into(),
            ));
        }
        self.handles.push(handle);
        Ok((self.handles.len() - 1) as u8)
    }

    pub fn add_rop(&mut self, code: RopCode, logon_id: u8, handle_idx: u8, payload: Vec<u8>) {
        self.rops.push(Rop {
            code,
            logon_id,
            handle_idx,
            payload,
        });
    }

    /// Operation codes in request order, for matching the reply.
    pub fn codes(&self) -> Vec<RopCode> {
        self.rops.iter().map(|r| r.code).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rops.is_empty()
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn encode(&self) -> Result<Bytes, MapiError> {
        let rop_bytes: usize = self.rops.iter().map(|r| 3 + r.payload.len()).sum();
        let length = 2 + rop_bytes;
        if length > u16::MAX as usize {
            return Err(MapiError::NotEnoughResources(
                "request exceeds the transaction size limit".into(),
            ));
        }
        let mapi_len = length + 4 * self.handles.len();
        let mut out = BytesMut::with_capacity(4 + mapi_len);
        out.put_u32_le(mapi_len as u32);
        out.put_u16_le(length as u16);
        for rop in &self.rops {
            out.put_u8(rop.code.opnum());
            out.put_u8(rop.logon_id);
            out.put_u8(rop.handle_idx);
            out.put_slice(&rop.payload);
        }
        for handle in &self.handles {
            out.put_u32_le(*handle);
        }
        Ok(out.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_frames_correctly() {
        // an empty transaction is legal: it polls for pending notifications
        let req = RopRequest::new();
        let wire = req.encode().unwrap();
        assert_eq!(&wire[..], &[2, 0, 0, 0, 2, 0]);
    }

    #[test]
    fn lengths_account_for_rops_and_handles() {
        let mut req = RopRequest::new();
        let folder = req.add_handle(0x11).unwrap();
        let out = req.add_output_handle().unwrap();
        assert_eq!((folder, out), (0, 1));
        req.add_rop(RopCode::CreateMessage, 0, folder, vec![out, 0xFF, 0x0F]);
        let wire = req.encode().unwrap();
        // rop region: 3 header + 3 payload; length = 8; mapi_len = 8 + 8
        assert_eq!(u32::from_le_bytes(wire[0..4].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(wire[4..6].try_into().unwrap()), 8);
        assert_eq!(wire[6], RopCode::CreateMessage.opnum());
        // handle array trails the rop region
        assert_eq!(u32::from_le_bytes(wire[12..16].try_into().unwrap()), 0x11);
        assert_eq!(
            u32::from_le_bytes(wire[16..20].try_into().unwrap()),
            INVALID_HANDLE
        );
    }
}
