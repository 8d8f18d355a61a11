/*
 * response.rs
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

//! Reply decoding. Reply payloads carry no per-operation length, so the
//! caller states what it asked for ([`RopExpectation`], in request order)
//! and each body is decoded by that expectation. A reply with a non-zero
//! status has no body. Notify replies are server-initiated and may appear
//! anywhere in the stream; they are collected separately.

use bytes::{Buf, Bytes};

use crate::codec::RopCode;
use crate::error::{MapiError, MapiStatus};
use crate::notify::RopNotify;
use crate::object::WellKnownFolders;
use crate::property::value::{get_cstring, get_wstring, need};
use crate::property::{ColumnSet, PropTag, Row};

/// What the client asked for, so the reply body can be decoded. Column
/// sets ride along for the bodies that decode rows. Release produces no
/// reply at all.
#[derive(Debug, Clone)]
pub enum RopExpectation {
    Release,
    Logon,
    OpenFolder,
    OpenMessage,
    GetHierarchyTable,
    GetContentsTable,
    CreateMessage,
    GetProps(ColumnSet),
    SetColumns,
    QueryRows(ColumnSet),
    QueryPosition,
    SeekRow,
    DeleteMessages,
    RegisterNotification,
}

impl RopExpectation {
    fn code(&self) -> RopCode {
        match self {
            RopExpectation::Release => RopCode::Release,
            RopExpectation::Logon => RopCode::Logon,
            RopExpectation::OpenFolder => RopCode::OpenFolder,
            RopExpectation::OpenMessage => RopCode::OpenMessage,
            RopExpectation::GetHierarchyTable => RopCode::GetHierarchyTable,
            RopExpectation::GetContentsTable => RopCode::GetContentsTable,
            RopExpectation::CreateMessage => RopCode::CreateMessage,
            RopExpectation::GetProps(_) => RopCode::GetProps,
            RopExpectation::SetColumns => RopCode::SetColumns,
            RopExpectation::QueryRows(_) => RopCode::QueryRows,
            RopExpectation::QueryPosition => RopCode::QueryPosition,
            RopExpectation::SeekRow => RopCode::SeekRow,
            RopExpectation::DeleteMessages => RopCode::DeleteMessages,
            RopExpectation::RegisterNotification => RopCode::RegisterNotification,
        }
    }
}

/// Timestamp block in the Logon reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogonTime {
    pub seconds: u8,
    pub minutes: u8,
    pub hour: u8,
    pub day_of_week: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonReply {
    pub logon_flags: u8,
    pub folders: WellKnownFolders,
    pub response_flags: u8,
    pub mailbox_guid: [u8; 16],
    pub repl_id: u16,
    pub repl_guid: [u8; 16],
    pub logon_time: LogonTime,
    pub gwart_time: u64,
    pub store_state: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFolderReply {
    pub has_rules: bool,
    pub is_ghosted: bool,
    /// Replica servers when the folder content lives elsewhere.
    pub ghost_servers: Vec<String>,
}

/// One recipient from an OpenMessage reply. The row bytes are kept raw;
/// recipient rows have their own self-sized encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRecipient {
    pub recipient_type: u8,
    pub codepage: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMessageReply {
    pub has_named_properties: bool,
    pub subject_prefix: Option<String>,
    pub normalized_subject: Option<String>,
    pub recipient_count: u16,
    pub recipient_columns: Vec<PropTag>,
    pub recipients: Vec<OpenRecipient>,
}

/// Decoded body of one successful reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    None,
    Logon(LogonReply),
    OpenFolder(OpenFolderReply),
    OpenMessage(OpenMessageReply),
    Table { row_count: u32 },
    CreateMessage { message_id: Option<u64> },
    GetProps(Row),
    SetColumns { table_status: u8 },
    QueryRows { origin: u8, rows: Vec<Row> },
    QueryPosition { numerator: u32, denominator: u32 },
    SeekRow { has_sought_less: bool, rows_sought: i32 },
    DeleteMessages { partial_completion: bool },
    RegisterNotification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RopReply {
    pub code: RopCode,
    pub handle_idx: u8,
    pub status: MapiStatus,
    pub body: ReplyBody,
}

impl RopReply {
    /// Fail on a non-zero status, otherwise hand back the body.
    pub fn ok(&self) -> Result<&ReplyBody, MapiError> {
        MapiError::from_status(self.status)?;
        Ok(&self.body)
    }
}

/// One decoded transaction reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RopResponse {
    pub replies: Vec<RopReply>,
    pub notifications: Vec<RopNotify>,
    pub handles: Vec<u32>,
}

impl RopResponse {
    pub fn decode(mut buf: Bytes, expected: &[RopExpectation]) -> Result<RopResponse, MapiError> {
        need(&buf, 6)?;
        let mapi_len = buf.get_u32_le() as usize;
        let length = buf.get_u16_le() as usize;
        if length < 2 || mapi_len < length || buf.remaining() != mapi_len - 2 {
            return Err(MapiError::CallFailed(format!(
                "reply framing inconsistent: mapi_len {} length {} remaining {}",
                mapi_len,
                length,
                buf.remaining()
            )));
        }
        if (mapi_len - length) % 4 != 0 {
            return Err(MapiError::CallFailed("reply handle array misaligned".into()));
        }
        let mut rops = buf.split_to(length - 2);
        let mut handles = Vec::with_capacity((mapi_len - length) / 4);
        while buf.has_remaining() {
            handles.push(buf.get_u32_le());
        }

        let mut expect = expected
            .iter()
            .filter(|e| !matches!(e, RopExpectation::Release));
        let mut replies = Vec::new();
        let mut notifications = Vec::new();
        while rops.has_remaining() {
            let opnum = rops.get_u8();
            let code = RopCode::from_opnum(opnum).ok_or_else(|| {
                MapiError::CallFailed(format!("unknown reply opnum 0x{:02x}", opnum))
            })?;
            if code == RopCode::Notify {
                notifications.push(RopNotify::decode(&mut rops)?);
                continue;
            }
            let exp = expect.next().ok_or_else(|| {
                MapiError::CallFailed(format!("reply {:?} was never requested", code))
            })?;
            if exp.code() != code {
                return Err(MapiError::CallFailed(format!(
                    "reply {:?} does not match requested {:?}",
                    code,
                    exp.code()
                )));
            }
            need(&rops, 5)?;
            let handle_idx = rops.get_u8();
            let status = MapiStatus(rops.get_u32_le());
            let body = if status.is_success() {
                decode_body(exp, &mut rops)?
            } else {
                ReplyBody::None
            };
            replies.push(RopReply {
                code,
                handle_idx,
                status,
                body,
            });
        }
        // a server stops emitting replies after the first failure, so
        // unanswered expectations past that point are not an error
        Ok(RopResponse {
            replies,
            notifications,
            handles,
        })
    }

    /// The lone reply of a single-operation transaction.
    pub fn single(&self) -> Result<&RopReply, MapiError> {
        self.replies
            .first()
            .ok_or_else(|| MapiError::CallFailed("reply stream was empty".into()))
    }

    pub fn handle(&self, idx: u8) -> Result<u32, MapiError> {
        self.handles
            .get(idx as usize)
            .copied()
            .ok_or_else(|| MapiError::CallFailed("reply handle array too short".into()))
    }
}

fn decode_body(exp: &RopExpectation, buf: &mut Bytes) -> Result<ReplyBody, MapiError> {
    match exp {
        RopExpectation::Release => Ok(ReplyBody::None),
        RopExpectation::Logon => Ok(ReplyBody::Logon(decode_logon(buf)?)),
        RopExpectation::OpenFolder => {
            need(buf, 2)?;
            let has_rules = buf.get_u8() != 0;
            let is_ghosted = buf.get_u8() != 0;
            let mut ghost_servers = Vec::new();
            if is_ghosted {
                need(buf, 4)?;
                let server_count = buf.get_u16_le();
                let _cheap_server_count = buf.get_u16_le();
                for _ in 0..server_count {
                    ghost_servers.push(get_cstring(buf)?);
                }
            }
            Ok(ReplyBody::OpenFolder(OpenFolderReply {
                has_rules,
                is_ghosted,
                ghost_servers,
            }))
        }
        RopExpectation::OpenMessage => Ok(ReplyBody::OpenMessage(decode_open_message(buf)?)),
        RopExpectation::GetHierarchyTable | RopExpectation::GetContentsTable => {
            need(buf, 4)?;
            Ok(ReplyBody::Table {
                row_count: buf.get_u32_le(),
            })
        }
        RopExpectation::CreateMessage => {
            need(buf, 1)?;
            let message_id = if buf.get_u8() != 0 {
                need(buf, 8)?;
                Some(buf.get_u64_le())
            } else {
                None
            };
            Ok(ReplyBody::CreateMessage { message_id })
        }
        RopExpectation::GetProps(columns) => Ok(ReplyBody::GetProps(Row::decode(columns, buf)?)),
        RopExpectation::SetColumns => {
            need(buf, 1)?;
            Ok(ReplyBody::SetColumns {
                table_status: buf.get_u8(),
            })
        }
        RopExpectation::QueryRows(columns) => {
            need(buf, 3)?;
            let origin = buf.get_u8();
            let count = buf.get_u16_le();
            let mut rows = Vec::with_capacity(count as usize);
            for _ in 0..count {
                rows.push(Row::decode(columns, buf)?);
            }
            Ok(ReplyBody::QueryRows { origin, rows })
        }
        RopExpectation::QueryPosition => {
            need(buf, 8)?;
            Ok(ReplyBody::QueryPosition {
                numerator: buf.get_u32_le(),
                denominator: buf.get_u32_le(),
            })
        }
        RopExpectation::SeekRow => {
            need(buf, 5)?;
            Ok(ReplyBody::SeekRow {
                has_sought_less: buf.get_u8() != 0,
                rows_sought: buf.get_i32_le(),
            })
        }
        RopExpectation::DeleteMessages => {
            need(buf, 1)?;
            Ok(ReplyBody::DeleteMessages {
                partial_completion: buf.get_u8() != 0,
            })
        }
        RopExpectation::RegisterNotification => Ok(ReplyBody::RegisterNotification),
    }
}

fn decode_logon(buf: &mut Bytes) -> Result<LogonReply, MapiError> {
    need(buf, 1)?;
    let logon_flags = buf.get_u8();
    let mut fids = [0u64; 13];
    for fid in fids.iter_mut() {
        need(buf, 8)?;
        *fid = buf.get_u64_le();
    }
    let folders = WellKnownFolders {
        root: fids[0],
        deferred_action: fids[1],
        spooler_queue: fids[2],
        top_information_store: fids[3],
        inbox: fids[4],
        outbox: fids[5],
        sent_items: fids[6],
        deleted_items: fids[7],
        common_views: fids[8],
        schedule: fids[9],
        search: fids[10],
        views: fids[11],
        shortcuts: fids[12],
    };
    need(buf, 1 + 16 + 2 + 16 + 8 + 8 + 4)?;
    let response_flags = buf.get_u8();
    let mut mailbox_guid = [0u8; 16];
    buf.copy_to_slice(&mut mailbox_guid);
    let repl_id = buf.get_u16_le();
    let mut repl_guid = [0u8; 16];
    buf.copy_to_slice(&mut repl_guid);
    let logon_time = LogonTime {
        seconds: buf.get_u8(),
        minutes: buf.get_u8(),
        hour: buf.get_u8(),
        day_of_week: buf.get_u8(),
        day: buf.get_u8(),
        month: buf.get_u8(),
        year: buf.get_u16_le(),
    };
    let gwart_time = buf.get_u64_le();
    let store_state = buf.get_u32_le();
    Ok(LogonReply {
        logon_flags,
        folders,
        response_flags,
        mailbox_guid,
        repl_id,
        repl_guid,
        logon_time,
        gwart_time,
        store_state,
    })
}

/// Prefixed string: one kind byte, then nothing (0x00), an empty string
/// (0x01), a byte string (0x02/0x03), or UTF-16 (0x04).
fn get_typed_string(buf: &mut Bytes) -> Result<Option<String>, MapiError> {
    need(buf, 1)?;
    match buf.get_u8() {
        0x00 => Ok(None),
        0x01 => Ok(Some(String::new())),
        0x02 | 0x03 => Ok(Some(get_cstring(buf)?)),
        0x04 => Ok(Some(get_wstring(buf)?)),
        other => Err(MapiError::CallFailed(format!(
            "unknown string kind 0x{:02x}",
            other
        ))),
    }
}

fn decode_open_message(buf: &mut Bytes) -> Result<OpenMessageReply, MapiError> {
    need(buf, 1)?;
    let has_named_properties = buf.get_u8() != 0;
    let subject_prefix = get_typed_string(buf)?;
    let normalized_subject = get_typed_string(buf)?;
    need(buf, 4)?;
    let recipient_count = buf.get_u16_le();
    let column_count = buf.get_u16_le();
    let mut recipient_columns = Vec::with_capacity(column_count as usize);
    for _ in 0..column_count {
        need(buf, 4)?;
        recipient_columns.push(PropTag(buf.get_u32_le()));
    }
    need(buf, 1)?;
    let row_count = buf.get_u8();
    let mut recipients = Vec::with_capacity(row_count as usize);
    for _ in 0..row_count {
        need(buf, 7)?;
        let recipient_type = buf.get_u8();
        let codepage = buf.get_u16_le();
        let _reserved = buf.get_u16_le();
        let size = buf.get_u16_le() as usize;
        need(buf, size)?;
        let mut data = vec![0u8; size];
        buf.copy_to_slice(&mut data);
        recipients.push(OpenRecipient {
            recipient_type,
            codepage,
            data,
        });
    }
    Ok(OpenMessageReply {
        has_named_properties,
        subject_prefix,
        normalized_subject,
        recipient_count,
        recipient_columns,
        recipients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn frame(rops: &[u8], handles: &[u32]) -> Bytes {
        let length = 2 + rops.len();
        let mapi_len = length + 4 * handles.len();
        let mut out = BytesMut::new();
        out.put_u32_le(mapi_len as u32);
        out.put_u16_le(length as u16);
        out.put_slice(rops);
        for h in handles {
            out.put_u32_le(*h);
        }
        out.freeze()
    }

    #[test]
    fn decodes_create_message_reply() {
        let mut rops = BytesMut::new();
        rops.put_u8(RopCode::CreateMessage.opnum());
        rops.put_u8(1); // handle index
        rops.put_u32_le(0); // success
        rops.put_u8(1); // has message id
        rops.put_u64_le(0xBEEF);
        let resp = RopResponse::decode(
            frame(&rops, &[0x11, 0x22]),
            &[RopExpectation::CreateMessage],
        )
        .unwrap();
        let reply = resp.single().unwrap();
        assert_eq!(reply.status, MapiStatus::SUCCESS);
        assert_eq!(
            reply.body,
            ReplyBody::CreateMessage {
                message_id: Some(0xBEEF)
            }
        );
        assert_eq!(resp.handle(1).unwrap(), 0x22);
    }

    #[test]
    fn failed_reply_has_no_body() {
        let mut rops = BytesMut::new();
        rops.put_u8(RopCode::OpenFolder.opnum());
        rops.put_u8(0);
        rops.put_u32_le(MapiStatus::NOT_FOUND.0);
        let resp =
            RopResponse::decode(frame(&rops, &[0x11]), &[RopExpectation::OpenFolder]).unwrap();
        let reply = resp.single().unwrap();
        assert_eq!(reply.body, ReplyBody::None);
        assert!(matches!(reply.ok(), Err(MapiError::NotFound)));
    }

    #[test]
    fn mismatched_reply_opnum_is_rejected() {
        let mut rops = BytesMut::new();
        rops.put_u8(RopCode::OpenFolder.opnum());
        rops.put_u8(0);
        rops.put_u32_le(0);
        rops.put_u8(0);
        rops.put_u8(0);
        let err =
            RopResponse::decode(frame(&rops, &[]), &[RopExpectation::QueryPosition]).unwrap_err();
        assert!(matches!(err, MapiError::CallFailed(_)));
    }

    #[test]
    fn release_expectation_consumes_no_reply() {
        let resp = RopResponse::decode(frame(&[], &[]), &[RopExpectation::Release]).unwrap();
        assert!(resp.replies.is_empty());
    }

    #[test]
    fn bad_framing_is_rejected() {
        let mut out = BytesMut::new();
        out.put_u32_le(100); // claims more than present
        out.put_u16_le(2);
        assert!(RopResponse::decode(out.freeze(), &[]).is_err());
    }
}
