/*
 * notify.rs
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

//! Server push notifications. The server signals "something is pending"
//! with a bare UDP datagram; the client then runs an empty transaction and
//! the server piggybacks Notify replies on it. Decoded events are routed
//! to per-subscription channels matched on the notification handle and the
//! subscribed event mask. Delivery is at-least-once; consumers must
//! tolerate duplicates.

use std::net::UdpSocket;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use bytes::{Buf, Bytes};

use crate::error::MapiError;
use crate::property::value::{get_cstring, get_wstring, need};
use crate::property::PropTag;

/// Event bits for subscriptions (fnev*). The upper bits qualify what the
/// notification is about rather than what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMask(pub u32);

impl EventMask {
    pub const CRITICAL_ERROR: EventMask = EventMask(0x0001);
    pub const NEW_MAIL: EventMask = EventMask(0x0002);
    pub const OBJECT_CREATED: EventMask = EventMask(0x0004);
    pub const OBJECT_DELETED: EventMask = EventMask(0x0008);
    pub const OBJECT_MODIFIED: EventMask = EventMask(0x0010);
    pub const OBJECT_MOVED: EventMask = EventMask(0x0020);
    pub const OBJECT_COPIED: EventMask = EventMask(0x0040);
    pub const SEARCH_COMPLETE: EventMask = EventMask(0x0080);
    pub const TABLE_MODIFIED: EventMask = EventMask(0x0100);

    /// Qualifier bits: table, unicode, search, message.
    pub const QUAL_TABLE: EventMask = EventMask(0x1000);
    pub const QUAL_UNICODE: EventMask = EventMask(0x2000);
    pub const QUAL_SEARCH: EventMask = EventMask(0x4000);
    pub const QUAL_MESSAGE: EventMask = EventMask(0x8000);

    pub fn contains(self, bit: EventMask) -> bool {
        self.0 & bit.0 != 0
    }
}

impl std::ops::BitOr for EventMask {
    type Output = EventMask;
    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

/// Table-scoped notification detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    Changed,
    RestrictionChanged,
    RowAdded {
        folder_id: u64,
        message_id: Option<u64>,
        instance: Option<u32>,
        insert_after_folder_id: u64,
        insert_after_message_id: Option<u64>,
        insert_after_instance: Option<u32>,
        row_data: Vec<u8>,
    },
    RowDeleted {
        folder_id: u64,
        message_id: Option<u64>,
        instance: Option<u32>,
    },
    RowModified {
        folder_id: u64,
        message_id: Option<u64>,
        instance: Option<u32>,
        insert_after_folder_id: u64,
        insert_after_message_id: Option<u64>,
        insert_after_instance: Option<u32>,
        row_data: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    NewMail {
        folder_id: u64,
        message_id: Option<u64>,
        message_flags: u32,
        message_class: String,
    },
    ObjectCreated {
        folder_id: u64,
        message_id: Option<u64>,
        parent_id: u64,
        tags: Vec<PropTag>,
    },
    ObjectDeleted {
        folder_id: u64,
        message_id: Option<u64>,
    },
    ObjectModified {
        folder_id: u64,
        message_id: Option<u64>,
        tags: Vec<PropTag>,
    },
    ObjectMoved {
        folder_id: u64,
        message_id: Option<u64>,
        parent_id: u64,
        old_folder_id: u64,
        old_message_id: Option<u64>,
        old_parent_id: u64,
    },
    ObjectCopied {
        folder_id: u64,
        message_id: Option<u64>,
        parent_id: u64,
        old_folder_id: u64,
        old_message_id: Option<u64>,
        old_parent_id: u64,
    },
    SearchComplete {
        folder_id: u64,
    },
    TableModified(TableEvent),
}

impl NotificationEvent {
    /// The fnev bit this event matches against subscription masks.
    pub fn mask_bit(&self) -> EventMask {
        match self {
            NotificationEvent::NewMail { .. } => EventMask::NEW_MAIL,
            NotificationEvent::ObjectCreated { .. } => EventMask::OBJECT_CREATED,
            NotificationEvent::ObjectDeleted { .. } => EventMask::OBJECT_DELETED,
            NotificationEvent::ObjectModified { .. } => EventMask::OBJECT_MODIFIED,
            NotificationEvent::ObjectMoved { .. } => EventMask::OBJECT_MOVED,
            NotificationEvent::ObjectCopied { .. } => EventMask::OBJECT_COPIED,
            NotificationEvent::SearchComplete { .. } => EventMask::SEARCH_COMPLETE,
            NotificationEvent::TableModified(_) => EventMask::TABLE_MODIFIED,
        }
    }
}

/// A Notify reply pulled from a transaction. The handle names the
/// server-side notification object the event belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RopNotify {
    pub handle: u32,
    pub logon_id: u8,
    pub event: NotificationEvent,
}

impl RopNotify {
    /// Decode the body that follows the Notify opnum.
    pub(crate) fn decode(buf: &mut Bytes) -> Result<RopNotify, MapiError> {
        need(buf, 7)?;
        let handle = buf.get_u32_le();
        let logon_id = buf.get_u8();
        let flags = buf.get_u16_le();
        let about_message = flags & EventMask::QUAL_MESSAGE.0 as u16 != 0;
        let unicode = flags & EventMask::QUAL_UNICODE.0 as u16 != 0;
        let kind = flags & 0x0FFF;

        if kind == EventMask::TABLE_MODIFIED.0 as u16 {
            let event = decode_table_event(buf, about_message)?;
            return Ok(RopNotify {
                handle,
                logon_id,
                event: NotificationEvent::TableModified(event),
            });
        }

        need(buf, 8)?;
        let folder_id = buf.get_u64_le();
        let message_id = if about_message {
            need(buf, 8)?;
            Some(buf.get_u64_le())
        } else {
            None
        };
        let event = match kind {
            0x0002 => {
                need(buf, 5)?;
                let message_flags = buf.get_u32_le();
                let class_unicode = buf.get_u8() != 0 || unicode;
                let message_class = if class_unicode {
                    get_wstring(buf)?
                } else {
                    get_cstring(buf)?
                };
                NotificationEvent::NewMail {
                    folder_id,
                    message_id,
                    message_flags,
                    message_class,
                }
            }
            0x0004 => NotificationEvent::ObjectCreated {
                folder_id,
                message_id,
                parent_id: get_u64(buf)?,
                tags: decode_tags(buf)?,
            },
            0x0008 => NotificationEvent::ObjectDeleted {
                folder_id,
                message_id,
            },
            0x0010 => NotificationEvent::ObjectModified {
                folder_id,
                message_id,
                tags: decode_tags(buf)?,
            },
            0x0020 | 0x0040 => {
                let parent_id = get_u64(buf)?;
                let old_folder_id = get_u64(buf)?;
                let old_message_id = if about_message {
                    Some(get_u64(buf)?)
                } else {
                    None
                };
                let old_parent_id = get_u64(buf)?;
                if kind == 0x0020 {
                    NotificationEvent::ObjectMoved {
                        folder_id,
                        message_id,
                        parent_id,
                        old_folder_id,
                        old_message_id,
                        old_parent_id,
                    }
                } else {
                    NotificationEvent::ObjectCopied {
                        folder_id,
                        message_id,
                        parent_id,
                        old_folder_id,
                        old_message_id,
                        old_parent_id,
                    }
                }
            }
            0x0080 => NotificationEvent::SearchComplete { folder_id },
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unknown notification type 0x{:04x}",
                    other
                )))
            }
        };
        Ok(RopNotify {
            handle,
            logon_id,
            event,
        })
    }
}

fn get_u64(buf: &mut Bytes) -> Result<u64, MapiError> {
    need(buf, 8)?;
    Ok(buf.get_u64_le())
}

fn decode_tags(buf: &mut Bytes) -> Result<Vec<PropTag>, MapiError> {
    need(buf, 2)?;
    let count = buf.get_u16_le();
    let mut tags = Vec::with_capacity(count as usize);
    for _ in 0..count {
        need(buf, 4)?;
        tags.push(PropTag(buf.get_u32_le()));
    }
    Ok(tags)
}

fn decode_table_event(buf: &mut Bytes, about_message: bool) -> Result<TableEvent, MapiError> {
    need(buf, 2)?;
    let event_type = buf.get_u16_le();
    let row_ids = |buf: &mut Bytes| -> Result<(u64, Option<u64>, Option<u32>), MapiError> {
        let folder_id = get_u64(buf)?;
        if about_message {
            let message_id = get_u64(buf)?;
            need(buf, 4)?;
            Ok((folder_id, Some(message_id), Some(buf.get_u32_le())))
        } else {
            Ok((folder_id, None, None))
        }
    };
    match event_type {
        0x0001 => Ok(TableEvent::Changed),
        0x0007 => Ok(TableEvent::RestrictionChanged),
        0x0004 => {
            let (folder_id, message_id, instance) = row_ids(buf)?;
            Ok(TableEvent::RowDeleted {
                folder_id,
                message_id,
                instance,
            })
        }
        0x0003 | 0x0005 => {
            let (folder_id, message_id, instance) = row_ids(buf)?;
            let (insert_after_folder_id, insert_after_message_id, insert_after_instance) =
                row_ids(buf)?;
            need(buf, 2)?;
            let size = buf.get_u16_le() as usize;
            need(buf, size)?;
            let mut row_data = vec![0u8; size];
            buf.copy_to_slice(&mut row_data);
            if event_type == 0x0003 {
                Ok(TableEvent::RowAdded {
                    folder_id,
                    message_id,
                    instance,
                    insert_after_folder_id,
                    insert_after_message_id,
                    insert_after_instance,
                    row_data,
                })
            } else {
                Ok(TableEvent::RowModified {
                    folder_id,
                    message_id,
                    instance,
                    insert_after_folder_id,
                    insert_after_message_id,
                    insert_after_instance,
                    row_data,
                })
            }
        }
        other => Err(MapiError::CallFailed(format!(
            "unknown table event 0x{:04x}",
            other
        ))),
    }
}

/// Identifies one subscription within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u32);

/// What a subscriber receives on its channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub connection: ConnectionId,
    pub event: NotificationEvent,
}

struct Subscription {
    connection: ConnectionId,
    handle: u32,
    mask: EventMask,
    whole_store: bool,
    sender: Sender<Notification>,
}

/// Per-session subscription table. Events are fanned out to every
/// subscription whose notification handle and mask match; subscriptions
/// whose receiver has gone away are dropped on the next delivery attempt.
#[derive(Default)]
pub struct NotificationRegistry {
    subs: Vec<Subscription>,
    next_connection: u32,
}

impl NotificationRegistry {
    pub(crate) fn add(
        &mut self,
        handle: u32,
        mask: EventMask,
        whole_store: bool,
    ) -> (ConnectionId, Receiver<Notification>) {
        self.next_connection += 1;
        let connection = ConnectionId(self.next_connection);
        let (sender, receiver) = channel();
        self.subs.push(Subscription {
            connection,
            handle,
            mask,
            whole_store,
            sender,
        });
        (connection, receiver)
    }

    pub(crate) fn handle_of(&self, connection: ConnectionId) -> Option<u32> {
        self.subs
            .iter()
            .find(|s| s.connection == connection)
            .map(|s| s.handle)
    }

    /// Drop the subscription; returns the server-side notification handle
    /// so the caller can release it.
    pub(crate) fn remove(&mut self, connection: ConnectionId) -> Option<u32> {
        let idx = self.subs.iter().position(|s| s.connection == connection)?;
        Some(self.subs.swap_remove(idx).handle)
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub(crate) fn handles(&self) -> Vec<u32> {
        self.subs.iter().map(|s| s.handle).collect()
    }

    /// Deliver one decoded Notify reply. Returns how many subscriptions
    /// accepted it.
    pub(crate) fn route(&mut self, notify: &RopNotify) -> usize {
        let bit = notify.event.mask_bit();
        let mut delivered = 0;
        let mut stale = Vec::new();
        for sub in &self.subs {
            if sub.handle != notify.handle && !sub.whole_store {
                continue;
            }
            if !sub.mask.contains(bit) {
                continue;
            }
            let message = Notification {
                connection: sub.connection,
                event: notify.event.clone(),
            };
            if sub.sender.send(message).is_ok() {
                delivered += 1;
            } else {
                stale.push(sub.connection);
            }
        }
        self.subs.retain(|s| !stale.contains(&s.connection));
        delivered
    }
}

/// The UDP wakeup endpoint. The server sends a datagram here when it has
/// notifications pending; the payload is irrelevant, only the wakeup
/// matters. The cookie is registered with the server out of band so it can
/// associate the endpoint with the session.
pub struct NotificationEndpoint {
    socket: UdpSocket,
    cookie: [u8; 16],
}

impl NotificationEndpoint {
    pub const DEFAULT_PORT: u16 = 2500;

    pub fn bind(port: u16) -> Result<NotificationEndpoint, MapiError> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        let mut cookie = [0u8; 16];
        getrandom::getrandom(&mut cookie)
            .map_err(|e| MapiError::NotEnoughResources(format!("cookie generation: {}", e)))?;
        Ok(NotificationEndpoint { socket, cookie })
    }

    pub fn cookie(&self) -> &[u8; 16] {
        &self.cookie
    }

    /// Block for up to `timeout` waiting for a wakeup datagram. Returns
    /// whether one arrived.
    pub(crate) fn wait(&self, timeout: Duration) -> Result<bool, MapiError> {
        self.socket.set_read_timeout(Some(timeout))?;
        let mut scratch = [0u8; 512];
        match self.socket.recv_from(&mut scratch) {
            Ok(_) => Ok(true),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Knobs for the monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// How long one wait cycle blocks before the continuation predicate is
    /// consulted again.
    pub cycle_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            cycle_timeout: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn new_mail_wire(handle: u32, fid: u64, mid: u64) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(handle);
        out.put_u8(0); // logon id
        out.put_u16_le(0x8002); // message-qualified new mail
        out.put_u64_le(fid);
        out.put_u64_le(mid);
        out.put_u32_le(0x1); // message flags
        out.put_u8(0); // 8-bit class
        out.put_slice(b"IPM.Note\0");
        out.freeze()
    }

    #[test]
    fn decodes_new_mail() {
        let mut buf = new_mail_wire(7, 0x10, 0x20);
        let notify = RopNotify::decode(&mut buf).unwrap();
        assert_eq!(buf.len(), 0);
        assert_eq!(notify.handle, 7);
        assert_eq!(
            notify.event,
            NotificationEvent::NewMail {
                folder_id: 0x10,
                message_id: Some(0x20),
                message_flags: 1,
                message_class: "IPM.Note".into(),
            }
        );
    }

    #[test]
    fn decodes_table_row_added() {
        let mut out = BytesMut::new();
        out.put_u32_le(9);
        out.put_u8(0);
        out.put_u16_le(0x9100); // message-qualified table modified
        out.put_u16_le(0x0003); // row added
        out.put_u64_le(0x1);
        out.put_u64_le(0x2);
        out.put_u32_le(0);
        out.put_u64_le(0); // insert after: start of table
        out.put_u64_le(0);
        out.put_u32_le(0);
        out.put_u16_le(2);
        out.put_slice(&[0xAA, 0xBB]);
        let notify = RopNotify::decode(&mut out.freeze()).unwrap();
        match notify.event {
            NotificationEvent::TableModified(TableEvent::RowAdded {
                folder_id,
                message_id,
                row_data,
                ..
            }) => {
                assert_eq!(folder_id, 1);
                assert_eq!(message_id, Some(2));
                assert_eq!(row_data, vec![0xAA, 0xBB]);
            }
            other => panic!("wrong event: {:?}", other),
        }
    }

    #[test]
    fn routing_honours_handle_and_mask() {
        let mut registry = NotificationRegistry::default();
        let (_, new_mail_rx) = registry.add(7, EventMask::NEW_MAIL, false);
        let (_, deleted_rx) = registry.add(7, EventMask::OBJECT_DELETED, false);
        let (_, other_handle_rx) = registry.add(8, EventMask::NEW_MAIL, false);

        let notify = RopNotify::decode(&mut new_mail_wire(7, 1, 2)).unwrap();
        assert_eq!(registry.route(&notify), 1);
        assert!(new_mail_rx.try_recv().is_ok());
        assert!(deleted_rx.try_recv().is_err());
        assert!(other_handle_rx.try_recv().is_err());
    }

    #[test]
    fn whole_store_subscription_sees_every_handle() {
        let mut registry = NotificationRegistry::default();
        let (_, rx) = registry.add(7, EventMask::NEW_MAIL, true);
        let notify = RopNotify::decode(&mut new_mail_wire(99, 1, 2)).unwrap();
        assert_eq!(registry.route(&notify), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn dead_receiver_is_pruned() {
        let mut registry = NotificationRegistry::default();
        let (_, rx) = registry.add(7, EventMask::NEW_MAIL, false);
        drop(rx);
        let notify = RopNotify::decode(&mut new_mail_wire(7, 1, 2)).unwrap();
        assert_eq!(registry.route(&notify), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn unsubscribe_returns_handle() {
        let mut registry = NotificationRegistry::default();
        let (conn, _rx) = registry.add(7, EventMask::NEW_MAIL, false);
        assert_eq!(registry.remove(conn), Some(7));
        assert_eq!(registry.remove(conn), None);
    }
}
