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

//! Subscription operations and the monitor loop.

use bytes::{BufMut, BytesMut};
use std::sync::mpsc::Receiver;

use crate::codec::{ReplyBody, RopCode, RopExpectation, RopRequest};
use crate::error::MapiError;
use crate::notify::{
    ConnectionId, EventMask, MonitorSettings, Notification, NotificationEndpoint,
};
use crate::object::MapiObject;
use crate::session::Session;

impl Session {
    /// Register for events on a bound object (or the whole store). The
    /// returned channel receives every matching event routed through this
    /// session; drop the receiver or call unsubscribe to stop.
    pub fn subscribe(
        &mut self,
        obj: &MapiObject,
        mask: EventMask,
        whole_store: bool,
    ) -> Result<(ConnectionId, Receiver<Notification>), MapiError> {
        self.check_object(obj)?;

        let mut req = RopRequest::new();
        let input = req.add_handle(obj.handle())?;
        let out = req.add_output_handle()?;
        let mut payload = BytesMut::new();
        payload.put_u8(out);
        payload.put_u16_le((mask.0 & 0xFFFF) as u16);
        payload.put_u8(0); // reserved
        payload.put_u8(u8::from(whole_store));
        payload.put_u64_le(if whole_store { 0 } else { obj.id() });
        payload.put_u64_le(0); // message scope unused
        req.add_rop(
            RopCode::RegisterNotification,
            obj.logon_id(),
            input,
            payload.to_vec(),
        );

        let resp = self.transact(&req, &[RopExpectation::RegisterNotification])?;
        let reply = resp.single()?;
        match reply.ok()? {
            ReplyBody::RegisterNotification => {}
            other => {
                return Err(MapiError::CallFailed(format!(
                    "unexpected subscribe reply body {:?}",
                    other
                )))
            }
        }
        let handle = resp.handle(out)?;
        self.registry.register(handle);
        Ok(self.notifications.add(handle, mask, whole_store))
    }

    /// Release the server-side notification object and drop the
    /// subscription. The channel sender goes away with it, so the
    /// receiver sees a disconnect.
    pub fn unsubscribe(&mut self, connection: ConnectionId) -> Result<(), MapiError> {
        self.ensure_active()?;
        let handle = self
            .notifications
            .handle_of(connection)
            .ok_or(MapiError::NotFound)?;

        let mut req = RopRequest::new();
        let input = req.add_handle(handle)?;
        req.add_rop(RopCode::Release, 0, input, Vec::new());
        self.transact(&req, &[RopExpectation::Release])?;

        self.registry.unregister(handle);
        self.notifications.remove(connection);
        Ok(())
    }

    /// One empty transaction to pull whatever Notify replies the server
    /// has queued. Returns how many were pulled; routing to subscription
    /// channels happens on the way.
    pub fn dispatch_pending(&mut self) -> Result<usize, MapiError> {
        let req = RopRequest::new();
        let resp = self.transact(&req, &[])?;
        Ok(resp.notifications.len())
    }

    /// Block on the wakeup endpoint, dispatching whenever the server
    /// signals. The predicate is consulted once per cycle; returning
    /// false ends the loop. Every wait is bounded by the cycle timeout,
    /// so cancellation takes effect within one cycle.
    pub fn monitor<F>(
        &mut self,
        endpoint: &NotificationEndpoint,
        settings: &MonitorSettings,
        mut keep_going: F,
    ) -> Result<(), MapiError>
    where
        F: FnMut() -> bool,
    {
        while keep_going() {
            if endpoint.wait(settings.cycle_timeout)? {
                self.dispatch_pending()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Profile, SessionId};
    use crate::transport::RpcTransport;
    use bytes::Bytes;

    struct FailingTransport;
    impl RpcTransport for FailingTransport {
        fn transaction(&mut self, _request: Bytes) -> Result<Bytes, MapiError> {
            Err(MapiError::CallFailed("link down".into()))
        }
    }

    #[test]
    fn unsubscribe_unknown_connection_is_not_found() {
        let mut session = Session::new(
            SessionId(1),
            Profile::new("work", "jdoe"),
            Box::new(FailingTransport),
        );
        assert!(matches!(
            session.unsubscribe(ConnectionId(99)),
            Err(MapiError::NotFound)
        ));
    }

    #[test]
    fn monitor_stops_when_predicate_says_so() {
        let mut session = Session::new(
            SessionId(1),
            Profile::new("work", "jdoe"),
            Box::new(FailingTransport),
        );
        let endpoint = NotificationEndpoint::bind(0).unwrap();
        let mut cycles = 0;
        session
            .monitor(&endpoint, &MonitorSettings::default(), || {
                cycles += 1;
                cycles <= 1
            })
            .unwrap();
        assert_eq!(cycles, 2);
    }
}
