use std::sync::{Arc, Weak};

use crate::message::UMessage;

/// Callback invoked by a transport for each matching inbound message.
pub type ListenCallback = Arc<dyn Fn(UMessage) + Send + Sync + 'static>;

struct Connection {
    callback: ListenCallback,
}

/// Owning half of a listener registration.
///
/// Dropping (or [`reset`](ListenHandle::reset)ting) the handle severs the
/// connection: any [`CallableConn`] still held by a transport turns into a
/// no-op. This makes deregistration safe even while the transport is
/// concurrently delivering messages.
pub struct ListenHandle {
    conn: Option<Arc<Connection>>,
}

/// Transport-side half of a listener registration.
///
/// Holds only a weak reference; delivery stops as soon as the paired
/// [`ListenHandle`] goes away.
#[derive(Clone)]
pub struct CallableConn {
    conn: Weak<Connection>,
}

/// Pairs a callback with a severable handle.
pub fn establish(callback: ListenCallback) -> (ListenHandle, CallableConn) {
    let conn = Arc::new(Connection { callback });
    let callable = CallableConn {
        conn: Arc::downgrade(&conn),
    };
    (ListenHandle { conn: Some(conn) }, callable)
}

impl ListenHandle {
    /// Severs the connection without waiting for drop.
    pub fn reset(&mut self) {
        self.conn = None;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}

impl CallableConn {
    /// Invokes the callback if the handle is still alive.
    ///
    /// Returns whether the message was delivered.
    pub fn call(&self, message: UMessage) -> bool {
        if let Some(conn) = self.conn.upgrade() {
            (conn.callback)(message);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.strong_count() > 0
    }
}

impl std::fmt::Debug for ListenHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl std::fmt::Debug for CallableConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallableConn")
            .field("connected", &self.is_connected())
            .finish()
    }
}
