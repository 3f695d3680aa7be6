//! Event dispatch table. Maps [`EventKind`]s to subscriber lists and
//! isolates panicking subscribers from each other.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cb_protocol::ConnectionEstablished;
use parking_lot::RwLock;

use crate::types::{CloseInfo, Payload};

/// Named notification channels exposed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Error,
    Message,
    Json,
    Reconnecting,
    ConnectionEstablished,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Error => "error",
            EventKind::Message => "message",
            EventKind::Json => "json",
            EventKind::Reconnecting => "reconnecting",
            EventKind::ConnectionEstablished => "connection_established",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Open,
    Close(CloseInfo),
    Error(String),
    /// Raw inbound payload, before any parsing.
    Message(Payload),
    /// Inbound payload that parsed as JSON.
    Json(serde_json::Value),
    Reconnecting { attempt: u32, delay: Duration },
    /// The service greeting (`{"type":"connection_established",...}`).
    ConnectionEstablished(ConnectionEstablished),
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChannelEvent::Open => EventKind::Open,
            ChannelEvent::Close(_) => EventKind::Close,
            ChannelEvent::Error(_) => EventKind::Error,
            ChannelEvent::Message(_) => EventKind::Message,
            ChannelEvent::Json(_) => EventKind::Json,
            ChannelEvent::Reconnecting { .. } => EventKind::Reconnecting,
            ChannelEvent::ConnectionEstablished(_) => EventKind::ConnectionEstablished,
        }
    }
}

/// Subscriber callback.
pub type EventHandler = Arc<dyn Fn(&ChannelEvent) + Send + Sync + 'static>;

/// Token returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Registry of event subscribers.
///
/// Handlers run synchronously on the task that emits the event, in
/// registration order.  The subscriber list is snapshotted before
/// dispatch, so a handler may subscribe or unsubscribe (or call back into
/// the client) without deadlocking.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<EventKind, Vec<(HandlerId, EventHandler)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.on_boxed(kind, Arc::new(handler))
    }

    /// Subscribe a pre-wrapped handler.
    pub fn on_boxed(&self, kind: EventKind, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a subscription.  Returns `false` if it was not registered.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(hid, _)| *hid != id);
        before != list.len()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its kind.
    ///
    /// A panicking handler is logged and skipped; the remaining handlers
    /// still run.  Returns the number of handlers that completed normally.
    pub fn emit(&self, event: &ChannelEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<EventHandler> = match self.handlers.read().get(&kind) {
            Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    tracing::error!(
                        event = %kind,
                        panic = %panic_message(panic.as_ref()),
                        "event handler panicked"
                    );
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<&'static str, usize> =
            handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}
