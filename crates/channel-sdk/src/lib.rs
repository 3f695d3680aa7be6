//! `cb-channel`: persistent channel client for the Combiner Service.
//!
//! A module talks to the service over one long-lived WebSocket.  This
//! crate keeps that socket alive so callers don't have to: it resolves the
//! endpoint, queues outbound messages while disconnected, reconnects with
//! capped exponential back-off, and reports every lifecycle step through a
//! typed event table.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Your module                                                │
//! │                                                             │
//! │   let client = ChannelClientBuilder::new("notes")           │
//! │       .base_url("http://localhost:22003")                   │
//! │       .build()?;                                            │
//! │   client.on(EventKind::Json, |ev| { ... });                 │
//! │   client.send_json(&json!({"op": "subscribe"})); // queued  │
//! │   client.connect().await?;                       // flushed │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Connection flow
//!
//! 1. `connect()` opens `ws(s)://host/ws?moduleId=<id>&panel=<panel>`
//! 2. On open: reset the attempt counter, flush queued messages in order,
//!    emit `open`
//! 3. Every inbound frame emits `message`; frames that parse as JSON also
//!    emit `json`, and the service greeting emits `connection_established`
//! 4. On an involuntary close: emit `close`, then `reconnecting` and retry
//!    after `min(initial * 2^(n-1), max)`
//! 5. `disconnect()` closes with code 1000 and stops reconnecting; if the
//!    peer never answers, the transport is dropped after the close timeout

pub mod builder;
pub mod client;
pub mod events;
pub mod reconnect;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::ChannelClientBuilder;
pub use cb_protocol::ConnectionEstablished;
pub use client::ChannelClient;
pub use events::{ChannelEvent, EventBus, EventHandler, EventKind, HandlerId};
pub use reconnect::ReconnectBackoff;
pub use types::{ChannelError, CloseInfo, ConnectionState, Payload, ReadyState};
