//! Core value types: payloads, connection states, close details, errors.

use std::borrow::Cow;
use std::fmt;

use cb_protocol::ABNORMAL_CLOSURE;
use serde::Serialize;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// A single message travelling over the channel.
///
/// Text and binary payloads go out untouched; structured values are
/// serialized to JSON text before they are queued or sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Serialize `value` to JSON text, falling back to its `Debug`
    /// rendering when serialization fails.
    pub fn json<T: Serialize + fmt::Debug + ?Sized>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(text) => Payload::Text(text),
            Err(e) => {
                tracing::warn!(error = %e, "payload is not JSON-serializable, sending Debug text");
                Payload::Text(format!("{value:?}"))
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(t) => Some(t),
            Payload::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(t) => t.len(),
            Payload::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best-effort JSON parse of the payload.
    pub fn parse_json(&self) -> Option<serde_json::Value> {
        match self {
            Payload::Text(t) => serde_json::from_str(t).ok(),
            Payload::Binary(b) => serde_json::from_slice(b).ok(),
        }
    }

    pub(crate) fn into_message(self) -> Message {
        match self {
            Payload::Text(t) => Message::Text(t),
            Payload::Binary(b) => Message::Binary(b),
        }
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Binary(b)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Binary(b.to_vec())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Text(v.to_string())
    }
}

/// Lifecycle of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Raw state of the live transport, numbered like the browser
/// `WebSocket.readyState` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
}

impl ReadyState {
    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Details of a transport close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    /// `true` when a close frame was received.
    pub was_clean: bool,
}

impl CloseInfo {
    /// The transport dropped (or never came up) without a close handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: reason.into(),
            was_clean: false,
        }
    }

    pub(crate) fn from_frame(frame: Option<CloseFrame<'_>>) -> Self {
        match frame {
            Some(f) => Self {
                code: u16::from(f.code),
                reason: f.reason.into_owned(),
                was_clean: true,
            },
            // 1005: close frame without a status code.
            None => Self {
                code: u16::from(CloseCode::Status),
                reason: String::new(),
                was_clean: true,
            },
        }
    }
}

pub(crate) fn close_frame(code: u16, reason: String) -> CloseFrame<'static> {
    CloseFrame {
        code: CloseCode::from(code),
        reason: Cow::Owned(reason),
    }
}

/// Top-level SDK error.
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("config: {0}")]
    Config(String),
    #[error("websocket: {0}")]
    WebSocket(String),
    #[error("connect abandoned: disconnect() was called while connecting")]
    Cancelled,
}
