use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persistent channel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Path where the WebSocket endpoint is mounted.
    #[serde(default = "d_ws_path")]
    pub path: String,
    #[serde(default = "d_true")]
    pub auto_reconnect: bool,
    /// `None` means retry forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reconnect_attempts: Option<u32>,
    #[serde(default = "d_1000")]
    pub reconnect_backoff_ms: u64,
    #[serde(default = "d_30000")]
    pub max_reconnect_backoff_ms: u64,
    /// How long `disconnect()` waits for the peer to answer the close frame
    /// before dropping the transport.
    #[serde(default = "d_5000")]
    pub close_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            path: d_ws_path(),
            auto_reconnect: true,
            max_reconnect_attempts: None,
            reconnect_backoff_ms: 1000,
            max_reconnect_backoff_ms: 30_000,
            close_timeout_ms: 5000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_ws_path() -> String {
    "/ws".into()
}
fn d_true() -> bool {
    true
}
fn d_1000() -> u64 {
    1000
}
fn d_30000() -> u64 {
    30_000
}
fn d_5000() -> u64 {
    5000
}
