use serde::Serialize;

/// Structured trace events emitted across the Combiner SDK crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ChannelOpened {
        endpoint: String,
        flushed: usize,
    },
    ChannelClosed {
        endpoint: String,
        code: u16,
        manual: bool,
    },
    ChannelReconnectScheduled {
        endpoint: String,
        attempt: u32,
        delay_ms: u64,
    },
    RestCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    MockSearch {
        query: Option<String>,
        results: usize,
    },
    BridgeRequest {
        channel: String,
        superseded: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cb_event");
    }
}
