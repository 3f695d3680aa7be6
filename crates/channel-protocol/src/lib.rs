//! Wire vocabulary shared by the Combiner SDK crates: the query parameters
//! and control messages of the persistent channel, and the channel names
//! used to talk to the native browser host.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persistent channel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Query parameter carrying the module identifier.
pub const MODULE_ID_PARAM: &str = "moduleId";
/// Query parameter carrying the panel label.
pub const PANEL_PARAM: &str = "panel";

/// `type` value of the greeting the service sends after accepting a channel.
pub const CONNECTION_ESTABLISHED: &str = "connection_established";

/// Close code for a caller-initiated, orderly shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the transport dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Greeting sent by the service once a channel is registered.
///
/// Only `type` is guaranteed; everything else the service includes is
/// preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEstablished {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "moduleId", default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The `type` discriminator of a structured message, when present.
pub fn message_type(value: &serde_json::Value) -> Option<&str> {
    value.get("type").and_then(|t| t.as_str())
}

/// Whether a parsed inbound message is the service greeting.
pub fn is_connection_established(value: &serde_json::Value) -> bool {
    message_type(value) == Some(CONNECTION_ESTABLISHED)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Native host bridge
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Namespace prefix of every host channel and callback.
pub const BRIDGE_NAMESPACE: &str = "aiwize_applications";

/// Requests the page sends to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostMethod {
    OpenLink,
    GetPageContent,
    GetPageInfo,
    GetPageScreenshots,
}

impl HostMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HostMethod::OpenLink => "openLink",
            HostMethod::GetPageContent => "getPageContent",
            HostMethod::GetPageInfo => "getPageInfo",
            HostMethod::GetPageScreenshots => "getPageScreenshots",
        }
    }

    /// Fully-qualified channel name, e.g. `aiwize_applications.openLink`.
    pub fn channel(self) -> String {
        format!("{BRIDGE_NAMESPACE}.{}", self.as_str())
    }
}

/// Callbacks the host invokes to answer a [`HostMethod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCallback {
    PageContentReceived,
    PageInfoReceived,
    PageScreenshotsReceived,
}

impl HostCallback {
    pub fn as_str(self) -> &'static str {
        match self {
            HostCallback::PageContentReceived => "onPageContentReceived",
            HostCallback::PageInfoReceived => "onPageInfoReceived",
            HostCallback::PageScreenshotsReceived => "onPageScreenshotsReceived",
        }
    }

    /// Parse a callback name, with or without the namespace prefix.
    pub fn parse(name: &str) -> Option<Self> {
        let bare = name
            .strip_prefix(BRIDGE_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        [
            HostCallback::PageContentReceived,
            HostCallback::PageInfoReceived,
            HostCallback::PageScreenshotsReceived,
        ]
        .into_iter()
        .find(|cb| cb.as_str() == bare)
    }
}
