//! Builder pattern for constructing a [`ChannelClient`].

use std::time::Duration;

use cb_domain::config::CombinerConfig;
use cb_protocol::{MODULE_ID_PARAM, PANEL_PARAM};
use url::Url;

use crate::client::ChannelClient;
use crate::reconnect::ReconnectBackoff;
use crate::types::ChannelError;

/// Fluent builder for [`ChannelClient`].
///
/// # Example
///
/// ```rust,no_run
/// # use cb_channel::ChannelClientBuilder;
/// let client = ChannelClientBuilder::new("notes")
///     .base_url("https://combiner.example.com")
///     .panel("left")
///     .max_reconnect_attempts(10)
///     .build()
///     .unwrap();
/// assert_eq!(
///     client.endpoint(),
///     "wss://combiner.example.com/ws?moduleId=notes&panel=left"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ChannelClientBuilder {
    pub(crate) base_url: String,
    pub(crate) path: String,
    pub(crate) module_id: String,
    pub(crate) panel: String,
    pub(crate) auto_reconnect: bool,
    pub(crate) backoff: ReconnectBackoff,
    pub(crate) close_timeout: Duration,
}

impl ChannelClientBuilder {
    /// Start a builder for `module_id` with all other settings at their
    /// defaults.
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            base_url: "http://localhost:22003".into(),
            path: "/ws".into(),
            module_id: module_id.into(),
            panel: "unknown".into(),
            auto_reconnect: true,
            backoff: ReconnectBackoff::default(),
            close_timeout: Duration::from_secs(5),
        }
    }

    /// Seed every field from a loaded [`CombinerConfig`].
    pub fn from_config(cfg: &CombinerConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            path: cfg.channel.path.clone(),
            module_id: cfg.module_id.clone(),
            panel: cfg.panel.clone(),
            auto_reconnect: cfg.channel.auto_reconnect,
            backoff: ReconnectBackoff::from_config(&cfg.channel),
            close_timeout: Duration::from_millis(cfg.channel.close_timeout_ms),
        }
    }

    // ── Endpoint ─────────────────────────────────────────────────────

    /// HTTP(S) address of the service; the scheme is mapped to `ws`/`wss`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Mount path of the channel endpoint (default `/ws`).
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Panel label sent as the `panel` query parameter (default `unknown`).
    pub fn panel(mut self, panel: impl Into<String>) -> Self {
        self.panel = panel.into();
        self
    }

    // ── Reconnect behavior ───────────────────────────────────────────

    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn max_reconnect_attempts(mut self, n: u32) -> Self {
        self.backoff.max_attempts = Some(n);
        self
    }

    pub fn reconnect_backoff(mut self, initial: Duration) -> Self {
        self.backoff.initial_delay = initial;
        self
    }

    pub fn max_reconnect_backoff(mut self, max: Duration) -> Self {
        self.backoff.max_delay = max;
        self
    }

    /// Replace the whole back-off policy.
    pub fn backoff(mut self, backoff: ReconnectBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// How long a [`disconnect`](ChannelClient::disconnect) waits for the
    /// peer's close frame before dropping the transport (default 5 s).
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Build the [`ChannelClient`].  Fails when the module id is empty or
    /// the base URL is not an absolute `http(s)` URL.
    pub fn build(self) -> Result<ChannelClient, ChannelError> {
        if self.module_id.trim().is_empty() {
            return Err(ChannelError::Config("module_id is required".into()));
        }
        let endpoint = channel_endpoint(&self.base_url, &self.path, &self.module_id, &self.panel)?;
        Ok(ChannelClient::new(self, endpoint))
    }
}

/// Resolve the channel URL: `http → ws`, `https → wss`, host and port kept,
/// any path on the base address replaced by `path`, identity in the query.
pub(crate) fn channel_endpoint(
    base_url: &str,
    path: &str,
    module_id: &str,
    panel: &str,
) -> Result<String, ChannelError> {
    let base = Url::parse(base_url)
        .map_err(|e| ChannelError::Config(format!("invalid base_url {base_url:?}: {e}")))?;

    let scheme = match base.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(ChannelError::Config(format!(
                "base_url must be http(s), got scheme {other:?}"
            )))
        }
    };
    let host = base
        .host_str()
        .ok_or_else(|| ChannelError::Config(format!("base_url {base_url:?} has no host")))?;
    let authority = match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    let path = if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };

    let mut url = Url::parse(&format!("{scheme}://{authority}{path}"))
        .map_err(|e| ChannelError::Config(format!("invalid channel endpoint: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair(MODULE_ID_PARAM, module_id);
        if !panel.is_empty() {
            query.append_pair(PANEL_PARAM, panel);
        }
    }
    Ok(url.to_string())
}

impl Default for ChannelClientBuilder {
    fn default() -> Self {
        Self::new("")
    }
}
