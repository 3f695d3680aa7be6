use std::sync::Arc;

use cb_domain::trace::TraceEvent;
use cb_protocol::{HostCallback, HostMethod};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::BridgeError;
use crate::host::HostChannel;

/// Answer to [`BrowserBridge::page_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub success: bool,
    /// Full HTML of the current page.
    pub content: String,
}

/// Answer to [`BrowserBridge::page_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub link: String,
    pub title: String,
}

type Waiter<T> = oneshot::Sender<Result<T, BridgeError>>;

#[derive(Default)]
struct Slots {
    content: Option<Waiter<PageContent>>,
    info: Option<Waiter<PageInfo>>,
    screenshots: Option<Waiter<Vec<String>>>,
}

fn content_slot(s: &mut Slots) -> &mut Option<Waiter<PageContent>> {
    &mut s.content
}
fn info_slot(s: &mut Slots) -> &mut Option<Waiter<PageInfo>> {
    &mut s.info
}
fn screenshots_slot(s: &mut Slots) -> &mut Option<Waiter<Vec<String>>> {
    &mut s.screenshots
}

/// Request/response client over a [`HostChannel`].
///
/// Each primitive has at most one pending waiter.  A newer request for the
/// same primitive takes the slot and the older waiter resolves to
/// [`BridgeError::Superseded`].  Requests never time out; the host is
/// expected to answer every one it receives.
pub struct BrowserBridge {
    host: Option<Arc<dyn HostChannel>>,
    slots: Mutex<Slots>,
}

impl BrowserBridge {
    pub fn new(host: Arc<dyn HostChannel>) -> Self {
        Self {
            host: Some(host),
            slots: Mutex::new(Slots::default()),
        }
    }

    /// A bridge with no host attached.  Requests fail with
    /// [`BridgeError::HostUnavailable`].
    pub fn detached() -> Self {
        Self {
            host: None,
            slots: Mutex::new(Slots::default()),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    // ── requests ─────────────────────────────────────────────────────

    /// Ask the host to open `url`.  No answer is expected.
    pub fn open_link(&self, url: &str) {
        let channel = HostMethod::OpenLink.channel();
        match &self.host {
            Some(host) => {
                TraceEvent::BridgeRequest {
                    channel: channel.clone(),
                    superseded: false,
                }
                .emit();
                host.send(&channel, vec![Value::String(url.to_owned())]);
            }
            None => tracing::debug!(url, "no host attached, open_link dropped"),
        }
    }

    pub async fn page_content(&self) -> Result<PageContent, BridgeError> {
        self.request(HostMethod::GetPageContent, content_slot).await
    }

    pub async fn page_info(&self) -> Result<PageInfo, BridgeError> {
        self.request(HostMethod::GetPageInfo, info_slot).await
    }

    /// Base64-encoded screenshots of the current page.
    pub async fn page_screenshots(&self) -> Result<Vec<String>, BridgeError> {
        self.request(HostMethod::GetPageScreenshots, screenshots_slot)
            .await
    }

    async fn request<T>(
        &self,
        method: HostMethod,
        slot: fn(&mut Slots) -> &mut Option<Waiter<T>>,
    ) -> Result<T, BridgeError> {
        let host = self.host.as_ref().ok_or(BridgeError::HostUnavailable)?;

        let (tx, rx) = oneshot::channel();
        let previous = slot(&mut self.slots.lock()).replace(tx);
        let superseded = match previous {
            Some(prev) => prev.send(Err(BridgeError::Superseded)).is_ok(),
            None => false,
        };

        let channel = method.channel();
        TraceEvent::BridgeRequest {
            channel: channel.clone(),
            superseded,
        }
        .emit();
        host.send(&channel, Vec::new());

        // The sender only goes away without an answer if the bridge is
        // dropped mid-request.
        rx.await.unwrap_or(Err(BridgeError::HostUnavailable))
    }

    // ── host callbacks ───────────────────────────────────────────────

    /// Returns whether a pending request received the value.
    pub fn on_page_content_received(&self, success: bool, content: String) -> bool {
        tracing::debug!(success, len = content.len(), "page content received");
        self.deliver(
            HostCallback::PageContentReceived,
            content_slot,
            PageContent { success, content },
        )
    }

    pub fn on_page_info_received(&self, link: String, title: String) -> bool {
        tracing::debug!(%link, %title, "page info received");
        self.deliver(
            HostCallback::PageInfoReceived,
            info_slot,
            PageInfo { link, title },
        )
    }

    pub fn on_page_screenshots_received(&self, items: Vec<String>) -> bool {
        tracing::debug!(count = items.len(), "page screenshots received");
        self.deliver(HostCallback::PageScreenshotsReceived, screenshots_slot, items)
    }

    /// Route a callback given by name (with or without the
    /// `aiwize_applications.` prefix) and positional JSON arguments.
    pub fn dispatch_callback(&self, name: &str, args: &[Value]) -> Result<bool, BridgeError> {
        let callback = HostCallback::parse(name)
            .ok_or_else(|| BridgeError::InvalidCallback(format!("unknown callback {name:?}")))?;
        let bad_args = || BridgeError::InvalidCallback(format!("bad arguments for {name}"));

        match callback {
            HostCallback::PageContentReceived => {
                let success = args.first().and_then(Value::as_bool).ok_or_else(bad_args)?;
                let content = args.get(1).and_then(Value::as_str).ok_or_else(bad_args)?;
                Ok(self.on_page_content_received(success, content.to_owned()))
            }
            HostCallback::PageInfoReceived => {
                let link = args.first().and_then(Value::as_str).ok_or_else(bad_args)?;
                let title = args.get(1).and_then(Value::as_str).ok_or_else(bad_args)?;
                Ok(self.on_page_info_received(link.to_owned(), title.to_owned()))
            }
            HostCallback::PageScreenshotsReceived => {
                let items = args
                    .first()
                    .and_then(Value::as_array)
                    .ok_or_else(bad_args)?
                    .iter()
                    .map(|v| v.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(bad_args)?;
                Ok(self.on_page_screenshots_received(items))
            }
        }
    }

    fn deliver<T>(
        &self,
        callback: HostCallback,
        slot: fn(&mut Slots) -> &mut Option<Waiter<T>>,
        value: T,
    ) -> bool {
        let waiter = slot(&mut self.slots.lock()).take();
        match waiter.map(|tx| tx.send(Ok(value)).is_ok()) {
            Some(true) => true,
            _ => {
                tracing::warn!(callback = callback.as_str(), "no pending request, callback dropped");
                false
            }
        }
    }
}

impl std::fmt::Debug for BrowserBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("BrowserBridge")
            .field("attached", &self.host.is_some())
            .field("content_pending", &slots.content.is_some())
            .field("info_pending", &slots.info.is_some())
            .field("screenshots_pending", &slots.screenshots.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingHost {
        sent: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl HostChannel for RecordingHost {
        fn send(&self, channel: &str, args: Vec<Value>) {
            self.sent.lock().push((channel.to_owned(), args));
        }
    }

    impl RecordingHost {
        fn channels(&self) -> Vec<String> {
            self.sent.lock().iter().map(|(c, _)| c.clone()).collect()
        }
    }

    fn bridge() -> (Arc<RecordingHost>, BrowserBridge) {
        let host = Arc::new(RecordingHost::default());
        let bridge = BrowserBridge::new(host.clone());
        (host, bridge)
    }

    #[test]
    fn open_link_sends_url() {
        let (host, bridge) = bridge();
        bridge.open_link("https://example.com");
        let sent = host.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "aiwize_applications.openLink");
        assert_eq!(sent[0].1, vec![json!("https://example.com")]);
    }

    #[tokio::test]
    async fn page_info_resolves_from_callback() {
        let (host, bridge) = bridge();
        let (info, delivered) = tokio::join!(bridge.page_info(), async {
            tokio::task::yield_now().await;
            bridge.on_page_info_received("https://a.test".into(), "A".into())
        });
        assert!(delivered);
        assert_eq!(
            info.unwrap(),
            PageInfo {
                link: "https://a.test".into(),
                title: "A".into()
            }
        );
        assert_eq!(host.channels(), vec!["aiwize_applications.getPageInfo"]);
    }

    #[tokio::test]
    async fn newer_request_supersedes_older_waiter() {
        let (host, bridge) = bridge();
        let (first, second, _) = tokio::join!(bridge.page_content(), bridge.page_content(), async {
            tokio::task::yield_now().await;
            bridge.on_page_content_received(true, "<html/>".into())
        });
        assert_eq!(first.unwrap_err(), BridgeError::Superseded);
        assert_eq!(
            second.unwrap(),
            PageContent {
                success: true,
                content: "<html/>".into()
            }
        );
        assert_eq!(host.channels().len(), 2);
    }

    #[test]
    fn callback_without_waiter_is_dropped() {
        let (_host, bridge) = bridge();
        assert!(!bridge.on_page_screenshots_received(vec!["abc".into()]));
    }

    #[tokio::test]
    async fn detached_bridge_has_no_host() {
        let bridge = BrowserBridge::detached();
        assert!(!bridge.is_attached());
        bridge.open_link("https://example.com");
        assert_eq!(
            bridge.page_screenshots().await.unwrap_err(),
            BridgeError::HostUnavailable
        );
    }

    #[tokio::test]
    async fn dispatch_by_name() {
        let (_host, bridge) = bridge();
        let (shots, delivered) = tokio::join!(bridge.page_screenshots(), async {
            tokio::task::yield_now().await;
            bridge.dispatch_callback(
                "aiwize_applications.onPageScreenshotsReceived",
                &[json!(["aGVsbG8=", "d29ybGQ="])],
            )
        });
        assert!(delivered.unwrap());
        assert_eq!(shots.unwrap(), vec!["aGVsbG8=", "d29ybGQ="]);
    }

    #[test]
    fn dispatch_rejects_unknown_names_and_bad_args() {
        let (_host, bridge) = bridge();
        assert!(matches!(
            bridge.dispatch_callback("onSomethingElse", &[]),
            Err(BridgeError::InvalidCallback(_))
        ));
        assert!(matches!(
            bridge.dispatch_callback("onPageInfoReceived", &[json!("https://a.test")]),
            Err(BridgeError::InvalidCallback(_))
        ));
        assert!(matches!(
            bridge.dispatch_callback("onPageScreenshotsReceived", &[json!([1, 2])]),
            Err(BridgeError::InvalidCallback(_))
        ));
    }

    #[test]
    fn closures_work_as_hosts() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let bridge = BrowserBridge::new(Arc::new(move |channel: &str, _args: Vec<Value>| {
            sink.lock().push(channel.to_owned());
        }));
        bridge.open_link("https://example.com");
        assert_eq!(*seen.lock(), vec!["aiwize_applications.openLink"]);
    }
}
