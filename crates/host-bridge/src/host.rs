use serde_json::Value;

/// One-way entrypoint into the native host.
///
/// The host answers requests asynchronously by invoking the matching
/// callback on [`BrowserBridge`](crate::BrowserBridge).  `send` must not
/// block; it may invoke a callback before returning.
pub trait HostChannel: Send + Sync {
    fn send(&self, channel: &str, args: Vec<Value>);
}

impl<F> HostChannel for F
where
    F: Fn(&str, Vec<Value>) + Send + Sync,
{
    fn send(&self, channel: &str, args: Vec<Value>) {
        self(channel, args)
    }
}
