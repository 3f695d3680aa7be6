use std::sync::Arc;
use std::time::Duration;

use cb_channel::{ChannelClient, ChannelClientBuilder, ChannelEvent, ConnectionState, EventKind};
use cb_domain::config::CombinerConfig;
use tokio::sync::Notify;

/// Slack on top of the client's own close timeout.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

const ALL_KINDS: [EventKind; 7] = [
    EventKind::Open,
    EventKind::Close,
    EventKind::Error,
    EventKind::Message,
    EventKind::Json,
    EventKind::Reconnecting,
    EventKind::ConnectionEstablished,
];

fn describe(event: &ChannelEvent) -> String {
    match event {
        ChannelEvent::Open => "open".into(),
        ChannelEvent::Close(info) => format!(
            "close code={} clean={} reason={:?}",
            info.code, info.was_clean, info.reason
        ),
        ChannelEvent::Error(err) => format!("error {err}"),
        ChannelEvent::Message(payload) => match payload.as_text() {
            Some(text) => format!("message {text}"),
            None => format!("message <{} bytes>", payload.len()),
        },
        ChannelEvent::Json(value) => format!("json {value}"),
        ChannelEvent::Reconnecting { attempt, delay } => {
            format!("reconnecting attempt={attempt} delay={}ms", delay.as_millis())
        }
        ChannelEvent::ConnectionEstablished(greeting) => format!(
            "connection_established module={} panel={}",
            greeting.module_id.as_deref().unwrap_or("-"),
            greeting.panel.as_deref().unwrap_or("-")
        ),
    }
}

/// Connect, queue `messages`, and print events until Ctrl-C.
pub async fn listen(
    config: &CombinerConfig,
    messages: Vec<String>,
    max_reconnect_attempts: Option<u32>,
) -> anyhow::Result<()> {
    let mut builder = ChannelClientBuilder::from_config(config);
    if let Some(n) = max_reconnect_attempts {
        builder = builder.max_reconnect_attempts(n);
    }
    let client = builder.build()?;

    for kind in ALL_KINDS {
        client.on(kind, |event| println!("{}", describe(event)));
    }

    // Queued while disconnected; flushed in order once the channel opens.
    for msg in messages {
        client.send(msg);
    }

    tracing::info!(endpoint = %client.endpoint(), "connecting");
    if let Err(e) = client.connect().await {
        tracing::warn!(error = %e, "initial connect failed");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupted, closing channel");
    let limit = Duration::from_millis(config.channel.close_timeout_ms) + CLOSE_GRACE;
    if !close_and_wait(&client, limit).await {
        tracing::warn!(limit_ms = limit.as_millis() as u64, "channel did not close in time");
    }
    Ok(())
}

/// Disconnect and wait for the `close` event, or until `limit` elapses.
/// Returns whether the channel reached `Disconnected`.
async fn close_and_wait(client: &ChannelClient, limit: Duration) -> bool {
    let closed = Arc::new(Notify::new());
    let notify = closed.clone();
    let id = client.on(EventKind::Close, move |_| notify.notify_one());

    client.disconnect();
    if client.state() != ConnectionState::Disconnected {
        let _ = tokio::time::timeout(limit, closed.notified()).await;
    }
    client.off(EventKind::Close, id);
    client.state() == ConnectionState::Disconnected
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_channel::{CloseInfo, ConnectionEstablished, Payload};

    #[test]
    fn describes_events_on_one_line() {
        assert_eq!(describe(&ChannelEvent::Open), "open");
        assert_eq!(
            describe(&ChannelEvent::Message(Payload::from(vec![1u8, 2, 3]))),
            "message <3 bytes>"
        );
        assert_eq!(
            describe(&ChannelEvent::Reconnecting {
                attempt: 2,
                delay: Duration::from_secs(2)
            }),
            "reconnecting attempt=2 delay=2000ms"
        );
        assert_eq!(
            describe(&ChannelEvent::Close(CloseInfo::abnormal("reset"))),
            "close code=1006 clean=false reason=\"reset\""
        );

        let greeting: ConnectionEstablished = serde_json::from_value(serde_json::json!({
            "type": "connection_established",
            "moduleId": "notes",
        }))
        .unwrap();
        assert_eq!(
            describe(&ChannelEvent::ConnectionEstablished(greeting)),
            "connection_established module=notes panel=-"
        );
    }

    #[tokio::test]
    async fn close_and_wait_returns_at_once_when_never_connected() {
        let client = ChannelClientBuilder::new("notes")
            .base_url("http://127.0.0.1:1")
            .build()
            .unwrap();
        let started = tokio::time::Instant::now();
        assert!(close_and_wait(&client, Duration::from_secs(5)).await);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(client.events().handler_count(EventKind::Close), 0);
    }
}
