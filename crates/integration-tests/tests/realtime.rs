//! Realtime channel against the mock WebSocket endpoint.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use talent_ops_client::realtime::{Envelope, MessageKind, Topic};
use talent_ops_client::{ChannelStatus, ReconnectConfig};
use talent_ops_core::NoticeLevel;
use talent_ops_integration_tests::{Harness, MockBackend, PASSWORD, TOKEN, USERNAME, unused_addr};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for_status(h: &Harness, check: impl FnMut(&ChannelStatus) -> bool) {
    let mut status = h.ctx.realtime().subscribe_status();
    tokio::time::timeout(WAIT, status.wait_for(check))
        .await
        .unwrap()
        .unwrap();
}

async fn connected(backend: &MockBackend) -> Harness {
    let h = Harness::new(&backend.api_url()).unwrap();
    h.ctx
        .auth()
        .login(USERNAME, SecretString::from(PASSWORD.to_owned()))
        .await
        .unwrap();
    h.ctx.connect_realtime().unwrap();
    wait_for_status(&h, ChannelStatus::is_open).await;
    assert!(backend.wait_until(|b| b.connections() == 1).await);
    h
}

fn subscribe(h: &Harness, topic: Topic) -> mpsc::UnboundedReceiver<Envelope> {
    let (tx, rx) = mpsc::unbounded_channel();
    h.ctx.realtime().on(topic, move |envelope| {
        let _ = tx.send(envelope.clone());
    });
    rx
}

#[tokio::test]
async fn test_handshake_carries_token() {
    let backend = MockBackend::start().await.unwrap();
    let _h = connected(&backend).await;

    assert_eq!(backend.ws_tokens(), vec![Some(TOKEN.to_owned())]);
}

#[tokio::test]
async fn test_message_reaches_kind_and_wildcard_handlers() {
    let backend = MockBackend::start().await.unwrap();
    let h = connected(&backend).await;
    let mut reminders = subscribe(&h, Topic::Kind(MessageKind::InterviewReminder));
    let mut everything = subscribe(&h, Topic::Wildcard);

    backend.push(
        json!({"type": "interview_reminder", "user_id": 7, "data": {"message": "Interview at 3pm"}})
            .to_string(),
    );

    let envelope = tokio::time::timeout(WAIT, reminders.recv()).await.unwrap().unwrap();
    assert_eq!(envelope.kind, MessageKind::InterviewReminder);
    assert_eq!(envelope.data["message"], "Interview at 3pm");
    let seen = tokio::time::timeout(WAIT, everything.recv()).await.unwrap().unwrap();
    assert_eq!(seen, envelope);

    let notices = h.notifier.notices();
    let notice = notices.last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.message, "Interview at 3pm");
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    let backend = MockBackend::start().await.unwrap();
    let h = connected(&backend).await;
    let mut rx = subscribe(&h, Topic::Wildcard);

    backend.push("{not json");
    backend.push(json!({"type": "system_notice", "data": {"message": "Maintenance"}}).to_string());

    let envelope = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(envelope.kind, MessageKind::SystemNotice);
    assert!(h.ctx.realtime().status().is_open());
    assert_eq!(backend.connections(), 1);
}

#[tokio::test]
async fn test_unknown_kind_is_dispatched_without_notice() {
    let backend = MockBackend::start().await.unwrap();
    let h = connected(&backend).await;
    let mut rx = subscribe(&h, Topic::Wildcard);
    let before = h.notifier.notices().len();

    backend.push(json!({"type": "custom_event", "data": {}}).to_string());

    let envelope = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(envelope.kind, MessageKind::Unknown("custom_event".to_owned()));
    assert_eq!(h.notifier.notices().len(), before);
}

#[tokio::test]
async fn test_send_while_open() {
    let backend = MockBackend::start().await.unwrap();
    let h = connected(&backend).await;

    assert!(h
        .ctx
        .realtime()
        .send(MessageKind::NewMessage, json!({"title": "hi"})));

    assert!(backend.wait_until(|b| !b.received().is_empty()).await);
    let sent: serde_json::Value = serde_json::from_str(backend.received().first().unwrap()).unwrap();
    assert_eq!(sent["type"], "new_message");
    assert_eq!(sent["data"]["title"], "hi");
}

#[tokio::test]
async fn test_send_before_connect_is_dropped() {
    let backend = MockBackend::start().await.unwrap();
    let h = Harness::new(&backend.api_url()).unwrap();

    assert!(!h.ctx.realtime().send(MessageKind::NewMessage, json!({})));
    assert_eq!(h.ctx.realtime().status(), ChannelStatus::Idle);
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let backend = MockBackend::start().await.unwrap();
    let h = connected(&backend).await;

    backend.close_connections();

    assert!(backend.wait_until(|b| b.connections() == 2).await);
    wait_for_status(&h, ChannelStatus::is_open).await;
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let addr = unused_addr().unwrap();
    let h = Harness::with_reconnect(
        &format!("http://{addr}"),
        ReconnectConfig {
            delay: Duration::from_millis(20),
            max_attempts: 2,
        },
    )
    .unwrap();

    h.ctx.connect_realtime().unwrap();

    wait_for_status(&h, |status| *status == ChannelStatus::GaveUp).await;
    assert!(!h.ctx.realtime().send(MessageKind::NewMessage, json!({})));
}

#[tokio::test]
async fn test_gives_up_after_close_when_reconnects_keep_failing() {
    let backend = MockBackend::start().await.unwrap();
    let h = Harness::with_reconnect(
        &backend.api_url(),
        ReconnectConfig {
            delay: Duration::from_millis(20),
            max_attempts: 2,
        },
    )
    .unwrap();
    h.ctx.connect_realtime().unwrap();
    wait_for_status(&h, ChannelStatus::is_open).await;

    backend.refuse_websockets();
    backend.close_connections();

    wait_for_status(&h, |status| *status == ChannelStatus::GaveUp).await;
    // One accepted handshake, then one refused handshake per attempt.
    assert_eq!(backend.handshakes(), 3);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(backend.handshakes(), 3);
    assert_eq!(backend.connections(), 1);
    assert_eq!(h.ctx.realtime().status(), ChannelStatus::GaveUp);
}

#[tokio::test]
async fn test_disconnect_stops_reconnecting() {
    let backend = MockBackend::start().await.unwrap();
    let h = connected(&backend).await;

    h.ctx.realtime().disconnect();
    assert_eq!(h.ctx.realtime().status(), ChannelStatus::Closed);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(backend.connections(), 1);
    assert_eq!(h.ctx.realtime().status(), ChannelStatus::Closed);
}
