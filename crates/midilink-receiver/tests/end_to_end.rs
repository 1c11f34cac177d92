//! Sender and receiver nodes talking over an in-process substrate.
//!
//! The sender's heartbeat period is long so that only its first, immediate
//! probe happens during a test; sessions therefore end only when the test
//! makes them end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use midilink_core::substrate::memory::MemoryHub;
use midilink_core::{ControlEvent, ControlEventSink, NameScheme, RemoteId};
use midilink_receiver::application::state::ReceiverState;
use midilink_receiver::infrastructure::device::RecordingSink;
use midilink_receiver::infrastructure::network::ReceiverNode;
use midilink_receiver::infrastructure::storage::config::AppConfig;
use midilink_sender::application::session::{LinkState, SenderSession};
use midilink_sender::infrastructure::device::ScriptedSource;
use midilink_sender::infrastructure::network::{SenderNode, SenderTasks};

const WAIT: Duration = Duration::from_secs(3);
const SLOW_HEARTBEAT: Duration = Duration::from_secs(30);

const RECEIVER_TOML: &str = r#"
[identity]
peer = "studio"

[session]
max_channels = 2
pull_lifetime_ms = 5000

[access]
prohibited = ["mallory"]
"#;

fn write_config() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("midilink_e2e_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("receiver.toml");
    std::fs::write(&path, RECEIVER_TOML).unwrap();
    path
}

struct Receiver {
    node: Arc<ReceiverNode>,
    sink: Arc<RecordingSink>,
}

async fn start_receiver(hub: &Arc<MemoryHub>) -> Receiver {
    let config = AppConfig::load(&write_config()).unwrap();
    let sink = Arc::new(RecordingSink::new());
    let node = ReceiverNode::new(
        Arc::new(hub.face()),
        config.namespace.scheme(),
        config.identity(),
        ReceiverState::new(config.session_settings(), config.access.clone()),
        Arc::clone(&sink) as Arc<dyn ControlEventSink>,
        config.pull_lifetime(),
    );
    node.start().await.unwrap();
    Receiver { node, sink }
}

async fn start_sender(hub: &Arc<MemoryHub>, device: &str) -> (Arc<SenderNode>, SenderTasks) {
    let node = SenderNode::new(
        Arc::new(hub.face()),
        NameScheme::default(),
        RemoteId::from(device),
        RemoteId::from("studio"),
        SenderSession::default(),
        SLOW_HEARTBEAT,
    );
    let tasks = node.start().await.unwrap();
    (node, tasks)
}

/// Polls `check` until it holds or `WAIT` elapses.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let result = tokio::time::timeout(WAIT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting until {what}");
}

async fn has_session(receiver: &Receiver, remote: &str) -> bool {
    receiver
        .node
        .state()
        .lock()
        .await
        .blocks()
        .contains(&RemoteId::from(remote))
}

#[tokio::test]
async fn test_events_flow_in_order_and_session_ends_with_the_input() {
    // Arrange
    let hub = MemoryHub::new();
    let receiver = start_receiver(&hub).await;
    let (sender, tasks) = start_sender(&hub, "keys").await;
    let (s, r) = (&sender, &receiver);
    eventually("the sender is connected", || async move {
        s.link_state().await == LinkState::Connected
    })
    .await;
    eventually("the receiver knows the sender", || has_session(r, "keys")).await;

    // Act: a short phrase, then the input closes.
    let phrase = vec![
        ControlEvent::new(0x93, 60, 100),
        ControlEvent::new(0x83, 60, 0),
        ControlEvent::new(0xB3, 7, 90),
    ];
    sender.pump(ScriptedSource::new(phrase)).await;

    // Assert: played in order on channel 0, then the session is gone.
    eventually("the session is torn down", || async move {
        !has_session(r, "keys").await
    })
    .await;
    assert_eq!(
        receiver.sink.events(),
        vec![
            ControlEvent::new(0x90, 60, 100),
            ControlEvent::new(0x80, 60, 0),
            ControlEvent::new(0xB0, 7, 90),
        ]
    );
    assert_eq!(receiver.node.state().lock().await.channels().occupied(), 0);
    tasks.abort();
}

#[tokio::test]
async fn test_second_sender_plays_on_its_own_channel() {
    // Arrange: two senders, connected one after the other.
    let hub = MemoryHub::new();
    let receiver = start_receiver(&hub).await;
    let r = &receiver;
    let (first, first_tasks) = start_sender(&hub, "keys").await;
    eventually("keys has a session", || has_session(r, "keys")).await;
    let (second, second_tasks) = start_sender(&hub, "pads").await;
    let s = &second;
    eventually("pads has a session", || has_session(r, "pads")).await;
    eventually("pads is connected", || async move {
        s.link_state().await == LinkState::Connected
    })
    .await;

    // Act
    assert!(second.submit(ControlEvent::new(0x99, 36, 127)).await);

    // Assert: stamped with channel 1.
    eventually("the drum hit is played", || async move {
        !r.sink.events().is_empty()
    })
    .await;
    assert_eq!(receiver.sink.events(), vec![ControlEvent::new(0x91, 36, 127)]);
    assert_eq!(first.link_state().await, LinkState::Connected);
    first_tasks.abort();
    second_tasks.abort();
}

#[tokio::test]
async fn test_sender_beyond_channel_capacity_is_refused() {
    // Arrange: both configured channels taken.
    let hub = MemoryHub::new();
    let receiver = start_receiver(&hub).await;
    let r = &receiver;
    let (_keys, keys_tasks) = start_sender(&hub, "keys").await;
    let (_pads, pads_tasks) = start_sender(&hub, "pads").await;
    eventually("both channels are taken", || async move {
        r.node.state().lock().await.channels().occupied() == 2
    })
    .await;

    // Act
    let (drums, drums_tasks) = start_sender(&hub, "drums").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Assert
    assert_eq!(drums.link_state().await, LinkState::Disconnected);
    assert!(!has_session(&receiver, "drums").await);
    keys_tasks.abort();
    pads_tasks.abort();
    drums_tasks.abort();
}

#[tokio::test]
async fn test_prohibited_sender_never_connects() {
    // Arrange
    let hub = MemoryHub::new();
    let receiver = start_receiver(&hub).await;

    // Act
    let (sender, tasks) = start_sender(&hub, "mallory").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Assert
    assert_eq!(sender.link_state().await, LinkState::Disconnected);
    assert!(!has_session(&receiver, "mallory").await);
    assert!(!sender.submit(ControlEvent::new(0x90, 60, 100)).await);
    tasks.abort();
}
