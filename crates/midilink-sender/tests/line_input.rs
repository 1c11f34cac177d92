//! Hex lines in, one batch out: the path the binary takes with stdin.

use std::sync::Arc;
use std::time::Duration;

use midilink_core::substrate::memory::MemoryHub;
use midilink_core::{
    decode_batch, ControlEvent, HandshakeReply, NameScheme, RemoteId, RequestOutcome, Substrate,
};
use midilink_sender::application::session::{LinkState, SenderSession};
use midilink_sender::infrastructure::device::HexLineSource;
use midilink_sender::infrastructure::network::SenderNode;

const WAIT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn test_lines_are_batched_and_followed_by_end_of_session_marker() {
    // Arrange: a stand-in receiver that accepts every heartbeat.
    let hub = MemoryHub::new();
    let scheme = NameScheme::default();
    let receiver = hub.face();
    let mut heartbeats = receiver
        .register_prefix(scheme.peer_prefix(&RemoteId::from("playback")))
        .await
        .unwrap();
    let answering = receiver.clone();
    tokio::spawn(async move {
        while let Some(req) = heartbeats.recv().await {
            let _ = answering
                .respond(&req.name, HandshakeReply::Accepted.to_bytes())
                .await;
        }
    });

    let node = SenderNode::new(
        Arc::new(hub.face()),
        scheme.clone(),
        RemoteId::from("controller"),
        RemoteId::from("playback"),
        SenderSession::default(),
        Duration::from_secs(30),
    );
    let tasks = node.start().await.unwrap();
    tokio::time::timeout(WAIT, async {
        while node.link_state().await != LinkState::Connected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // Act: feed three lines (one of them garbage), then close the input.
    let input: &[u8] = b"90 3c 64\nbogus\n80 3c 00\n";
    node.pump(HexLineSource::new(input)).await;
    let outcome = receiver
        .express_request(scheme.pull_name(node.device(), 0), WAIT)
        .await;

    // Assert
    let RequestOutcome::Response(content) = outcome else {
        panic!("expected a batch for seq 0");
    };
    assert_eq!(
        decode_batch(&content).unwrap(),
        vec![
            ControlEvent::new(0x90, 0x3C, 0x64),
            ControlEvent::new(0x80, 0x3C, 0x00),
            ControlEvent::SHUTDOWN,
        ]
    );
    tasks.abort();
}
