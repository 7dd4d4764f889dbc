use super::*;

use frames::PointerSample;

use crate::transport::{Capabilities, LoopbackMesh, TransportEvent};

#[tokio::test]
async fn broadcast_sends_pipe_frame_on_pointer_topic() {
    let mesh = LoopbackMesh::new(Capabilities::broadcast());
    let (a, _a_rx) = mesh.join("a").await;
    let (_b, mut b_rx) = mesh.join("b").await;
    b_rx.recv().await.expect("join notice");

    let message = WireMessage::Move(PointerSample::new(50.0, 25.0));
    broadcast(&a, WireFormat::Pipe, &message).await.expect("send");

    let event = b_rx.recv().await.expect("message");
    assert_eq!(
        event,
        TransportEvent::Message { peer: "a".into(), topic: "pointer".into(), payload: b"p|50|25||".to_vec() }
    );
}

#[tokio::test]
async fn broadcast_routes_keyed_click_to_click_topic() {
    let mesh = LoopbackMesh::new(Capabilities::per_peer(false));
    let (a, _a_rx) = mesh.join("a").await;
    let (_b, mut b_rx) = mesh.join("b").await;
    while b_rx.try_recv().is_ok() {}

    let message = WireMessage::Click(PointerSample::new(10.0, 20.0).with_timestamp(5));
    broadcast(&a, WireFormat::Keyed, &message).await.expect("send");

    let Some(TransportEvent::Message { topic, payload, .. }) = b_rx.recv().await else {
        panic!("expected a message");
    };
    assert_eq!(topic, "click");
    assert_eq!(decode_inbound(WireFormat::Keyed, "a", &topic, &payload), Some(message));
}

#[tokio::test]
async fn broadcast_surfaces_transport_errors() {
    let mesh = LoopbackMesh::new(Capabilities::broadcast());
    let (a, _rx) = mesh.join("a").await;
    a.close_topic("pointer").await.expect("close");
    let result = broadcast(&a, WireFormat::Pipe, &WireMessage::Hide).await;
    assert!(matches!(result, Err(TransportError::Closed)));
}

#[test]
fn decode_inbound_drops_garbage() {
    assert_eq!(decode_inbound(WireFormat::Pipe, "a", "pointer", b"x|1|2"), None);
    assert_eq!(decode_inbound(WireFormat::Keyed, "a", "pointer", b"{"), None);
    assert_eq!(decode_inbound(WireFormat::Pipe, "a", "pointer", b""), None);
}

#[test]
fn decode_inbound_accepts_hide() {
    assert_eq!(decode_inbound(WireFormat::Pipe, "a", "pointer", b"d"), Some(WireMessage::Hide));
}

#[test]
fn message_kinds_are_distinct() {
    let kinds = [
        message_kind(&WireMessage::Move(PointerSample::new(0.0, 0.0))),
        message_kind(&WireMessage::Click(PointerSample::new(0.0, 0.0))),
        message_kind(&WireMessage::Hide),
        message_kind(&WireMessage::Nickname("n".into())),
    ];
    assert_eq!(kinds, ["move", "click", "hide", "nickname"]);
}
