use super::*;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

fn relay_config(url: String) -> RelayConfig {
    RelayConfig { url, peer_id: "me".into(), queue_capacity: 16, reconnect_base_ms: 10, reconnect_max_ms: 40 }
}

async fn next_text<S>(stream: &mut S) -> String
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        if let Message::Text(text) = stream.next().await.expect("stream open").expect("frame") {
            return text.as_str().to_owned();
        }
    }
}

async fn local_relay() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("ws://{}", listener.local_addr().expect("addr"));
    (listener, url)
}

#[test]
fn envelopes_are_tagged_by_type() {
    let join = serde_json::to_value(RelayFrame::Join { peer: "me".into() }).expect("json");
    assert_eq!(join, serde_json::json!({"type": "join", "peer": "me"}));

    let parsed: RelayFrame = serde_json::from_str(r#"{"type":"peer_removed","peer":"x"}"#).expect("parse");
    assert_eq!(parsed, RelayFrame::PeerRemoved { peer: "x".into() });
}

#[test]
fn inbound_message_becomes_event() {
    let text = r#"{"type":"message","from":"bob","topic":"pointer","payload":"d"}"#;
    let event = inbound_event(text, "me").expect("event");
    assert_eq!(event, TransportEvent::Message { peer: "bob".into(), topic: "pointer".into(), payload: b"d".to_vec() });
}

#[test]
fn inbound_echo_and_garbage_are_dropped() {
    let echo = r#"{"type":"message","from":"me","topic":"pointer","payload":"d"}"#;
    assert!(inbound_event(echo, "me").is_none());
    assert!(inbound_event("not json", "me").is_none());
    assert!(inbound_event(r#"{"type":"publish","topic":"t","payload":""}"#, "me").is_none());
    assert!(inbound_event(r#"{"type":"peer_joined","peer":"me"}"#, "me").is_none());
}

#[test]
fn inbound_lifecycle_envelopes_map_to_events() {
    let joined = inbound_event(r#"{"type":"peer_joined","peer":"bob"}"#, "me");
    assert_eq!(joined, Some(TransportEvent::PeerJoined { peer: "bob".into() }));
    let removed = inbound_event(r#"{"type":"peer_removed","peer":"bob"}"#, "me");
    assert_eq!(removed, Some(TransportEvent::PeerRemoved { peer: "bob".into() }));
}

#[test]
fn jitter_stays_within_half_again() {
    for _ in 0..100 {
        let delay = jittered(1000);
        assert!((1000..=1500).contains(&delay));
    }
    assert_eq!(jittered(0), 0);
}

#[tokio::test]
async fn joins_publishes_and_receives() {
    let (listener, url) = local_relay().await;
    let (transport, mut events) = WsRelayTransport::connect(relay_config(url));
    assert_eq!(transport.capabilities(), Capabilities::broadcast());

    let (tcp, _) = listener.accept().await.expect("accept");
    let mut server = accept_async(tcp).await.expect("handshake");

    let join: RelayFrame = serde_json::from_str(&next_text(&mut server).await).expect("join");
    assert_eq!(join, RelayFrame::Join { peer: "me".into() });

    transport.send_to_all("pointer", b"p|50|50||".to_vec()).await.expect("send");
    let publish: RelayFrame = serde_json::from_str(&next_text(&mut server).await).expect("publish");
    assert_eq!(publish, RelayFrame::Publish { topic: "pointer".into(), payload: "p|50|50||".into() });

    let inbound = r#"{"type":"message","from":"bob","topic":"pointer","payload":"d"}"#;
    server.send(Message::Text(inbound.into())).await.expect("server send");
    let event = events.recv().await.expect("event");
    assert_eq!(event, TransportEvent::Message { peer: "bob".into(), topic: "pointer".into(), payload: b"d".to_vec() });
}

#[tokio::test]
async fn disconnect_reports_reset_and_reconnects() {
    let (listener, url) = local_relay().await;
    let (_transport, mut events) = WsRelayTransport::connect(relay_config(url));

    let (tcp, _) = listener.accept().await.expect("accept");
    let mut server = accept_async(tcp).await.expect("handshake");
    next_text(&mut server).await;
    server.send(Message::Text(r#"{"type":"peer_joined","peer":"bob"}"#.into())).await.expect("send");
    assert_eq!(events.recv().await, Some(TransportEvent::PeerJoined { peer: "bob".into() }));

    drop(server);
    assert_eq!(events.recv().await, Some(TransportEvent::Reset));

    let (tcp, _) = listener.accept().await.expect("reconnect");
    let mut server = accept_async(tcp).await.expect("handshake");
    let join: RelayFrame = serde_json::from_str(&next_text(&mut server).await).expect("join");
    assert_eq!(join, RelayFrame::Join { peer: "me".into() });
}

#[tokio::test]
async fn closed_topic_rejects_sends() {
    let (_listener, url) = local_relay().await;
    let (transport, _events) = WsRelayTransport::connect(relay_config(url));
    transport.close_topic("pointer").await.expect("close");
    let err = transport.send_to_all("pointer", b"d".to_vec()).await.expect_err("closed");
    assert!(matches!(err, TransportError::Closed));
}

#[tokio::test]
async fn frame_sent_before_drop_reaches_relay() {
    let (listener, url) = local_relay().await;
    let (transport, _events) = WsRelayTransport::connect(relay_config(url));

    let (tcp, _) = listener.accept().await.expect("accept");
    let mut server = accept_async(tcp).await.expect("handshake");
    next_text(&mut server).await;

    transport.send_to_all("pointer", b"d".to_vec()).await.expect("send");
    drop(transport);

    let publish: RelayFrame = serde_json::from_str(&next_text(&mut server).await).expect("publish");
    assert_eq!(publish, RelayFrame::Publish { topic: "pointer".into(), payload: "d".into() });
    let closing = tokio::time::timeout(SHUTDOWN_GRACE, server.next()).await.expect("closed in time");
    assert!(matches!(closing, Some(Ok(Message::Close(_))) | None));
}

#[tokio::test]
async fn shutdown_flushes_and_rejects_later_sends() {
    let (listener, url) = local_relay().await;
    let (transport, _events) = WsRelayTransport::connect(relay_config(url));

    let (tcp, _) = listener.accept().await.expect("accept");
    let mut server = accept_async(tcp).await.expect("handshake");
    next_text(&mut server).await;

    transport.send_to_all("pointer", b"d".to_vec()).await.expect("send");
    let relay = tokio::spawn(async move {
        let text = next_text(&mut server).await;
        let mut closed = false;
        while let Some(msg) = server.next().await {
            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                closed = true;
                break;
            }
        }
        (text, closed)
    });
    transport.shutdown().await.expect("shutdown");

    let (text, closed) = relay.await.expect("relay task");
    let publish: RelayFrame = serde_json::from_str(&text).expect("publish");
    assert_eq!(publish, RelayFrame::Publish { topic: "pointer".into(), payload: "d".into() });
    assert!(closed);

    let err = transport.send_to_all("pointer", b"d".to_vec()).await.expect_err("shut down");
    assert!(matches!(err, TransportError::Closed));
    assert!(matches!(transport.shutdown().await, Err(TransportError::Closed)));
}
