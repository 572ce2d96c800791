#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use serde_json::json;
use tokio::sync::mpsc;

use common::*;
use eventlink_client::config::SendPolicy;
use eventlink_client::ConnectionState;
use eventlink_core::protocol::{types, ChatStream, Envelope};

fn record_update(room: &str, id: &str) -> Envelope {
    Envelope::new(types::RECORD_UPDATED, json!({ "id": id, "tableId": room })).with_room(room)
}

#[tokio::test(start_paused = true)]
async fn room_scoped_handler_sees_only_its_room() {
    let (client, connector) = client_with(test_config());
    let (handler, mut rx) = recorder();
    client.subscribe(types::RECORD_UPDATED, Some("tbl_1"), handler);

    let peer = connected(&client, &connector).await;
    peer.push(&record_update("tbl_2", "rec_other"));
    peer.push(&record_update("tbl_1", "rec_mine"));

    let env = recv(&mut rx).await;
    assert_eq!(env.payload["id"], "rec_mine");
    settle().await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn roomless_envelope_reaches_only_roomless_handlers() {
    let (client, connector) = client_with(test_config());
    let (scoped, mut scoped_rx) = recorder();
    let (global, mut global_rx) = recorder();
    client.subscribe(types::REALTIME_UPDATE, Some("saga_1"), scoped);
    client.subscribe(types::REALTIME_UPDATE, None, global);

    let peer = connected(&client, &connector).await;
    peer.push_text(r#"{"type":"realtime_update","payload":{"n":1}}"#);

    let env = recv(&mut global_rx).await;
    assert_eq!(env.payload["n"], 1);
    settle().await;
    assert!(scoped_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn rooms_are_replayed_once_after_reconnect() {
    let (client, connector) = client_with(test_config());
    client.join("A");
    client.join("B");

    let mut peer = connected(&client, &connector).await;
    let first: Vec<_> = written(&mut peer).iter().map(|e| e.room.clone()).collect();
    assert_eq!(first, vec![Some("A".to_string()), Some("B".to_string())]);

    drop(peer);
    wait_for_state(&client, ConnectionState::Reconnecting).await;

    let mut peer = next_peer(&connector).await;
    wait_for_state(&client, ConnectionState::Connected).await;
    settle().await;

    let replayed = written(&mut peer);
    assert_eq!(replayed.len(), 2);
    for (env, room) in replayed.iter().zip(["A", "B"]) {
        assert_eq!(env.event_type, types::JOIN_ROOM);
        assert_eq!(env.payload["room"], room);
    }
    assert_eq!(client.rooms(), vec!["A".to_string(), "B".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn join_and_leave_while_connected() {
    let (client, connector) = client_with(test_config());
    let mut peer = connected(&client, &connector).await;

    client.join("tbl_1");
    client.join("tbl_1");
    client.leave("tbl_9");
    client.leave("tbl_1");

    let frames = written(&mut peer);
    let kinds: Vec<_> = frames.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(kinds, vec![types::JOIN_ROOM, types::LEAVE_ROOM]);
    assert!(client.rooms().is_empty());
}

#[tokio::test(start_paused = true)]
async fn left_room_is_not_replayed() {
    let (client, connector) = client_with(test_config());
    client.join("A");
    client.join("B");
    client.leave("A");

    let mut peer = connected(&client, &connector).await;
    let frames = written(&mut peer);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].room(), Some("B"));
}

#[tokio::test(start_paused = true)]
async fn send_reports_whether_the_frame_left() {
    let (client, connector) = client_with(test_config());
    let env = Envelope::new(types::CHAT_MESSAGE, json!({ "content": "hi" }));

    assert!(!client.send(&env));
    assert_eq!(client.queued(), 0);
    assert_eq!(connector.attempts(), 0);

    let mut peer = connected(&client, &connector).await;
    assert!(client.send(&env));

    let frames = written(&mut peer);
    assert_eq!(frames, vec![env.clone()]);
    assert_eq!(client.stats().messages_sent, 1);

    drop(peer);
    wait_for_state(&client, ConnectionState::Reconnecting).await;
    assert!(!client.send(&env));
}

#[tokio::test(start_paused = true)]
async fn emit_builds_a_stamped_envelope() {
    let (client, connector) = client_with(test_config());
    let mut peer = connected(&client, &connector).await;

    assert!(client.emit(types::CHAT_MESSAGE, json!({ "content": "yo" }), Some("s1")));
    let env = tokio::time::timeout(WAIT, peer.next_envelope()).await.unwrap().unwrap();
    assert_eq!(env.event_type, types::CHAT_MESSAGE);
    assert_eq!(env.room(), Some("s1"));
    assert!(env.id.is_some());
    assert!(env.timestamp.is_some());
}

#[tokio::test(start_paused = true)]
async fn queue_policy_flushes_after_room_replay() {
    let mut cfg = test_config();
    cfg.send.policy = SendPolicy::Queue;
    cfg.send.max_queued = 2;
    let (client, connector) = client_with(cfg);

    client.join("A");
    let msgs: Vec<_> = (1..=3)
        .map(|n| Envelope::new(types::CHAT_MESSAGE, json!({ "content": format!("m{n}") })))
        .collect();
    for m in &msgs {
        assert!(!client.send(m));
    }
    assert_eq!(client.queued(), 2);

    let mut peer = connected(&client, &connector).await;
    let frames = written(&mut peer);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].event_type, types::JOIN_ROOM);
    assert_eq!(frames[1], msgs[1]);
    assert_eq!(frames[2], msgs[2]);
    assert_eq!(client.queued(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_discards_queue() {
    let mut cfg = test_config();
    cfg.send.policy = SendPolicy::Queue;
    let (client, _connector) = client_with(cfg);

    client.send(&Envelope::new(types::CHAT_MESSAGE, json!({ "content": "x" })));
    assert_eq!(client.queued(), 1);
    client.disconnect();
    assert_eq!(client.queued(), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_handlers_do_not_starve_the_others() {
    let (client, connector) = client_with(test_config());
    client.subscribe(types::CHAT_STREAM, None, |_: &Envelope| {
        Err(eventlink_core::EventLinkError::handler("render failed"))
    });
    client.subscribe(types::CHAT_STREAM, None, |_: &Envelope| -> eventlink_core::Result<()> {
        panic!("widget exploded")
    });
    let (handler, mut rx) = recorder();
    client.subscribe(types::CHAT_STREAM, None, handler);

    let peer = connected(&client, &connector).await;
    for delta in ["Hel", "lo"] {
        peer.push(&Envelope::new(types::CHAT_STREAM, json!({ "delta": delta })));
    }

    assert_eq!(recv(&mut rx).await.payload["delta"], "Hel");
    assert_eq!(recv(&mut rx).await.payload["delta"], "lo");
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.stats().handler_errors, 4);
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_counted_and_skipped() {
    let (client, connector) = client_with(test_config());
    let (handler, mut rx) = recorder();
    client.subscribe(types::CHAT_MESSAGE, None, handler);

    let peer = connected(&client, &connector).await;
    peer.push_text("not json");
    peer.push_text(r#"{"payload":{}}"#);
    peer.push_text(r#"{"type":"chat.message","payload":{"content":"ok"}}"#);

    assert_eq!(recv(&mut rx).await.payload["content"], "ok");
    let stats = client.stats();
    assert_eq!(stats.decode_errors, 2);
    assert_eq!(stats.messages_received, 1);
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn subscribe_typed_decodes_payload() {
    let (client, connector) = client_with(test_config());
    let (tx, mut rx) = mpsc::unbounded_channel::<ChatStream>();
    client.subscribe_typed(types::CHAT_STREAM, None, move |_, chunk: ChatStream| {
        let _ = tx.send(chunk);
        Ok(())
    });

    let peer = connected(&client, &connector).await;
    peer.push_text(r#"{"type":"chat.stream","payload":{"token":"oops"}}"#);
    peer.push_text(r#"{"type":"chat.stream","payload":{"bogus":true}}"#);
    peer.push_text(r#"{"type":"chat.stream","payload":{"delta":"!","done":true}}"#);

    let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.delta, "oops");
    let last = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert!(last.done);
    assert_eq!(client.stats().handler_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_stops_delivery() {
    let (client, connector) = client_with(test_config());
    let (gone, mut gone_rx) = recorder();
    let (kept, mut kept_rx) = recorder();
    let handle = client.subscribe(types::RECORD_CREATED, None, gone);
    client.subscribe(types::RECORD_CREATED, None, kept);
    client.unsubscribe(handle);
    client.unsubscribe(handle);

    let peer = connected(&client, &connector).await;
    peer.push_text(r#"{"type":"record:created","payload":{"id":"r1"}}"#);

    recv(&mut kept_rx).await;
    assert!(gone_rx.try_recv().is_err());

    assert_eq!(client.unsubscribe_all(types::RECORD_CREATED), 1);
    peer.push_text(r#"{"type":"record:created","payload":{"id":"r2"}}"#);
    settle().await;
    assert!(kept_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn presence_is_tracked_and_forgotten_on_link_loss() {
    let (client, connector) = client_with(test_config());
    let peer = connected(&client, &connector).await;

    peer.push_text(r#"{"type":"presence","room":"s1","payload":{"peer":"u1","status":"online"}}"#);
    peer.push_text(r#"{"type":"presence","room":"s1","payload":{"userId":"u2","status":"joined"}}"#);
    peer.push_text(r#"{"type":"presence","room":"s1","payload":{"peer":"u1","status":"offline"}}"#);
    settle().await;
    assert_eq!(client.peers(Some("s1")), vec!["u2".to_string()]);
    assert!(client.render_stats().contains("eventlink_known_peers 1"));

    drop(peer);
    wait_for_state(&client, ConnectionState::Reconnecting).await;
    assert!(client.peers(Some("s1")).is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnect_from_a_handler_stops_buffered_frames() {
    let (client, connector) = client_with(test_config());
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let handle = client.clone();
    client.subscribe(types::CHAT_MESSAGE, None, move |env: &Envelope| {
        let _ = tx.send(env.clone());
        handle.disconnect();
        Ok(())
    });

    let peer = connected(&client, &connector).await;
    for n in 0..5 {
        peer.push(&Envelope::new(types::CHAT_MESSAGE, json!({ "content": format!("m{n}") })));
    }

    assert_eq!(recv(&mut rx).await.payload["content"], "m0");
    settle().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.stats().messages_received, 1);
}
