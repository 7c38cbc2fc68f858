//! Presence announcements over real sockets.

mod common;

use chatterd::state::Frame;
use common::{TestClient, TestServer};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn two_users_see_each_other_then_one_leaves() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;

    let mut a = server.connect(Some("A")).await?;
    a.wait_for_presence(&["A"]).await?;

    let mut b = server.connect(Some("B")).await?;
    b.wait_for_presence(&["A", "B"]).await?;
    a.wait_for_presence(&["A", "B"]).await?;

    b.close().await?;
    a.wait_for_presence(&["A"]).await?;
    server.wait_for_connections(1).await?;
    Ok(())
}

#[tokio::test]
async fn second_device_keeps_user_online() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;

    let mut watcher = server.connect(Some("W")).await?;
    let phone = server.connect(Some("U")).await?;
    let laptop = server.connect(Some("U")).await?;
    watcher.wait_for_presence(&["U", "W"]).await?;
    server.wait_for_connections(3).await?;

    phone.close().await?;
    server.wait_for_connections(2).await?;
    assert!(server.hub().is_online(&"U".into()));

    laptop.close().await?;
    watcher.wait_for_presence(&["W"]).await?;
    Ok(())
}

#[tokio::test]
async fn anonymous_connection_receives_snapshot_but_is_not_listed() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;

    let mut a = server.connect(Some("A")).await?;
    a.wait_for_presence(&["A"]).await?;

    let mut anon = server.connect(None).await?;
    anon.wait_for_presence(&["A"]).await?;

    let mut empty = TestClient::connect(&format!("{}?userId=", server.url(None))).await?;
    empty.wait_for_presence(&["A"]).await?;
    assert_eq!(server.hub().online_identities().len(), 1);
    Ok(())
}

#[tokio::test]
async fn malformed_frames_do_not_close_the_connection() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;

    let mut a = server.connect(Some("A")).await?;
    a.wait_for_presence(&["A"]).await?;
    let mut b = server.connect(Some("B")).await?;
    b.wait_for_presence(&["A", "B"]).await?;

    a.send_raw("not json").await?;
    a.send("call:teleport", json!({"to": "B"})).await?;
    a.send("call:end", json!({"nobody": true})).await?;
    a.send("typing:direct", json!({"to": "B", "isTyping": true})).await?;

    let data = b.recv_event("typing:direct").await?;
    assert_eq!(data, json!({"from": "A", "isTyping": true}));
    Ok(())
}

#[tokio::test]
async fn oversized_frame_is_dropped() -> anyhow::Result<()> {
    let server = TestServer::spawn_with("[limits]\nmax_frame_bytes = 256\n").await?;

    let mut a = server.connect(Some("A")).await?;
    let mut b = server.connect(Some("B")).await?;
    b.wait_for_presence(&["A", "B"]).await?;

    let padding = "x".repeat(512);
    a.send("notify:user", json!({"to": "B", "notification": {"body": padding}}))
        .await?;
    b.expect_no_event("notification:new", Duration::from_millis(300))
        .await?;

    a.send("notify:user", json!({"to": "B", "notification": {"body": "hi"}}))
        .await?;
    assert_eq!(b.recv_event("notification:new").await?, json!({"body": "hi"}));
    Ok(())
}

#[tokio::test]
async fn idle_connection_is_closed_and_announced() -> anyhow::Result<()> {
    let server = TestServer::spawn_with("[server.idle_timeouts]\nping = 1\ntimeout = 1\n").await?;
    let mut watcher = server.connect(Some("W")).await?;
    watcher.wait_for_presence(&["W"]).await?;

    // Completes the upgrade, then is never polled, so pings go unanswered.
    let (_silent, _) = tokio_tungstenite::connect_async(server.url(Some("S"))).await?;
    watcher.wait_for_presence(&["S", "W"]).await?;

    // The watcher keeps reading, which answers its own pings.
    watcher.wait_for_presence(&["W"]).await?;
    server.wait_for_connections(1).await?;
    Ok(())
}

#[tokio::test]
async fn stalled_reader_hits_write_timeout_and_is_announced() -> anyhow::Result<()> {
    let server = TestServer::spawn_with("[limits]\nsendq = 64\nwrite_timeout_ms = 200\n").await?;
    let mut watcher = server.connect(Some("W")).await?;
    watcher.wait_for_presence(&["W"]).await?;

    // Upgraded, then never read, so the server's writes back up.
    let stalled = server.connect_raw("S").await?;
    watcher.wait_for_presence(&["S", "W"]).await?;

    // 32 MiB outgrows the socket buffers while staying inside the queue, so
    // the writer blocks rather than the queue overflowing.
    let body = "x".repeat(1 << 20);
    let frame = Frame::from(format!(r#"{{"event":"newMessage","data":"{body}"}}"#));
    let recipients = server.hub().user_recipients(&"S".into());
    assert_eq!(recipients.len(), 1);
    for _ in 0..32 {
        let report = server.hub().deliver(&frame, &recipients);
        assert_eq!(report.failed, 0);
    }

    watcher.wait_for_presence(&["W"]).await?;
    server.wait_for_connections(1).await?;
    assert!(!server.hub().is_online(&"S".into()));
    drop(stalled);
    Ok(())
}

#[tokio::test]
async fn message_far_over_limit_closes_connection() -> anyhow::Result<()> {
    let server = TestServer::spawn_with("[limits]\nmax_frame_bytes = 256\n").await?;
    let mut a = server.connect(Some("A")).await?;
    let mut b = server.connect(Some("B")).await?;
    b.wait_for_presence(&["A", "B"]).await?;

    // Past the transport limit the read fails instead of buffering.
    a.send_raw(&"x".repeat(4096)).await?;
    b.wait_for_presence(&["B"]).await?;
    server.wait_for_connections(1).await?;
    Ok(())
}
