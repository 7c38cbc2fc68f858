//! WebSocket upgrade: origin allow-list and identity capture.

mod common;

use common::TestServer;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Error as WsError;

#[tokio::test]
async fn disallowed_origin_gets_403() -> anyhow::Result<()> {
    let server = TestServer::spawn_with_origins(&["https://app.example"]).await?;

    let mut req = server.url(Some("A")).into_client_request()?;
    req.headers_mut()
        .insert("Origin", HeaderValue::from_static("https://evil.example"));
    match tokio_tungstenite::connect_async(req).await {
        Err(WsError::Http(res)) => assert_eq!(res.status().as_u16(), 403),
        other => panic!("expected 403, got {:?}", other.map(|_| ())),
    }
    assert_eq!(server.hub().connection_count(), 0);
    Ok(())
}

#[tokio::test]
async fn allowed_origin_is_upgraded() -> anyhow::Result<()> {
    let server = TestServer::spawn_with_origins(&["https://app.example"]).await?;

    let mut req = server.url(Some("A")).into_client_request()?;
    req.headers_mut()
        .insert("Origin", HeaderValue::from_static("https://app.example"));
    let (_ws, res) = tokio_tungstenite::connect_async(req).await?;
    assert_eq!(res.status().as_u16(), 101);
    server.wait_for_connections(1).await?;
    assert!(server.hub().is_online(&"A".into()));
    Ok(())
}

#[tokio::test]
async fn percent_encoded_identity_is_decoded() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = common::TestClient::connect(&server.url(Some("user%40example.com"))).await?;
    client.wait_for_presence(&["user@example.com"]).await?;
    Ok(())
}
