//! WebSocket upgrade with origin check and identity capture.

use chatter_proto::UserId;
use chatter_proto::handshake::{identity_from_query, origin_allowed};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async_with_config};
use tracing::warn;

/// Upper bound on the HTTP upgrade exchange.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Why an upgrade did not produce a connection.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("websocket handshake failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("websocket handshake timed out")]
    Timeout,
}

/// Transport limits for an upgraded socket. Messages over `max_message_bytes`
/// fail the read instead of being buffered.
pub fn websocket_config(max_message_bytes: usize) -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(max_message_bytes);
    config.max_frame_size = Some(max_message_bytes);
    config
}

/// Perform the upgrade, rejecting disallowed origins with 403.
///
/// Returns the stream and the `userId` query parameter, if any.
pub async fn accept<S>(
    stream: S,
    addr: SocketAddr,
    allow_origins: &[String],
    max_message_bytes: usize,
) -> Result<(WebSocketStream<S>, Option<UserId>), HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut identity = None;

    let callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let origin = req.headers().get("Origin").and_then(|o| o.to_str().ok());
        if !origin_allowed(allow_origins, origin) {
            warn!(%addr, origin = origin.unwrap_or("-"), "WebSocket origin rejected");
            let mut rejection = ErrorResponse::new(Some("origin not allowed".to_string()));
            *rejection.status_mut() = http::StatusCode::FORBIDDEN;
            return Err(rejection);
        }
        identity = identity_from_query(req.uri().query());
        Ok(response)
    };

    let config = websocket_config(max_message_bytes);
    let upgrade = accept_hdr_async_with_config(stream, callback, Some(config));
    let ws = tokio::time::timeout(HANDSHAKE_TIMEOUT, upgrade)
        .await
        .map_err(|_| HandshakeError::Timeout)??;
    Ok((ws, identity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_caps_messages_and_frames() {
        let config = websocket_config(4096);
        assert_eq!(config.max_message_size, Some(4096));
        assert_eq!(config.max_frame_size, Some(4096));
    }
}
