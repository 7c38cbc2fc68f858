//! Test server management.
//!
//! Runs the gateway and the internal HTTP API inside the test's runtime,
//! each bound to `127.0.0.1:0`.

use chatterd::config::Config;
use chatterd::http::{self, ApiState};
use chatterd::network::Gateway;
use chatterd::router::EventRouter;
use chatterd::state::Hub;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Token required by the internal API of every test server.
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "test-internal-token";

/// A test server instance. Dropping it shuts everything down.
pub struct TestServer {
    ws_addr: SocketAddr,
    api_addr: SocketAddr,
    hub: Arc<Hub>,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Spawn a server with default limits.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with("").await
    }

    /// Spawn a server, appending `extra` TOML to the base configuration.
    pub async fn spawn_with(extra: &str) -> anyhow::Result<Self> {
        Self::build(&[], extra).await
    }

    /// Spawn a server whose handshake only accepts the given origins.
    #[allow(dead_code)]
    pub async fn spawn_with_origins(origins: &[&str]) -> anyhow::Result<Self> {
        Self::build(origins, "").await
    }

    async fn build(origins: &[&str], extra: &str) -> anyhow::Result<Self> {
        let allow_origins = serde_json::to_string(origins)?;
        let config = Config::from_toml(&format!(
            r#"
[server]
name = "test.chatterd"
node_id = "0TS"

[listen]
address = "127.0.0.1:0"
allow_origins = {allow_origins}

[http]
address = "127.0.0.1:0"
internal_token = "{TEST_TOKEN}"
{extra}
"#
        ))?;

        let hub = Arc::new(Hub::new(&config.server.node_id, config.limits.sendq));
        let router = EventRouter::new(Arc::clone(&hub));
        let shutdown = CancellationToken::new();

        let gateway = Gateway::bind(&config, router.clone()).await?;
        let ws_addr = gateway.local_addr()?;
        tokio::spawn(gateway.run(shutdown.clone()));

        let http_cfg = config
            .http
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("test config has no [http] block"))?;
        let listener = TcpListener::bind(http_cfg.address).await?;
        let api_addr = listener.local_addr()?;
        let state = ApiState::new(router, http_cfg.internal_token.clone());
        tokio::spawn(http::serve(listener, state, shutdown.clone()));

        Ok(Self {
            ws_addr,
            api_addr,
            hub,
            shutdown,
        })
    }

    /// WebSocket URL, with `userId` when an identity is given.
    pub fn url(&self, user: Option<&str>) -> String {
        match user {
            Some(user) => format!("ws://{}/?userId={}", self.ws_addr, user),
            None => format!("ws://{}/", self.ws_addr),
        }
    }

    /// Base URL of the internal HTTP API.
    #[allow(dead_code)]
    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}{}", self.api_addr, path)
    }

    /// The server's shared hub, for asserting on state directly.
    #[allow(dead_code)]
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Connect a client with the given identity.
    pub async fn connect(&self, user: Option<&str>) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.url(user)).await
    }

    /// Complete a WebSocket upgrade on a bare TCP socket and return it
    /// without reading anything past the 101 response.
    #[allow(dead_code)]
    pub async fn connect_raw(&self, user: &str) -> anyhow::Result<TcpStream> {
        let mut stream = TcpStream::connect(self.ws_addr).await?;
        let request = format!(
            "GET /?userId={user} HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n",
            addr = self.ws_addr,
        );
        stream.write_all(request.as_bytes()).await?;

        let mut response = Vec::new();
        let mut buf = [0u8; 512];
        while !response.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await?;
            anyhow::ensure!(n > 0, "connection closed during upgrade");
            response.extend_from_slice(&buf[..n]);
        }
        anyhow::ensure!(
            response.starts_with(b"HTTP/1.1 101"),
            "upgrade refused: {}",
            String::from_utf8_lossy(&response)
        );
        Ok(stream)
    }

    /// Wait until the hub reports `count` live connections.
    #[allow(dead_code)]
    pub async fn wait_for_connections(&self, count: usize) -> anyhow::Result<()> {
        for _ in 0..50 {
            if self.hub.connection_count() == count {
                return Ok(());
            }
            sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!(
            "expected {count} connections, hub has {}",
            self.hub.connection_count()
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
