//! Test WebSocket client.
//!
//! Sends JSON envelopes and asserts on the events the server pushes back.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Default wait for an expected event.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A test client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send one event envelope.
    pub async fn send(&mut self, event: &str, data: Value) -> anyhow::Result<()> {
        self.send_raw(&json!({ "event": event, "data": data }).to_string())
            .await
    }

    /// Receive the next event envelope.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        self.recv_timeout(RECV_TIMEOUT).await
    }

    /// Receive the next event envelope within `dur`. Control frames are skipped.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Value> {
        loop {
            let msg = timeout(dur, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match msg {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => anyhow::bail!("connection closed"),
                _ => continue,
            }
        }
    }

    /// Receive the raw text of the next event named `event`, skipping others.
    #[allow(dead_code)]
    pub async fn recv_raw_event(&mut self, event: &str) -> anyhow::Result<String> {
        loop {
            let msg = timeout(RECV_TIMEOUT, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(&text)?;
                if value["event"] == event {
                    return Ok(text);
                }
            }
        }
    }

    /// Receive events until one named `event` arrives; return its data.
    pub async fn recv_event(&mut self, event: &str) -> anyhow::Result<Value> {
        loop {
            let value = self.recv().await?;
            if value["event"] == event {
                return Ok(value["data"].clone());
            }
        }
    }

    /// Read presence snapshots until one equals `expected` (order-insensitive).
    pub async fn wait_for_presence(&mut self, expected: &[&str]) -> anyhow::Result<()> {
        let mut want: Vec<&str> = expected.to_vec();
        want.sort_unstable();
        loop {
            let data = self.recv_event("getOnlineUsers").await?;
            let mut got: Vec<String> = serde_json::from_value(data)?;
            got.sort_unstable();
            if got == want {
                return Ok(());
            }
        }
    }

    /// Assert no event named `event` arrives within `dur`.
    #[allow(dead_code)]
    pub async fn expect_no_event(&mut self, event: &str, dur: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + dur;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            match self.recv_timeout(remaining).await {
                Ok(value) if value["event"] == event => {
                    anyhow::bail!("unexpected {event}: {value}")
                }
                Ok(_) => continue,
                Err(_) => return Ok(()),
            }
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
