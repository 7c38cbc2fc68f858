//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// WebSocket listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:5000").
    pub address: SocketAddr,
    /// Allowed origins for the upgrade request (e.g., `["https://example.com"]`).
    /// Empty list allows all origins.
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

/// WSS listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Address to bind to for WSS (e.g., "0.0.0.0:5443").
    pub address: SocketAddr,
    /// Path to certificate file (PEM format).
    pub cert_path: String,
    /// Path to private key file (PEM format).
    pub key_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_origins_default_empty() {
        let cfg: ListenConfig = toml::from_str(r#"address = "0.0.0.0:5000""#).unwrap();
        assert!(cfg.allow_origins.is_empty());
        assert_eq!(cfg.address.port(), 5000);
    }

    #[test]
    fn tls_requires_paths() {
        let res: Result<TlsConfig, _> = toml::from_str(r#"address = "0.0.0.0:5443""#);
        assert!(res.is_err());
    }
}
