//! Gateway - TCP/TLS listener that accepts incoming connections.
//!
//! The Gateway binds the WS socket (and the WSS socket when TLS is
//! configured) and spawns a Connection task for each client that completes
//! the upgrade.

use crate::config::{Config, TlsConfig};
use crate::network::connection::handshake;
use crate::network::connection::{Connection, ConnectionSettings};
use crate::router::EventRouter;
use rustls_pemfile::{certs, pkcs8_private_keys};
use std::io::{BufReader, Cursor};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Everything a spawned connection task needs.
#[derive(Clone)]
struct Acceptor {
    router: EventRouter,
    settings: Arc<ConnectionSettings>,
    allow_origins: Arc<[String]>,
}

impl Acceptor {
    /// Upgrade, register with the hub, and drive the connection to completion.
    async fn serve<S>(self, stream: S, addr: SocketAddr, shutdown: CancellationToken)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let limit = self.settings.max_message_bytes();
        let accepted = handshake::accept(stream, addr, &self.allow_origins, limit).await;
        let (ws, identity) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(%addr, error = %e, "WebSocket handshake failed");
                return;
            }
        };

        let session = self.router.hub().connect(identity);
        debug!(%addr, conn = %session.conn, "WebSocket upgrade complete");

        let settings = ConnectionSettings::clone(&self.settings);
        Connection::new(ws, addr, session, self.router, settings)
            .run(shutdown)
            .await;
    }
}

/// The Gateway accepts incoming TCP/TLS connections and spawns handlers.
pub struct Gateway {
    plaintext_listener: TcpListener,
    tls_listener: Option<(TcpListener, TlsAcceptor)>,
    acceptor: Acceptor,
}

impl Gateway {
    /// Bind the listeners named in `config`.
    pub async fn bind(config: &Config, router: EventRouter) -> anyhow::Result<Self> {
        let plaintext_listener = TcpListener::bind(config.listen.address).await?;
        info!(address = %plaintext_listener.local_addr()?, "WebSocket listener bound");

        let tls_listener = if let Some(tls_cfg) = &config.tls {
            let tls_acceptor = Self::load_tls(tls_cfg)?;
            let listener = TcpListener::bind(tls_cfg.address).await?;
            info!(address = %listener.local_addr()?, "Secure WebSocket listener bound");
            Some((listener, tls_acceptor))
        } else {
            None
        };

        Ok(Self {
            plaintext_listener,
            tls_listener,
            acceptor: Acceptor {
                router,
                settings: Arc::new(ConnectionSettings::from_config(config)),
                allow_origins: config.listen.allow_origins.clone().into(),
            },
        })
    }

    /// Address the WS listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.plaintext_listener.local_addr()
    }

    /// Address the WSS listener is bound to, when TLS is configured.
    pub fn tls_local_addr(&self) -> Option<SocketAddr> {
        self.tls_listener
            .as_ref()
            .and_then(|(listener, _)| listener.local_addr().ok())
    }

    /// Load TLS certificates and create TlsAcceptor.
    fn load_tls(config: &TlsConfig) -> anyhow::Result<TlsAcceptor> {
        let cert_file = std::fs::read(&config.cert_path)?;
        let cert_reader = &mut BufReader::new(Cursor::new(cert_file));
        let certs: Vec<CertificateDer> = certs(cert_reader).collect::<Result<Vec<_>, _>>()?;

        if certs.is_empty() {
            anyhow::bail!("No certificates found in {}", config.cert_path);
        }

        let key_file = std::fs::read(&config.key_path)?;
        let key_reader = &mut BufReader::new(Cursor::new(key_file));
        let key = pkcs8_private_keys(key_reader)
            .next()
            .transpose()?
            .map(PrivateKeyDer::from);

        let Some(key) = key else {
            anyhow::bail!("No private keys found in {}", config.key_path);
        };

        let tls_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(TlsAcceptor::from(Arc::new(tls_config)))
    }

    /// Accept connections until `shutdown` is cancelled.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        if let Some((tls_listener, tls_acceptor)) = self.tls_listener {
            let acceptor = self.acceptor.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let accepted = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        accepted = tls_listener.accept() => accepted,
                    };
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!(%addr, "TLS connection accepted");
                            let acceptor = acceptor.clone();
                            let tls = tls_acceptor.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                match tls.accept(stream).await {
                                    Ok(tls_stream) => {
                                        acceptor.serve(tls_stream, addr, shutdown).await
                                    }
                                    Err(e) => warn!(%addr, error = %e, "TLS handshake failed"),
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept TLS connection");
                        }
                    }
                }
                info!("TLS listener stopped");
            });
        }

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.plaintext_listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, addr)) => {
                    debug!(%addr, "Connection accepted");
                    let acceptor = self.acceptor.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(%addr, error = %e, "Failed to set TCP_NODELAY");
                        }
                        acceptor.serve(stream, addr, shutdown).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}
