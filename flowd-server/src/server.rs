//! TCP server implementation.

use crate::config::AuthConfig;
use crate::error::ServerError;
use crate::handler::CommandHandler;
use crate::session::{Session, SessionState, WireMode};
use bytes::BytesMut;
use flowd_core::WorkflowEngine;
use flowd_protocol::codec::jsonl;
use flowd_protocol::{Decoder, Encoder, Request};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Whether authentication is required.
    pub auth_required: bool,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7420".parse().unwrap(),
            idle_timeout: Duration::from_secs(300),
            auth_required: false,
            max_connections: 1000,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }
}

/// Server statistics, surfaced via INFO.
#[derive(Debug)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
    started_at: Instant,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Returns how long the server has been up.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// TCP server for flowd.
pub struct Server {
    config: ServerConfig,
    handler: Arc<CommandHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server.
    pub fn new(config: ServerConfig, engine: Arc<WorkflowEngine>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let stats = Arc::new(ServerStats::new());
        let handler = CommandHandler::new(engine).with_stats(stats.clone());
        Self {
            config,
            handler: Arc::new(handler),
            stats,
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Creates a new server with authentication.
    pub fn with_auth(
        config: ServerConfig,
        engine: Arc<WorkflowEngine>,
        auth_config: &AuthConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let stats = Arc::new(ServerStats::new());
        let handler = CommandHandler::with_auth(engine, auth_config).with_stats(stats.clone());
        Self {
            config,
            handler: Arc::new(handler),
            stats,
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Runs the server.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.running.store(true, Ordering::SeqCst);

        tracing::info!("server listening on {}", self.config.bind_addr);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let handler = self.handler.clone();
                            let stats = self.stats.clone();
                            let config = self.config.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    stream,
                                    addr,
                                    handler,
                                    config,
                                    &mut conn_shutdown,
                                )
                                .await;

                                match result {
                                    Ok(()) | Err(ServerError::ShuttingDown) => {}
                                    Err(e) => {
                                        tracing::debug!("connection {} error: {}", addr, e);
                                        stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                    }
                                }

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!("client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Handles a single connection.
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        handler: Arc<CommandHandler>,
        config: ServerConfig,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        tracing::info!("client connected: {}", addr);

        let mut session = Session::new(addr, config.auth_required);
        let mut decoder = Decoder::new();
        let mut line_decoder = jsonl::LineDecoder::new();
        let mut buf = [0u8; 8192];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!("[{}] connection closed by client", addr);
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::debug!("[{}] received {} bytes", addr, n);
                            match session.wire_mode() {
                                WireMode::BinaryJson => decoder.extend(&buf[..n]),
                                WireMode::Jsonl => line_decoder.extend(&buf[..n]),
                            }
                        }
                        Err(e) => {
                            tracing::debug!("[{}] read error: {}", addr, e);
                            return Err(ServerError::Io(e));
                        }
                    }
                }

                _ = tokio::time::sleep(config.idle_timeout) => {
                    if session.idle_duration() > config.idle_timeout {
                        tracing::debug!("[{}] idle timeout", addr);
                        return Ok(());
                    }
                }

                _ = shutdown.recv() => {
                    tracing::debug!("[{}] shutdown signal received", addr);
                    return Err(ServerError::ShuttingDown);
                }
            }

            // Process any complete requests. The wire mode can flip when a
            // HELLO negotiates jsonl; the response to that HELLO already goes
            // out in the new mode.
            loop {
                let next: Option<Request> = match session.wire_mode() {
                    WireMode::BinaryJson => decoder.decode_request()?,
                    WireMode::Jsonl => line_decoder.decode_line()?,
                };
                let request = match next {
                    Some(request) => request,
                    None => break,
                };

                tracing::info!("[{}] request: {:?} (id={})", addr, request.op, request.id);

                let response = handler.handle(&mut session, &request);

                tracing::info!(
                    "[{}] response: {} (id={})",
                    addr,
                    if response.is_ok() { "OK" } else { "ERROR" },
                    response.id
                );

                // Encode and send response
                let response_bytes = match session.wire_mode() {
                    WireMode::BinaryJson => Encoder::encode_response(&response)?,
                    WireMode::Jsonl => BytesMut::from(&jsonl::encode(&response)?[..]),
                };

                tracing::debug!("[{}] writing {} bytes", addr, response_bytes.len());
                stream.write_all(&response_bytes).await?;

                // Check if session is closing
                if session.state() == SessionState::Closing {
                    tracing::debug!("[{}] session closing", addr);
                    return Ok(());
                }
            }
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}
