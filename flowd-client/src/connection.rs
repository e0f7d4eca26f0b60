//! Connection management: TCP transport, handshake, request correlation.

use crate::error::ClientError;
use flowd_protocol::codec::{Decoder, Encoder};
use flowd_protocol::message::*;
use flowd_protocol::PROTOCOL_VERSION;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

/// Default read buffer size (8 KiB).
const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,

    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,

    /// Timeout for individual requests.
    pub request_timeout: Duration,

    /// Client name announced in the HELLO handshake.
    pub client_name: Option<String>,

    /// Read buffer size in bytes.
    pub read_buffer_size: usize,

    /// Bearer token presented right after the handshake.
    pub auth_token: Option<String>,
}

impl ConnectionConfig {
    /// Creates a configuration with default timeouts.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            client_name: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            auth_token: None,
        }
    }

    /// Sets the client name.
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the read buffer size, clamped to a sane range.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    /// Sets the bearer token to authenticate with.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// A single connection to a flowd server.
///
/// Requests are correlated to responses by ID, so multiple requests can be
/// in flight at once as long as [`Connection::read_loop`] is running.
pub struct Connection {
    config: ConnectionConfig,
    writer: Mutex<Option<WriteHalf<TcpStream>>>,
    reader: Mutex<Option<ReadHalf<TcpStream>>>,
    decoder: Mutex<Decoder>,
    pending: Mutex<HashMap<String, oneshot::Sender<Response>>>,
    next_id: AtomicU64,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new (unconnected) connection.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            decoder: Mutex::new(Decoder::new()),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
        }
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the server and performs the HELLO/AUTH handshake.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let stream = timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        stream.set_nodelay(true).ok();

        let (read_half, write_half) = tokio::io::split(stream);

        *self.writer.lock().await = Some(write_half);
        *self.reader.lock().await = Some(read_half);
        self.decoder.lock().await.clear();

        self.handshake().await?;
        self.connected.store(true, Ordering::SeqCst);

        Ok(())
    }

    /// Performs the handshake. Runs before the read loop starts, so the
    /// responses are read inline off the socket.
    async fn handshake(&self) -> Result<(), ClientError> {
        let hello = HelloParams {
            protocol_version: PROTOCOL_VERSION,
            client_name: self.config.client_name.clone(),
            wire_modes: vec!["binary_json".to_string()],
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let request = Request::new(&id, Operation::Hello).with_params(serde_json::to_value(hello)?);

        self.write_request(&request).await?;

        let response = self.read_single_response().await?;
        if response.is_error() {
            let err = response.error.unwrap();
            return Err(ClientError::ServerError {
                code: err.code,
                message: err.message,
                retryable: err.retryable,
            });
        }

        let hello_result: HelloResult =
            serde_json::from_value(response.result.unwrap_or(Value::Null))?;

        match &self.config.auth_token {
            Some(token) => self.authenticate_internal(token.clone()).await?,
            None if hello_result.auth_required => {
                tracing::warn!(
                    "server at {} requires authentication but no token is configured",
                    self.config.addr
                );
            }
            None => {}
        }

        Ok(())
    }

    /// Sends an AUTH request with the configured bearer token.
    async fn authenticate_internal(&self, token: String) -> Result<(), ClientError> {
        let auth = AuthParams {
            method: "bearer".to_string(),
            token,
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let request = Request::new(&id, Operation::Auth).with_params(serde_json::to_value(auth)?);

        self.write_request(&request).await?;

        let response = self.read_single_response().await?;
        if response.is_error() {
            let err = response.error.unwrap();
            return Err(ClientError::ServerError {
                code: err.code,
                message: err.message,
                retryable: false,
            });
        }

        Ok(())
    }

    async fn write_request(&self, request: &Request) -> Result<(), ClientError> {
        let encoded = Encoder::encode_request(request)?;
        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer.write_all(&encoded).await?;
        Ok(())
    }

    /// Reads one response directly from the socket. Only valid during the
    /// handshake phase, before the read loop owns the reader half.
    async fn read_single_response(&self) -> Result<Response, ClientError> {
        timeout(self.config.request_timeout, async {
            let mut reader_guard = self.reader.lock().await;
            let reader = reader_guard.as_mut().ok_or(ClientError::NotConnected)?;
            let mut decoder = self.decoder.lock().await;

            let mut buf = vec![0u8; self.config.read_buffer_size];
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    return Err(ClientError::ConnectionClosed);
                }
                decoder.extend(&buf[..n]);

                if let Some(response) = decoder.decode_response()? {
                    return Ok(response);
                }
            }
        })
        .await
        .map_err(|_| ClientError::Timeout)?
    }

    /// Sends a request and waits for the correlated response.
    pub async fn request(&self, op: Operation, params: Value) -> Result<Response, ClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::NotConnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let request = Request::new(&id, op).with_params(params);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        if let Err(e) = self.write_request(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match timeout(self.config.request_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                if let Ok(mut pending) = self.pending.try_lock() {
                    pending.remove(&id);
                }
                Err(ClientError::Timeout)
            }
        }
    }

    /// Runs the read loop, dispatching responses to waiting requests.
    ///
    /// Spawn this on a background task after [`Connection::connect`] returns.
    /// It runs until the connection closes or an I/O error occurs.
    pub async fn read_loop(&self) -> Result<(), ClientError> {
        let mut buf = vec![0u8; self.config.read_buffer_size];

        loop {
            let n = {
                let mut reader_guard = self.reader.lock().await;
                let reader = reader_guard.as_mut().ok_or(ClientError::NotConnected)?;
                reader.read(&mut buf).await?
            };

            if n == 0 {
                self.connected.store(false, Ordering::SeqCst);
                return Err(ClientError::ConnectionClosed);
            }

            let mut decoder = self.decoder.lock().await;
            decoder.extend(&buf[..n]);

            while let Some(response) = decoder.decode_response()? {
                let mut pending = self.pending.lock().await;
                if let Some(tx) = pending.remove(&response.id) {
                    // Receiver may have timed out and dropped the rx.
                    let _ = tx.send(response);
                } else {
                    tracing::warn!("response for unknown request id: {}", response.id);
                }
            }
        }
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection and drops all pending requests.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.shutdown().await.ok();
        }
        self.reader.lock().await.take();
        self.pending.lock().await.clear();

        Ok(())
    }

    /// Returns the number of requests awaiting responses.
    pub fn pending_count(&self) -> usize {
        self.pending.try_lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::new("127.0.0.1:7420".parse().unwrap());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert!(config.client_name.is_none());
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = ConnectionConfig::new("127.0.0.1:7420".parse().unwrap())
            .with_client_name("worker-1")
            .with_auth_token("secret")
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.client_name.as_deref(), Some("worker-1"));
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_buffer_clamping() {
        let config =
            ConnectionConfig::new("127.0.0.1:7420".parse().unwrap()).with_read_buffer_size(1);
        assert_eq!(config.read_buffer_size, MIN_READ_BUFFER_SIZE);

        let config = ConnectionConfig::new("127.0.0.1:7420".parse().unwrap())
            .with_read_buffer_size(usize::MAX);
        assert_eq!(config.read_buffer_size, MAX_READ_BUFFER_SIZE);
    }

    #[tokio::test]
    async fn test_request_before_connect_fails() {
        let conn = Connection::new(ConnectionConfig::new("127.0.0.1:7420".parse().unwrap()));
        let result = conn.request(Operation::Ping, serde_json::json!({})).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }
}
