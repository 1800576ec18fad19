//! Connection management and the client half of each command.
//!
//! The protocol is strictly sequential on one connection: a single request
//! is in flight at a time and an exchange owns the socket from its first
//! byte to its last. The socket therefore lives under one async mutex that
//! each operation (and the heartbeat) holds for its full exchange.

use crate::error::ClientError;
use fillbus_protocol::{
    codec, frame::FRAME_SIZE, text, Command, RequestFrame, ResponseFrame, Status, DEFAULT_PORT,
    ZERO_PAYLOAD,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default connect and per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default period between heartbeat NoOps.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(20000);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Peer hostname or address.
    pub host: String,
    /// Peer TCP port.
    pub port: u16,
    /// Connect and per-operation timeout.
    pub timeout: Duration,
    /// Run a periodic NoOp while connected.
    pub heartbeat_enabled: bool,
    /// Period between heartbeat NoOps.
    pub heartbeat_interval: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            heartbeat_enabled: true,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_heartbeat(mut self, enabled: bool) -> Self {
        self.heartbeat_enabled = enabled;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// A connection to a fillbus server.
pub struct Connection {
    config: ClientConfig,
    /// The socket; `None` while disconnected.
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects to the server, replacing any existing socket.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("connecting to {}:{}", self.config.host, self.config.port);

        let addr = (self.config.host.as_str(), self.config.port);
        let stream = tokio::time::timeout(self.config.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(ClientError::Io)?;
        stream.set_nodelay(true).ok();

        *self.stream.lock().await = Some(stream);
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!("connected");
        Ok(())
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection. Closing a disconnected connection is a no-op.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut stream) = self.stream.lock().await.take() {
            let _ = stream.shutdown().await;
            tracing::debug!("connection closed");
        }
    }

    /// Drops the socket after an error that left the stream alignment
    /// unknown.
    fn abandon(&self, slot: &mut Option<TcpStream>) {
        *slot = None;
        self.connected.store(false, Ordering::SeqCst);
        tracing::debug!("connection abandoned after stream desync");
    }

    /// Runs one single-frame request/response exchange.
    async fn request(&self, frame: RequestFrame) -> Result<ResponseFrame, ClientError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;
        let result = single_exchange(stream, self.config.timeout, frame).await;
        if let Err(ref e) = result {
            if e.desyncs_stream() {
                self.abandon(&mut guard);
            }
        }
        result
    }

    /// Sends a NoOp and validates the Alive acknowledgment.
    pub async fn noop(&self) -> Result<(), ClientError> {
        let response = self
            .request(RequestFrame::new(Command::NoOp, 0, ZERO_PAYLOAD))
            .await?;
        if response.status != Status::Alive
            || response.tag_id != 0
            || response.payload != ZERO_PAYLOAD
        {
            return Err(ClientError::InvalidNoOpResponse);
        }
        Ok(())
    }

    /// Reads a numeric tag and returns its raw 4-byte payload.
    pub async fn read_value(&self, tag_id: u16) -> Result<[u8; 4], ClientError> {
        let response = self
            .request(RequestFrame::new(Command::ReadSingleValue, tag_id, ZERO_PAYLOAD))
            .await?;
        if response.status != Status::Successful {
            return Err(ClientError::Rejected(response.status));
        }
        if response.tag_id != tag_id {
            return Err(ClientError::TagIdMismatch {
                expected: tag_id,
                actual: response.tag_id,
            });
        }
        Ok(response.payload)
    }

    /// Writes a numeric tag from its raw 4-byte payload.
    pub async fn write_value(&self, tag_id: u16, payload: [u8; 4]) -> Result<(), ClientError> {
        let response = self
            .request(RequestFrame::new(Command::WriteSingleValue, tag_id, payload))
            .await?;
        validate_write_response(tag_id, &response)
    }

    /// Reads a string tag (multi-frame response).
    pub async fn read_string(&self, tag_id: u16) -> Result<String, ClientError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;
        let result = read_string_exchange(stream, self.config.timeout, tag_id).await;
        match result {
            Ok(utf16) => {
                drop(guard);
                // The announced number of frames was fully consumed, so a
                // transcoding failure leaves the stream aligned.
                Ok(text::utf16le_to_utf8(&utf16)?)
            }
            Err(e) => {
                // A header echoing the wrong tag id also poisons the body
                // length, so it closes like a transport error.
                if e.desyncs_stream() || matches!(e, ClientError::TagIdMismatch { .. }) {
                    self.abandon(&mut guard);
                }
                Err(e)
            }
        }
    }

    /// Writes a string tag (multi-frame request).
    pub async fn write_string(&self, tag_id: u16, value: &str) -> Result<(), ClientError> {
        let utf16 = text::utf8_to_utf16le(value);
        let chars = (utf16.len() / 2) as u32;
        // Refuse locally before touching the wire; the connection stays up.
        codec::string_byte_len(chars)?;
        let body = codec::string_body(&utf16);

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;
        let header = RequestFrame::new(Command::WriteString, tag_id, chars.to_le_bytes());
        let result = write_string_exchange(stream, self.config.timeout, header, &body).await;
        if let Err(ref e) = result {
            if e.desyncs_stream() {
                self.abandon(&mut guard);
            }
        }
        drop(guard);
        validate_write_response(tag_id, &result?)
    }
}

/// Validates the single response frame of a write exchange.
fn validate_write_response(
    tag_id: u16,
    response: &ResponseFrame,
) -> Result<(), ClientError> {
    if response.status != Status::Successful {
        return Err(ClientError::Rejected(response.status));
    }
    if response.tag_id != tag_id {
        return Err(ClientError::TagIdMismatch {
            expected: tag_id,
            actual: response.tag_id,
        });
    }
    if response.payload != ZERO_PAYLOAD {
        return Err(ClientError::InvalidWriteResponse);
    }
    Ok(())
}

async fn send_bytes(
    stream: &mut TcpStream,
    bytes: &[u8],
    timeout: Duration,
) -> Result<(), ClientError> {
    match tokio::time::timeout(timeout, stream.write_all(bytes)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ClientError::Io(e)),
        Err(_) => Err(ClientError::Timeout),
    }
}

async fn recv_exact(
    stream: &mut TcpStream,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<(), ClientError> {
    match tokio::time::timeout(timeout, stream.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ClientError::PeerClosed),
        Ok(Err(e)) => Err(ClientError::Io(e)),
        Err(_) => Err(ClientError::Timeout),
    }
}

async fn recv_response(
    stream: &mut TcpStream,
    timeout: Duration,
) -> Result<ResponseFrame, ClientError> {
    let mut buf = [0u8; FRAME_SIZE];
    recv_exact(stream, &mut buf, timeout).await?;
    Ok(ResponseFrame::decode(&buf)?)
}

async fn single_exchange(
    stream: &mut TcpStream,
    timeout: Duration,
    request: RequestFrame,
) -> Result<ResponseFrame, ClientError> {
    send_bytes(stream, &request.encode(), timeout).await?;
    recv_response(stream, timeout).await
}

/// Sends a ReadString request and returns the exact UTF-16LE body bytes.
async fn read_string_exchange(
    stream: &mut TcpStream,
    timeout: Duration,
    tag_id: u16,
) -> Result<Vec<u8>, ClientError> {
    let request = RequestFrame::new(Command::ReadString, tag_id, ZERO_PAYLOAD);
    send_bytes(stream, &request.encode(), timeout).await?;

    let header = recv_response(stream, timeout).await?;
    if header.status != Status::Successful {
        return Err(ClientError::Rejected(header.status));
    }
    if header.tag_id != tag_id {
        return Err(ClientError::TagIdMismatch {
            expected: tag_id,
            actual: header.tag_id,
        });
    }

    let chars = u32::from_le_bytes(header.payload);
    let byte_len = codec::string_byte_len(chars)?;
    let mut body = vec![0u8; codec::frames_needed(byte_len) * FRAME_SIZE];
    if !body.is_empty() {
        recv_exact(stream, &mut body, timeout).await?;
    }
    body.truncate(byte_len);
    Ok(body)
}

/// Sends a WriteString header plus padded body and returns the response.
async fn write_string_exchange(
    stream: &mut TcpStream,
    timeout: Duration,
    header: RequestFrame,
    body: &[u8],
) -> Result<ResponseFrame, ClientError> {
    send_bytes(stream, &header.encode(), timeout).await?;
    if !body.is_empty() {
        send_bytes(stream, body, timeout).await?;
    }
    recv_response(stream, timeout).await
}
