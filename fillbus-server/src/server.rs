//! TCP server implementation.
//!
//! One accept loop feeds one task per client; within a task the protocol is
//! strictly sequential, so the request loop reads a frame, dispatches it,
//! writes the reply, and repeats until the peer closes or the server shuts
//! down.

use crate::error::ServerError;
use crate::handler::CommandHandler;
use fillbus_protocol::{
    codec, frame::FRAME_SIZE, Command, ProtocolError, RequestFrame, ResponseFrame, Status,
    ZERO_PAYLOAD,
};
use fillbus_registry::{RegistryError, Tag, TagRegistry, TagStore, TagValue};
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::broadcast;

/// Delay before rebinding a failed listener.
const REBIND_DELAY: Duration = Duration::from_millis(500);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: (std::net::Ipv4Addr::UNSPECIFIED, fillbus_protocol::DEFAULT_PORT).into(),
            max_connections: 128,
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

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server exposing a tag registry to fillbus clients.
pub struct Server {
    config: ServerConfig,
    registry: Arc<TagRegistry>,
    handler: Arc<CommandHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
    /// Bound listener, consumed by `run`.
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the listener (with address reuse) and prepares the server.
    pub fn bind(config: ServerConfig, registry: Arc<TagRegistry>) -> Result<Self, ServerError> {
        let listener = Self::bind_listener(config.bind_addr)?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            handler: Arc::new(CommandHandler::new(registry.clone())),
            config,
            registry,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
            listener: Mutex::new(Some(listener)),
            local_addr,
        })
    }

    fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ServerError> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(1024)?)
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the server until shutdown.
    ///
    /// The accept loop is supervised: if it fails, the listener is rebound
    /// after a short delay and accepting resumes.
    pub async fn run(&self) -> Result<(), ServerError> {
        let mut listener = self
            .listener
            .lock()
            .take()
            .ok_or(ServerError::AlreadyRunning)?;
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("server listening on {}", self.local_addr);

        let mut shutdown_rx = self.shutdown.subscribe();
        let result = loop {
            let outcome = self.accept_loop(&listener, &mut shutdown_rx).await;
            match outcome {
                Ok(()) => break Ok(()),
                Err(e) => {
                    tracing::error!("acceptor failed: {}; restarting listener", e);
                    self.stats.errors_total.fetch_add(1, Ordering::Relaxed);
                    drop(listener);
                    tokio::time::sleep(REBIND_DELAY).await;
                    listener = match Self::bind_listener(self.config.bind_addr) {
                        Ok(listener) => listener,
                        Err(e) => break Err(e),
                    };
                    tracing::info!("listener rebound on {}", self.config.bind_addr);
                }
            }
        };

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("server stopped");
        result
    }

    /// Accepts connections until shutdown; returns `Err` on acceptor failure.
    async fn accept_loop(
        &self,
        listener: &TcpListener,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, addr) = result?;

                    if self.stats.connections_active.load(Ordering::Relaxed)
                        >= self.config.max_connections as u64
                    {
                        tracing::warn!("connection limit reached, dropping {}", addr);
                        drop(stream);
                        continue;
                    }

                    self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                    self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                    let handler = self.handler.clone();
                    let stats = self.stats.clone();
                    let mut conn_shutdown = self.shutdown.subscribe();

                    tokio::spawn(async move {
                        stream.set_nodelay(true).ok();
                        tracing::info!("client connected: {}", addr);

                        let result =
                            handle_connection(stream, addr, handler, &stats, &mut conn_shutdown)
                                .await;
                        if let Err(e) = result {
                            tracing::debug!("[{}] connection error: {}", addr, e);
                            stats.errors_total.fetch_add(1, Ordering::Relaxed);
                        }

                        stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                        tracing::info!("client disconnected: {}", addr);
                    });
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("server shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Initiates shutdown: the listener stops accepting and every
    /// per-connection task returns, closing its socket.
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

    // =========================================================================
    // Administrative API
    // =========================================================================

    /// Adds a tag; an existing tag with the same id is replaced.
    pub fn add_tag(&self, tag: Tag) {
        self.registry.insert(tag);
    }

    /// Returns the tag with the given id.
    pub fn tag(&self, id: u16) -> Result<Tag, RegistryError> {
        self.registry.get(id).ok_or(RegistryError::NotFound(id))
    }

    /// Replaces the value of an existing tag; the value type must match.
    pub fn update_tag(&self, id: u16, value: TagValue) -> Result<(), RegistryError> {
        self.registry.update_value(id, value)
    }

    /// Removes a tag. Removing an absent id is a no-op.
    pub fn remove_tag(&self, id: u16) {
        self.registry.remove(id);
    }

    /// Returns all tags, ordered by id.
    pub fn list_tags(&self) -> Vec<Tag> {
        self.registry.list()
    }

    /// Returns the number of currently connected clients.
    pub fn client_count(&self) -> usize {
        self.stats.connections_active.load(Ordering::Relaxed) as usize
    }
}

/// Handles one client connection: read a frame, dispatch, reply, repeat.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    handler: Arc<CommandHandler>,
    stats: &ServerStats,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let mut frame_buf = [0u8; FRAME_SIZE];

    loop {
        tokio::select! {
            result = stream.read_exact(&mut frame_buf) => {
                match result {
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        tracing::debug!("[{}] connection closed by client", addr);
                        return Ok(());
                    }
                    Err(e) => return Err(ServerError::Io(e)),
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("[{}] shutdown signal received", addr);
                return Ok(());
            }
        }

        stats.requests_total.fetch_add(1, Ordering::Relaxed);

        let reply = match RequestFrame::decode(&frame_buf) {
            Ok(request) => {
                tracing::debug!("[{}] request: {} tag {}", addr, request.command, request.tag_id);
                if request.command == Command::WriteString {
                    match read_string_body(&mut stream, addr, request).await? {
                        Some(body) => handler.dispatch(request, Some(body)),
                        // Oversized announcement: the error reply is already
                        // written and the stream alignment is unknown.
                        None => return Ok(()),
                    }
                } else {
                    handler.dispatch(request, None)
                }
            }
            Err(ProtocolError::UnknownCommand(id)) => {
                tracing::warn!("[{}] unknown command id {:#06x}", addr, id);
                crate::handler::Reply {
                    frame: ResponseFrame::new(Status::UnknownCommand, 0, ZERO_PAYLOAD),
                    body: None,
                }
            }
            Err(e) => return Err(ServerError::Protocol(e)),
        };

        tracing::debug!("[{}] reply: {}", addr, reply.frame.status);
        stream.write_all(&reply.frame.encode()).await?;
        if let Some(body) = reply.body {
            stream.write_all(&body).await?;
        }
    }
}

/// Consumes the body frames announced by a WriteString header.
///
/// The body is read before any validation so error replies leave the stream
/// frame-aligned. Returns `None` after answering an announcement beyond the
/// string length limit; the caller must then drop the connection.
async fn read_string_body(
    stream: &mut TcpStream,
    addr: SocketAddr,
    request: RequestFrame,
) -> Result<Option<Vec<u8>>, ServerError> {
    let chars = u32::from_le_bytes(request.payload);
    let byte_len = match codec::string_byte_len(chars) {
        Ok(len) => len,
        Err(e) => {
            tracing::warn!("[{}] {}", addr, e);
            let frame =
                ResponseFrame::new(Status::ImplausibleArgument, request.tag_id, ZERO_PAYLOAD);
            stream.write_all(&frame.encode()).await?;
            return Ok(None);
        }
    };

    let mut body = vec![0u8; codec::frames_needed(byte_len) * FRAME_SIZE];
    if !body.is_empty() {
        stream.read_exact(&mut body).await?;
    }
    Ok(Some(body))
}
