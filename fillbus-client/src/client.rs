//! High-level client API.

use crate::connection::{ClientConfig, Connection};
use crate::error::ClientError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// High-level client for a fillbus server.
///
/// Wraps a [`Connection`] with typed views over the raw 4-byte payloads and
/// manages the optional heartbeat task.
pub struct Client {
    conn: Arc<Connection>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
            heartbeat: Mutex::new(None),
        }
    }

    /// Connects to the server and starts the heartbeat if enabled.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await?;
        if self.conn.config().heartbeat_enabled {
            self.start_heartbeat().await;
        }
        Ok(())
    }

    /// Disconnects, stopping the heartbeat first.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.heartbeat.lock().await.take() {
            handle.abort();
        }
        self.conn.close().await;
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    async fn start_heartbeat(&self) {
        let mut slot = self.heartbeat.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let conn = self.conn.clone();
        let period = self.conn.config().heartbeat_interval;
        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !conn.is_connected() {
                    break;
                }
                match conn.noop().await {
                    Ok(()) => tracing::trace!("heartbeat acknowledged"),
                    Err(e) => {
                        tracing::warn!("heartbeat failed: {}", e);
                        conn.close().await;
                        break;
                    }
                }
            }
        }));
    }

    // =========================================================================
    // Protocol operations
    // =========================================================================

    /// Sends a NoOp and waits for the Alive acknowledgment.
    pub async fn noop(&self) -> Result<(), ClientError> {
        self.conn.noop().await
    }

    /// Reads a numeric tag as its raw 4-byte little-endian payload.
    pub async fn read_value(&self, tag_id: u16) -> Result<[u8; 4], ClientError> {
        self.conn.read_value(tag_id).await
    }

    /// Reads a numeric tag as an i32.
    pub async fn read_integer(&self, tag_id: u16) -> Result<i32, ClientError> {
        Ok(i32::from_le_bytes(self.conn.read_value(tag_id).await?))
    }

    /// Reads a numeric tag as a u32.
    pub async fn read_unsigned(&self, tag_id: u16) -> Result<u32, ClientError> {
        Ok(u32::from_le_bytes(self.conn.read_value(tag_id).await?))
    }

    /// Reads a numeric tag as an f32.
    pub async fn read_float(&self, tag_id: u16) -> Result<f32, ClientError> {
        Ok(f32::from_le_bytes(self.conn.read_value(tag_id).await?))
    }

    /// Writes a numeric tag from its raw 4-byte little-endian payload.
    pub async fn write_value(&self, tag_id: u16, payload: [u8; 4]) -> Result<(), ClientError> {
        self.conn.write_value(tag_id, payload).await
    }

    /// Writes an i32 to a numeric tag.
    pub async fn write_integer(&self, tag_id: u16, value: i32) -> Result<(), ClientError> {
        self.conn.write_value(tag_id, value.to_le_bytes()).await
    }

    /// Writes a u32 to a numeric tag.
    pub async fn write_unsigned(&self, tag_id: u16, value: u32) -> Result<(), ClientError> {
        self.conn.write_value(tag_id, value.to_le_bytes()).await
    }

    /// Writes an f32 to a numeric tag.
    pub async fn write_float(&self, tag_id: u16, value: f32) -> Result<(), ClientError> {
        self.conn.write_value(tag_id, value.to_le_bytes()).await
    }

    /// Reads a string tag.
    pub async fn read_string(&self, tag_id: u16) -> Result<String, ClientError> {
        self.conn.read_string(tag_id).await
    }

    /// Writes a string tag.
    pub async fn write_string(&self, tag_id: u16, value: &str) -> Result<(), ClientError> {
        self.conn.write_string(tag_id, value).await
    }
}
