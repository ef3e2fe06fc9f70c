//! Tool server client.
//!
//! One [`Client`] owns one connection. Every request gets a fresh UUID v4
//! correlation id and a pending slot; a background reader resolves slots by
//! correlation id as responses arrive, in whatever order the server sends
//! them. Any number of requests may be outstanding at once.
//!
//! When the connection ends, every pending request fails with
//! [`ClientError::ConnectionClosed`]. Nothing is retried.

mod error;

pub use error::ClientError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domains::protocol::codec::{self, DEFAULT_MAX_FRAME_BYTES, MessageFramed};
use crate::domains::protocol::message::{LIST_TOOL, TOOL_CALL};
use crate::domains::protocol::{ErrorCode, Message, ToolCallResult, ToolList};
use crate::domains::tools::ToolDefinition;

/// Client connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Limit for establishing the TCP connection.
    pub connect_timeout: Duration,

    /// Limit for each request. `None` waits until the response or the end of
    /// the connection.
    pub request_timeout: Option<Duration>,

    /// Longest accepted response frame, in bytes.
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Outstanding requests of one connection.
#[derive(Default)]
struct Pending {
    slots: HashMap<String, oneshot::Sender<Message>>,
    closed: bool,
}

/// Never held across an await.
type PendingRequests = Arc<StdMutex<Pending>>;

fn lock(pending: &PendingRequests) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a request's slot when the request ends, however it ends.
struct SlotGuard<'a> {
    pending: &'a PendingRequests,
    correlation_id: &'a str,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).slots.remove(self.correlation_id);
    }
}

/// A connection to a tool server.
pub struct Client {
    sink: Mutex<SplitSink<MessageFramed, String>>,
    pending: PendingRequests,
    reader: JoinHandle<()>,
    request_timeout: Option<Duration>,
}

impl Client {
    /// Connect with default settings.
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        Self::connect_with(address, ClientConfig::default()).await
    }

    /// Connect with explicit settings.
    #[instrument(skip(config))]
    pub async fn connect_with(address: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| ClientError::ConnectionFailed {
                address: address.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no connection after {:?}", config.connect_timeout),
                ),
            })?
            .map_err(|source| ClientError::ConnectionFailed {
                address: address.to_string(),
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let (sink, frames) = codec::framed(stream, config.max_frame_bytes).split();
        let pending = PendingRequests::default();
        let reader = tokio::spawn(read_loop(frames, pending.clone()));
        debug!("Connected to {}", address);

        Ok(Self {
            sink: Mutex::new(sink),
            pending,
            reader,
            request_timeout: config.request_timeout,
        })
    }

    /// Call a tool and return its result.
    ///
    /// `args` must be a JSON object (or `null` for no arguments). Error
    /// responses come back as [`ClientError::Remote`].
    pub async fn call(&self, tool: &str, args: Value) -> Result<Value, ClientError> {
        let args = match args {
            Value::Object(args) => args,
            Value::Null => Map::new(),
            other => {
                return Err(ClientError::protocol(format!(
                    "tool arguments must be a JSON object, got {}",
                    other
                )));
            }
        };

        let response = self
            .request(TOOL_CALL, json!({ "tool": tool, "args": args }))
            .await?;
        let body: ToolCallResult = into_body(response)?;
        Ok(body.result)
    }

    /// Fetch the server's tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ClientError> {
        let response = self
            .request(LIST_TOOL, json!({ "request_type": LIST_TOOL }))
            .await?;
        let body: ToolList = into_body(response)?;
        Ok(body.tools)
    }

    /// Send a raw request body and wait for the matching response.
    ///
    /// Error responses are returned as messages, not as `Err`.
    #[instrument(skip(self, body))]
    pub async fn request(&self, kind: &str, body: Value) -> Result<Message, ClientError> {
        let correlation_id = Uuid::new_v4().to_string();
        let frame = codec::encode(&Message::request(&correlation_id, kind, body))?;

        let rx = self.register(&correlation_id)?;
        let _slot = SlotGuard {
            pending: &self.pending,
            correlation_id: &correlation_id,
        };

        if let Err(e) = self.sink.lock().await.send(frame).await {
            debug!("Send failed: {}", e);
            return Err(ClientError::ConnectionClosed);
        }

        let response = match self.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(response) => response,
                Err(_) => return Err(ClientError::Timeout(limit)),
            },
            None => rx.await,
        };

        response.map_err(|_| ClientError::ConnectionClosed)
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        lock(&self.pending).slots.len()
    }

    /// Whether the connection has ended.
    pub async fn is_closed(&self) -> bool {
        lock(&self.pending).closed
    }

    /// Close the connection. Pending requests fail with `ConnectionClosed`.
    pub async fn close(self) {
        if let Err(e) = self.sink.lock().await.close().await {
            debug!("Error closing connection: {}", e);
        }
        fail_pending(&self.pending);
    }

    fn register(&self, correlation_id: &str) -> Result<oneshot::Receiver<Message>, ClientError> {
        let mut pending = lock(&self.pending);
        if pending.closed {
            return Err(ClientError::ConnectionClosed);
        }
        let (tx, rx) = oneshot::channel();
        pending.slots.insert(correlation_id.to_string(), tx);
        Ok(rx)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Unwrap a success body, or turn an error response into `Remote`.
fn into_body<T: DeserializeOwned>(response: Message) -> Result<T, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::Remote {
            code: error.code,
            message: error.message,
        });
    }
    let body = response
        .body
        .ok_or_else(|| ClientError::protocol("success response without a body"))?;
    Ok(serde_json::from_value(body)?)
}

/// Mark the connection closed and drop every pending slot.
fn fail_pending(pending: &PendingRequests) {
    let mut pending = lock(pending);
    pending.closed = true;
    if !pending.slots.is_empty() {
        debug!("Failing {} pending requests", pending.slots.len());
    }
    // Dropping the senders resolves each waiting receiver with an error.
    pending.slots.clear();
}

/// Route responses to their pending slots until the connection ends.
async fn read_loop(mut frames: SplitStream<MessageFramed>, pending: PendingRequests) {
    while let Some(frame) = frames.next().await {
        let line = match frame {
            Ok(line) => line,
            Err(e) => {
                warn!("Connection failed: {}", codec::describe_frame_error(&e));
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: Message = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring undecodable frame: {}", e);
                continue;
            }
        };

        let slot = lock(&pending).slots.remove(message.correlation_id());
        match slot {
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => match &message.error {
                Some(error) if error.code == ErrorCode::ConnectionError => {
                    warn!("Server reported a connection error: {}", error.message);
                }
                _ => debug!(
                    "Dropping response for unknown correlation id {}",
                    message.correlation_id()
                ),
            },
        }
    }

    fail_pending(&pending);
    debug!("Client reader ended");
}
