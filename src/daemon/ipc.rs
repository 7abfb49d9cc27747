//! IPC Server for the Pomodoro cycle daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer commands
//! - Snapshot streaming for `watch` connections

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::types::{IpcRequest, IpcResponse, TimerState};

use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
pub const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Socket binding error
    #[error("Failed to bind socket: {0}")]
    BindError(String),

    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Write error
    #[error("Failed to write response: {0}")]
    WriteError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// Peer closed the connection without sending a request
    #[error("Connection closed by client")]
    ConnectionClosed,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .map_err(|e| IpcError::BindError(e.to_string()))
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails, or the request
    /// exceeds [`MAX_REQUEST_SIZE`].
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE + 1];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            return Err(IpcError::ConnectionClosed.into());
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .map_err(|e| IpcError::SerializationError(e.to_string()))
            .context("Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Writes one snapshot as a JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer has gone away.
    pub async fn send_snapshot(stream: &mut UnixStream, state: &TimerState) -> Result<()> {
        let mut line = serde_json::to_vec(state).context("Failed to serialize snapshot")?;
        line.push(b'\n');

        stream
            .write_all(&line)
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        stream.flush().await.context("Failed to flush snapshot")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file on drop
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to a TimerEngine.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    engine: TimerEngine,
}

impl RequestHandler {
    /// Creates a new request handler for the given timer engine.
    pub fn new(engine: TimerEngine) -> Self {
        Self { engine }
    }

    /// Returns the engine driven by this handler.
    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    /// Handles a single-response request.
    ///
    /// `Watch` is answered with the current snapshot; streaming happens in
    /// [`RequestHandler::serve_connection`].
    pub fn handle(&self, request: IpcRequest) -> IpcResponse {
        debug!(command = request.name(), "Handling request");

        match request {
            IpcRequest::Start => {
                let state = self.engine.start();
                IpcResponse::success("Timer started", Some(state))
            }
            IpcRequest::Pause => {
                let state = self.engine.pause();
                IpcResponse::success("Timer paused", Some(state))
            }
            IpcRequest::Toggle => {
                let state = self.engine.toggle();
                let message = if state.is_running {
                    "Timer started"
                } else {
                    "Timer paused"
                };
                IpcResponse::success(message, Some(state))
            }
            IpcRequest::Reset => {
                let state = self.engine.reset();
                IpcResponse::success("Timer reset", Some(state))
            }
            IpcRequest::SetWork { minutes } => {
                let state = self.engine.set_work_minutes(minutes);
                IpcResponse::success(
                    format!("Work duration set to {} min", state.work_minutes()),
                    Some(state),
                )
            }
            IpcRequest::SetBreak { minutes } => {
                let state = self.engine.set_break_minutes(minutes);
                IpcResponse::success(
                    format!("Break duration set to {} min", state.break_minutes()),
                    Some(state),
                )
            }
            IpcRequest::Status | IpcRequest::Watch => {
                IpcResponse::success("", Some(self.engine.snapshot()))
            }
        }
    }

    /// Reads one request from the stream and answers it.
    ///
    /// Malformed requests get an error response. `Watch` keeps the
    /// connection open and writes snapshots until the peer disconnects or
    /// the engine is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be read or the response cannot
    /// be written.
    pub async fn serve_connection(&self, mut stream: UnixStream) -> Result<()> {
        let request = match IpcServer::receive_request(&mut stream).await {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejecting request");
                let response = IpcResponse::error(format!("{:#}", e));
                // The peer may already be gone; the read error is what matters.
                let _ = IpcServer::send_response(&mut stream, &response).await;
                return Err(e);
            }
        };

        if request == IpcRequest::Watch {
            return self.stream_snapshots(stream).await;
        }

        let response = self.handle(request);
        IpcServer::send_response(&mut stream, &response).await
    }

    async fn stream_snapshots(&self, mut stream: UnixStream) -> Result<()> {
        let mut rx = self.engine.subscribe();
        info!("Watcher connected");

        if IpcServer::send_snapshot(&mut stream, &self.engine.snapshot())
            .await
            .is_err()
        {
            info!("Watcher disconnected");
            return Ok(());
        }

        loop {
            let state = match rx.recv().await {
                Ok(state) => state,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Watcher lagging, resending current snapshot");
                    self.engine.snapshot()
                }
                Err(RecvError::Closed) => break,
            };

            if IpcServer::send_snapshot(&mut stream, &state).await.is_err() {
                info!("Watcher disconnected");
                break;
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
