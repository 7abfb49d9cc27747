//! IPC Client for communicating with the Pomodoro cycle daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling
//! - Snapshot streaming for `watch`

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{IpcRequest, IpcResponse, TimerState};

// ============================================================================
// Constants
// ============================================================================

/// Default socket path, relative to the home directory
const DEFAULT_SOCKET_PATH: &str = ".pomocycle/pomocycle.sock";

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: usize = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

/// Returns the default daemon socket path under the home directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_socket_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine the home directory")?;
    Ok(home.join(DEFAULT_SOCKET_PATH))
}

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client with the default socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_socket_path(default_socket_path()?))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends a start command to the daemon.
    pub async fn start(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start).await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause).await
    }

    /// Sends a toggle command to the daemon.
    pub async fn toggle(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Toggle).await
    }

    /// Sends a reset command to the daemon.
    pub async fn reset(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Reset).await
    }

    /// Sends a work duration change to the daemon.
    pub async fn set_work(&self, minutes: i64) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::SetWork { minutes })
            .await
    }

    /// Sends a break duration change to the daemon.
    pub async fn set_break(&self, minutes: i64) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::SetBreak { minutes })
            .await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Follows the daemon's snapshots, calling `on_snapshot` for each one.
    ///
    /// Returns when the daemon closes the stream.
    pub async fn watch<F>(&self, mut on_snapshot: F) -> Result<()>
    where
        F: FnMut(&TimerState),
    {
        let mut stream = self.connect().await?;
        self.write_request(&mut stream, &IpcRequest::Watch).await?;

        let mut lines = BufReader::new(stream).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read snapshot")?
        {
            let state: TimerState =
                serde_json::from_str(&line).context("Failed to parse snapshot")?;
            on_snapshot(&state);
        }

        tracing::info!("Daemon closed the watch stream");
        Ok(())
    }

    /// Sends a request to the daemon with retry logic.
    ///
    /// Transport failures are retried. A request that is not idempotent is
    /// only retried while connecting, never once it has been written. An
    /// error response from the daemon is returned as an error right away.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let response = if request.is_idempotent() {
            self.retry(|| self.send_request(request)).await?
        } else {
            let stream = self.retry(|| self.connect()).await?;
            self.exchange(stream, request).await?
        };

        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }

        Ok(response)
    }

    /// Runs `operation` up to [`MAX_RETRIES`] times with linear backoff.
    async fn retry<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!("Request failed (attempt {}/{}): {}", attempt, MAX_RETRIES, e);
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let stream = self.connect().await?;
        self.exchange(stream, request).await
    }

    /// Writes the request and reads the daemon's response.
    async fn exchange(&self, mut stream: UnixStream, request: &IpcRequest) -> Result<IpcResponse> {
        self.write_request(&mut stream, request).await?;

        // Read response with timeout
        let mut buffer = Vec::new();
        let n = timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream)
                .take(MAX_RESPONSE_SIZE as u64)
                .read_to_end(&mut buffer),
        )
        .await
        .context("Read timed out")?
        .context("Failed to receive response")?;

        if n == 0 {
            anyhow::bail!("The daemon sent no response");
        }

        serde_json::from_slice(&buffer[..n]).context("Failed to parse response")
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .with_context(|| {
                format!(
                    "Cannot reach the daemon at {:?}. Start it with 'pomocycle daemon'",
                    self.socket_path
                )
            })
    }

    /// Writes the request and closes the write half to mark its end.
    async fn write_request(&self, stream: &mut UnixStream, request: &IpcRequest) -> Result<()> {
        let request_json =
            serde_json::to_string(request).context("Failed to serialize request")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("Write timed out")?
        .context("Failed to send request")?;

        stream.shutdown().await.context("Failed to shut down write half")?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
