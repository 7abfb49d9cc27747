//! Integration tests for Daemon-CLI IPC communication.
//!
//! These tests run the daemon's accept loop on a temporary socket and talk
//! to it through the CLI client:
//! - Commands via IPC
//! - Duration changes and clamping via IPC
//! - Status queries
//! - Connection and protocol errors

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use pomocycle::cli::IpcClient;
use pomocycle::daemon::{serve, IpcServer, RequestHandler, TimerEngine};
use pomocycle::types::{IpcResponse, TimerConfig, TimerMode};

// ============================================================================
// Test Helpers
// ============================================================================

/// Creates a temporary socket path for testing.
fn create_temp_socket_path() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("integration_test.sock");
    // Keep the directory so it's not deleted
    std::mem::forget(dir);
    path
}

/// A daemon accept loop running on a temporary socket.
struct TestDaemon {
    socket_path: PathBuf,
    engine: TimerEngine,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestDaemon {
    fn start(config: TimerConfig) -> Self {
        let socket_path = create_temp_socket_path();
        let server = IpcServer::new(&socket_path).unwrap();
        let engine = TimerEngine::new(config);
        let handler = RequestHandler::new(engine.clone());

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(serve(server, handler, async {
            let _ = rx.await;
        }));

        Self {
            socket_path,
            engine,
            shutdown: Some(tx),
            task,
        }
    }

    fn client(&self) -> IpcClient {
        IpcClient::with_socket_path(self.socket_path.clone())
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), &mut self.task)
            .await
            .expect("accept loop did not stop")
            .unwrap();
    }
}

// ============================================================================
// Commands via IPC
// ============================================================================

#[tokio::test]
async fn test_start_via_ipc() {
    let daemon = TestDaemon::start(TimerConfig::default());

    let response = daemon.client().start().await.unwrap();

    assert_eq!(response.status, "success");
    assert_eq!(response.message, "Timer started");
    let state = response.data.unwrap();
    assert_eq!(state.mode, TimerMode::Work);
    assert!(state.is_running);
    assert_eq!(state.remaining_seconds, 1500);
    assert!(daemon.engine.snapshot().is_running);

    daemon.stop().await;
}

#[tokio::test]
async fn test_start_uses_daemon_configuration() {
    let daemon = TestDaemon::start(TimerConfig::default().with_work_minutes(50));

    let state = daemon.client().start().await.unwrap().data.unwrap();

    assert_eq!(state.remaining_seconds, 3000);
    assert_eq!(state.work_minutes(), 50);

    daemon.stop().await;
}

#[tokio::test]
async fn test_pause_via_ipc() {
    let daemon = TestDaemon::start(TimerConfig::default());
    let client = daemon.client();

    client.start().await.unwrap();
    let response = client.pause().await.unwrap();

    assert_eq!(response.message, "Timer paused");
    let state = response.data.unwrap();
    assert_eq!(state.mode, TimerMode::Work);
    assert!(!state.is_running);

    daemon.stop().await;
}

#[tokio::test]
async fn test_pause_when_idle_is_not_an_error() {
    let daemon = TestDaemon::start(TimerConfig::default());

    let state = daemon.client().pause().await.unwrap().data.unwrap();

    assert_eq!(state.mode, TimerMode::Idle);
    assert!(!state.is_running);

    daemon.stop().await;
}

#[tokio::test]
async fn test_toggle_via_ipc() {
    let daemon = TestDaemon::start(TimerConfig::default());
    let client = daemon.client();

    let response = client.toggle().await.unwrap();
    assert_eq!(response.message, "Timer started");
    assert!(response.data.unwrap().is_running);

    let response = client.toggle().await.unwrap();
    assert_eq!(response.message, "Timer paused");
    assert!(!response.data.unwrap().is_running);

    daemon.stop().await;
}

#[tokio::test]
async fn test_reset_via_ipc() {
    let daemon = TestDaemon::start(TimerConfig::default());
    let client = daemon.client();

    client.start().await.unwrap();
    let response = client.reset().await.unwrap();

    assert_eq!(response.message, "Timer reset");
    let state = response.data.unwrap();
    assert_eq!(state.mode, TimerMode::Idle);
    assert!(!state.is_running);
    assert_eq!(state.remaining_seconds, 1500);

    daemon.stop().await;
}

// ============================================================================
// Duration Changes via IPC
// ============================================================================

#[tokio::test]
async fn test_set_work_while_idle_updates_remaining() {
    let daemon = TestDaemon::start(TimerConfig::default());

    let response = daemon.client().set_work(40).await.unwrap();

    assert_eq!(response.message, "Work duration set to 40 min");
    let state = response.data.unwrap();
    assert_eq!(state.work_duration_seconds, 2400);
    assert_eq!(state.remaining_seconds, 2400);

    daemon.stop().await;
}

#[tokio::test]
async fn test_set_work_is_clamped() {
    let daemon = TestDaemon::start(TimerConfig::default());
    let client = daemon.client();

    let response = client.set_work(999).await.unwrap();
    assert_eq!(response.message, "Work duration set to 180 min");
    assert_eq!(response.data.unwrap().work_duration_seconds, 10800);

    let response = client.set_work(-3).await.unwrap();
    assert_eq!(response.message, "Work duration set to 1 min");
    assert_eq!(response.data.unwrap().remaining_seconds, 60);

    daemon.stop().await;
}

#[tokio::test]
async fn test_set_work_while_running_keeps_countdown() {
    let daemon = TestDaemon::start(TimerConfig::default());
    let client = daemon.client();

    client.start().await.unwrap();
    let state = client.set_work(10).await.unwrap().data.unwrap();

    assert_eq!(state.work_duration_seconds, 600);
    assert!(state.remaining_seconds > 600);
    assert!(state.is_running);

    daemon.stop().await;
}

#[tokio::test]
async fn test_set_break_is_clamped() {
    let daemon = TestDaemon::start(TimerConfig::default());

    let response = daemon.client().set_break(90).await.unwrap();

    assert_eq!(response.message, "Break duration set to 60 min");
    let state = response.data.unwrap();
    assert_eq!(state.break_duration_seconds, 3600);
    assert_eq!(state.remaining_seconds, 1500);

    daemon.stop().await;
}

// ============================================================================
// Status Query
// ============================================================================

#[tokio::test]
async fn test_status_reports_current_state() {
    let daemon = TestDaemon::start(TimerConfig::default());
    let client = daemon.client();

    let state = client.status().await.unwrap().data.unwrap();
    assert_eq!(state, daemon.engine.snapshot());
    assert_eq!(state.mode, TimerMode::Idle);

    client.set_break(15).await.unwrap();
    let state = client.status().await.unwrap().data.unwrap();
    assert_eq!(state.break_minutes(), 15);

    daemon.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients_share_one_engine() {
    let daemon = TestDaemon::start(TimerConfig::default());

    let mut tasks = Vec::new();
    for minutes in [10, 20, 30, 40] {
        let client = daemon.client();
        tasks.push(tokio::spawn(async move { client.set_work(minutes).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let state = daemon.client().status().await.unwrap().data.unwrap();
    assert!([600, 1200, 1800, 2400].contains(&state.work_duration_seconds));
    assert_eq!(state.remaining_seconds, state.work_duration_seconds);

    daemon.stop().await;
}

// ============================================================================
// Error Handling
// ============================================================================

#[tokio::test]
async fn test_connection_error_when_daemon_missing() {
    let client = IpcClient::with_socket_path(create_temp_socket_path());

    let error = client.status().await.unwrap_err();

    assert!(error.to_string().contains("Cannot reach the daemon"));
}

#[tokio::test]
async fn test_malformed_request_gets_error_response() {
    let daemon = TestDaemon::start(TimerConfig::default());

    let mut stream = UnixStream::connect(&daemon.socket_path).await.unwrap();
    stream.write_all(br#"{"command":"snooze"}"#).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut buffer = Vec::new();
    stream.read_to_end(&mut buffer).await.unwrap();
    let response: IpcResponse = serde_json::from_slice(&buffer).unwrap();

    assert!(response.is_error());
    assert!(response.data.is_none());

    // The daemon keeps serving after a bad request.
    assert!(daemon.client().status().await.is_ok());

    daemon.stop().await;
}

#[tokio::test]
async fn test_shutdown_removes_socket_file() {
    let daemon = TestDaemon::start(TimerConfig::default());
    let socket_path = daemon.socket_path.clone();
    assert!(socket_path.exists());

    daemon.stop().await;

    assert!(!socket_path.exists());
}
