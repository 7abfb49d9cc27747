//! Daemon module for the Pomodoro cycle.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with state transitions and countdown logic
//! - `ipc`: Unix socket server forwarding commands to the engine

pub mod ipc;
pub mod timer;

use std::future::Future;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::types::TimerConfig;

pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use timer::TimerEngine;

/// Runs the daemon until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound.
pub async fn run_daemon(socket_path: &Path, config: TimerConfig) -> Result<()> {
    let server = IpcServer::new(socket_path)?;
    let handler = RequestHandler::new(TimerEngine::new(config));

    info!(
        socket = %socket_path.display(),
        work_minutes = config.work_minutes,
        break_minutes = config.break_minutes,
        "Daemon listening"
    );

    serve(server, handler, shutdown_signal()).await;

    info!("Daemon stopped");
    Ok(())
}

/// Accepts connections until `shutdown` resolves.
///
/// Each connection is served on its own task so a `watch` client never
/// blocks commands.
pub async fn serve<F>(server: IpcServer, handler: RequestHandler, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.serve_connection(stream).await {
                            warn!(error = %e, "Connection failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Failed to accept connection"),
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }
}

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
