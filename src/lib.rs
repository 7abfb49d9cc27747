//! Pomodoro Cycle Library
//!
//! This library provides a work/break countdown engine and the plumbing
//! to drive it from a terminal:
//! - Countdown state machine alternating work and break intervals
//! - Timer engine with a cancelable one-second ticker and snapshot stream
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities

pub mod cli;
pub mod daemon;
pub mod types;

// Re-export commonly used types for convenience
pub use daemon::{run_daemon, IpcError, IpcServer, RequestHandler, TimerEngine};
pub use types::{IpcRequest, IpcResponse, TimerConfig, TimerMode, TimerState};
