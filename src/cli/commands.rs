//! Command definitions for the Pomodoro cycle CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::{
    clamp_break_minutes, clamp_work_minutes, parse_minutes_input, TimerConfig,
    DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro cycle timer
#[derive(Parser, Debug)]
#[command(
    name = "pomocycle",
    version,
    about = "Work/break countdown timer driven by a local daemon",
    long_about = "Alternates work and break intervals until paused or reset.\n\
                  Run `pomocycle daemon` once, then control it from any terminal.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Daemon socket path [default: ~/.pomocycle/pomocycle.sock]
    #[arg(long, global = true, env = "POMOCYCLE_SOCKET", value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the countdown, or resume a paused one
    Start,

    /// Pause the countdown
    Pause,

    /// Pause if running, start otherwise
    Toggle,

    /// Stop and return to idle
    Reset,

    /// Set the work duration in minutes (clamped to 1-180)
    Work {
        /// Minutes; only leading digits are read, e.g. `30min`
        #[arg(value_parser = parse_minutes)]
        minutes: i64,
    },

    /// Set the break duration in minutes (clamped to 1-60)
    Break {
        /// Minutes; only leading digits are read, e.g. `5min`
        #[arg(value_parser = parse_minutes)]
        minutes: i64,
    },

    /// Show the current timer state
    Status,

    /// Follow the timer, printing every update
    Watch,

    /// Run the timer daemon in the foreground
    Daemon(DaemonArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Daemon Command Arguments
// ============================================================================

/// Arguments for the daemon command
#[derive(Args, Debug, Clone)]
pub struct DaemonArgs {
    /// Initial work duration in minutes (clamped to 1-180)
    #[arg(short, long, default_value_t = i64::from(DEFAULT_WORK_MINUTES), value_parser = parse_minutes)]
    pub work: i64,

    /// Initial break duration in minutes (clamped to 1-60)
    #[arg(short, long, default_value_t = i64::from(DEFAULT_BREAK_MINUTES), value_parser = parse_minutes)]
    pub break_time: i64,
}

impl Default for DaemonArgs {
    fn default() -> Self {
        Self {
            work: i64::from(DEFAULT_WORK_MINUTES),
            break_time: i64::from(DEFAULT_BREAK_MINUTES),
        }
    }
}

impl DaemonArgs {
    /// Returns the initial engine configuration, clamped.
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            work_minutes: clamp_work_minutes(self.work),
            break_minutes: clamp_break_minutes(self.break_time),
        }
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Parses a minute argument from its leading digits.
///
/// Range is not checked here; the engine clamps.
fn parse_minutes(s: &str) -> Result<i64, String> {
    parse_minutes_input(s).ok_or_else(|| format!("'{}' does not start with a number", s))
}

// ============================================================================
// Tests
// ============================================================================
