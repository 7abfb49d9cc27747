//! Core data types for the Pomodoro cycle engine.
//!
//! This module defines the data structures used for:
//! - The countdown state machine (`TimerMode`, `TimerState`)
//! - Initial duration configuration with clamping
//! - IPC request/response serialization

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Default work duration in minutes
pub const DEFAULT_WORK_MINUTES: u32 = 25;

/// Default break duration in minutes
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Accepted work duration in minutes
pub const WORK_MINUTES_RANGE: RangeInclusive<u32> = 1..=180;

/// Accepted break duration in minutes
pub const BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;

const SECONDS_PER_MINUTE: u32 = 60;

/// Clamps a requested work duration to [`WORK_MINUTES_RANGE`].
pub fn clamp_work_minutes(minutes: i64) -> u32 {
    clamp_minutes(minutes, &WORK_MINUTES_RANGE)
}

/// Clamps a requested break duration to [`BREAK_MINUTES_RANGE`].
pub fn clamp_break_minutes(minutes: i64) -> u32 {
    clamp_minutes(minutes, &BREAK_MINUTES_RANGE)
}

fn clamp_minutes(minutes: i64, range: &RangeInclusive<u32>) -> u32 {
    let clamped = minutes.clamp(i64::from(*range.start()), i64::from(*range.end()));
    // In range of u32 after the clamp above.
    clamped as u32
}

/// Parses free-form minute input the way a numeric text field does.
///
/// Only the leading ASCII digits are considered (`"30min"` is 30). Input
/// without leading digits yields `None` and should be ignored by the caller.
/// Values too large for `i64` saturate, the duration setters clamp them.
pub fn parse_minutes_input(input: &str) -> Option<i64> {
    let digits: &str = {
        let trimmed = input.trim_start();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };

    if digits.is_empty() {
        return None;
    }

    Some(digits.parse::<i64>().unwrap_or(i64::MAX))
}

// ============================================================================
// TimerMode
// ============================================================================

/// Current phase of the Pomodoro cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Not started, or reset
    #[default]
    Idle,
    /// Focus interval
    Work,
    /// Rest interval
    Break,
}

impl TimerMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Idle => "idle",
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }

    /// Returns the label shown to the user.
    ///
    /// An idle timer is about to focus, so it shares the work label.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Idle | TimerMode::Work => "FOCUS",
            TimerMode::Break => "BREAK",
        }
    }

    /// Returns the mode that follows this one when its countdown ends.
    pub fn next(&self) -> TimerMode {
        match self {
            TimerMode::Idle | TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TimerConfig
// ============================================================================

/// Initial durations for a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    /// Work duration in minutes (1-180)
    pub work_minutes: u32,
    /// Break duration in minutes (1-60)
    pub break_minutes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

impl TimerConfig {
    /// Returns the configuration with the specified work duration.
    pub fn with_work_minutes(mut self, minutes: u32) -> Self {
        self.work_minutes = minutes;
        self
    }

    /// Returns the configuration with the specified break duration.
    pub fn with_break_minutes(mut self, minutes: u32) -> Self {
        self.break_minutes = minutes;
        self
    }

    /// Returns the configuration with both durations clamped to their ranges.
    pub fn clamped(self) -> Self {
        Self {
            work_minutes: clamp_work_minutes(i64::from(self.work_minutes)),
            break_minutes: clamp_break_minutes(i64::from(self.break_minutes)),
        }
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// Snapshot of the countdown state machine.
///
/// `mode` and `is_running` are orthogonal: a paused timer keeps its mode and
/// remaining time. While `mode` is [`TimerMode::Idle`], `remaining_seconds`
/// always equals `work_duration_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Current phase
    pub mode: TimerMode,
    /// Whether the countdown is progressing
    pub is_running: bool,
    /// Configured work duration (60-10800)
    pub work_duration_seconds: u32,
    /// Configured break duration (60-3600)
    pub break_duration_seconds: u32,
    /// Seconds left in the current phase
    pub remaining_seconds: u32,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl TimerState {
    /// Creates an idle state from the given configuration.
    ///
    /// Out-of-range durations are clamped.
    pub fn new(config: TimerConfig) -> Self {
        let config = config.clamped();
        let work_duration_seconds = config.work_minutes * SECONDS_PER_MINUTE;

        Self {
            mode: TimerMode::Idle,
            is_running: false,
            work_duration_seconds,
            break_duration_seconds: config.break_minutes * SECONDS_PER_MINUTE,
            remaining_seconds: work_duration_seconds,
        }
    }

    /// Starts or resumes the countdown.
    ///
    /// Does nothing if already running. From idle, a work phase begins with
    /// the full work duration; otherwise the paused phase resumes as is.
    pub fn start(&mut self) {
        if self.is_running {
            return;
        }
        if self.mode == TimerMode::Idle {
            self.mode = TimerMode::Work;
            self.remaining_seconds = self.work_duration_seconds;
        }
        self.is_running = true;
    }

    /// Stops the countdown, keeping mode and remaining time.
    pub fn pause(&mut self) {
        self.is_running = false;
    }

    /// Returns to idle with a full work duration. Durations are kept.
    pub fn reset(&mut self) {
        self.mode = TimerMode::Idle;
        self.is_running = false;
        self.remaining_seconds = self.work_duration_seconds;
    }

    /// Sets the work duration, clamped to 1-180 minutes.
    ///
    /// Only an idle timer picks up the new duration immediately; a running
    /// or paused countdown keeps going and the next work phase uses it.
    pub fn set_work_minutes(&mut self, minutes: i64) {
        self.work_duration_seconds = clamp_work_minutes(minutes) * SECONDS_PER_MINUTE;
        if self.mode == TimerMode::Idle {
            self.remaining_seconds = self.work_duration_seconds;
        }
    }

    /// Sets the break duration, clamped to 1-60 minutes.
    ///
    /// Never touches the current countdown.
    pub fn set_break_minutes(&mut self, minutes: i64) {
        self.break_duration_seconds = clamp_break_minutes(minutes) * SECONDS_PER_MINUTE;
    }

    /// Advances the countdown by one second.
    ///
    /// A tick on a stopped timer has no effect. The phase switches on the
    /// tick that consumes the last second, reloading the next phase's full
    /// duration and staying running.
    ///
    /// Returns true if the phase switched.
    pub fn tick(&mut self) -> bool {
        if !self.is_running {
            return false;
        }

        if self.remaining_seconds > 0 {
            self.remaining_seconds -= 1;
        }

        if self.remaining_seconds == 0 {
            self.advance_phase();
            return true;
        }

        false
    }

    fn advance_phase(&mut self) {
        self.mode = self.mode.next();
        self.remaining_seconds = self.phase_total_seconds();
    }

    /// Returns the full length of the current phase.
    pub fn phase_total_seconds(&self) -> u32 {
        match self.mode {
            TimerMode::Idle | TimerMode::Work => self.work_duration_seconds,
            TimerMode::Break => self.break_duration_seconds,
        }
    }

    /// Returns the share of the current phase still ahead, in [0, 1].
    pub fn remaining_fraction(&self) -> f64 {
        let total = self.phase_total_seconds();
        if total == 0 {
            return 0.0;
        }
        (f64::from(self.remaining_seconds) / f64::from(total)).min(1.0)
    }

    /// Formats the remaining time as `MM:SS`.
    pub fn format_remaining(&self) -> String {
        format_clock(self.remaining_seconds)
    }

    /// Returns the configured work duration in minutes.
    pub fn work_minutes(&self) -> u32 {
        self.work_duration_seconds / SECONDS_PER_MINUTE
    }

    /// Returns the configured break duration in minutes.
    pub fn break_minutes(&self) -> u32 {
        self.break_duration_seconds / SECONDS_PER_MINUTE
    }
}

/// Formats seconds as zero-padded `MM:SS`.
pub fn format_clock(total_seconds: u32) -> String {
    format!(
        "{:02}:{:02}",
        total_seconds / SECONDS_PER_MINUTE,
        total_seconds % SECONDS_PER_MINUTE
    )
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start or resume the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Pause if running, start otherwise
    Toggle,
    /// Return to idle
    Reset,
    /// Change the work duration
    SetWork {
        /// Requested minutes, clamped by the engine
        minutes: i64,
    },
    /// Change the break duration
    SetBreak {
        /// Requested minutes, clamped by the engine
        minutes: i64,
    },
    /// Query the current snapshot
    Status,
    /// Stream snapshots until the connection closes
    Watch,
}

impl IpcRequest {
    /// Returns the wire name of the command, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            IpcRequest::Start => "start",
            IpcRequest::Pause => "pause",
            IpcRequest::Toggle => "toggle",
            IpcRequest::Reset => "reset",
            IpcRequest::SetWork { .. } => "set_work",
            IpcRequest::SetBreak { .. } => "set_break",
            IpcRequest::Status => "status",
            IpcRequest::Watch => "watch",
        }
    }

    /// Returns true if sending the request twice has the same effect as once.
    ///
    /// Only `Toggle` flips state relative to what it finds.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, IpcRequest::Toggle)
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Snapshot after the command was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TimerState>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<TimerState>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true if this is an error response.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// ============================================================================
// Tests
// ============================================================================
