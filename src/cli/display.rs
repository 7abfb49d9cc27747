//! Display utilities for the Pomodoro cycle CLI.
//!
//! This module provides formatted output for:
//! - Command results
//! - Error messages
//! - Status display
//! - One-line updates while watching

use crate::types::{IpcResponse, TimerMode, TimerState};

/// Width of the text progress bar
const PROGRESS_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the outcome of a command, followed by the resulting state.
    pub fn show_command_result(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("{}", response.message);
        }
        if let Some(state) = &response.data {
            println!("  {}", Self::status_line(state));
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        match &response.data {
            Some(state) => println!("{}", Self::status_block(state)),
            None => println!("No timer state reported"),
        }
    }

    /// Shows one update while watching.
    pub fn show_watch_update(state: &TimerState) {
        println!("{}", Self::status_line(state));
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Formats a one-line summary, e.g. `FOCUS 24:59 [#######.....] running`.
    pub fn status_line(state: &TimerState) -> String {
        format!(
            "{} {} [{}] {}",
            state.mode.label(),
            state.format_remaining(),
            Self::progress_bar(state.remaining_fraction()),
            Self::run_marker(state)
        )
    }

    /// Formats the multi-line status view.
    pub fn status_block(state: &TimerState) -> String {
        format!(
            "Pomodoro\n\
             ─────────────────────────────\n\
             {}\n\
             Work: {} min  Break: {} min",
            Self::status_line(state),
            state.work_minutes(),
            state.break_minutes()
        )
    }

    fn run_marker(state: &TimerState) -> &'static str {
        if state.is_running {
            "running"
        } else if state.mode == TimerMode::Idle {
            "idle"
        } else {
            "paused"
        }
    }

    /// Renders the remaining share of the phase as a fixed-width bar.
    fn progress_bar(fraction: f64) -> String {
        let filled = (fraction.clamp(0.0, 1.0) * PROGRESS_WIDTH as f64).round() as usize;
        format!("{}{}", "#".repeat(filled), ".".repeat(PROGRESS_WIDTH - filled))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimerConfig;

    mod progress_bar_tests {
        use super::*;

        #[test]
        fn test_progress_bar_full() {
            assert_eq!(Display::progress_bar(1.0), "#".repeat(20));
        }

        #[test]
        fn test_progress_bar_empty() {
            assert_eq!(Display::progress_bar(0.0), ".".repeat(20));
        }

        #[test]
        fn test_progress_bar_half() {
            assert_eq!(
                Display::progress_bar(0.5),
                format!("{}{}", "#".repeat(10), ".".repeat(10))
            );
        }

        #[test]
        fn test_progress_bar_out_of_range() {
            assert_eq!(Display::progress_bar(3.0).len(), 20);
            assert_eq!(Display::progress_bar(-1.0), ".".repeat(20));
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_status_line_idle() {
            let state = TimerState::default();
            assert_eq!(
                Display::status_line(&state),
                format!("FOCUS 25:00 [{}] idle", "#".repeat(20))
            );
        }

        #[test]
        fn test_status_line_running_and_paused() {
            let mut state = TimerState::default();
            state.start();
            assert!(Display::status_line(&state).ends_with("running"));

            state.pause();
            assert!(Display::status_line(&state).ends_with("paused"));
        }

        #[test]
        fn test_status_line_break() {
            let mut state = TimerState::new(TimerConfig {
                work_minutes: 1,
                break_minutes: 3,
            });
            state.start();
            for _ in 0..60 {
                state.tick();
            }
            assert!(Display::status_line(&state).starts_with("BREAK 03:00"));
        }

        #[test]
        fn test_status_block_shows_durations() {
            let state = TimerState::new(TimerConfig {
                work_minutes: 50,
                break_minutes: 10,
            });
            let block = Display::status_block(&state);
            assert!(block.contains("FOCUS 50:00"));
            assert!(block.ends_with("Work: 50 min  Break: 10 min"));
        }
    }
}
