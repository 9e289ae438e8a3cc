//! Engine message and statistics types

use crate::error::Error;

/// Severity of a log message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug detail
    Debug,
    /// Normal progress
    Info,
    /// Degraded but continuing
    Warn,
    /// Failure
    Error,
}

/// Message emitted during a sync run, rendered by the host surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A log line
    Log {
        /// Severity
        level: LogLevel,
        /// Message text
        message: String,
    },
    /// Final statistics
    Stats(SyncStats),
}

impl Message {
    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info message
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a warning message
    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    /// Create an error message
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }
}

/// Statistics from a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Raw rows seen across all pages, duplicates included
    pub raw_rows: u64,
    /// Unique species records collected
    pub unique_records: usize,
    /// Pages fetched
    pub pages_fetched: u64,
    /// Rows persisted at the destination
    pub rows_written: usize,
    /// Errors encountered
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Everything a sync run produced.
///
/// A failed run carries its error alongside the statistics gathered before
/// the failure; the counts are never lost.
#[derive(Debug)]
pub struct SyncReport {
    /// Run statistics
    pub stats: SyncStats,
    /// Messages for the host surface, in emission order
    pub messages: Vec<Message>,
    /// The fatal error, when the run failed
    pub error: Option<Error>,
}

impl SyncReport {
    /// Check whether the run completed without error
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
