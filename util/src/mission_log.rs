//! Mission event log
//!
//! An append-only record of mission-level events: decisions, control
//! handovers, and failures. Entries are timestamped wall-clock lines which
//! are kept in memory for the duration of the session and flushed to the
//! session directory at session end.
//!
//! This is deliberately separate from the main logger: the mission log is a
//! compact operator-facing account of what the vessel did, not a diagnostic
//! stream. Each entry is mirrored to the main log at `INFO` level.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::Local;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of an entry's leading timestamp.
const ENTRY_TIMESTAMP_FORMAT: &str = "[%H:%M:%S]";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Append-only mission event log.
#[derive(Default)]
pub struct MissionLog {
    entries: Vec<String>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the mission log.
#[derive(Debug, Error)]
pub enum MissionLogError {
    #[error("Cannot create the mission log file: {0}")]
    CannotCreateFile(std::io::Error),

    #[error("Cannot write to the mission log file: {0}")]
    CannotWriteFile(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MissionLog {
    /// Create a new, empty mission log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped entry to the log.
    pub fn log(&mut self, message: &str) {
        let entry = format!(
            "{} {}",
            Local::now().format(ENTRY_TIMESTAMP_FORMAT),
            message
        );

        // Mirror to the main log so the diagnostic stream carries mission
        // events in context.
        info!("{}", message);

        self.entries.push(entry);
    }

    /// All entries recorded so far, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flush all entries to the given path, one line per entry.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MissionLogError> {
        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => return Err(MissionLogError::CannotCreateFile(e)),
        };

        let mut writer = BufWriter::new(file);

        for entry in &self.entries {
            if let Err(e) = writeln!(writer, "{}", entry) {
                return Err(MissionLogError::CannotWriteFile(e));
            }
        }

        match writer.flush() {
            Ok(_) => Ok(()),
            Err(e) => Err(MissionLogError::CannotWriteFile(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_entry_format() {
        let mut log = MissionLog::new();
        log.log("Mission control started");

        assert_eq!(log.len(), 1);

        // "[HH:MM:SS] message"
        let entry = &log.entries()[0];
        assert_eq!(&entry[0..1], "[");
        assert_eq!(&entry[9..11], "] ");
        assert!(entry.ends_with("Mission control started"));
    }

    #[test]
    fn test_entries_in_order() {
        let mut log = MissionLog::new();
        log.log("first");
        log.log("second");
        log.log("third");

        let messages: Vec<_> = log
            .entries()
            .iter()
            .map(|e| e.split_at(11).1)
            .collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_save() {
        let mut log = MissionLog::new();
        log.log("one");
        log.log("two");

        let path = std::env::temp_dir().join("njord_mission_log_test.txt");
        log.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with('\n'));

        std::fs::remove_file(path).ok();
    }
}
