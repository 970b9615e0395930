//! Error collector for per-file reporting with cargo-style output

use super::events::LogEvent;
use crate::config::constants::compile_time::logging::{
    MAX_LOG_EVENTS_PER_FILE, MAX_LOG_MESSAGE_LENGTH,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// FILE PROCESSING CONTEXT
// ============================================================================

/// Context information for the file currently being processed
#[derive(Debug, Clone)]
pub struct FileProcessingContext {
    pub file_path: PathBuf,
    pub start_time: Instant,
}

impl FileProcessingContext {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

// ============================================================================
// PROCESSING SUMMARY
// ============================================================================

/// Summary of a build's collected events
#[derive(Debug, Clone, Default)]
pub struct ProcessingSummary {
    pub total_files: usize,
    pub files_with_errors: usize,
    pub files_with_warnings: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl ProcessingSummary {
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.total_warnings > 0
    }
}

// ============================================================================
// ERROR COLLECTOR
// ============================================================================

/// Thread-safe collector grouping events by source file
pub struct ErrorCollector {
    file_events: Mutex<BTreeMap<PathBuf, Vec<LogEvent>>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self {
            file_events: Mutex::new(BTreeMap::new()),
        }
    }

    /// Record an event for a specific file
    pub fn record_event(&self, file_path: &Path, mut event: LogEvent) {
        if event.message.len() > MAX_LOG_MESSAGE_LENGTH {
            let mut cut = MAX_LOG_MESSAGE_LENGTH;
            while !event.message.is_char_boundary(cut) {
                cut -= 1;
            }
            event.message.truncate(cut);
        }

        let mut events = self.file_events.lock().unwrap();
        let file_events = events.entry(file_path.to_path_buf()).or_default();

        if file_events.len() < MAX_LOG_EVENTS_PER_FILE {
            file_events.push(event);
        } else if file_events.len() == MAX_LOG_EVENTS_PER_FILE {
            file_events.push(LogEvent::warning(&format!(
                "Too many events for file (limit: {})",
                MAX_LOG_EVENTS_PER_FILE
            )));
        }
    }

    /// Record that a file is being processed, so it appears in the summary
    /// even when it produces no events.
    pub fn record_file(&self, file_path: &Path) {
        let mut events = self.file_events.lock().unwrap();
        events.entry(file_path.to_path_buf()).or_default();
    }

    pub fn get_file_events(&self, file_path: &Path) -> Vec<LogEvent> {
        let events = self.file_events.lock().unwrap();
        events.get(file_path).cloned().unwrap_or_default()
    }

    pub fn get_file_errors(&self, file_path: &Path) -> Vec<LogEvent> {
        self.get_file_events(file_path)
            .into_iter()
            .filter(|e| e.is_error())
            .collect()
    }

    pub fn get_all_file_events(&self) -> BTreeMap<PathBuf, Vec<LogEvent>> {
        self.file_events.lock().unwrap().clone()
    }

    pub fn get_summary(&self) -> ProcessingSummary {
        let events = self.file_events.lock().unwrap();

        let mut summary = ProcessingSummary {
            total_files: events.len(),
            ..Default::default()
        };

        for file_events in events.values() {
            let errors = file_events.iter().filter(|e| e.is_error()).count();
            let warnings = file_events.iter().filter(|e| e.is_warning()).count();

            if errors > 0 {
                summary.files_with_errors += 1;
            } else if warnings > 0 {
                summary.files_with_warnings += 1;
            }
            summary.total_errors += errors;
            summary.total_warnings += warnings;
        }

        summary
    }

    pub fn clear(&self) {
        self.file_events.lock().unwrap().clear();
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Render collected events grouped by file, cargo-style.
pub fn format_cargo_style_errors(collector: &ErrorCollector) -> String {
    let all_events = collector.get_all_file_events();
    let summary = collector.get_summary();

    let mut output = String::new();

    for (file_path, events) in &all_events {
        let interesting: Vec<&LogEvent> = events
            .iter()
            .filter(|e| e.is_error() || e.is_warning())
            .collect();
        if interesting.is_empty() {
            continue;
        }

        output.push_str(&format!("{}:\n", file_path.display()));
        for event in interesting {
            let marker = if event.is_error() { "error" } else { "warning" };
            output.push_str(&format!(
                "  {}[{}]: {}\n",
                marker,
                event.code.as_str(),
                event.message
            ));
        }
    }

    if summary.has_errors() || summary.has_warnings() {
        output.push_str(&format!(
            "{} error(s), {} warning(s) across {} file(s)\n",
            summary.total_errors, summary.total_warnings, summary.total_files
        ));
    }

    output
}
