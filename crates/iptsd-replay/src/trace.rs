#![forbid(unsafe_code)]

//! JSON-lines trace format.
//!
//! ```text
//! # comment
//! {"stylus": {"x": 0.5, "y": 0.5, "pressure": 0.4, "contact": true, "proximity": true}}
//! {"contacts": [{"index": 0, "mean": {"x": 0.2, "y": 0.3}, "size": {"x": 0.01, "y": 0.01}}]}
//! {"reset": true}
//! ```

use std::fmt;

use iptsd_core::{Frame, StylusSample};
use serde::Deserialize;

/// One recorded input record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEvent {
    Stylus(StylusSample),
    Contacts(Frame),
    /// `true` clears the stabilizer history; `false` is a no-op.
    Reset(bool),
}

/// A line that failed to parse, with its 1-based line number.
#[derive(Debug)]
pub struct TraceError {
    pub line: usize,
    pub source: serde_json::Error,
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace line {}: {}", self.line, self.source)
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Parse a single line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<TraceEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Parse a whole trace.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEvent>, TraceError> {
    let mut events = Vec::new();
    for (i, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(source) => return Err(TraceError { line: i + 1, source }),
        }
    }
    Ok(events)
}
