//! Scan event protocol
//!
//! A scan produces an ordered, append-only sequence of [`ScanEvent`]s. On the
//! wire each event is one JSON object per line (NDJSON), tagged by `type`:
//!
//! ```text
//! {"type":"progress","message":"Reading menu..."}
//! {"type":"phase1","dishes":[...]}
//! {"type":"batch","dishes":[...]}
//! {"type":"done"}
//! ```
//!
//! The stream ends after `done` or `error`, or when the connection closes.

use crate::models::{Dish, RawDish};
use serde::{Deserialize, Serialize};

/// Event emitted by a menu scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScanEvent {
    /// Human-readable progress message
    Progress { message: String },
    /// Extraction finished; raw dishes are known
    Phase1 { dishes: Vec<RawDish> },
    /// One enrichment batch completed (after its retry, if any)
    Batch { dishes: Vec<Dish> },
    /// Scan completed
    Done,
    /// Scan failed; no further events follow
    Error { message: String },
}

impl ScanEvent {
    pub fn progress(message: impl Into<String>) -> Self {
        ScanEvent::Progress {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ScanEvent::Error {
            message: message.into(),
        }
    }

    /// Wire name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::Progress { .. } => "progress",
            ScanEvent::Phase1 { .. } => "phase1",
            ScanEvent::Batch { .. } => "batch",
            ScanEvent::Done => "done",
            ScanEvent::Error { .. } => "error",
        }
    }

    /// `done` and `error` end the sequence
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::Done | ScanEvent::Error { .. })
    }

    /// Encode as a single NDJSON line (trailing newline included)
    pub fn to_ndjson_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one NDJSON line
    pub fn from_ndjson_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end())
    }
}
