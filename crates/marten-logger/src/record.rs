//! Canonical structured log record and its wire rendering

use crate::callsite::CallSite;
use crate::level::Level;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Path segment marking the project root. Caller paths are truncated to the
/// portion after its last occurrence so build-machine paths never leak into
/// stored logs.
const PROJECT_ROOT_MARKER: &str = "src/";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f UTC";

/// One structured log record.
///
/// Created per accepted call, serialized immediately, and discarded after
/// being written to the active handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: Level,
    pub msg: String,
    #[serde(rename = "func")]
    pub function: String,
    pub file: String,
    pub lineno: u32,
}

impl LogRecord {
    /// Build a record for `msg` at `level`, stamped with the current UTC
    /// time and the caller identity captured at the call site.
    pub fn new(level: Level, msg: &str, site: &CallSite) -> Self {
        Self {
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            level,
            msg: msg.to_string(),
            function: site.function.to_string(),
            file: truncate_to_project_root(site.file).to_string(),
            lineno: site.line,
        }
    }

    /// Render the record as an indented JSON object.
    ///
    /// Serialization failure degrades to an inline diagnostic string rather
    /// than an error; a record that cannot be serialized is a bug in this
    /// library, and a log call must still return.
    pub fn render(&self) -> String {
        match serde_json::to_string_pretty(self) {
            Ok(text) => text,
            Err(err) => format!(
                "Failed to serialize log record {:?} into a JSON object. \
                 It's highly likely that there's a bug in the logging library. Error: {}",
                self, err
            ),
        }
    }
}

/// Strip everything up to and including the last project-root marker. Paths
/// without the marker pass through whole.
fn truncate_to_project_root(path: &str) -> &str {
    match path.rfind(PROJECT_ROOT_MARKER) {
        Some(idx) => &path[idx + PROJECT_ROOT_MARKER.len()..],
        None => path,
    }
}
