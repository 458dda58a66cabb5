//! Log level table and severity ordering

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five log levels, ranked by severity.
///
/// A lower numeric severity is more urgent: FATAL(0) < ERROR(1) <
/// WARNING(2) < INFO(3) < DEBUG(4). A call at level `L` is emitted iff
/// `L.severity() <= current_level`, with FATAL always emitted regardless of
/// the configured level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
}

impl Level {
    /// Numeric severity rank; lower is more urgent.
    pub fn severity(self) -> u8 {
        match self {
            Level::Fatal => 0,
            Level::Error => 1,
            Level::Warning => 2,
            Level::Info => 3,
            Level::Debug => 4,
        }
    }

    /// Resolve a level name to its severity entry.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "FATAL" => Ok(Level::Fatal),
            "ERROR" => Ok(Level::Error),
            "WARNING" => Ok(Level::Warning),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            _ => Err(Error::InvalidLevel {
                name: name.to_string(),
            }),
        }
    }

    /// All level names, in severity order.
    pub fn names() -> [&'static str; 5] {
        ["FATAL", "ERROR", "WARNING", "INFO", "DEBUG"]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }

    pub(crate) fn from_severity(severity: u8) -> Self {
        match severity {
            0 => Level::Fatal,
            1 => Level::Error,
            2 => Level::Warning,
            3 => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Level::from_name(s)
    }
}
