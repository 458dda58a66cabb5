//! Logger core: the leveled write API under the rotation lock

use crate::callsite::CallSite;
use crate::handlers::HandlerState;
use crate::level::Level;
use crate::record::LogRecord;
use crate::rotation::MonitorSlot;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// A structured, leveled logger with optional file-backed output.
///
/// `Logger` is a handle over shared state; cloning is cheap and every clone
/// addresses the same level, handler set, and active file. Construct one
/// instance at process start and pass clones to consumers; there is no
/// implicit global instance.
///
/// Writers take the rotation lock in shared mode, so any number of threads
/// may log concurrently; rotation takes it exclusively while it swaps the
/// active file.
#[derive(Clone)]
pub struct Logger {
    pub(crate) inner: Arc<LoggerInner>,
}

pub(crate) struct LoggerInner {
    /// Current minimum severity, read without locking on the gate path.
    pub(crate) level: AtomicU8,
    /// One-way configuration seal. A flag check, not a mutex: after the
    /// first successful freeze no writer ever mutates configuration again.
    pub(crate) frozen: AtomicBool,
    /// The rotation lock. Guards the handler set, the open file handle, and
    /// the path fields as one atomic unit.
    pub(crate) state: RwLock<HandlerState>,
    pub(crate) monitor: Mutex<MonitorSlot>,
}

impl Logger {
    /// Create a logger emitting to the console (stderr) at ERROR level.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                level: AtomicU8::new(Level::Error.severity()),
                frozen: AtomicBool::new(false),
                state: RwLock::new(HandlerState::console()),
                monitor: Mutex::new(MonitorSlot::Idle),
            }),
        }
    }

    /// The currently configured minimum severity.
    pub fn level(&self) -> Level {
        Level::from_severity(self.inner.level.load(Ordering::Relaxed))
    }

    /// Set the minimum severity. Fails with [`Error::Frozen`] once the
    /// configuration has been sealed.
    pub fn set_level(&self, level: Level) -> Result<()> {
        self.ensure_unfrozen()?;
        self.inner.level.store(level.severity(), Ordering::SeqCst);
        Ok(())
    }

    /// Set the minimum severity by name. Unknown names are rejected with
    /// [`Error::InvalidLevel`] without mutating state.
    pub fn set_log_level(&self, name: &str) -> Result<()> {
        self.ensure_unfrozen()?;
        let level = Level::from_name(name)?;
        self.inner.level.store(level.severity(), Ordering::SeqCst);
        Ok(())
    }

    /// Log at FATAL severity. Never gated: the record is written no matter
    /// the configured level. When `crash` is true the process is terminated
    /// abnormally after the record has been written.
    pub fn fatal_at(&self, msg: &str, crash: bool, site: CallSite) {
        let rendered = self.write_record(Level::Fatal, msg, site);
        if crash {
            panic!("{}", rendered);
        }
    }

    pub fn error_at(&self, msg: &str, site: CallSite) {
        if !self.enabled(Level::Error) {
            return;
        }
        self.write_record(Level::Error, msg, site);
    }

    /// Log an error together with its underlying cause, gated like ERROR.
    ///
    /// A missing cause fails with [`Error::MissingCause`] and emits nothing,
    /// distinguishing "nothing to report" from "reporting failed".
    pub fn exception_at(
        &self,
        msg: &str,
        err: Option<&dyn std::error::Error>,
        site: CallSite,
    ) -> Result<()> {
        if !self.enabled(Level::Error) {
            return Ok(());
        }
        let err = err.ok_or(Error::MissingCause)?;
        let full = format!("{}, errorString: {}", msg, err);
        self.write_record(Level::Error, &full, site);
        Ok(())
    }

    pub fn warning_at(&self, msg: &str, site: CallSite) {
        if !self.enabled(Level::Warning) {
            return;
        }
        self.write_record(Level::Warning, msg, site);
    }

    pub fn info_at(&self, msg: &str, site: CallSite) {
        if !self.enabled(Level::Info) {
            return;
        }
        self.write_record(Level::Info, msg, site);
    }

    pub fn debug_at(&self, msg: &str, site: CallSite) {
        if !self.enabled(Level::Debug) {
            return;
        }
        self.write_record(Level::Debug, msg, site);
    }

    /// Flush the active log file to durable storage, under the exclusive
    /// side of the rotation lock.
    pub fn sync_log_file(&self) -> Result<()> {
        let state = self.inner.state.write().unwrap();
        let path = state.log_file_path.clone().ok_or(Error::NoFileHandler)?;
        let file = state.file.as_ref().ok_or(Error::NoFileHandler)?;
        file.sync_all().map_err(|source| Error::Io {
            op: "sync log file",
            path,
            source,
        })
    }

    /// A gated-out call takes no lock and touches no formatter.
    fn enabled(&self, level: Level) -> bool {
        level.severity() <= self.inner.level.load(Ordering::Relaxed)
    }

    /// Serialize outside the lock, then append the comma-terminated record
    /// to the active destinations under the shared side of the rotation
    /// lock. Returns the rendered record.
    fn write_record(&self, level: Level, msg: &str, site: CallSite) -> String {
        let record = LogRecord::new(level, msg, &site);
        let rendered = record.render();
        let mut line = String::with_capacity(rendered.len() + 2);
        line.push_str(&rendered);
        line.push_str(",\n");

        let state = self.inner.state.read().unwrap();
        state.emit(line.as_bytes());
        rendered
    }

    pub(crate) fn ensure_unfrozen(&self) -> Result<()> {
        if self.inner.frozen.load(Ordering::SeqCst) {
            Err(Error::Frozen)
        } else {
            Ok(())
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
