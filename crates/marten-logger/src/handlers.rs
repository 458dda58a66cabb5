//! Handler configuration: output destinations, freeze, and file setup

use crate::level::Level;
use crate::logger::Logger;
use crate::{Error, Result};
use chrono::Utc;
use regex::Regex;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S%.3f";

fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[A-Za-z0-9]+$").expect("prefix pattern is valid"))
}

pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix_pattern().is_match(prefix) {
        Ok(())
    } else {
        Err(Error::InvalidPrefix {
            prefix: prefix.to_string(),
        })
    }
}

/// The active output destination set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handlers {
    Console,
    File,
    FileAndConsole,
}

impl Handlers {
    pub fn has_console(self) -> bool {
        matches!(self, Handlers::Console | Handlers::FileAndConsole)
    }

    pub fn has_file(self) -> bool {
        matches!(self, Handlers::File | Handlers::FileAndConsole)
    }
}

impl fmt::Display for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handlers::Console => f.write_str("console"),
            Handlers::File => f.write_str("file"),
            Handlers::FileAndConsole => f.write_str("file,console"),
        }
    }
}

/// Read-only snapshot of the logger configuration, for diagnostics and
/// tests. Taking a snapshot never mutates and is never blocked by freeze.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerAttrs {
    pub level: Level,
    pub handlers: Handlers,
    pub log_file_path: Option<PathBuf>,
    pub frozen: bool,
}

/// Everything the rotation lock guards: the destination set, the open file
/// handle, and the path fields identifying the current file. The path
/// fields are only ever updated together.
pub(crate) struct HandlerState {
    pub(crate) handlers: Handlers,
    pub(crate) file: Option<File>,
    pub(crate) log_file_path: Option<PathBuf>,
    pub(crate) log_dir: Option<PathBuf>,
    pub(crate) file_prefix: Option<String>,
}

impl HandlerState {
    pub(crate) fn console() -> Self {
        Self {
            handlers: Handlers::Console,
            file: None,
            log_file_path: None,
            log_dir: None,
            file_prefix: None,
        }
    }

    /// Append one rendered record to every active destination. Called with
    /// the shared side of the rotation lock held. A record-write failure
    /// must not fail the log call; it degrades to a note on stderr.
    pub(crate) fn emit(&self, bytes: &[u8]) {
        if self.handlers.has_file() {
            if let Some(file) = &self.file {
                if let Err(err) = (&*file).write_all(bytes) {
                    eprintln!("marten-logger: failed to write log record: {}", err);
                }
            }
        }
        if self.handlers.has_console() {
            let mut stderr = io::stderr().lock();
            let _ = stderr.write_all(bytes);
        }
    }
}

/// Create the timestamped log file under `log_dir` and install it as the
/// active handle, recording the path fields together. The same rule builds
/// replacement files during rotation.
///
/// The directory is created owner-only (0700) and the file owner-only
/// (0600); the file's first byte is the `[` opening the record array. The
/// file is opened in append mode, so each record lands in a single atomic
/// write and concurrent holders of the shared lock cannot interleave.
pub(crate) fn install_file(
    state: &mut HandlerState,
    log_dir: &Path,
    prefix: &str,
) -> Result<PathBuf> {
    validate_prefix(prefix)?;

    let basename = format!("{}_{}.log", prefix, Utc::now().format(FILE_TIMESTAMP_FORMAT));
    let path = log_dir.join(basename);
    if !path.is_absolute() {
        return Err(Error::RelativePath { path });
    }

    create_owner_only_dir(log_dir)?;
    let file = open_owner_only_file(&path)?;
    (&file).write_all(b"[").map_err(|source| Error::Io {
        op: "initialize log file",
        path: path.clone(),
        source,
    })?;

    tracing::debug!(
        logger.event = "log_file_opened",
        file_path = %path.display(),
        "Log file opened"
    );

    state.file = Some(file);
    state.log_file_path = Some(path.clone());
    state.log_dir = Some(log_dir.to_path_buf());
    state.file_prefix = Some(prefix.to_string());
    Ok(path)
}

fn create_owner_only_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::Io {
        op: "create log directory",
        path: dir.to_path_buf(),
        source,
    })?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(|source| {
            Error::Io {
                op: "set permissions on log directory",
                path: dir.to_path_buf(),
                source,
            }
        })?;
    }
    Ok(())
}

fn open_owner_only_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map_err(|source| Error::Io {
        op: "create log file",
        path: path.to_path_buf(),
        source,
    })
}

impl Logger {
    /// Route records to the console (stderr) only.
    ///
    /// Clears the file association but does not close a previously open
    /// handle; closing is rotation's (or the owner's) responsibility.
    pub fn set_console_handler(&self) -> Result<()> {
        self.ensure_unfrozen()?;
        let mut state = self.inner.state.write().unwrap();
        state.handlers = Handlers::Console;
        state.log_file_path = None;
        Ok(())
    }

    /// Create a timestamped log file under `log_dir` and make it the sole
    /// output. Returns the path of the created file.
    pub fn set_file_handler(&self, log_dir: impl AsRef<Path>, prefix: &str) -> Result<PathBuf> {
        self.ensure_unfrozen()?;
        let mut state = self.inner.state.write().unwrap();
        let path = install_file(&mut state, log_dir.as_ref(), prefix)?;
        state.handlers = Handlers::File;
        Ok(path)
    }

    /// Like [`set_file_handler`](Self::set_file_handler), but additionally
    /// mirrors every record to the console.
    pub fn set_handlers(&self, log_dir: impl AsRef<Path>, prefix: &str) -> Result<PathBuf> {
        self.ensure_unfrozen()?;
        let mut state = self.inner.state.write().unwrap();
        let path = install_file(&mut state, log_dir.as_ref(), prefix)?;
        state.handlers = Handlers::FileAndConsole;
        Ok(path)
    }

    /// Seal the configuration. Irreversible: every later mutation,
    /// including a second freeze, fails with [`Error::Frozen`].
    pub fn freeze(&self) -> Result<()> {
        if self.inner.frozen.swap(true, Ordering::SeqCst) {
            Err(Error::Frozen)
        } else {
            Ok(())
        }
    }

    /// Snapshot the current configuration.
    pub fn attributes(&self) -> LoggerAttrs {
        let state = self.inner.state.read().unwrap();
        LoggerAttrs {
            level: self.level(),
            handlers: state.handlers,
            log_file_path: state.log_file_path.clone(),
            frozen: self.inner.frozen.load(Ordering::SeqCst),
        }
    }
}
