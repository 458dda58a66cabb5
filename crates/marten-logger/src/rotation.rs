//! Size-based log rotation: background monitor and file swap

use crate::handlers::install_file;
use crate::level::Level;
use crate::logger::Logger;
use crate::record::LogRecord;
use crate::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often the monitor samples the active file's size. A stop request is
/// observed within one interval.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Lifecycle of the background monitor. `Stopped` is terminal: a policy
/// cannot be restarted on the same logger.
pub(crate) enum MonitorSlot {
    Idle,
    Running {
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    },
    Stopped,
}

impl Logger {
    /// Start the rotation policy: a background task that rotates the active
    /// file once its size reaches `threshold_bytes`.
    ///
    /// Requires a file handler ([`Error::NoFileHandler`] otherwise) and a
    /// running tokio runtime. Starting the policy seals the logger
    /// configuration, so no handler swap can race the monitor; a logger
    /// that is already frozen fails with [`Error::Frozen`].
    pub fn start_rotation_policy(&self, threshold_bytes: u64) -> Result<()> {
        let prefix = {
            let state = self.inner.state.read().unwrap();
            if !state.handlers.has_file() || state.log_file_path.is_none() {
                return Err(Error::NoFileHandler);
            }
            state.file_prefix.clone().unwrap_or_default()
        };
        if self.inner.frozen.swap(true, Ordering::SeqCst) {
            return Err(Error::Frozen);
        }

        let diagnostics = DiagnosticLog::create(&prefix)?;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            self.clone(),
            threshold_bytes,
            cancel.clone(),
            diagnostics,
        ));
        *self.inner.monitor.lock().unwrap() = MonitorSlot::Running { cancel, handle };

        tracing::debug!(
            logger.event = "rotation_policy_started",
            threshold_bytes,
            "Rotation policy started"
        );
        Ok(())
    }

    /// Signal the monitor to exit, wait for it, then perform one final
    /// rotation synchronously and return its result.
    ///
    /// Fails with [`Error::AlreadyStopped`] when the policy is not
    /// running, including on a second stop.
    pub async fn stop_rotation_policy(&self) -> Result<()> {
        let (cancel, handle) = {
            let mut slot = self.inner.monitor.lock().unwrap();
            match std::mem::replace(&mut *slot, MonitorSlot::Stopped) {
                MonitorSlot::Running { cancel, handle } => (cancel, handle),
                _ => return Err(Error::AlreadyStopped),
            }
        };
        cancel.cancel();
        let _ = handle.await;
        self.rotate()
    }

    /// Replace the active log file: write the `]`-terminated FATAL marker,
    /// flush to durable storage, gzip the file's bytes to `<path>.gz`,
    /// remove the original, and open a fresh timestamped file via the same
    /// path rule.
    ///
    /// Runs under the exclusive side of the rotation lock, so no writer
    /// observes the swap. Any sub-step failure aborts the rotation and
    /// leaves the previous handle installed as last-known-good.
    pub fn rotate(&self) -> Result<()> {
        let mut state = self.inner.state.write().unwrap();
        let path = state.log_file_path.clone().ok_or(Error::NoFileHandler)?;
        let (log_dir, prefix) = match (state.log_dir.clone(), state.file_prefix.clone()) {
            (Some(dir), Some(prefix)) => (dir, prefix),
            _ => return Err(Error::NoFileHandler),
        };

        {
            let file = state.file.as_ref().ok_or(Error::NoFileHandler)?;
            let marker = LogRecord::new(Level::Fatal, "Rotating log file", &crate::callsite!());
            let mut terminal = marker.render();
            terminal.push(']');
            (&*file)
                .write_all(terminal.as_bytes())
                .map_err(|source| Error::Io {
                    op: "write rotation marker to",
                    path: path.clone(),
                    source,
                })?;
            file.sync_all().map_err(|source| Error::Io {
                op: "sync log file",
                path: path.clone(),
                source,
            })?;
        }

        let compressed = compress_log_file(&path)?;
        let new_path = install_file(&mut state, &log_dir, &prefix)?;

        tracing::info!(
            logger.event = "log_rotated",
            compressed_file = %compressed.display(),
            new_file = %new_path.display(),
            "Log file rotated"
        );
        Ok(())
    }

    /// Size of the active log file on disk.
    pub(crate) fn active_file_size(&self) -> Result<u64> {
        let path = {
            let state = self.inner.state.read().unwrap();
            state.log_file_path.clone().ok_or(Error::NoFileHandler)?
        };
        let metadata = fs::metadata(&path).map_err(|source| Error::Io {
            op: "stat log file",
            path,
            source,
        })?;
        Ok(metadata.len())
    }
}

/// The monitor: sample the file size each tick, rotate past the threshold,
/// exit on cancellation. Poll failures are transient: they are recorded in
/// the side diagnostic file and the loop keeps running; only an explicit
/// stop ends it.
async fn monitor_loop(
    logger: Logger,
    threshold_bytes: u64,
    cancel: CancellationToken,
    mut diagnostics: DiagnosticLog,
) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                diagnostics.discard_if_empty();
                return;
            }
            _ = ticker.tick() => {
                let size = match logger.active_file_size() {
                    Ok(size) => size,
                    Err(err) => {
                        diagnostics.report(&format!(
                            "Rotation policy failed to poll the log file size. Error: {}",
                            err
                        ));
                        tracing::warn!(
                            logger.event = "size_poll_failed",
                            error = %err,
                            "Failed to poll log file size"
                        );
                        continue;
                    }
                };
                // Zero bytes means the file is not ready; re-poll.
                if size == 0 {
                    continue;
                }
                if size >= threshold_bytes {
                    if let Err(err) = logger.rotate() {
                        diagnostics.report(&format!(
                            "Rotation policy failed to rotate logs. Error: {}",
                            err
                        ));
                        tracing::error!(
                            logger.event = "rotation_failed",
                            error = %err,
                            "Rotation policy failed to rotate logs"
                        );
                    }
                }
            }
        }
    }
}

/// Gzip the exact byte sequence of `path` into `<path>.gz` (owner-only),
/// then remove the uncompressed original.
fn compress_log_file(path: &Path) -> Result<PathBuf> {
    let compressed_path = PathBuf::from(format!("{}.gz", path.display()));

    let input = File::open(path).map_err(|source| Error::Io {
        op: "read log file",
        path: path.to_path_buf(),
        source,
    })?;
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let output = options
        .open(&compressed_path)
        .map_err(|source| Error::Io {
            op: "create compressed log file",
            path: compressed_path.clone(),
            source,
        })?;

    let mut encoder = GzEncoder::new(output, Compression::default());
    let mut reader = BufReader::new(input);
    io::copy(&mut reader, &mut encoder).map_err(|source| Error::Io {
        op: "compress log file",
        path: path.to_path_buf(),
        source,
    })?;
    encoder.finish().map_err(|source| Error::Io {
        op: "compress log file",
        path: path.to_path_buf(),
        source,
    })?;

    fs::remove_file(path).map_err(|source| Error::Io {
        op: "remove log file",
        path: path.to_path_buf(),
        source,
    })?;
    Ok(compressed_path)
}

/// Side file for monitor failures, kept outside the managed log so a broken
/// rotation can still be diagnosed. Removed at shutdown when nothing was
/// recorded.
struct DiagnosticLog {
    path: PathBuf,
    file: File,
    bytes_written: u64,
}

impl DiagnosticLog {
    fn create(prefix: &str) -> Result<Self> {
        let path = std::env::temp_dir().join(format!(
            "marten-{}-rotation-{}.diag",
            prefix,
            std::process::id()
        ));
        let file = File::create(&path).map_err(|source| Error::Io {
            op: "create rotation diagnostic file",
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            file,
            bytes_written: 0,
        })
    }

    fn report(&mut self, message: &str) {
        let line = format!("{}\n", message);
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.bytes_written += line.len() as u64;
        }
    }

    fn discard_if_empty(&self) {
        if self.bytes_written == 0 {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_rotate_without_file_handler() {
        let logger = Logger::new();
        assert!(matches!(logger.rotate(), Err(Error::NoFileHandler)));
    }

    #[test]
    fn test_compress_round_trips_exact_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sample.log");
        let payload = b"[{\"level\": \"ERROR\"}]".to_vec();
        fs::write(&path, &payload).unwrap();

        let compressed = compress_log_file(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(compressed, temp_dir.path().join("sample.log.gz"));

        let mut decoder = GzDecoder::new(File::open(&compressed).unwrap());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, payload);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&compressed).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_rotate_seals_the_retired_file() {
        let temp_dir = TempDir::new().unwrap();
        let logger = Logger::new();
        let old_path = logger.set_file_handler(temp_dir.path(), "seal").unwrap();

        crate::error!(logger, "before rotation");
        logger.rotate().unwrap();

        // The retired file is gone; its compressed form is a well-formed
        // JSON array ending in the FATAL marker.
        assert!(!old_path.exists());
        let compressed = PathBuf::from(format!("{}.gz", old_path.display()));
        let mut decoder = GzDecoder::new(File::open(&compressed).unwrap());
        let mut content = String::new();
        decoder.read_to_string(&mut content).unwrap();

        let records: Vec<crate::LogRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].msg, "before rotation");
        assert_eq!(records[1].level, Level::Fatal);
        assert_eq!(records[1].msg, "Rotating log file");

        // A fresh active file took its place, opened with the array opener.
        let new_path = logger.attributes().log_file_path.unwrap();
        assert_ne!(new_path, old_path);
        assert_eq!(fs::read(&new_path).unwrap(), b"[");
    }

    #[tokio::test]
    async fn test_policy_control_state_machine() {
        let logger = Logger::new();
        assert!(matches!(
            logger.start_rotation_policy(1024),
            Err(Error::NoFileHandler)
        ));
        assert!(matches!(
            logger.stop_rotation_policy().await,
            Err(Error::AlreadyStopped)
        ));

        let temp_dir = TempDir::new().unwrap();
        let logger = Logger::new();
        logger.set_file_handler(temp_dir.path(), "control").unwrap();
        logger.start_rotation_policy(1 << 20).unwrap();

        // Starting the policy seals configuration.
        assert!(logger.attributes().frozen);
        assert!(matches!(logger.set_log_level("DEBUG"), Err(Error::Frozen)));
        assert!(matches!(
            logger.start_rotation_policy(1 << 20),
            Err(Error::Frozen)
        ));

        logger.stop_rotation_policy().await.unwrap();
        assert!(matches!(
            logger.stop_rotation_policy().await,
            Err(Error::AlreadyStopped)
        ));
    }
}
