//! Leveled logging macros, the public entry points
//!
//! Each macro captures the caller's identity with `callsite!` before
//! handing off to the logger core, so records name the function that
//! logged, not the logger internals.

/// Log at FATAL severity, never gated. The second argument is the crash
/// flag: `true` terminates the process abnormally after the record is
/// written.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $crash:expr, $($arg:tt)+) => {
        $logger.fatal_at(&format!($($arg)+), $crash, $crate::callsite!())
    };
}

/// Log at ERROR severity.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.error_at(&format!($($arg)+), $crate::callsite!())
    };
}

/// Log an error with its underlying cause at ERROR severity. The cause is
/// an `Option<&E>`; passing `None` yields `Error::MissingCause` and emits
/// nothing.
#[macro_export]
macro_rules! exception {
    ($logger:expr, $err:expr, $($arg:tt)+) => {
        $logger.exception_at(
            &format!($($arg)+),
            $err.map(|e| e as &dyn ::std::error::Error),
            $crate::callsite!(),
        )
    };
}

/// Log at WARNING severity.
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $logger.warning_at(&format!($($arg)+), $crate::callsite!())
    };
}

/// Log at INFO severity.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.info_at(&format!($($arg)+), $crate::callsite!())
    };
}

/// Log at DEBUG severity.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.debug_at(&format!($($arg)+), $crate::callsite!())
    };
}
