//! Forwarding of store log records to a host-provided logger.

use std::sync::{Arc, OnceLock};

/// Receiver for log messages emitted by the audit store.
///
/// Implement this in the host language and register it once with [`set_logger`].
///
/// # Examples
///
/// ```rust
/// use auditkit::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// object AuditLogBridge : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Timber.tag("auditkit").log(level.toPriority(), message)
///     }
/// }
///
/// setLogger(AuditLogBridge) // once, at startup
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing, e.g. failed category checks on reads.
    Trace,
    /// Per-record debugging information.
    Debug,
    /// Progress information.
    Info,
    /// Rejected writes and clock regressions.
    Warn,
    /// Errors.
    Error,
}

/// `log::Log` implementation that hands records to the registered [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        // Debug and trace output from dependencies is noise for the host app.
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded when they come from `auditkit` crates.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_from_auditkit =
        module_path.is_some_and(|module_path| module_path.starts_with("auditkit"));
    let is_debug_or_trace = level == log::Level::Debug || level == log::Level::Trace;
    is_from_auditkit || !is_debug_or_trace
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Only the first call takes effect; later calls print a notice and return.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        println!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarding_filter() {
        assert!(should_forward(log::Level::Debug, Some("auditkit_core::store")));
        assert!(should_forward(log::Level::Trace, Some("auditkit::audit_log")));
        assert!(!should_forward(log::Level::Debug, Some("tokio::sync")));
        assert!(!should_forward(log::Level::Trace, None));
        assert!(should_forward(log::Level::Warn, Some("tokio::sync")));
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(log_level(log::Level::Warn), LogLevel::Warn);
        assert_eq!(log_level(log::Level::Trace), LogLevel::Trace);
    }
}
