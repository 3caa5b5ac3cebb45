use core::fmt;

use ember_linear::List;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::console::console_print;
use crate::exception::Exception;
use crate::record::{PrintRecord, record, record_argument, record_themed};
use crate::theme::Theme;

/// Report severities, ordered weakest to strongest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Verbose,
    Debug,
    Info,
    PerformanceWarning,
    Warning,
    Error,
    CriticalError,
}

impl LogSeverity {
    pub fn name(self) -> &'static str {
        match self {
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::PerformanceWarning => "PERFORMANCE_WARNING",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::CriticalError => "CRITICAL_ERROR",
        }
    }

    pub fn theme(self) -> Theme {
        match self {
            Self::Verbose => Theme::VERBOSE,
            Self::Debug => Theme::DEBUG,
            Self::Info => Theme::INFO,
            Self::PerformanceWarning => Theme::PERFORMANCE_WARNING,
            Self::Warning => Theme::WARNING,
            Self::Error => Theme::ERROR,
            Self::CriticalError => Theme::CRITICAL_ERROR,
        }
    }
}

impl fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One recorded log message.
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub message: PrintRecord,
}

/// Construction parameters of a [`Logger`].
#[derive(Copy, Clone, Debug)]
pub struct LoggerCreateInfo {
    /// Fixed capacity of the in-memory history.
    pub log_history_size: usize,
    /// Entries below this severity are not recorded. `CriticalError` is
    /// always recorded.
    pub minimum_report_severity: LogSeverity,
    /// Entries below this severity are recorded but not forwarded to the
    /// console. `Error` and above are always forwarded.
    pub minimum_display_severity: LogSeverity,
    /// Master kill-switch; a disabled logger drops everything.
    pub disabled: bool,
    /// Opt-in for the console sink.
    pub print_to_system_console: bool,
}

impl Default for LoggerCreateInfo {
    fn default() -> Self {
        Self {
            log_history_size: 256,
            minimum_report_severity: LogSeverity::Verbose,
            minimum_display_severity: LogSeverity::Info,
            disabled: false,
            print_to_system_console: false,
        }
    }
}

struct LoggerState {
    history: List<LogEntry>,
    recorded_total: u64,
}

/// Thread-safe logger with a bounded in-memory history and optional console
/// forwarding.
///
/// All recording runs under one internal mutex; any thread may log.
pub struct Logger {
    create_info: LoggerCreateInfo,
    state: Mutex<LoggerState>,
}

impl Logger {
    #[must_use]
    pub fn new(create_info: LoggerCreateInfo) -> Self {
        Self {
            create_info,
            state: Mutex::new(LoggerState {
                history: List::with_capacity(create_info.log_history_size),
                recorded_total: 0,
            }),
        }
    }

    pub fn verbose(&self, message: PrintRecord) {
        self.log(LogSeverity::Verbose, message);
    }

    pub fn debug(&self, message: PrintRecord) {
        self.log(LogSeverity::Debug, message);
    }

    pub fn info(&self, message: PrintRecord) {
        self.log(LogSeverity::Info, message);
    }

    pub fn performance_warning(&self, message: PrintRecord) {
        self.log(LogSeverity::PerformanceWarning, message);
    }

    pub fn warning(&self, message: PrintRecord) {
        self.log(LogSeverity::Warning, message);
    }

    pub fn error(&self, message: PrintRecord) {
        self.log(LogSeverity::Error, message);
    }

    pub fn critical_error(&self, message: PrintRecord) {
        self.log(LogSeverity::CriticalError, message);
    }

    /// Records `message` under `severity`, evicting the oldest entry when
    /// the history is full, and forwards it to the console when the
    /// severity clears the display threshold.
    pub fn log(&self, severity: LogSeverity, message: PrintRecord) {
        if self.create_info.disabled {
            return;
        }
        self.push_entry(LogEntry { severity, message });
    }

    /// Records an exception chain: one titled block per link, outermost
    /// first, each message indented under its `Exception <n>` header.
    pub fn log_exception(&self, severity: LogSeverity, exception: &Exception) {
        if self.create_info.disabled {
            return;
        }

        let mut message = PrintRecord::new();
        for (counter, link) in exception.chain().enumerate() {
            let mut block = record_argument("Exception", counter);
            block.append(&record("\n"));

            let mut body = link.message().clone();
            body.add_indent(1);
            block.append(&body);
            block.append(&record("\n"));

            message.append(&block);
        }
        self.push_entry(LogEntry { severity, message });
    }

    fn push_entry(&self, entry: LogEntry) {
        // Debug-severity reports do not exist outside development builds.
        if !cfg!(debug_assertions) && entry.severity == LogSeverity::Debug {
            return;
        }

        let mut state = self.state.lock();

        if entry.severity < LogSeverity::CriticalError
            && entry.severity < self.create_info.minimum_report_severity
        {
            return;
        }

        if state.history.len() == self.create_info.log_history_size {
            state.history.erase(0);
        }
        state.history.push_back(entry.clone());
        state.recorded_total += 1;

        if entry.severity < LogSeverity::Error
            && entry.severity < self.create_info.minimum_display_severity
        {
            return;
        }
        if !self.create_info.print_to_system_console {
            return;
        }

        let mut printed = record("\n\n");
        printed.append(&record_themed(entry.severity.name(), entry.severity.theme()));
        printed.append(&record("\n"));

        let mut body = entry.message;
        body.add_indent(1);
        printed.append(&body);

        console_print(&printed);
    }

    /// Borrows the recorded history, oldest entry first. The guard holds
    /// the logger mutex; drop it promptly.
    pub fn log_history(&self) -> MappedMutexGuard<'_, List<LogEntry>> {
        MutexGuard::map(self.state.lock(), |state| &mut state.history)
    }

    /// Total entries recorded over the logger's lifetime, monotonic.
    pub fn recorded_total(&self) -> u64 {
        self.state.lock().recorded_total
    }
}
