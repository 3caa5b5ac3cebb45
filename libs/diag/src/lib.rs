//! Structured diagnostics: rich-text print records, the console sink,
//! exceptions with captured context and the bounded-history logger.
//!
//! A [`PrintRecord`] is the unit of diagnostic text everywhere in the
//! runtime: log entries, exception messages and console output are all
//! records. Records accumulate indent levels cheaply and expand them into
//! leading spaces once, at [finalisation](PrintRecord::finalized).

mod console;
mod exception;
mod format;
mod logger;
mod record;
mod source_location;
mod stack_trace;
mod theme;

pub use console::console_print;
pub use exception::{Exception, throw, throw_record};
pub use format::{FormatArg, ToFormatArg, format_text};
pub use logger::{LogEntry, LogSeverity, Logger, LoggerCreateInfo};
pub use record::{
    PrintRecord, PrintSection, record, record_argument, record_source_location, record_themed,
};
pub use source_location::SourceLocation;
pub use stack_trace::StackTrace;
pub use theme::{PrintColor, Theme};
