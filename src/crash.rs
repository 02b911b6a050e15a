//! Crash reports appended to a log file.
//!
//! A last-resort record of why the run died: the error that escaped `main`,
//! or a panic. Nothing here tries to recover.

use std::{
    any::Any,
    backtrace::{Backtrace, BacktraceStatus},
    fmt::Write as _,
    fs::OpenOptions,
    io::{self, Write},
    panic::PanicHookInfo,
    path::{Path, PathBuf},
};

use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tracing::error;

use crate::Error;

const TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
);

#[derive(Debug, Clone)]
pub struct CrashReport {
    pub timestamp: OffsetDateTime,
    pub kind: String,
    pub message: String,
    /// Rendered backtrace, empty if none was captured
    pub backtrace: String,
}

impl CrashReport {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
            kind: kind.into(),
            message: message.into(),
            backtrace: String::new(),
        }
    }

    pub fn with_backtrace(mut self, backtrace: &Backtrace) -> Self {
        if backtrace.status() == BacktraceStatus::Captured {
            self.backtrace = backtrace.to_string();
        }
        self
    }

    /// Report an error that escaped the run, with its whole cause chain.
    ///
    /// Uses the backtrace `anyhow` captured at the error's origin when there
    /// is one, otherwise captures one here regardless of `RUST_BACKTRACE`.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let kind = err.downcast_ref::<Error>().map(Error::kind).unwrap_or("Error");
        let report = Self::new(kind, format!("{err:#}"));
        let backtrace = err.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            report.with_backtrace(backtrace)
        } else {
            report.with_backtrace(&Backtrace::force_capture())
        }
    }

    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let mut message = panic_message(info.payload());
        if let Some(location) = info.location() {
            let _ = write!(message, " at {location}");
        }
        Self::new("panic", message).with_backtrace(&Backtrace::force_capture())
    }

    pub fn render(&self) -> String {
        let timestamp = self
            .timestamp
            .format(TIMESTAMP)
            .unwrap_or_else(|_| self.timestamp.to_string());
        let mut out = format!("{timestamp}\n{}\n{}\n", self.kind, self.message);
        if self.backtrace.is_empty() {
            out.push_str("(no backtrace available)\n");
        } else {
            out.push_str(&self.backtrace);
            if !self.backtrace.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push('\n');
        out
    }
}

/// The text of a panic payload, for the two payload types `panic!` produces.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Appends [`CrashReport`]s to a file, one per failure.
#[derive(Debug, Clone)]
pub struct CrashReporter {
    path: PathBuf,
}

impl CrashReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, report: &CrashReport) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(report.render().as_bytes())
    }

    /// Log and record an error that is about to end the process.
    pub fn report_error(&self, err: &anyhow::Error) {
        error!("{err:#}");
        if let Err(io_err) = self.write(&CrashReport::from_error(err)) {
            error!(
                "failed to write crash report to {}: {io_err}",
                self.path.display()
            );
        }
    }

    /// Record every panic before the previously installed hook runs.
    pub fn install_panic_hook(&self) {
        let reporter = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Err(io_err) = reporter.write(&CrashReport::from_panic(info)) {
                eprintln!(
                    "failed to write crash report to {}: {io_err}",
                    reporter.path.display()
                );
            }
            previous(info);
        }));
    }
}
