use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Severity of an [`ErrorRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorLevel {
    /// The input could not be read, but nothing about its content is known.
    Warning,
    /// The input could be read but not decoded.
    Error,
    /// The input is not well-formed xml.
    Fatal,
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLevel::Warning => write!(f, "warning"),
            ErrorLevel::Error => write!(f, "error"),
            ErrorLevel::Fatal => write!(f, "fatal"),
        }
    }
}

/// A structured load error. Produced by the parser, never by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub level: ErrorLevel,
    pub message: String,
    /// 1-based. `0` when the error is not tied to a position, e.g. a missing file.
    pub line: usize,
    /// 1-based byte column. `0` when the error is not tied to a position.
    pub column: usize,
    pub file: Option<PathBuf>,
}

impl ErrorRecord {
    pub(crate) fn new<S: Into<String>>(level: ErrorLevel, message: S) -> ErrorRecord {
        ErrorRecord {
            level,
            message: message.into(),
            line: 0,
            column: 0,
            file: None,
        }
    }

    /// Set `line` and `column` from a byte offset into `text`.
    pub(crate) fn at_offset(mut self, text: &str, offset: usize) -> ErrorRecord {
        let bytes = text.as_bytes();
        let offset = offset.min(bytes.len());
        let before = &bytes[..offset];
        self.line = before.iter().filter(|b| **b == b'\n').count() + 1;
        self.column = match before.iter().rposition(|b| *b == b'\n') {
            Some(pos) => offset - pos,
            None => offset + 1,
        };
        self
    }

    pub(crate) fn in_file<P: Into<PathBuf>>(mut self, path: P) -> ErrorRecord {
        self.file = Some(path.into());
        self
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), 0) => write!(f, "{}: ", file.display())?,
            (Some(file), line) => write!(f, "{}:{}:{}: ", file.display(), line, self.column)?,
            (None, 0) => {}
            (None, line) => write!(f, "{}:{}: ", line, self.column)?,
        }
        write!(f, "{} {}", self.level, self.message)
    }
}

/// Collects [`ErrorRecord`]s produced while loading xml.
///
/// By default errors surface immediately: they are emitted as `tracing`
/// warnings and returned to the caller, but not kept. With
/// [`ErrorLog::use_internal_errors`] enabled, they are also stored here
/// until cleared.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    internal: bool,
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    pub fn new() -> ErrorLog {
        ErrorLog::default()
    }

    /// Remove all stored errors.
    pub fn clear_errors(&mut self) {
        self.records.clear();
    }

    /// Stored errors, oldest first.
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.records.last()
    }

    /// Switch between collecting errors and surfacing them immediately.
    /// Clears all stored errors and returns the previous mode.
    pub fn use_internal_errors(&mut self, enabled: bool) -> bool {
        self.clear_errors();
        std::mem::replace(&mut self.internal, enabled)
    }

    pub fn is_collecting(&self) -> bool {
        self.internal
    }

    pub(crate) fn report(&mut self, record: &ErrorRecord) {
        if self.internal {
            debug!(%record, "collected xml error");
            self.records.push(record.clone());
        } else {
            warn!(%record, "xml error");
        }
    }
}
