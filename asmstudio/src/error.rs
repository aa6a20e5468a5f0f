//! The `error` module defines [`StudioError`], the error type shared by the document
//! session, the assembly pipeline, export and the background worker.
//!
//! HEX parsing problems are recovered locally by `ihexlib` and only show up here when
//! a caller asks for them explicitly. Assembly and I/O problems are always surfaced.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// Error reported by the HEX codec, e.g. a malformed record or record width
    MalformedRecord(ihexlib::IntelHexError),
    /// The assembler answered with an `ERROR` string, kept verbatim
    AssemblyFailure(String),
    /// Reading an include or writing an export failed
    IoFailure { context: String, message: String },
    /// Nothing but whitespace to assemble
    EmptySource,
    InvalidDocumentName(String),
    UnknownDocument(String),
    /// Export was requested before any successful assembly
    NothingToExport,
    TaskPanicked(String),
    WorkerClosed,
}

impl StudioError {
    /// Wrap an I/O error together with what was being done at the time.
    pub fn io(context: impl Into<String>, err: &std::io::Error) -> Self {
        Self::IoFailure {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord(err) => write!(f, "{err}"),
            Self::AssemblyFailure(text) => write!(f, "{text}"),
            Self::IoFailure { context, message } => write!(f, "{context}: {message}"),
            Self::EmptySource => write!(f, "Source is empty, nothing to assemble"),
            Self::InvalidDocumentName(name) => write!(f, "Invalid document name: '{name}'"),
            Self::UnknownDocument(name) => write!(f, "No open document named '{name}'"),
            Self::NothingToExport => write!(f, "Nothing to export, assemble successfully first"),
            Self::TaskPanicked(msg) => write!(f, "Background task panicked: {msg}"),
            Self::WorkerClosed => write!(f, "Background worker is no longer running"),
        }
    }
}

impl Error for StudioError {}

impl From<ihexlib::IntelHexError> for StudioError {
    fn from(err: ihexlib::IntelHexError) -> Self {
        Self::MalformedRecord(err)
    }
}
