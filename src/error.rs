//! Error types for chmview operations.

use std::fmt;

use thiserror::Error;

/// Errors that abort a container read or an adaptation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("invalid entry name: {0}")]
    InvalidEntryName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A recoverable anomaly noticed while adapting a page.
///
/// Diagnostics never fail the call. They travel with the
/// [`AdaptedDocument`](crate::AdaptedDocument) so a host can surface them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Diagnostic {
    /// The parser recovered from this many markup errors.
    MalformedMarkup { count: usize },

    /// An archive-relative reference names an entry the container does not have.
    DanglingReference { attribute: String, reference: String },

    /// The entry is listed but could not be read or embedded.
    UnreadableResource { entry: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedMarkup { count } => {
                write!(f, "recovered from {count} markup error(s)")
            }
            Diagnostic::DanglingReference {
                attribute,
                reference,
            } => write!(f, "dangling reference in {attribute}: {reference}"),
            Diagnostic::UnreadableResource { entry, reason } => {
                write!(f, "could not embed {entry}: {reason}")
            }
        }
    }
}
