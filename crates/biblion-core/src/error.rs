//! Library error handling
//!
//! Typed errors for library operations, with I/O failures classified by
//! kind so the CLI can print a recovery suggestion.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, standardizing or writing references
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Failed to create a directory
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File not found (when expected to exist)
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    /// A .bib file held no entry at all
    #[error("No BibTeX entry found in '{path}'")]
    EmptyBibFile { path: PathBuf },

    /// Every suffix from 'a' to 'z' is taken for a key base
    #[error("Citation key space exhausted for '{base}': suffixes a-z are all taken")]
    KeySpaceExhausted { base: String },

    /// Note template could not be used
    #[error("Invalid note template '{path}': {details}")]
    InvalidTemplate { path: PathBuf, details: String },
}

impl LibraryError {
    /// Create an error from a failed read, classified by kind
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => LibraryError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => LibraryError::NotFound { path },
            _ => LibraryError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Create an error from a failed write, classified by kind
    pub fn from_write(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => LibraryError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => LibraryError::NotFound { path },
            _ if is_disk_full_error(&error) => LibraryError::DiskFull {
                path,
                source: error,
            },
            _ => LibraryError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            LibraryError::DiskFull { .. } => Some("Free up disk space and try again."),
            LibraryError::PermissionDenied { .. } => {
                Some("Check file and directory permissions of the library and source folders.")
            }
            LibraryError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            LibraryError::KeySpaceExhausted { .. } => {
                Some("Rename or merge some of the colliding references in the library folder.")
            }
            LibraryError::EmptyBibFile { .. } => {
                Some("Check that the file holds at least one '@type{key,' entry.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for library operations
pub type LibraryResult<T> = Result<T, LibraryError>;
