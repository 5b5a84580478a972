//! Error types for the PDF editor library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF editor library
#[derive(Error, Debug)]
pub enum Error {
    /// Input file not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input could not be read or parsed as a PDF
    #[error("Failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Footer image missing, unreadable or in an unsupported format
    #[error("Footer image {}: {reason}", path.display())]
    Overlay { path: PathBuf, reason: String },

    /// Output could not be written
    #[error("Failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// Malformed --rotate argument
    #[error("Invalid rotation spec: {0}")]
    InvalidRotationSpec(String),

    /// Malformed --replace-url argument
    #[error("Invalid replacement: {0}")]
    InvalidReplacement(String),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No PDF files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// PDF structure error while editing
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

impl Error {
    /// Name of the pipeline stage the error belongs to, for user-facing messages
    pub fn stage(&self) -> &'static str {
        match self {
            Error::FileNotFound(_) | Error::Load { .. } | Error::EmptyPdf(_) => "load",
            Error::Overlay { .. } => "footer",
            Error::Write { .. } => "write",
            Error::InvalidRotationSpec(_)
            | Error::InvalidReplacement(_)
            | Error::InvalidGlob(_)
            | Error::NoFilesMatched(_) => "arguments",
            Error::Pdf(_) => "edit",
        }
    }
}
