//! PDF Editor Library
//!
//! Edits an existing PDF in a single pass. The library can:
//! - Rotate selected pages (lossless, via the page's `/Rotate` entry)
//! - Replace literal text, such as an old URL, in page content streams
//! - Stamp a small footer logo in the bottom-right corner of every page
//!
//! Text replacement works on raw content stream bytes. Text drawn with a
//! custom font encoding, split across operators, or stored as images (for
//! example in scanned documents) is not matched.
//!
//! # Example
//!
//! ```no_run
//! use pdf_editor::{edit_pdf, EditOptions};
//! use pdf_editor::pdf::ReplacementSpec;
//!
//! let mut options = EditOptions::new("document.pdf", "fixed.pdf");
//! options.rotate = Some("2:90".parse().unwrap());
//! options.replace = Some(ReplacementSpec::new("team-wiki.local", "team-wiki.etc.com").unwrap());
//!
//! edit_pdf(&options).expect("Failed to edit PDF");
//! ```

pub mod error;
pub mod layout;
pub mod pdf;
pub mod pipeline;

// Re-export commonly used items
pub use error::{Error, Result};
pub use pipeline::{edit_pdf, EditOptions, EditReport, Pipeline, Stage, StageOutcome};
