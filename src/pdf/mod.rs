//! PDF manipulation module

pub mod document;
pub mod rotate;
pub mod replace;
pub mod footer;
pub mod footer_image;

// Re-export commonly used items
pub use document::{PageInfo, PdfDocument, PdfMetadata};
pub use rotate::{RotateStage, RotationSpec};
pub use replace::{replace_bytes, ReplaceStage, ReplacementSpec};
pub use footer::{FooterSpec, FooterStage};
pub use footer_image::FooterImage;
