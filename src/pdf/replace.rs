//! Literal byte replacement in page content streams
//!
//! Matching is done on the raw (decompressed) content stream bytes. There is no
//! awareness of fonts, encodings or text layout: a string drawn with a custom
//! encoding, split across several text operators, or rendered as an image will
//! not be found. Finding nothing is not an error.

use std::collections::BTreeSet;
use lopdf::Object;
use tracing::{debug, info, warn};
use crate::error::{Error, Result};
use crate::pdf::document::PdfDocument;
use crate::pipeline::{Stage, StageOutcome};

/// Bytes to search for and the bytes to put in their place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementSpec {
    old: Vec<u8>,
    new: Vec<u8>,
}

impl ReplacementSpec {
    /// `old` must not be empty
    pub fn new(old: impl Into<Vec<u8>>, new: impl Into<Vec<u8>>) -> Result<Self> {
        let old = old.into();
        if old.is_empty() {
            return Err(Error::InvalidReplacement(
                "text to replace must not be empty".to_string(),
            ));
        }
        Ok(Self { old, new: new.into() })
    }

    pub fn old(&self) -> &[u8] {
        &self.old
    }

    pub fn new_bytes(&self) -> &[u8] {
        &self.new
    }
}

/// Replace every non-overlapping occurrence of `old`, scanning left to right.
///
/// Returns the rewritten bytes and the number of replacements made.
pub fn replace_bytes(haystack: &[u8], old: &[u8], new: &[u8]) -> (Vec<u8>, usize) {
    if old.is_empty() || haystack.len() < old.len() {
        return (haystack.to_vec(), 0);
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut count = 0;
    let mut i = 0;

    while i + old.len() <= haystack.len() {
        if &haystack[i..i + old.len()] == old {
            out.extend_from_slice(new);
            i += old.len();
            count += 1;
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out.extend_from_slice(&haystack[i..]);

    (out, count)
}

/// Applies a `ReplacementSpec` to the content of every page
#[derive(Debug, Clone)]
pub struct ReplaceStage {
    spec: ReplacementSpec,
}

impl ReplaceStage {
    pub fn new(spec: ReplacementSpec) -> Self {
        Self { spec }
    }
}

impl Stage for ReplaceStage {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn apply(&self, doc: &mut PdfDocument) -> Result<StageOutcome> {
        let mut replacements = 0;
        let mut pages_without_content = Vec::new();
        // A stream shared by several pages is rewritten once
        let mut visited = BTreeSet::new();

        for (ordinal, page_id) in doc.page_ids() {
            let stream_ids = doc.content_stream_ids(page_id)?;
            if stream_ids.is_empty() {
                pages_without_content.push(ordinal);
                continue;
            }

            let mut page_replacements = 0;
            for stream_id in stream_ids {
                if !visited.insert(stream_id) {
                    continue;
                }

                let stream = match doc.inner_mut().get_object_mut(stream_id) {
                    Ok(Object::Stream(stream)) => stream,
                    _ => continue,
                };

                let plain = match stream.decompressed_content() {
                    Ok(data) => data,
                    Err(_) => stream.content.clone(),
                };

                let (rewritten, count) = replace_bytes(&plain, &self.spec.old, &self.spec.new);
                if count > 0 {
                    stream.set_plain_content(rewritten);
                    page_replacements += count;
                }
            }

            debug!(page = ordinal, replacements = page_replacements, "Page scanned");
            replacements += page_replacements;
        }

        if replacements == 0 {
            warn!(
                old = %String::from_utf8_lossy(&self.spec.old),
                "No occurrences found; text may be encoded differently or stored as images"
            );
        } else {
            info!(replacements, "Replacement complete");
        }

        Ok(StageOutcome::Replaced { replacements, pages_without_content })
    }
}
