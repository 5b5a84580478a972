//! Page rotation
//!
//! Rotation is applied through the page's `/Rotate` entry, so it is lossless:
//! no content is redrawn and repeated rotations simply add up modulo 360.

use std::collections::BTreeMap;
use std::str::FromStr;
use lopdf::Object;
use tracing::{debug, info, warn};
use crate::error::{Error, Result};
use crate::pdf::document::PdfDocument;
use crate::pipeline::{Stage, StageOutcome};

/// Page ordinal (1-based) to rotation angle in degrees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationSpec {
    angles: BTreeMap<u32, i64>,
}

impl RotationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the angle for one page.
    ///
    /// Angles must be multiples of 90; negative angles rotate counter-clockwise.
    pub fn insert(&mut self, ordinal: u32, angle: i64) -> Result<()> {
        if ordinal == 0 {
            return Err(Error::InvalidRotationSpec(
                "page numbers start at 1".to_string(),
            ));
        }
        if angle % 90 != 0 {
            return Err(Error::InvalidRotationSpec(format!(
                "angle for page {} must be a multiple of 90, got {}",
                ordinal, angle
            )));
        }
        self.angles.insert(ordinal, angle);
        Ok(())
    }

    /// Normalized angle for a page, if one was given
    pub fn angle_for(&self, ordinal: u32) -> Option<i64> {
        self.angles.get(&ordinal).map(|a| a.rem_euclid(360))
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Entries as (ordinal, normalized angle), ordered by page
    pub fn entries(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.angles.iter().map(|(&p, &a)| (p, a.rem_euclid(360)))
    }
}

impl FromStr for RotationSpec {
    type Err = Error;

    /// Parse `"<page>:<angle>[,<page>:<angle>...]"`, e.g. `"1:90,3:180"`.
    /// A page listed twice keeps the last angle.
    fn from_str(s: &str) -> Result<Self> {
        let mut spec = RotationSpec::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (page, angle) = entry.split_once(':').ok_or_else(|| {
                Error::InvalidRotationSpec(format!("expected <page>:<angle>, got '{}'", entry))
            })?;

            let page: u32 = page.trim().parse().map_err(|_| {
                Error::InvalidRotationSpec(format!("invalid page number '{}'", page.trim()))
            })?;
            let angle: i64 = angle.trim().parse().map_err(|_| {
                Error::InvalidRotationSpec(format!("invalid angle '{}'", angle.trim()))
            })?;

            spec.insert(page, angle)?;
        }

        if spec.is_empty() {
            return Err(Error::InvalidRotationSpec("no pages given".to_string()));
        }

        Ok(spec)
    }
}

/// Adds the requested angle to each named page's rotation
#[derive(Debug, Clone)]
pub struct RotateStage {
    spec: RotationSpec,
}

impl RotateStage {
    pub fn new(spec: RotationSpec) -> Self {
        Self { spec }
    }
}

impl Stage for RotateStage {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn apply(&self, doc: &mut PdfDocument) -> Result<StageOutcome> {
        let page_count = doc.page_count();
        let mut rotated = Vec::new();
        let mut skipped = Vec::new();

        for (ordinal, angle) in self.spec.entries() {
            let page_id = match doc.page_id(ordinal) {
                Some(id) => id,
                None => {
                    warn!(page = ordinal, page_count, "Rotation skipped: page out of range");
                    skipped.push(ordinal);
                    continue;
                }
            };

            let current = doc.page_rotation(page_id);
            let new_rotation = (current + angle).rem_euclid(360);

            // Written on the page itself so it overrides any inherited value
            let page_dict = doc.inner_mut().get_dictionary_mut(page_id)?;
            page_dict.set("Rotate", Object::Integer(new_rotation));

            debug!(page = ordinal, current, new_rotation, "Page rotated");
            rotated.push((ordinal, new_rotation));
        }

        info!(rotated = rotated.len(), skipped = skipped.len(), "Rotation complete");
        Ok(StageOutcome::Rotated { rotated, skipped })
    }
}
