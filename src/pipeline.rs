//! The edit pipeline
//!
//! Stages run in a fixed order (rotate, replace, footer), each over the whole
//! document before the next begins. Any stage error aborts the run, and
//! [`edit_pdf`] only writes the output once every stage has succeeded.

use std::path::PathBuf;
use tracing::info;
use crate::error::Result;
use crate::layout::Rect;
use crate::pdf::{
    FooterSpec, FooterStage, PdfDocument, ReplaceStage, ReplacementSpec, RotateStage, RotationSpec,
};

/// One transformation over a whole document
pub trait Stage {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Transform the document in place
    fn apply(&self, doc: &mut PdfDocument) -> Result<StageOutcome>;
}

/// What a stage did. Skipped pages and zero matches are reported here rather
/// than raised as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Rotated {
        /// (page, new rotation) for every page that was rotated
        rotated: Vec<(u32, i64)>,
        /// Requested pages that do not exist in the document
        skipped: Vec<u32>,
    },
    Replaced {
        /// Total occurrences replaced across all pages
        replacements: usize,
        /// Pages that have no content stream at all
        pages_without_content: Vec<u32>,
    },
    Footer {
        /// Where the image was drawn on each page
        placements: Vec<(u32, Rect)>,
    },
}

/// Outcome of a whole pipeline run
#[derive(Debug, Clone, Default)]
pub struct EditReport {
    /// Number of pages in the document
    pub page_count: usize,
    /// Stage name and outcome, in execution order
    pub outcomes: Vec<(&'static str, StageOutcome)>,
}

impl EditReport {
    /// Rotation ordinals that were ignored because they are out of range
    pub fn skipped_rotations(&self) -> &[u32] {
        self.outcomes
            .iter()
            .find_map(|(_, outcome)| match outcome {
                StageOutcome::Rotated { skipped, .. } => Some(skipped.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Number of replacements made, or `None` if the replace stage did not run
    pub fn replacement_count(&self) -> Option<usize> {
        self.outcomes.iter().find_map(|(_, outcome)| match outcome {
            StageOutcome::Replaced { replacements, .. } => Some(*replacements),
            _ => None,
        })
    }

    /// Number of pages that received the footer image
    pub fn footer_pages(&self) -> usize {
        self.outcomes
            .iter()
            .find_map(|(_, outcome)| match outcome {
                StageOutcome::Footer { placements } => Some(placements.len()),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// Options for one edit run
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Source PDF
    pub input: PathBuf,
    /// Destination PDF, created or overwritten
    pub output: PathBuf,
    /// Pages to rotate
    pub rotate: Option<RotationSpec>,
    /// Bytes to replace in content streams
    pub replace: Option<ReplacementSpec>,
    /// Footer image to stamp on every page
    pub footer: Option<FooterSpec>,
}

impl EditOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }
}

/// Ordered list of stages folded over a document
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; stages run in the order they were added
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Build the enabled stages in their fixed order: rotate, replace, footer.
    ///
    /// The footer image is read here, so a bad image is reported before any
    /// page is modified.
    pub fn from_options(options: &EditOptions) -> Result<Self> {
        let mut pipeline = Self::new();

        if let Some(ref spec) = options.rotate {
            pipeline = pipeline.with_stage(RotateStage::new(spec.clone()));
        }
        if let Some(ref spec) = options.replace {
            pipeline = pipeline.with_stage(ReplaceStage::new(spec.clone()));
        }
        if let Some(ref spec) = options.footer {
            pipeline = pipeline.with_stage(FooterStage::new(spec)?);
        }

        Ok(pipeline)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage over `doc`, stopping at the first error
    pub fn run(&self, doc: &mut PdfDocument) -> Result<EditReport> {
        let mut report = EditReport {
            page_count: doc.page_count(),
            outcomes: Vec::with_capacity(self.stages.len()),
        };

        for stage in &self.stages {
            info!(stage = stage.name(), "Running stage");
            let outcome = stage.apply(doc)?;
            report.outcomes.push((stage.name(), outcome));
        }

        Ok(report)
    }
}

/// Load `options.input`, apply the requested edits and write `options.output`.
///
/// Nothing is written unless loading and every stage succeed.
///
/// # Example
///
/// ```no_run
/// use pdf_editor::{edit_pdf, EditOptions};
/// use pdf_editor::pdf::{FooterSpec, ReplacementSpec};
///
/// let mut options = EditOptions::new("document.pdf", "fixed.pdf");
/// options.rotate = Some("1:90,3:180".parse().unwrap());
/// options.replace = Some(ReplacementSpec::new("team-wiki.local", "team-wiki.etc.com").unwrap());
/// options.footer = Some(FooterSpec::new("logo.png"));
///
/// let report = edit_pdf(&options).expect("Failed to edit PDF");
/// println!("{} replacements", report.replacement_count().unwrap_or(0));
/// ```
pub fn edit_pdf(options: &EditOptions) -> Result<EditReport> {
    let mut doc = PdfDocument::load(&options.input)?;
    let pipeline = Pipeline::from_options(options)?;

    let report = pipeline.run(&mut doc)?;
    doc.save(&options.output)?;

    info!(
        input = %options.input.display(),
        output = %options.output.display(),
        stages = ?pipeline.stage_names(),
        "Edit complete"
    );
    Ok(report)
}
