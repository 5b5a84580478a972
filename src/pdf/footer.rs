//! Footer logo overlay
//!
//! For each page a Form XObject the size of the page is synthesized that draws
//! the footer image at a fixed offset from the bottom-right corner. The page's
//! existing content is wrapped in `q`/`Q` so any transformation it leaves
//! behind cannot move the overlay, and a content stream invoking the overlay is
//! appended so it is drawn on top.

use std::path::PathBuf;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};
use crate::error::Result;
use crate::layout::{FooterPlacement, PageBox, Rect};
use crate::pdf::document::{inherited_attribute, resolve, PdfDocument};
use crate::pdf::footer_image::FooterImage;
use crate::pipeline::{Stage, StageOutcome};

/// Resource name of the image inside each overlay
const IMAGE_NAME: &str = "Logo";

/// Preferred resource name of the overlay on each page
const OVERLAY_NAME: &str = "FooterOverlay";

/// Footer image file and where to put it
#[derive(Debug, Clone)]
pub struct FooterSpec {
    pub image_path: PathBuf,
    pub placement: FooterPlacement,
}

impl FooterSpec {
    /// Footer with the default 30pt placement
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            placement: FooterPlacement::default(),
        }
    }
}

/// Stamps the footer image onto every page
#[derive(Debug, Clone)]
pub struct FooterStage {
    image: FooterImage,
    placement: FooterPlacement,
}

impl FooterStage {
    /// Reads and decodes the image up front, so a bad image fails before any
    /// page is touched
    pub fn new(spec: &FooterSpec) -> Result<Self> {
        let image = FooterImage::open(&spec.image_path)?;
        Ok(Self::with_image(image, spec.placement))
    }

    pub fn with_image(image: FooterImage, placement: FooterPlacement) -> Self {
        Self { image, placement }
    }
}

impl Stage for FooterStage {
    fn name(&self) -> &'static str {
        "footer"
    }

    fn apply(&self, doc: &mut PdfDocument) -> Result<StageOutcome> {
        // One image object shared by every page's overlay
        let image_id = self.image.embed(doc.inner_mut());
        let mut placements = Vec::new();

        for (ordinal, page_id) in doc.page_ids() {
            let page_box = doc.page_box(page_id);
            let rect = self.placement.rect_in(&page_box);

            if !page_box.contains(&rect) {
                debug!(page = ordinal, ?page_box, "Footer image extends past the page edge");
            }

            let has_content = !doc.content_stream_ids(page_id)?.is_empty();
            let pdf = doc.inner_mut();

            let overlay_id = create_overlay_xobject(pdf, &page_box, &rect, image_id);
            let name = add_xobject_to_page_resources(pdf, page_id, overlay_id)?;

            if has_content {
                isolate_page_content(pdf, page_id)?;
            }

            let invoke_content = format!("q\n/{} Do\nQ\n", name);
            let invoke_id = pdf.add_object(Stream::new(Dictionary::new(), invoke_content.into_bytes()));
            append_content_to_page(pdf, page_id, invoke_id)?;

            debug!(page = ordinal, x = rect.x, y = rect.y, "Footer overlay added");
            placements.push((ordinal, rect));
        }

        info!(pages = placements.len(), image = %self.image.path().display(), "Footer complete");
        Ok(StageOutcome::Footer { placements })
    }
}

/// Content stream that draws the image into `rect`
fn overlay_content(rect: &Rect) -> String {
    // Images occupy the unit square, so scale then translate
    format!(
        "q\n{} 0 0 {} {} {} cm\n/{} Do\nQ\n",
        rect.width, rect.height, rect.x, rect.y, IMAGE_NAME
    )
}

/// Create a Form XObject covering the page's MediaBox that draws the image
fn create_overlay_xobject(
    doc: &mut Document,
    page_box: &PageBox,
    rect: &Rect,
    image_id: ObjectId,
) -> ObjectId {
    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_NAME, Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(page_box.corners().iter().map(|&v| Object::Real(v)).collect()),
    );
    xobject_dict.set("Matrix", Object::Array(vec![
        Object::Integer(1),
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(1),
        Object::Integer(0),
        Object::Integer(0),
    ]));
    xobject_dict.set("Resources", Object::Dictionary(resources));

    doc.add_object(Object::Stream(Stream::new(
        xobject_dict,
        overlay_content(rect).into_bytes(),
    )))
}

/// Register the overlay in the page's XObject resources and return the name
/// it was given.
///
/// Inherited resources are copied onto the page first, otherwise setting a
/// page-level Resources dictionary would hide the fonts and images the page
/// inherits from the page tree.
fn add_xobject_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<String> {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(res) => match resolve(doc, res) {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        None => Dictionary::new(),
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(xo) => match resolve(doc, xo) {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };

    let name = unused_name(&xobjects, OVERLAY_NAME);
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_dict = doc.get_dictionary_mut(page_id)?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// `base`, or `base` with the smallest numeric suffix not already taken
fn unused_name(dict: &Dictionary, base: &str) -> String {
    if !dict.has(base.as_bytes()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !dict.has(candidate.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}

/// Wrap the page's existing content streams in a `q` ... `Q` pair
fn isolate_page_content(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    prepend_content_to_page(doc, page_id, save_id)?;
    append_content_to_page(doc, page_id, restore_id)
}

/// Current `/Contents` of a page as a list, dereferencing an indirect array
fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page_dict = doc.get_dictionary(page_id)?;
    let contents = match page_dict.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(arr) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };
    Ok(contents)
}

/// Prepend a content stream to a page's Contents
fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = page_contents(doc, page_id)?;
    contents.insert(0, Object::Reference(new_content_id));

    let page_dict = doc.get_dictionary_mut(page_id)?;
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}

/// Append a content stream to a page's Contents
///
/// Appended content is drawn after, and therefore on top of, the original.
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = page_contents(doc, page_id)?;
    contents.push(Object::Reference(new_content_id));

    let page_dict = doc.get_dictionary_mut(page_id)?;
    page_dict.set("Contents", Object::Array(contents));
    Ok(())
}
