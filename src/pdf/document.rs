//! Loading, inspecting and writing PDF documents
//!
//! `PdfDocument` wraps a `lopdf::Document` and gives the editing stages a page
//! oriented view of it: 1-based ordinals, effective page size and rotation, and
//! the raw bytes of each page's content streams.

use std::path::{Path, PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;
use crate::error::{Error, Result};
use crate::layout::{PageBox, PageDimensions};

/// Limit on `/Parent` hops when resolving inherited page attributes.
/// Guards against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Snapshot of one page's attributes
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    /// 1-based position in the document
    pub ordinal: u32,
    /// Object id of the page dictionary
    pub id: ObjectId,
    /// Size from the (possibly inherited) MediaBox
    pub dimensions: PageDimensions,
    /// Effective `/Rotate` value, normalized to 0, 90, 180 or 270
    pub rotation: i64,
    /// Whether the page has any content stream bytes
    pub has_content: bool,
}

/// Document information dictionary fields
#[derive(Debug, Clone, Default)]
pub struct PdfMetadata {
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// An in-memory PDF being edited
#[derive(Debug)]
pub struct PdfDocument {
    doc: Document,
    source: Option<PathBuf>,
}

impl PdfDocument {
    /// Load a PDF from disk.
    ///
    /// Streams are decompressed so later stages can work on plain content bytes.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let doc = Document::load(path).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })?;

        if doc.get_pages().is_empty() {
            return Err(Error::EmptyPdf(path.to_path_buf()));
        }

        let mut loaded = Self::from_lopdf(doc);
        loaded.source = Some(path.to_path_buf());
        debug!(path = %path.display(), pages = loaded.page_count(), "Loaded PDF");
        Ok(loaded)
    }

    /// Wrap an already parsed or generated document
    pub fn from_lopdf(mut doc: Document) -> Self {
        doc.decompress();
        Self { doc, source: None }
    }

    /// Path the document was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn inner(&self) -> &Document {
        &self.doc
    }

    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_inner(self) -> Document {
        self.doc
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page ordinals and object ids in document order
    pub fn page_ids(&self) -> Vec<(u32, ObjectId)> {
        self.doc.get_pages().into_iter().collect()
    }

    /// Object id of the page at `ordinal`, if it exists
    pub fn page_id(&self, ordinal: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&ordinal).copied()
    }

    /// Attributes of every page, in order
    pub fn pages(&self) -> Result<Vec<PageInfo>> {
        self.page_ids()
            .into_iter()
            .map(|(ordinal, id)| self.page_info(ordinal, id))
            .collect()
    }

    /// Attributes of the page at `ordinal`
    pub fn page(&self, ordinal: u32) -> Result<Option<PageInfo>> {
        match self.page_id(ordinal) {
            Some(id) => self.page_info(ordinal, id).map(Some),
            None => Ok(None),
        }
    }

    fn page_info(&self, ordinal: u32, id: ObjectId) -> Result<PageInfo> {
        let content = self.content_of(id)?;
        Ok(PageInfo {
            ordinal,
            id,
            dimensions: self.page_dimensions(id),
            rotation: self.page_rotation(id),
            has_content: content.map_or(false, |bytes| !bytes.is_empty()),
        })
    }

    /// Effective page size, defaulting to US Letter when no MediaBox is found
    pub fn page_dimensions(&self, page_id: ObjectId) -> PageDimensions {
        self.page_box(page_id).dimensions
    }

    /// Effective MediaBox, defaulting to a US Letter box at the origin
    pub fn page_box(&self, page_id: ObjectId) -> PageBox {
        let media_box = inherited_attribute(&self.doc, page_id, b"MediaBox")
            .and_then(|obj| resolve(&self.doc, obj).as_array().ok().cloned());

        let coords: Vec<f32> = match media_box {
            Some(values) => values
                .iter()
                .filter_map(|v| resolve(&self.doc, v).as_float().ok())
                .collect(),
            None => Vec::new(),
        };

        if coords.len() == 4 {
            PageBox::from_box(coords[0], coords[1], coords[2], coords[3])
        } else {
            PageBox::default()
        }
    }

    /// Effective `/Rotate` value normalized into `0..360`
    pub fn page_rotation(&self, page_id: ObjectId) -> i64 {
        inherited_attribute(&self.doc, page_id, b"Rotate")
            .map(|obj| resolve(&self.doc, obj))
            .and_then(|obj| {
                obj.as_i64()
                    .ok()
                    .or_else(|| obj.as_float().ok().map(|f| f.round() as i64))
            })
            .unwrap_or(0)
            .rem_euclid(360)
    }

    /// Object ids of the content streams of a page, in drawing order.
    ///
    /// Handles `/Contents` given as a single reference, an inline array, or a
    /// reference to an array.
    pub fn content_stream_ids(&self, page_id: ObjectId) -> Result<Vec<ObjectId>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        let ids = match contents {
            Object::Reference(id) => match self.doc.get_object(*id)? {
                Object::Array(arr) => references_in(arr),
                _ => vec![*id],
            },
            Object::Array(arr) => references_in(arr),
            _ => Vec::new(),
        };

        Ok(ids)
    }

    /// Concatenated content bytes of the page at `ordinal`.
    ///
    /// Returns `None` when the page does not exist or has no content stream.
    pub fn page_content(&self, ordinal: u32) -> Result<Option<Vec<u8>>> {
        match self.page_id(ordinal) {
            Some(id) => self.content_of(id),
            None => Ok(None),
        }
    }

    fn content_of(&self, page_id: ObjectId) -> Result<Option<Vec<u8>>> {
        let ids = self.content_stream_ids(page_id)?;
        if ids.is_empty() {
            return Ok(None);
        }

        let mut content = Vec::new();
        for id in ids {
            if let Ok(Object::Stream(stream)) = self.doc.get_object(id) {
                match stream.decompressed_content() {
                    Ok(data) => content.extend_from_slice(&data),
                    Err(_) => content.extend_from_slice(&stream.content),
                }
            }
        }

        Ok(Some(content))
    }

    /// Title and author from the trailer's Info dictionary
    pub fn metadata(&self) -> PdfMetadata {
        let info = match self.doc.trailer.get(b"Info") {
            Ok(obj) => match resolve(&self.doc, obj) {
                Object::Dictionary(dict) => dict,
                _ => return PdfMetadata::default(),
            },
            Err(_) => return PdfMetadata::default(),
        };

        PdfMetadata {
            title: info_string(info, b"Title"),
            author: info_string(info, b"Author"),
        }
    }

    /// Write the document to `path`, creating or overwriting it.
    ///
    /// The document is serialized in memory first, so a serialization failure
    /// leaves no file behind.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes().map_err(|e| Error::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, &bytes).map_err(|e| Error::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "Wrote PDF");
        Ok(())
    }

    /// Compress streams and serialize the document
    pub fn to_bytes(&mut self) -> std::result::Result<Vec<u8>, String> {
        self.doc.compress();
        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer).map_err(|e| e.to_string())?;
        Ok(buffer)
    }
}

/// Look up a page attribute, following `/Parent` links for inheritable keys
/// (MediaBox, Resources, Rotate, CropBox).
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
    }

    None
}

/// Follow a reference to the object it points at
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn references_in(arr: &[Object]) -> Vec<ObjectId> {
    arr.iter()
        .filter_map(|o| if let Object::Reference(id) = o { Some(*id) } else { None })
        .collect()
}

/// Decode a text string entry: UTF-16BE with BOM, otherwise treated as UTF-8
fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = dict.get(key).ok()?.as_str().ok()?;

    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units).ok();
    }

    Some(String::from_utf8_lossy(bytes).into_owned())
}
