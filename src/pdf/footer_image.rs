//! Footer image loading and embedding as an Image XObject

use std::path::{Path, PathBuf};
use image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;
use crate::error::{Error, Result};

/// Encoded pixel data ready to go into a PDF stream
#[derive(Debug, Clone, PartialEq)]
enum ImageData {
    /// Original JPEG bytes, embedded with DCTDecode
    Jpeg(Vec<u8>),
    /// Uncompressed 8-bit samples; the writer applies Flate
    Raw(Vec<u8>),
}

/// A decoded footer image
#[derive(Debug, Clone)]
pub struct FooterImage {
    path: PathBuf,
    width: u32,
    height: u32,
    color_space: &'static str,
    data: ImageData,
    /// 8-bit alpha channel, present only when some pixel is not opaque
    soft_mask: Option<Vec<u8>>,
}

impl FooterImage {
    /// Read and decode an image file
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(overlay_error(path, "file not found"));
        }

        let bytes = std::fs::read(path).map_err(|e| overlay_error(path, e.to_string()))?;
        Self::from_bytes(path, &bytes)
    }

    /// Decode image bytes; `path` is only used in error messages
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        if looks_like_svg(path, bytes) {
            return Err(overlay_error(
                path,
                "SVG images are not supported; convert the logo to PNG or JPEG",
            ));
        }

        let format = image::guess_format(bytes)
            .map_err(|_| overlay_error(path, "unsupported image format"))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| overlay_error(path, e.to_string()))?;

        let image = if format == ImageFormat::Jpeg {
            Self::from_jpeg(path, bytes, &decoded)
        } else {
            Self::from_decoded(path, &decoded)
        };

        debug!(
            path = %path.display(),
            width = image.width,
            height = image.height,
            color_space = image.color_space,
            has_alpha = image.soft_mask.is_some(),
            "Decoded footer image"
        );
        Ok(image)
    }

    fn from_jpeg(path: &Path, bytes: &[u8], decoded: &DynamicImage) -> Self {
        let (width, height) = decoded.dimensions();
        match jpeg_color_space(bytes, decoded) {
            Some(color_space) => Self {
                path: path.to_path_buf(),
                width,
                height,
                color_space,
                data: ImageData::Jpeg(bytes.to_vec()),
                soft_mask: None,
            },
            // CMYK/YCCK JPEGs decode to RGB; embed the decoded pixels instead
            None => Self::from_decoded(path, decoded),
        }
    }

    fn from_decoded(path: &Path, decoded: &DynamicImage) -> Self {
        let (width, height) = decoded.dimensions();
        let rgba = decoded.to_rgba8();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let soft_mask = if alpha.iter().all(|&a| a == u8::MAX) { None } else { Some(alpha) };

        Self {
            path: path.to_path_buf(),
            width,
            height,
            color_space: "DeviceRGB",
            data: ImageData::Raw(rgb),
            soft_mask,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pixel dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_alpha(&self) -> bool {
        self.soft_mask.is_some()
    }

    /// Add the image (and its soft mask, if any) to `doc`, returning the
    /// Image XObject id
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut dict = image_dict(self.width, self.height, self.color_space);

        if let Some(ref mask) = self.soft_mask {
            let mask_stream = Stream::new(image_dict(self.width, self.height, "DeviceGray"), mask.clone());
            let mask_id = doc.add_object(Object::Stream(mask_stream));
            dict.set("SMask", Object::Reference(mask_id));
        }

        let stream = match self.data {
            ImageData::Jpeg(ref bytes) => {
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
                Stream {
                    dict,
                    content: bytes.clone(),
                    allows_compression: false,
                    start_position: None,
                }
            }
            ImageData::Raw(ref samples) => Stream::new(dict, samples.clone()),
        };

        doc.add_object(Object::Stream(stream))
    }
}

/// Color space for embedding the JPEG bytes unchanged, when the component
/// count in the frame header agrees with the decoded pixels
fn jpeg_color_space(bytes: &[u8], decoded: &DynamicImage) -> Option<&'static str> {
    match (jpeg_components(bytes)?, decoded) {
        (1, DynamicImage::ImageLuma8(_)) => Some("DeviceGray"),
        (3, DynamicImage::ImageRgb8(_)) => Some("DeviceRGB"),
        _ => None,
    }
}

/// Number of color components declared in the JPEG start-of-frame header
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 3 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Markers without a length field
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // Scan data or end of image before any frame header
            0xDA | 0xD9 => return None,
            // SOFn: length(2) precision(1) height(2) width(2) components(1)
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                return bytes.get(pos + 9).copied();
            }
            _ => {}
        }
        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        pos += 2 + length;
    }
    None
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

fn looks_like_svg(path: &Path, bytes: &[u8]) -> bool {
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("svg"));

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    by_extension || head.contains("<svg")
}

fn overlay_error(path: &Path, reason: impl Into<String>) -> Error {
    Error::Overlay {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
