//! Page geometry and footer placement
//!
//! All values are PDF points (1/72 inch) in the default user space, which has
//! its origin at the bottom-left corner of the page.

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

impl PageDimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    /// Build dimensions from a `[llx lly urx ury]` box.
    ///
    /// Corners may be given in any order, so the result is always non-negative.
    pub fn from_box(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Self::new((urx - llx).abs(), (ury - lly).abs())
    }
}

impl Default for PageDimensions {
    fn default() -> Self {
        Self::letter()
    }
}

/// A page's MediaBox: lower-left corner plus size.
///
/// Scanned and cropped documents often have a MediaBox that does not start at
/// the origin, so placement has to be relative to `x`/`y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f32,
    pub y: f32,
    pub dimensions: PageDimensions,
}

impl PageBox {
    /// Box with its lower-left corner at the origin
    pub fn at_origin(dimensions: PageDimensions) -> Self {
        Self { x: 0.0, y: 0.0, dimensions }
    }

    /// Build from a `[llx lly urx ury]` array, corners in any order
    pub fn from_box(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Self {
            x: llx.min(urx),
            y: lly.min(ury),
            dimensions: PageDimensions::from_box(llx, lly, urx, ury),
        }
    }

    /// `[llx lly urx ury]` with the corners normalized
    pub fn corners(&self) -> [f32; 4] {
        [
            self.x,
            self.y,
            self.x + self.dimensions.width,
            self.y + self.dimensions.height,
        ]
    }

    /// Whether `rect` lies completely inside the box
    pub fn contains(&self, rect: &Rect) -> bool {
        let [llx, lly, urx, ury] = self.corners();
        rect.x >= llx && rect.y >= lly && rect.x + rect.width <= urx && rect.y + rect.height <= ury
    }
}

impl Default for PageBox {
    fn default() -> Self {
        Self::at_origin(PageDimensions::letter())
    }
}

/// Axis-aligned rectangle in page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Whether the rectangle lies completely inside the page
    pub fn fits_within(&self, page: &PageDimensions) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= page.width
            && self.y + self.height <= page.height
    }
}

/// Where the footer image goes on each page.
///
/// The image is a square of `size` points whose lower-left corner sits
/// `right_offset` points left of the right edge and `bottom_offset` points
/// above the bottom edge. Placement does not scale with page size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FooterPlacement {
    pub size: f32,
    pub right_offset: f32,
    pub bottom_offset: f32,
}

impl Default for FooterPlacement {
    fn default() -> Self {
        Self {
            size: 30.0,
            right_offset: 50.0,
            bottom_offset: 30.0,
        }
    }
}

impl FooterPlacement {
    /// Rectangle the image occupies on a page of the given size
    pub fn rect_for(&self, page: &PageDimensions) -> Rect {
        self.rect_in(&PageBox::at_origin(*page))
    }

    /// Rectangle the image occupies inside a page box, measured from the
    /// box's own bottom-right corner
    pub fn rect_in(&self, page: &PageBox) -> Rect {
        Rect {
            x: page.x + page.dimensions.width - self.right_offset,
            y: page.y + self.bottom_offset,
            width: self.size,
            height: self.size,
        }
    }
}
