//! Axis-aligned rectangles in page pixel space and the overlap predicate
//! used to match OCR lines against layout regions.

use serde::{Deserialize, Serialize};

/// Default minimum overlap ratio for [`intersects`].
pub const DEFAULT_MIN_OVERLAP: f32 = 0.3;

/// A bounding box `[x0, y0, x1, y1]` in pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BBox {
    /// Create a new bounding box.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Area in square pixels (zero for degenerate boxes).
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// The intersection rectangle, if it has positive area.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(BBox::new(x0, y0, x1, y1))
    }

    /// Grow the box by `padding` on every side, clamped to `[0, width] x [0, height]`.
    pub fn padded(&self, padding: f32, width: f32, height: f32) -> BBox {
        BBox::new(
            (self.x0 - padding).max(0.0),
            (self.y0 - padding).max(0.0),
            (self.x1 + padding).min(width),
            (self.y1 + padding).min(height),
        )
    }
}

impl From<[f32; 4]> for BBox {
    fn from(b: [f32; 4]) -> Self {
        BBox::new(b[0], b[1], b[2], b[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// Whether `a` overlaps `b` by at least `min_overlap` of `a`'s own area.
///
/// The ratio is asymmetric: it is measured against the first argument only.
/// Pass the OCR line as `a` and the candidate layout region as `b`, so that a
/// small line fully inside a large region always matches.
pub fn intersects(a: &BBox, b: &BBox, min_overlap: f32) -> bool {
    let Some(inter) = a.intersection(b) else {
        return false;
    };

    // A positive-area intersection implies a positive-area `a`.
    inter.area() / a.area() >= min_overlap
}

/// Index of the first region in `candidates` that `a` intersects.
///
/// Candidates are scanned in the order given; that order is the caller's
/// priority when several regions overlap the same line.
pub fn first_match<'a, I>(a: &BBox, candidates: I, min_overlap: f32) -> Option<usize>
where
    I: IntoIterator<Item = &'a BBox>,
{
    candidates
        .into_iter()
        .position(|b| intersects(a, b, min_overlap))
}
