use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A finished overlay selection, in virtual desktop pixels
    RegionSelected(SelectionRect),
    Shutdown,
}

/// Axis-aligned area of the virtual desktop. Monitors left of or above the
/// primary one have negative origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Overlapping area, `None` when the two regions don't share a pixel
    pub fn intersection(&self, other: &CaptureRegion) -> Option<CaptureRegion> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= x || bottom <= y {
            return None;
        }

        Some(CaptureRegion {
            x,
            y,
            width: right.abs_diff(x),
            height: bottom.abs_diff(y),
        })
    }

    /// Smallest region covering both
    pub fn union(&self, other: &CaptureRegion) -> CaptureRegion {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        CaptureRegion {
            x,
            y,
            width: right.abs_diff(x),
            height: bottom.abs_diff(y),
        }
    }
}

/// Rubber-band rectangle with `x1 <= x2` and `y1 <= y2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl SelectionRect {
    /// Build from the press and release points of a drag, in any order
    pub fn from_corners(start: (i32, i32), end: (i32, i32)) -> Self {
        Self {
            x1: start.0.min(end.0),
            y1: start.1.min(end.1),
            x2: start.0.max(end.0),
            y2: start.1.max(end.1),
        }
    }

    pub fn width(&self) -> u32 {
        self.x2.abs_diff(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.abs_diff(self.y1)
    }

    /// True when both sides are strictly larger than `min_px`.
    /// Anything smaller is treated as an accidental click.
    pub fn exceeds(&self, min_px: u32) -> bool {
        self.width() > min_px && self.height() > min_px
    }

    pub fn region(&self) -> CaptureRegion {
        CaptureRegion {
            x: self.x1,
            y: self.y1,
            width: self.width(),
            height: self.height(),
        }
    }
}
