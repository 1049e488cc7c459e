use crate::foundation::error::{PortraitError, PortraitResult};

/// Width of the fixed compositing surface.
pub const CANVAS_WIDTH: u32 = 1920;
/// Height of the fixed compositing surface.
pub const CANVAS_HEIGHT: u32 = 1080;

/// Pixel size of a compositing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::FULL
    }
}

impl Canvas {
    /// The 1920x1080 surface every composite targets.
    pub const FULL: Canvas = Canvas {
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
    };

    /// Canvas of the given size; both sides must be non-zero.
    pub fn new(width: u32, height: u32) -> PortraitResult<Self> {
        if width == 0 || height == 0 {
            return Err(PortraitError::validation("canvas dimensions must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Integer centre, rounded down like the paste arithmetic.
    pub fn center(self) -> FaceCenter {
        FaceCenter {
            x: (self.width / 2) as i32,
            y: (self.height / 2) as i32,
        }
    }

    /// Whether `p` lies inside the canvas.
    pub fn contains(self, p: FaceCenter) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }
}

/// Canvas-space anchor used as the face marker and the icon crop centre.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FaceCenter {
    /// Horizontal position in pixels.
    pub x: i32,
    /// Vertical position in pixels.
    pub y: i32,
}

impl FaceCenter {
    /// Anchor at `(x, y)`.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp into canvas coordinates (0..=width, 0..=height).
    pub fn clamped(self, canvas: Canvas) -> Self {
        Self {
            x: self.x.clamp(0, canvas.width as i32),
            y: self.y.clamp(0, canvas.height as i32),
        }
    }

    /// Shift by `(dx, dy)`, saturating at the `i32` range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
