use std::sync::Arc;

use image::{GrayImage, Luma, RgbaImage};

use crate::foundation::error::PortraitResult;
use crate::segment::{Segmenter, SegmenterFactory};

/// Colour-key segmenter: the background colour is the per-channel median of the image's
/// outer ring, and foreground weight ramps with RGB distance from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BorderKeySegmenter {
    /// Distance at or below which a pixel is background.
    pub low: f32,
    /// Distance at or above which a pixel is foreground.
    pub high: f32,
}

impl Default for BorderKeySegmenter {
    fn default() -> Self {
        Self {
            low: 24.0,
            high: 72.0,
        }
    }
}

impl BorderKeySegmenter {
    fn background_colour(image: &RgbaImage) -> [u8; 3] {
        let (w, h) = image.dimensions();
        let mut channels: [Vec<u8>; 3] = Default::default();
        let mut push = |x: u32, y: u32| {
            let p = image.get_pixel(x, y);
            for (c, v) in channels.iter_mut().zip(p.0) {
                c.push(v);
            }
        };
        for x in 0..w {
            push(x, 0);
            if h > 1 {
                push(x, h - 1);
            }
        }
        for y in 1..h.saturating_sub(1) {
            push(0, y);
            if w > 1 {
                push(w - 1, y);
            }
        }

        let mut out = [0u8; 3];
        for (o, c) in out.iter_mut().zip(channels.iter_mut()) {
            c.sort_unstable();
            *o = c.get(c.len() / 2).copied().unwrap_or(0);
        }
        out
    }

    fn weight(&self, dist: f32) -> u8 {
        if dist <= self.low {
            0
        } else if dist >= self.high || self.high <= self.low {
            255
        } else {
            (((dist - self.low) / (self.high - self.low)) * 255.0).round() as u8
        }
    }
}

impl Segmenter for BorderKeySegmenter {
    fn segment(&self, image: &RgbaImage) -> PortraitResult<GrayImage> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(GrayImage::new(w, h));
        }
        let bg = Self::background_colour(image);
        Ok(GrayImage::from_fn(w, h, |x, y| {
            let p = image.get_pixel(x, y).0;
            if p[3] == 0 {
                return Luma([0]);
            }
            let d2: f32 = (0..3)
                .map(|i| {
                    let d = f32::from(p[i]) - f32::from(bg[i]);
                    d * d
                })
                .sum();
            Luma([self.weight(d2.sqrt())])
        }))
    }
}

/// Factory for the built-in [`BorderKeySegmenter`]; needs no external model.
#[derive(Clone, Copy, Debug, Default)]
pub struct BorderKeyFactory {
    /// Segmenter handed out by [`create`](SegmenterFactory::create).
    pub segmenter: BorderKeySegmenter,
}

impl SegmenterFactory for BorderKeyFactory {
    fn create(&self) -> PortraitResult<Arc<dyn Segmenter>> {
        Ok(Arc::new(self.segmenter))
    }

    fn name(&self) -> &str {
        "border-key"
    }
}

#[cfg(test)]
#[path = "../../tests/unit/segment/border_key.rs"]
mod tests;
