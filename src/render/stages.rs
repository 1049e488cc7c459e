//! Individual pipeline stages. Every function here is pure: inputs in, new image out.

use std::borrow::Cow;

use image::{Rgba, RgbaImage, imageops::FilterType};

use crate::foundation::core::{Canvas, FaceCenter};
use crate::foundation::error::{PortraitError, PortraitResult};
use crate::project::RenderParameters;
use crate::render::composite::{over, over_in_place, paste_over};

/// Crop height in canvas pixels at `icon_scale == 1.0`.
pub const BASE_HEIGHT: f64 = 300.0;

/// Lower bound applied to icon scales before dividing by them.
pub const ICON_SCALE_EPSILON: f64 = 1e-3;

/// Largest scaled source, in pixels, the pipeline will allocate (64 Mpx, 256 MiB RGBA).
pub const MAX_SCALED_PIXELS: u64 = 1 << 26;

const MARKER_COLOUR: [u8; 4] = [255, 0, 0, 255];
const MARKER_ARM: i64 = 20;
const MARKER_RADIUS: f64 = 12.0;

/// Resampling quality of a render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quality {
    /// Nearest-neighbour resampling for interactive previews.
    Fast,
    /// Lanczos resampling; the only quality that fills the composite cache.
    #[default]
    Full,
}

impl Quality {
    /// Resampling filter for this quality.
    pub fn filter(self) -> FilterType {
        match self {
            Quality::Fast => FilterType::Nearest,
            Quality::Full => FilterType::Lanczos3,
        }
    }
}

/// The two face icon formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconTarget {
    /// 96×96, exported for `normal` only.
    A,
    /// 270×96, exported for every state.
    B,
}

impl IconTarget {
    /// Output size in pixels.
    pub fn size(self) -> (u32, u32) {
        match self {
            IconTarget::A => (96, 96),
            IconTarget::B => (270, 96),
        }
    }

    /// The parameter scale for this icon.
    pub fn icon_scale(self, params: &RenderParameters) -> f32 {
        match self {
            IconTarget::A => params.icon_scale_a,
            IconTarget::B => params.icon_scale_b,
        }
    }
}

/// Axis-aligned crop rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CropBox {
    /// Left edge in canvas pixels.
    pub left: u32,
    /// Top edge in canvas pixels.
    pub top: u32,
    /// Width in canvas pixels.
    pub width: u32,
    /// Height in canvas pixels.
    pub height: u32,
}

impl CropBox {
    /// Exclusive right edge.
    pub fn right(self) -> u32 {
        self.left + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> u32 {
        self.top + self.height
    }
}

/// Multiply both dimensions by `scale` (truncating, at least 1px).
///
/// Fails with `Validation` when the result would exceed [`MAX_SCALED_PIXELS`].
pub fn scale_image(
    image: &RgbaImage,
    scale: f32,
    quality: Quality,
) -> PortraitResult<Cow<'_, RgbaImage>> {
    if scale == 1.0 || image.width() == 0 || image.height() == 0 {
        return Ok(Cow::Borrowed(image));
    }
    let s = f64::from(scale);
    let wf = (f64::from(image.width()) * s).floor().max(1.0);
    let hf = (f64::from(image.height()) * s).floor().max(1.0);
    if !(wf * hf).is_finite() || wf * hf > MAX_SCALED_PIXELS as f64 {
        return Err(PortraitError::validation(format!(
            "scale {scale} turns {}x{} into {wf}x{hf}, over the {MAX_SCALED_PIXELS} pixel limit",
            image.width(),
            image.height()
        )));
    }
    let (w, h) = (wf as u32, hf as u32);
    Ok(Cow::Owned(image::imageops::resize(image, w, h, quality.filter())))
}

/// Top-left paste position that puts the image centre at `canvas centre + offset`.
pub fn paste_origin(
    canvas: Canvas,
    image_w: u32,
    image_h: u32,
    offset_x: i32,
    offset_y: i32,
) -> (i64, i64) {
    let c = canvas.center();
    (
        i64::from(c.x) - i64::from(image_w / 2) + i64::from(offset_x),
        i64::from(c.y) - i64::from(image_h / 2) + i64::from(offset_y),
    )
}

/// Alpha-composite `image` onto a transparent canvas.
pub fn compose_canvas(
    image: &RgbaImage,
    canvas: Canvas,
    offset_x: i32,
    offset_y: i32,
) -> RgbaImage {
    let mut out = RgbaImage::new(canvas.width, canvas.height);
    let (x, y) = paste_origin(canvas, image.width(), image.height(), offset_x, offset_y);
    paste_over(&mut out, image, x, y);
    out
}

/// Place a span of `size` centred on `center` inside `[0, extent)`.
///
/// The span is shifted to fit first; a span longer than `extent` becomes the whole axis.
fn fit_axis(center: f64, size: f64, extent: u32) -> (u32, u32) {
    let extent_f = f64::from(extent);
    if size >= extent_f {
        return (0, extent);
    }
    let len = (size.round() as u32).clamp(1, extent);
    let start = (center - size / 2.0).clamp(0.0, extent_f - size).round() as u32;
    (start.min(extent - len), len)
}

/// Crop box for `target` around `anchor`, sized by `icon_scale`.
pub fn icon_crop_box(
    anchor: FaceCenter,
    icon_scale: f32,
    target: IconTarget,
    canvas: Canvas,
) -> CropBox {
    let s = f64::from(icon_scale);
    let s = if s.is_finite() { s.max(ICON_SCALE_EPSILON) } else { 1.0 };
    let (tw, th) = target.size();
    let crop_h = BASE_HEIGHT / s;
    let crop_w = crop_h * f64::from(tw) / f64::from(th);

    let (left, width) = fit_axis(f64::from(anchor.x), crop_w, canvas.width);
    let (top, height) = fit_axis(f64::from(anchor.y), crop_h, canvas.height);
    CropBox {
        left,
        top,
        width,
        height,
    }
}

/// Crop `composite` around `anchor` and resize to the icon's exact pixel size.
pub fn extract_icon(
    composite: &RgbaImage,
    anchor: FaceCenter,
    icon_scale: f32,
    target: IconTarget,
    quality: Quality,
) -> (RgbaImage, CropBox) {
    let canvas = Canvas {
        width: composite.width(),
        height: composite.height(),
    };
    let b = icon_crop_box(anchor, icon_scale, target, canvas);
    let (tw, th) = target.size();
    let cropped =
        image::imageops::crop_imm(composite, b.left, b.top, b.width, b.height).to_image();
    let icon = if cropped.dimensions() == (tw, th) {
        cropped
    } else {
        image::imageops::resize(&cropped, tw, th, quality.filter())
    };
    (icon, b)
}

/// Resize an overlay to the canvas if it does not already match.
pub fn fit_to_canvas(overlay: &RgbaImage, canvas: Canvas) -> Cow<'_, RgbaImage> {
    if overlay.dimensions() == (canvas.width, canvas.height) {
        Cow::Borrowed(overlay)
    } else {
        Cow::Owned(image::imageops::resize(
            overlay,
            canvas.width,
            canvas.height,
            FilterType::Lanczos3,
        ))
    }
}

/// Composite a frame overlay on top of a copy of the clean composite.
pub fn apply_frame(composite: &RgbaImage, frame: &RgbaImage) -> PortraitResult<RgbaImage> {
    let canvas = Canvas {
        width: composite.width(),
        height: composite.height(),
    };
    let frame = fit_to_canvas(frame, canvas);
    let mut out = composite.clone();
    over_in_place(&mut out, &frame)?;
    Ok(out)
}

fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let p = img.get_pixel_mut(x as u32, y as u32);
    *p = Rgba(over(p.0, MARKER_COLOUR));
}

/// Crosshair plus circle centred on `at`, drawn in place.
pub fn draw_marker(img: &mut RgbaImage, at: FaceCenter) {
    let (cx, cy) = (i64::from(at.x), i64::from(at.y));
    for d in -MARKER_ARM..=MARKER_ARM {
        blend_pixel(img, cx + d, cy);
        if d != 0 {
            blend_pixel(img, cx, cy + d);
        }
    }

    let steps = (MARKER_RADIUS * std::f64::consts::TAU).ceil() as usize * 2;
    let mut last = None;
    for i in 0..steps {
        let t = i as f64 / steps as f64 * std::f64::consts::TAU;
        let px = cx + (MARKER_RADIUS * t.cos()).round() as i64;
        let py = cy + (MARKER_RADIUS * t.sin()).round() as i64;
        if last != Some((px, py)) {
            blend_pixel(img, px, py);
            last = Some((px, py));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/stages.rs"]
mod tests;
