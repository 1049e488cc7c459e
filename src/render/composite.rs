use image::RgbaImage;

use crate::foundation::error::{PortraitError, PortraitResult};
use crate::foundation::math::mul_div255_u32;

/// Straight-alpha RGBA pixel.
pub type Rgba8 = [u8; 4];

/// Straight-alpha source-over.
///
/// Fully opaque source pixels replace the destination, transparent ones leave it untouched.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let da = u32::from(dst[3]);
    let inv = 255 - sa;
    // Weights scaled by 255 to keep the division exact for opaque results.
    let sw = sa * 255;
    let dw = da * inv;
    let total = sw + dw;

    let mut out = [0u8; 4];
    out[3] = (sa + mul_div255_u32(da, inv)).min(255) as u8;
    for i in 0..3 {
        let c = u32::from(src[i]) * sw + u32::from(dst[i]) * dw;
        out[i] = ((c + total / 2) / total).min(255) as u8;
    }
    out
}

/// [`over`] applied pixel by pixel; both images must be the same size.
pub fn over_in_place(dst: &mut RgbaImage, src: &RgbaImage) -> PortraitResult<()> {
    if dst.dimensions() != src.dimensions() {
        return Err(PortraitError::validation(format!(
            "over_in_place expects equal sizes, got {:?} and {:?}",
            dst.dimensions(),
            src.dimensions()
        )));
    }
    for (d, s) in dst.pixels_mut().zip(src.pixels()) {
        d.0 = over(d.0, s.0);
    }
    Ok(())
}

/// Composite `src` over `dst` with its top-left corner at `(x, y)`.
///
/// Parts outside `dst` are clipped.
pub fn paste_over(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    let (sw, sh) = (i64::from(src.width()), i64::from(src.height()));

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for dy in y0..y1 {
        let sy = (dy - y) as u32;
        for dx in x0..x1 {
            let sx = (dx - x) as u32;
            let s = src.get_pixel(sx, sy).0;
            let d = dst.get_pixel_mut(dx as u32, dy as u32);
            d.0 = over(d.0, s);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
