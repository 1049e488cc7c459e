use image::{GrayImage, Luma, RgbaImage};

use crate::foundation::error::{PortraitError, PortraitResult};
use crate::segment::MattingOptions;

/// Turn a foreground mask into alpha on a copy of `image` (`alpha = min(src, matte)`).
pub(crate) fn apply_mask(
    image: &RgbaImage,
    mask: &GrayImage,
    opts: &MattingOptions,
) -> PortraitResult<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(PortraitError::validation(format!(
            "mask {:?} does not match image {:?}",
            mask.dimensions(),
            image.dimensions()
        )));
    }

    let matte = if opts.alpha_matting {
        trimap_matte(mask, opts)
    } else {
        mask.clone()
    };

    let mut out = image.clone();
    for (px, m) in out.pixels_mut().zip(matte.pixels()) {
        px.0[3] = px.0[3].min(m.0[0]);
    }
    Ok(out)
}

/// Trimap matting: confident regions are eroded, the band between them ramps linearly.
pub(crate) fn trimap_matte(mask: &GrayImage, opts: &MattingOptions) -> GrayImage {
    let lo = opts.bg_threshold.min(opts.fg_threshold);
    let hi = opts.bg_threshold.max(opts.fg_threshold);
    let (w, h) = mask.dimensions();

    let fg: Vec<bool> = mask.pixels().map(|p| p.0[0] >= hi).collect();
    let bg: Vec<bool> = mask.pixels().map(|p| p.0[0] <= lo).collect();
    let fg = erode(&fg, w as usize, h as usize, opts.erode_size as usize);
    let bg = erode(&bg, w as usize, h as usize, opts.erode_size as usize);

    GrayImage::from_fn(w, h, |x, y| {
        let i = (y as usize) * (w as usize) + x as usize;
        if fg[i] {
            return Luma([255]);
        }
        if bg[i] {
            return Luma([0]);
        }
        let m = mask.get_pixel(x, y).0[0];
        if hi == lo {
            return Luma([if m >= hi { 255 } else { 0 }]);
        }
        let span = u32::from(hi - lo);
        let t = (u32::from(m.clamp(lo, hi) - lo) * 255 + span / 2) / span;
        Luma([t as u8])
    })
}

/// Binary erosion with a square window of half-size `radius`, separable in x then y.
///
/// Out-of-image samples are ignored, so regions touching the border are not eaten from it.
pub(crate) fn erode(src: &[bool], w: usize, h: usize, radius: usize) -> Vec<bool> {
    if radius == 0 || w == 0 || h == 0 {
        return src.to_vec();
    }
    let pass = |input: &[bool], len: usize, lines: usize, at: &dyn Fn(usize, usize) -> usize| {
        let mut out = vec![false; input.len()];
        let mut misses = vec![0usize; len + 1];
        for line in 0..lines {
            for k in 0..len {
                misses[k + 1] = misses[k] + usize::from(!input[at(line, k)]);
            }
            for k in 0..len {
                let a = k.saturating_sub(radius);
                let b = (k + radius).min(len - 1);
                out[at(line, k)] = misses[b + 1] - misses[a] == 0;
            }
        }
        out
    };
    let horizontal = pass(src, w, h, &|row, col| row * w + col);
    pass(&horizontal, h, w, &|col, row| row * w + col)
}

#[cfg(test)]
#[path = "../../tests/unit/segment/matting.rs"]
mod tests;
