//! u2net salient-object segmentation over the downloaded ONNX weights.
//!
//! Pre/post-processing follows the usual u2net recipe: the image is resized to a fixed
//! 320×320 input, scaled by its maximum value and normalized with ImageNet statistics; the
//! first output map is min/max normalized into a mask and resized back to the source size.

use std::{path::PathBuf, sync::Arc};

use image::{GrayImage, Luma, RgbaImage, imageops::FilterType};
use tracing::info;

use crate::foundation::error::{PortraitError, PortraitResult};
use crate::segment::{Segmenter, SegmenterFactory};

/// Side length of the square network input.
pub const INPUT_SIZE: u32 = 320;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Loads the u2net model from `path` on first use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct U2netFactory {
    /// Location of `u2net.onnx`.
    pub path: PathBuf,
}

impl U2netFactory {
    /// Factory reading the weights at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SegmenterFactory for U2netFactory {
    fn create(&self) -> PortraitResult<Arc<dyn Segmenter>> {
        if !self.path.is_file() {
            return Err(PortraitError::model_unavailable(format!(
                "model not installed at '{}'",
                self.path.display()
            )));
        }
        let plan = engine::load(&self.path)?;
        info!(path = %self.path.display(), "u2net model loaded");
        Ok(Arc::new(U2netSegmenter { plan }))
    }

    fn name(&self) -> &str {
        "u2net"
    }
}

struct U2netSegmenter {
    plan: engine::Plan,
}

impl Segmenter for U2netSegmenter {
    fn segment(&self, image: &RgbaImage) -> PortraitResult<GrayImage> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(GrayImage::new(w, h));
        }
        let prediction = engine::infer(&self.plan, &input_tensor(image))?;
        mask_from_prediction(&prediction, w, h)
    }
}

/// Planar `[3, INPUT_SIZE, INPUT_SIZE]` network input for `image` (alpha ignored).
pub(crate) fn input_tensor(image: &RgbaImage) -> Vec<f32> {
    let resized = image::imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3);
    let max = resized
        .pixels()
        .flat_map(|p| p.0[..3].iter().copied())
        .max()
        .unwrap_or(0);
    let max = if max == 0 { 1.0 } else { f32::from(max) };

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut out = vec![0.0f32; plane * 3];
    for (i, p) in resized.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = (f32::from(p.0[c]) / max - MEAN[c]) / STD[c];
        }
    }
    out
}

/// Turn the first `INPUT_SIZE²` prediction values into a `width × height` mask.
pub(crate) fn mask_from_prediction(
    prediction: &[f32],
    width: u32,
    height: u32,
) -> PortraitResult<GrayImage> {
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let Some(values) = prediction.get(..plane) else {
        return Err(PortraitError::validation(format!(
            "u2net output has {} values, expected at least {plane}",
            prediction.len()
        )));
    };
    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;

    let mut small = GrayImage::new(INPUT_SIZE, INPUT_SIZE);
    for (p, &v) in small.pixels_mut().zip(values) {
        let norm = if range > f32::EPSILON {
            (v - lo) / range
        } else {
            0.0
        };
        *p = Luma([(norm * 255.0).round().clamp(0.0, 255.0) as u8]);
    }
    if (width, height) == (INPUT_SIZE, INPUT_SIZE) {
        return Ok(small);
    }
    Ok(image::imageops::resize(
        &small,
        width,
        height,
        FilterType::Lanczos3,
    ))
}

#[cfg(feature = "u2net")]
mod engine {
    use std::path::Path;

    use parking_lot::Mutex;
    use tract_onnx::prelude::*;

    use super::INPUT_SIZE;
    use crate::foundation::error::{PortraitError, PortraitResult};

    pub(super) struct Plan(Mutex<TypedRunnableModel<TypedModel>>);

    pub(super) fn load(path: &Path) -> PortraitResult<Plan> {
        let n = INPUT_SIZE as usize;
        let built = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, n, n]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable());
        built.map(|p| Plan(Mutex::new(p))).map_err(|e| {
            PortraitError::model_unavailable(format!(
                "cannot load model '{}': {e:#}",
                path.display()
            ))
        })
    }

    pub(super) fn infer(plan: &Plan, input: &[f32]) -> PortraitResult<Vec<f32>> {
        let n = INPUT_SIZE as usize;
        let run = || -> TractResult<Vec<f32>> {
            let tensor = Tensor::from_shape(&[1, 3, n, n], input)?;
            let outputs = plan.0.lock().run(tvec!(tensor.into()))?;
            let view = outputs[0].to_array_view::<f32>()?;
            Ok(view.iter().copied().collect())
        };
        run().map_err(|e| PortraitError::Other(anyhow::anyhow!("u2net inference: {e:#}")))
    }
}

#[cfg(not(feature = "u2net"))]
mod engine {
    use std::path::Path;

    use crate::foundation::error::{PortraitError, PortraitResult};

    pub(super) struct Plan;

    pub(super) fn load(_path: &Path) -> PortraitResult<Plan> {
        Err(PortraitError::model_unavailable(
            "u2net segmentation requires the 'u2net' feature",
        ))
    }

    pub(super) fn infer(_plan: &Plan, _input: &[f32]) -> PortraitResult<Vec<f32>> {
        Err(PortraitError::model_unavailable(
            "u2net segmentation requires the 'u2net' feature",
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/segment/u2net.rs"]
mod tests;
