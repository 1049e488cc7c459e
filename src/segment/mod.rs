//! Background removal: a pluggable foreground segmenter plus mask/matte application.
//!
//! The segmenter is created lazily, once, under a mutex and then shared by every caller
//! (including worker threads). A failed initialization is not remembered, so installing a
//! missing model and retrying works without rebuilding the remover.

pub(crate) mod border_key;
pub(crate) mod matting;
pub(crate) mod model;
pub(crate) mod u2net;

use std::sync::Arc;

use image::{GrayImage, RgbaImage};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::foundation::error::PortraitResult;
use crate::project::RenderParameters;

pub use border_key::{BorderKeyFactory, BorderKeySegmenter};
pub use model::{
    CancelFlag, DEFAULT_MODEL_URL, DownloadOutcome, ModelAsset, ModelGated, default_model_path,
};
pub use u2net::U2netFactory;

/// Produces a foreground mask (255 = foreground) with the dimensions of `image`.
pub trait Segmenter: Send + Sync {
    /// Foreground mask of `image`.
    fn segment(&self, image: &RgbaImage) -> PortraitResult<GrayImage>;
}

/// Builds the shared [`Segmenter`]; called at most once per successful initialization.
pub trait SegmenterFactory: Send + Sync {
    /// Build the segmenter, loading whatever it needs.
    fn create(&self) -> PortraitResult<Arc<dyn Segmenter>>;

    /// Short label for logs.
    fn name(&self) -> &str;
}

/// Matting controls extracted from [`RenderParameters`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MattingOptions {
    /// Refine the raw mask with trimap matting.
    pub alpha_matting: bool,
    /// Certain-foreground threshold.
    pub fg_threshold: u8,
    /// Certain-background threshold.
    pub bg_threshold: u8,
    /// Erosion radius of the certain regions.
    pub erode_size: u32,
}

impl MattingOptions {
    /// Matting fields of `params`.
    pub fn from_params(params: &RenderParameters) -> Self {
        Self {
            alpha_matting: params.alpha_matting,
            fg_threshold: params.alpha_matting_fg_threshold,
            bg_threshold: params.alpha_matting_bg_threshold,
            erode_size: params.alpha_matting_erode_size,
        }
    }
}

/// Lazily initialized background-removal session.
pub struct BackgroundRemover {
    factory: Box<dyn SegmenterFactory>,
    session: Mutex<Option<Arc<dyn Segmenter>>>,
}

impl std::fmt::Debug for BackgroundRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRemover")
            .field("factory", &self.factory.name())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Default for BackgroundRemover {
    fn default() -> Self {
        Self::new(BorderKeyFactory::default())
    }
}

impl BackgroundRemover {
    /// Remover that builds its segmenter from `factory` on first use.
    pub fn new(factory: impl SegmenterFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            session: Mutex::new(None),
        }
    }

    /// Whether the segmenter has been built.
    pub fn is_initialized(&self) -> bool {
        self.session.lock().is_some()
    }

    fn session(&self) -> PortraitResult<Arc<dyn Segmenter>> {
        let mut guard = self.session.lock();
        if let Some(s) = guard.as_ref() {
            return Ok(Arc::clone(s));
        }
        debug!(factory = self.factory.name(), "initializing segmentation session");
        let created = self.factory.create()?;
        *guard = Some(Arc::clone(&created));
        info!(factory = self.factory.name(), "segmentation session ready");
        Ok(created)
    }

    /// Cut the background out of `image`, returning a new straight-alpha image.
    pub fn remove(&self, image: &RgbaImage, opts: &MattingOptions) -> PortraitResult<RgbaImage> {
        let segmenter = self.session()?;
        let mask = segmenter.segment(image)?;
        matting::apply_mask(image, &mask, opts)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/segment/remover.rs"]
mod tests;
