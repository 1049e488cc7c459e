use std::{path::PathBuf, sync::Arc};

use image::RgbaImage;
use tracing::debug;

use crate::{
    assets::{decode::load_image, store::ImageStore},
    foundation::{
        core::{Canvas, FaceCenter},
        error::PortraitResult,
    },
    project::{RenderParameters, SourceRef, StateKey, StoredProject},
    render::{
        cache::{CacheOpts, CacheStats, Layer1Key, Layer2Key, RenderCache},
        stages::{CropBox, IconTarget, Quality, compose_canvas, extract_icon, scale_image},
    },
    segment::{BackgroundRemover, MattingOptions},
};

/// Everything needed to render one state, detached from the project.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderInput {
    /// State being rendered.
    pub state: StateKey,
    /// Image of the state.
    pub source_ref: SourceRef,
    /// Resolved file of `source_ref`.
    pub source_path: PathBuf,
    /// Parameters of the state.
    pub params: RenderParameters,
    /// Resolved face-centre, if any level defines one.
    pub anchor: Option<FaceCenter>,
}

impl RenderInput {
    /// `None` when the state has no image or its file cannot be located.
    pub fn for_state(project: &StoredProject, state: StateKey) -> Option<Self> {
        let rs = project.record.state(state)?;
        let source_ref = rs.source_ref.clone()?;
        let source_path = ImageStore::for_project(project).resolve(&source_ref)?;
        Some(Self {
            state,
            source_ref,
            source_path,
            params: rs.params.clone(),
            anchor: project.record.resolve_anchor(state),
        })
    }
}

/// Composite plus both icons for one state.
#[derive(Clone, Debug)]
pub struct RenderOutput {
    /// State that was rendered.
    pub state: StateKey,
    /// Clean composite: no frame, host UI or marker.
    pub composite: Arc<RgbaImage>,
    /// 96x96 icon.
    pub icon_a: RgbaImage,
    /// 270x96 icon.
    pub icon_b: RgbaImage,
    /// Canvas area `icon_a` was cut from.
    pub crop_a: CropBox,
    /// Canvas area `icon_b` was cut from.
    pub crop_b: CropBox,
    /// Point the icons were cropped around.
    pub anchor: FaceCenter,
    /// The anchor came from the project rather than the image-centre fallback.
    pub has_anchor: bool,
}

/// A render with its cache lookups already done; safe to run on any thread.
#[derive(Debug)]
pub struct RenderJob {
    input: RenderInput,
    quality: Quality,
    canvas: Canvas,
    layer1_key: Layer1Key,
    layer2_key: Layer2Key,
    layer1: Option<Arc<RgbaImage>>,
    layer2: Option<Arc<RgbaImage>>,
    remover: Arc<BackgroundRemover>,
}

/// Result of [`RenderJob::run`], to be handed back to [`RenderPipeline::complete`].
#[derive(Debug)]
pub struct FinishedJob {
    output: RenderOutput,
    layer1_key: Layer1Key,
    layer2_key: Layer2Key,
    fresh_layer1: Option<Arc<RgbaImage>>,
    fresh_layer2: Option<Arc<RgbaImage>>,
}

impl FinishedJob {
    /// State that was rendered.
    pub fn state(&self) -> StateKey {
        self.output.state
    }

    /// The rendered images.
    pub fn output(&self) -> &RenderOutput {
        &self.output
    }
}

impl RenderJob {
    /// State to render.
    pub fn state(&self) -> StateKey {
        self.input.state
    }

    /// Requested quality.
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Render, reusing whatever layers [`RenderPipeline::prepare`] found in the cache.
    #[tracing::instrument(skip(self), fields(state = %self.input.state, quality = ?self.quality))]
    pub fn run(self) -> PortraitResult<FinishedJob> {
        let params = &self.input.params;

        let (base, fresh_layer1) = match self.layer1 {
            Some(img) => (img, None),
            None => {
                let mut img = load_image(&self.input.source_path)?;
                if params.use_rembg {
                    img = self
                        .remover
                        .remove(&img, &MattingOptions::from_params(params))?;
                }
                let img = Arc::new(img);
                (Arc::clone(&img), Some(img))
            }
        };

        let (composite, fresh_layer2) = match self.layer2 {
            Some(img) => (img, None),
            None => {
                let scaled = scale_image(&base, params.scale, self.quality)?;
                let img = Arc::new(compose_canvas(
                    &scaled,
                    self.canvas,
                    params.offset_x,
                    params.offset_y,
                ));
                let keep = (self.quality == Quality::Full).then(|| Arc::clone(&img));
                (img, keep)
            }
        };

        let anchor = self
            .input
            .anchor
            .unwrap_or_else(|| {
                self.canvas
                    .center()
                    .offset(params.offset_x, params.offset_y)
            })
            .clamped(self.canvas);
        let (icon_a, crop_a) = extract_icon(
            &composite,
            anchor,
            IconTarget::A.icon_scale(params),
            IconTarget::A,
            self.quality,
        );
        let (icon_b, crop_b) = extract_icon(
            &composite,
            anchor,
            IconTarget::B.icon_scale(params),
            IconTarget::B,
            self.quality,
        );

        Ok(FinishedJob {
            output: RenderOutput {
                state: self.input.state,
                composite,
                icon_a,
                icon_b,
                crop_a,
                crop_b,
                anchor,
                has_anchor: self.input.anchor.is_some(),
            },
            layer1_key: self.layer1_key,
            layer2_key: self.layer2_key,
            fresh_layer1,
            fresh_layer2,
        })
    }
}

/// Owns the two-tier cache and the shared background remover.
///
/// Cache lookups and installs happen on the thread that owns the pipeline; the expensive
/// part ([`RenderJob::run`]) can be moved elsewhere.
pub struct RenderPipeline {
    cache: RenderCache,
    remover: Arc<BackgroundRemover>,
    canvas: Canvas,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(Arc::new(BackgroundRemover::default()), CacheOpts::default())
    }
}

impl RenderPipeline {
    /// Pipeline removing backgrounds with `remover` and caching per `opts`.
    pub fn new(remover: Arc<BackgroundRemover>, opts: CacheOpts) -> Self {
        Self {
            cache: RenderCache::new(opts),
            remover,
            canvas: Canvas::FULL,
        }
    }

    /// Target surface, always 1920x1080.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Background remover shared with every job.
    pub fn remover(&self) -> &Arc<BackgroundRemover> {
        &self.remover
    }

    /// The two-layer image cache.
    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Mutable cache, for invalidation.
    pub fn cache_mut(&mut self) -> &mut RenderCache {
        &mut self.cache
    }

    /// Cache counters.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Validate parameters and pick up any cached layers.
    pub fn prepare(&mut self, input: RenderInput, quality: Quality) -> PortraitResult<RenderJob> {
        input.params.validate()?;
        let layer1_key = Layer1Key::new(input.source_ref.clone(), &input.params);
        let layer2_key = Layer2Key::new(layer1_key.clone(), &input.params, input.anchor);

        let layer2 = self.cache.layer2(&layer2_key);
        let layer1 = if layer2.is_some() {
            None
        } else {
            self.cache.layer1(&layer1_key)
        };
        debug!(
            state = %input.state,
            layer1 = layer1_key.fingerprint(),
            layer2 = layer2_key.fingerprint(),
            layer1_hit = layer1.is_some(),
            layer2_hit = layer2.is_some(),
            "render job prepared"
        );

        Ok(RenderJob {
            input,
            quality,
            canvas: self.canvas,
            layer1_key,
            layer2_key,
            layer1,
            layer2,
            remover: Arc::clone(&self.remover),
        })
    }

    /// Install freshly computed layers and return the output.
    ///
    /// Fast renders never populate Layer 2.
    pub fn complete(&mut self, done: FinishedJob) -> RenderOutput {
        if let Some(img) = done.fresh_layer1 {
            self.cache.put_layer1(done.layer1_key, img);
        }
        if let Some(img) = done.fresh_layer2 {
            self.cache.put_layer2(done.layer2_key, img);
        }
        done.output
    }

    /// Prepare, run and complete on the calling thread.
    pub fn render(&mut self, input: RenderInput, quality: Quality) -> PortraitResult<RenderOutput> {
        let job = self.prepare(input, quality)?;
        let done = job.run()?;
        Ok(self.complete(done))
    }

    /// Render one state of `project`; `Ok(None)` when there is nothing to render.
    pub fn render_state(
        &mut self,
        project: &StoredProject,
        state: StateKey,
        quality: Quality,
    ) -> PortraitResult<Option<RenderOutput>> {
        match RenderInput::for_state(project, state) {
            Some(input) => self.render(input, quality).map(Some),
            None => {
                debug!(state = %state, "nothing to render");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
