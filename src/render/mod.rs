//! Source image → clean composite → icons, with a two-tier cache.
//!
//! Stages run in a fixed order: decode, background removal (Layer 1), scale, canvas
//! composition (Layer 2), icon extraction. Frame overlays are applied only on export;
//! host UI layers and the face marker only on preview copies.

pub(crate) mod cache;
pub(crate) mod composite;
pub(crate) mod export;
pub(crate) mod pipeline;
pub(crate) mod preview;
pub(crate) mod stages;
pub(crate) mod worker;

pub use cache::{CacheOpts, CacheStats, Layer1Key, Layer2Key, RenderCache};
pub use export::{ExportReport, ExportThreading, export_file_names, export_project, frame_path};
pub use pipeline::{FinishedJob, RenderInput, RenderJob, RenderOutput, RenderPipeline};
pub use preview::{HostUiLayers, PreviewOptions, preview_frame};
pub use stages::{BASE_HEIGHT, CropBox, IconTarget, Quality, icon_crop_box};
pub use worker::{PreviewResult, PreviewWorker};
