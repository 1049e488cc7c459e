//! Portrait maker: turns source pictures into the fixed set of character portrait files a
//! game expects.
//!
//! A pool directory holds numbered slots (`face1..faceN`). Each managed slot stores one
//! [`Project`] with per-state [`RenderParameters`] and the imported source images.
//!
//! # Pipeline overview
//!
//! 1. **Segment**: optional background removal ([`BackgroundRemover`]) with alpha matting
//! 2. **Compose**: scale and place the image on the 1920x1080 [`Canvas`]
//! 3. **Crop**: cut the two icons around the [`FaceCenter`]
//! 4. **Export**: write the PNG set of every state into its slot
//!
//! [`EditorSession`] ties the pieces together with undo/redo and render caching.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub(crate) mod assets;
/// Application configuration file.
pub mod config;
/// Log routing to stderr and in-process sinks.
pub mod diagnostics;
pub(crate) mod foundation;
/// Undo/redo of project edits.
pub mod history;
/// Project records and parameter propagation.
pub mod project;
/// Compositing, caching, preview and export.
pub mod render;
/// Slot pool on disk.
pub mod repository;
/// Background removal.
pub mod segment;
/// Editing session facade.
pub mod session;

pub use assets::{decode::load_image, store::ImageStore};
pub use config::AppConfig;
pub use foundation::core::{CANVAS_HEIGHT, CANVAS_WIDTH, Canvas, FaceCenter};
pub use foundation::error::{PortraitError, PortraitResult};
pub use history::{Applied, HistoryKind, HistoryManager};
pub use project::{
    IndividualChange, Project, ProjectId, ProjectSet, RenderParameters, RenderState, SourceRef,
    StateKey, StoredProject,
};
pub use render::{ExportReport, Quality, RenderOutput, RenderPipeline};
pub use repository::{ProjectRepository, SlotEntry, SlotStatus, TrashReceipt};
pub use segment::{BackgroundRemover, MattingOptions};
pub use session::EditorSession;
