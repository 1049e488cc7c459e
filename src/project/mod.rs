//! Project data model ("Face") and the global/individual propagation contract.
//!
//! A [`Project`] carries a template [`RenderParameters`] (`defaults`) and a sparse map of
//! per-[`StateKey`] [`RenderState`]s. States that are not *individual* mirror the template:
//! every propagating edit rewrites them, while individual states only change through
//! [`set_local_params`].

pub(crate) mod model;
pub(crate) mod sync;

use std::collections::BTreeMap;

pub use model::{
    DEFAULT_DISPLAY_NAME, FaceCenter, Project, ProjectId, RECORD_VERSION, RenderParameters,
    RenderState, SourceRef, StateKey, StoredProject,
};
pub use sync::{
    IndividualChange, apply_edit, set_global_params, set_individual_flag, set_local_params,
};

/// In-memory projects keyed by their stable id.
pub type ProjectSet = BTreeMap<ProjectId, StoredProject>;
