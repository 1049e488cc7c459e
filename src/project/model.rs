use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

pub use crate::foundation::core::FaceCenter;
use crate::foundation::error::{PortraitError, PortraitResult};

/// Metadata version written by this crate.
pub const RECORD_VERSION: &str = "1.1";

/// Name given to projects created without one.
pub const DEFAULT_DISPLAY_NAME: &str = "New Character";

/// Name of the metadata file inside a slot directory.
pub(crate) const METADATA_FILE: &str = "project_data.json";
/// Directory (inside a slot) holding imported source images.
pub(crate) const SOURCES_DIR: &str = "sources";

/// Closed set of portrait states a project may define.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    /// The base portrait; always present.
    Normal,
    /// Poisoned.
    Poison,
    /// Hit points at or below 75%.
    #[serde(rename = "hp_75")]
    Hp75,
    /// Hit points at or below 50%.
    #[serde(rename = "hp_50")]
    Hp50,
    /// Hit points at or below 25%.
    #[serde(rename = "hp_25")]
    Hp25,
    /// Knocked out.
    Dead,
    /// Frightened.
    Afraid,
    /// Asleep.
    Sleep,
    /// Paralyzed.
    Paralyzed,
    /// Petrified.
    Stoned,
    /// Turned to ash.
    Ashed,
}

impl StateKey {
    /// Every key, in export order.
    pub const ALL: [StateKey; 11] = [
        StateKey::Normal,
        StateKey::Poison,
        StateKey::Hp75,
        StateKey::Hp50,
        StateKey::Hp25,
        StateKey::Dead,
        StateKey::Afraid,
        StateKey::Sleep,
        StateKey::Paralyzed,
        StateKey::Stoned,
        StateKey::Ashed,
    ];

    /// Key as stored in project files (`hp_75`).
    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::Normal => "normal",
            StateKey::Poison => "poison",
            StateKey::Hp75 => "hp_75",
            StateKey::Hp50 => "hp_50",
            StateKey::Hp25 => "hp_25",
            StateKey::Dead => "dead",
            StateKey::Afraid => "afraid",
            StateKey::Sleep => "sleep",
            StateKey::Paralyzed => "paralyzed",
            StateKey::Stoned => "stoned",
            StateKey::Ashed => "ashed",
        }
    }

    /// File-name suffix used by exported images (`face_c{suffix}.png`).
    pub fn suffix(self) -> &'static str {
        match self {
            StateKey::Normal => "",
            StateKey::Poison => "_PO",
            StateKey::Hp75 => "_75",
            StateKey::Hp50 => "_50",
            StateKey::Hp25 => "_25",
            StateKey::Dead => "_DE",
            StateKey::Afraid => "_AF",
            StateKey::Sleep => "_SL",
            StateKey::Paralyzed => "_PA",
            StateKey::Stoned => "_ST",
            StateKey::Ashed => "_AS",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKey {
    type Err = PortraitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        StateKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PortraitError::validation(format!("unknown state key '{s}'")))
    }
}

/// Stable project identifier, persisted as the record's `uuid`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub uuid::Uuid);

impl ProjectId {
    /// Fresh random identifier.
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque handle to an imported source image (a generated identifier, not a file name).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(pub String);

impl SourceRef {
    /// Fresh random handle.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Placement and background-removal parameters for one rendered state.
///
/// Missing fields in stored records fall back to [`RenderParameters::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParameters {
    /// Uniform scale applied to the source before placement.
    pub scale: f32,
    /// Horizontal shift of the image centre from the canvas centre.
    pub offset_x: i32,
    /// Vertical shift of the image centre from the canvas centre.
    pub offset_y: i32,
    /// Icon crop anchor for this parameter set.
    pub face_center: Option<FaceCenter>,
    /// Remove the background before compositing.
    pub use_rembg: bool,
    /// Refine the removal mask with alpha matting.
    pub alpha_matting: bool,
    /// Mask value at or above which a pixel is certain foreground.
    pub alpha_matting_fg_threshold: u8,
    /// Mask value at or below which a pixel is certain background.
    pub alpha_matting_bg_threshold: u8,
    /// Erosion radius applied to both certain regions.
    pub alpha_matting_erode_size: u32,
    /// Zoom of the square icon around the anchor.
    pub icon_scale_a: f32,
    /// Zoom of the wide icon around the anchor.
    pub icon_scale_b: f32,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0,
            offset_y: 0,
            face_center: None,
            use_rembg: false,
            alpha_matting: false,
            alpha_matting_fg_threshold: 240,
            alpha_matting_bg_threshold: 10,
            alpha_matting_erode_size: 10,
            icon_scale_a: 1.0,
            icon_scale_b: 1.0,
        }
    }
}

impl RenderParameters {
    /// Reject non-finite or non-positive scales.
    pub fn validate(&self) -> PortraitResult<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PortraitError::validation("scale must be finite and > 0"));
        }
        for (name, v) in [
            ("icon_scale_a", self.icon_scale_a),
            ("icon_scale_b", self.icon_scale_b),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(PortraitError::validation(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }
}

/// One state's full parameter set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Imported image, if any.
    #[serde(rename = "source_uuid", default)]
    pub source_ref: Option<SourceRef>,
    /// Placement and removal parameters.
    #[serde(flatten)]
    pub params: RenderParameters,
    /// Local parameters that no longer follow the project defaults.
    #[serde(default)]
    pub is_individual: bool,
}

impl RenderState {
    /// A state that tracks `defaults` and has no image yet.
    pub fn tracking(defaults: &RenderParameters) -> Self {
        Self {
            source_ref: None,
            params: defaults.clone(),
            is_individual: false,
        }
    }
}

fn default_version() -> String {
    RECORD_VERSION.to_string()
}

/// One character's portrait project, exactly as persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Record format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Name shown in the slot list.
    #[serde(default)]
    pub display_name: String,
    /// Identifier, stored as `uuid`.
    #[serde(rename = "uuid")]
    pub id: ProjectId,
    /// Project-wide anchor used when no parameter set has one.
    #[serde(default)]
    pub face_center: Option<FaceCenter>,
    /// Overlay drawn on exported composites, by file stem.
    #[serde(default)]
    pub frame_id: Option<String>,
    /// Parameters that non-individual states follow.
    #[serde(default)]
    pub defaults: RenderParameters,
    /// Defined states; `normal` is created with the project.
    #[serde(default)]
    pub states: BTreeMap<StateKey, RenderState>,
}

impl Project {
    /// New project with a fresh id and only the `normal` state.
    pub fn new(display_name: impl Into<String>) -> Self {
        let defaults = RenderParameters::default();
        let mut states = BTreeMap::new();
        states.insert(StateKey::Normal, RenderState::tracking(&defaults));
        Self {
            version: default_version(),
            display_name: display_name.into(),
            id: ProjectId::new_v4(),
            face_center: None,
            frame_id: None,
            defaults,
            states,
        }
    }

    /// Stored state, without falling back to defaults.
    pub fn state(&self, key: StateKey) -> Option<&RenderState> {
        self.states.get(&key)
    }

    /// `normal` always exists logically; other keys fall back to a defaults-tracking state.
    pub fn state_or_default(&self, key: StateKey) -> RenderState {
        self.states
            .get(&key)
            .cloned()
            .unwrap_or_else(|| RenderState::tracking(&self.defaults))
    }

    /// Materialize a sparse state, seeding it from the current defaults.
    pub fn state_mut(&mut self, key: StateKey) -> &mut RenderState {
        let defaults = &self.defaults;
        self.states
            .entry(key)
            .or_insert_with(|| RenderState::tracking(defaults))
    }

    /// Anchor resolution: state → defaults → project → none.
    pub fn resolve_anchor(&self, key: StateKey) -> Option<FaceCenter> {
        self.states
            .get(&key)
            .and_then(|s| s.params.face_center)
            .or(self.defaults.face_center)
            .or(self.face_center)
    }

    /// States that reference an image, in export order.
    pub fn states_with_source(&self) -> impl Iterator<Item = (StateKey, &RenderState)> + '_ {
        StateKey::ALL.into_iter().filter_map(|k| {
            self.states
                .get(&k)
                .filter(|s| s.source_ref.is_some())
                .map(|s| (k, s))
        })
    }
}

/// A [`Project`] plus the non-persisted location of its slot directory.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredProject {
    /// Persisted content.
    pub record: Project,
    /// Slot directory.
    pub storage_path: PathBuf,
}

impl StoredProject {
    /// Pair `record` with the slot directory it lives in.
    pub fn new(record: Project, storage_path: impl Into<PathBuf>) -> Self {
        Self {
            record,
            storage_path: storage_path.into(),
        }
    }

    /// Shortcut for `record.id`.
    pub fn id(&self) -> ProjectId {
        self.record.id
    }

    /// Slot directory.
    pub fn dir(&self) -> &Path {
        &self.storage_path
    }

    /// Directory name of the slot (`face7`).
    pub fn slot_name(&self) -> String {
        self.storage_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Numeric slot index parsed from the directory name, if it follows the pool naming.
    pub fn slot_index(&self) -> Option<usize> {
        self.slot_name().strip_prefix("face")?.parse().ok()
    }

    /// `<slot>/project_data.json`
    pub fn metadata_path(&self) -> PathBuf {
        self.storage_path.join(METADATA_FILE)
    }

    /// `<slot>/sources`
    pub fn sources_dir(&self) -> PathBuf {
        self.storage_path.join(SOURCES_DIR)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/model.rs"]
mod tests;
