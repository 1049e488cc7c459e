//! Application settings persisted as `app_config.json`.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    foundation::{
        error::{PortraitError, PortraitResult},
        fs::{ensure_dir, to_json_pretty, write_atomic},
    },
    history::DEFAULT_HISTORY_DEPTH,
    render::CacheOpts,
    repository::{DEFAULT_SLOT_CAPACITY, ProjectRepository},
    segment::{
        BackgroundRemover, DEFAULT_MODEL_URL, ModelAsset, ModelGated, U2netFactory,
        default_model_path,
    },
};

/// File name of the configuration inside the config directory.
pub const CONFIG_FILE: &str = "app_config.json";
/// Environment variable overriding the config directory.
pub const ENV_CONFIG_DIR: &str = "PORTRAIT_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "PortraitMaker";
const APPLICATION: &str = "portrait";

/// Host game UI layers drawn around the preview.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostUiConfig {
    /// Image drawn under the composite.
    pub background: Option<PathBuf>,
    /// Image drawn over the composite.
    pub foreground: Option<PathBuf>,
}

/// Where the u2net weights come from and where they live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Download location of the weights.
    pub url: String,
    /// Defaults to `~/.u2net/u2net.onnx`.
    pub path: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MODEL_URL.to_owned(),
            path: None,
        }
    }
}

/// Capacities of the two render cache layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Segmented source images kept.
    pub layer1_capacity: usize,
    /// Full-quality composites kept.
    pub layer2_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let opts = CacheOpts::default();
        Self {
            layer1_capacity: opts.layer1_capacity,
            layer2_capacity: opts.layer2_capacity,
        }
    }
}

/// Everything read from `app_config.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// UI language code.
    pub language: String,
    /// Opaque to the core; kept for the window layer.
    pub window_geometry: String,
    /// Directory holding the `face<N>` slots.
    #[serde(alias = "last_open_path")]
    pub pool_root: Option<PathBuf>,
    /// Number of slots in the pool.
    pub slot_capacity: usize,
    /// Directory of `<frame_id>.png` overlays.
    pub frames_dir: Option<PathBuf>,
    /// Preview decoration layers.
    pub host_ui: HostUiConfig,
    /// u2net weights.
    pub model: ModelConfig,
    /// Refuse background removal until the u2net model file is installed.
    pub require_model: bool,
    /// Render cache sizes.
    pub cache: CacheConfig,
    /// Maximum undo steps kept.
    pub history_depth: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: "JP".to_owned(),
            window_geometry: "1200x800".to_owned(),
            pool_root: None,
            slot_capacity: DEFAULT_SLOT_CAPACITY,
            frames_dir: None,
            host_ui: HostUiConfig::default(),
            model: ModelConfig::default(),
            require_model: false,
            cache: CacheConfig::default(),
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

/// `$PORTRAIT_CONFIG_DIR/app_config.json`, else the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(dir) = env::var_os(ENV_CONFIG_DIR).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir).join(CONFIG_FILE));
    }
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|d| d.config_dir().join(CONFIG_FILE))
}

impl AppConfig {
    /// Load `path`, writing defaults first if it does not exist.
    ///
    /// An unreadable or malformed file yields defaults with a warning instead of an error.
    pub fn load_or_init(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!(path = %path.display(), "wrote default configuration"),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "could not write default configuration"
                ),
            }
            return config;
        }
        match Self::load(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    /// Strict load: missing or malformed files are errors.
    pub fn load(path: &Path) -> PortraitResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| PortraitError::io(format!("read config '{}'", path.display()), e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PortraitError::serde(format!("parse config '{}': {e}", path.display())))
    }

    /// Write as four-space indented JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> PortraitResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        write_atomic(path, &to_json_pretty(self)?)
    }

    /// Pool root, treating an empty legacy path as unset.
    pub fn project_root(&self) -> Option<&Path> {
        self.pool_root
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Repository over the configured pool root.
    pub fn repository(&self) -> PortraitResult<ProjectRepository> {
        let root = self
            .project_root()
            .ok_or_else(|| PortraitError::validation("no project pool root configured"))?;
        if self.slot_capacity == 0 {
            return Err(PortraitError::validation("slot_capacity must be >= 1"));
        }
        Ok(ProjectRepository::new(root, self.slot_capacity))
    }

    /// Cache capacities for a new [`RenderPipeline`](crate::render::RenderPipeline).
    pub fn cache_opts(&self) -> CacheOpts {
        CacheOpts {
            layer1_capacity: self.cache.layer1_capacity,
            layer2_capacity: self.cache.layer2_capacity,
        }
    }

    /// Model location, falling back to [`default_model_path`].
    pub fn model_asset(&self) -> PortraitResult<ModelAsset> {
        let path = match &self.model.path {
            Some(p) => p.clone(),
            None => default_model_path().ok_or_else(|| {
                PortraitError::model_unavailable("cannot determine home directory for model path")
            })?,
        };
        Ok(ModelAsset::new(self.model.url.clone(), path))
    }

    /// u2net over the configured model file when it is installed (or `require_model` is
    /// set, in which case removal fails with `ModelUnavailable` until it is); otherwise the
    /// colour-key segmenter.
    pub fn background_remover(&self) -> PortraitResult<BackgroundRemover> {
        let asset = match self.model_asset() {
            Ok(a) => a,
            Err(e) if !self.require_model => {
                warn!(error = %e, "no model location, using colour-key background removal");
                return Ok(BackgroundRemover::default());
            }
            Err(e) => return Err(e),
        };
        if self.require_model || (cfg!(feature = "u2net") && asset.is_installed()) {
            let factory = U2netFactory::new(asset.path.clone());
            return Ok(BackgroundRemover::new(ModelGated::new(asset, factory)));
        }
        info!(
            path = %asset.path.display(),
            "u2net model not installed, using colour-key background removal"
        );
        Ok(BackgroundRemover::default())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
