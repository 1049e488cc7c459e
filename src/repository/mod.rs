//! Slot pool on disk: `<root>/face1 .. face<N>`, each holding `project_data.json`, a
//! `sources/` directory and the exported PNGs. Deleted slots move to `<root>/.trash`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    assets::store::SUPPORTED_EXTENSIONS,
    foundation::{
        error::{PortraitError, PortraitResult},
        fs::{ensure_dir, extension_lower, is_free_location, to_json_pretty, write_atomic},
    },
    project::{
        DEFAULT_DISPLAY_NAME, Project, ProjectSet, StoredProject,
        model::{METADATA_FILE, SOURCES_DIR},
    },
};

/// Slots in a pool when the configuration does not say otherwise.
pub const DEFAULT_SLOT_CAPACITY: usize = 100;
/// Directory under the pool root that receives deleted slots.
pub const TRASH_DIR: &str = ".trash";
const SLOT_PREFIX: &str = "face";
const BACKUP_EXTENSION: &str = "bak";

/// What a slot directory currently holds.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotStatus {
    /// No metadata and no images.
    Empty,
    /// Images (or unreadable metadata) without a usable project record.
    Unmanaged,
    /// A readable project record.
    Managed(StoredProject),
}

/// One slot as seen by [`ProjectRepository::list`].
#[derive(Clone, Debug, PartialEq)]
pub struct SlotEntry {
    /// 1-based slot number.
    pub index: usize,
    /// Slot directory.
    pub path: PathBuf,
    /// What the slot holds.
    pub status: SlotStatus,
}

impl SlotEntry {
    /// The project if the slot is managed.
    pub fn project(&self) -> Option<&StoredProject> {
        match &self.status {
            SlotStatus::Managed(p) => Some(p),
            _ => None,
        }
    }
}

/// Where a deleted slot went; enough to move it back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrashReceipt {
    /// Slot directory before the delete.
    pub original: PathBuf,
    /// Location inside the trash directory.
    pub trashed: PathBuf,
}

/// Pool of `face1..faceN` slot directories under one root.
#[derive(Clone, Debug)]
pub struct ProjectRepository {
    root: PathBuf,
    capacity: usize,
}

impl ProjectRepository {
    /// Repository over `root` with `capacity` slots. Nothing is touched on disk yet.
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            root: root.into(),
            capacity,
        }
    }

    /// Pool root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `<root>/face<index>`
    pub fn slot_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("{SLOT_PREFIX}{index}"))
    }

    /// `<root>/.trash`
    pub fn trash_dir(&self) -> PathBuf {
        self.root.join(TRASH_DIR)
    }

    /// Enumerate slots `1..=capacity`, creating missing directories on the way.
    pub fn list(&self) -> PortraitResult<Vec<SlotEntry>> {
        ensure_dir(&self.root)?;
        let mut out = Vec::with_capacity(self.capacity);
        for index in 1..=self.capacity {
            let path = self.slot_path(index);
            if !path.exists()
                && let Err(e) = fs::create_dir_all(&path)
            {
                warn!(slot = index, error = %e, "could not create slot directory");
            }
            let status = self.classify(&path);
            out.push(SlotEntry {
                index,
                path,
                status,
            });
        }
        Ok(out)
    }

    /// Every managed project, keyed by id.
    pub fn projects(&self) -> PortraitResult<ProjectSet> {
        Ok(self
            .list()?
            .into_iter()
            .filter_map(|e| match e.status {
                SlotStatus::Managed(p) => Some((p.id(), p)),
                _ => None,
            })
            .collect())
    }

    fn classify(&self, dir: &Path) -> SlotStatus {
        if dir.join(METADATA_FILE).is_file() {
            return match self.load(dir) {
                Ok(p) => SlotStatus::Managed(p),
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "unreadable project metadata");
                    SlotStatus::Unmanaged
                }
            };
        }
        if has_images(dir) || has_images(&dir.join(SOURCES_DIR)) {
            SlotStatus::Unmanaged
        } else {
            SlotStatus::Empty
        }
    }

    /// Initialize the lowest-numbered empty slot with a new project.
    pub fn create_slot(&self, display_name: &str) -> PortraitResult<StoredProject> {
        let free = self
            .list()?
            .into_iter()
            .find(|e| e.status == SlotStatus::Empty)
            .ok_or(PortraitError::PoolExhausted(self.capacity))?;

        let name = match display_name.trim() {
            "" => DEFAULT_DISPLAY_NAME,
            n => n,
        };
        let stored = StoredProject::new(Project::new(name), free.path);
        ensure_dir(&stored.sources_dir())?;
        self.save(&stored)?;
        info!(slot = %stored.slot_name(), id = %stored.id(), "created project");
        Ok(stored)
    }

    /// Read `<dir>/project_data.json`.
    pub fn load(&self, dir: &Path) -> PortraitResult<StoredProject> {
        let path = dir.join(METADATA_FILE);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PortraitError::not_found(format!("project metadata '{}'", path.display()))
            }
            _ => PortraitError::io(format!("read '{}'", path.display()), e),
        })?;
        let record: Project = serde_json::from_slice(&bytes).map_err(|e| {
            PortraitError::serde(format!("parse '{}': {e}", path.display()))
        })?;
        Ok(StoredProject::new(record, dir))
    }

    /// Persist the record, keeping the previous file as `project_data.json.bak`.
    pub fn save(&self, project: &StoredProject) -> PortraitResult<()> {
        ensure_dir(project.dir())?;
        let path = project.metadata_path();
        if path.is_file() {
            let bak = path.with_extension(format!("json.{BACKUP_EXTENSION}"));
            fs::copy(&path, &bak)
                .map_err(|e| PortraitError::io(format!("back up '{}'", path.display()), e))?;
        }
        write_atomic(&path, &to_json_pretty(&project.record)?)?;
        debug!(slot = %project.slot_name(), "saved project");
        Ok(())
    }

    /// Move the slot directory into the trash under a collision-proof name.
    pub fn delete(&self, project: &StoredProject) -> PortraitResult<TrashReceipt> {
        let original = project.dir().to_path_buf();
        if !original.is_dir() {
            return Err(PortraitError::not_found(format!(
                "slot '{}'",
                original.display()
            )));
        }
        let trash = self.trash_dir();
        ensure_dir(&trash)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let trashed = trash.join(format!("{}_{stamp}_{}", project.slot_name(), &tag[..8]));
        fs::rename(&original, &trashed).map_err(|e| {
            PortraitError::io(format!("move '{}' to trash", original.display()), e)
        })?;
        info!(slot = %project.slot_name(), trashed = %trashed.display(), "project moved to trash");
        Ok(TrashReceipt { original, trashed })
    }

    /// Move a trashed slot back. Fails with `StaleUndo` if the original location is taken.
    pub fn restore(&self, receipt: &TrashReceipt) -> PortraitResult<StoredProject> {
        if !is_free_location(&receipt.original) {
            return Err(PortraitError::stale_undo(format!(
                "'{}' is occupied",
                receipt.original.display()
            )));
        }
        if !receipt.trashed.is_dir() {
            return Err(PortraitError::not_found(format!(
                "trashed slot '{}'",
                receipt.trashed.display()
            )));
        }
        if receipt.original.exists() {
            fs::remove_dir(&receipt.original).map_err(|e| {
                PortraitError::io(format!("clear '{}'", receipt.original.display()), e)
            })?;
        }
        if let Some(parent) = receipt.original.parent() {
            ensure_dir(parent)?;
        }
        fs::rename(&receipt.trashed, &receipt.original).map_err(|e| {
            PortraitError::io(
                format!("restore '{}'", receipt.original.display()),
                e,
            )
        })?;
        info!(slot = %receipt.original.display(), "project restored from trash");
        self.load(&receipt.original)
    }
}

fn has_images(dir: &Path) -> bool {
    let Ok(rd) = fs::read_dir(dir) else {
        return false;
    };
    rd.flatten().any(|e| {
        let p = e.path();
        p.is_file()
            && extension_lower(&p).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/repository/repository.rs"]
mod tests;
