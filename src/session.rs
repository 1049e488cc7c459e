//! Single-owner editing facade tying the repository, history and render pipeline together.
//!
//! Every mutating call works on a copy of the project and only commits (recording the
//! pre-mutation snapshot in history) when the change succeeds, so a failed operation leaves
//! both memory and history as they were.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use image::RgbaImage;
use tracing::{info, warn};

use crate::{
    assets::store::ImageStore,
    config::AppConfig,
    foundation::{
        core::{Canvas, FaceCenter},
        error::{PortraitError, PortraitResult},
    },
    history::{Applied, DEFAULT_HISTORY_DEPTH, HistoryManager},
    project::{
        IndividualChange, ProjectId, ProjectSet, RenderParameters, RenderState, SourceRef,
        StateKey, StoredProject, apply_edit, set_global_params, set_individual_flag,
        set_local_params,
    },
    render::{
        CacheOpts, ExportReport, ExportThreading, HostUiLayers, PreviewOptions, Quality,
        RenderOutput, RenderPipeline, export_project, preview_frame,
    },
    repository::{ProjectRepository, SlotEntry},
};

/// Everything an editor front end drives: the slot pool, loaded projects, undo history
/// and the render pipeline.
///
/// Every edit goes through one place that snapshots the project for undo and writes the
/// change to disk; an edit that fails or changes nothing leaves both alone.
pub struct EditorSession {
    repo: ProjectRepository,
    history: HistoryManager,
    pipeline: RenderPipeline,
    projects: ProjectSet,
    frames_dir: Option<PathBuf>,
    host_ui: HostUiLayers,
    threading: ExportThreading,
}

impl EditorSession {
    /// Build a session from configuration and load the pool.
    pub fn open(config: &AppConfig) -> PortraitResult<Self> {
        let repo = config.repository()?;
        let pipeline = RenderPipeline::new(
            Arc::new(config.background_remover()?),
            config.cache_opts(),
        );
        let host_ui = HostUiLayers::load(
            config.host_ui.background.as_deref(),
            config.host_ui.foreground.as_deref(),
        )
        .unwrap_or_else(|e| {
            warn!(error = %e, "host UI layers unavailable, previews will omit them");
            HostUiLayers::default()
        });

        let mut session = Self::new(repo, pipeline, config.history_depth);
        session.frames_dir = config.frames_dir.clone();
        session.host_ui = host_ui;
        session.refresh()?;
        Ok(session)
    }

    /// A session with no projects loaded yet; call [`EditorSession::refresh`].
    pub fn new(repo: ProjectRepository, pipeline: RenderPipeline, history_depth: usize) -> Self {
        Self {
            history: HistoryManager::new(repo.clone(), history_depth),
            repo,
            pipeline,
            projects: ProjectSet::new(),
            frames_dir: None,
            host_ui: HostUiLayers::default(),
            threading: ExportThreading::default(),
        }
    }

    /// Default pipeline and history depth over `repo`.
    pub fn with_repository(repo: ProjectRepository) -> Self {
        Self::new(
            repo,
            RenderPipeline::new(Arc::default(), CacheOpts::default()),
            DEFAULT_HISTORY_DEPTH,
        )
    }

    /// Directory searched for frame overlays.
    pub fn set_frames_dir(&mut self, dir: Option<PathBuf>) {
        self.frames_dir = dir;
    }

    /// Threading used by [`save`](Self::save).
    pub fn set_export_threading(&mut self, threading: ExportThreading) {
        self.threading = threading;
    }

    /// The slot pool.
    pub fn repository(&self) -> &ProjectRepository {
        &self.repo
    }

    /// Undo and redo stacks.
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// The render pipeline and its cache.
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Mutable pipeline.
    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline {
        &mut self.pipeline
    }

    /// Loaded projects by id.
    pub fn projects(&self) -> &ProjectSet {
        &self.projects
    }

    /// Rescan the pool. In-memory edits that were not saved are discarded along with history.
    pub fn refresh(&mut self) -> PortraitResult<Vec<SlotEntry>> {
        let slots = self.repo.list()?;
        self.projects = slots
            .iter()
            .filter_map(|e| e.project().map(|p| (p.id(), p.clone())))
            .collect();
        self.history.clear();
        info!(projects = self.projects.len(), "project pool loaded");
        Ok(slots)
    }

    /// Loaded project, or `NotFound`.
    pub fn project(&self, id: ProjectId) -> PortraitResult<&StoredProject> {
        self.projects
            .get(&id)
            .ok_or_else(|| PortraitError::not_found(format!("project {id}")))
    }

    /// Loaded project living in slot `index` (1-based).
    pub fn project_in_slot(&self, index: usize) -> Option<&StoredProject> {
        self.projects
            .values()
            .find(|p| p.slot_index() == Some(index))
    }

    /// Create a project in the first free slot. Not recorded in history.
    pub fn create_project(&mut self, display_name: &str) -> PortraitResult<ProjectId> {
        let p = self.repo.create_slot(display_name)?;
        let id = p.id();
        self.projects.insert(id, p);
        Ok(id)
    }

    /// Run `f` on a copy; commit and record history only when it succeeds and reports a change.
    fn mutate<R>(
        &mut self,
        id: ProjectId,
        f: impl FnOnce(&mut StoredProject) -> PortraitResult<(R, bool)>,
    ) -> PortraitResult<R> {
        let current = self
            .projects
            .get(&id)
            .ok_or_else(|| PortraitError::not_found(format!("project {id}")))?;
        let mut next = current.clone();
        let (out, changed) = f(&mut next)?;
        if changed {
            self.history.record_before_mutation(current);
            self.projects.insert(id, next);
        }
        Ok(out)
    }

    /// Change the display name.
    pub fn rename(&mut self, id: ProjectId, display_name: &str) -> PortraitResult<()> {
        self.mutate(id, |p| {
            p.record.display_name = display_name.to_owned();
            Ok(((), true))
        })
    }

    /// Copy `file` into the project and point `state` at it.
    pub fn import_source(
        &mut self,
        id: ProjectId,
        state: StateKey,
        file: &Path,
    ) -> PortraitResult<SourceRef> {
        let store = ImageStore::for_project(self.project(id)?);
        let source_ref = store.import(file)?;
        let r = source_ref.clone();
        self.mutate(id, move |p| {
            p.record.state_mut(state).source_ref = Some(r);
            Ok(((), true))
        })?;
        Ok(source_ref)
    }

    /// Edit `state` the way the UI does: individual states locally, others through the defaults.
    pub fn edit_params(
        &mut self,
        id: ProjectId,
        state: StateKey,
        params: RenderParameters,
    ) -> PortraitResult<()> {
        self.mutate(id, |p| apply_edit(&mut p.record, state, params).map(|()| ((), true)))
    }

    /// Replace the project defaults and push them to every non-individual state.
    pub fn set_global_params(
        &mut self,
        id: ProjectId,
        params: RenderParameters,
    ) -> PortraitResult<()> {
        self.mutate(id, |p| set_global_params(&mut p.record, params).map(|()| ((), true)))
    }

    /// Replace the parameters of `state` alone; its individual flag is unchanged.
    pub fn set_local_params(
        &mut self,
        id: ProjectId,
        state: StateKey,
        params: RenderParameters,
    ) -> PortraitResult<()> {
        self.mutate(id, |p| {
            set_local_params(&mut p.record, state, params).map(|()| ((), true))
        })
    }

    /// See [`set_individual_flag`]; only an actual transition is recorded in history.
    pub fn set_individual<F>(
        &mut self,
        id: ProjectId,
        state: StateKey,
        individual: bool,
        confirm: F,
    ) -> PortraitResult<IndividualChange>
    where
        F: FnOnce(&RenderState, &RenderParameters) -> bool,
    {
        self.mutate(id, |p| {
            let change = set_individual_flag(&mut p.record, state, individual, confirm);
            let changed = matches!(
                change,
                IndividualChange::Detached | IndividualChange::Rejoined
            );
            Ok((change, changed))
        })
    }

    /// Set the anchor of one state (routed like any parameter edit) or, with `state = None`,
    /// the project-wide fallback. Points are clamped to the canvas.
    pub fn set_face_center(
        &mut self,
        id: ProjectId,
        state: Option<StateKey>,
        center: Option<FaceCenter>,
    ) -> PortraitResult<()> {
        let center = center.map(|c| c.clamped(Canvas::FULL));
        self.mutate(id, |p| {
            match state {
                Some(key) => {
                    let mut params = p.record.state_or_default(key).params;
                    params.face_center = center;
                    apply_edit(&mut p.record, key, params)?;
                }
                None => p.record.face_center = center,
            }
            Ok(((), true))
        })
    }

    /// Select a frame overlay by id, or clear it with `None`.
    pub fn set_frame(&mut self, id: ProjectId, frame_id: Option<String>) -> PortraitResult<()> {
        self.mutate(id, |p| {
            p.record.frame_id = frame_id.filter(|f| !f.is_empty());
            Ok(((), true))
        })
    }

    /// Move the project to the trash; undoable.
    pub fn delete_project(&mut self, id: ProjectId) -> PortraitResult<()> {
        let project = self.project(id)?.clone();
        let receipt = self.repo.delete(&project)?;
        self.projects.remove(&id);
        let cache = self.pipeline.cache_mut();
        for state in project.record.states.values() {
            if let Some(source_ref) = &state.source_ref {
                cache.invalidate_source(source_ref);
            }
        }
        self.history.record_delete(project, receipt);
        Ok(())
    }

    /// Undo the latest step. See [`HistoryManager::undo`].
    pub fn undo(&mut self) -> PortraitResult<Option<Applied>> {
        self.history.undo(&mut self.projects)
    }

    /// Redo the latest undone step.
    pub fn redo(&mut self) -> PortraitResult<Option<Applied>> {
        self.history.redo(&mut self.projects)
    }

    /// Render `state` through the cache. `Ok(None)` when the state has no image.
    pub fn render(
        &mut self,
        id: ProjectId,
        state: StateKey,
        quality: Quality,
    ) -> PortraitResult<Option<RenderOutput>> {
        let project = self
            .projects
            .get(&id)
            .ok_or_else(|| PortraitError::not_found(format!("project {id}")))?;
        self.pipeline.render_state(project, state, quality)
    }

    /// Preview image with the session's host UI layers; `None` when the state has no image.
    pub fn preview(
        &mut self,
        id: ProjectId,
        state: StateKey,
        quality: Quality,
        show_marker: bool,
    ) -> PortraitResult<Option<RgbaImage>> {
        let opts = PreviewOptions {
            host_ui: (!self.host_ui.is_empty()).then(|| self.host_ui.clone()),
            show_marker,
        };
        Ok(self
            .render(id, state, quality)?
            .map(|out| preview_frame(&out, &opts)))
    }

    /// Persist the record, then export every state at full quality.
    pub fn save(&mut self, id: ProjectId) -> PortraitResult<ExportReport> {
        let project = self
            .projects
            .get(&id)
            .ok_or_else(|| PortraitError::not_found(format!("project {id}")))?;
        self.repo.save(project)?;
        export_project(
            &mut self.pipeline,
            project,
            self.frames_dir.as_deref(),
            &self.threading,
        )
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
