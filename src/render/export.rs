use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    assets::decode::load_image,
    foundation::{
        error::{PortraitError, PortraitResult},
        fs::write_group_atomic,
    },
    project::{StateKey, StoredProject},
    render::{
        pipeline::{FinishedJob, RenderInput, RenderJob, RenderPipeline},
        stages::{Quality, apply_frame},
    },
};

/// How [`export_project`] spreads state renders over threads.
#[derive(Clone, Debug)]
pub struct ExportThreading {
    /// Render states on a rayon pool.
    pub parallel: bool,
    /// Pool size; `None` uses rayon's default.
    pub threads: Option<usize>,
}

impl Default for ExportThreading {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Outcome of exporting one project.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Every file written, in completion order.
    pub written: Vec<PathBuf>,
    /// States present but without a resolvable image.
    pub skipped: Vec<StateKey>,
    /// States that failed, with the reason.
    pub failures: Vec<(StateKey, PortraitError)>,
}

impl ExportReport {
    /// No state failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Export file names for one state: three composite copies, the wide icon, and for
/// `normal` the square icon.
pub fn export_file_names(state: StateKey) -> Vec<String> {
    let s = state.suffix();
    let mut names = vec![
        format!("face_c{s}.png"),
        format!("face_d{s}.png"),
        format!("face_e{s}.png"),
        format!("face_b{s}.png"),
    ];
    if state == StateKey::Normal {
        names.push("face_a.png".to_owned());
    }
    names
}

/// `<frames_dir>/<frame_id>.png`
pub fn frame_path(frames_dir: &Path, frame_id: &str) -> PathBuf {
    frames_dir.join(format!("{frame_id}.png"))
}

pub(crate) fn encode_png(image: &RgbaImage) -> PortraitResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| PortraitError::Other(anyhow::anyhow!("png encode: {e}")))?;
    Ok(buf.into_inner())
}

fn load_frame(
    project: &StoredProject,
    frames_dir: Option<&Path>,
) -> PortraitResult<Option<RgbaImage>> {
    let Some(frame_id) = project.record.frame_id.as_deref() else {
        return Ok(None);
    };
    let dir = frames_dir.ok_or_else(|| {
        PortraitError::not_found(format!("frame '{frame_id}': no frames directory configured"))
    })?;
    load_image(&frame_path(dir, frame_id)).map(Some)
}

/// Render one state and write all of its files. Either every file lands or none does.
fn run_and_write(
    job: RenderJob,
    out_dir: &Path,
    frame: Option<&RgbaImage>,
) -> PortraitResult<(FinishedJob, Vec<PathBuf>)> {
    let state = job.state();
    let done = job.run()?;
    let out = done.output();

    let composite_png = match frame {
        Some(f) => encode_png(&apply_frame(&out.composite, f)?)?,
        None => encode_png(&out.composite)?,
    };
    let icon_b_png = encode_png(&out.icon_b)?;
    let icon_a_png = if state == StateKey::Normal {
        Some(encode_png(&out.icon_a)?)
    } else {
        None
    };

    let mut files = Vec::new();
    for name in export_file_names(state) {
        let bytes = if name.starts_with("face_b") {
            icon_b_png.clone()
        } else if name == "face_a.png" {
            icon_a_png.clone().unwrap_or_default()
        } else {
            composite_png.clone()
        };
        files.push((out_dir.join(name), bytes));
    }
    write_group_atomic(&files)?;
    Ok((done, files.into_iter().map(|(path, _)| path).collect()))
}

/// Render every state of `project` at full quality and write the export files into its slot.
///
/// A configured frame that cannot be loaded aborts before anything is written. Failures of
/// single states are collected in the report and do not stop their siblings.
pub fn export_project(
    pipeline: &mut RenderPipeline,
    project: &StoredProject,
    frames_dir: Option<&Path>,
    threading: &ExportThreading,
) -> PortraitResult<ExportReport> {
    let frame = load_frame(project, frames_dir)?;
    let out_dir = project.dir().to_path_buf();
    let mut report = ExportReport::default();

    let mut jobs = Vec::new();
    for state in StateKey::ALL {
        let present = state == StateKey::Normal || project.record.states.contains_key(&state);
        if !present {
            continue;
        }
        match RenderInput::for_state(project, state) {
            Some(input) => match pipeline.prepare(input, Quality::Full) {
                Ok(job) => jobs.push(job),
                Err(e) => report.failures.push((state, e)),
            },
            None => report.skipped.push(state),
        }
    }

    let results: Vec<(StateKey, PortraitResult<(FinishedJob, Vec<PathBuf>)>)> =
        if threading.parallel && jobs.len() > 1 {
            let pool = build_thread_pool(threading.threads)?;
            pool.install(|| {
                jobs.into_par_iter()
                    .map(|job| (job.state(), run_and_write(job, &out_dir, frame.as_ref())))
                    .collect()
            })
        } else {
            jobs.into_iter()
                .map(|job| (job.state(), run_and_write(job, &out_dir, frame.as_ref())))
                .collect()
        };

    for (state, result) in results {
        match result {
            Ok((done, mut written)) => {
                pipeline.complete(done);
                report.written.append(&mut written);
            }
            Err(e) => {
                warn!(state = %state, error = %e, "state export failed");
                report.failures.push((state, e));
            }
        }
    }

    info!(
        slot = %project.slot_name(),
        written = report.written.len(),
        skipped = report.skipped.len(),
        failed = report.failures.len(),
        "export finished"
    );
    Ok(report)
}

fn build_thread_pool(threads: Option<usize>) -> PortraitResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(PortraitError::validation(
            "export threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        PortraitError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}"))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/export.rs"]
mod tests;
