use std::path::Path;

use image::{Rgba, RgbaImage};

use super::*;
use crate::{
    assets::store::ImageStore,
    project::{Project, StoredProject},
    render::{Quality, RenderInput, RenderPipeline},
};

fn project(dir: &Path) -> StoredProject {
    let file = dir.join("in.png");
    RgbaImage::from_pixel(8, 8, Rgba([10, 200, 10, 255]))
        .save(&file)
        .unwrap();
    let mut stored = StoredProject::new(Project::new("W"), dir.join("face1"));
    let r = ImageStore::for_project(&stored).import(&file).unwrap();
    stored.record.state_mut(StateKey::Normal).source_ref = Some(r);
    stored
}

#[test]
fn results_come_back_and_install_into_cache() {
    let dir = tempfile::tempdir().unwrap();
    let stored = project(dir.path());
    let mut pipeline = RenderPipeline::default();
    let mut worker = PreviewWorker::spawn().unwrap();

    let input = RenderInput::for_state(&stored, StateKey::Normal).unwrap();
    let job = pipeline.prepare(input, Quality::Full).unwrap();
    let ticket = worker.submit(job).unwrap();

    let res = worker.recv_timeout(Duration::from_secs(30)).unwrap();
    assert_eq!(res.ticket, ticket);
    assert_eq!(res.state, StateKey::Normal);
    let out = pipeline.complete(res.result.unwrap());
    assert_eq!(out.composite.dimensions(), (1920, 1080));
    assert_eq!(pipeline.cache().len(), (1, 1));
}

#[test]
fn latest_keeps_newest_ticket() {
    let dir = tempfile::tempdir().unwrap();
    let stored = project(dir.path());
    let mut pipeline = RenderPipeline::default();
    let mut worker = PreviewWorker::spawn().unwrap();

    let mut last = 0;
    for dx in 0..3 {
        let mut input = RenderInput::for_state(&stored, StateKey::Normal).unwrap();
        input.params.offset_x = dx;
        last = worker
            .submit(pipeline.prepare(input, Quality::Fast).unwrap())
            .unwrap();
    }

    // Jobs run in order, so once the last ticket arrives everything has.
    let mut seen = Vec::new();
    while seen.last() != Some(&last) {
        let r = worker.recv_timeout(Duration::from_secs(30)).unwrap();
        seen.push(r.ticket);
    }
    assert_eq!(seen, vec![1, 2, 3]);
    assert!(worker.latest().is_none());
}

#[test]
fn failures_are_reported_per_job() {
    let dir = tempfile::tempdir().unwrap();
    let stored = project(dir.path());
    let mut pipeline = RenderPipeline::default();
    let mut worker = PreviewWorker::spawn().unwrap();

    let input = RenderInput::for_state(&stored, StateKey::Normal).unwrap();
    std::fs::remove_file(&input.source_path).unwrap();
    worker
        .submit(pipeline.prepare(input, Quality::Fast).unwrap())
        .unwrap();
    let res = worker.recv_timeout(Duration::from_secs(30)).unwrap();
    assert!(res.result.unwrap_err().is_not_found());
}
