use image::Rgba;

use super::*;
use crate::history::HistoryKind;

fn open(capacity: usize) -> (tempfile::TempDir, EditorSession) {
    let dir = tempfile::tempdir().unwrap();
    let repo = ProjectRepository::new(dir.path().join("pool"), capacity);
    let mut session = EditorSession::with_repository(repo);
    session.refresh().unwrap();
    (dir, session)
}

fn source_png(dir: &Path) -> PathBuf {
    let file = dir.join("src.png");
    RgbaImage::from_pixel(40, 60, Rgba([200, 40, 40, 255]))
        .save(&file)
        .unwrap();
    file
}

fn scaled(scale: f32) -> RenderParameters {
    RenderParameters {
        scale,
        ..RenderParameters::default()
    }
}

#[test]
fn create_is_not_undoable() {
    let (_dir, mut s) = open(4);
    let id = s.create_project("A").unwrap();
    assert_eq!(s.project(id).unwrap().slot_index(), Some(1));
    assert!(!s.history().can_undo());
    assert_eq!(s.project_in_slot(1).map(|p| p.id()), Some(id));
}

#[test]
fn edits_record_history_and_undo_restores() {
    let (_dir, mut s) = open(2);
    let id = s.create_project("A").unwrap();
    let before = s.project(id).unwrap().clone();

    s.edit_params(id, StateKey::Poison, scaled(2.0)).unwrap();
    assert_eq!(s.project(id).unwrap().record.defaults.scale, 2.0);
    assert_eq!(s.history().undo_len(), 1);

    let applied = s.undo().unwrap().unwrap();
    applied.persist.unwrap().wait().unwrap();
    assert_eq!(s.project(id).unwrap(), &before);

    s.redo().unwrap().unwrap();
    assert_eq!(s.project(id).unwrap().record.defaults.scale, 2.0);
}

#[test]
fn rejected_edit_leaves_project_and_history_alone() {
    let (_dir, mut s) = open(2);
    let id = s.create_project("A").unwrap();
    let before = s.project(id).unwrap().clone();

    let err = s.set_global_params(id, scaled(0.0)).unwrap_err();
    assert!(matches!(err, PortraitError::Validation(_)));
    assert_eq!(s.project(id).unwrap(), &before);
    assert!(!s.history().can_undo());
}

#[test]
fn individual_toggle_records_only_transitions() {
    let (_dir, mut s) = open(2);
    let id = s.create_project("A").unwrap();

    let change = s
        .set_individual(id, StateKey::Dead, false, |_, _| true)
        .unwrap();
    assert_eq!(change, IndividualChange::Unchanged);
    assert!(!s.history().can_undo());

    let change = s.set_individual(id, StateKey::Dead, true, |_, _| true).unwrap();
    assert_eq!(change, IndividualChange::Detached);
    s.set_local_params(id, StateKey::Dead, scaled(3.0)).unwrap();

    let change = s
        .set_individual(id, StateKey::Dead, false, |_, _| false)
        .unwrap();
    assert_eq!(change, IndividualChange::Declined);
    assert_eq!(s.history().undo_len(), 2);
    assert_eq!(
        s.project(id).unwrap().record.state(StateKey::Dead).unwrap().params.scale,
        3.0
    );
}

#[test]
fn face_center_is_clamped_and_routed() {
    let (_dir, mut s) = open(2);
    let id = s.create_project("A").unwrap();

    s.set_face_center(id, None, Some(FaceCenter::new(5000, -20)))
        .unwrap();
    assert_eq!(
        s.project(id).unwrap().record.face_center,
        Some(FaceCenter::new(1920, 0))
    );

    s.set_face_center(id, Some(StateKey::Hp50), Some(FaceCenter::new(10, 10)))
        .unwrap();
    let record = &s.project(id).unwrap().record;
    assert_eq!(record.defaults.face_center, Some(FaceCenter::new(10, 10)));
    assert_eq!(
        record.resolve_anchor(StateKey::Normal),
        Some(FaceCenter::new(10, 10))
    );
}

#[test]
fn import_preview_and_save() {
    let (dir, mut s) = open(2);
    let file = source_png(dir.path());
    let id = s.create_project("A").unwrap();

    assert!(
        s.preview(id, StateKey::Normal, Quality::Fast, false)
            .unwrap()
            .is_none()
    );
    s.import_source(id, StateKey::Normal, &file).unwrap();
    let img = s
        .preview(id, StateKey::Normal, Quality::Fast, true)
        .unwrap()
        .unwrap();
    assert_eq!(img.dimensions(), (1920, 1080));

    let report = s.save(id).unwrap();
    assert!(report.is_success());
    assert_eq!(report.written.len(), 5);

    let stored = s.repository().load(s.project(id).unwrap().dir()).unwrap();
    assert_eq!(&stored, s.project(id).unwrap());
}

#[test]
fn delete_then_undo_brings_the_slot_back() {
    let (_dir, mut s) = open(2);
    let id = s.create_project("Gone").unwrap();
    let slot = s.project(id).unwrap().dir().to_path_buf();

    s.delete_project(id).unwrap();
    assert!(s.project(id).is_err());
    assert!(!slot.exists());

    let applied = s.undo().unwrap().unwrap();
    assert_eq!(applied.kind, HistoryKind::Delete);
    assert!(applied.present);
    assert!(slot.exists());
    assert_eq!(s.project(id).unwrap().record.display_name, "Gone");
}

#[test]
fn unknown_project_is_not_found() {
    let (_dir, mut s) = open(1);
    let ghost = ProjectId::new_v4();
    assert!(s.project(ghost).unwrap_err().is_not_found());
    assert!(s.rename(ghost, "x").unwrap_err().is_not_found());
}

#[test]
fn deleting_a_project_drops_its_cached_renders() {
    let (dir, mut s) = open(2);
    let file = source_png(dir.path());
    let keep = s.create_project("Keep").unwrap();
    let gone = s.create_project("Gone").unwrap();
    s.import_source(keep, StateKey::Normal, &file).unwrap();
    s.import_source(gone, StateKey::Normal, &file).unwrap();
    s.render(keep, StateKey::Normal, Quality::Full).unwrap();
    s.render(gone, StateKey::Normal, Quality::Full).unwrap();
    assert_eq!(s.pipeline().cache().len(), (2, 2));

    s.delete_project(gone).unwrap();
    assert_eq!(s.pipeline().cache().len(), (1, 1));
}
