use super::*;

#[test]
fn write_atomic_replaces_content_and_leaves_no_temp() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("data.json");
    write_atomic(&target, b"one").unwrap();
    write_atomic(&target, b"two").unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"two");
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names.len(), 1);
}

#[test]
fn write_atomic_into_missing_dir_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nope").join("data.json");
    let err = write_atomic(&target, b"x").unwrap_err();
    assert!(matches!(err, PortraitError::IoFailure { .. }));
}

#[test]
fn temp_siblings_are_hidden_and_unique() {
    let a = temp_sibling(Path::new("/x/face_c.png"));
    let b = temp_sibling(Path::new("/x/face_c.png"));
    assert_ne!(a, b);
    assert_eq!(a.parent(), Some(Path::new("/x")));
    assert!(a.file_name().unwrap().to_string_lossy().starts_with(".face_c.png."));
}

#[test]
fn free_location_rules() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    assert!(is_free_location(&missing));

    let empty = dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();
    assert!(is_free_location(&empty));

    std::fs::write(empty.join("f"), b"1").unwrap();
    assert!(!is_free_location(&empty));
}

#[test]
fn extension_is_lowercased() {
    assert_eq!(extension_lower(Path::new("a/B.PNG")).as_deref(), Some("png"));
    assert_eq!(extension_lower(Path::new("noext")), None);
}

#[test]
fn group_write_replaces_every_target() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    std::fs::write(&a, b"old").unwrap();
    let files = [(a.clone(), b"new-a".to_vec()), (b.clone(), b"new-b".to_vec())];
    write_group_atomic(&files).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), b"new-a");
    assert_eq!(std::fs::read(&b).unwrap(), b"new-b");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn group_write_with_a_blocked_target_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    std::fs::write(&a, b"old").unwrap();
    std::fs::create_dir(&b).unwrap();

    let files = [(a.clone(), b"new".to_vec()), (b.clone(), b"x".to_vec())];
    let err = write_group_atomic(&files).unwrap_err();
    assert!(matches!(err, PortraitError::IoFailure { .. }));
    assert_eq!(std::fs::read(&a).unwrap(), b"old");
    assert!(b.is_dir());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}
