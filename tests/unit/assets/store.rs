use super::*;

fn write_png(path: &Path) {
    image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn import_then_resolve_by_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("Portrait Final.PNG");
    write_png(&dir.path().join("tmp.png"));
    std::fs::rename(dir.path().join("tmp.png"), &src).unwrap();

    let store = ImageStore::new(dir.path().join("sources"));
    let id = store.import(&src).unwrap();
    let resolved = store.resolve(&id).unwrap();
    assert_eq!(resolved.extension().unwrap(), "png");
    assert_eq!(resolved.file_stem().unwrap().to_str().unwrap(), id.as_str());
    assert_eq!(std::fs::read(&resolved).unwrap(), std::fs::read(&src).unwrap());
}

#[test]
fn import_missing_file_is_not_found_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path().join("sources"));
    let err = store.import(&dir.path().join("nope.png")).unwrap_err();
    assert!(err.is_not_found());
    assert!(!dir.path().join("sources").exists());
}

#[test]
fn import_rejects_unknown_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("notes.txt");
    std::fs::write(&src, b"hello").unwrap();
    let store = ImageStore::new(dir.path().join("sources"));
    assert!(matches!(
        store.import(&src),
        Err(PortraitError::Validation(_))
    ));
}

#[test]
fn unresolved_reference_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path());
    let missing = SourceRef("0000".into());
    assert!(store.resolve(&missing).is_none());
    assert!(store.require(&missing).unwrap_err().is_not_found());
}

#[test]
fn resolve_ignores_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("abc.webp"), b"opaque").unwrap();
    let store = ImageStore::new(dir.path());
    let got = store.resolve(&SourceRef("abc".into())).unwrap();
    assert!(got.ends_with("abc.webp"));
}
