use std::io::Cursor;

use super::*;

fn asset_in(dir: &Path) -> ModelAsset {
    ModelAsset::new("http://invalid.localhost/u2net.onnx", dir.join("m").join("u2net.onnx"))
}

#[test]
fn install_writes_final_file_and_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let asset = asset_in(dir.path());
    let payload = vec![7u8; CHUNK_SIZE * 2 + 10];
    let mut seen = Vec::new();

    let outcome = asset
        .install_from_reader(
            Cursor::new(payload.clone()),
            Some(payload.len() as u64),
            &CancelFlag::new(),
            |p| seen.push(p),
        )
        .unwrap();

    assert_eq!(
        outcome,
        DownloadOutcome::Completed {
            bytes: payload.len() as u64
        }
    );
    assert!(asset.is_installed());
    assert_eq!(std::fs::read(&asset.path).unwrap(), payload);
    assert!(!asset.temp_path().exists());
    assert_eq!(seen.last().copied(), Some(1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn cancellation_discards_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let asset = asset_in(dir.path());
    let cancel = CancelFlag::new();
    cancel.cancel();

    let outcome = asset
        .install_from_reader(Cursor::new(vec![1u8; 64]), Some(64), &cancel, |_| {})
        .unwrap();
    assert_eq!(outcome, DownloadOutcome::Cancelled);
    assert!(!asset.is_installed());
    assert!(!asset.temp_path().exists());
}

#[test]
fn cancel_mid_stream_keeps_previous_install() {
    let dir = tempfile::tempdir().unwrap();
    let asset = asset_in(dir.path());
    std::fs::create_dir_all(asset.path.parent().unwrap()).unwrap();
    std::fs::write(&asset.path, b"old model").unwrap();

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    let outcome = asset
        .install_from_reader(
            Cursor::new(vec![2u8; CHUNK_SIZE * 3]),
            Some((CHUNK_SIZE * 3) as u64),
            &cancel,
            move |_| flag.cancel(),
        )
        .unwrap();
    assert_eq!(outcome, DownloadOutcome::Cancelled);
    assert_eq!(std::fs::read(&asset.path).unwrap(), b"old model");
    assert!(!asset.temp_path().exists());
}

#[test]
fn gate_requires_installed_model() {
    let dir = tempfile::tempdir().unwrap();
    let asset = asset_in(dir.path());
    let gated = ModelGated::new(asset.clone(), crate::segment::BorderKeyFactory::default());
    assert!(matches!(
        gated.create(),
        Err(PortraitError::ModelUnavailable(_))
    ));

    std::fs::create_dir_all(asset.path.parent().unwrap()).unwrap();
    std::fs::write(&asset.path, b"weights").unwrap();
    assert!(gated.create().is_ok());
}
