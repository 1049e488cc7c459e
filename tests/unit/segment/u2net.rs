use image::Rgba;

use super::*;

#[test]
fn input_is_planar_and_normalized_by_image_maximum() {
    let img = RgbaImage::from_pixel(8, 5, Rgba([200, 100, 0, 17]));
    let t = input_tensor(&img);
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    assert_eq!(t.len(), plane * 3);

    // Max channel value is 200, so red maps to 1.0 before normalization.
    let approx = |a: f32, b: f32| (a - b).abs() < 0.05;
    assert!(approx(t[0], (1.0 - MEAN[0]) / STD[0]));
    assert!(approx(t[plane], (0.5 - MEAN[1]) / STD[1]));
    assert!(approx(t[2 * plane + 123], (0.0 - MEAN[2]) / STD[2]));
}

#[test]
fn black_image_does_not_divide_by_zero() {
    let t = input_tensor(&RgbaImage::new(3, 3));
    assert!(t.iter().all(|v| v.is_finite()));
}

#[test]
fn prediction_is_min_max_stretched() {
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut pred = vec![0.2f32; plane];
    pred[0] = 0.9;
    let mask = mask_from_prediction(&pred, INPUT_SIZE, INPUT_SIZE).unwrap();
    assert_eq!(mask.get_pixel(0, 0)[0], 255);
    assert_eq!(mask.get_pixel(5, 5)[0], 0);
}

#[test]
fn mask_matches_source_size() {
    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let pred: Vec<f32> = (0..plane).map(|i| (i % 7) as f32).collect();
    let mask = mask_from_prediction(&pred, 41, 17).unwrap();
    assert_eq!(mask.dimensions(), (41, 17));

    let flat = mask_from_prediction(&vec![3.0; plane], 10, 10).unwrap();
    assert!(flat.pixels().all(|p| p[0] == 0));
}

#[test]
fn short_prediction_is_rejected() {
    assert!(matches!(
        mask_from_prediction(&[0.0; 10], 4, 4),
        Err(PortraitError::Validation(_))
    ));
}

#[test]
fn missing_or_corrupt_weights_are_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let factory = U2netFactory::new(dir.path().join("u2net.onnx"));
    assert!(matches!(
        factory.create(),
        Err(PortraitError::ModelUnavailable(_))
    ));

    std::fs::write(&factory.path, b"garbage").unwrap();
    assert!(matches!(
        factory.create(),
        Err(PortraitError::ModelUnavailable(_))
    ));
    assert_eq!(factory.name(), "u2net");
}
