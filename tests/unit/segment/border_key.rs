use image::Rgba;

use super::*;

#[test]
fn subject_on_flat_background_is_separated() {
    let mut img = RgbaImage::from_pixel(9, 9, Rgba([20, 200, 20, 255]));
    for y in 3..6 {
        for x in 3..6 {
            img.put_pixel(x, y, Rgba([220, 40, 40, 255]));
        }
    }
    let mask = BorderKeySegmenter::default().segment(&img).unwrap();
    assert_eq!(mask.dimensions(), (9, 9));
    assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    assert_eq!(mask.get_pixel(8, 4).0[0], 0);
    assert_eq!(mask.get_pixel(4, 4).0[0], 255);
}

#[test]
fn transparent_pixels_are_background() {
    let mut img = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
    img.put_pixel(1, 1, Rgba([255, 255, 255, 0]));
    let mask = BorderKeySegmenter::default().segment(&img).unwrap();
    assert_eq!(mask.get_pixel(1, 1).0[0], 0);
}

#[test]
fn weight_ramps_between_thresholds() {
    let s = BorderKeySegmenter {
        low: 10.0,
        high: 20.0,
    };
    assert_eq!(s.weight(5.0), 0);
    assert_eq!(s.weight(15.0), 128);
    assert_eq!(s.weight(25.0), 255);
}

#[test]
fn empty_image_yields_empty_mask() {
    let mask = BorderKeySegmenter::default()
        .segment(&RgbaImage::new(0, 0))
        .unwrap();
    assert_eq!(mask.dimensions(), (0, 0));
}

#[test]
fn factory_needs_no_model() {
    let seg = BorderKeyFactory::default().create().unwrap();
    let img = RgbaImage::from_pixel(2, 2, Rgba([5, 5, 5, 255]));
    assert!(seg.segment(&img).is_ok());
}
