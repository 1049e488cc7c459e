use super::*;

fn opts(alpha_matting: bool, erode: u32) -> MattingOptions {
    MattingOptions {
        alpha_matting,
        fg_threshold: 240,
        bg_threshold: 10,
        erode_size: erode,
    }
}

#[test]
fn mismatched_mask_is_rejected() {
    let img = RgbaImage::new(2, 2);
    let mask = GrayImage::new(3, 2);
    assert!(apply_mask(&img, &mask, &opts(false, 0)).is_err());
}

#[test]
fn matte_never_raises_source_alpha() {
    let img = RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 100]));
    let mask = GrayImage::from_pixel(1, 1, Luma([255]));
    let out = apply_mask(&img, &mask, &opts(false, 0)).unwrap();
    assert_eq!(out.get_pixel(0, 0).0[3], 100);
}

#[test]
fn trimap_ramps_unknown_band() {
    let mask = GrayImage::from_raw(4, 1, vec![0, 125, 240, 255]).unwrap();
    let matte = trimap_matte(&mask, &opts(true, 0));
    let v: Vec<u8> = matte.pixels().map(|p| p.0[0]).collect();
    assert_eq!(v[0], 0);
    assert_eq!(v[2], 255);
    assert_eq!(v[3], 255);
    assert!(v[1] > 100 && v[1] < 155, "got {}", v[1]);
}

#[test]
fn erosion_shrinks_confident_regions() {
    // 5x1 foreground run with background on both ends.
    let mask = GrayImage::from_raw(7, 1, vec![0, 255, 255, 255, 255, 255, 0]).unwrap();
    let matte = trimap_matte(&mask, &opts(true, 1));
    let v: Vec<u8> = matte.pixels().map(|p| p.0[0]).collect();
    // Eroded foreground keeps the three interior pixels confident.
    assert_eq!(&v[2..5], &[255, 255, 255]);
    // Edge pixels fall into the unknown band and take their ramped mask value.
    assert_eq!(v[1], 255);
    assert_eq!(v[0], 0);
}

#[test]
fn erode_window_and_borders() {
    let src = vec![true, true, false, true, true];
    assert_eq!(erode(&src, 5, 1, 1), vec![true, false, false, false, true]);
    assert_eq!(erode(&src, 5, 1, 0), src);

    let square = vec![true; 9];
    assert_eq!(erode(&square, 3, 3, 5), square);
}
