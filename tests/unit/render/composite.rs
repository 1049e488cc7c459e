use image::Rgba;

use super::*;

#[test]
fn over_edge_cases() {
    let dst = [10, 20, 30, 255];
    assert_eq!(over(dst, [0, 0, 0, 0]), dst);
    assert_eq!(over(dst, [1, 2, 3, 255]), [1, 2, 3, 255]);
    assert_eq!(over([0, 0, 0, 0], [200, 100, 50, 128]), [200, 100, 50, 128]);
}

#[test]
fn half_alpha_over_opaque_blends() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 128]);
    assert_eq!(out[3], 255);
    assert!((126..=130).contains(&out[0]), "got {}", out[0]);
}

#[test]
fn paste_clips_to_destination() {
    let mut dst = RgbaImage::new(4, 4);
    let src = RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]));
    paste_over(&mut dst, &src, -1, 2);

    let opaque: Vec<(u32, u32)> = dst
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[3] == 255)
        .map(|(x, y, _)| (x, y))
        .collect();
    assert_eq!(opaque, vec![(0, 2), (1, 2), (0, 3), (1, 3)]);

    paste_over(&mut dst, &src, 10, 10);
    paste_over(&mut dst, &src, -3, 0);
    assert_eq!(dst.pixels().filter(|p| p.0[3] == 255).count(), 4);
}

#[test]
fn over_in_place_rejects_size_mismatch() {
    let mut dst = RgbaImage::new(2, 2);
    assert!(over_in_place(&mut dst, &RgbaImage::new(2, 3)).is_err());
    let src = RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 255]));
    over_in_place(&mut dst, &src).unwrap();
    assert_eq!(dst, src);
}
