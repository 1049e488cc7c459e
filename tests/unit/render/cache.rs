use image::Rgba;

use super::*;

fn img(v: u8) -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_pixel(1, 1, Rgba([v, v, v, 255])))
}

fn l1(name: &str) -> Layer1Key {
    Layer1Key::new(SourceRef(name.to_owned()), &RenderParameters::default())
}

#[test]
fn irrelevant_matting_fields_do_not_split_layer1() {
    let mut a = RenderParameters::default();
    let mut b = RenderParameters::default();
    a.alpha_matting_erode_size = 3;
    b.alpha_matting_erode_size = 30;
    b.alpha_matting = true;
    let src = SourceRef("s".to_owned());
    assert_eq!(Layer1Key::new(src.clone(), &a), Layer1Key::new(src.clone(), &b));

    a.use_rembg = true;
    b.use_rembg = true;
    assert_ne!(Layer1Key::new(src.clone(), &a), Layer1Key::new(src, &b));
}

#[test]
fn layer2_key_tracks_placement_and_anchor() {
    let p = RenderParameters::default();
    let base = Layer2Key::new(l1("s"), &p, None);

    let mut moved = p.clone();
    moved.offset_x = 5;
    assert_ne!(base, Layer2Key::new(l1("s"), &moved, None));
    assert_ne!(base, Layer2Key::new(l1("s"), &p, Some(FaceCenter::new(1, 2))));

    let mut icon_only = p.clone();
    icon_only.icon_scale_b = 2.0;
    assert_eq!(base, Layer2Key::new(l1("s"), &icon_only, None));
    assert_eq!(base.scale(), 1.0);
}

#[test]
fn fingerprints_follow_key_equality() {
    let p = RenderParameters::default();
    assert_eq!(l1("a").fingerprint(), l1("a").fingerprint());
    assert_ne!(l1("a").fingerprint(), l1("b").fingerprint());
    let k = Layer2Key::new(l1("a"), &p, Some(FaceCenter::new(3, 4)));
    assert_ne!(k.fingerprint(), Layer2Key::new(l1("a"), &p, None).fingerprint());
}

#[test]
fn hits_and_misses_are_counted() {
    let mut cache = RenderCache::default();
    assert!(cache.layer1(&l1("a")).is_none());
    cache.put_layer1(l1("a"), img(1));
    assert!(cache.layer1(&l1("a")).is_some());
    let s = cache.stats();
    assert_eq!((s.layer1_hits, s.layer1_misses), (1, 1));
    assert_eq!((s.layer2_hits, s.layer2_misses), (0, 0));
}

#[test]
fn least_recently_used_entry_is_evicted() {
    let mut cache = RenderCache::new(CacheOpts {
        layer1_capacity: 2,
        layer2_capacity: 1,
    });
    cache.put_layer1(l1("a"), img(1));
    cache.put_layer1(l1("b"), img(2));
    assert!(cache.layer1(&l1("a")).is_some());
    cache.put_layer1(l1("c"), img(3));

    assert!(cache.layer1(&l1("b")).is_none());
    assert!(cache.layer1(&l1("a")).is_some());
    assert!(cache.layer1(&l1("c")).is_some());
    assert_eq!(cache.len().0, 2);
}

#[test]
fn invalidate_source_drops_both_layers() {
    let p = RenderParameters::default();
    let mut cache = RenderCache::default();
    cache.put_layer1(l1("a"), img(1));
    cache.put_layer1(l1("b"), img(2));
    cache.put_layer2(Layer2Key::new(l1("a"), &p, None), img(3));

    cache.invalidate_source(&SourceRef("a".to_owned()));
    assert_eq!(cache.len(), (1, 0));
    assert!(cache.layer1(&l1("b")).is_some());

    cache.clear();
    assert_eq!(cache.len(), (0, 0));
}
