use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    sync::Arc,
};

use image::RgbaImage;

use crate::foundation::core::FaceCenter;
use crate::foundation::math::Fnv1a64;
use crate::project::{RenderParameters, SourceRef};

/// Inputs of the background-removal stage.
///
/// Matting parameters that cannot affect the result are normalized away, so toggling e.g.
/// the erode size while `use_rembg` is off still hits the cached image.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layer1Key {
    /// Source image the layer was cut from.
    pub source_ref: SourceRef,
    /// Background removal requested.
    pub use_rembg: bool,
    /// Matting requested; false whenever removal is off.
    pub alpha_matting: bool,
    /// Zero unless matting is on.
    pub fg_threshold: u8,
    /// Zero unless matting is on.
    pub bg_threshold: u8,
    /// Zero unless matting is on.
    pub erode_size: u32,
}

impl Layer1Key {
    /// Key for rendering `source_ref` with `params`.
    pub fn new(source_ref: SourceRef, params: &RenderParameters) -> Self {
        let use_rembg = params.use_rembg;
        let alpha_matting = use_rembg && params.alpha_matting;
        Self {
            source_ref,
            use_rembg,
            alpha_matting,
            fg_threshold: if alpha_matting {
                params.alpha_matting_fg_threshold
            } else {
                0
            },
            bg_threshold: if alpha_matting {
                params.alpha_matting_bg_threshold
            } else {
                0
            },
            erode_size: if alpha_matting {
                params.alpha_matting_erode_size
            } else {
                0
            },
        }
    }

    /// Stable 64-bit hash, used in log fields.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_str(self.source_ref.as_str());
        h.write_bool(self.use_rembg);
        h.write_bool(self.alpha_matting);
        h.write_u8(self.fg_threshold);
        h.write_u8(self.bg_threshold);
        h.write_u32(self.erode_size);
        h.finish()
    }
}

/// Inputs of the clean composite: everything in [`Layer1Key`] plus placement and anchor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layer2Key {
    /// Key of the segmented image the composite was built from.
    pub layer1: Layer1Key,
    /// `f32::to_bits` of the scale so the key stays `Eq + Hash`.
    pub scale_bits: u32,
    /// Horizontal placement offset.
    pub offset_x: i32,
    /// Vertical placement offset.
    pub offset_y: i32,
    /// Resolved icon anchor.
    pub anchor: Option<FaceCenter>,
}

impl Layer2Key {
    /// Key for placing the `layer1` image with `params`.
    pub fn new(layer1: Layer1Key, params: &RenderParameters, anchor: Option<FaceCenter>) -> Self {
        Self {
            layer1,
            scale_bits: params.scale.to_bits(),
            offset_x: params.offset_x,
            offset_y: params.offset_y,
            anchor,
        }
    }

    /// Scale recovered from `scale_bits`.
    pub fn scale(&self) -> f32 {
        f32::from_bits(self.scale_bits)
    }

    /// Stable 64-bit hash chained from the layer-1 fingerprint.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new(self.layer1.fingerprint());
        h.write_u32(self.scale_bits);
        h.write_i32(self.offset_x);
        h.write_i32(self.offset_y);
        match self.anchor {
            Some(a) => {
                h.write_u8(1);
                h.write_i32(a.x);
                h.write_i32(a.y);
            }
            None => h.write_u8(0),
        }
        h.finish()
    }
}

/// Capacities of the two [`RenderCache`] layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheOpts {
    /// Segmented images kept.
    pub layer1_capacity: usize,
    /// Full-quality composites kept.
    pub layer2_capacity: usize,
}

impl Default for CacheOpts {
    fn default() -> Self {
        Self {
            layer1_capacity: 16,
            layer2_capacity: 32,
        }
    }
}

/// Hit and miss counters since the cache was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Layer-1 lookups that found an entry.
    pub layer1_hits: u64,
    /// Layer-1 lookups that did not.
    pub layer1_misses: u64,
    /// Layer-2 lookups that found an entry.
    pub layer2_hits: u64,
    /// Layer-2 lookups that did not.
    pub layer2_misses: u64,
}

/// Bounded map with least-recently-used eviction.
#[derive(Debug)]
struct Lru<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Clone + Eq + Hash, V: Clone> Lru<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let v = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(v)
    }

    fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key.clone(), value);
        self.touch(&key);
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.entries.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }

    fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|k, _| keep(k));
        self.order.retain(|k| keep(k));
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Two-tier image cache: post-background-removal sources and clean composites.
#[derive(Debug)]
pub struct RenderCache {
    layer1: Lru<Layer1Key, Arc<RgbaImage>>,
    layer2: Lru<Layer2Key, Arc<RgbaImage>>,
    stats: CacheStats,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(CacheOpts::default())
    }
}

impl RenderCache {
    /// Empty cache with the given capacities.
    pub fn new(opts: CacheOpts) -> Self {
        Self {
            layer1: Lru::new(opts.layer1_capacity),
            layer2: Lru::new(opts.layer2_capacity),
            stats: CacheStats::default(),
        }
    }

    /// Segmented image for `key`, counting the lookup.
    pub fn layer1(&mut self, key: &Layer1Key) -> Option<Arc<RgbaImage>> {
        let hit = self.layer1.get(key);
        if hit.is_some() {
            self.stats.layer1_hits += 1;
        } else {
            self.stats.layer1_misses += 1;
        }
        hit
    }

    /// Composite for `key`, counting the lookup.
    pub fn layer2(&mut self, key: &Layer2Key) -> Option<Arc<RgbaImage>> {
        let hit = self.layer2.get(key);
        if hit.is_some() {
            self.stats.layer2_hits += 1;
        } else {
            self.stats.layer2_misses += 1;
        }
        hit
    }

    /// Store a segmented image, evicting the least recently used one if full.
    pub fn put_layer1(&mut self, key: Layer1Key, image: Arc<RgbaImage>) {
        self.layer1.insert(key, image);
    }

    /// Store a composite, evicting the least recently used one if full.
    pub fn put_layer2(&mut self, key: Layer2Key, image: Arc<RgbaImage>) {
        self.layer2.insert(key, image);
    }

    /// Drop every entry derived from `source_ref` (e.g. after the file was replaced).
    pub fn invalidate_source(&mut self, source_ref: &SourceRef) {
        self.layer1.retain(|k| &k.source_ref != source_ref);
        self.layer2.retain(|k| &k.layer1.source_ref != source_ref);
    }

    /// Drop every entry of both layers.
    pub fn clear(&mut self) {
        self.layer1.clear();
        self.layer2.clear();
    }

    /// Counters so far.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Entry counts of layer 1 and layer 2.
    pub fn len(&self) -> (usize, usize) {
        (self.layer1.len(), self.layer2.len())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cache.rs"]
mod tests;
