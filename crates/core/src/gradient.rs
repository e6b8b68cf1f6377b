use crate::{
    ColorRampLocation, SIMPLE_GRADIENTS_PER_ROW, TwoTexelRamp,
    paint::{Gradient, GradientKey},
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Deduplicates the color ramps of one logical flush and assigns them gradient texture locations.
///
/// Simple (two-stop) ramps are packed two texels each into the simple rows; every complex ramp gets
/// a full row below them.
#[derive(Debug, Default)]
pub struct GradientCache {
    simple_index: FxHashMap<u64, u32>,
    simple_ramps: Vec<TwoTexelRamp>,
    complex_index: FxHashMap<GradientKey, u16>,
    complex_ramps: Vec<Arc<Gradient>>,
    complex_span_count: usize,
    max_height: u32,
}

/// A position the cache can be rolled back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GradientCheckpoint {
    simple: usize,
    complex: usize,
    complex_span_count: usize,
}

/// Everything one logical flush needs to write its gradient records.
#[derive(Debug, Default)]
pub struct GradientContent {
    pub simple_ramps: Vec<TwoTexelRamp>,
    pub complex_ramps: Vec<Arc<Gradient>>,
    pub complex_span_count: usize,
}

impl GradientContent {
    pub fn simple_rows(&self) -> u32 {
        simple_rows(self.simple_ramps.len())
    }

    /// Gradient texture rows these ramps fill.
    pub fn height(&self) -> u32 {
        self.simple_rows() + self.complex_ramps.len() as u32
    }
}

fn simple_rows(count: usize) -> u32 {
    (count as u32).div_ceil(SIMPLE_GRADIENTS_PER_ROW)
}

impl GradientCache {
    pub fn new(max_height: u32) -> Self {
        Self {
            max_height,
            ..Default::default()
        }
    }

    /// Find or add the ramp of `gradient`.
    ///
    /// Returns `None` if the ramp does not fit in the gradient texture; the cache is then unchanged.
    pub fn allocate(&mut self, gradient: &Arc<Gradient>) -> Option<ColorRampLocation> {
        if let Some(key) = gradient.simple_key() {
            let index = match self.simple_index.get(&key) {
                Some(index) => *index,
                None => {
                    let index = self.simple_ramps.len();
                    if !self.fits(index + 1, self.complex_ramps.len()) {
                        return None;
                    }

                    self.simple_ramps.push(TwoTexelRamp {
                        color0: (key >> 32) as u32,
                        color1: key as u32,
                    });
                    self.simple_index.insert(key, index as u32);
                    index as u32
                }
            };

            return Some(ColorRampLocation {
                row: (index / SIMPLE_GRADIENTS_PER_ROW) as u16,
                col: ((index % SIMPLE_GRADIENTS_PER_ROW) * 2) as u16,
            });
        }

        let key = gradient.content_key();
        let row = match self.complex_index.get(&key) {
            Some(row) => *row,
            None => {
                let row = self.complex_ramps.len();
                if row >= u16::MAX as usize || !self.fits(self.simple_ramps.len(), row + 1) {
                    return None;
                }

                self.complex_ramps.push(gradient.clone());
                self.complex_index.insert(key, row as u16);
                self.complex_span_count += gradient.span_count();
                row as u16
            }
        };

        Some(ColorRampLocation {
            row,
            col: ColorRampLocation::COMPLEX_COL,
        })
    }

    fn fits(&self, simple: usize, complex: usize) -> bool {
        simple_rows(simple) + complex as u32 <= self.max_height
    }

    pub fn checkpoint(&self) -> GradientCheckpoint {
        GradientCheckpoint {
            simple: self.simple_ramps.len(),
            complex: self.complex_ramps.len(),
            complex_span_count: self.complex_span_count,
        }
    }

    /// Forget every ramp added after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: GradientCheckpoint) {
        self.simple_ramps.truncate(checkpoint.simple);
        self.simple_index.retain(|_, index| (*index as usize) < checkpoint.simple);
        self.complex_ramps.truncate(checkpoint.complex);
        self.complex_index.retain(|_, row| (*row as usize) < checkpoint.complex);
        self.complex_span_count = checkpoint.complex_span_count;
    }

    pub fn simple_count(&self) -> usize {
        self.simple_ramps.len()
    }

    pub fn complex_count(&self) -> usize {
        self.complex_ramps.len()
    }

    /// Sum of the stop intervals of every complex ramp.
    pub fn complex_span_count(&self) -> usize {
        self.complex_span_count
    }

    pub fn is_empty(&self) -> bool {
        self.simple_ramps.is_empty() && self.complex_ramps.is_empty()
    }

    /// Hand the ramps to a finalized logical flush and start over.
    pub fn take(&mut self) -> GradientContent {
        self.simple_index.clear();
        self.complex_index.clear();
        GradientContent {
            simple_ramps: std::mem::take(&mut self.simple_ramps),
            complex_ramps: std::mem::take(&mut self.complex_ramps),
            complex_span_count: std::mem::take(&mut self.complex_span_count),
        }
    }

    pub fn clear(&mut self) {
        self.take();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Vec2;

    fn simple(c0: u32, c1: u32) -> Arc<Gradient> {
        Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[c0, c1], &[0.0, 1.0])
    }

    fn complex(c: u32) -> Arc<Gradient> {
        Gradient::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), &[c, c + 1, c + 2], &[0.0, 0.5, 1.0])
    }

    #[test]
    fn test_same_content_same_location() {
        let mut cache = GradientCache::new(16);

        let a = cache.allocate(&simple(1, 2)).unwrap();
        let b = cache.allocate(&simple(1, 2)).unwrap();
        let c = cache.allocate(&simple(2, 1)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.simple_count(), 2);

        let d = cache.allocate(&complex(5)).unwrap();
        let e = cache.allocate(&complex(5)).unwrap();
        assert_eq!(d, e);
        assert!(d.is_complex());
        assert_eq!(cache.complex_count(), 1);
        assert_eq!(cache.complex_span_count(), 2);
    }

    #[test]
    fn test_simple_layout() {
        let mut cache = GradientCache::new(16);
        let mut last = None;
        for i in 0..=SIMPLE_GRADIENTS_PER_ROW {
            last = cache.allocate(&simple(i, 0));
        }

        assert_eq!(last, Some(ColorRampLocation { row: 1, col: 0 }));
        assert_eq!(
            cache.allocate(&simple(1, 0)),
            Some(ColorRampLocation { row: 0, col: 2 })
        );
    }

    #[test]
    fn test_full_cache_is_unchanged() {
        let mut cache = GradientCache::new(2);
        assert!(cache.allocate(&simple(1, 2)).is_some());
        assert!(cache.allocate(&complex(1)).is_some());
        assert!(cache.allocate(&complex(2)).is_none());
        assert_eq!(cache.complex_count(), 1);

        // Existing ramps are still found.
        assert!(cache.allocate(&complex(1)).is_some());
        assert!(cache.allocate(&simple(3, 4)).is_some());
    }

    #[test]
    fn test_rollback() {
        let mut cache = GradientCache::new(16);
        cache.allocate(&simple(1, 2));
        cache.allocate(&complex(1));
        let checkpoint = cache.checkpoint();

        cache.allocate(&simple(3, 4));
        cache.allocate(&complex(2));
        cache.rollback(checkpoint);

        assert_eq!(cache.checkpoint(), checkpoint);
        assert_eq!(cache.allocate(&simple(3, 4)), Some(ColorRampLocation { row: 0, col: 2 }));
        assert_eq!(cache.allocate(&complex(2)).map(|x| x.row), Some(1));
    }

    #[test]
    fn test_take_resets() {
        let mut cache = GradientCache::new(16);
        cache.allocate(&simple(1, 2));
        cache.allocate(&complex(1));

        let content = cache.take();
        assert_eq!(content.simple_ramps, vec![TwoTexelRamp { color0: 1, color1: 2 }]);
        assert_eq!(content.height(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.complex_span_count(), 0);
    }
}
