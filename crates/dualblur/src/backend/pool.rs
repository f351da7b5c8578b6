//! Scratch image pool.
//!
//! Temporary images are recycled by exact size. A blur at a steady output
//! size therefore allocates on the first frame only; later frames hit the
//! pool for every pass.

use std::fmt;

use tracing::trace;

use super::primitives::ImageHandle;
use crate::image::CpuImage;
use crate::resolution::Resolution;
use crate::{BlurError, BlurResult};

/// Default number of idle images kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 8;

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total acquire calls.
    pub acquired: u64,
    /// Total release calls.
    pub released: u64,
    /// Images currently handed out.
    pub outstanding: usize,
    /// Highest `outstanding` seen since the last reset.
    pub peak_outstanding: usize,
    /// Acquires served from idle images.
    pub hits: u64,
    /// Acquires that allocated.
    pub misses: u64,
    /// Bytes held by idle images.
    pub pooled_bytes: u64,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acquired={} released={} outstanding={} peak={} hits={} misses={} pooled={}B",
            self.acquired,
            self.released,
            self.outstanding,
            self.peak_outstanding,
            self.hits,
            self.misses,
            self.pooled_bytes
        )
    }
}

/// Exact-size recycling pool for [`CpuImage`] scratch buffers.
///
/// Images carry no identity, so the pool tracks the sizes it handed out.
/// A release is accepted only when an outstanding image has that size.
#[derive(Debug)]
pub struct ScratchPool {
    idle: Vec<CpuImage>,
    lent: Vec<Resolution>,
    max_idle: usize,
    stats: PoolStats,
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl ScratchPool {
    /// Create a pool keeping at most `max_idle` images for reuse.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Vec::new(),
            lent: Vec::new(),
            max_idle,
            stats: PoolStats::default(),
        }
    }

    /// Hand out a `width`x`height` image.
    ///
    /// Recycled images keep their old contents.
    pub fn acquire(&mut self, width: u32, height: u32) -> BlurResult<CpuImage> {
        if width == 0 || height == 0 {
            return Err(BlurError::InvalidDimensions(width, height));
        }

        let image = match self
            .idle
            .iter()
            .position(|img| img.width == width && img.height == height)
        {
            Some(index) => {
                self.stats.hits += 1;
                self.idle.swap_remove(index)
            }
            None => {
                self.stats.misses += 1;
                CpuImage::new(width, height)
            }
        };

        self.lent.push(image.resolution());
        self.stats.acquired += 1;
        self.stats.outstanding += 1;
        self.stats.peak_outstanding = self.stats.peak_outstanding.max(self.stats.outstanding);
        self.update_pooled_bytes();
        trace!(width, height, outstanding = self.stats.outstanding, "scratch acquire");
        Ok(image)
    }

    /// Take an image back.
    ///
    /// Fails with [`BlurError::ForeignImage`] when no outstanding image has
    /// the same size; the pool is left unchanged in that case.
    pub fn release(&mut self, image: CpuImage) -> BlurResult<()> {
        let res = image.resolution();
        let Some(index) = self.lent.iter().position(|r| *r == res) else {
            return Err(BlurError::ForeignImage);
        };
        self.lent.swap_remove(index);
        self.stats.outstanding -= 1;
        self.stats.released += 1;
        trace!(width = image.width, height = image.height, outstanding = self.stats.outstanding, "scratch release");

        if self.idle.len() < self.max_idle {
            self.idle.push(image);
        }
        // Otherwise let the image drop
        self.update_pooled_bytes();
        Ok(())
    }

    /// Drop every idle image.
    pub fn clear(&mut self) {
        self.idle.clear();
        self.update_pooled_bytes();
    }

    /// Number of idle images.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Current counters.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Restart peak tracking from the current outstanding count.
    pub fn reset_peak(&mut self) {
        self.stats.peak_outstanding = self.stats.outstanding;
    }

    fn update_pooled_bytes(&mut self) {
        self.stats.pooled_bytes = self.idle.iter().map(|img| img.size_bytes() as u64).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_reuse() {
        let mut pool = ScratchPool::default();
        let a = pool.acquire(8, 4).unwrap();
        assert_eq!((a.width, a.height), (8, 4));
        pool.release(a).unwrap();

        let b = pool.acquire(8, 4).unwrap();
        let s = pool.stats();
        assert_eq!(s.hits, 1);
        assert_eq!(s.misses, 1);
        assert_eq!(s.outstanding, 1);
        pool.release(b).unwrap();
        assert_eq!(pool.stats().pooled_bytes, 8 * 4 * 4 * 4);
    }

    #[test]
    fn test_exact_size_only() {
        let mut pool = ScratchPool::default();
        let a = pool.acquire(8, 8).unwrap();
        pool.release(a).unwrap();
        let b = pool.acquire(4, 4).unwrap();
        assert_eq!(pool.stats().hits, 0);
        assert_eq!((b.width, b.height), (4, 4));
        pool.release(b).unwrap();
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_peak_tracking() {
        let mut pool = ScratchPool::default();
        let a = pool.acquire(2, 2).unwrap();
        let b = pool.acquire(2, 2).unwrap();
        pool.release(a).unwrap();
        let c = pool.acquire(1, 1).unwrap();
        pool.release(b).unwrap();
        pool.release(c).unwrap();
        let s = pool.stats();
        assert_eq!(s.peak_outstanding, 2);
        assert_eq!(s.acquired, s.released);

        pool.reset_peak();
        assert_eq!(pool.stats().peak_outstanding, 0);
    }

    #[test]
    fn test_release_without_acquire() {
        let mut pool = ScratchPool::default();
        assert!(matches!(pool.release(CpuImage::new(1, 1)), Err(BlurError::ForeignImage)));
    }

    #[test]
    fn test_release_unknown_size() {
        let mut pool = ScratchPool::default();
        let a = pool.acquire(4, 4).unwrap();

        assert!(matches!(pool.release(CpuImage::new(3, 3)), Err(BlurError::ForeignImage)));
        let s = pool.stats();
        assert_eq!(s.outstanding, 1);
        assert_eq!(s.released, 0);
        assert_eq!(pool.idle_count(), 0);

        pool.release(a).unwrap();
        assert_eq!(pool.stats().outstanding, 0);
        assert!(matches!(pool.release(CpuImage::new(4, 4)), Err(BlurError::ForeignImage)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut pool = ScratchPool::default();
        assert!(matches!(pool.acquire(0, 3), Err(BlurError::InvalidDimensions(0, 3))));
        assert_eq!(pool.stats().acquired, 0);
    }

    #[test]
    fn test_max_idle_and_clear() {
        let mut pool = ScratchPool::new(1);
        let a = pool.acquire(2, 2).unwrap();
        let b = pool.acquire(2, 2).unwrap();
        pool.release(a).unwrap();
        pool.release(b).unwrap();
        assert_eq!(pool.idle_count(), 1);
        pool.clear();
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.stats().pooled_bytes, 0);
    }
}
