//! CPU backend using rayon for parallelization.
//!
//! Reference implementation of the dual filtering passes. Sampling is
//! bilinear with clamp-to-edge addressing in normalized coordinates, the
//! way a GPU sampler would read a render texture.

use rayon::prelude::*;
use tracing::trace;

use super::primitives::{BlitPrimitives, FilterParam, FilterPass, ImageHandle};
use super::pool::{PoolStats, ScratchPool};
use crate::image::{CpuImage, CHANNELS};
use crate::{BlurError, BlurResult};

/// Shader parameter block for the CPU passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuFilter {
    /// Destination texel size `[1/w, 1/h, w, h]`. Zero means "derive from
    /// the destination image".
    pub texel_size: [f32; 4],
    /// Output alpha for [`FilterPass::UpsampleWithOpacity`].
    pub opacity: f32,
}

impl Default for CpuFilter {
    fn default() -> Self {
        Self {
            texel_size: [0.0; 4],
            opacity: 1.0,
        }
    }
}

/// CPU primitives implementation.
#[derive(Debug, Default)]
pub struct CpuBackend {
    pool: ScratchPool,
}

impl CpuBackend {
    /// Create with a default scratch pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl BlitPrimitives for CpuBackend {
    type Image = CpuImage;
    type Filter = CpuFilter;

    fn acquire_temporary(&mut self, width: u32, height: u32) -> BlurResult<CpuImage> {
        self.pool.acquire(width, height)
    }

    fn release_temporary(&mut self, image: CpuImage) -> BlurResult<()> {
        self.pool.release(image)
    }

    fn blit(
        &mut self,
        source: &CpuImage,
        destination: &mut CpuImage,
        filter: Option<(&CpuFilter, FilterPass)>,
    ) -> BlurResult<()> {
        trace!(
            src = %source.resolution(),
            dst = %destination.resolution(),
            pass = filter.map(|(_, p)| p.name()).unwrap_or("copy"),
            "cpu blit"
        );

        for img in [source, &*destination] {
            if img.width == 0 || img.height == 0 {
                return Err(BlurError::InvalidDimensions(img.width, img.height));
            }
        }

        match filter {
            None => exec_copy(source, destination),
            Some((params, pass)) => {
                let half = half_texel(params, destination);
                match pass {
                    FilterPass::Downsample => exec_pass(destination, |u, v| downsample_tap(source, u, v, half)),
                    FilterPass::Upsample => exec_pass(destination, |u, v| upsample_tap(source, u, v, half)),
                    FilterPass::UpsampleWithOpacity => exec_blend(source, destination, half, params.opacity),
                }
            }
        }
        Ok(())
    }

    /// Only [`FilterParam::TexelSize`] is a vector; other IDs are ignored.
    fn set_filter_vector(&mut self, filter: &mut CpuFilter, param: FilterParam, value: [f32; 4]) {
        match param {
            FilterParam::TexelSize => filter.texel_size = value,
            FilterParam::Opacity => trace!(?param, "ignoring vector value for scalar parameter"),
        }
    }

    /// Only [`FilterParam::Opacity`] is a scalar; other IDs are ignored.
    fn set_filter_scalar(&mut self, filter: &mut CpuFilter, param: FilterParam, value: f32) {
        match param {
            FilterParam::Opacity => filter.opacity = value,
            FilterParam::TexelSize => trace!(?param, "ignoring scalar value for vector parameter"),
        }
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

// =============================================================================
// Kernels
// =============================================================================

/// Half of the destination texel, in normalized coordinates.
fn half_texel(params: &CpuFilter, dst: &CpuImage) -> [f32; 2] {
    let texel = if params.texel_size[0] > 0.0 && params.texel_size[1] > 0.0 {
        params.texel_size
    } else {
        dst.resolution().texel_size()
    };
    [texel[0] * 0.5, texel[1] * 0.5]
}

/// Run `tap(u, v)` for every destination pixel centre.
fn exec_pass<F>(dst: &mut CpuImage, tap: F)
where
    F: Fn(f32, f32) -> [f32; 4] + Sync,
{
    let dw = dst.width as usize;
    let inv_w = 1.0 / dst.width as f32;
    let inv_h = 1.0 / dst.height as f32;

    dst.data
        .par_chunks_mut(dw * CHANNELS)
        .enumerate()
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5) * inv_h;
            for (x, out) in row.chunks_exact_mut(CHANNELS).enumerate() {
                let u = (x as f32 + 0.5) * inv_w;
                out.copy_from_slice(&tap(u, v));
            }
        });
}

/// Plain bilinear resample.
fn exec_copy(src: &CpuImage, dst: &mut CpuImage) {
    if src.width == dst.width && src.height == dst.height {
        dst.data.copy_from_slice(&src.data);
        return;
    }
    exec_pass(dst, |u, v| sample(src, u, v));
}

/// Upsample with alpha replaced by `opacity`, blended over the destination.
///
/// Colour uses `src * a + dst * (1 - a)`; alpha accumulates as
/// `a + dst_a * (1 - a)` so an opaque destination stays opaque.
fn exec_blend(src: &CpuImage, dst: &mut CpuImage, half: [f32; 2], opacity: f32) {
    let a = opacity.clamp(0.0, 1.0);
    let dw = dst.width as usize;
    let inv_w = 1.0 / dst.width as f32;
    let inv_h = 1.0 / dst.height as f32;

    dst.data
        .par_chunks_mut(dw * CHANNELS)
        .enumerate()
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5) * inv_h;
            for (x, out) in row.chunks_exact_mut(CHANNELS).enumerate() {
                let u = (x as f32 + 0.5) * inv_w;
                let c = upsample_tap(src, u, v, half);
                for ch in 0..3 {
                    out[ch] = c[ch] * a + out[ch] * (1.0 - a);
                }
                out[3] = a + out[3] * (1.0 - a);
            }
        });
}

/// Dual filter downsample: centre x4 plus four diagonal taps, /8.
fn downsample_tap(src: &CpuImage, u: f32, v: f32, half: [f32; 2]) -> [f32; 4] {
    let [hx, hy] = half;
    let mut acc = scale(sample(src, u, v), 4.0);
    for (dx, dy) in [(-hx, -hy), (hx, hy), (hx, -hy), (-hx, hy)] {
        add(&mut acc, sample(src, u + dx, v + dy));
    }
    scale(acc, 1.0 / 8.0)
}

/// Dual filter upsample: 8-tap tent, edge taps x1 and diagonal taps x2, /12.
fn upsample_tap(src: &CpuImage, u: f32, v: f32, half: [f32; 2]) -> [f32; 4] {
    let [hx, hy] = half;
    let mut acc = [0.0f32; 4];
    for (dx, dy) in [(-2.0 * hx, 0.0), (2.0 * hx, 0.0), (0.0, 2.0 * hy), (0.0, -2.0 * hy)] {
        add(&mut acc, sample(src, u + dx, v + dy));
    }
    for (dx, dy) in [(-hx, hy), (hx, hy), (hx, -hy), (-hx, -hy)] {
        add(&mut acc, scale(sample(src, u + dx, v + dy), 2.0));
    }
    scale(acc, 1.0 / 12.0)
}

/// Bilinear sample at normalized `(u, v)`, clamp-to-edge.
fn sample(src: &CpuImage, u: f32, v: f32) -> [f32; 4] {
    let w = src.width as usize;
    let h = src.height as usize;
    let fx = (u * w as f32 - 0.5).clamp(0.0, (w - 1) as f32);
    let fy = (v * h as f32 - 0.5).clamp(0.0, (h - 1) as f32);

    let x0 = fx as usize;
    let y0 = fy as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let (c00, c10, c01, c11) = (
        texel(&src.data, w, x0, y0),
        texel(&src.data, w, x1, y0),
        texel(&src.data, w, x0, y1),
        texel(&src.data, w, x1, y1),
    );

    let mut out = [0.0f32; 4];
    for ch in 0..CHANNELS {
        let top = c00[ch] + tx * (c10[ch] - c00[ch]);
        let bot = c01[ch] + tx * (c11[ch] - c01[ch]);
        out[ch] = top + ty * (bot - top);
    }
    out
}

#[inline]
fn texel(data: &[f32], width: usize, x: usize, y: usize) -> &[f32] {
    let i = (y * width + x) * CHANNELS;
    &data[i..i + CHANNELS]
}

#[inline]
fn add(acc: &mut [f32; 4], v: [f32; 4]) {
    for (a, b) in acc.iter_mut().zip(v) {
        *a += b;
    }
}

#[inline]
fn scale(v: [f32; 4], s: f32) -> [f32; 4] {
    v.map(|c| c * s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn checker(w: u32, h: u32) -> CpuImage {
        let mut img = CpuImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let c = if (x + y) % 2 == 0 { 1.0 } else { 0.0 };
                img.set_pixel(x, y, [c, c, c, 1.0]);
            }
        }
        img
    }

    #[test]
    fn test_copy_same_size() {
        let mut backend = CpuBackend::new();
        let src = checker(4, 4);
        let mut dst = CpuImage::new(4, 4);
        backend.blit(&src, &mut dst, None).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_copy_resamples_constant() {
        let mut backend = CpuBackend::new();
        let src = CpuImage::filled(7, 5, [0.2, 0.4, 0.6, 1.0]);
        let mut dst = CpuImage::new(3, 2);
        backend.blit(&src, &mut dst, None).unwrap();
        for px in dst.data().chunks(4) {
            assert_abs_diff_eq!(px[0], 0.2, epsilon = 1e-5);
            assert_abs_diff_eq!(px[3], 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_downsample_averages_checker() {
        let mut backend = CpuBackend::new();
        let mut filter = CpuFilter::default();
        let src = checker(8, 8);
        let mut dst = CpuImage::new(4, 4);
        backend.set_filter_vector(&mut filter, FilterParam::TexelSize, dst.resolution().texel_size());
        backend.blit(&src, &mut dst, Some((&filter, FilterPass::Downsample))).unwrap();
        let mean = dst.mean();
        assert_abs_diff_eq!(mean[0], 0.5, epsilon = 0.1);
        assert_abs_diff_eq!(mean[3], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_upsample_preserves_constant() {
        let mut backend = CpuBackend::new();
        let filter = CpuFilter::default();
        let src = CpuImage::filled(4, 4, [0.3, 0.3, 0.3, 1.0]);
        let mut dst = CpuImage::new(8, 8);
        backend.blit(&src, &mut dst, Some((&filter, FilterPass::Upsample))).unwrap();
        for px in dst.data().chunks(4) {
            assert_abs_diff_eq!(px[0], 0.3, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_opacity_blends_over_destination() {
        let mut backend = CpuBackend::new();
        let mut filter = CpuFilter::default();
        backend.set_filter_scalar(&mut filter, FilterParam::Opacity, 0.25);

        let src = CpuImage::filled(2, 2, [1.0, 1.0, 1.0, 1.0]);
        let mut dst = CpuImage::filled(4, 4, [0.0, 0.0, 0.0, 1.0]);
        backend.blit(&src, &mut dst, Some((&filter, FilterPass::UpsampleWithOpacity))).unwrap();
        for px in dst.data().chunks(4) {
            assert_abs_diff_eq!(px[0], 0.25, epsilon = 1e-5);
            assert_abs_diff_eq!(px[3], 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_filter_params() {
        let mut backend = CpuBackend::new();
        let mut filter = CpuFilter::default();
        backend.set_filter_vector(&mut filter, FilterParam::TexelSize, [0.5, 0.25, 2.0, 4.0]);
        backend.set_filter_scalar(&mut filter, FilterParam::Opacity, 0.7);
        assert_eq!(filter.texel_size, [0.5, 0.25, 2.0, 4.0]);
        assert_eq!(filter.opacity, 0.7);
        assert_eq!(backend.name(), "cpu");
    }

    #[test]
    fn test_mismatched_param_kind_ignored() {
        let mut backend = CpuBackend::new();
        let mut filter = CpuFilter::default();
        backend.set_filter_vector(&mut filter, FilterParam::Opacity, [0.3, 0.3, 0.3, 0.3]);
        backend.set_filter_scalar(&mut filter, FilterParam::TexelSize, 0.125);
        assert_eq!(filter, CpuFilter::default());
    }
}
