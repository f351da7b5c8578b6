//! CPU image representation.

use crate::backend::ImageHandle;
use crate::resolution::Resolution;
use crate::{BlurError, BlurResult};

/// Channels per pixel. Images are always RGBA.
pub const CHANNELS: usize = 4;

/// RGBA `f32` image stored in RAM.
#[derive(Clone, PartialEq)]
pub struct CpuImage {
    /// Raw pixel data, row-major RGBA.
    pub(crate) data: Vec<f32>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CpuImage {
    /// Create from RGBA f32 data.
    pub fn from_f32(data: Vec<f32>, width: u32, height: u32) -> BlurResult<Self> {
        if width == 0 || height == 0 {
            return Err(BlurError::InvalidDimensions(width, height));
        }
        let expected = pixel_count(width, height) * CHANNELS;
        if data.len() != expected {
            return Err(BlurError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Create a transparent black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0; 4])
    }

    /// Create an image with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [f32; 4]) -> Self {
        let n = pixel_count(width, height);
        let mut data = Vec::with_capacity(n * CHANNELS);
        for _ in 0..n {
            data.extend_from_slice(&rgba);
        }
        Self { data, width, height }
    }

    /// Get pixel data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume into raw data.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [f32; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Mean of every channel, useful for energy checks.
    pub fn mean(&self) -> [f32; 4] {
        let n = pixel_count(self.width, self.height);
        if n == 0 {
            return [0.0; 4];
        }
        let mut sum = [0.0f64; 4];
        for px in self.data.chunks_exact(CHANNELS) {
            for (s, v) in sum.iter_mut().zip(px) {
                *s += *v as f64;
            }
        }
        sum.map(|s| (s / n as f64) as f32)
    }
}

impl ImageHandle for CpuImage {
    fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl std::fmt::Debug for CpuImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[inline]
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
