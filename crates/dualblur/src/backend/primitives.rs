//! Host primitives abstraction.
//!
//! The blur orchestration never touches pixels itself. Everything it needs
//! from the rendering host (temporary images, blits through a filter pass,
//! shader parameters) goes through [`BlitPrimitives`].

use std::fmt;

use crate::resolution::Resolution;
use crate::BlurResult;

/// Handle to an image owned by the host.
pub trait ImageHandle {
    /// Image size.
    fn resolution(&self) -> Resolution;
}

/// Filter passes of the dual filtering shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPass {
    /// 5-tap downsample.
    Downsample,
    /// 8-tap tent upsample.
    Upsample,
    /// Upsample writing [`FilterParam::Opacity`] into the output alpha.
    ///
    /// The destination must alpha-blend for the opacity to fade the result
    /// against what it already contains.
    UpsampleWithOpacity,
}

impl FilterPass {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Downsample => "downsample",
            Self::Upsample => "upsample",
            Self::UpsampleWithOpacity => "upsample_opacity",
        }
    }
}

impl fmt::Display for FilterPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shader parameter IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterParam {
    /// Destination texel size, `[1/w, 1/h, w, h]`.
    TexelSize,
    /// Output alpha for [`FilterPass::UpsampleWithOpacity`].
    Opacity,
}

/// Rendering primitives supplied by the host.
///
/// Implementations own the scratch image pool. `acquire_temporary` must
/// return an image of exactly the requested size with no depth buffer.
pub trait BlitPrimitives {
    /// Host image type (caller images and scratch images alike).
    type Image: ImageHandle;

    /// Host filter/material handle carrying the shader parameters.
    type Filter;

    /// Get a temporary image from the pool.
    fn acquire_temporary(&mut self, width: u32, height: u32) -> BlurResult<Self::Image>;

    /// Return a temporary image to the pool.
    fn release_temporary(&mut self, image: Self::Image) -> BlurResult<()>;

    /// Draw `source` into `destination`.
    ///
    /// With `filter == None` this is a plain copy, resampled to the
    /// destination size.
    fn blit(
        &mut self,
        source: &Self::Image,
        destination: &mut Self::Image,
        filter: Option<(&Self::Filter, FilterPass)>,
    ) -> BlurResult<()>;

    /// Set a vector shader parameter.
    fn set_filter_vector(&mut self, filter: &mut Self::Filter, param: FilterParam, value: [f32; 4]);

    /// Set a scalar shader parameter.
    fn set_filter_scalar(&mut self, filter: &mut Self::Filter, param: FilterParam, value: f32);

    /// Backend name.
    fn name(&self) -> &'static str;
}
