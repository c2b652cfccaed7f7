// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Depth pyramid reduction.

use solve_core::math::{mip_level_count, previous_pow2};
use solve_core::renderer::config::DEPTH_PYRAMID_MAX_MIPS;
use std::ops::Range;

/// Errors raised when building host images.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    /// The texel slice does not match the dimensions.
    #[error("expected {expected} texels for the image, got {actual}")]
    SizeMismatch {
        /// `width * height`.
        expected: usize,
        /// Length of the slice given.
        actual: usize,
    },
    /// Width or height is zero.
    #[error("image dimensions must be non-zero")]
    Empty,
}

/// A single-channel float image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    width: u32,
    height: u32,
    texels: Vec<f32>,
}

impl DepthImage {
    /// Wraps `texels` as a `width x height` image.
    pub fn new(width: u32, height: u32, texels: Vec<f32>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::Empty);
        }
        let expected = (width * height) as usize;
        if texels.len() != expected {
            return Err(ImageError::SizeMismatch {
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// An image filled with `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            texels: vec![value; (width * height) as usize],
        }
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at `(x, y)`, clamped to the edges like a `textureLoad` on a
    /// clamped coordinate.
    pub fn load(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.texels[(y * self.width + x) as usize]
    }

    /// Raw texels.
    pub fn texels(&self) -> &[f32] {
        &self.texels
    }
}

/// Size of pyramid level 0 for a depth target of `width x height`.
pub fn pyramid_extent(width: u32, height: u32) -> (u32, u32) {
    (previous_pow2(width), previous_pow2(height))
}

/// Number of levels of a pyramid whose level 0 is `width x height`.
pub fn pyramid_levels(width: u32, height: u32) -> u32 {
    mip_level_count(width, height).min(DEPTH_PYRAMID_MAX_MIPS)
}

/// Size of `level` given the level 0 size.
pub fn level_extent(base: (u32, u32), level: u32) -> (u32, u32) {
    ((base.0 >> level).max(1), (base.1 >> level).max(1))
}

/// Source texels covered by destination texel `dst` along one axis:
/// `[floor(dst * src / dst_size), ceil((dst + 1) * src / dst_size))`,
/// clamped to the source and never empty.
pub fn footprint(dst: u32, src_size: u32, dst_size: u32) -> Range<u32> {
    let start = dst * src_size / dst_size;
    let end = ((dst + 1) * src_size).div_ceil(dst_size).min(src_size);
    start..end.max(start + 1)
}

/// Reduces `src` to a `dst_width x dst_height` image, each texel holding the
/// minimum over its footprint.
pub fn reduce_level(src: &DepthImage, dst_width: u32, dst_height: u32) -> DepthImage {
    let mut texels = Vec::with_capacity((dst_width * dst_height) as usize);
    for y in 0..dst_height {
        let fy = footprint(y, src.height, dst_height);
        for x in 0..dst_width {
            let fx = footprint(x, src.width, dst_width);
            let mut depth = f32::INFINITY;
            for sy in fy.clone() {
                for sx in fx.clone() {
                    depth = depth.min(src.load(sx as i64, sy as i64));
                }
            }
            texels.push(depth);
        }
    }
    DepthImage {
        width: dst_width,
        height: dst_height,
        texels,
    }
}

/// Builds the full pyramid of a depth image.
///
/// Level 0 reduces the depth image to its power-of-two extent, every further
/// level halves the previous one.
pub fn build_pyramid(depth: &DepthImage) -> Vec<DepthImage> {
    let base = pyramid_extent(depth.width, depth.height);
    let levels = pyramid_levels(base.0, base.1);
    let mut pyramid: Vec<DepthImage> = Vec::with_capacity(levels as usize);
    for level in 0..levels {
        let (w, h) = level_extent(base, level);
        let src = pyramid.last().unwrap_or(depth);
        let reduced = reduce_level(src, w, h);
        pyramid.push(reduced);
    }
    pyramid
}

/// Number of 32x32 texel workgroups covering a level.
pub fn reduce_workgroups(width: u32, height: u32) -> (u32, u32) {
    use solve_core::renderer::config::DEPTH_REDUCE_WORKGROUP_SIZE;
    (
        width.div_ceil(DEPTH_REDUCE_WORKGROUP_SIZE),
        height.div_ceil(DEPTH_REDUCE_WORKGROUP_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> DepthImage {
        let texels = (0..width * height)
            .map(|i| ((i * 7919) % 1000) as f32 / 1000.0)
            .collect();
        DepthImage::new(width, height, texels).unwrap()
    }

    #[test]
    fn test_extent_and_levels() {
        assert_eq!(pyramid_extent(1920, 1080), (1024, 1024));
        assert_eq!(pyramid_extent(800, 600), (512, 512));
        assert_eq!(pyramid_levels(1024, 512), 11);
        assert_eq!(pyramid_levels(1, 1), 1);
        assert_eq!(level_extent((1024, 512), 10), (1, 1));
    }

    #[test]
    fn test_footprint_is_two_texels_when_halving() {
        assert_eq!(footprint(0, 8, 4), 0..2);
        assert_eq!(footprint(3, 8, 4), 6..8);
        // 5 -> 4 stretches some footprints to two texels.
        assert_eq!(footprint(0, 5, 4), 0..2);
        assert_eq!(footprint(3, 5, 4), 3..5);
        // 1 -> 1 stays a single texel.
        assert_eq!(footprint(0, 1, 1), 0..1);
    }

    #[test]
    fn test_every_level_is_min_of_2x2_block() {
        let depth = ramp(37, 23);
        let pyramid = build_pyramid(&depth);
        assert_eq!(pyramid[0].width(), 32);
        assert_eq!(pyramid[0].height(), 16);
        assert_eq!(pyramid.len(), 6);

        for pair in pyramid.windows(2) {
            let (src, dst) = (&pair[0], &pair[1]);
            for y in 0..dst.height() {
                for x in 0..dst.width() {
                    let (sx, sy) = (2 * x as i64, 2 * y as i64);
                    let expected = src
                        .load(sx, sy)
                        .min(src.load(sx + 1, sy))
                        .min(src.load(sx, sy + 1))
                        .min(src.load(sx + 1, sy + 1));
                    assert_eq!(dst.load(x as i64, y as i64), expected);
                }
            }
        }
    }

    #[test]
    fn test_level0_is_conservative_over_source() {
        let depth = ramp(37, 23);
        let pyramid = build_pyramid(&depth);
        let level0 = &pyramid[0];
        for y in 0..depth.height() {
            for x in 0..depth.width() {
                let dx = x * level0.width() / depth.width();
                let dy = y * level0.height() / depth.height();
                assert!(level0.load(dx as i64, dy as i64) <= depth.load(x as i64, y as i64));
            }
        }
    }

    #[test]
    fn test_last_level_is_global_min() {
        let mut texels = vec![0.75; 64 * 64];
        texels[64 * 17 + 40] = 0.125;
        let depth = DepthImage::new(64, 64, texels).unwrap();
        let pyramid = build_pyramid(&depth);
        let last = pyramid.last().unwrap();
        assert_eq!((last.width(), last.height()), (1, 1));
        assert_eq!(last.load(0, 0), 0.125);
    }

    #[test]
    fn test_image_validation() {
        assert_eq!(
            DepthImage::new(2, 2, vec![0.0; 3]),
            Err(ImageError::SizeMismatch {
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(DepthImage::new(0, 2, vec![]), Err(ImageError::Empty));
    }

    #[test]
    fn test_workgroup_count() {
        assert_eq!(reduce_workgroups(1024, 512), (32, 16));
        assert_eq!(reduce_workgroups(1, 1), (1, 1));
        assert_eq!(reduce_workgroups(33, 64), (2, 2));
    }
}
