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

//! Defines data structures related to GPU texture resources.

use crate::solve_bitflags;
use std::borrow::Cow;

/// The texel formats the renderer allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Single-channel 32-bit float. Used for the depth pyramid.
    R32Float,
    /// 32-bit float depth.
    Depth32Float,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, sRGB encoded. The usual swapchain format.
    Bgra8UnormSrgb,
    /// 16-bit float RGBA.
    Rgba16Float,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R32Float
            | TextureFormat::Depth32Float
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8UnormSrgb => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }

    /// Returns `true` for depth formats.
    pub const fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }
}

/// The dimensionality of a texture view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    /// A view of a 2D texture.
    D2,
    /// A view of a 2D texture array.
    D2Array,
}

solve_bitflags! {
    /// A set of flags describing the allowed usages of a [`TextureId`].
    pub struct TextureUsage: u32 {
        /// The texture can be used as the source of a copy operation.
        const COPY_SRC = 1 << 0;
        /// The texture can be used as the destination of a copy operation.
        const COPY_DST = 1 << 1;
        /// The texture can be bound in a shader for reading.
        const TEXTURE_BINDING = 1 << 2;
        /// The texture can be bound as a storage texture.
        const STORAGE_BINDING = 1 << 3;
        /// The texture can be used as a color or depth attachment in a render pass.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

/// Width, height and depth-or-layer count of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth for 3D textures, layer count for arrays.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// A single-layer 2D extent.
    pub const fn d2(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensions (width, height, layers) of the texture.
    pub size: Extent3D,
    /// The number of mipmap levels for the texture.
    pub mip_level_count: u32,
    /// The format of the texels in the texture.
    pub format: TextureFormat,
    /// A bitmask of [`TextureUsage`] flags describing how the texture will be used.
    pub usage: TextureUsage,
}

/// A descriptor used to create a [`TextureViewId`].
#[derive(Debug, Clone, Default)]
pub struct TextureViewDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensionality of the view. `None` infers it from the texture.
    pub dimension: Option<TextureViewDimension>,
    /// The first mipmap level accessed by the view.
    pub base_mip_level: u32,
    /// The number of mipmap levels in the view. `None` means "all remaining".
    pub mip_level_count: Option<u32>,
    /// The first array layer accessed by the view.
    pub base_array_layer: u32,
    /// The number of array layers in the view. `None` means "all remaining".
    pub array_layer_count: Option<u32>,
}

impl<'a> TextureViewDescriptor<'a> {
    /// A view restricted to a single mip level.
    pub fn single_mip(label: &'a str, level: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            base_mip_level: level,
            mip_level_count: Some(1),
            ..Default::default()
        }
    }

    /// A 2D view of a single array layer.
    pub fn single_layer(label: &'a str, layer: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            dimension: Some(TextureViewDimension::D2),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        }
    }
}

/// An opaque handle to a GPU texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// An opaque handle to a view of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_mip_view() {
        let desc = TextureViewDescriptor::single_mip("Pyramid Mip", 3);
        assert_eq!(desc.base_mip_level, 3);
        assert_eq!(desc.mip_level_count, Some(1));
        assert_eq!(desc.array_layer_count, None);
    }

    #[test]
    fn test_format_properties() {
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::R32Float.is_depth());
        assert_eq!(TextureFormat::Rgba16Float.bytes_per_pixel(), 8);
    }
}
