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

//! Defines data structures for bind groups and bind group layouts.
//!
//! Bind groups bind buffers and texture views to the `@group`/`@binding` slots
//! declared by a shader.

use super::buffer::BufferId;
use super::shader::ShaderStageFlags;
use super::texture::{TextureFormat, TextureViewDimension, TextureViewId};

/// An opaque handle to a bind group layout resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutId(pub usize);

/// An opaque handle to a bind group resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupId(pub usize);

/// Describes the type of buffer binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferBindingType {
    /// A uniform buffer.
    Uniform,
    /// A storage buffer.
    Storage {
        /// Whether the buffer is read-only in the shader.
        read_only: bool,
    },
}

/// The type of texel a sampled texture binding yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSampleType {
    /// Floating-point texels.
    Float {
        /// Whether the texture can be filtered.
        filterable: bool,
    },
    /// Depth texels.
    Depth,
}

/// Access mode of a storage texture binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTextureAccess {
    /// The shader only writes.
    WriteOnly,
    /// The shader only reads.
    ReadOnly,
}

/// The type of resource bound at a binding point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingType {
    /// A uniform or storage buffer.
    Buffer {
        /// The type of buffer binding.
        ty: BufferBindingType,
    },
    /// A texture read with `textureLoad`.
    Texture {
        /// The texel type.
        sample_type: TextureSampleType,
        /// The dimension of the texture view.
        view_dimension: TextureViewDimension,
    },
    /// A storage texture.
    StorageTexture {
        /// Read or write access.
        access: StorageTextureAccess,
        /// Texel format of the view.
        format: TextureFormat,
        /// The dimension of the texture view.
        view_dimension: TextureViewDimension,
    },
}

/// Describes a single binding entry in a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindGroupLayoutEntry {
    /// The binding index (`@binding(n)` in WGSL).
    pub binding: u32,
    /// Which shader stages can access this binding.
    pub visibility: ShaderStageFlags,
    /// The type of resource being bound.
    pub ty: BindingType,
}

impl BindGroupLayoutEntry {
    /// A uniform buffer entry.
    pub const fn uniform(binding: u32, visibility: ShaderStageFlags) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
            },
        }
    }

    /// A storage buffer entry.
    pub const fn storage(binding: u32, visibility: ShaderStageFlags, read_only: bool) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
            },
        }
    }

    /// A non-filterable float or depth texture entry.
    pub const fn texture(
        binding: u32,
        visibility: ShaderStageFlags,
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
    ) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::Texture {
                sample_type,
                view_dimension,
            },
        }
    }

    /// A write-only storage texture entry.
    pub const fn storage_texture(
        binding: u32,
        visibility: ShaderStageFlags,
        format: TextureFormat,
    ) -> Self {
        Self {
            binding,
            visibility,
            ty: BindingType::StorageTexture {
                access: StorageTextureAccess::WriteOnly,
                format,
                view_dimension: TextureViewDimension::D2,
            },
        }
    }
}

/// Describes a bind group layout to be created.
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// The entries in this bind group layout.
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A region of a buffer bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    /// The bound buffer.
    pub buffer: BufferId,
    /// Byte offset into the buffer.
    pub offset: u64,
    /// Size of the binding. `None` binds to the end of the buffer.
    pub size: Option<u64>,
}

/// A resource bound to one entry of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    /// A buffer region.
    Buffer(BufferBinding),
    /// A texture view.
    TextureView(TextureViewId),
}

/// One entry of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupEntry {
    /// The binding index this resource fills.
    pub binding: u32,
    /// The resource itself.
    pub resource: BindingResource,
}

impl BindGroupEntry {
    /// Binds a whole buffer.
    pub const fn buffer(binding: u32, buffer: BufferId) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(BufferBinding {
                buffer,
                offset: 0,
                size: None,
            }),
        }
    }

    /// Binds a texture view.
    pub const fn texture_view(binding: u32, view: TextureViewId) -> Self {
        Self {
            binding,
            resource: BindingResource::TextureView(view),
        }
    }
}

/// Describes a bind group to be created.
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// The layout the group conforms to.
    pub layout: BindGroupLayoutId,
    /// The bound resources.
    pub entries: &'a [BindGroupEntry],
}
