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

use crate::math::{Bounds, Mat4};
use crate::renderer::api::BufferId;

/// A mesh region living in per-asset device buffers, before merging.
///
/// Indices are relative to the region's first vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBufferHandle {
    /// Source vertex buffer.
    pub vertex_buffer: BufferId,
    /// First vertex of the region in the source buffer.
    pub first_vertex: u32,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Source `u32` index buffer.
    pub index_buffer: BufferId,
    /// First index of the region in the source buffer.
    pub first_index: u32,
    /// Number of indices.
    pub index_count: u32,
}

/// Which pipeline family a material is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialPass {
    /// Opaque surfaces.
    MainColor,
    /// Alpha-blended surfaces.
    Transparent,
}

/// A material as seen by the batcher: a bindless table index and a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle {
    /// Index into the bindless material table.
    pub index: u32,
    /// Pipeline family.
    pub pass: MaterialPass,
}

impl MaterialHandle {
    /// An opaque material.
    pub const fn opaque(index: u32) -> Self {
        Self {
            index,
            pass: MaterialPass::MainColor,
        }
    }

    /// A transparent material.
    pub const fn transparent(index: u32) -> Self {
        Self {
            index,
            pass: MaterialPass::Transparent,
        }
    }
}

/// One drawable surface placed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderObject {
    /// Geometry source.
    pub mesh: MeshBufferHandle,
    /// Material.
    pub material: MaterialHandle,
    /// Local to world transform. Fixed once the scene is loaded.
    pub transform: Mat4,
    /// Object-space bounds.
    pub bounds: Bounds,
}
