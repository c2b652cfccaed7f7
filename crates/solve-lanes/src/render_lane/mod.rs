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

//! Rendering lanes - the GPU hot path.
//!
//! Each lane owns the pipelines and long-lived device resources of one stage
//! and records that stage into a frame's [`CommandEncoder`]. Lanes never
//! submit; sequencing, barriers between stages, and submission belong to the
//! frame orchestrator.
//!
//! Lanes that need per-frame uniforms or bind groups allocate them from the
//! frame's [`TransientPool`], so nothing they create outlives the frame slot.

mod background_lane;
mod cluster_lane;
mod depth_prepass_lane;
mod depth_pyramid_lane;
mod geometry_lane;
mod shadow_lane;
mod visibility_cull_lane;

pub mod shaders;

pub use background_lane::*;
pub use cluster_lane::*;
pub use depth_prepass_lane::*;
pub use depth_pyramid_lane::*;
pub use geometry_lane::*;
pub use shadow_lane::*;
pub use visibility_cull_lane::*;

use solve_core::lane::LaneError;
use solve_core::renderer::gpu_types::DrawIndexedIndirect;
use solve_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutEntry, BindGroupLayoutId,
    BufferId, GraphicsDevice, ShaderModuleDescriptor, ShaderModuleId, ShaderStageFlags,
    TransientPool,
};
use solve_core::scene::MaterialPass;

/// Depth format of the main depth target and the shadow map.
pub const DEPTH_FORMAT: solve_core::renderer::TextureFormat =
    solve_core::renderer::TextureFormat::Depth32Float;

/// Device buffers of a loaded scene, shared read-only by every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneGeometry {
    /// Merged vertex buffer, bound as storage and pulled by index.
    pub vertex_buffer: BufferId,
    /// Merged `u32` index buffer.
    pub index_buffer: BufferId,
    /// One `GpuModelInformation` per instance.
    pub model_buffer: BufferId,
}

/// The device half of a render-pass bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketBuffers {
    /// Tightly packed `DrawIndexedIndirect` records.
    pub indirect_buffer: BufferId,
    /// One `PassObject` per record.
    pub object_buffer: BufferId,
    /// Number of records.
    pub draw_count: u32,
}

/// What every mesh pass binds: this frame's scene snapshot, the scene
/// geometry, and the bucket whose indirect buffer is drawn.
#[derive(Debug, Clone, Copy)]
pub struct RasterInputs<'a> {
    /// `GpuSceneData` uniform of the frame.
    pub scene_uniform: BufferId,
    /// Merged geometry and model information.
    pub geometry: &'a SceneGeometry,
    /// The drawn bucket.
    pub bucket: &'a BucketBuffers,
}

/// A contiguous run of records drawn with one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    /// First record.
    pub first: u32,
    /// Number of records.
    pub count: u32,
    /// Pipeline family of the run.
    pub pass: MaterialPass,
}

impl DrawRange {
    /// Byte offset of the first record in the indirect buffer.
    pub fn indirect_offset(&self) -> u64 {
        self.first as u64 * std::mem::size_of::<DrawIndexedIndirect>() as u64
    }
}

/// Layout of `@group(0)` in the mesh shaders: scene uniform, models,
/// vertices, pass objects.
pub(crate) fn scene_layout_entries() -> [BindGroupLayoutEntry; 4] {
    let raster = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT;
    [
        BindGroupLayoutEntry::uniform(0, raster),
        BindGroupLayoutEntry::storage(1, ShaderStageFlags::VERTEX, true),
        BindGroupLayoutEntry::storage(2, ShaderStageFlags::VERTEX, true),
        BindGroupLayoutEntry::storage(3, ShaderStageFlags::VERTEX, true),
    ]
}

/// Binds the scene snapshot and a bucket's object list. The group lives in
/// `pool` and is released with the frame slot.
pub(crate) fn create_scene_bind_group(
    device: &dyn GraphicsDevice,
    pool: &mut TransientPool,
    layout: BindGroupLayoutId,
    inputs: &RasterInputs<'_>,
    label: &str,
) -> Result<BindGroupId, LaneError> {
    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            BindGroupEntry::buffer(0, inputs.scene_uniform),
            BindGroupEntry::buffer(1, inputs.geometry.model_buffer),
            BindGroupEntry::buffer(2, inputs.geometry.vertex_buffer),
            BindGroupEntry::buffer(3, inputs.bucket.object_buffer),
        ],
    })?;
    Ok(pool.push_bind_group(bind_group))
}

pub(crate) fn create_module(
    device: &dyn GraphicsDevice,
    label: &str,
    source: &str,
) -> Result<ShaderModuleId, LaneError> {
    Ok(device.create_shader_module(&ShaderModuleDescriptor::wgsl(label, source))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_range_offset() {
        let range = DrawRange {
            first: 3,
            count: 2,
            pass: MaterialPass::Transparent,
        };
        assert_eq!(range.indirect_offset(), 60);
    }
}
