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

//! Host/device data layouts.
//!
//! Every struct here crosses the host/device boundary byte for byte: it is
//! `#[repr(C)]`, `Pod`, and mirrored by a WGSL struct with the same field
//! order. Sizes are pinned by tests; changing a field means changing the
//! matching shader.

use crate::math::{Mat4, Vec3, Vec4};
use crate::renderer::config::{
    ClusterGridConfig, DRAW_DISTANCE_SENTINEL, LOD_BASE, LOD_STEP, SHADOW_CASCADE_COUNT,
};
use bytemuck::{Pod, Zeroable};

/// Parameters of one visibility-cull dispatch.
///
/// `zfar` carries the draw distance; the frustum has no far plane.
/// `frustum` holds `[X.x, X.z, Y.y, Y.z]` of the normalized side planes
/// `X = row3 + row0` and `Y = row3 + row1` of the projection matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawCullData {
    /// World to view transform.
    pub view: [[f32; 4]; 4],
    /// `projection[0][0]`.
    pub p00: f32,
    /// `projection[1][1]`.
    pub p11: f32,
    /// Near plane distance.
    pub znear: f32,
    /// Draw distance.
    pub zfar: f32,
    /// Symmetric side-plane coefficients.
    pub frustum: [f32; 4],
    /// Base LOD distance.
    pub lod_base: f32,
    /// LOD distance multiplier.
    pub lod_step: f32,
    /// Width of depth pyramid level 0.
    pub pyramid_width: f32,
    /// Height of depth pyramid level 0.
    pub pyramid_height: f32,
    /// Number of records in the bucket.
    pub draw_count: u32,
    /// `0` marks every record visible.
    pub culling_enabled: i32,
    /// Reserved, always `0`.
    pub lod_enabled: i32,
    /// Enables the depth pyramid test.
    pub occlusion_enabled: i32,
    /// Enables the draw distance test.
    pub distance_check: i32,
    /// Replaces the frustum and distance tests with a world-space box test.
    pub aabb_check: i32,
    /// Minimum corner of the override box.
    pub aabb_min: [f32; 3],
    /// Maximum corner of the override box.
    pub aabb_max: [f32; 3],
}

/// Host-side description of a cull, turned into a [`DrawCullData`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullParams {
    /// World to view transform.
    pub view: Mat4,
    /// Projection matrix; only its symmetric terms are used.
    pub projection: Mat4,
    /// Near plane distance.
    pub znear: f32,
    /// Maximum draw distance.
    pub draw_dist: f32,
    /// Enables the frustum test.
    pub frustum_cull: bool,
    /// Enables the depth pyramid test.
    pub occlusion_cull: bool,
    /// World-space box overriding the frustum and distance tests.
    pub aabb: Option<(Vec3, Vec3)>,
}

impl DrawCullData {
    /// Builds the dispatch parameters for a bucket of `draw_count` records
    /// against a depth pyramid of the given level-0 size.
    pub fn new(params: &CullParams, draw_count: u32, pyramid_size: (u32, u32)) -> Self {
        let proj_t = params.projection.transpose();
        let frustum_x = normalize_plane(proj_t.w_axis + proj_t.x_axis);
        let frustum_y = normalize_plane(proj_t.w_axis + proj_t.y_axis);
        let (aabb_min, aabb_max) = params.aabb.unwrap_or((Vec3::ZERO, Vec3::ZERO));

        Self {
            view: params.view.to_cols_array_2d(),
            p00: params.projection.x_axis.x,
            p11: params.projection.y_axis.y,
            znear: params.znear,
            zfar: params.draw_dist,
            frustum: [frustum_x.x, frustum_x.z, frustum_y.y, frustum_y.z],
            lod_base: LOD_BASE,
            lod_step: LOD_STEP,
            pyramid_width: pyramid_size.0 as f32,
            pyramid_height: pyramid_size.1 as f32,
            draw_count,
            culling_enabled: 1,
            lod_enabled: 0,
            occlusion_enabled: params.occlusion_cull as i32,
            distance_check: (params.draw_dist <= DRAW_DISTANCE_SENTINEL) as i32,
            aabb_check: params.aabb.is_some() as i32,
            aabb_min: aabb_min.to_array(),
            aabb_max: aabb_max.to_array(),
        }
        .with_frustum(params.frustum_cull)
    }

    fn with_frustum(mut self, enabled: bool) -> Self {
        if !enabled {
            // A zero plane makes the side test degenerate to `0 > -radius`.
            self.frustum = [0.0; 4];
        }
        self
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let len = plane.truncate().length();
    if len > 0.0 {
        plane / len
    } else {
        plane
    }
}

/// Arguments of one indexed indirect draw, tightly packed (20 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawIndexedIndirect {
    /// Number of indices drawn.
    pub index_count: u32,
    /// `1` when visible, `0` when culled. Written by the culler every frame.
    pub instance_count: u32,
    /// First index in the merged index buffer.
    pub first_index: u32,
    /// Added to each index; the instance's first vertex in the merged buffer.
    pub vertex_offset: i32,
    /// The record's object ID, recovered by the vertex shader as `instance_index`.
    pub first_instance: u32,
}

/// The device-side object half of an indirect draw record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PassObject {
    /// Index into the model information buffer.
    pub model_index: u32,
    /// Material batch the record belongs to.
    pub batch_id: u32,
}

/// A complete indirect draw record as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndirectDrawRecord {
    /// The draw arguments.
    pub command: DrawIndexedIndirect,
    /// Position of the record in its bucket's flat list.
    pub object_id: u32,
    /// Material batch the record belongs to.
    pub batch_id: u32,
}

/// Per-instance data read by the culler and by the vertex shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuModelInformation {
    /// Local to world transform.
    pub local_transform: [[f32; 4]; 4],
    /// World-space bounding sphere: center in `xyz`, radius in `w`.
    pub sphere_bounds: [f32; 4],
    /// Bindless material table index.
    pub texture_index: u32,
    /// First index in the merged index buffer.
    pub first_index: u32,
    /// Number of indices.
    pub index_count: u32,
    /// First vertex in the merged vertex buffer.
    pub first_vertex: u32,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Index of this model in the model buffer.
    pub first_instance: u32,
    /// Byte offset of the first vertex inside the merged vertex buffer.
    pub vertex_buffer_address: u64,
    /// Padding to 16-byte alignment.
    pub _pad: [f32; 4],
}

impl GpuModelInformation {
    /// The world-space bounding sphere as `(center, radius)`.
    pub fn sphere(&self) -> (Vec3, f32) {
        let [x, y, z, r] = self.sphere_bounds;
        (Vec3::new(x, y, z), r)
    }
}

/// The vertex layout of the merged vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Texture coordinate U.
    pub uv_x: f32,
    /// Object-space normal.
    pub normal: [f32; 3],
    /// Texture coordinate V.
    pub uv_y: f32,
    /// Vertex color.
    pub color: [f32; 4],
}

/// A point light as stored in the light buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    /// World-space position; `w` is 1.
    pub position: [f32; 4],
    /// Linear color; `w` unused.
    pub color: [f32; 4],
    /// `1` if the light is considered by binning.
    pub enabled: u32,
    /// Radius of influence.
    pub range: f32,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Padding.
    pub _pad: f32,
}

/// The directional light as stored in the scene uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    /// Direction the light travels, normalized; `w` unused.
    pub direction: [f32; 4],
    /// Linear color; `w` unused.
    pub color: [f32; 4],
    /// Intensity multiplier.
    pub intensity: f32,
    /// Padding.
    pub _pad: [f32; 3],
}

/// View-space bounds of one cluster.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VolumeTileAabb {
    /// Minimum corner; `w` is 0.
    pub min_point: [f32; 4],
    /// Maximum corner; `w` is 0.
    pub max_point: [f32; 4],
}

/// Where a cluster's lights live in the global index list.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LightGrid {
    /// First slot in the global index list.
    pub offset: u32,
    /// Number of lights.
    pub count: u32,
}

/// Parameters for rebuilding cluster bounds and looking clusters up.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ScreenToView {
    /// Inverse of the projection matrix.
    pub inverse_projection: [[f32; 4]; 4],
    /// `[gridX, gridY, gridZ, tile width in pixels]`.
    pub tile_sizes: [u32; 4],
    /// Screen width in pixels.
    pub screen_width: u32,
    /// Screen height in pixels.
    pub screen_height: u32,
    /// `gridZ / log2(zFar / zNear)`.
    pub slice_scaling_factor: f32,
    /// `-(gridZ * log2(zNear) / log2(zFar / zNear))`.
    pub slice_bias_factor: f32,
    /// Tile height in pixels.
    pub tile_size_y: u32,
    /// Padding.
    pub _pad: [u32; 3],
}

impl ScreenToView {
    /// Computes the parameters for a grid, a projection and a screen size.
    pub fn new(
        grid: &ClusterGridConfig,
        projection: &Mat4,
        screen: (u32, u32),
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Self {
            inverse_projection: projection.inverse().to_cols_array_2d(),
            tile_sizes: [
                grid.grid_x,
                grid.grid_y,
                grid.grid_z,
                grid.tile_size_x(screen.0),
            ],
            screen_width: screen.0,
            screen_height: screen.1,
            slice_scaling_factor: grid.slice_scaling_factor(z_near, z_far),
            slice_bias_factor: grid.slice_bias_factor(z_near, z_far),
            tile_size_y: grid.tile_size_y(screen.1),
            _pad: [0; 3],
        }
    }
}

/// Per-frame parameters of the light binning dispatch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightCullUniforms {
    /// World to view transform.
    pub view: [[f32; 4]; 4],
    /// Number of entries in the light buffer.
    pub light_count: u32,
    /// Which of the two global counters this frame uses.
    pub frame_slot: u32,
    /// Per-cluster light bound.
    pub max_lights_per_cluster: u32,
    /// Padding.
    pub _pad0: u32,
    /// Near plane distance.
    pub z_near: f32,
    /// Far plane distance used for slicing.
    pub z_far: f32,
    /// Padding.
    pub _pad1: [f32; 2],
}

/// Source and destination sizes of one depth reduction dispatch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DepthReduceParams {
    /// Size of the level read.
    pub src_size: [u32; 2],
    /// Size of the level written.
    pub dst_size: [u32; 2],
}

/// The per-frame scene snapshot shared by the raster passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuSceneData {
    /// World to view.
    pub view: [[f32; 4]; 4],
    /// View to clip.
    pub projection: [[f32; 4]; 4],
    /// World to clip.
    pub view_projection: [[f32; 4]; 4],
    /// World to clip for each shadow cascade.
    pub cascade_view_projection: [[[f32; 4]; 4]; SHADOW_CASCADE_COUNT],
    /// Far view depth of each cascade.
    pub cascade_splits: [f32; 4],
    /// Camera position; `w` unused.
    pub camera_position: [f32; 4],
    /// Ambient light color; `w` unused.
    pub ambient_color: [f32; 4],
    /// The sun.
    pub sun: GpuDirectionalLight,
    /// Cluster lookup parameters: `[gridX, gridY, gridZ, tile width]`.
    pub tile_sizes: [u32; 4],
    /// Slice scale, slice bias, screen width, screen height.
    pub cluster_params: [f32; 4],
    /// `x`: number of point lights, `y`: `1` when shadows are sampled.
    pub flags: [u32; 4],
    /// Tile height in pixels.
    pub tile_size_y: u32,
    /// Padding.
    pub _pad: [u32; 3],
}

/// Shadow pass parameters of one cascade.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CascadeUniforms {
    /// World to light clip space.
    pub view_projection: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_layout_sizes() {
        assert_eq!(size_of::<DrawCullData>(), 160);
        assert_eq!(size_of::<DrawIndexedIndirect>(), 20);
        assert_eq!(size_of::<PassObject>(), 8);
        assert_eq!(size_of::<GpuModelInformation>(), 128);
        assert_eq!(size_of::<Vertex>(), 48);
        assert_eq!(size_of::<GpuPointLight>(), 48);
        assert_eq!(size_of::<GpuDirectionalLight>(), 48);
        assert_eq!(size_of::<VolumeTileAabb>(), 32);
        assert_eq!(size_of::<LightGrid>(), 8);
        assert_eq!(size_of::<ScreenToView>(), 112);
        assert_eq!(size_of::<LightCullUniforms>(), 96);
        assert_eq!(size_of::<DepthReduceParams>(), 16);
        assert_eq!(size_of::<GpuSceneData>() % 16, 0);
        assert_eq!(align_of::<GpuModelInformation>(), 8);
    }

    #[test]
    fn test_cull_data_from_projection() {
        let projection = Mat4::perspective_infinite_reverse_rh(60f32.to_radians(), 1.0, 1.0);
        let params = CullParams {
            view: Mat4::IDENTITY,
            projection,
            znear: 1.0,
            draw_dist: 1000.0,
            frustum_cull: true,
            occlusion_cull: false,
            aabb: None,
        };
        let data = DrawCullData::new(&params, 7, (512, 256));

        assert_eq!(data.draw_count, 7);
        assert_eq!(data.p00, projection.x_axis.x);
        assert_eq!(data.distance_check, 1);
        assert_eq!(data.aabb_check, 0);
        assert_eq!(data.pyramid_width, 512.0);
        // Side planes of a symmetric frustum: (P00, 0, -1) normalized.
        let len = (data.p00 * data.p00 + 1.0).sqrt();
        assert!((data.frustum[0] - data.p00 / len).abs() < 1e-6);
        assert!((data.frustum[1] + 1.0 / len).abs() < 1e-6);
    }

    #[test]
    fn test_cull_data_sentinel_and_override() {
        let params = CullParams {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            znear: 0.1,
            draw_dist: 20_000.0,
            frustum_cull: false,
            occlusion_cull: false,
            aabb: Some((Vec3::splat(-1000.0), Vec3::splat(1000.0))),
        };
        let data = DrawCullData::new(&params, 1, (1, 1));
        assert_eq!(data.distance_check, 0);
        assert_eq!(data.aabb_check, 1);
        assert_eq!(data.frustum, [0.0; 4]);
        assert_eq!(data.aabb_min, [-1000.0; 3]);
    }
}
