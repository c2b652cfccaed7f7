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

//! Compile-time and load-time configuration of the rendering core.
//!
//! Everything in this module is fixed once the frame orchestrator is built:
//! the constants are baked into buffer sizes and shader dispatch counts, and
//! [`RenderSettings`] is read once at startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of frames the host may record ahead of the device.
pub const FRAME_OVERLAP: usize = 2;

/// How long the host waits for a frame slot's previous submission before the
/// device is declared stalled.
pub const FENCE_TIMEOUT: Duration = Duration::from_secs(1);

/// Threads per workgroup of the visibility culling dispatch.
pub const CULL_WORKGROUP_SIZE: u32 = 256;

/// Edge length, in texels, of a depth reduction workgroup.
pub const DEPTH_REDUCE_WORKGROUP_SIZE: u32 = 32;

/// Maximum number of mip levels of the depth pyramid.
pub const DEPTH_PYRAMID_MAX_MIPS: u32 = 16;

/// Above this draw distance the distance test is skipped entirely.
pub const DRAW_DISTANCE_SENTINEL: f32 = 10_000.0;

/// Base distance of the (disabled) LOD selection carried in the cull layout.
pub const LOD_BASE: f32 = 10.0;

/// Distance multiplier between LOD levels.
pub const LOD_STEP: f32 = 1.5;

/// Half extent of the world-space box used to cull shadow casters.
pub const SHADOW_CULL_HALF_EXTENT: f32 = 1000.0;

/// Resolution of each shadow cascade.
pub const SHADOW_MAP_SIZE: u32 = 2048;

/// Number of shadow cascades.
pub const SHADOW_CASCADE_COUNT: usize = 4;

/// The cascade whose light view drives the shadow cull.
pub const SHADOW_CULL_CASCADE: usize = 1;

/// Maximum number of lights a single cluster keeps; extra lights are dropped.
pub const MAX_LIGHTS_PER_CLUSTER: u32 = 50;

/// The reference cluster grid.
pub const CLUSTER_GRID: ClusterGridConfig = ClusterGridConfig::new(16, 9, 24);

/// The fixed 3-D partition of the view frustum used for light binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterGridConfig {
    /// Tiles along the screen X axis.
    pub grid_x: u32,
    /// Tiles along the screen Y axis.
    pub grid_y: u32,
    /// Logarithmic depth slices.
    pub grid_z: u32,
    /// Maximum lights per cluster.
    pub max_lights_per_cluster: u32,
}

impl ClusterGridConfig {
    /// Creates a grid with the default light bound.
    pub const fn new(grid_x: u32, grid_y: u32, grid_z: u32) -> Self {
        Self {
            grid_x,
            grid_y,
            grid_z,
            max_lights_per_cluster: MAX_LIGHTS_PER_CLUSTER,
        }
    }

    /// Total number of clusters.
    #[inline]
    pub const fn cluster_count(&self) -> u32 {
        self.grid_x * self.grid_y * self.grid_z
    }

    /// Pixel width of one screen tile.
    #[inline]
    pub const fn tile_size_x(&self, screen_width: u32) -> u32 {
        screen_width.div_ceil(self.grid_x)
    }

    /// Pixel height of one screen tile. The rows cover the full height at
    /// any aspect ratio.
    #[inline]
    pub const fn tile_size_y(&self, screen_height: u32) -> u32 {
        screen_height.div_ceil(self.grid_y)
    }

    /// Linear index of cluster `(x, y, z)`.
    #[inline]
    pub const fn cluster_index(&self, x: u32, y: u32, z: u32) -> u32 {
        x + self.grid_x * y + self.grid_x * self.grid_y * z
    }

    /// `gridZ / log2(zFar / zNear)`.
    pub fn slice_scaling_factor(&self, z_near: f32, z_far: f32) -> f32 {
        self.grid_z as f32 / (z_far / z_near).log2()
    }

    /// `-(gridZ * log2(zNear) / log2(zFar / zNear))`.
    pub fn slice_bias_factor(&self, z_near: f32, z_far: f32) -> f32 {
        -(self.grid_z as f32 * z_near.log2() / (z_far / z_near).log2())
    }

    /// Near and far view depths (positive distances) of slice `k`.
    pub fn slice_depth_range(&self, k: u32, z_near: f32, z_far: f32) -> (f32, f32) {
        let ratio = z_far / z_near;
        let grid_z = self.grid_z as f32;
        (
            z_near * ratio.powf(k as f32 / grid_z),
            z_near * ratio.powf((k + 1) as f32 / grid_z),
        )
    }

    /// The slice containing a positive view depth, clamped to the grid.
    pub fn slice_for_depth(&self, depth: f32, z_near: f32, z_far: f32) -> u32 {
        let slice = depth.log2() * self.slice_scaling_factor(z_near, z_far)
            + self.slice_bias_factor(z_near, z_far);
        (slice.max(0.0) as u32).min(self.grid_z - 1)
    }

    /// Size in bytes of the cluster bounds buffer.
    pub const fn aabb_buffer_size(&self) -> u64 {
        self.cluster_count() as u64 * 32
    }

    /// Size in bytes of the per-cluster `{offset, count}` buffer.
    pub const fn light_grid_buffer_size(&self) -> u64 {
        self.cluster_count() as u64 * 8
    }

    /// Size in bytes of the global light index list.
    pub const fn light_index_buffer_size(&self) -> u64 {
        self.cluster_count() as u64 * self.max_lights_per_cluster as u64 * 4
    }
}

/// Startup options of the renderer, loadable from RON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Enables the frustum test of the early-depth cull.
    pub frustum_culling: bool,
    /// Enables the depth pyramid test of the early-depth cull.
    pub occlusion_culling: bool,
    /// Maximum draw distance. Values above [`DRAW_DISTANCE_SENTINEL`] disable
    /// the distance test. `None` uses the camera's far plane.
    pub draw_distance: Option<f32>,
    /// Renders the shadow cascades.
    pub shadows: bool,
    /// Clear color of the geometry pass.
    pub clear_color: [f32; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            frustum_culling: true,
            occlusion_culling: true,
            draw_distance: None,
            shadows: true,
            clear_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_grid() {
        assert_eq!(CLUSTER_GRID.cluster_count(), 3456);
        assert_eq!(CLUSTER_GRID.tile_size_x(1920), 120);
        assert_eq!(CLUSTER_GRID.tile_size_x(1921), 121);
        assert_eq!(CLUSTER_GRID.tile_size_y(1080), 120);
        assert_eq!(CLUSTER_GRID.cluster_index(15, 8, 23), 3455);
        assert_eq!(CLUSTER_GRID.light_index_buffer_size(), 3456 * 50 * 4);
    }

    #[test]
    fn test_tiles_cover_non_widescreen_targets() {
        assert_eq!(CLUSTER_GRID.tile_size_x(800), 50);
        assert_eq!(CLUSTER_GRID.tile_size_y(600), 67);
        assert!(CLUSTER_GRID.tile_size_y(600) * CLUSTER_GRID.grid_y >= 600);
        assert!(CLUSTER_GRID.tile_size_y(1024) * CLUSTER_GRID.grid_y >= 1024);
    }

    #[test]
    fn test_slice_ranges_chain() {
        let (near, far) = (1.0, 1000.0);
        let mut previous_far = near;
        for k in 0..CLUSTER_GRID.grid_z {
            let (n, f) = CLUSTER_GRID.slice_depth_range(k, near, far);
            assert_eq!(n, previous_far);
            assert!(f > n);
            previous_far = f;
        }
        assert_relative_eq!(previous_far, far, max_relative = 1e-4);
    }

    #[test]
    fn test_slice_for_depth_matches_ranges() {
        let (near, far) = (1.0, 1000.0);
        for k in 0..CLUSTER_GRID.grid_z {
            let (n, f) = CLUSTER_GRID.slice_depth_range(k, near, far);
            let mid = (n * f).sqrt();
            assert_eq!(CLUSTER_GRID.slice_for_depth(mid, near, far), k);
        }
        assert_eq!(CLUSTER_GRID.slice_for_depth(0.5, near, far), 0);
        assert_eq!(CLUSTER_GRID.slice_for_depth(5000.0, near, far), 23);
    }

    #[test]
    fn test_settings_from_ron() {
        let settings: RenderSettings =
            ron::from_str("(occlusion_culling: false, draw_distance: Some(500.0))").unwrap();
        assert!(!settings.occlusion_culling);
        assert!(settings.frustum_culling);
        assert_eq!(settings.draw_distance, Some(500.0));
    }
}
