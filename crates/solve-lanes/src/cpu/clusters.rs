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

//! Cluster bounds and light binning, as computed by `cluster_build.wgsl` and
//! `light_cull.wgsl`.

use solve_core::math::{Aabb, Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};
use solve_core::renderer::config::ClusterGridConfig;
use solve_core::renderer::gpu_types::{GpuPointLight, LightGrid, ScreenToView, VolumeTileAabb};

/// Unprojects a pixel (origin bottom-left) onto the near plane in view space.
pub fn screen_to_view(inverse_projection: &Mat4, pixel: Vec2, screen: Vec2) -> Vec3 {
    let ndc = pixel / screen * 2.0 - Vec2::ONE;
    // Reverse-Z: ndc depth 1 lies on the near plane.
    let view = *inverse_projection * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
    view.xyz() / view.w
}

/// Point where the ray from the eye through `point` crosses the plane
/// `z = z_distance`.
pub fn line_intersection_to_z_plane(point: Vec3, z_distance: f32) -> Vec3 {
    point * (z_distance / point.z)
}

/// View-space bounds of every cluster, indexed `x + gx * y + gx * gy * z`.
pub fn build_cluster_aabbs(
    grid: &ClusterGridConfig,
    params: &ScreenToView,
    z_near: f32,
    z_far: f32,
) -> Vec<VolumeTileAabb> {
    let inverse_projection = Mat4::from_cols_array_2d(&params.inverse_projection);
    let screen = Vec2::new(params.screen_width as f32, params.screen_height as f32);
    let tile = Vec2::new(params.tile_sizes[3] as f32, params.tile_size_y as f32);

    let mut aabbs = Vec::with_capacity(grid.cluster_count() as usize);
    for z in 0..grid.grid_z {
        let (slice_near, slice_far) = grid.slice_depth_range(z, z_near, z_far);
        for y in 0..grid.grid_y {
            for x in 0..grid.grid_x {
                let min_px = Vec2::new(x as f32, y as f32) * tile;
                let max_px = Vec2::new((x + 1) as f32, (y + 1) as f32) * tile;
                aabbs.push(cluster_aabb(
                    &inverse_projection,
                    screen,
                    (min_px, max_px),
                    (slice_near, slice_far),
                ));
            }
        }
    }
    aabbs
}

fn cluster_aabb(
    inverse_projection: &Mat4,
    screen: Vec2,
    (min_px, max_px): (Vec2, Vec2),
    (slice_near, slice_far): (f32, f32),
) -> VolumeTileAabb {
    let min_point = screen_to_view(inverse_projection, min_px, screen);
    let max_point = screen_to_view(inverse_projection, max_px, screen);

    let min_near = line_intersection_to_z_plane(min_point, -slice_near);
    let min_far = line_intersection_to_z_plane(min_point, -slice_far);
    let max_near = line_intersection_to_z_plane(max_point, -slice_near);
    let max_far = line_intersection_to_z_plane(max_point, -slice_far);

    let lo = min_near.min(min_far).min(max_near.min(max_far));
    let hi = min_near.max(min_far).max(max_near.max(max_far));
    VolumeTileAabb {
        min_point: lo.extend(0.0).to_array(),
        max_point: hi.extend(0.0).to_array(),
    }
}

/// Cluster containing a fragment.
///
/// `frag_px` is measured from the top-left corner like a fragment
/// coordinate; tile rows are counted from the bottom of the screen.
pub fn cluster_for_fragment(
    grid: &ClusterGridConfig,
    params: &ScreenToView,
    frag_px: Vec2,
    view_depth: f32,
) -> u32 {
    let x = ((frag_px.x / params.tile_sizes[3] as f32) as u32).min(grid.grid_x - 1);
    let y_up = params.screen_height as f32 - frag_px.y;
    let y = ((y_up.max(0.0) / params.tile_size_y as f32) as u32).min(grid.grid_y - 1);
    let slice = view_depth.log2() * params.slice_scaling_factor + params.slice_bias_factor;
    let z = (slice.max(0.0) as u32).min(grid.grid_z - 1);
    grid.cluster_index(x, y, z)
}

/// Sphere versus cluster bounds, both in view space.
pub fn light_touches_cluster(center: Vec3, range: f32, aabb: &VolumeTileAabb) -> bool {
    let bounds = Aabb {
        min: Vec4::from(aabb.min_point).xyz(),
        max: Vec4::from(aabb.max_point).xyz(),
    };
    bounds.intersects_sphere(center, range)
}

/// Output of the light binning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightBins {
    /// Per-cluster slice of `indices`.
    pub grid: Vec<LightGrid>,
    /// Global light index list, `clusters * max_lights_per_cluster` long.
    pub indices: Vec<u32>,
    /// Final value of the frame's atomic counter: slots reserved.
    pub reserved: u32,
    /// Cluster/light pairs dropped by the per-cluster bound.
    pub overflow: u32,
}

impl LightBins {
    /// Light indices assigned to `cluster`.
    pub fn lights_of(&self, cluster: usize) -> &[u32] {
        let entry = self.grid[cluster];
        &self.indices[entry.offset as usize..(entry.offset + entry.count) as usize]
    }
}

/// Bins point lights into clusters.
///
/// Clusters are visited in index order, each reserving its slots from the
/// shared counter in one step like the device invocations do.
pub fn bin_lights(
    aabbs: &[VolumeTileAabb],
    lights: &[GpuPointLight],
    view: &Mat4,
    max_lights_per_cluster: u32,
) -> LightBins {
    let view_centers: Vec<Vec3> = lights
        .iter()
        .map(|l| view.transform_point3(Vec4::from(l.position).xyz()))
        .collect();

    let mut bins = LightBins {
        grid: vec![LightGrid::default(); aabbs.len()],
        indices: vec![0; aabbs.len() * max_lights_per_cluster as usize],
        reserved: 0,
        overflow: 0,
    };

    let mut visible = Vec::with_capacity(max_lights_per_cluster as usize);
    for (cluster, aabb) in aabbs.iter().enumerate() {
        visible.clear();
        for (index, (light, center)) in lights.iter().zip(&view_centers).enumerate() {
            if light.enabled == 0 || !light_touches_cluster(*center, light.range, aabb) {
                continue;
            }
            if visible.len() < max_lights_per_cluster as usize {
                visible.push(index as u32);
            } else {
                bins.overflow += 1;
            }
        }

        let offset = bins.reserved;
        bins.reserved += visible.len() as u32;
        bins.indices[offset as usize..offset as usize + visible.len()].copy_from_slice(&visible);
        bins.grid[cluster] = LightGrid {
            offset,
            count: visible.len() as u32,
        };
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use solve_core::renderer::config::CLUSTER_GRID;

    const NEAR: f32 = 1.0;
    const FAR: f32 = 1000.0;

    fn params_for(width: u32, height: u32) -> ScreenToView {
        let projection = Mat4::perspective_infinite_reverse_rh(
            60f32.to_radians(),
            width as f32 / height as f32,
            NEAR,
        );
        ScreenToView::new(&CLUSTER_GRID, &projection, (width, height), NEAR, FAR)
    }

    fn params() -> ScreenToView {
        params_for(1920, 1080)
    }

    #[test]
    fn test_z_slices_tile_depth_range() {
        let aabbs = build_cluster_aabbs(&CLUSTER_GRID, &params(), NEAR, FAR);
        assert_eq!(aabbs.len(), 3456);

        let per_slice = (CLUSTER_GRID.grid_x * CLUSTER_GRID.grid_y) as usize;
        assert_relative_eq!(aabbs[0].max_point[2], -NEAR, epsilon = 1e-4);
        assert_relative_eq!(aabbs[aabbs.len() - 1].min_point[2], -FAR, epsilon = 1e-1);
        for z in 0..CLUSTER_GRID.grid_z as usize - 1 {
            let this = &aabbs[z * per_slice];
            let next = &aabbs[(z + 1) * per_slice];
            assert_relative_eq!(
                this.min_point[2],
                next.max_point[2],
                max_relative = 1e-5
            );
        }
    }

    fn assert_fragments_land_in_their_cluster(width: u32, height: u32) {
        let params = params_for(width, height);
        let aabbs = build_cluster_aabbs(&CLUSTER_GRID, &params, NEAR, FAR);
        let inverse_projection = Mat4::from_cols_array_2d(&params.inverse_projection);
        let screen = Vec2::new(width as f32, height as f32);
        let fragments = [
            Vec2::new(10.5, 10.5),
            Vec2::new(screen.x * 0.5 + 0.5, 10.5),
            screen * 0.5 + Vec2::splat(0.5),
            screen - Vec2::splat(9.5),
            Vec2::new(screen.x * 0.17 + 0.5, screen.y * 0.72 + 0.5),
        ];

        for frag in fragments {
            for &depth in &[1.5, 7.0, 42.0, 300.0, 990.0] {
                let cluster = cluster_for_fragment(&CLUSTER_GRID, &params, frag, depth);
                let ray = screen_to_view(
                    &inverse_projection,
                    Vec2::new(frag.x, screen.y - frag.y),
                    screen,
                );
                let point = line_intersection_to_z_plane(ray, -depth);
                let aabb = &aabbs[cluster as usize];
                let eps = 1e-3 * depth;
                for axis in 0..3 {
                    assert!(
                        point[axis] >= aabb.min_point[axis] - eps,
                        "{width}x{height} {frag} {depth}"
                    );
                    assert!(
                        point[axis] <= aabb.max_point[axis] + eps,
                        "{width}x{height} {frag} {depth}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_fragment_lookup_lands_in_its_cluster() {
        assert_fragments_land_in_their_cluster(1920, 1080);
    }

    #[test]
    fn test_fragment_lookup_at_other_aspect_ratios() {
        assert_fragments_land_in_their_cluster(800, 600);
        assert_fragments_land_in_their_cluster(1024, 1024);
        assert_fragments_land_in_their_cluster(1280, 540);
    }

    #[test]
    fn test_tile_rows_reach_the_top_edge() {
        let params = params_for(800, 600);
        assert_eq!(params.tile_sizes[3], 50);
        assert_eq!(params.tile_size_y, 67);
        let top = cluster_for_fragment(&CLUSTER_GRID, &params, Vec2::new(400.5, 10.5), 42.0);
        let row = (top / CLUSTER_GRID.grid_x) % CLUSTER_GRID.grid_y;
        assert_eq!(row, CLUSTER_GRID.grid_y - 1);
    }

    #[test]
    fn test_disabled_lights_are_skipped() {
        let aabbs = vec![VolumeTileAabb {
            min_point: [-1.0, -1.0, -2.0, 0.0],
            max_point: [1.0, 1.0, -1.0, 0.0],
        }];
        let mut light = GpuPointLight {
            position: [0.0, 0.0, -1.5, 1.0],
            color: [1.0; 4],
            enabled: 1,
            range: 0.5,
            intensity: 1.0,
            _pad: 0.0,
        };
        let bins = bin_lights(&aabbs, &[light], &Mat4::IDENTITY, 50);
        assert_eq!(bins.lights_of(0), &[0]);

        light.enabled = 0;
        let bins = bin_lights(&aabbs, &[light], &Mat4::IDENTITY, 50);
        assert!(bins.lights_of(0).is_empty());
        assert_eq!(bins.reserved, 0);
    }

    #[test]
    fn test_truncation_counts_overflow() {
        let aabbs = vec![VolumeTileAabb {
            min_point: [-1.0, -1.0, -2.0, 0.0],
            max_point: [1.0, 1.0, -1.0, 0.0],
        }];
        let lights: Vec<GpuPointLight> = (0..5)
            .map(|_| GpuPointLight {
                position: [0.0, 0.0, -1.5, 1.0],
                color: [1.0; 4],
                enabled: 1,
                range: 1.0,
                intensity: 1.0,
                _pad: 0.0,
            })
            .collect();
        let bins = bin_lights(&aabbs, &lights, &Mat4::IDENTITY, 3);
        assert_eq!(bins.grid[0].count, 3);
        assert_eq!(bins.overflow, 2);
        assert_eq!(bins.reserved, 3);
    }
}
