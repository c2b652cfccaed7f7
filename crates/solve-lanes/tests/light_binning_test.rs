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

use anyhow::Context;
use solve_core::math::{Mat4, Vec3};
use solve_core::renderer::config::{ClusterGridConfig, CLUSTER_GRID, MAX_LIGHTS_PER_CLUSTER};
use solve_core::renderer::gpu_types::{GpuPointLight, ScreenToView, VolumeTileAabb};
use solve_core::scene::PointLight;
use solve_lanes::cpu::clusters::{bin_lights, build_cluster_aabbs};
use std::collections::BTreeSet;

const NEAR: f32 = 1.0;
const FAR: f32 = 1000.0;
const SCREEN: (u32, u32) = (1920, 1080);

fn camera_view() -> Mat4 {
    Mat4::look_at_rh(Vec3::new(0.0, 20.0, 40.0), Vec3::ZERO, Vec3::Y)
}

fn clusters(grid: &ClusterGridConfig) -> Vec<VolumeTileAabb> {
    let projection = Mat4::perspective_infinite_reverse_rh(
        60f32.to_radians(),
        SCREEN.0 as f32 / SCREEN.1 as f32,
        NEAR,
    );
    let params = ScreenToView::new(grid, &projection, SCREEN, NEAR, FAR);
    build_cluster_aabbs(grid, &params, NEAR, FAR)
}

/// Sphere/box overlap written out per axis, independent of the binner.
fn overlaps(center: Vec3, radius: f32, aabb: &VolumeTileAabb) -> bool {
    let mut distance_sq = 0.0;
    for axis in 0..3 {
        let (lo, hi) = (aabb.min_point[axis], aabb.max_point[axis]);
        let c = center[axis];
        if c < lo {
            distance_sq += (lo - c) * (lo - c);
        } else if c > hi {
            distance_sq += (c - hi) * (c - hi);
        }
    }
    distance_sq <= radius * radius
}

fn scene_lights() -> Vec<GpuPointLight> {
    let white = Vec3::ONE;
    vec![
        PointLight::new(Vec3::ZERO, white, 10.0, 1.0).to_gpu(),
        PointLight::new(Vec3::new(15.0, 2.0, -5.0), white, 6.0, 2.0).to_gpu(),
        PointLight::new(Vec3::new(-30.0, 0.0, -60.0), white, 25.0, 1.0).to_gpu(),
        PointLight::new(Vec3::new(0.0, 5.0, -300.0), white, 80.0, 1.0).to_gpu(),
        PointLight::new(Vec3::new(2.0, 19.0, 38.5), white, 1.5, 1.0).to_gpu(),
        // Behind the camera, out of reach of every cluster.
        PointLight::new(Vec3::new(0.0, 40.0, 120.0), white, 5.0, 1.0).to_gpu(),
    ]
}

#[test]
fn test_binning_matches_brute_force_on_reference_grid() {
    let aabbs = clusters(&CLUSTER_GRID);
    assert_eq!(aabbs.len(), 3456);

    let view = camera_view();
    let lights = scene_lights();
    let bins = bin_lights(&aabbs, &lights, &view, MAX_LIGHTS_PER_CLUSTER);

    let mut pairs = 0;
    for (cluster, aabb) in aabbs.iter().enumerate() {
        let expected: BTreeSet<u32> = lights
            .iter()
            .enumerate()
            .filter(|(_, light)| {
                let center = view.transform_point3(Vec3::from_slice(&light.position));
                overlaps(center, light.range, aabb)
            })
            .map(|(index, _)| index as u32)
            .collect();
        let actual: BTreeSet<u32> = bins.lights_of(cluster).iter().copied().collect();
        assert_eq!(actual, expected, "cluster {cluster}");
        pairs += expected.len() as u32;
    }

    assert!(pairs > 0);
    assert_eq!(bins.overflow, 0);
    // Round trip of the frame counter: every reserved slot belongs to a cluster.
    assert_eq!(bins.reserved, pairs);
    let counted: u32 = bins.grid.iter().map(|entry| entry.count).sum();
    assert_eq!(counted, pairs);
}

#[test]
fn test_unreachable_light_lands_nowhere() {
    let aabbs = clusters(&CLUSTER_GRID);
    let view = camera_view();
    let lights = scene_lights();
    let behind = lights.len() as u32 - 1;
    let bins = bin_lights(&aabbs, &lights, &view, MAX_LIGHTS_PER_CLUSTER);

    for cluster in 0..aabbs.len() {
        assert!(!bins.lights_of(cluster).contains(&behind));
    }
}

#[test]
fn test_cluster_slices_are_disjoint_and_ordered() -> anyhow::Result<()> {
    let aabbs = clusters(&CLUSTER_GRID);
    let slice_len = (CLUSTER_GRID.grid_x * CLUSTER_GRID.grid_y) as usize;
    for z in 1..CLUSTER_GRID.grid_z as usize {
        let previous = &aabbs[(z - 1) * slice_len];
        let current = &aabbs[z * slice_len];
        // View space looks down -Z: deeper slices have smaller z.
        let previous_far = previous.min_point[2];
        let current_near = current.max_point[2];
        assert!((previous_far - current_near).abs() <= previous_far.abs() * 1e-5);
    }
    assert!((aabbs[0].max_point[2] + NEAR).abs() < 1e-4);
    let last = aabbs.last().context("the grid has no clusters")?;
    assert!((last.min_point[2] + FAR).abs() < FAR * 1e-4);
    Ok(())
}

#[test]
fn test_overflow_is_counted_per_dropped_pair() {
    let grid = ClusterGridConfig {
        max_lights_per_cluster: 4,
        ..ClusterGridConfig::new(4, 3, 6)
    };
    let aabbs = clusters(&grid);
    let view = camera_view();
    let lights: Vec<GpuPointLight> = (0..7)
        .map(|i| PointLight::new(Vec3::new(i as f32 * 0.1, 0.0, 0.0), Vec3::ONE, 8.0, 1.0).to_gpu())
        .collect();
    let bins = bin_lights(&aabbs, &lights, &view, grid.max_lights_per_cluster);

    let mut touched = 0;
    let mut dropped = 0;
    for (cluster, aabb) in aabbs.iter().enumerate() {
        let hits = lights
            .iter()
            .filter(|light| {
                let center = view.transform_point3(Vec3::from_slice(&light.position));
                overlaps(center, light.range, aabb)
            })
            .count() as u32;
        let kept = bins.lights_of(cluster).len() as u32;
        assert_eq!(kept, hits.min(4));
        if hits > 0 {
            touched += 1;
        }
        dropped += hits.saturating_sub(4);
    }
    assert!(touched > 0);
    assert_eq!(bins.overflow, dropped);
    assert!(bins.overflow > 0);
}
