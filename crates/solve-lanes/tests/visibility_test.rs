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

use solve_core::math::{Mat4, Vec3};
use solve_core::renderer::gpu_types::{
    CullParams, DrawCullData, DrawIndexedIndirect, GpuModelInformation, PassObject,
};
use solve_lanes::cpu::visibility::cull_bucket;

const NEAR: f32 = 1.0;
const NO_DISTANCE: f32 = 20_000.0;

fn projection() -> Mat4 {
    Mat4::perspective_infinite_reverse_rh(60f32.to_radians(), 16.0 / 9.0, NEAR)
}

fn model(center: Vec3, radius: f32) -> GpuModelInformation {
    GpuModelInformation {
        local_transform: Mat4::from_translation(center).to_cols_array_2d(),
        sphere_bounds: [center.x, center.y, center.z, radius],
        texture_index: 0,
        first_index: 0,
        index_count: 36,
        first_vertex: 0,
        vertex_count: 24,
        first_instance: 0,
        vertex_buffer_address: 0,
        _pad: [0.0; 4],
    }
}

fn cull(models: &[GpuModelInformation], draw_dist: f32) -> Vec<u32> {
    let objects: Vec<PassObject> = (0..models.len() as u32)
        .map(|i| PassObject {
            model_index: i,
            batch_id: 0,
        })
        .collect();
    let mut commands: Vec<DrawIndexedIndirect> = (0..models.len() as u32)
        .map(|i| DrawIndexedIndirect {
            index_count: 36,
            instance_count: 0,
            first_index: 0,
            vertex_offset: 0,
            first_instance: i,
        })
        .collect();
    let data = DrawCullData::new(
        &CullParams {
            view: Mat4::IDENTITY,
            projection: projection(),
            znear: NEAR,
            draw_dist,
            frustum_cull: true,
            occlusion_cull: false,
            aabb: None,
        },
        models.len() as u32,
        (1024, 512),
    );
    cull_bucket(&data, models, &objects, &mut commands, None);
    commands.iter().map(|c| c.instance_count).collect()
}

#[test]
fn test_draw_distance_scenario() {
    let models = [
        model(Vec3::new(0.0, 0.0, -10.0), 1.0),
        model(Vec3::new(0.0, 0.0, -3000.0), 1.0),
    ];
    assert_eq!(cull(&models, 1000.0), vec![1, 0]);
    assert_eq!(cull(&models, NO_DISTANCE), vec![1, 1]);
}

#[test]
fn test_spheres_outside_side_planes_are_always_culled() {
    let p = projection();
    let (p00, p11) = (p.x_axis.x, p.y_axis.y);
    let mut models = Vec::new();
    for depth in [5.0f32, 20.0, 75.0, 300.0, 900.0] {
        for radius in [0.1f32, 1.0, 4.0] {
            let x_edge = (depth + radius * (p00 * p00 + 1.0).sqrt()) / p00;
            let y_edge = (depth + radius * (p11 * p11 + 1.0).sqrt()) / p11;
            for sign in [-1.0f32, 1.0] {
                models.push(model(Vec3::new(sign * (x_edge + 0.5), 0.0, -depth), radius));
                models.push(model(Vec3::new(0.0, sign * (y_edge + 0.5), -depth), radius));
            }
        }
    }
    assert!(cull(&models, NO_DISTANCE).iter().all(|&count| count == 0));
}

#[test]
fn test_spheres_well_inside_are_always_visible() {
    let p = projection();
    let (p00, p11) = (p.x_axis.x, p.y_axis.y);
    let mut models = Vec::new();
    for depth in [5.0f32, 20.0, 75.0, 300.0, 900.0] {
        for radius in [0.1f32, 1.0, 3.0] {
            let x_inner = (depth - radius * (p00 * p00 + 1.0).sqrt()) / p00;
            let y_inner = (depth - radius * (p11 * p11 + 1.0).sqrt()) / p11;
            for t in [-0.9f32, -0.3, 0.0, 0.5, 0.9] {
                models.push(model(Vec3::new(t * x_inner, t * y_inner, -depth), radius));
            }
        }
    }
    assert!(cull(&models, NO_DISTANCE).iter().all(|&count| count == 1));
}
