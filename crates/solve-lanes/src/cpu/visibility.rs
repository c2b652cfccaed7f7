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

//! Instance visibility, as computed by `draw_cull.wgsl`.

use super::pyramid::DepthImage;
use solve_core::math::{Aabb, Mat4, Vec3, Vec4, Vec4Swizzles};
use solve_core::renderer::gpu_types::{
    DrawCullData, DrawIndexedIndirect, GpuModelInformation, PassObject,
};

/// Screen-space bounds of a projected sphere, in pyramid UV space:
/// `(u_min, v_min, u_max, v_max)`, `v` growing downwards.
pub type UvRect = Vec4;

/// Projects a view-space sphere with a symmetric perspective projection.
///
/// Returns `None` when the sphere crosses the near plane, in which case no
/// occlusion decision can be made.
pub fn project_sphere(center: Vec3, radius: f32, znear: f32, p00: f32, p11: f32) -> Option<UvRect> {
    let depth = -center.z;
    if depth < radius + znear {
        return None;
    }

    let extent = |c: f32| {
        let (cx, cz) = (c, depth);
        let t = (cx * cx + cz * cz - radius * radius).sqrt();
        let lo = (t * cx - radius * cz) / (radius * cx + t * cz);
        let hi = (t * cx + radius * cz) / (-radius * cx + t * cz);
        (lo, hi)
    };
    let (min_x, max_x) = extent(center.x);
    let (min_y, max_y) = extent(center.y);

    Some(Vec4::new(
        min_x * p00 * 0.5 + 0.5,
        -max_y * p11 * 0.5 + 0.5,
        max_x * p00 * 0.5 + 0.5,
        -min_y * p11 * 0.5 + 0.5,
    ))
}

/// Minimum occluder depth of the 2x2 texels around `uv` at `level`.
fn sample_pyramid(pyramid: &[DepthImage], level: usize, uv: (f32, f32)) -> f32 {
    let image = &pyramid[level];
    let x = (uv.0 * image.width() as f32 - 0.5).floor() as i64;
    let y = (uv.1 * image.height() as f32 - 0.5).floor() as i64;
    image
        .load(x, y)
        .min(image.load(x + 1, y))
        .min(image.load(x, y + 1))
        .min(image.load(x + 1, y + 1))
}

/// Decides whether one instance is visible.
///
/// Tests run in this order, each one only narrowing the result: the
/// world-space box override (which replaces the frustum and distance tests),
/// or the side planes, the near plane and the draw distance; then the
/// occlusion test against `pyramid` when enabled and a non-empty pyramid is
/// given. Only an occluder strictly nearer than the sphere hides it.
pub fn is_visible(
    data: &DrawCullData,
    model: &GpuModelInformation,
    pyramid: Option<&[DepthImage]>,
) -> bool {
    if data.culling_enabled == 0 {
        return true;
    }

    let (world_center, radius) = model.sphere();

    if data.aabb_check != 0 {
        let aabb = Aabb::from_min_max(data.aabb_min.into(), data.aabb_max.into());
        return aabb.intersects_sphere(world_center, radius);
    }

    let view = Mat4::from_cols_array_2d(&data.view);
    let center = (view * world_center.extend(1.0)).xyz();
    let f = data.frustum;

    let mut visible = center.z * f[1] - center.x.abs() * f[0] >= -radius;
    visible = visible && center.z * f[3] - center.y.abs() * f[2] >= -radius;
    visible = visible && -center.z + radius > data.znear;

    if data.distance_check != 0 {
        visible = visible && center.length() <= data.zfar;
    }

    if visible && data.occlusion_enabled != 0 {
        if let Some(pyramid) = pyramid.filter(|levels| !levels.is_empty()) {
            if let Some(rect) = project_sphere(center, radius, data.znear, data.p00, data.p11) {
                let width = (rect.z - rect.x) * data.pyramid_width;
                let height = (rect.w - rect.y) * data.pyramid_height;
                let level = width.max(height).max(1.0).log2().floor() as usize;
                let level = level.min(pyramid.len().saturating_sub(1));
                let uv = ((rect.x + rect.z) * 0.5, (rect.y + rect.w) * 0.5);
                let occluder = sample_pyramid(pyramid, level, uv);
                let sphere_depth = data.znear / (-center.z - radius);
                visible = sphere_depth >= occluder;
            }
        }
    }

    visible
}

/// Culls a whole bucket: writes `instance_count` of every command.
///
/// Records past `data.draw_count` are left untouched.
pub fn cull_bucket(
    data: &DrawCullData,
    models: &[GpuModelInformation],
    objects: &[PassObject],
    commands: &mut [DrawIndexedIndirect],
    pyramid: Option<&[DepthImage]>,
) {
    let count = (data.draw_count as usize).min(objects.len()).min(commands.len());
    for (object, command) in objects.iter().zip(commands.iter_mut()).take(count) {
        let Some(model) = models.get(object.model_index as usize) else {
            command.instance_count = 0;
            continue;
        };
        command.instance_count = is_visible(data, model, pyramid) as u32;
    }
}
