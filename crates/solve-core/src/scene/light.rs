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

use super::camera::CameraState;
use crate::math::{Mat4, Vec3};
use crate::renderer::config::SHADOW_CASCADE_COUNT;
use crate::renderer::gpu_types::{GpuDirectionalLight, GpuPointLight};

/// A point light with a finite radius of influence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    /// Linear color.
    pub color: Vec3,
    /// Radius of influence; the light is ignored beyond it.
    pub range: f32,
    /// Intensity multiplier.
    pub intensity: f32,
    /// Disabled lights are never binned.
    pub enabled: bool,
}

impl PointLight {
    /// An enabled light.
    pub fn new(position: Vec3, color: Vec3, range: f32, intensity: f32) -> Self {
        Self {
            position,
            color,
            range,
            intensity,
            enabled: true,
        }
    }

    /// The device layout of this light.
    pub fn to_gpu(&self) -> GpuPointLight {
        GpuPointLight {
            position: self.position.extend(1.0).to_array(),
            color: self.color.extend(1.0).to_array(),
            enabled: self.enabled as u32,
            range: self.range,
            intensity: self.intensity,
            _pad: 0.0,
        }
    }
}

/// The sun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels.
    pub direction: Vec3,
    /// Linear color.
    pub color: Vec3,
    /// Intensity multiplier.
    pub intensity: f32,
}

impl DirectionalLight {
    /// The device layout of this light.
    pub fn to_gpu(&self) -> GpuDirectionalLight {
        GpuDirectionalLight {
            direction: self.direction.normalize_or_zero().extend(0.0).to_array(),
            color: self.color.extend(1.0).to_array(),
            intensity: self.intensity,
            _pad: [0.0; 3],
        }
    }
}

/// Light-space transforms of the shadow cascades.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCascades {
    /// World to light view, per cascade.
    pub views: [Mat4; SHADOW_CASCADE_COUNT],
    /// World to light clip, per cascade.
    pub view_projections: [Mat4; SHADOW_CASCADE_COUNT],
    /// Far view depth of each cascade.
    pub splits: [f32; SHADOW_CASCADE_COUNT],
}

impl Default for ShadowCascades {
    fn default() -> Self {
        Self {
            views: [Mat4::IDENTITY; SHADOW_CASCADE_COUNT],
            view_projections: [Mat4::IDENTITY; SHADOW_CASCADE_COUNT],
            splits: [0.0; SHADOW_CASCADE_COUNT],
        }
    }
}

impl ShadowCascades {
    /// Fits one orthographic cascade around each slice of the camera frustum.
    ///
    /// Split depths blend a logarithmic and a uniform distribution by
    /// `lambda` (0 is uniform, 1 logarithmic). Each cascade is the bounding
    /// sphere of its slice, seen along `sun_direction`.
    pub fn fit(camera: &CameraState, sun_direction: Vec3, lambda: f32) -> Self {
        let (near, far) = (camera.near, camera.far);
        let ratio = far / near;
        let light_dir = sun_direction.normalize_or(Vec3::NEG_Y);
        let up = if light_dir.abs().dot(Vec3::Y) > 0.99 {
            Vec3::Z
        } else {
            Vec3::Y
        };

        let mut cascades = Self::default();
        let mut last_split = near;
        for i in 0..SHADOW_CASCADE_COUNT {
            let p = (i + 1) as f32 / SHADOW_CASCADE_COUNT as f32;
            let log = near * ratio.powf(p);
            let uniform = near + (far - near) * p;
            let split = lambda * (log - uniform) + uniform;

            let corners = camera
                .frustum_corners_at(last_split)
                .into_iter()
                .chain(camera.frustum_corners_at(split));
            let points: Vec<Vec3> = corners.collect();
            let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
            let radius = points
                .iter()
                .map(|p| p.distance(center))
                .fold(0.0f32, f32::max);
            let radius = (radius * 16.0).ceil() / 16.0;

            let view = Mat4::look_at_rh(center - light_dir * radius, center, up);
            let projection =
                Mat4::orthographic_rh(-radius, radius, -radius, radius, 0.0, 2.0 * radius);

            cascades.views[i] = view;
            cascades.view_projections[i] = projection * view;
            cascades.splits[i] = split;
            last_split = split;
        }
        cascades
    }
}
