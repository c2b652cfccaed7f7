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

use crate::math::{Mat4, Vec3};

/// Default vertical field of view, in degrees.
pub const DEFAULT_FOV_Y_DEGREES: f32 = 60.0;
/// Default near plane distance.
pub const DEFAULT_NEAR: f32 = 1.0;
/// Default far plane distance. Used as draw distance and cluster slicing range.
pub const DEFAULT_FAR: f32 = 1000.0;

/// A snapshot of the main camera.
///
/// The projection is an infinite reverse-Z perspective: depth 1 lies on the
/// near plane and depth 0 at infinity. `far` only bounds the draw distance
/// and the cluster slicing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// World to view transform. View space is right-handed, looking down `-Z`.
    pub view: Mat4,
    /// View to clip transform.
    pub projection: Mat4,
    /// World-space eye position.
    pub position: Vec3,
    /// Vertical field of view, in radians.
    pub fov_y: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far distance.
    pub far: f32,
    /// Whether the camera moved since the previous frame.
    pub updated: bool,
}

impl CameraState {
    /// A camera at `eye` looking at `target` with the default lens.
    pub fn look_at(eye: Vec3, target: Vec3, aspect: f32) -> Self {
        let fov_y = DEFAULT_FOV_Y_DEGREES.to_radians();
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_infinite_reverse_rh(fov_y, aspect, DEFAULT_NEAR),
            position: eye,
            fov_y,
            aspect,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            updated: true,
        }
    }

    /// Rebuilds the projection for a new aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection = Mat4::perspective_infinite_reverse_rh(self.fov_y, aspect, self.near);
        self.updated = true;
    }

    /// Moves the eye, keeping the look target.
    pub fn move_to(&mut self, eye: Vec3, target: Vec3) {
        self.view = Mat4::look_at_rh(eye, target, Vec3::Y);
        self.position = eye;
        self.updated = true;
    }

    /// World to clip transform.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// The four world-space corners of the view frustum cross-section at
    /// view depth `depth`.
    pub fn frustum_corners_at(&self, depth: f32) -> [Vec3; 4] {
        let half_h = depth * (self.fov_y * 0.5).tan();
        let half_w = half_h * self.aspect;
        let inv_view = self.view.inverse();
        [
            (-half_w, half_h),
            (half_w, half_h),
            (half_w, -half_h),
            (-half_w, -half_h),
        ]
        .map(|(x, y)| inv_view.transform_point3(Vec3::new(x, y, -depth)))
    }
}
