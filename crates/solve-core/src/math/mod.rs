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

//! Mathematics primitives used by the renderer.
//!
//! Linear algebra comes from `glam`, re-exported here so that downstream crates
//! never depend on it directly. The renderer's own geometric types (bounding
//! boxes and spheres) live in [`bounds`].
//!
//! Conventions: right-handed view space with the camera looking down `-Z`,
//! reverse-Z depth (`1` at the near plane, `0` at the far plane), and all angles
//! in **radians** unless a name says otherwise.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

/// The factor to convert degrees to radians (PI / 180.0).
pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

pub mod bounds;

pub use glam::{Mat3, Mat4, Quat, UVec2, UVec3, Vec2, Vec3, Vec4, Vec4Swizzles};

pub use self::bounds::{Aabb, Bounds};

/// Returns the largest power of two less than or equal to `value`.
///
/// `0` maps to `1` so the result is always a valid texture dimension.
#[inline]
pub fn previous_pow2(value: u32) -> u32 {
    if value == 0 {
        1
    } else {
        1 << (31 - value.leading_zeros())
    }
}

/// Returns the number of mip levels of a full chain for the given extent:
/// `floor(log2(max(width, height))) + 1`.
#[inline]
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}
