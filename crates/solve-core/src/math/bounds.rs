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

//! Bounding volumes used for culling and light binning.

use super::{Mat4, Vec3};

/// An Axis-Aligned Bounding Box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// The corner of the box with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner of the box with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Aabb {
    /// Creates a new `Aabb` from two corner points, in any order.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a new `Aabb` from a center point and its half-extents.
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Squared distance from `point` to the closest point of the box.
    /// Zero when the point is inside.
    #[inline]
    pub fn squared_distance_to_point(&self, point: Vec3) -> f32 {
        let clamped = point.clamp(self.min, self.max);
        (point - clamped).length_squared()
    }

    /// Sphere-versus-box overlap test. Touching counts as overlapping.
    #[inline]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.squared_distance_to_point(center) <= radius * radius
    }

    /// Returns `true` if `point` lies inside or on the box.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// The bounds recorded for every drawable surface: a box and its enclosing
/// sphere, both in the surface's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Center of both the box and the sphere.
    pub origin: Vec3,
    /// Radius of the bounding sphere.
    pub sphere_radius: f32,
    /// Half-extents of the bounding box.
    pub extents: Vec3,
}

impl Bounds {
    /// Builds bounds from a local-space box; the sphere encloses the box.
    pub fn from_aabb(aabb: Aabb) -> Self {
        let extents = (aabb.max - aabb.min) * 0.5;
        Self {
            origin: (aabb.max + aabb.min) * 0.5,
            sphere_radius: extents.length(),
            extents,
        }
    }

    /// Builds bounds from a sphere; the box is the sphere's cube.
    pub fn from_sphere(origin: Vec3, radius: f32) -> Self {
        Self {
            origin,
            sphere_radius: radius,
            extents: Vec3::splat(radius),
        }
    }

    /// Transforms the bounding sphere to world space.
    ///
    /// The radius is scaled by the largest axis scale of `transform`, so the
    /// result still encloses the surface under non-uniform scale.
    pub fn world_sphere(&self, transform: &Mat4) -> (Vec3, f32) {
        let center = transform.transform_point3(self.origin);
        let max_scale = transform
            .x_axis
            .truncate()
            .length()
            .max(transform.y_axis.truncate().length())
            .max(transform.z_axis.truncate().length());
        (center, self.sphere_radius * max_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_box_overlap() {
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.intersects_sphere(Vec3::ZERO, 0.1));
        assert!(aabb.intersects_sphere(Vec3::new(2.0, 0.0, 0.0), 1.0));
        assert!(!aabb.intersects_sphere(Vec3::new(2.0, 2.0, 0.0), 1.0));
    }

    #[test]
    fn test_from_min_max_orders_corners() {
        let aabb = Aabb::from_min_max(Vec3::new(1.0, -1.0, 3.0), Vec3::new(-1.0, 1.0, 2.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, 2.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 3.0));
        assert!(aabb.contains_point(Vec3::new(0.0, 0.0, 2.5)));
    }

    #[test]
    fn test_world_sphere_scales_radius() {
        let bounds = Bounds::from_sphere(Vec3::ZERO, 1.0);
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 3.0, 2.0),
            glam::Quat::IDENTITY,
            Vec3::new(5.0, 0.0, 0.0),
        );
        let (center, radius) = bounds.world_sphere(&transform);
        assert_eq!(center, Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(radius, 3.0);
    }

    #[test]
    fn test_bounds_from_aabb_encloses_box() {
        let bounds = Bounds::from_aabb(Aabb::from_min_max(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)));
        assert_eq!(bounds.origin, Vec3::ONE);
        assert_relative_eq!(bounds.sphere_radius, 3.0f32.sqrt());
    }
}
