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

//! Built-in WGSL sources of the rendering core.
//!
//! WGSL has no include mechanism, so the cluster and mesh shaders are split
//! into a shared prelude (structs and `@group(0)` bindings) and a body; the
//! `*_source` functions splice them together.
//!
//! # Available Shaders
//!
//! - [`DEPTH_REDUCE_WGSL`] - Min-reduction of the depth buffer into the pyramid
//! - [`DRAW_CULL_WGSL`] - Per-instance visibility, writes `instance_count`
//! - [`cluster_build_source`] - View-space bounds of every cluster
//! - [`light_cull_source`] - Point light binning into clusters
//! - [`mesh_source`] - Depth pre-pass and clustered forward shading
//! - [`shadow_source`] - Shadow cascade depth
//! - [`BACKGROUND_WGSL`] - Far-plane fill

/// Depth pyramid reduction. Entry points `reduce_from_depth` (level 0) and
/// `reduce_from_mip` (every further level).
pub const DEPTH_REDUCE_WGSL: &str = include_str!("depth_reduce.wgsl");

/// Visibility culling, entry point `cs_main`, 256 invocations per group.
pub const DRAW_CULL_WGSL: &str = include_str!("draw_cull.wgsl");

/// Background fill, entry points `vs_fullscreen` and `fs_background`.
pub const BACKGROUND_WGSL: &str = include_str!("background.wgsl");

const CLUSTER_COMMON_WGSL: &str = include_str!("cluster_common.wgsl");
const CLUSTER_BUILD_WGSL: &str = include_str!("cluster_build.wgsl");
const LIGHT_CULL_WGSL: &str = include_str!("light_cull.wgsl");
const MESH_COMMON_WGSL: &str = include_str!("mesh_common.wgsl");
const MESH_WGSL: &str = include_str!("mesh.wgsl");
const SHADOW_WGSL: &str = include_str!("shadow.wgsl");

/// Cluster bounds, entry point `cs_build`.
pub fn cluster_build_source() -> String {
    [CLUSTER_COMMON_WGSL, CLUSTER_BUILD_WGSL].concat()
}

/// Light binning, entry point `cs_cull`.
pub fn light_cull_source() -> String {
    [CLUSTER_COMMON_WGSL, LIGHT_CULL_WGSL].concat()
}

/// Mesh shading, entry points `vs_depth`, `vs_main` and `fs_main`.
pub fn mesh_source() -> String {
    [MESH_COMMON_WGSL, MESH_WGSL].concat()
}

/// Shadow cascades, entry point `vs_shadow`.
pub fn shadow_source() -> String {
    [MESH_COMMON_WGSL, SHADOW_WGSL].concat()
}
