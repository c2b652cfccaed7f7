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

//! # Solve Lanes
//!
//! The GPU stages of a frame. Each lane owns its shaders and pipelines and
//! records into an encoder supplied by the orchestrator:
//!
//! - [`render_lane::DepthPyramidLane`]: min-reduction of last frame's depth.
//! - [`render_lane::VisibilityCullLane`]: per-instance frustum, distance and
//!   occlusion tests writing indirect draw arguments.
//! - [`render_lane::ClusterLane`]: cluster bounds and point-light binning.
//! - The raster lanes consuming the indirect buffers.
//!
//! [`cpu`] mirrors every compute shader on the host.

pub mod cpu;
pub mod render_lane;

pub use render_lane::*;
