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

use solve_core::renderer::{SubmissionIndex, TransientPool};
use solve_core::scene::{CameraState, DirectionalLight, PointLight, ShadowCascades};
use std::fmt;

/// One recorded step of a frame, in device timeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// Frustum, distance and occlusion cull of the early-depth bucket.
    EarlyDepthCull,
    /// Box cull of the shadow bucket.
    ShadowCull,
    /// The single barrier between every cull and the indirect draws.
    CullBarrier,
    /// Copy of one indirect buffer into a host-visible staging buffer.
    DebugReadback,
    /// Depth-only draw of the opaque records.
    EarlyDepthPass,
    /// Shadow bucket draw into every cascade.
    ShadowPass,
    /// Rebuild of the cluster bounds.
    ClusterBuild,
    /// Binning of the point lights into clusters.
    LightCull,
    /// Copy of the light counters for the host.
    CounterReadback,
    /// Lit draw of the forward and transparent records.
    GeometryPass,
    /// Background fill.
    PostProcess,
    /// Min-reduction of this frame's depth for the next frame's cull.
    DepthPyramidReduce,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the external collaborators hand over each frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    /// The main camera.
    pub camera: &'a CameraState,
    /// Point lights binned into the clusters.
    pub point_lights: &'a [PointLight],
    /// The sun, if the scene has one.
    pub sun: Option<&'a DirectionalLight>,
    /// Light-space cascade transforms.
    pub cascades: &'a ShadowCascades,
}

/// A frame-in-flight slot.
#[derive(Debug, Default)]
pub(super) struct FrameData {
    // Resources created while recording the slot's last frame.
    pub pool: TransientPool,
    // The slot's last submission, waited on before the slot is reused.
    pub submission: Option<SubmissionIndex>,
}
