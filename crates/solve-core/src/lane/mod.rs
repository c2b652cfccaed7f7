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

//! # Lane Abstraction
//!
//! A **Lane** is one GPU stage of the frame: it owns its pipelines, bind group
//! layouts and persistent buffers, and records its work into a command
//! encoder handed to it by the orchestrator.
//!
//! Every lane implements [`Lane`] for identity and lifecycle, plus a typed
//! `record` method taking exactly the inputs that stage consumes. Lanes never
//! submit work themselves.

use crate::renderer::error::ResourceError;
use crate::renderer::traits::GraphicsDevice;
use std::any::Any;
use std::fmt;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// `record` was called before `on_initialize`.
    NotInitialized {
        /// The lane's strategy name.
        lane: &'static str,
    },
    /// Creating or updating a device resource failed.
    Resource(ResourceError),
    /// The inputs handed to the lane are inconsistent.
    InvalidInput(String),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::NotInitialized { lane } => write!(f, "Lane '{lane}' not initialized"),
            LaneError::Resource(e) => write!(f, "Lane resource error: {e}"),
            LaneError::InvalidInput(msg) => write!(f, "Invalid lane input: {msg}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::Resource(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ResourceError> for LaneError {
    fn from(err: ResourceError) -> Self {
        LaneError::Resource(err)
    }
}

/// Classification of lanes, used for logging and lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Visibility culling compute.
    Cull,
    /// Hierarchical depth reduction.
    DepthPyramid,
    /// Cluster bounds and light binning.
    Lighting,
    /// Depth pre-pass and main geometry rasterization.
    Raster,
    /// Shadow map rasterization.
    Shadow,
    /// Full-screen passes after the geometry pass.
    PostProcess,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Cull => write!(f, "Cull"),
            LaneKind::DepthPyramid => write!(f, "DepthPyramid"),
            LaneKind::Lighting => write!(f, "Lighting"),
            LaneKind::Raster => write!(f, "Raster"),
            LaneKind::Shadow => write!(f, "Shadow"),
            LaneKind::PostProcess => write!(f, "PostProcess"),
        }
    }
}

/// The base trait shared by every lane.
pub trait Lane: Send + Sync {
    /// A stable, human readable name.
    fn strategy_name(&self) -> &'static str;

    /// The lane's classification.
    fn lane_kind(&self) -> LaneKind;

    /// Creates shaders, layouts and pipelines. Called once before the first
    /// `record`.
    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError>;

    /// Releases every device resource the lane owns.
    fn on_shutdown(&mut self, _device: &dyn GraphicsDevice) {}

    /// Returns the lane as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_lane_error_display_and_source() {
        let err = LaneError::NotInitialized { lane: "DrawCull" };
        assert_eq!(err.to_string(), "Lane 'DrawCull' not initialized");
        assert!(err.source().is_none());

        let err: LaneError = ResourceError::NotFound.into();
        assert!(err.source().is_some());
    }

    #[test]
    fn test_lane_kind_display() {
        assert_eq!(LaneKind::DepthPyramid.to_string(), "DepthPyramid");
        assert_eq!(LaneKind::Cull.to_string(), "Cull");
    }
}
