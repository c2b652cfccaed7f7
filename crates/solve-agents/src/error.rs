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

//! Error types of the orchestration layer.

use solve_core::lane::LaneError;
use solve_core::renderer::{RenderError, ResourceError, SurfaceError};
use std::time::Duration;
use thiserror::Error;

/// Failures of the batch manager.
#[derive(Debug, Error)]
pub enum BatchError {
    /// `merge` was called with no registered geometry.
    #[error("cannot merge an empty scene")]
    EmptyScene,
    /// `merge` was called after the indirect buffers were uploaded.
    #[error("scene geometry is already merged and in use by the culler")]
    AlreadyMerged,
    /// An operation needing merged geometry ran before `merge`.
    #[error("scene geometry has not been merged")]
    NotMerged,
    /// An operation needing device buckets ran before `upload`.
    #[error("scene buckets have not been uploaded")]
    NotUploaded,
    /// A pass refresh worker did not report back.
    #[error("pass refresh for {0} did not complete")]
    RefreshFailed(&'static str),
    /// Creating, copying or reading a device resource failed.
    #[error("batch resource error: {0}")]
    Resource(#[from] ResourceError),
    /// Waiting on an immediate submission failed.
    #[error("batch submission failed: {0}")]
    Device(#[from] RenderError),
}

/// Failures of a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A lane failed to initialize.
    #[error("lane '{lane}' failed to initialize: {source}")]
    Initialization {
        /// The lane's strategy name.
        lane: &'static str,
        /// The underlying failure.
        #[source]
        source: LaneError,
    },
    /// A lane failed while recording.
    #[error("lane error: {0}")]
    Lane(#[from] LaneError),
    /// Scene loading or a bucket operation failed.
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),
    /// A frame slot's previous submission did not retire in time.
    #[error("device timed out after {waited:?}")]
    DeviceTimeout {
        /// How long the host waited.
        waited: Duration,
    },
    /// The surface could not be acquired, even after reconfiguring it.
    #[error("surface error: {0}")]
    Surface(SurfaceError),
    /// A device operation failed.
    #[error("device error: {0}")]
    Device(RenderError),
    /// Creating a device resource failed.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
}

impl FrameError {
    /// Whether the renderer cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FrameError::Initialization { .. }
                | FrameError::DeviceTimeout { .. }
                | FrameError::Device(RenderError::DeviceLost)
        )
    }
}

impl From<RenderError> for FrameError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::DeviceTimeout { waited } => FrameError::DeviceTimeout { waited },
            other => FrameError::Device(other),
        }
    }
}
