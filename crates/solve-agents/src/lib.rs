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

//! # Solve Agents
//!
//! The orchestration layer above the lanes.
//!
//! - [`batch`]: the batch/indirect-buffer manager. Merges scene geometry into
//!   shared buffers and maintains one indirect buffer per render pass bucket.
//! - [`render_agent`]: the frame orchestrator. Sequences culling, raster,
//!   clustering and depth reduction per frame with two frames in flight.

pub mod batch;
pub mod error;
pub mod render_agent;

pub use batch::{PassType, SceneBatches};
pub use error::{BatchError, FrameError};
pub use render_agent::{BucketStats, FrameInputs, FrameOrchestrator, FramePhase, FrameStats};
