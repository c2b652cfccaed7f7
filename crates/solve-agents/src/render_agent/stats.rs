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

//! Per-frame counters exposed to the frame driver.

use crate::batch::PassType;
use std::fmt;

/// Draws submitted to one bucket during a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    /// Indirect records submitted.
    pub draw_calls: u32,
    /// Triangles of the submitted records. Culled records are included.
    pub triangles: u64,
}

/// Timings and counters of the last rendered frame.
///
/// Timings are host-side, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Whole `render_frame` call.
    pub frametime: f32,
    /// Triangles submitted by the geometry pass.
    pub triangle_count: u64,
    /// Records submitted by the geometry pass.
    pub drawcall_count: u32,
    /// Records submitted by the shadow pass, over all cascades.
    pub shadow_drawcall_count: u32,
    /// Uniform and light uploads.
    pub scene_update_time: f32,
    /// Recording of the cull, depth and geometry work.
    pub mesh_draw_time: f32,
    /// Recording of the shadow pass.
    pub shadow_pass_time: f32,
    /// Wait on the slot's previous submission.
    pub update_time: f32,
    /// Per-bucket counters, indexed by [`PassType::index`].
    pub buckets: [BucketStats; 4],
}

impl FrameStats {
    /// Counters of one bucket.
    pub fn bucket(&self, pass: PassType) -> BucketStats {
        self.buckets[pass.index()]
    }

    pub(super) fn bucket_mut(&mut self, pass: PassType) -> &mut BucketStats {
        &mut self.buckets[pass.index()]
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {:.2} ms (wait {:.2}, update {:.2}, draw {:.2}, shadow {:.2}) | {} draws, {} tris, {} shadow draws",
            self.frametime,
            self.update_time,
            self.scene_update_time,
            self.mesh_draw_time,
            self.shadow_pass_time,
            self.drawcall_count,
            self.triangle_count,
            self.shadow_drawcall_count
        )
    }
}
