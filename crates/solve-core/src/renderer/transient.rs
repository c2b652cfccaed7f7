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

//! Per-frame transient resources.

use crate::renderer::api::{BindGroupId, BufferId};
use crate::renderer::traits::GraphicsDevice;

/// Resources whose lifetime is pinned to one frame-in-flight slot.
///
/// Lanes push the uniform buffers and bind groups they create while recording
/// a frame; the owner releases everything at once when the slot comes back
/// around and its fence has signaled.
#[derive(Debug, Default)]
pub struct TransientPool {
    buffers: Vec<BufferId>,
    bind_groups: Vec<BindGroupId>,
}

impl TransientPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a buffer.
    pub fn push_buffer(&mut self, buffer: BufferId) -> BufferId {
        self.buffers.push(buffer);
        buffer
    }

    /// Tracks a bind group.
    pub fn push_bind_group(&mut self, bind_group: BindGroupId) -> BindGroupId {
        self.bind_groups.push(bind_group);
        bind_group
    }

    /// Number of tracked resources.
    pub fn len(&self) -> usize {
        self.buffers.len() + self.bind_groups.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroys every tracked resource. Bind groups go first since they
    /// reference the buffers.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        for bind_group in self.bind_groups.drain(..) {
            if let Err(e) = device.destroy_bind_group(bind_group) {
                log::warn!("TransientPool: failed to destroy {bind_group:?}: {e}");
            }
        }
        for buffer in self.buffers.drain(..) {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("TransientPool: failed to destroy {buffer:?}: {e}");
            }
        }
    }
}
