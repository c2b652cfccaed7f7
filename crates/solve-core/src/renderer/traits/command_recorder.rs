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

use crate::renderer::api::*;
use std::any::Any;
use std::ops::Range;

/// An open compute pass.
///
/// Obtained from [`CommandEncoder::begin_compute_pass`]; the pass ends when
/// the box is dropped.
pub trait ComputePass<'pass> {
    /// Sets the pipeline used by following dispatches.
    fn set_pipeline(&mut self, pipeline: ComputePipelineId);

    /// Binds a bind group to a slot.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId);

    /// Records a dispatch of `x * y * z` workgroups.
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);
}

/// An open render pass.
pub trait RenderPass<'pass> {
    /// Sets the pipeline used by following draws.
    fn set_pipeline(&mut self, pipeline: RenderPipelineId);

    /// Binds a bind group to a slot.
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupId);

    /// Binds the index buffer.
    fn set_index_buffer(&mut self, buffer: BufferId, offset: u64, format: IndexFormat);

    /// Records a non-indexed draw.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Records an indexed draw.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    /// Records `count` indexed draws whose arguments are read from
    /// `indirect_buffer` at `indirect_offset`, packed as consecutive
    /// [`DrawIndexedIndirect`](crate::renderer::gpu_types::DrawIndexedIndirect)
    /// records.
    fn multi_draw_indexed_indirect(
        &mut self,
        indirect_buffer: BufferId,
        indirect_offset: u64,
        count: u32,
    );
}

/// Records a sequence of GPU commands into a command buffer.
///
/// Passes borrow the encoder mutably, so only one pass is open at a time.
pub trait CommandEncoder {
    /// Opens a render pass.
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder>;

    /// Opens a compute pass.
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder>;

    /// Records a batch of memory dependencies. Must be called outside of any pass.
    fn pipeline_barrier(&mut self, barriers: &[Barrier]);

    /// Records a buffer to buffer copy.
    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    );

    /// Finishes recording. The returned handle is submitted through the device.
    fn finish(self: Box<Self>) -> CommandBufferId;

    /// Returns the encoder as `Any` for backend-specific access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
