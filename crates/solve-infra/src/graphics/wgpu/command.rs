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

use std::any::Any;
use std::ops::Range;
use std::sync::Arc;

use solve_core::renderer::api::{
    Barrier, BindGroupId, BufferId, CommandBufferId, ComputePassDescriptor, ComputePipelineId,
    IndexFormat, RenderPassDescriptor, RenderPipelineId,
};
use solve_core::renderer::traits::{CommandEncoder, ComputePass, RenderPass};

use super::conversions::{tracked_by_wgpu, IntoWgpu};
use super::device::WgpuDevice;

pub struct WgpuRenderPass<'a> {
    pub(crate) pass: wgpu::RenderPass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl<'pass> RenderPass<'pass> for WgpuRenderPass<'pass> {
    fn set_pipeline(&mut self, pipeline_id: RenderPipelineId) {
        if let Some(pipeline) = self.device.get_wgpu_render_pipeline(pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!("WgpuRenderPass: RenderPipelineId {pipeline_id:?} not found.");
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group_id: BindGroupId) {
        if let Some(bind_group) = self.device.get_wgpu_bind_group(bind_group_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuRenderPass: BindGroupId {bind_group_id:?} not found.");
        }
    }

    fn set_index_buffer(&mut self, buffer_id: BufferId, offset: u64, format: IndexFormat) {
        if let Some(buffer) = self.device.get_wgpu_buffer(buffer_id) {
            self.pass
                .set_index_buffer(buffer.slice(offset..), format.into_wgpu());
        } else {
            log::warn!("WgpuRenderPass: Index BufferId {buffer_id:?} not found.");
        }
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }

    fn multi_draw_indexed_indirect(
        &mut self,
        indirect_buffer: BufferId,
        indirect_offset: u64,
        count: u32,
    ) {
        if count == 0 {
            return;
        }
        if let Some(buffer) = self.device.get_wgpu_buffer(indirect_buffer) {
            self.pass
                .multi_draw_indexed_indirect(&buffer, indirect_offset, count);
        } else {
            log::warn!("WgpuRenderPass: Indirect BufferId {indirect_buffer:?} not found.");
        }
    }
}

pub struct WgpuComputePass<'a> {
    pub(crate) pass: wgpu::ComputePass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl<'pass> ComputePass<'pass> for WgpuComputePass<'pass> {
    fn set_pipeline(&mut self, pipeline_id: ComputePipelineId) {
        if let Some(pipeline) = self.device.get_wgpu_compute_pipeline(pipeline_id) {
            self.pass.set_pipeline(&pipeline);
        } else {
            log::warn!("WgpuComputePass: ComputePipelineId {pipeline_id:?} not found.");
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group_id: BindGroupId) {
        if let Some(bind_group) = self.device.get_wgpu_bind_group(bind_group_id) {
            self.pass.set_bind_group(index, bind_group.as_ref(), &[]);
        } else {
            log::warn!("WgpuComputePass: BindGroupId {bind_group_id:?} not found.");
        }
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.pass.dispatch_workgroups(x, y, z);
    }
}

pub struct WgpuCommandEncoder {
    pub(crate) encoder: wgpu::CommandEncoder,
    pub(crate) device: WgpuDevice,
}

impl WgpuCommandEncoder {
    /// Access to the raw encoder for backend-specific commands.
    pub fn wgpu_encoder_mut(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder> {
        // Resolve views up front so the wgpu descriptor can borrow them.
        let color_views: Vec<(Arc<wgpu::TextureView>, wgpu::Operations<wgpu::Color>)> = descriptor
            .color_attachments
            .iter()
            .filter_map(|att| match self.device.get_wgpu_texture_view(att.view) {
                Some(view) => Some((
                    view,
                    wgpu::Operations {
                        load: att.load.into_wgpu(),
                        store: att.store.into_wgpu(),
                    },
                )),
                None => {
                    log::warn!(
                        "WgpuCommandEncoder: color attachment view {:?} not found, skipping.",
                        att.view
                    );
                    None
                }
            })
            .collect();

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|(view, ops)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: *ops,
                })
            })
            .collect();

        let depth = descriptor.depth_attachment.and_then(|ds| {
            self.device
                .get_wgpu_texture_view(ds.view)
                .map(|view| (view, ds))
        });
        let depth_stencil_attachment =
            depth
                .as_ref()
                .map(|(view, ds)| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: ds.load.into_wgpu(),
                        store: ds.store.into_wgpu(),
                    }),
                    stencil_ops: None,
                });

        let pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: descriptor.label,
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Box::new(WgpuRenderPass {
            pass,
            device: &self.device,
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        let pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: descriptor.label,
            timestamp_writes: None,
        });

        Box::new(WgpuComputePass {
            pass,
            device: &self.device,
        })
    }

    fn pipeline_barrier(&mut self, barriers: &[Barrier]) {
        // wgpu inserts the hardware barriers itself at pass boundaries. Only
        // the handles are checked here so a stale id shows up in the logs.
        for barrier in barriers {
            match *barrier {
                Barrier::Buffer { buffer, src, dst } => {
                    if self.device.get_wgpu_buffer(buffer).is_none() {
                        log::warn!("WgpuCommandEncoder: barrier on unknown buffer {buffer:?}");
                    }
                    if !tracked_by_wgpu(dst) {
                        log::trace!("WgpuCommandEncoder: {buffer:?} {src:?} -> {dst:?} resolved at map time");
                    }
                }
                Barrier::Texture {
                    texture,
                    base_mip_level,
                    mip_level_count,
                    src,
                    dst,
                } => {
                    if self.device.get_wgpu_texture(texture).is_none() {
                        log::warn!("WgpuCommandEncoder: barrier on unknown texture {texture:?}");
                    }
                    log::trace!(
                        "WgpuCommandEncoder: {texture:?} mips {base_mip_level}..{} {src:?} -> {dst:?}",
                        base_mip_level + mip_level_count
                    );
                }
            }
        }
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        if let (Some(source_buffer), Some(destination_buffer)) = (
            self.device.get_wgpu_buffer(source),
            self.device.get_wgpu_buffer(destination),
        ) {
            self.encoder.copy_buffer_to_buffer(
                &source_buffer,
                source_offset,
                &destination_buffer,
                destination_offset,
                size,
            );
        } else {
            log::warn!(
                "WgpuCommandEncoder: copy between unknown buffers {source:?} -> {destination:?}"
            );
        }
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let Self { encoder, device } = *self;
        device.register_command_buffer(encoder.finish())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
