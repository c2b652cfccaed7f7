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

//! Background fill after the geometry pass.

use super::shaders::BACKGROUND_WGSL;
use super::{create_module, DEPTH_FORMAT};
use solve_core::lane::{Lane, LaneError, LaneKind};
use solve_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BufferDescriptor, BufferId, BufferUsage, ColorTargetState,
    CommandEncoder, CompareFunction, DepthStencilState, GraphicsDevice, LoadOp,
    PipelineLayoutDescriptor, RenderPassColorAttachment, RenderPassDepthAttachment,
    RenderPassDescriptor, RenderPipelineDescriptor, RenderPipelineId, ShaderStageFlags,
    TextureFormat, TextureViewId,
};
use std::borrow::Cow;

/// Paints the clear color wherever the depth buffer still holds the far
/// value, with a full-screen triangle on the far plane tested for equality.
#[derive(Debug)]
pub struct BackgroundLane {
    color_format: TextureFormat,
    color: [f32; 4],
    uniform: Option<BufferId>,
    bind_group: Option<BindGroupId>,
    pipeline: Option<RenderPipelineId>,
}

impl BackgroundLane {
    /// Creates a lane filling with `color`.
    pub fn new(color_format: TextureFormat, color: [f32; 4]) -> Self {
        Self {
            color_format,
            color,
            uniform: None,
            bind_group: None,
            pipeline: None,
        }
    }

    /// The fill color.
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Records the fill over the geometry pass output.
    pub fn record(
        &self,
        encoder: &mut dyn CommandEncoder,
        color: TextureViewId,
        depth: TextureViewId,
    ) -> Result<(), LaneError> {
        let (Some(bind_group), Some(pipeline)) = (self.bind_group, self.pipeline) else {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        };
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Background"),
            color_attachments: &[RenderPassColorAttachment {
                view: color,
                load: LoadOp::Load,
                store: true,
            }],
            depth_attachment: Some(RenderPassDepthAttachment {
                view: depth,
                load: LoadOp::Load,
                store: true,
            }),
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group);
        pass.draw(0..3, 0..1);
        Ok(())
    }
}

impl Lane for BackgroundLane {
    fn strategy_name(&self) -> &'static str {
        "Background"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::PostProcess
    }

    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        log::info!("BackgroundLane: Initializing GPU resources...");

        let module = create_module(device, "background", BACKGROUND_WGSL)?;
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("background_layout"),
            entries: &[BindGroupLayoutEntry::uniform(0, ShaderStageFlags::FRAGMENT)],
        })?;
        let uniform = device.create_buffer_with_data(
            &BufferDescriptor::new("Background Color", 16, BufferUsage::UNIFORM),
            bytemuck::bytes_of(&self.color),
        )?;
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("background"),
            layout,
            entries: &[BindGroupEntry::buffer(0, uniform)],
        })?;
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("background_pipeline_layout"),
            bind_group_layouts: &[layout],
        })?;
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(Cow::Borrowed("background")),
            layout: Some(pipeline_layout),
            vertex_shader_module: module,
            vertex_entry_point: Cow::Borrowed("vs_fullscreen"),
            fragment_shader_module: Some(module),
            fragment_entry_point: Some(Cow::Borrowed("fs_background")),
            color_targets: vec![ColorTargetState {
                format: self.color_format,
                blend: None,
            }],
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: CompareFunction::Equal,
                depth_bias: 0,
                depth_bias_slope_scale: 0.0,
            }),
            cull_mode: None,
        })?;

        self.uniform = Some(uniform);
        self.bind_group = Some(bind_group);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        if let Some(bind_group) = self.bind_group.take() {
            let _ = device.destroy_bind_group(bind_group);
        }
        if let Some(uniform) = self.uniform.take() {
            let _ = device.destroy_buffer(uniform);
        }
        self.pipeline = None;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
