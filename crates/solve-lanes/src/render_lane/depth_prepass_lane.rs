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

//! Early depth pass.

use super::shaders::mesh_source;
use super::{
    create_module, create_scene_bind_group, scene_layout_entries, RasterInputs, DEPTH_FORMAT,
};
use solve_core::lane::{Lane, LaneError, LaneKind};
use solve_core::renderer::{
    BindGroupLayoutDescriptor, BindGroupLayoutId, CommandEncoder, CompareFunction,
    DepthStencilState, Face, GraphicsDevice, IndexFormat, LoadOp, PipelineLayoutDescriptor,
    RenderPassDepthAttachment, RenderPassDescriptor, RenderPipelineDescriptor, RenderPipelineId,
    TextureViewId, TransientPool,
};
use std::borrow::Cow;

/// Lays down opaque depth from the early-depth bucket's culled records.
///
/// Only the opaque prefix of the bucket is drawn. Transparent records are
/// culled with the rest of the bucket but never write depth, so they cannot
/// hide what is behind them.
#[derive(Debug, Default)]
pub struct DepthPrepassLane {
    scene_layout: Option<BindGroupLayoutId>,
    pipeline: Option<RenderPipelineId>,
}

impl DepthPrepassLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears `depth_view` to the far value and draws the first
    /// `opaque_count` records of the bucket in one multi-draw.
    ///
    /// Returns the number of records submitted.
    pub fn record(
        &self,
        device: &dyn GraphicsDevice,
        encoder: &mut dyn CommandEncoder,
        pool: &mut TransientPool,
        inputs: &RasterInputs<'_>,
        opaque_count: u32,
        depth_view: TextureViewId,
    ) -> Result<u32, LaneError> {
        let (Some(layout), Some(pipeline)) = (self.scene_layout, self.pipeline) else {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        };
        let count = opaque_count.min(inputs.bucket.draw_count);
        let bind_group = create_scene_bind_group(device, pool, layout, inputs, "depth_prepass")?;

        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Depth Prepass"),
            color_attachments: &[],
            depth_attachment: Some(RenderPassDepthAttachment {
                view: depth_view,
                load: LoadOp::Clear(0.0),
                store: true,
            }),
        });
        if count > 0 {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group);
            pass.set_index_buffer(inputs.geometry.index_buffer, 0, IndexFormat::Uint32);
            pass.multi_draw_indexed_indirect(inputs.bucket.indirect_buffer, 0, count);
        }
        Ok(count)
    }
}

impl Lane for DepthPrepassLane {
    fn strategy_name(&self) -> &'static str {
        "DepthPrepass"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Raster
    }

    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        log::info!("DepthPrepassLane: Initializing GPU resources...");

        let source = mesh_source();
        let module = create_module(device, "mesh_depth", &source)?;
        let scene_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("depth_prepass_scene_layout"),
            entries: &scene_layout_entries(),
        })?;
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("depth_prepass_pipeline_layout"),
            bind_group_layouts: &[scene_layout],
        })?;
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(Cow::Borrowed("depth_prepass")),
            layout: Some(pipeline_layout),
            vertex_shader_module: module,
            vertex_entry_point: Cow::Borrowed("vs_depth"),
            fragment_shader_module: None,
            fragment_entry_point: None,
            color_targets: Vec::new(),
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Greater,
                depth_bias: 0,
                depth_bias_slope_scale: 0.0,
            }),
            cull_mode: Some(Face::Back),
        })?;

        self.scene_layout = Some(scene_layout);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
