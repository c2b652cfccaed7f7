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

//! Cascaded shadow maps.
//!
//! The shadow bucket is culled once per frame against a world-space box
//! around the cascade-1 light view, then drawn into every cascade layer with
//! that layer's view-projection. The map uses standard depth (cleared to 1,
//! `Less`), unlike the reverse-Z camera passes.

use super::shaders::shadow_source;
use super::{
    create_module, create_scene_bind_group, scene_layout_entries, RasterInputs, DEPTH_FORMAT,
};
use solve_core::lane::{Lane, LaneError, LaneKind};
use solve_core::renderer::config::{SHADOW_CASCADE_COUNT, SHADOW_MAP_SIZE};
use solve_core::renderer::gpu_types::CascadeUniforms;
use solve_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupId, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindGroupLayoutId, BufferDescriptor, BufferId, BufferUsage,
    CommandEncoder, CompareFunction, DepthStencilState, Extent3D, GraphicsDevice, IndexFormat,
    LoadOp, PipelineLayoutDescriptor, RenderPassDepthAttachment, RenderPassDescriptor,
    RenderPipelineDescriptor, RenderPipelineId, ShaderStageFlags, TextureDescriptor, TextureId,
    TextureUsage, TextureViewDescriptor, TextureViewDimension, TextureViewId, TransientPool,
};
use solve_core::scene::ShadowCascades;
use std::borrow::Cow;

/// GPU resource handles of the shadow pass.
#[derive(Debug, Default)]
pub struct ShadowGpuResources {
    /// The `Depth32Float` array, one layer per cascade.
    pub shadow_map: Option<TextureId>,
    /// Array view sampled by the geometry pass.
    pub array_view: Option<TextureViewId>,
    /// One attachment view per layer.
    pub layer_views: Vec<TextureViewId>,
    /// One `CascadeUniforms` buffer per cascade.
    pub cascade_buffers: Vec<BufferId>,
    /// One bind group per cascade.
    pub cascade_bind_groups: Vec<BindGroupId>,
    /// `@group(0)` layout.
    pub scene_layout: Option<BindGroupLayoutId>,
    /// `@group(1)` layout.
    pub cascade_layout: Option<BindGroupLayoutId>,
    /// Depth-only pipeline.
    pub pipeline: Option<RenderPipelineId>,
}

/// The lane rendering the shadow cascades.
#[derive(Debug, Default)]
pub struct ShadowLane {
    resources: ShadowGpuResources,
}

impl ShadowLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// View over every cascade layer.
    pub fn shadow_view(&self) -> Option<TextureViewId> {
        self.resources.array_view
    }

    /// Uploads the light view-projection of every cascade.
    pub fn update_cascades(
        &self,
        device: &dyn GraphicsDevice,
        cascades: &ShadowCascades,
    ) -> Result<(), LaneError> {
        if self.resources.cascade_buffers.len() != SHADOW_CASCADE_COUNT {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        }
        for (buffer, view_projection) in self
            .resources
            .cascade_buffers
            .iter()
            .zip(&cascades.view_projections)
        {
            let uniforms = CascadeUniforms {
                view_projection: view_projection.to_cols_array_2d(),
            };
            device.write_buffer(*buffer, 0, bytemuck::bytes_of(&uniforms))?;
        }
        log::debug!("ShadowLane: cascades updated, splits {:?}", cascades.splits);
        Ok(())
    }

    /// Draws the shadow bucket into every cascade, one render pass per layer.
    ///
    /// Returns the number of records submitted over all cascades.
    pub fn record(
        &self,
        device: &dyn GraphicsDevice,
        encoder: &mut dyn CommandEncoder,
        pool: &mut TransientPool,
        inputs: &RasterInputs<'_>,
    ) -> Result<u32, LaneError> {
        let (Some(scene_layout), Some(pipeline)) =
            (self.resources.scene_layout, self.resources.pipeline)
        else {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        };
        let count = inputs.bucket.draw_count;
        let bind_group = create_scene_bind_group(device, pool, scene_layout, inputs, "shadow")?;

        let mut submitted = 0;
        for (layer_view, cascade_group) in self
            .resources
            .layer_views
            .iter()
            .zip(&self.resources.cascade_bind_groups)
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Shadow Cascade"),
                color_attachments: &[],
                depth_attachment: Some(RenderPassDepthAttachment {
                    view: *layer_view,
                    load: LoadOp::Clear(1.0),
                    store: true,
                }),
            });
            if count == 0 {
                continue;
            }
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group);
            pass.set_bind_group(1, *cascade_group);
            pass.set_index_buffer(inputs.geometry.index_buffer, 0, IndexFormat::Uint32);
            pass.multi_draw_indexed_indirect(inputs.bucket.indirect_buffer, 0, count);
            submitted += count;
        }
        Ok(submitted)
    }
}

impl Lane for ShadowLane {
    fn strategy_name(&self) -> &'static str {
        "Shadow"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Shadow
    }

    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        log::info!(
            "ShadowLane: Initializing {SHADOW_CASCADE_COUNT} cascades of {SHADOW_MAP_SIZE}x{SHADOW_MAP_SIZE}..."
        );

        let shadow_map = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("Shadow Map")),
            size: Extent3D {
                width: SHADOW_MAP_SIZE,
                height: SHADOW_MAP_SIZE,
                depth_or_array_layers: SHADOW_CASCADE_COUNT as u32,
            },
            mip_level_count: 1,
            format: DEPTH_FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        })?;
        let array_view = device.create_texture_view(
            shadow_map,
            &TextureViewDescriptor {
                label: Some(Cow::Borrowed("Shadow Map Array")),
                dimension: Some(TextureViewDimension::D2Array),
                ..Default::default()
            },
        )?;

        let cascade_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("shadow_cascade_layout"),
            entries: &[BindGroupLayoutEntry::uniform(0, ShaderStageFlags::VERTEX)],
        })?;
        let scene_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("shadow_scene_layout"),
            entries: &scene_layout_entries(),
        })?;

        let mut layer_views = Vec::with_capacity(SHADOW_CASCADE_COUNT);
        let mut cascade_buffers = Vec::with_capacity(SHADOW_CASCADE_COUNT);
        let mut cascade_bind_groups = Vec::with_capacity(SHADOW_CASCADE_COUNT);
        for layer in 0..SHADOW_CASCADE_COUNT as u32 {
            layer_views.push(device.create_texture_view(
                shadow_map,
                &TextureViewDescriptor::single_layer("Shadow Cascade Layer", layer),
            )?);
            let buffer = device.create_buffer(&BufferDescriptor::new(
                "Cascade Uniforms",
                std::mem::size_of::<CascadeUniforms>() as u64,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            ))?;
            cascade_bind_groups.push(device.create_bind_group(&BindGroupDescriptor {
                label: Some("shadow_cascade"),
                layout: cascade_layout,
                entries: &[BindGroupEntry::buffer(0, buffer)],
            })?);
            cascade_buffers.push(buffer);
        }

        let source = shadow_source();
        let module = create_module(device, "shadow", &source)?;
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("shadow_pipeline_layout"),
            bind_group_layouts: &[scene_layout, cascade_layout],
        })?;
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(Cow::Borrowed("shadow")),
            layout: Some(pipeline_layout),
            vertex_shader_module: module,
            vertex_entry_point: Cow::Borrowed("vs_shadow"),
            fragment_shader_module: None,
            fragment_entry_point: None,
            color_targets: Vec::new(),
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
                depth_bias: 2,
                depth_bias_slope_scale: 2.0,
            }),
            cull_mode: None,
        })?;

        self.resources = ShadowGpuResources {
            shadow_map: Some(shadow_map),
            array_view: Some(array_view),
            layer_views,
            cascade_buffers,
            cascade_bind_groups,
            scene_layout: Some(scene_layout),
            cascade_layout: Some(cascade_layout),
            pipeline: Some(pipeline),
        };
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        let resources = std::mem::take(&mut self.resources);
        for bind_group in resources.cascade_bind_groups {
            let _ = device.destroy_bind_group(bind_group);
        }
        for buffer in resources.cascade_buffers {
            let _ = device.destroy_buffer(buffer);
        }
        for view in resources.layer_views.into_iter().chain(resources.array_view) {
            let _ = device.destroy_texture_view(view);
        }
        if let Some(texture) = resources.shadow_map {
            let _ = device.destroy_texture(texture);
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
