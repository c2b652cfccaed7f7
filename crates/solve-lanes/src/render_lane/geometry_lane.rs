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

//! Clustered forward shading over the early-depth bucket.

use super::shaders::mesh_source;
use super::{
    create_module, create_scene_bind_group, scene_layout_entries, ClusterShadingBuffers,
    DrawRange, RasterInputs, DEPTH_FORMAT,
};
use ahash::AHashMap;
use solve_core::lane::{Lane, LaneError, LaneKind};
use solve_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindGroupLayoutId, BlendMode, Color, ColorTargetState, CommandEncoder, CompareFunction,
    DepthStencilState, Face, GraphicsDevice, IndexFormat, LoadOp, PipelineLayoutDescriptor,
    RenderPassColorAttachment, RenderPassDepthAttachment, RenderPassDescriptor,
    RenderPipelineDescriptor, RenderPipelineId, ShaderStageFlags, TextureFormat,
    TextureSampleType, TextureViewDimension, TextureViewId, TransientPool,
};
use solve_core::scene::MaterialPass;
use std::borrow::Cow;

/// Attachments of the geometry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryTargets {
    /// Color output, cleared by the pass.
    pub color: TextureViewId,
    /// Depth laid down by the pre-pass, loaded and tested, never written.
    pub depth: TextureViewId,
}

/// The main color pass.
///
/// Loads the pre-pass depth and shades with `GreaterEqual`, so only the
/// nearest opaque surface of each pixel runs the fragment shader. Draws are
/// issued per [`DrawRange`], one multi-draw each, switching pipeline by
/// material pass.
#[derive(Debug)]
pub struct GeometryLane {
    color_format: TextureFormat,
    scene_layout: Option<BindGroupLayoutId>,
    lighting_layout: Option<BindGroupLayoutId>,
    pipelines: AHashMap<MaterialPass, RenderPipelineId>,
}

impl GeometryLane {
    /// Creates a lane rendering into `color_format` targets.
    pub fn new(color_format: TextureFormat) -> Self {
        Self {
            color_format,
            scene_layout: None,
            lighting_layout: None,
            pipelines: AHashMap::new(),
        }
    }

    /// The pipeline used for a material pass.
    pub fn pipeline_for(&self, pass: MaterialPass) -> Option<RenderPipelineId> {
        self.pipelines.get(&pass).copied()
    }

    /// Records the geometry pass.
    ///
    /// Returns the number of records submitted.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        device: &dyn GraphicsDevice,
        encoder: &mut dyn CommandEncoder,
        pool: &mut TransientPool,
        inputs: &RasterInputs<'_>,
        ranges: &[DrawRange],
        lighting: &ClusterShadingBuffers,
        shadow_view: TextureViewId,
        targets: &GeometryTargets,
    ) -> Result<u32, LaneError> {
        let (Some(scene_layout), Some(lighting_layout)) = (self.scene_layout, self.lighting_layout)
        else {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        };

        let scene_group = create_scene_bind_group(device, pool, scene_layout, inputs, "geometry")?;
        let lighting_group = pool.push_bind_group(device.create_bind_group(&BindGroupDescriptor {
            label: Some("geometry_lighting"),
            layout: lighting_layout,
            entries: &[
                BindGroupEntry::buffer(0, lighting.lights),
                BindGroupEntry::buffer(1, lighting.light_grid),
                BindGroupEntry::buffer(2, lighting.light_indices),
                BindGroupEntry::texture_view(3, shadow_view),
            ],
        })?);

        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &[RenderPassColorAttachment {
                view: targets.color,
                load: LoadOp::Clear(Color::BLACK),
                store: true,
            }],
            depth_attachment: Some(RenderPassDepthAttachment {
                view: targets.depth,
                load: LoadOp::Load,
                store: true,
            }),
        });
        pass.set_bind_group(0, scene_group);
        pass.set_bind_group(1, lighting_group);
        pass.set_index_buffer(inputs.geometry.index_buffer, 0, IndexFormat::Uint32);

        let mut submitted = 0;
        for range in ranges {
            let end = range.first.saturating_add(range.count);
            if range.count == 0 || end > inputs.bucket.draw_count {
                log::warn!(
                    "GeometryLane: skipping range {}..{end} of a {}-record bucket",
                    range.first,
                    inputs.bucket.draw_count
                );
                continue;
            }
            let Some(pipeline) = self.pipeline_for(range.pass) else {
                log::warn!("GeometryLane: no pipeline for {:?}", range.pass);
                continue;
            };
            pass.set_pipeline(pipeline);
            pass.multi_draw_indexed_indirect(
                inputs.bucket.indirect_buffer,
                range.indirect_offset(),
                range.count,
            );
            submitted += range.count;
        }
        Ok(submitted)
    }
}

impl Lane for GeometryLane {
    fn strategy_name(&self) -> &'static str {
        "Geometry"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Raster
    }

    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        log::info!("GeometryLane: Initializing GPU resources...");

        let source = mesh_source();
        let module = create_module(device, "mesh", &source)?;
        let scene_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("geometry_scene_layout"),
            entries: &scene_layout_entries(),
        })?;
        let lighting_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("geometry_lighting_layout"),
            entries: &[
                BindGroupLayoutEntry::storage(0, ShaderStageFlags::FRAGMENT, true),
                BindGroupLayoutEntry::storage(1, ShaderStageFlags::FRAGMENT, true),
                BindGroupLayoutEntry::storage(2, ShaderStageFlags::FRAGMENT, true),
                BindGroupLayoutEntry::texture(
                    3,
                    ShaderStageFlags::FRAGMENT,
                    TextureSampleType::Depth,
                    TextureViewDimension::D2Array,
                ),
            ],
        })?;
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("geometry_pipeline_layout"),
            bind_group_layouts: &[scene_layout, lighting_layout],
        })?;

        let mut pipelines = AHashMap::new();
        for (pass, blend, cull_mode) in [
            (MaterialPass::MainColor, None, Some(Face::Back)),
            (MaterialPass::Transparent, Some(BlendMode::AlphaBlending), None),
        ] {
            let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(Cow::Owned(format!("geometry_{pass:?}"))),
                layout: Some(pipeline_layout),
                vertex_shader_module: module,
                vertex_entry_point: Cow::Borrowed("vs_main"),
                fragment_shader_module: Some(module),
                fragment_entry_point: Some(Cow::Borrowed("fs_main")),
                color_targets: vec![ColorTargetState {
                    format: self.color_format,
                    blend,
                }],
                depth_stencil: Some(DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: CompareFunction::GreaterEqual,
                    depth_bias: 0,
                    depth_bias_slope_scale: 0.0,
                }),
                cull_mode,
            })?;
            pipelines.insert(pass, pipeline);
        }

        self.scene_layout = Some(scene_layout);
        self.lighting_layout = Some(lighting_layout);
        self.pipelines = pipelines;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipelines_missing_before_init() {
        let lane = GeometryLane::new(TextureFormat::Bgra8UnormSrgb);
        assert!(lane.pipeline_for(MaterialPass::MainColor).is_none());
        assert_eq!(lane.lane_kind(), LaneKind::Raster);
    }
}
