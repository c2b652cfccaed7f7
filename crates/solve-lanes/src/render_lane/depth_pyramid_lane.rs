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

//! Hierarchical depth pyramid.
//!
//! One compute dispatch per mip level: level 0 reduces the depth target to
//! its previous power-of-two extent, every further level reduces the one
//! before it. A compute-to-compute barrier on the written mip separates
//! consecutive levels. The last barrier hands the depth target back to
//! attachment use for the next frame's passes.
//!
//! The pyramid is read by the *next* frame's early-depth cull, so occlusion
//! decisions lag one frame behind the depth they are based on.

use super::shaders::DEPTH_REDUCE_WGSL;
use super::create_module;
use crate::cpu::pyramid::{level_extent, pyramid_extent, pyramid_levels, reduce_workgroups};
use solve_core::lane::{Lane, LaneError, LaneKind};
use solve_core::renderer::gpu_types::DepthReduceParams;
use solve_core::renderer::{
    AccessScope, Barrier, BindGroupDescriptor, BindGroupEntry, BindGroupId,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindGroupLayoutId, BufferDescriptor,
    BufferId, BufferUsage, CommandEncoder, ComputePassDescriptor, ComputePipelineDescriptor,
    ComputePipelineId, Extent3D, GraphicsDevice, PipelineLayoutDescriptor, ShaderStageFlags,
    TextureDescriptor, TextureFormat, TextureId, TextureSampleType, TextureUsage,
    TextureViewDescriptor, TextureViewDimension, TextureViewId,
};
use std::borrow::Cow;

/// One reduction dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceStep {
    /// Destination mip level.
    pub level: u32,
    /// Size of the level (or depth target) read.
    pub src_size: (u32, u32),
    /// Size of the level written.
    pub dst_size: (u32, u32),
    /// Workgroups dispatched along X and Y.
    pub workgroups: (u32, u32),
}

/// The dispatches reducing a depth target of `source` size into a full pyramid.
pub fn reduction_plan(source: (u32, u32)) -> Vec<ReduceStep> {
    let base = pyramid_extent(source.0, source.1);
    let levels = pyramid_levels(base.0, base.1);
    let mut src_size = source;
    (0..levels)
        .map(|level| {
            let dst_size = level_extent(base, level);
            let step = ReduceStep {
                level,
                src_size,
                dst_size,
                workgroups: reduce_workgroups(dst_size.0, dst_size.1),
            };
            src_size = dst_size;
            step
        })
        .collect()
}

/// GPU resource handles of the reduction pipelines.
#[derive(Debug, Default)]
pub struct DepthPyramidGpuResources {
    /// Layout reading the depth target: params, depth, destination mip.
    pub from_depth_layout: Option<BindGroupLayoutId>,
    /// Layout reading the previous mip: params, destination mip, source mip.
    pub from_mip_layout: Option<BindGroupLayoutId>,
    /// Pipeline of level 0.
    pub from_depth_pipeline: Option<ComputePipelineId>,
    /// Pipeline of levels 1 and up.
    pub from_mip_pipeline: Option<ComputePipelineId>,
}

/// A depth pyramid sized for one depth target.
#[derive(Debug)]
pub struct DepthPyramid {
    /// The `R32Float` mip chain.
    pub texture: TextureId,
    /// View over every level, read by the visibility culler.
    pub full_view: TextureViewId,
    /// Size of level 0.
    pub extent: (u32, u32),
    depth_texture: TextureId,
    steps: Vec<ReduceStep>,
    mip_views: Vec<TextureViewId>,
    params: Vec<BufferId>,
    bind_groups: Vec<BindGroupId>,
}

impl DepthPyramid {
    /// Number of mip levels.
    pub fn levels(&self) -> u32 {
        self.steps.len() as u32
    }
}

/// The lane building the depth pyramid.
#[derive(Debug, Default)]
pub struct DepthPyramidLane {
    resources: DepthPyramidGpuResources,
    pyramid: Option<DepthPyramid>,
}

impl DepthPyramidLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current pyramid, if one was built.
    pub fn pyramid(&self) -> Option<&DepthPyramid> {
        self.pyramid.as_ref()
    }

    /// (Re)creates the pyramid for a depth target. Called at startup and after
    /// every resize, with the new depth target.
    pub fn resize(
        &mut self,
        device: &dyn GraphicsDevice,
        depth_texture: TextureId,
        depth_view: TextureViewId,
        size: (u32, u32),
    ) -> Result<(), LaneError> {
        let (Some(from_depth_layout), Some(from_mip_layout)) = (
            self.resources.from_depth_layout,
            self.resources.from_mip_layout,
        ) else {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        };

        self.release_pyramid(device);

        let steps = reduction_plan(size);
        let extent = pyramid_extent(size.0, size.1);
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("Depth Pyramid")),
            size: Extent3D::d2(extent.0, extent.1),
            mip_level_count: steps.len() as u32,
            format: TextureFormat::R32Float,
            usage: TextureUsage::STORAGE_BINDING | TextureUsage::TEXTURE_BINDING,
        })?;
        let full_view = device.create_texture_view(
            texture,
            &TextureViewDescriptor {
                label: Some(Cow::Borrowed("Depth Pyramid Full View")),
                ..Default::default()
            },
        )?;

        let mut mip_views = Vec::with_capacity(steps.len());
        let mut params = Vec::with_capacity(steps.len());
        let mut bind_groups = Vec::with_capacity(steps.len());
        for step in &steps {
            let view = device.create_texture_view(
                texture,
                &TextureViewDescriptor::single_mip("Depth Pyramid Mip", step.level),
            )?;
            let reduce = DepthReduceParams {
                src_size: [step.src_size.0, step.src_size.1],
                dst_size: [step.dst_size.0, step.dst_size.1],
            };
            let buffer = device.create_buffer_with_data(
                &BufferDescriptor::new(
                    "Depth Reduce Params",
                    std::mem::size_of::<DepthReduceParams>() as u64,
                    BufferUsage::UNIFORM,
                ),
                bytemuck::bytes_of(&reduce),
            )?;
            let bind_group = match mip_views.last() {
                None => device.create_bind_group(&BindGroupDescriptor {
                    label: Some("depth_reduce_from_depth"),
                    layout: from_depth_layout,
                    entries: &[
                        BindGroupEntry::buffer(0, buffer),
                        BindGroupEntry::texture_view(1, depth_view),
                        BindGroupEntry::texture_view(2, view),
                    ],
                })?,
                Some(&previous) => device.create_bind_group(&BindGroupDescriptor {
                    label: Some("depth_reduce_from_mip"),
                    layout: from_mip_layout,
                    entries: &[
                        BindGroupEntry::buffer(0, buffer),
                        BindGroupEntry::texture_view(2, view),
                        BindGroupEntry::texture_view(3, previous),
                    ],
                })?,
            };
            mip_views.push(view);
            params.push(buffer);
            bind_groups.push(bind_group);
        }

        log::info!(
            "DepthPyramidLane: built {}x{} pyramid with {} levels for a {}x{} depth target",
            extent.0,
            extent.1,
            steps.len(),
            size.0,
            size.1
        );

        self.pyramid = Some(DepthPyramid {
            texture,
            full_view,
            extent,
            depth_texture,
            steps,
            mip_views,
            params,
            bind_groups,
        });
        Ok(())
    }

    /// Records the reduction of every level, with the barriers between them.
    pub fn record(&self, encoder: &mut dyn CommandEncoder) -> Result<(), LaneError> {
        let (Some(from_depth), Some(from_mip), Some(pyramid)) = (
            self.resources.from_depth_pipeline,
            self.resources.from_mip_pipeline,
            self.pyramid.as_ref(),
        ) else {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        };

        for (step, bind_group) in pyramid.steps.iter().zip(&pyramid.bind_groups) {
            {
                let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                    label: Some("Depth Pyramid Reduce"),
                });
                pass.set_pipeline(if step.level == 0 { from_depth } else { from_mip });
                pass.set_bind_group(0, *bind_group);
                pass.dispatch_workgroups(step.workgroups.0, step.workgroups.1, 1);
            }
            encoder.pipeline_barrier(&[Barrier::Texture {
                texture: pyramid.texture,
                base_mip_level: step.level,
                mip_level_count: 1,
                src: AccessScope::ComputeWrite,
                dst: AccessScope::ComputeRead,
            }]);
        }

        encoder.pipeline_barrier(&[Barrier::Texture {
            texture: pyramid.depth_texture,
            base_mip_level: 0,
            mip_level_count: 1,
            src: AccessScope::ComputeRead,
            dst: AccessScope::DepthAttachment,
        }]);
        log::trace!("DepthPyramidLane: recorded {} levels", pyramid.levels());
        Ok(())
    }

    fn release_pyramid(&mut self, device: &dyn GraphicsDevice) {
        let Some(pyramid) = self.pyramid.take() else {
            return;
        };
        for bind_group in pyramid.bind_groups {
            let _ = device.destroy_bind_group(bind_group);
        }
        for buffer in pyramid.params {
            let _ = device.destroy_buffer(buffer);
        }
        for view in pyramid.mip_views {
            let _ = device.destroy_texture_view(view);
        }
        let _ = device.destroy_texture_view(pyramid.full_view);
        let _ = device.destroy_texture(pyramid.texture);
    }
}

impl Lane for DepthPyramidLane {
    fn strategy_name(&self) -> &'static str {
        "DepthPyramid"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::DepthPyramid
    }

    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        log::info!("DepthPyramidLane: Initializing GPU resources...");

        let module = create_module(device, "depth_reduce", DEPTH_REDUCE_WGSL)?;
        let storage =
            BindGroupLayoutEntry::storage_texture(2, ShaderStageFlags::COMPUTE, TextureFormat::R32Float);

        let from_depth_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("depth_reduce_from_depth_layout"),
            entries: &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::COMPUTE),
                BindGroupLayoutEntry::texture(
                    1,
                    ShaderStageFlags::COMPUTE,
                    TextureSampleType::Depth,
                    TextureViewDimension::D2,
                ),
                storage,
            ],
        })?;
        let from_mip_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("depth_reduce_from_mip_layout"),
            entries: &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::COMPUTE),
                storage,
                BindGroupLayoutEntry::texture(
                    3,
                    ShaderStageFlags::COMPUTE,
                    TextureSampleType::Float { filterable: false },
                    TextureViewDimension::D2,
                ),
            ],
        })?;

        let pipeline = |layout: BindGroupLayoutId, entry_point: &'static str| {
            let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(entry_point),
                bind_group_layouts: &[layout],
            })?;
            device.create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(Cow::Borrowed(entry_point)),
                layout: Some(pipeline_layout),
                shader_module: module,
                entry_point: Cow::Borrowed(entry_point),
            })
        };
        let from_depth_pipeline = pipeline(from_depth_layout, "reduce_from_depth")?;
        let from_mip_pipeline = pipeline(from_mip_layout, "reduce_from_mip")?;

        self.resources = DepthPyramidGpuResources {
            from_depth_layout: Some(from_depth_layout),
            from_mip_layout: Some(from_mip_layout),
            from_depth_pipeline: Some(from_depth_pipeline),
            from_mip_pipeline: Some(from_mip_pipeline),
        };
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        self.release_pyramid(device);
        self.resources = DepthPyramidGpuResources::default();
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_plan_1080p() {
        let plan = reduction_plan((1920, 1080));
        assert_eq!(plan.len(), 11);
        assert_eq!(plan[0].src_size, (1920, 1080));
        assert_eq!(plan[0].dst_size, (1024, 1024));
        assert_eq!(plan[0].workgroups, (32, 32));
        assert_eq!(plan[1].src_size, (1024, 1024));
        assert_eq!(plan[1].dst_size, (512, 512));
        let last = plan.last().unwrap();
        assert_eq!(last.dst_size, (1, 1));
        assert_eq!(last.workgroups, (1, 1));
    }

    #[test]
    fn test_reduction_plan_chains_levels() {
        let plan = reduction_plan((800, 600));
        for pair in plan.windows(2) {
            assert_eq!(pair[1].src_size, pair[0].dst_size);
            assert_eq!(pair[1].level, pair[0].level + 1);
        }
        assert_eq!(plan[0].dst_size, (512, 512));
    }

    #[test]
    fn test_new_lane_has_no_pyramid() {
        let lane = DepthPyramidLane::new();
        assert!(lane.pyramid().is_none());
        assert_eq!(lane.strategy_name(), "DepthPyramid");
    }
}
