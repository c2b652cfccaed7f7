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

//! Per-instance visibility on the device.
//!
//! One dispatch per bucket per frame writes `instance_count` (0 or 1) of
//! every record in the bucket's indirect buffer. The lane records the
//! dispatch only: the `ComputeWrite -> IndirectRead` barrier that must follow
//! is batched by the caller across every cull of the frame, see
//! [`Barrier::cull_to_indirect`](solve_core::renderer::Barrier::cull_to_indirect).

use super::shaders::DRAW_CULL_WGSL;
use super::{create_module, BucketBuffers, SceneGeometry};
use solve_core::lane::{Lane, LaneError, LaneKind};
use solve_core::renderer::config::CULL_WORKGROUP_SIZE;
use solve_core::renderer::gpu_types::DrawCullData;
use solve_core::renderer::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindGroupLayoutId, BufferDescriptor, BufferUsage, CommandEncoder, ComputePassDescriptor,
    ComputePipelineDescriptor, ComputePipelineId, GraphicsDevice, PipelineLayoutDescriptor,
    ShaderStageFlags, TextureSampleType, TextureViewDimension, TextureViewId, TransientPool,
};
use std::borrow::Cow;

/// Workgroups needed to cull `draw_count` records.
pub fn cull_workgroups(draw_count: u32) -> u32 {
    draw_count.div_ceil(CULL_WORKGROUP_SIZE)
}

/// The lane culling one bucket at a time.
#[derive(Debug, Default)]
pub struct VisibilityCullLane {
    layout: Option<BindGroupLayoutId>,
    pipeline: Option<ComputePipelineId>,
}

impl VisibilityCullLane {
    /// Creates an uninitialized lane.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the cull of `bucket` with `data`.
    ///
    /// The parameters go into a uniform buffer taken from `pool`. An empty
    /// bucket records nothing and returns `false`.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &self,
        device: &dyn GraphicsDevice,
        encoder: &mut dyn CommandEncoder,
        pool: &mut TransientPool,
        geometry: &SceneGeometry,
        bucket: &BucketBuffers,
        data: &DrawCullData,
        pyramid_view: TextureViewId,
    ) -> Result<bool, LaneError> {
        let (Some(layout), Some(pipeline)) = (self.layout, self.pipeline) else {
            return Err(LaneError::NotInitialized {
                lane: self.strategy_name(),
            });
        };
        if bucket.draw_count == 0 {
            return Ok(false);
        }
        if data.draw_count != bucket.draw_count {
            return Err(LaneError::InvalidInput(format!(
                "cull data covers {} records, bucket holds {}",
                data.draw_count, bucket.draw_count
            )));
        }

        let uniform = pool.push_buffer(device.create_buffer_with_data(
            &BufferDescriptor::new(
                "Draw Cull Data",
                std::mem::size_of::<DrawCullData>() as u64,
                BufferUsage::UNIFORM,
            ),
            bytemuck::bytes_of(data),
        )?);
        let bind_group = pool.push_bind_group(device.create_bind_group(&BindGroupDescriptor {
            label: Some("draw_cull"),
            layout,
            entries: &[
                BindGroupEntry::buffer(0, uniform),
                BindGroupEntry::buffer(1, geometry.model_buffer),
                BindGroupEntry::buffer(2, bucket.object_buffer),
                BindGroupEntry::buffer(3, bucket.indirect_buffer),
                BindGroupEntry::texture_view(4, pyramid_view),
            ],
        })?);

        let groups = cull_workgroups(bucket.draw_count);
        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some("Visibility Cull"),
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group);
        pass.dispatch_workgroups(groups, 1, 1);
        log::trace!(
            "VisibilityCullLane: {} records in {groups} groups",
            bucket.draw_count
        );
        Ok(true)
    }
}

impl Lane for VisibilityCullLane {
    fn strategy_name(&self) -> &'static str {
        "VisibilityCull"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Cull
    }

    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        log::info!("VisibilityCullLane: Initializing GPU resources...");

        let module = create_module(device, "draw_cull", DRAW_CULL_WGSL)?;
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("draw_cull_layout"),
            entries: &[
                BindGroupLayoutEntry::uniform(0, ShaderStageFlags::COMPUTE),
                BindGroupLayoutEntry::storage(1, ShaderStageFlags::COMPUTE, true),
                BindGroupLayoutEntry::storage(2, ShaderStageFlags::COMPUTE, true),
                BindGroupLayoutEntry::storage(3, ShaderStageFlags::COMPUTE, false),
                BindGroupLayoutEntry::texture(
                    4,
                    ShaderStageFlags::COMPUTE,
                    TextureSampleType::Float { filterable: false },
                    TextureViewDimension::D2,
                ),
            ],
        })?;
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("draw_cull_pipeline_layout"),
            bind_group_layouts: &[layout],
        })?;
        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(Cow::Borrowed("draw_cull")),
            layout: Some(pipeline_layout),
            shader_module: module,
            entry_point: Cow::Borrowed("cs_main"),
        })?;

        self.layout = Some(layout);
        self.pipeline = Some(pipeline);
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
    fn test_workgroup_count() {
        assert_eq!(cull_workgroups(0), 0);
        assert_eq!(cull_workgroups(1), 1);
        assert_eq!(cull_workgroups(256), 1);
        assert_eq!(cull_workgroups(257), 2);
        assert_eq!(cull_workgroups(10_000), 40);
    }
}
