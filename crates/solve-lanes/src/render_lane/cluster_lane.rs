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

//! Clustered light binning.
//!
//! Two dispatches sharing one bind group: the cluster build writes the
//! view-space bounds of every cluster, the light cull assigns every enabled
//! point light to the clusters its sphere touches. The build only runs when
//! the projection or the screen changed since the last build.
//!
//! # Counters
//!
//! The light cull reserves index-list slots with an atomic add on one of two
//! frame counters, selected by the frame-in-flight slot, and counts dropped
//! cluster/light pairs on a third one. The host zeroes the frame's counter
//! and the overflow counter right before each dispatch.

use super::create_module;
use super::shaders::{cluster_build_source, light_cull_source};
use solve_core::lane::{Lane, LaneError, LaneKind};
use solve_core::math::Mat4;
use solve_core::renderer::config::{ClusterGridConfig, CLUSTER_GRID, FRAME_OVERLAP};
use solve_core::renderer::gpu_types::{GpuPointLight, LightCullUniforms, ScreenToView};
use solve_core::renderer::{
    AccessScope, Barrier, BindGroupDescriptor, BindGroupEntry, BindGroupId,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindGroupLayoutId, BufferDescriptor,
    BufferId, BufferUsage, CommandEncoder, ComputePassDescriptor, ComputePipelineDescriptor,
    ComputePipelineId, GraphicsDevice, PipelineLayoutDescriptor, ResourceError,
    ShaderStageFlags, TransientPool,
};
use bytemuck::Zeroable;
use std::borrow::Cow;

/// Invocations per light cull workgroup.
pub const LIGHT_CULL_WORKGROUP_SIZE: u32 = 64;

/// Index of the overflow counter in the counter buffer.
pub const OVERFLOW_COUNTER: usize = 2;

const COUNTER_BYTES: u64 = 16;

/// Host copy of the light binning counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightCounters {
    /// Slots reserved in the global index list, per frame slot.
    pub reserved: [u32; FRAME_OVERLAP],
    /// Cluster/light pairs dropped by the per-cluster bound.
    pub overflow: u32,
}

impl LightCounters {
    /// Decodes the raw counter buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ResourceError> {
        let word = |i: usize| {
            bytes
                .get(i * 4..i * 4 + 4)
                .map(bytemuck::pod_read_unaligned::<u32>)
                .ok_or(ResourceError::OutOfBounds)
        };
        Ok(Self {
            reserved: [word(0)?, word(1)?],
            overflow: word(OVERFLOW_COUNTER)?,
        })
    }
}

/// Buffers read by the shading pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterShadingBuffers {
    /// Point lights.
    pub lights: BufferId,
    /// Per-cluster `{offset, count}`.
    pub light_grid: BufferId,
    /// Global light index list.
    pub light_indices: BufferId,
}

/// GPU resource handles of the cluster passes.
#[derive(Debug, Default)]
pub struct ClusterGpuResources {
    /// Shared layout of both dispatches.
    pub layout: Option<BindGroupLayoutId>,
    /// Cluster bounds pipeline.
    pub build_pipeline: Option<ComputePipelineId>,
    /// Light binning pipeline.
    pub cull_pipeline: Option<ComputePipelineId>,
    /// `ScreenToView` uniform.
    pub screen_to_view: Option<BufferId>,
    /// Cluster bounds.
    pub aabbs: Option<BufferId>,
    /// Point lights.
    pub lights: Option<BufferId>,
    /// Global light index list.
    pub light_indices: Option<BufferId>,
    /// Per-cluster `{offset, count}`.
    pub light_grid: Option<BufferId>,
    /// `[slot0, slot1, overflow, unused]`.
    pub counters: Option<BufferId>,
    /// `MAP_READ` copy of the counters.
    pub counters_staging: Option<BufferId>,
}

/// The lane building clusters and binning lights.
#[derive(Debug)]
pub struct ClusterLane {
    grid: ClusterGridConfig,
    resources: ClusterGpuResources,
    light_capacity: u32,
    light_count: u32,
    z_range: (f32, f32),
    stale: bool,
    frame_bind_group: Option<BindGroupId>,
}

impl Default for ClusterLane {
    fn default() -> Self {
        Self::with_grid(CLUSTER_GRID)
    }
}

impl ClusterLane {
    /// A lane using the reference 16x9x24 grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// A lane using a custom grid.
    pub fn with_grid(grid: ClusterGridConfig) -> Self {
        Self {
            grid,
            resources: ClusterGpuResources::default(),
            light_capacity: 0,
            light_count: 0,
            z_range: (1.0, 1000.0),
            stale: true,
            frame_bind_group: None,
        }
    }

    /// The grid.
    pub fn grid(&self) -> &ClusterGridConfig {
        &self.grid
    }

    /// Whether the next frame must rebuild the cluster bounds.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Forces a rebuild on the next frame.
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Buffers consumed by the shading pass.
    pub fn shading_buffers(&self) -> Option<ClusterShadingBuffers> {
        Some(ClusterShadingBuffers {
            lights: self.resources.lights?,
            light_grid: self.resources.light_grid?,
            light_indices: self.resources.light_indices?,
        })
    }

    /// Updates the projection the clusters are derived from and marks them
    /// stale.
    pub fn configure(
        &mut self,
        device: &dyn GraphicsDevice,
        projection: &Mat4,
        screen: (u32, u32),
        z_near: f32,
        z_far: f32,
    ) -> Result<ScreenToView, LaneError> {
        let buffer = self.require(self.resources.screen_to_view)?;
        let params = ScreenToView::new(&self.grid, projection, screen, z_near, z_far);
        device.write_buffer(buffer, 0, bytemuck::bytes_of(&params))?;
        self.z_range = (z_near, z_far);
        self.stale = true;
        log::debug!(
            "ClusterLane: configured for {}x{} (tile {}x{} px, z {z_near}..{z_far})",
            screen.0,
            screen.1,
            params.tile_sizes[3],
            params.tile_size_y
        );
        Ok(params)
    }

    /// Uploads this frame's point lights, growing the light buffer if needed.
    pub fn upload_lights(
        &mut self,
        device: &dyn GraphicsDevice,
        lights: &[GpuPointLight],
    ) -> Result<(), LaneError> {
        let count = lights.len() as u32;
        if count > self.light_capacity {
            let capacity = count.next_power_of_two();
            let buffer = device.create_buffer(&BufferDescriptor::new(
                "Point Lights",
                capacity as u64 * std::mem::size_of::<GpuPointLight>() as u64,
                BufferUsage::STORAGE | BufferUsage::COPY_DST,
            ))?;
            if let Some(old) = self.resources.lights.replace(buffer) {
                device.destroy_buffer(old)?;
            }
            log::debug!("ClusterLane: light buffer grown to {capacity} lights");
            self.light_capacity = capacity;
        }
        if !lights.is_empty() {
            let buffer = self.require(self.resources.lights)?;
            device.write_buffer(buffer, 0, bytemuck::cast_slice(lights))?;
        }
        self.light_count = count;
        Ok(())
    }

    /// Writes the frame's uniforms, zeroes its counters, and creates the bind
    /// group both dispatches use. Must precede `record_build` and
    /// `record_light_cull`.
    pub fn prepare_frame(
        &mut self,
        device: &dyn GraphicsDevice,
        pool: &mut TransientPool,
        view: &Mat4,
        frame_slot: usize,
    ) -> Result<(), LaneError> {
        let layout = self.require(self.resources.layout)?;
        let screen_to_view = self.require(self.resources.screen_to_view)?;
        let aabbs = self.require(self.resources.aabbs)?;
        let lights = self.require(self.resources.lights)?;
        let light_indices = self.require(self.resources.light_indices)?;
        let light_grid = self.require(self.resources.light_grid)?;
        let counters = self.require(self.resources.counters)?;
        let frame_slot = frame_slot % FRAME_OVERLAP;

        let uniforms = LightCullUniforms {
            view: view.to_cols_array_2d(),
            light_count: self.light_count,
            frame_slot: frame_slot as u32,
            max_lights_per_cluster: self.grid.max_lights_per_cluster,
            _pad0: 0,
            z_near: self.z_range.0,
            z_far: self.z_range.1,
            _pad1: [0.0; 2],
        };
        let uniform = pool.push_buffer(device.create_buffer_with_data(
            &BufferDescriptor::new(
                "Light Cull Uniforms",
                std::mem::size_of::<LightCullUniforms>() as u64,
                BufferUsage::UNIFORM,
            ),
            bytemuck::bytes_of(&uniforms),
        )?);

        device.write_buffer(counters, frame_slot as u64 * 4, &0u32.to_ne_bytes())?;
        device.write_buffer(counters, OVERFLOW_COUNTER as u64 * 4, &0u32.to_ne_bytes())?;

        let bind_group = pool.push_bind_group(device.create_bind_group(&BindGroupDescriptor {
            label: Some("clusters"),
            layout,
            entries: &[
                BindGroupEntry::buffer(0, screen_to_view),
                BindGroupEntry::buffer(1, uniform),
                BindGroupEntry::buffer(2, aabbs),
                BindGroupEntry::buffer(3, lights),
                BindGroupEntry::buffer(4, light_indices),
                BindGroupEntry::buffer(5, light_grid),
                BindGroupEntry::buffer(6, counters),
            ],
        })?);
        self.frame_bind_group = Some(bind_group);
        Ok(())
    }

    /// Records the cluster bounds build and clears the stale flag.
    pub fn record_build(&mut self, encoder: &mut dyn CommandEncoder) -> Result<(), LaneError> {
        let pipeline = self.require(self.resources.build_pipeline)?;
        let bind_group = self.require(self.frame_bind_group)?;
        let aabbs = self.require(self.resources.aabbs)?;
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("Cluster Build"),
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group);
            pass.dispatch_workgroups(self.grid.grid_x, self.grid.grid_y, self.grid.grid_z);
        }
        encoder.pipeline_barrier(&[Barrier::Buffer {
            buffer: aabbs,
            src: AccessScope::ComputeWrite,
            dst: AccessScope::ComputeRead,
        }]);
        self.stale = false;
        log::debug!(
            "ClusterLane: rebuilt {} cluster bounds",
            self.grid.cluster_count()
        );
        Ok(())
    }

    /// Records the light binning dispatch and the barrier making its output
    /// visible to fragment shading.
    pub fn record_light_cull(&self, encoder: &mut dyn CommandEncoder) -> Result<(), LaneError> {
        let pipeline = self.require(self.resources.cull_pipeline)?;
        let bind_group = self.require(self.frame_bind_group)?;
        let light_grid = self.require(self.resources.light_grid)?;
        let light_indices = self.require(self.resources.light_indices)?;
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("Light Cull"),
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group);
            pass.dispatch_workgroups(
                self.grid.cluster_count().div_ceil(LIGHT_CULL_WORKGROUP_SIZE),
                1,
                1,
            );
        }
        encoder.pipeline_barrier(&[
            Barrier::Buffer {
                buffer: light_grid,
                src: AccessScope::ComputeWrite,
                dst: AccessScope::ShaderRead,
            },
            Barrier::Buffer {
                buffer: light_indices,
                src: AccessScope::ComputeWrite,
                dst: AccessScope::ShaderRead,
            },
        ]);
        log::trace!("ClusterLane: binned {} lights", self.light_count);
        Ok(())
    }

    /// Records a copy of the counters into the staging buffer.
    pub fn record_counter_readback(
        &self,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<(), LaneError> {
        let counters = self.require(self.resources.counters)?;
        let staging = self.require(self.resources.counters_staging)?;
        encoder.pipeline_barrier(&[Barrier::Buffer {
            buffer: counters,
            src: AccessScope::ComputeWrite,
            dst: AccessScope::TransferRead,
        }]);
        encoder.copy_buffer_to_buffer(counters, 0, staging, 0, COUNTER_BYTES);
        Ok(())
    }

    /// Reads the staged counters. Blocks until the copy has executed.
    pub fn read_counters(&self, device: &dyn GraphicsDevice) -> Result<LightCounters, LaneError> {
        let staging = self.require(self.resources.counters_staging)?;
        let bytes = device.read_buffer(staging, 0, COUNTER_BYTES)?;
        let counters = LightCounters::from_bytes(&bytes)?;
        if counters.overflow > 0 {
            log::warn!(
                "ClusterLane: {} cluster/light pairs dropped past {} lights per cluster",
                counters.overflow,
                self.grid.max_lights_per_cluster
            );
        }
        Ok(counters)
    }

    fn require<T>(&self, handle: Option<T>) -> Result<T, LaneError> {
        handle.ok_or(LaneError::NotInitialized {
            lane: self.strategy_name(),
        })
    }
}

impl Lane for ClusterLane {
    fn strategy_name(&self) -> &'static str {
        "Cluster"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Lighting
    }

    fn on_initialize(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        log::info!(
            "ClusterLane: Initializing GPU resources for a {}x{}x{} grid...",
            self.grid.grid_x,
            self.grid.grid_y,
            self.grid.grid_z
        );

        let compute = ShaderStageFlags::COMPUTE;
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("clusters_layout"),
            entries: &[
                BindGroupLayoutEntry::uniform(0, compute),
                BindGroupLayoutEntry::uniform(1, compute),
                BindGroupLayoutEntry::storage(2, compute, false),
                BindGroupLayoutEntry::storage(3, compute, true),
                BindGroupLayoutEntry::storage(4, compute, false),
                BindGroupLayoutEntry::storage(5, compute, false),
                BindGroupLayoutEntry::storage(6, compute, false),
            ],
        })?;
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("clusters_pipeline_layout"),
            bind_group_layouts: &[layout],
        })?;

        let build_source = cluster_build_source();
        let build_module = create_module(device, "cluster_build", &build_source)?;
        let cull_source = light_cull_source();
        let cull_module = create_module(device, "light_cull", &cull_source)?;
        let build_pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(Cow::Borrowed("cluster_build")),
            layout: Some(pipeline_layout),
            shader_module: build_module,
            entry_point: Cow::Borrowed("cs_build"),
        })?;
        let cull_pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(Cow::Borrowed("light_cull")),
            layout: Some(pipeline_layout),
            shader_module: cull_module,
            entry_point: Cow::Borrowed("cs_cull"),
        })?;

        let storage = BufferUsage::STORAGE | BufferUsage::COPY_DST;
        let screen_to_view = device.create_buffer(&BufferDescriptor::new(
            "Screen To View",
            std::mem::size_of::<ScreenToView>() as u64,
            BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        ))?;
        let aabbs = device.create_buffer(&BufferDescriptor::new(
            "Cluster Bounds",
            self.grid.aabb_buffer_size(),
            BufferUsage::STORAGE,
        ))?;
        let light_indices = device.create_buffer(&BufferDescriptor::new(
            "Light Indices",
            self.grid.light_index_buffer_size(),
            BufferUsage::STORAGE,
        ))?;
        let light_grid = device.create_buffer(&BufferDescriptor::new(
            "Light Grid",
            self.grid.light_grid_buffer_size(),
            BufferUsage::STORAGE,
        ))?;
        let counters = device.create_buffer_with_data(
            &BufferDescriptor::new(
                "Light Counters",
                COUNTER_BYTES,
                storage | BufferUsage::COPY_SRC,
            ),
            &[0u8; COUNTER_BYTES as usize],
        )?;
        let counters_staging = device.create_buffer(&BufferDescriptor::new(
            "Light Counters Staging",
            COUNTER_BYTES,
            BufferUsage::MAP_READ | BufferUsage::COPY_DST,
        ))?;

        self.resources = ClusterGpuResources {
            layout: Some(layout),
            build_pipeline: Some(build_pipeline),
            cull_pipeline: Some(cull_pipeline),
            screen_to_view: Some(screen_to_view),
            aabbs: Some(aabbs),
            lights: None,
            light_indices: Some(light_indices),
            light_grid: Some(light_grid),
            counters: Some(counters),
            counters_staging: Some(counters_staging),
        };
        self.light_capacity = 0;
        // Binding needs a non-empty light buffer even with no lights.
        self.upload_lights(device, &[GpuPointLight::zeroed()])?;
        self.light_count = 0;
        self.stale = true;
        Ok(())
    }

    fn on_shutdown(&mut self, device: &dyn GraphicsDevice) {
        let resources = std::mem::take(&mut self.resources);
        for buffer in [
            resources.screen_to_view,
            resources.aabbs,
            resources.lights,
            resources.light_indices,
            resources.light_grid,
            resources.counters,
            resources.counters_staging,
        ]
        .into_iter()
        .flatten()
        {
            let _ = device.destroy_buffer(buffer);
        }
        self.light_capacity = 0;
        self.frame_bind_group = None;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_from_bytes() {
        let raw: [u32; 4] = [12, 7, 3, 0];
        let counters = LightCounters::from_bytes(bytemuck::cast_slice(&raw[..])).unwrap();
        assert_eq!(counters.reserved, [12, 7]);
        assert_eq!(counters.overflow, 3);

        let short: [u32; 2] = [1, 2];
        assert!(LightCounters::from_bytes(bytemuck::cast_slice(&short[..])).is_err());
    }

    #[test]
    fn test_new_lane_is_stale() {
        let lane = ClusterLane::new();
        assert!(lane.is_stale());
        assert_eq!(lane.grid().cluster_count(), 3456);
        assert!(lane.shading_buffers().is_none());
    }
}
