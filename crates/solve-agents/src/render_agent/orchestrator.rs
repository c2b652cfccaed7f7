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

//! The frame orchestrator.
//!
//! A frame is recorded into a single command encoder and submitted once:
//!
//! ```text
//! EarlyDepthCull -> [ShadowCull] -> CullBarrier -> [DebugReadback]
//!   -> EarlyDepthPass -> [ShadowPass] -> [ClusterBuild] -> LightCull
//!   -> GeometryPass -> PostProcess -> DepthPyramidReduce
//! ```
//!
//! The cull reads the depth pyramid reduced at the end of the previous frame,
//! so occlusion lags one frame behind the camera.

use super::frame::{FrameData, FrameInputs, FramePhase};
use super::stats::{BucketStats, FrameStats};
use crate::batch::{PassType, SceneBatches};
use crate::error::{BatchError, FrameError};
use solve_core::lane::{Lane, LaneError};
use solve_core::math::{Mat4, Vec3};
use solve_core::renderer::config::{
    RenderSettings, FENCE_TIMEOUT, FRAME_OVERLAP, SHADOW_CULL_CASCADE, SHADOW_CULL_HALF_EXTENT,
};
use solve_core::renderer::gpu_types::{
    CullParams, DrawCullData, DrawIndexedIndirect, GpuPointLight, GpuSceneData, ScreenToView,
};
use solve_core::renderer::{
    AccessScope, Barrier, BufferDescriptor, BufferId, BufferUsage, CommandEncoder, Extent3D,
    GraphicsDevice, RenderSurface, TextureDescriptor, TextureFormat, TextureId, TextureUsage,
    TextureViewDescriptor, TextureViewId, TransientPool,
};
use solve_core::scene::{DirectionalLight, MaterialPass, PointLight, RenderObject};
use solve_core::Stopwatch;
use solve_lanes::{
    BackgroundLane, ClusterLane, DepthPrepassLane, DepthPyramidLane, GeometryLane,
    GeometryTargets, LightCounters, RasterInputs, ShadowLane, VisibilityCullLane, DEPTH_FORMAT,
};
use std::borrow::Cow;
use std::mem::size_of;

const AMBIENT_COLOR: [f32; 4] = [0.08, 0.08, 0.1, 1.0];
const ORCHESTRATOR: &str = "FrameOrchestrator";

#[derive(Debug, Clone, Copy)]
struct DepthTarget {
    texture: TextureId,
    view: TextureViewId,
}

// Everything the cluster bounds are derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClusterKey {
    projection: Mat4,
    near: f32,
    far: f32,
    extent: (u32, u32),
}

#[derive(Debug, Clone, Copy)]
struct PendingReadback {
    pass: PassType,
    staging: BufferId,
    size: u64,
}

// The result of recording one frame, before submission.
struct RecordedFrame {
    encoder: Box<dyn CommandEncoder>,
    stats: FrameStats,
    readback: Option<PendingReadback>,
    counters: bool,
}

/// Drives the GPU-driven frame: culling, raster, light clustering and depth
/// reduction, with [`FRAME_OVERLAP`] frames in flight.
#[derive(Debug)]
pub struct FrameOrchestrator {
    settings: RenderSettings,
    // --- Lanes ---
    cull_lane: VisibilityCullLane,
    pyramid_lane: DepthPyramidLane,
    cluster_lane: ClusterLane,
    prepass_lane: DepthPrepassLane,
    shadow_lane: ShadowLane,
    geometry_lane: GeometryLane,
    background_lane: BackgroundLane,
    // --- Scene ---
    batches: SceneBatches,
    // --- Frames in flight ---
    frames: [FrameData; FRAME_OVERLAP],
    frame_number: u64,
    phases: Vec<FramePhase>,
    stats: FrameStats,
    // --- Swapchain-dependent state ---
    depth: Option<DepthTarget>,
    extent: (u32, u32),
    resize_requested: bool,
    cluster_key: Option<ClusterKey>,
    screen_to_view: Option<ScreenToView>,
    // --- Shadows ---
    last_sun_direction: Option<Vec3>,
    shadow_valid: bool,
    // --- Debug hooks ---
    readback_request: Option<PassType>,
    last_readback: Option<(PassType, Vec<DrawIndexedIndirect>)>,
    counters_requested: bool,
    light_counters: Option<LightCounters>,
    initialized: bool,
}

impl FrameOrchestrator {
    /// Creates an orchestrator rendering into `color_format` targets.
    pub fn new(settings: RenderSettings, color_format: TextureFormat) -> Self {
        Self {
            settings,
            cull_lane: VisibilityCullLane::new(),
            pyramid_lane: DepthPyramidLane::new(),
            cluster_lane: ClusterLane::new(),
            prepass_lane: DepthPrepassLane::new(),
            shadow_lane: ShadowLane::new(),
            geometry_lane: GeometryLane::new(color_format),
            background_lane: BackgroundLane::new(color_format, settings.clear_color),
            batches: SceneBatches::new(),
            frames: std::array::from_fn(|_| FrameData::default()),
            frame_number: 0,
            phases: Vec::new(),
            stats: FrameStats::default(),
            depth: None,
            extent: (0, 0),
            resize_requested: false,
            cluster_key: None,
            screen_to_view: None,
            last_sun_direction: None,
            shadow_valid: false,
            readback_request: None,
            last_readback: None,
            counters_requested: false,
            light_counters: None,
            initialized: false,
        }
    }

    /// The startup settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// The loaded scene's batches.
    pub fn batches(&self) -> &SceneBatches {
        &self.batches
    }

    /// Number of frames submitted so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// The phases recorded by the last frame, in order.
    pub fn phases(&self) -> &[FramePhase] {
        &self.phases
    }

    /// Counters of the last frame.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Creates every lane's device objects and the swapchain-dependent
    /// targets. Any failure here is fatal.
    pub fn initialize(
        &mut self,
        device: &dyn GraphicsDevice,
        surface: &dyn RenderSurface,
    ) -> Result<(), FrameError> {
        let adapter = device.adapter_info();
        log::info!(
            "FrameOrchestrator: initializing on {} ({:?}, {:?})",
            adapter.name,
            adapter.backend_type,
            adapter.device_type
        );

        let lanes: [&mut dyn Lane; 7] = [
            &mut self.cull_lane,
            &mut self.pyramid_lane,
            &mut self.cluster_lane,
            &mut self.prepass_lane,
            &mut self.shadow_lane,
            &mut self.geometry_lane,
            &mut self.background_lane,
        ];
        for lane in lanes {
            if let Err(source) = lane.on_initialize(device) {
                let lane = lane.strategy_name();
                log::error!("FrameOrchestrator: lane '{lane}' failed to initialize: {source}");
                return Err(FrameError::Initialization { lane, source });
            }
        }

        self.create_depth_target(device, surface.extent())
            .inspect_err(|e| {
                log::error!("FrameOrchestrator: failed to create the depth target: {e}")
            })?;
        self.initialized = true;
        Ok(())
    }

    /// Registers, merges, batches and uploads a scene. Must be called once
    /// per scene, after [`initialize`](Self::initialize).
    pub fn load_scene(
        &mut self,
        device: &dyn GraphicsDevice,
        objects: &[RenderObject],
    ) -> Result<(), FrameError> {
        let timer = Stopwatch::new();
        self.batches.register(objects)?;
        self.batches.merge(device)?;
        self.batches.build_batches()?;
        self.batches.upload(device)?;
        log::info!(
            "FrameOrchestrator: loaded {} surfaces in {:.2} ms",
            objects.len(),
            timer.elapsed_ms()
        );
        Ok(())
    }

    /// Waits for the device and destroys every scene buffer.
    pub fn unload_scene(&mut self, device: &dyn GraphicsDevice) -> Result<(), FrameError> {
        self.wait_idle(device)?;
        self.batches.release(device);
        self.last_readback = None;
        log::info!("FrameOrchestrator: scene unloaded");
        Ok(())
    }

    /// Arms a one-shot copy of a bucket's indirect buffer, recorded in the
    /// next frame right after the cull barrier. Not meant for real-time use:
    /// the frame waits for its own submission to read the copy.
    pub fn request_readback(&mut self, pass: PassType) {
        self.readback_request = Some(pass);
    }

    /// The records of the last completed readback.
    pub fn last_readback(&self) -> Option<(PassType, &[DrawIndexedIndirect])> {
        self.last_readback
            .as_ref()
            .map(|(pass, records)| (*pass, records.as_slice()))
    }

    /// Arms a one-shot read of the light binning counters.
    pub fn request_light_counters(&mut self) {
        self.counters_requested = true;
    }

    /// The counters of the last completed counter read.
    pub fn light_counters(&self) -> Option<LightCounters> {
        self.light_counters
    }

    /// Rebuilds the swapchain-dependent resources: the surface, the depth
    /// target, the depth pyramid and the cluster bounds.
    pub fn handle_resize(
        &mut self,
        device: &dyn GraphicsDevice,
        surface: &mut dyn RenderSurface,
        size: Option<(u32, u32)>,
    ) -> Result<(), FrameError> {
        self.wait_idle(device)?;
        surface.reconfigure(device, size).map_err(FrameError::Surface)?;
        let extent = surface.extent();
        self.create_depth_target(device, extent)?;
        self.cluster_key = None;
        self.cluster_lane.mark_stale();
        self.resize_requested = false;
        log::info!(
            "FrameOrchestrator: rebuilt swapchain resources at {}x{}",
            extent.0,
            extent.1
        );
        Ok(())
    }

    /// Renders and presents one frame.
    ///
    /// Outdated or lost surfaces are rebuilt and the acquisition retried
    /// once. A slot whose previous submission does not retire within
    /// [`FENCE_TIMEOUT`] fails with the fatal [`FrameError::DeviceTimeout`].
    pub fn render_frame(
        &mut self,
        device: &dyn GraphicsDevice,
        surface: &mut dyn RenderSurface,
        inputs: &FrameInputs<'_>,
    ) -> Result<FrameStats, FrameError> {
        let frame_timer = Stopwatch::new();
        if !self.initialized {
            return Err(LaneError::NotInitialized { lane: ORCHESTRATOR }.into());
        }
        let slot = (self.frame_number % FRAME_OVERLAP as u64) as usize;

        let wait_timer = Stopwatch::new();
        self.wait_for_slot(device, slot)?;
        let update_time = wait_timer.elapsed_ms();

        if self.resize_requested {
            self.handle_resize(device, surface, None)?;
        }
        let frame = match surface.acquire(device) {
            Ok(frame) => frame,
            Err(e) if e.needs_reconfigure() => {
                log::warn!("FrameOrchestrator: {e} Rebuilding and retrying the frame.");
                self.resize_requested = true;
                self.handle_resize(device, surface, None)?;
                surface.acquire(device).map_err(FrameError::Surface)?
            }
            Err(e) => return Err(FrameError::Surface(e)),
        };

        let mut pool = std::mem::take(&mut self.frames[slot].pool);
        let recorded = self.record_frame(device, &mut pool, frame.view, inputs, slot);
        self.frames[slot].pool = pool;
        let RecordedFrame {
            encoder,
            mut stats,
            readback,
            counters,
        } = recorded?;

        let submission = device.submit_command_buffer(encoder.finish())?;
        self.frames[slot].submission = Some(submission);

        if readback.is_some() || counters {
            device.wait_for_submission(submission, FENCE_TIMEOUT)?;
        }
        if let Some(pending) = readback {
            let bytes = device.read_buffer(pending.staging, 0, pending.size)?;
            let records: Vec<DrawIndexedIndirect> = bytes
                .chunks_exact(size_of::<DrawIndexedIndirect>())
                .map(bytemuck::pod_read_unaligned)
                .collect();
            log::debug!(
                "FrameOrchestrator: read back {} {} records, {} visible",
                records.len(),
                pending.pass,
                records.iter().filter(|r| r.instance_count > 0).count()
            );
            self.last_readback = Some((pending.pass, records));
        }
        if counters {
            self.light_counters = Some(self.cluster_lane.read_counters(device)?);
        }

        if let Err(e) = surface.present(device, frame) {
            if e.needs_reconfigure() {
                log::warn!("FrameOrchestrator: {e} Rebuilding before the next frame.");
                self.resize_requested = true;
            } else {
                return Err(FrameError::Surface(e));
            }
        }

        self.frame_number += 1;
        stats.update_time = update_time;
        stats.frametime = frame_timer.elapsed_ms();
        log::trace!("FrameOrchestrator: {stats}");
        self.stats = stats;
        Ok(stats)
    }

    /// Waits for the device and releases every device resource.
    pub fn shutdown(&mut self, device: &dyn GraphicsDevice) {
        if let Err(e) = self.wait_idle(device) {
            log::warn!("FrameOrchestrator: shutting down without a clean wait: {e}");
        }
        self.batches.release(device);
        self.destroy_depth_target(device);

        let lanes: [&mut dyn Lane; 7] = [
            &mut self.cull_lane,
            &mut self.pyramid_lane,
            &mut self.cluster_lane,
            &mut self.prepass_lane,
            &mut self.shadow_lane,
            &mut self.geometry_lane,
            &mut self.background_lane,
        ];
        for lane in lanes {
            lane.on_shutdown(device);
        }
        self.initialized = false;
        log::info!(
            "FrameOrchestrator: shut down after {} frames",
            self.frame_number
        );
    }

    fn record_frame(
        &mut self,
        device: &dyn GraphicsDevice,
        pool: &mut TransientPool,
        color_view: TextureViewId,
        inputs: &FrameInputs<'_>,
        slot: usize,
    ) -> Result<RecordedFrame, FrameError> {
        let camera = inputs.camera;
        let mut stats = FrameStats::default();
        self.phases.clear();

        let geometry = *self.batches.geometry().ok_or(BatchError::NotMerged)?;
        let early_bucket = *self
            .batches
            .bucket(PassType::EarlyDepth)
            .ok_or(BatchError::NotUploaded)?;
        let shadow_bucket = *self
            .batches
            .bucket(PassType::Shadow)
            .ok_or(BatchError::NotUploaded)?;
        let depth = self
            .depth
            .ok_or(LaneError::NotInitialized { lane: ORCHESTRATOR })?;
        let (pyramid_view, pyramid_extent) = self
            .pyramid_lane
            .pyramid()
            .map(|p| (p.full_view, p.extent))
            .ok_or(LaneError::NotInitialized {
                lane: self.pyramid_lane.strategy_name(),
            })?;
        let shadow_view = self
            .shadow_lane
            .shadow_view()
            .ok_or(LaneError::NotInitialized {
                lane: self.shadow_lane.strategy_name(),
            })?;

        // --- Scene update ---
        let update_timer = Stopwatch::new();
        let screen_to_view = self.configure_clusters(device, inputs)?;
        let lights: Vec<GpuPointLight> =
            inputs.point_lights.iter().map(PointLight::to_gpu).collect();
        self.cluster_lane.upload_lights(device, &lights)?;

        let sun = inputs.sun.filter(|_| self.settings.shadows);
        let recompute_shadows = sun.is_some_and(|sun| {
            camera.updated || self.last_sun_direction != Some(sun.direction)
        });
        if let (true, Some(sun)) = (recompute_shadows, sun) {
            self.shadow_lane.update_cascades(device, inputs.cascades)?;
            self.last_sun_direction = Some(sun.direction);
        }
        let shadows_sampled = sun.is_some() && (self.shadow_valid || recompute_shadows);

        let scene_data = scene_data(
            inputs,
            sun,
            &screen_to_view,
            lights.len() as u32,
            shadows_sampled,
        );
        let scene_uniform = pool.push_buffer(device.create_buffer_with_data(
            &BufferDescriptor::new(
                "Scene Data",
                size_of::<GpuSceneData>() as u64,
                BufferUsage::UNIFORM,
            ),
            bytemuck::bytes_of(&scene_data),
        )?);
        self.cluster_lane.prepare_frame(device, pool, &camera.view, slot)?;
        stats.scene_update_time = update_timer.elapsed_ms();

        // --- Culling ---
        let draw_timer = Stopwatch::new();
        let mut encoder = device.create_command_encoder(Some("Frame"));
        let enc = encoder.as_mut();
        let draw_dist = self.settings.draw_distance.unwrap_or(camera.far);

        let mut cull_barriers = Vec::with_capacity(2);
        let early_cull = DrawCullData::new(
            &CullParams {
                view: camera.view,
                projection: camera.projection,
                znear: camera.near,
                draw_dist,
                frustum_cull: self.settings.frustum_culling,
                occlusion_cull: self.settings.occlusion_culling,
                aabb: None,
            },
            early_bucket.draw_count,
            pyramid_extent,
        );
        if self.cull_lane.record(
            device,
            enc,
            pool,
            &geometry,
            &early_bucket,
            &early_cull,
            pyramid_view,
        )? {
            cull_barriers.push(Barrier::cull_to_indirect(early_bucket.indirect_buffer));
        }
        self.phases.push(FramePhase::EarlyDepthCull);

        if recompute_shadows {
            let view = inputs.cascades.views[SHADOW_CULL_CASCADE];
            let projection =
                inputs.cascades.view_projections[SHADOW_CULL_CASCADE] * view.inverse();
            let half_extent = Vec3::splat(SHADOW_CULL_HALF_EXTENT);
            let shadow_cull = DrawCullData::new(
                &CullParams {
                    view,
                    projection,
                    znear: camera.near,
                    draw_dist,
                    frustum_cull: false,
                    occlusion_cull: false,
                    aabb: Some((-half_extent, half_extent)),
                },
                shadow_bucket.draw_count,
                pyramid_extent,
            );
            if self.cull_lane.record(
                device,
                enc,
                pool,
                &geometry,
                &shadow_bucket,
                &shadow_cull,
                pyramid_view,
            )? {
                cull_barriers.push(Barrier::cull_to_indirect(shadow_bucket.indirect_buffer));
            }
            self.phases.push(FramePhase::ShadowCull);
        }

        if !cull_barriers.is_empty() {
            enc.pipeline_barrier(&cull_barriers);
            self.phases.push(FramePhase::CullBarrier);
        }

        let readback = match self.readback_request.take() {
            Some(pass) => self.record_readback(device, enc, pool, pass)?,
            None => None,
        };
        if readback.is_some() {
            self.phases.push(FramePhase::DebugReadback);
        }

        // --- Depth and shadows ---
        let early_inputs = RasterInputs {
            scene_uniform,
            geometry: &geometry,
            bucket: &early_bucket,
        };
        let prepass = self.prepass_lane.record(
            device,
            enc,
            pool,
            &early_inputs,
            self.batches.forward_count(),
            depth.view,
        )?;
        let early_pass = self.batches.mesh_pass(PassType::EarlyDepth);
        *stats.bucket_mut(PassType::EarlyDepth) = BucketStats {
            draw_calls: prepass,
            triangles: early_pass.triangles_in(0, prepass),
        };
        self.phases.push(FramePhase::EarlyDepthPass);

        if recompute_shadows {
            let shadow_timer = Stopwatch::new();
            let shadow_inputs = RasterInputs {
                scene_uniform,
                geometry: &geometry,
                bucket: &shadow_bucket,
            };
            let submitted = self.shadow_lane.record(device, enc, pool, &shadow_inputs)?;
            let layers = submitted.checked_div(shadow_bucket.draw_count).unwrap_or(0);
            *stats.bucket_mut(PassType::Shadow) = BucketStats {
                draw_calls: submitted,
                triangles: self
                    .batches
                    .mesh_pass(PassType::Shadow)
                    .triangles_in(0, shadow_bucket.draw_count)
                    * layers as u64,
            };
            stats.shadow_drawcall_count = submitted;
            stats.shadow_pass_time = shadow_timer.elapsed_ms();
            self.phases.push(FramePhase::ShadowPass);
        }

        // --- Lighting ---
        if self.cluster_lane.is_stale() {
            self.cluster_lane.record_build(enc)?;
            self.phases.push(FramePhase::ClusterBuild);
        }
        self.cluster_lane.record_light_cull(enc)?;
        self.phases.push(FramePhase::LightCull);

        let counters = std::mem::take(&mut self.counters_requested);
        if counters {
            self.cluster_lane.record_counter_readback(enc)?;
            self.phases.push(FramePhase::CounterReadback);
        }

        // --- Geometry ---
        let lighting = self
            .cluster_lane
            .shading_buffers()
            .ok_or(LaneError::NotInitialized {
                lane: self.cluster_lane.strategy_name(),
            })?;
        let ranges = self.batches.geometry_draw_ranges();
        stats.drawcall_count = self.geometry_lane.record(
            device,
            enc,
            pool,
            &early_inputs,
            &ranges,
            &lighting,
            shadow_view,
            &GeometryTargets {
                color: color_view,
                depth: depth.view,
            },
        )?;
        for range in &ranges {
            let pass = match range.pass {
                MaterialPass::MainColor => PassType::Forward,
                MaterialPass::Transparent => PassType::Transparency,
            };
            let triangles = early_pass.triangles_in(range.first, range.count);
            let bucket = stats.bucket_mut(pass);
            bucket.draw_calls += range.count;
            bucket.triangles += triangles;
            stats.triangle_count += triangles;
        }
        self.phases.push(FramePhase::GeometryPass);

        self.background_lane.record(enc, color_view, depth.view)?;
        self.phases.push(FramePhase::PostProcess);

        self.pyramid_lane.record(enc)?;
        self.phases.push(FramePhase::DepthPyramidReduce);

        stats.mesh_draw_time = (draw_timer.elapsed_ms() - stats.shadow_pass_time).max(0.0);
        self.shadow_valid |= recompute_shadows;

        log::trace!(
            "FrameOrchestrator: frame {} recorded {:?}",
            self.frame_number,
            self.phases
        );
        Ok(RecordedFrame {
            encoder,
            stats,
            readback,
            counters,
        })
    }

    fn record_readback(
        &self,
        device: &dyn GraphicsDevice,
        encoder: &mut dyn CommandEncoder,
        pool: &mut TransientPool,
        pass: PassType,
    ) -> Result<Option<PendingReadback>, FrameError> {
        let bucket = *self.batches.bucket(pass).ok_or(BatchError::NotUploaded)?;
        let size = bucket.draw_count as u64 * size_of::<DrawIndexedIndirect>() as u64;
        if size == 0 {
            log::warn!("FrameOrchestrator: {pass} bucket is empty, nothing to read back");
            return Ok(None);
        }
        let staging = pool.push_buffer(device.create_buffer(&BufferDescriptor::new(
            "Indirect Readback",
            size,
            BufferUsage::MAP_READ | BufferUsage::COPY_DST,
        ))?);
        encoder.pipeline_barrier(&[Barrier::Buffer {
            buffer: bucket.indirect_buffer,
            src: AccessScope::ComputeWrite,
            dst: AccessScope::TransferRead,
        }]);
        encoder.copy_buffer_to_buffer(bucket.indirect_buffer, 0, staging, 0, size);
        Ok(Some(PendingReadback {
            pass,
            staging,
            size,
        }))
    }

    // Reconfigures the cluster lane when the projection, the depth range or
    // the target size changed.
    fn configure_clusters(
        &mut self,
        device: &dyn GraphicsDevice,
        inputs: &FrameInputs<'_>,
    ) -> Result<ScreenToView, FrameError> {
        let camera = inputs.camera;
        let key = ClusterKey {
            projection: camera.projection,
            near: camera.near,
            far: camera.far,
            extent: self.extent,
        };
        match self.screen_to_view {
            Some(params) if self.cluster_key == Some(key) => Ok(params),
            _ => {
                let params = self.cluster_lane.configure(
                    device,
                    &camera.projection,
                    self.extent,
                    camera.near,
                    camera.far,
                )?;
                self.cluster_key = Some(key);
                self.screen_to_view = Some(params);
                Ok(params)
            }
        }
    }

    fn wait_for_slot(
        &mut self,
        device: &dyn GraphicsDevice,
        slot: usize,
    ) -> Result<(), FrameError> {
        if let Some(submission) = self.frames[slot].submission.take() {
            if let Err(e) = device.wait_for_submission(submission, FENCE_TIMEOUT) {
                let err = FrameError::from(e);
                if err.is_fatal() {
                    log::error!("FrameOrchestrator: frame slot {slot} did not retire: {err}");
                }
                return Err(err);
            }
        }
        self.frames[slot].pool.release(device);
        Ok(())
    }

    fn wait_idle(&mut self, device: &dyn GraphicsDevice) -> Result<(), FrameError> {
        for slot in 0..FRAME_OVERLAP {
            self.wait_for_slot(device, slot)?;
        }
        Ok(())
    }

    fn create_depth_target(
        &mut self,
        device: &dyn GraphicsDevice,
        extent: (u32, u32),
    ) -> Result<(), FrameError> {
        self.destroy_depth_target(device);
        let extent = (extent.0.max(1), extent.1.max(1));
        let texture = device.create_texture(&TextureDescriptor {
            label: Some(Cow::Borrowed("Depth Target")),
            size: Extent3D::d2(extent.0, extent.1),
            mip_level_count: 1,
            format: DEPTH_FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        })?;
        let view = device.create_texture_view(
            texture,
            &TextureViewDescriptor {
                label: Some(Cow::Borrowed("Depth Target View")),
                ..Default::default()
            },
        )?;
        self.depth = Some(DepthTarget { texture, view });
        self.pyramid_lane.resize(device, texture, view, extent)?;
        self.extent = extent;
        Ok(())
    }

    fn destroy_depth_target(&mut self, device: &dyn GraphicsDevice) {
        if let Some(depth) = self.depth.take() {
            if let Err(e) = device.destroy_texture_view(depth.view) {
                log::warn!("FrameOrchestrator: failed to destroy the depth view: {e}");
            }
            if let Err(e) = device.destroy_texture(depth.texture) {
                log::warn!("FrameOrchestrator: failed to destroy the depth target: {e}");
            }
        }
    }
}

fn scene_data(
    inputs: &FrameInputs<'_>,
    sun: Option<&DirectionalLight>,
    screen_to_view: &ScreenToView,
    light_count: u32,
    shadows_sampled: bool,
) -> GpuSceneData {
    let camera = inputs.camera;
    GpuSceneData {
        view: camera.view.to_cols_array_2d(),
        projection: camera.projection.to_cols_array_2d(),
        view_projection: camera.view_projection().to_cols_array_2d(),
        cascade_view_projection: inputs
            .cascades
            .view_projections
            .map(|m| m.to_cols_array_2d()),
        cascade_splits: inputs.cascades.splits,
        camera_position: camera.position.extend(1.0).to_array(),
        ambient_color: AMBIENT_COLOR,
        sun: sun
            .map(DirectionalLight::to_gpu)
            .unwrap_or_else(bytemuck::Zeroable::zeroed),
        tile_sizes: screen_to_view.tile_sizes,
        cluster_params: [
            screen_to_view.slice_scaling_factor,
            screen_to_view.slice_bias_factor,
            screen_to_view.screen_width as f32,
            screen_to_view.screen_height as f32,
        ],
        flags: [light_count, shadows_sampled as u32, 0, 0],
        tile_size_y: screen_to_view.tile_size_y,
        _pad: [0; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solve_core::renderer::config::CLUSTER_GRID;
    use solve_core::scene::{CameraState, ShadowCascades};

    #[test]
    fn test_scene_data_flags() {
        let camera = CameraState::look_at(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, 16.0 / 9.0);
        let cascades = ShadowCascades::default();
        let sun = DirectionalLight {
            direction: Vec3::new(0.0, -2.0, 0.0),
            color: Vec3::ONE,
            intensity: 1.0,
        };
        let inputs = FrameInputs {
            camera: &camera,
            point_lights: &[],
            sun: Some(&sun),
            cascades: &cascades,
        };
        let params =
            ScreenToView::new(&CLUSTER_GRID, &camera.projection, (1920, 1080), 1.0, 1000.0);

        let data = scene_data(&inputs, Some(&sun), &params, 3, true);
        assert_eq!(data.flags, [3, 1, 0, 0]);
        assert_eq!(data.sun.direction, [0.0, -1.0, 0.0, 0.0]);
        assert_eq!(data.tile_sizes, [16, 9, 24, 120]);
        assert_eq!(data.tile_size_y, 120);
        assert_eq!(data.cluster_params[2], 1920.0);

        let unlit = scene_data(&inputs, None, &params, 0, false);
        assert_eq!(unlit.flags, [0, 0, 0, 0]);
        assert_eq!(unlit.sun.intensity, 0.0);
    }

    #[test]
    fn test_new_orchestrator_is_idle() {
        let orchestrator =
            FrameOrchestrator::new(RenderSettings::default(), TextureFormat::Bgra8UnormSrgb);
        assert_eq!(orchestrator.frame_number(), 0);
        assert!(orchestrator.phases().is_empty());
        assert!(orchestrator.last_readback().is_none());
        assert!(orchestrator.light_counters().is_none());
    }
}
