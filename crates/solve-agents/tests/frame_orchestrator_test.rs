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

mod common;

use common::{mesh, object, positions, Command, MockDevice, MockSurface};
use solve_agents::{FrameError, FrameInputs, FrameOrchestrator, FramePhase, PassType};
use solve_core::math::Vec3;
use solve_core::renderer::config::RenderSettings;
use solve_core::lane::LaneError;
use solve_core::renderer::{
    Barrier, PipelineError, RenderSurface, ResourceError, SurfaceError,
};
use solve_core::scene::{
    CameraState, DirectionalLight, MaterialHandle, PointLight, RenderObject, ShadowCascades,
};

struct Harness {
    device: MockDevice,
    surface: MockSurface,
    orchestrator: FrameOrchestrator,
    camera: CameraState,
    sun: DirectionalLight,
    lights: Vec<PointLight>,
}

impl Harness {
    /// Three opaque surfaces and one transparent one, two triangles each.
    fn new(settings: RenderSettings) -> Self {
        let device = MockDevice::new();
        let surface = MockSurface::new(1280, 720);
        let mut orchestrator = FrameOrchestrator::new(settings, surface.format());
        orchestrator.initialize(&device, &surface).unwrap();

        let quad = mesh(&device, 1.0, 4, 6);
        let objects: Vec<RenderObject> = [
            MaterialHandle::opaque(0),
            MaterialHandle::transparent(1),
            MaterialHandle::opaque(0),
            MaterialHandle::opaque(2),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, material)| object(quad, material, Vec3::new(i as f32 * 3.0, 0.0, 0.0)))
        .collect();
        orchestrator.load_scene(&device, &objects).unwrap();
        device.clear_log();

        Self {
            device,
            surface,
            orchestrator,
            camera: CameraState::look_at(Vec3::new(0.0, 5.0, 20.0), Vec3::ZERO, 16.0 / 9.0),
            sun: DirectionalLight {
                direction: Vec3::new(-0.3, -1.0, -0.2),
                color: Vec3::ONE,
                intensity: 3.0,
            },
            lights: vec![PointLight::new(Vec3::new(0.0, 2.0, 0.0), Vec3::ONE, 10.0, 1.0)],
        }
    }

    fn frame(&mut self) -> Result<solve_agents::FrameStats, FrameError> {
        let cascades = ShadowCascades::fit(&self.camera, self.sun.direction, 0.8);
        let inputs = FrameInputs {
            camera: &self.camera,
            point_lights: &self.lights,
            sun: Some(&self.sun),
            cascades: &cascades,
        };
        let result = self
            .orchestrator
            .render_frame(&self.device, &mut self.surface, &inputs);
        self.camera.updated = false;
        result
    }
}

#[test]
fn test_first_frame_records_every_phase_in_order() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame().unwrap();

    assert_eq!(
        harness.orchestrator.phases(),
        &[
            FramePhase::EarlyDepthCull,
            FramePhase::ShadowCull,
            FramePhase::CullBarrier,
            FramePhase::EarlyDepthPass,
            FramePhase::ShadowPass,
            FramePhase::ClusterBuild,
            FramePhase::LightCull,
            FramePhase::GeometryPass,
            FramePhase::PostProcess,
            FramePhase::DepthPyramidReduce,
        ]
    );
    assert_eq!(harness.orchestrator.frame_number(), 1);
    assert_eq!(harness.surface.presented, 1);
}

#[test]
fn test_still_camera_skips_shadows_and_cluster_build() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame().unwrap();
    harness.frame().unwrap();

    assert_eq!(
        harness.orchestrator.phases(),
        &[
            FramePhase::EarlyDepthCull,
            FramePhase::CullBarrier,
            FramePhase::EarlyDepthPass,
            FramePhase::LightCull,
            FramePhase::GeometryPass,
            FramePhase::PostProcess,
            FramePhase::DepthPyramidReduce,
        ]
    );
    assert_eq!(harness.orchestrator.stats().shadow_drawcall_count, 0);

    // A new sun direction recomputes the cascades even with a still camera.
    harness.sun.direction = Vec3::new(0.4, -1.0, 0.0);
    harness.frame().unwrap();
    assert!(harness
        .orchestrator
        .phases()
        .contains(&FramePhase::ShadowPass));
}

#[test]
fn test_disabled_shadows_never_cull_the_shadow_bucket() {
    let settings = RenderSettings {
        shadows: false,
        ..Default::default()
    };
    let mut harness = Harness::new(settings);
    harness.frame().unwrap();

    let phases = harness.orchestrator.phases();
    assert!(!phases.contains(&FramePhase::ShadowCull));
    assert!(!phases.contains(&FramePhase::ShadowPass));
    let culls = positions(&harness.device.log(), |c| {
        matches!(c, Command::BeginComputePass { label } if label == "Visibility Cull")
    });
    assert_eq!(culls.len(), 1);
}

#[test]
fn test_cull_barriers_are_batched_between_culls_and_draws() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame().unwrap();
    let log = harness.device.log();

    let early = *harness
        .orchestrator
        .batches()
        .bucket(PassType::EarlyDepth)
        .unwrap();
    let shadow = *harness.orchestrator.batches().bucket(PassType::Shadow).unwrap();
    let expected = vec![
        Barrier::cull_to_indirect(early.indirect_buffer),
        Barrier::cull_to_indirect(shadow.indirect_buffer),
    ];

    let culls = positions(&log, |c| {
        matches!(c, Command::BeginComputePass { label } if label == "Visibility Cull")
    });
    let cull_barriers = positions(&log, |c| *c == Command::Barrier(expected.clone()));
    let first_draw_pass = positions(&log, |c| matches!(c, Command::BeginRenderPass { .. }))[0];

    assert_eq!(culls.len(), 2);
    assert_eq!(cull_barriers.len(), 1);
    assert!(culls.iter().all(|&c| c < cull_barriers[0]));
    assert!(cull_barriers[0] < first_draw_pass);

    // Nothing but the two cull dispatches precedes the barrier.
    let dispatches_before = positions(&log[..cull_barriers[0]], |c| {
        matches!(c, Command::Dispatch { .. })
    });
    assert_eq!(dispatches_before.len(), 2);
}

#[test]
fn test_frame_is_submitted_once() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame().unwrap();
    let log = harness.device.log();

    let submits = positions(&log, |c| matches!(c, Command::Submit(_)));
    assert_eq!(submits, vec![log.len() - 1]);
}

#[test]
fn test_stats_count_draws_per_bucket() {
    let mut harness = Harness::new(RenderSettings::default());
    let stats = harness.frame().unwrap();

    assert_eq!(stats.drawcall_count, 4);
    assert_eq!(stats.triangle_count, 8);
    assert_eq!(stats.shadow_drawcall_count, 3 * 4);
    assert_eq!(stats.bucket(PassType::EarlyDepth).draw_calls, 3);
    assert_eq!(stats.bucket(PassType::Forward).draw_calls, 3);
    assert_eq!(stats.bucket(PassType::Transparency).draw_calls, 1);
    assert_eq!(stats.bucket(PassType::Shadow).triangles, 3 * 2 * 4);

    let indirect_draws = positions(&harness.device.log(), |c| {
        matches!(c, Command::MultiDrawIndirect { .. })
    });
    // Prepass, four cascades, then one opaque and one transparent run.
    assert_eq!(indirect_draws.len(), 1 + 4 + 2);
}

#[test]
fn test_transparent_run_draws_past_the_opaque_prefix() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame().unwrap();
    let early = *harness
        .orchestrator
        .batches()
        .bucket(PassType::EarlyDepth)
        .unwrap();

    let geometry_draws: Vec<Command> = harness
        .device
        .log()
        .into_iter()
        .skip_while(|c| !matches!(c, Command::BeginRenderPass { label } if label == "Geometry Pass"))
        .filter(|c| matches!(c, Command::MultiDrawIndirect { .. }))
        .collect();
    assert_eq!(
        geometry_draws,
        vec![
            Command::MultiDrawIndirect {
                buffer: early.indirect_buffer,
                offset: 0,
                count: 3
            },
            Command::MultiDrawIndirect {
                buffer: early.indirect_buffer,
                offset: 3 * 20,
                count: 1
            },
        ]
    );
}

#[test]
fn test_readback_returns_the_bucket_records() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.orchestrator.request_readback(PassType::EarlyDepth);
    harness.frame().unwrap();

    let phases = harness.orchestrator.phases();
    let barrier = phases.iter().position(|p| *p == FramePhase::CullBarrier);
    let readback = phases.iter().position(|p| *p == FramePhase::DebugReadback);
    assert_eq!(readback, barrier.map(|b| b + 1));

    // The mock never runs the cull, so every record is still hidden.
    let (pass, records) = harness.orchestrator.last_readback().unwrap();
    assert_eq!(pass, PassType::EarlyDepth);
    assert_eq!(records.len(), 4);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.instance_count, 0);
        assert_eq!(record.first_instance, i as u32);
        assert_eq!(record.index_count, 6);
    }

    // One-shot.
    harness.frame().unwrap();
    assert!(!harness
        .orchestrator
        .phases()
        .contains(&FramePhase::DebugReadback));
}

#[test]
fn test_light_counters_are_read_on_request() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.orchestrator.request_light_counters();
    harness.frame().unwrap();

    assert!(harness
        .orchestrator
        .phases()
        .contains(&FramePhase::CounterReadback));
    let counters = harness.orchestrator.light_counters().unwrap();
    assert_eq!(counters.overflow, 0);
}

#[test]
fn test_outdated_surface_is_rebuilt_and_retried() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame().unwrap();
    harness.surface.fail_next(SurfaceError::Outdated);

    harness.frame().unwrap();
    assert_eq!(harness.surface.reconfigures, 1);
    assert_eq!(harness.surface.presented, 2);
    // The cluster bounds follow the rebuilt targets.
    assert!(harness
        .orchestrator
        .phases()
        .contains(&FramePhase::ClusterBuild));
}

#[test]
fn test_second_acquire_failure_fails_the_frame() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.surface.fail_next(SurfaceError::Lost);
    harness.surface.fail_next(SurfaceError::Lost);

    let err = harness.frame().unwrap_err();
    assert!(matches!(err, FrameError::Surface(SurfaceError::Lost)));
    assert!(!err.is_fatal());
    assert_eq!(harness.orchestrator.frame_number(), 0);

    harness.frame().unwrap();
    assert_eq!(harness.orchestrator.frame_number(), 1);
}

#[test]
fn test_timeout_errors_are_not_recovered() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.surface.fail_next(SurfaceError::Timeout);
    assert!(matches!(
        harness.frame(),
        Err(FrameError::Surface(SurfaceError::Timeout))
    ));
    assert_eq!(harness.surface.reconfigures, 0);
}

#[test]
fn test_stalled_slot_is_fatal() {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame().unwrap();
    harness.frame().unwrap();
    harness.device.stall();

    // The third frame reuses the first slot and waits on its submission.
    let err = harness.frame().unwrap_err();
    assert!(matches!(err, FrameError::DeviceTimeout { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_resize_rebuilds_targets() -> anyhow::Result<()> {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame()?;
    harness
        .orchestrator
        .handle_resize(&harness.device, &mut harness.surface, Some((800, 600)))?;
    assert_eq!(harness.surface.extent, (800, 600));

    harness.frame()?;
    assert!(harness
        .orchestrator
        .phases()
        .contains(&FramePhase::ClusterBuild));
    Ok(())
}

#[test]
fn test_shader_failure_is_a_fatal_initialization_error() {
    let device = MockDevice::with_failing_shaders();
    let surface = MockSurface::new(640, 480);
    let mut orchestrator = FrameOrchestrator::new(RenderSettings::default(), surface.format());

    let err = orchestrator.initialize(&device, &surface).unwrap_err();
    assert!(matches!(err, FrameError::Initialization { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_rejected_pipeline_is_a_fatal_initialization_error() {
    let device = MockDevice::with_failing_pipeline("reduce_from_depth");
    let surface = MockSurface::new(640, 480);
    let mut orchestrator = FrameOrchestrator::new(RenderSettings::default(), surface.format());

    let err = orchestrator.initialize(&device, &surface).unwrap_err();
    match &err {
        FrameError::Initialization { lane, source } => {
            assert_eq!(*lane, "DepthPyramid");
            assert!(matches!(
                source,
                LaneError::Resource(ResourceError::Pipeline(PipelineError::CompilationFailed { .. }))
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_fatal());
}

#[test]
fn test_unload_releases_the_scene() -> anyhow::Result<()> {
    let mut harness = Harness::new(RenderSettings::default());
    harness.frame()?;
    harness.orchestrator.unload_scene(&harness.device)?;

    assert!(!harness.orchestrator.batches().is_uploaded());
    assert!(matches!(harness.frame(), Err(FrameError::Batch(_))));
    Ok(())
}
