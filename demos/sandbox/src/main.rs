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

// Solve Sandbox
// Renders a synthetic scene headless and logs per-frame statistics.
//
// Usage: sandbox [settings.ron] [frame count]

use std::path::Path;

use anyhow::{Context, Result};
use solve_agents::{FrameInputs, FrameOrchestrator, PassType};
use solve_core::math::{Aabb, Bounds, Mat4, Quat, Vec3};
use solve_core::renderer::config::RenderSettings;
use solve_core::renderer::gpu_types::Vertex;
use solve_core::renderer::{
    BufferDescriptor, BufferUsage, GraphicsDevice, RenderSurface, TextureFormat,
};
use solve_core::scene::{
    CameraState, DirectionalLight, MaterialHandle, MeshBufferHandle, PointLight, RenderObject,
    ShadowCascades,
};
use solve_infra::{OffscreenSurface, WgpuContext, WgpuDevice};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const DEFAULT_FRAMES: u64 = 240;
const GRID: i32 = 12;
const SPACING: f32 = 4.0;

/// A unit cube with per-face normals.
fn cube_geometry() -> (Vec<Vertex>, Vec<u32>) {
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
        (Vec3::Z, Vec3::Y, Vec3::NEG_X),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, up, right) in faces {
        let base = vertices.len() as u32;
        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = normal + right * u + up * v;
            vertices.push(Vertex {
                position: position.to_array(),
                uv_x: (u + 1.0) * 0.5,
                normal: normal.to_array(),
                uv_y: (v + 1.0) * 0.5,
                color: [1.0; 4],
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

fn upload_mesh(device: &dyn GraphicsDevice) -> Result<MeshBufferHandle> {
    let (vertices, indices) = cube_geometry();
    let vertex_buffer = device.create_buffer_with_data(
        &BufferDescriptor::new("Cube Vertices", 0, BufferUsage::COPY_SRC),
        bytemuck::cast_slice(&vertices),
    )?;
    let index_buffer = device.create_buffer_with_data(
        &BufferDescriptor::new("Cube Indices", 0, BufferUsage::COPY_SRC),
        bytemuck::cast_slice(&indices),
    )?;
    Ok(MeshBufferHandle {
        vertex_buffer,
        first_vertex: 0,
        vertex_count: vertices.len() as u32,
        index_buffer,
        first_index: 0,
        index_count: indices.len() as u32,
    })
}

/// A grid of cubes on a ground slab. Every seventh cube is transparent.
fn build_scene(mesh: MeshBufferHandle) -> Vec<RenderObject> {
    let bounds = Bounds::from_aabb(Aabb::from_min_max(Vec3::splat(-1.0), Vec3::ONE));
    let mut objects = vec![RenderObject {
        mesh,
        material: MaterialHandle::opaque(0),
        transform: Mat4::from_scale_rotation_translation(
            Vec3::new(GRID as f32 * SPACING, 0.5, GRID as f32 * SPACING),
            Quat::IDENTITY,
            Vec3::new(0.0, -1.5, 0.0),
        ),
        bounds,
    }];
    for x in -GRID / 2..GRID / 2 {
        for z in -GRID / 2..GRID / 2 {
            let i = objects.len() as u32;
            let material = if i % 7 == 0 {
                MaterialHandle::transparent(i % 3)
            } else {
                MaterialHandle::opaque(1 + i % 3)
            };
            let height = 1.0 + ((x * z).rem_euclid(5)) as f32 * 0.5;
            objects.push(RenderObject {
                mesh,
                material,
                transform: Mat4::from_scale_rotation_translation(
                    Vec3::new(1.0, height, 1.0),
                    Quat::from_rotation_y(i as f32 * 0.3),
                    Vec3::new(x as f32 * SPACING, height - 1.0, z as f32 * SPACING),
                ),
                bounds,
            });
        }
    }
    objects
}

fn point_lights() -> Vec<PointLight> {
    (0..32)
        .map(|i| {
            let angle = i as f32 / 32.0 * std::f32::consts::TAU;
            let radius = 8.0 + (i % 4) as f32 * 6.0;
            let color = Vec3::new(
                0.5 + 0.5 * angle.cos(),
                0.5 + 0.5 * (angle + 2.1).cos(),
                0.5 + 0.5 * (angle + 4.2).cos(),
            );
            PointLight::new(
                Vec3::new(radius * angle.cos(), 2.0, radius * angle.sin()),
                color,
                10.0,
                2.0,
            )
        })
        .collect()
}

fn load_settings(path: Option<&str>) -> Result<RenderSettings> {
    let Some(path) = path else {
        return Ok(RenderSettings::default());
    };
    let text = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read render settings from '{path}'"))?;
    let settings = ron::from_str(&text)
        .with_context(|| format!("Failed to parse render settings in '{path}'"))?;
    log::info!("Loaded render settings from '{path}'");
    Ok(settings)
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let settings = load_settings(args.first().map(String::as_str))?;
    let frames: u64 = match args.get(1) {
        Some(count) => count
            .parse()
            .with_context(|| format!("Invalid frame count '{count}'"))?,
        None => DEFAULT_FRAMES,
    };
    log::info!("Render settings: {settings:?}");

    let device = WgpuDevice::new(WgpuContext::new_headless()?);
    let mut surface = OffscreenSurface::new(WIDTH, HEIGHT, TextureFormat::Rgba8UnormSrgb);

    let mut orchestrator = FrameOrchestrator::new(settings, surface.format());
    orchestrator.initialize(&device, &surface)?;

    let mesh = upload_mesh(&device)?;
    let objects = build_scene(mesh);
    orchestrator.load_scene(&device, &objects)?;

    let lights = point_lights();
    let sun = DirectionalLight {
        direction: Vec3::new(-0.4, -1.0, -0.3).normalize(),
        color: Vec3::new(1.0, 0.95, 0.9),
        intensity: 3.0,
    };
    let target = Vec3::ZERO;
    let mut camera = CameraState::look_at(
        Vec3::new(0.0, 12.0, 40.0),
        target,
        WIDTH as f32 / HEIGHT as f32,
    );

    for frame in 0..frames {
        let angle = frame as f32 * 0.01;
        camera.move_to(Vec3::new(40.0 * angle.sin(), 12.0, 40.0 * angle.cos()), target);

        // Exercise the resize path halfway through.
        if frame == frames / 2 {
            orchestrator.handle_resize(&device, &mut surface, Some((WIDTH / 2, HEIGHT / 2)))?;
            let (width, height) = surface.extent();
            camera.set_aspect(width as f32 / height as f32);
        }
        if frame == 1 {
            orchestrator.request_readback(PassType::EarlyDepth);
            orchestrator.request_light_counters();
        }

        let cascades = ShadowCascades::fit(&camera, sun.direction, 0.8);
        let inputs = FrameInputs {
            camera: &camera,
            point_lights: &lights,
            sun: Some(&sun),
            cascades: &cascades,
        };
        match orchestrator.render_frame(&device, &mut surface, &inputs) {
            Ok(stats) => {
                if frame % 60 == 0 {
                    log::info!("[frame {frame}] {stats}");
                }
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => log::warn!("[frame {frame}] skipped: {e}"),
        }
        camera.updated = false;

        if frame == 1 {
            if let Some((pass, records)) = orchestrator.last_readback() {
                let visible = records.iter().filter(|r| r.instance_count > 0).count();
                log::info!(
                    "{pass:?} cull kept {visible} of {} records",
                    records.len()
                );
            }
            if let Some(counters) = orchestrator.light_counters() {
                log::info!("Light counters: {counters:?}");
            }
        }
    }

    orchestrator.shutdown(&device);
    log::info!(
        "Rendered {} frames, presented {}",
        orchestrator.frame_number(),
        surface.presented()
    );
    Ok(())
}
