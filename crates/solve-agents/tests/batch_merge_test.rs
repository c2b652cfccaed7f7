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

use anyhow::Context;
use approx::assert_relative_eq;

use common::{decode, mesh, object, MockDevice};
use solve_agents::{BatchError, PassType, SceneBatches};
use solve_core::math::Vec3;
use solve_core::renderer::gpu_types::{DrawIndexedIndirect, PassObject, Vertex};
use solve_core::renderer::GraphicsDevice;
use solve_core::scene::{MaterialHandle, MaterialPass, RenderObject};

fn three_meshes(device: &MockDevice) -> Vec<RenderObject> {
    [(1.0, 4, 12), (2.0, 6, 18), (3.0, 3, 9)]
        .into_iter()
        .enumerate()
        .map(|(i, (tag, vertices, indices))| {
            object(
                mesh(device, tag, vertices, indices),
                MaterialHandle::opaque(0),
                Vec3::new(i as f32 * 4.0, 0.0, 0.0),
            )
        })
        .collect()
}

fn loaded(device: &MockDevice, objects: &[RenderObject]) -> SceneBatches {
    let mut batches = SceneBatches::new();
    batches.register(objects).unwrap();
    batches.merge(device).unwrap();
    batches.build_batches().unwrap();
    batches.upload(device).unwrap();
    batches
}

#[test]
fn test_merge_assigns_running_offsets() -> anyhow::Result<()> {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let mut batches = SceneBatches::new();
    batches.register(&objects)?;
    batches.merge(&device)?;

    let offsets: Vec<(u32, u32)> = batches
        .models()
        .iter()
        .map(|m| (m.first_vertex, m.first_index))
        .collect();
    assert_eq!(offsets, vec![(0, 0), (4, 12), (10, 30)]);
    for (i, model) in batches.models().iter().enumerate() {
        assert_eq!(model.first_instance, i as u32);
        assert_eq!(model.vertex_buffer_address, model.first_vertex as u64 * 48);
        // Unit cube bounds moved by the object's translation.
        assert_relative_eq!(model.sphere_bounds[0], i as f32 * 4.0);
        assert_relative_eq!(model.sphere_bounds[3], 3f32.sqrt(), epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn test_merged_buffers_hold_each_surface_at_its_offset() -> anyhow::Result<()> {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let mut batches = SceneBatches::new();
    batches.register(&objects)?;
    batches.merge(&device)?;
    let geometry = *batches.geometry().context("merge left no geometry")?;

    let vertex_bytes = device
        .contents(geometry.vertex_buffer)
        .context("merged vertex buffer missing")?;
    assert_eq!(vertex_bytes.len(), 13 * std::mem::size_of::<Vertex>());
    let vertices: Vec<Vertex> = decode(&vertex_bytes);
    assert_eq!((vertices[0].uv_x, vertices[0].uv_y), (1.0, 0.0));
    assert_eq!((vertices[4].uv_x, vertices[4].uv_y), (2.0, 0.0));
    assert_eq!((vertices[9].uv_x, vertices[9].uv_y), (2.0, 5.0));
    assert_eq!((vertices[10].uv_x, vertices[10].uv_y), (3.0, 0.0));

    // Indices stay local to their surface; the draw's vertex offset rebases them.
    let index_bytes = device
        .contents(geometry.index_buffer)
        .context("merged index buffer missing")?;
    let indices: Vec<u32> = decode(&index_bytes);
    assert_eq!(indices.len(), 39);
    assert_eq!(&indices[12..18], &[0, 1, 2, 3, 4, 5]);
    assert_eq!(&indices[30..33], &[0, 1, 2]);

    let model_bytes = device
        .contents(geometry.model_buffer)
        .context("model buffer missing")?;
    assert_eq!(
        model_bytes.as_slice(),
        bytemuck::cast_slice::<_, u8>(batches.models())
    );
    Ok(())
}

#[test]
fn test_merge_is_one_waited_submission() {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let mut batches = SceneBatches::new();
    batches.register(&objects).unwrap();
    batches.merge(&device).unwrap();

    assert_eq!(device.submissions(), 1);
    assert_eq!(device.waits(), 1);
    let copies = device
        .log()
        .iter()
        .filter(|c| matches!(c, common::Command::Copy { .. }))
        .count();
    assert_eq!(copies, 6);
}

#[test]
fn test_register_orders_opaque_before_transparent() {
    let device = MockDevice::new();
    let glass = mesh(&device, 9.0, 3, 3);
    let rock = mesh(&device, 1.0, 3, 3);
    let objects = [
        object(glass, MaterialHandle::transparent(2), Vec3::ZERO),
        object(rock, MaterialHandle::opaque(0), Vec3::X),
        object(rock, MaterialHandle::opaque(1), Vec3::Y),
    ];
    let batches = loaded(&device, &objects);

    assert_eq!(batches.forward_count(), 2);
    let passes: Vec<MaterialPass> = batches
        .renderables()
        .iter()
        .map(|r| r.material.pass)
        .collect();
    assert_eq!(
        passes,
        vec![
            MaterialPass::MainColor,
            MaterialPass::MainColor,
            MaterialPass::Transparent
        ]
    );
    assert_eq!(batches.mesh_pass(PassType::Forward).flat_objects(), &[0, 1]);
    assert_eq!(batches.mesh_pass(PassType::Shadow).flat_objects(), &[0, 1]);
    assert_eq!(batches.mesh_pass(PassType::Transparency).flat_objects(), &[2]);
    assert_eq!(
        batches.mesh_pass(PassType::EarlyDepth).flat_objects(),
        &[0, 1, 2]
    );
}

#[test]
fn test_uploaded_records_start_hidden() {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let batches = loaded(&device, &objects);

    let bucket = batches.bucket(PassType::EarlyDepth).unwrap();
    assert_eq!(bucket.draw_count, 3);
    let bytes = device.contents(bucket.indirect_buffer).unwrap();
    let records: Vec<DrawIndexedIndirect> = decode(&bytes);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.instance_count, 0);
        assert_eq!(record.first_instance, i as u32);
        assert_eq!(record.first_index, batches.models()[i].first_index);
        assert_eq!(record.vertex_offset, batches.models()[i].first_vertex as i32);
    }

    let objects_bytes = device.contents(bucket.object_buffer).unwrap();
    let pass_objects: Vec<PassObject> = decode(&objects_bytes);
    assert_eq!(
        pass_objects.iter().map(|o| o.model_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn test_empty_bucket_gets_a_placeholder_record() {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let batches = loaded(&device, &objects);

    let bucket = batches.bucket(PassType::Transparency).unwrap();
    assert_eq!(bucket.draw_count, 0);
    let bytes = device.contents(bucket.indirect_buffer).unwrap();
    assert_eq!(bytes.len(), std::mem::size_of::<DrawIndexedIndirect>());
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn test_clear_restores_the_hidden_records() {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let batches = loaded(&device, &objects);
    let bucket = *batches.bucket(PassType::Forward).unwrap();
    let initial = device.contents(bucket.indirect_buffer).unwrap();

    let visible = DrawIndexedIndirect {
        index_count: 12,
        instance_count: 1,
        first_index: 0,
        vertex_offset: 0,
        first_instance: 0,
    };
    device
        .write_buffer(bucket.indirect_buffer, 0, bytemuck::bytes_of(&visible))
        .unwrap();
    assert_ne!(device.contents(bucket.indirect_buffer).unwrap(), initial);

    batches
        .clear_indirect_buffers(&device, PassType::Forward)
        .unwrap();
    assert_eq!(device.contents(bucket.indirect_buffer).unwrap(), initial);
}

#[test]
fn test_merge_after_upload_is_rejected() {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let mut batches = loaded(&device, &objects);

    assert!(matches!(
        batches.merge(&device),
        Err(BatchError::AlreadyMerged)
    ));
    assert!(matches!(
        batches.register(&objects),
        Err(BatchError::AlreadyMerged)
    ));
}

#[test]
fn test_empty_scene_cannot_merge() {
    let device = MockDevice::new();
    let mut batches = SceneBatches::new();
    batches.register(&[]).unwrap();
    assert!(matches!(batches.merge(&device), Err(BatchError::EmptyScene)));
    assert!(matches!(
        batches.clear_indirect_buffers(&device, PassType::Forward),
        Err(BatchError::NotUploaded)
    ));
}

#[test]
fn test_geometry_ranges_shift_transparent_runs() {
    let device = MockDevice::new();
    let rock = mesh(&device, 1.0, 3, 3);
    let glass = mesh(&device, 2.0, 3, 3);
    let objects = [
        object(rock, MaterialHandle::opaque(0), Vec3::ZERO),
        object(glass, MaterialHandle::transparent(1), Vec3::ZERO),
        object(rock, MaterialHandle::opaque(0), Vec3::X),
        object(rock, MaterialHandle::opaque(3), Vec3::Y),
    ];
    let batches = loaded(&device, &objects);

    let ranges: Vec<(u32, u32, MaterialPass)> = batches
        .geometry_draw_ranges()
        .iter()
        .map(|r| (r.first, r.count, r.pass))
        .collect();
    assert_eq!(
        ranges,
        vec![
            (0, 3, MaterialPass::MainColor),
            (3, 1, MaterialPass::Transparent)
        ]
    );
}

#[test]
fn test_release_destroys_scene_buffers() {
    let device = MockDevice::new();
    let objects = three_meshes(&device);
    let before = device.live_buffers();
    let mut batches = loaded(&device, &objects);
    let geometry = *batches.geometry().unwrap();
    assert!(device.live_buffers() > before);

    batches.release(&device);
    assert_eq!(device.live_buffers(), before);
    assert!(!device.is_live(geometry.vertex_buffer));
    assert!(!batches.is_uploaded());
    assert!(batches.geometry().is_none());
}
