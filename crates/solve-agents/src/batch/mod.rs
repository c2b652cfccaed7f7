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

//! The batch/indirect-buffer manager.
//!
//! A scene is loaded in four steps, once:
//!
//! 1. [`SceneBatches::register`] splits the surfaces into the render pass
//!    buckets (forward, transparency, shadow, early depth).
//! 2. [`SceneBatches::merge`] copies every surface's vertices and indices into
//!    one merged vertex buffer and one merged index buffer and builds the
//!    model information buffer.
//! 3. [`SceneBatches::build_batches`] refreshes the four passes concurrently.
//! 4. [`SceneBatches::upload`] creates each bucket's indirect, object and
//!    clear buffers.
//!
//! From then on the culler owns the `instance_count` field of every indirect
//! record; the merged buffers are read-only.

mod mesh_pass;

pub use mesh_pass::*;

use crate::error::BatchError;
use solve_core::renderer::config::FENCE_TIMEOUT;
use solve_core::renderer::gpu_types::{
    DrawIndexedIndirect, GpuModelInformation, PassObject, Vertex,
};
use solve_core::renderer::{BufferDescriptor, BufferId, BufferUsage, GraphicsDevice};
use solve_core::scene::{MaterialHandle, MaterialPass, RenderObject};
use solve_lanes::{BucketBuffers, DrawRange, SceneGeometry};
use std::mem::size_of;

const VERTEX_SIZE: u64 = size_of::<Vertex>() as u64;
const INDEX_SIZE: u64 = size_of::<u32>() as u64;
const COMMAND_SIZE: u64 = size_of::<DrawIndexedIndirect>() as u64;

#[derive(Debug, Clone, Copy)]
struct DeviceBucket {
    buffers: BucketBuffers,
    clear_buffer: BufferId,
}

/// Owns the batched representation of one loaded scene.
#[derive(Debug)]
pub struct SceneBatches {
    renderables: Vec<RenderObject>,
    forward_count: u32,
    models: Vec<GpuModelInformation>,
    passes: [MeshPass; 4],
    geometry: Option<SceneGeometry>,
    buckets: [Option<DeviceBucket>; 4],
}

impl Default for SceneBatches {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBatches {
    /// An empty manager.
    pub fn new() -> Self {
        Self {
            renderables: Vec::new(),
            forward_count: 0,
            models: Vec::new(),
            passes: PassType::ALL.map(MeshPass::new),
            geometry: None,
            buckets: [None; 4],
        }
    }

    /// Splits `objects` into buckets. Opaque surfaces keep their relative
    /// order in front of the transparent ones; that order is the model index
    /// order of the scene.
    pub fn register(&mut self, objects: &[RenderObject]) -> Result<(), BatchError> {
        if self.geometry.is_some() || self.is_uploaded() {
            return Err(BatchError::AlreadyMerged);
        }
        let (opaque, transparent): (Vec<RenderObject>, Vec<RenderObject>) = objects
            .iter()
            .copied()
            .partition(|o| o.material.pass == MaterialPass::MainColor);

        self.forward_count = opaque.len() as u32;
        self.renderables = opaque;
        self.renderables.extend(transparent);
        self.models.clear();

        let total = self.renderables.len() as u32;
        let forward = self.forward_count;
        for pass in &mut self.passes {
            let range = match pass.pass_type() {
                PassType::Forward | PassType::Shadow => 0..forward,
                PassType::Transparency => forward..total,
                PassType::EarlyDepth => 0..total,
            };
            pass.set_objects(range.collect());
        }
        log::info!(
            "SceneBatches: registered {} surfaces ({} opaque, {} transparent)",
            total,
            forward,
            total - forward
        );
        Ok(())
    }

    /// Merges the registered geometry into shared device buffers.
    ///
    /// Each surface's `first_vertex`/`first_index` is the running total of
    /// the vertex/index counts of the surfaces before it. The copies run in
    /// one submission that is waited on before returning.
    pub fn merge(&mut self, device: &dyn GraphicsDevice) -> Result<(), BatchError> {
        if self.is_uploaded() {
            return Err(BatchError::AlreadyMerged);
        }
        let (models, total_vertices, total_indices) = merged_layout(&self.renderables);
        if total_vertices == 0 || total_indices == 0 {
            return Err(BatchError::EmptyScene);
        }
        self.release_geometry(device);

        let vertex_buffer = device.create_buffer(&BufferDescriptor::new(
            "Merged Vertex Buffer",
            total_vertices * VERTEX_SIZE,
            BufferUsage::STORAGE | BufferUsage::VERTEX | BufferUsage::COPY_DST,
        ))?;
        let index_buffer = device.create_buffer(&BufferDescriptor::new(
            "Merged Index Buffer",
            total_indices * INDEX_SIZE,
            BufferUsage::INDEX | BufferUsage::COPY_DST,
        ))?;
        let model_buffer = device.create_buffer_with_data(
            &BufferDescriptor::new(
                "Model Information",
                (models.len() * size_of::<GpuModelInformation>()) as u64,
                BufferUsage::STORAGE | BufferUsage::COPY_DST,
            ),
            bytemuck::cast_slice(&models),
        )?;
        self.geometry = Some(SceneGeometry {
            vertex_buffer,
            index_buffer,
            model_buffer,
        });

        let mut encoder = device.create_command_encoder(Some("Merge Meshes"));
        for (object, model) in self.renderables.iter().zip(&models) {
            let mesh = &object.mesh;
            encoder.copy_buffer_to_buffer(
                mesh.vertex_buffer,
                mesh.first_vertex as u64 * VERTEX_SIZE,
                vertex_buffer,
                model.first_vertex as u64 * VERTEX_SIZE,
                mesh.vertex_count as u64 * VERTEX_SIZE,
            );
            encoder.copy_buffer_to_buffer(
                mesh.index_buffer,
                mesh.first_index as u64 * INDEX_SIZE,
                index_buffer,
                model.first_index as u64 * INDEX_SIZE,
                mesh.index_count as u64 * INDEX_SIZE,
            );
        }
        let submission = device.submit_command_buffer(encoder.finish())?;
        device.wait_for_submission(submission, FENCE_TIMEOUT)?;

        log::info!(
            "SceneBatches: merged {} surfaces into {} vertices / {} indices",
            models.len(),
            total_vertices,
            total_indices
        );
        self.models = models;
        Ok(())
    }

    /// Refreshes every pass concurrently, one scoped thread per pass.
    pub fn build_batches(&mut self) -> Result<(), BatchError> {
        if self.geometry.is_none() {
            return Err(BatchError::NotMerged);
        }
        let materials: Vec<MaterialHandle> =
            self.renderables.iter().map(|r| r.material).collect();
        let (tx, rx) = crossbeam_channel::unbounded();

        std::thread::scope(|scope| {
            for pass in &self.passes {
                let tx = tx.clone();
                let models = &self.models;
                let materials = &materials;
                scope.spawn(move || {
                    let _ = tx.send((pass.pass_type(), pass.refresh(models, materials)));
                });
            }
        });
        drop(tx);

        let mut refreshed = [false; 4];
        for (pass_type, batches) in rx.iter() {
            self.passes[pass_type.index()].apply(batches);
            refreshed[pass_type.index()] = true;
        }
        if let Some(missing) = PassType::ALL.iter().find(|p| !refreshed[p.index()]) {
            return Err(BatchError::RefreshFailed(missing.name()));
        }

        for pass in &self.passes {
            log::debug!(
                "SceneBatches: {} pass has {} records in {} batches",
                pass.pass_type(),
                pass.len(),
                pass.batches().len()
            );
        }
        Ok(())
    }

    /// Creates the device buffers of every bucket. After this call the
    /// scene geometry can no longer be merged.
    pub fn upload(&mut self, device: &dyn GraphicsDevice) -> Result<(), BatchError> {
        if self.geometry.is_none() {
            return Err(BatchError::NotMerged);
        }
        if let Some(pass) = self.passes.iter().find(|p| p.records().len() != p.len()) {
            return Err(BatchError::RefreshFailed(pass.pass_type().name()));
        }
        self.release_buckets(device);

        for pass in &self.passes {
            let mut commands = pass.commands();
            let mut objects = pass.pass_objects();
            // Bindings may not be empty.
            if commands.is_empty() {
                commands.push(DrawIndexedIndirect::default());
                objects.push(PassObject::default());
            }
            let command_bytes: &[u8] = bytemuck::cast_slice(&commands);

            let indirect_buffer = device.create_buffer_with_data(
                &BufferDescriptor::new(
                    "Draw Indirect Buffer",
                    command_bytes.len() as u64,
                    BufferUsage::STORAGE
                        | BufferUsage::INDIRECT
                        | BufferUsage::COPY_SRC
                        | BufferUsage::COPY_DST,
                ),
                command_bytes,
            )?;
            let object_buffer = device.create_buffer_with_data(
                &BufferDescriptor::new(
                    "Pass Objects",
                    (objects.len() * size_of::<PassObject>()) as u64,
                    BufferUsage::STORAGE | BufferUsage::COPY_DST,
                ),
                bytemuck::cast_slice(&objects),
            )?;
            let clear_buffer = device.create_buffer_with_data(
                &BufferDescriptor::new(
                    "Clear Indirect Buffer",
                    command_bytes.len() as u64,
                    BufferUsage::COPY_SRC,
                ),
                command_bytes,
            )?;

            self.buckets[pass.pass_type().index()] = Some(DeviceBucket {
                buffers: BucketBuffers {
                    indirect_buffer,
                    object_buffer,
                    draw_count: pass.len() as u32,
                },
                clear_buffer,
            });
        }
        log::info!("SceneBatches: uploaded {} buckets", self.buckets.len());
        Ok(())
    }

    /// Restores a bucket's indirect records to their initial state (every
    /// instance hidden).
    pub fn clear_indirect_buffers(
        &self,
        device: &dyn GraphicsDevice,
        pass: PassType,
    ) -> Result<(), BatchError> {
        let bucket = self.buckets[pass.index()].ok_or(BatchError::NotUploaded)?;
        if bucket.buffers.draw_count == 0 {
            return Ok(());
        }
        let mut encoder = device.create_command_encoder(Some("Clear Indirect"));
        encoder.copy_buffer_to_buffer(
            bucket.clear_buffer,
            0,
            bucket.buffers.indirect_buffer,
            0,
            bucket.buffers.draw_count as u64 * COMMAND_SIZE,
        );
        let submission = device.submit_command_buffer(encoder.finish())?;
        device.wait_for_submission(submission, FENCE_TIMEOUT)?;
        Ok(())
    }

    /// The geometry pass's draw ranges over the early-depth bucket: the
    /// forward runs first, then the transparent runs shifted past the opaque
    /// prefix.
    pub fn geometry_draw_ranges(&self) -> Vec<DrawRange> {
        let shifted = |pass: PassType, offset: u32| {
            self.passes[pass.index()]
                .multibatches()
                .iter()
                .map(move |m| DrawRange {
                    first: m.first + offset,
                    count: m.count,
                    pass: m.pass,
                })
        };
        shifted(PassType::Forward, 0)
            .chain(shifted(PassType::Transparency, self.forward_count))
            .collect()
    }

    /// The merged geometry, once merged.
    pub fn geometry(&self) -> Option<&SceneGeometry> {
        self.geometry.as_ref()
    }

    /// A bucket's device buffers, once uploaded.
    pub fn bucket(&self, pass: PassType) -> Option<&BucketBuffers> {
        self.buckets[pass.index()].as_ref().map(|b| &b.buffers)
    }

    /// A bucket's host state.
    pub fn mesh_pass(&self, pass: PassType) -> &MeshPass {
        &self.passes[pass.index()]
    }

    /// Per-instance model information, once merged.
    pub fn models(&self) -> &[GpuModelInformation] {
        &self.models
    }

    /// Registered surfaces in model index order.
    pub fn renderables(&self) -> &[RenderObject] {
        &self.renderables
    }

    /// Number of opaque surfaces: the opaque prefix of the early-depth
    /// bucket.
    pub fn forward_count(&self) -> u32 {
        self.forward_count
    }

    /// Whether the buckets were handed to the culler.
    pub fn is_uploaded(&self) -> bool {
        self.buckets.iter().any(Option::is_some)
    }

    /// Destroys every scene buffer and forgets the scene.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        self.release_buckets(device);
        self.release_geometry(device);
        *self = Self::new();
    }

    fn release_buckets(&mut self, device: &dyn GraphicsDevice) {
        for bucket in self.buckets.iter_mut().filter_map(Option::take) {
            for buffer in [
                bucket.buffers.indirect_buffer,
                bucket.buffers.object_buffer,
                bucket.clear_buffer,
            ] {
                if let Err(e) = device.destroy_buffer(buffer) {
                    log::warn!("SceneBatches: failed to destroy {buffer:?}: {e}");
                }
            }
        }
    }

    fn release_geometry(&mut self, device: &dyn GraphicsDevice) {
        if let Some(geometry) = self.geometry.take() {
            for buffer in [
                geometry.vertex_buffer,
                geometry.index_buffer,
                geometry.model_buffer,
            ] {
                if let Err(e) = device.destroy_buffer(buffer) {
                    log::warn!("SceneBatches: failed to destroy {buffer:?}: {e}");
                }
            }
        }
    }
}

/// Computes every surface's model information and the merged totals.
fn merged_layout(renderables: &[RenderObject]) -> (Vec<GpuModelInformation>, u64, u64) {
    let mut total_vertices = 0u64;
    let mut total_indices = 0u64;
    let models = renderables
        .iter()
        .enumerate()
        .map(|(index, object)| {
            let (center, radius) = object.bounds.world_sphere(&object.transform);
            let model = GpuModelInformation {
                local_transform: object.transform.to_cols_array_2d(),
                sphere_bounds: [center.x, center.y, center.z, radius],
                texture_index: object.material.index,
                first_index: total_indices as u32,
                index_count: object.mesh.index_count,
                first_vertex: total_vertices as u32,
                vertex_count: object.mesh.vertex_count,
                first_instance: index as u32,
                vertex_buffer_address: total_vertices * VERTEX_SIZE,
                _pad: [0.0; 4],
            };
            total_vertices += object.mesh.vertex_count as u64;
            total_indices += object.mesh.index_count as u64;
            model
        })
        .collect();
    (models, total_vertices, total_indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solve_core::math::{Aabb, Bounds, Mat4, Vec3};
    use solve_core::scene::MeshBufferHandle;

    fn object(vertices: u32, indices: u32, material: MaterialHandle) -> RenderObject {
        RenderObject {
            mesh: MeshBufferHandle {
                vertex_buffer: BufferId(1),
                first_vertex: 0,
                vertex_count: vertices,
                index_buffer: BufferId(2),
                first_index: 0,
                index_count: indices,
            },
            material,
            transform: Mat4::IDENTITY,
            bounds: Bounds::from_aabb(Aabb::from_min_max(Vec3::splat(-1.0), Vec3::ONE)),
        }
    }

    #[test]
    fn test_register_puts_opaque_first() {
        let mut batches = SceneBatches::new();
        batches
            .register(&[
                object(3, 3, MaterialHandle::transparent(0)),
                object(4, 6, MaterialHandle::opaque(1)),
                object(5, 9, MaterialHandle::opaque(2)),
            ])
            .unwrap();

        assert_eq!(batches.forward_count(), 2);
        assert_eq!(batches.renderables()[0].material.index, 1);
        assert_eq!(batches.mesh_pass(PassType::Forward).flat_objects(), &[0, 1]);
        assert_eq!(batches.mesh_pass(PassType::Transparency).flat_objects(), &[2]);
        assert_eq!(batches.mesh_pass(PassType::Shadow).flat_objects(), &[0, 1]);
        assert_eq!(
            batches.mesh_pass(PassType::EarlyDepth).flat_objects(),
            &[0, 1, 2]
        );
        assert!(!batches.mesh_pass(PassType::Shadow).needs_materials());
        assert!(!batches.mesh_pass(PassType::EarlyDepth).needs_materials());
    }

    #[test]
    fn test_merged_offsets_are_running_totals() {
        let m = MaterialHandle::opaque(0);
        let (models, vertices, indices) =
            merged_layout(&[object(4, 12, m), object(6, 18, m), object(3, 9, m)]);
        let firsts: Vec<(u32, u32)> = models
            .iter()
            .map(|m| (m.first_vertex, m.first_index))
            .collect();
        assert_eq!(firsts, vec![(0, 0), (4, 12), (10, 30)]);
        assert_eq!((vertices, indices), (13, 39));
        assert_eq!(models[2].vertex_buffer_address, 10 * VERTEX_SIZE);
        assert_eq!(models[1].first_instance, 1);
    }

    #[test]
    fn test_build_requires_merge() {
        let mut batches = SceneBatches::new();
        assert!(matches!(batches.build_batches(), Err(BatchError::NotMerged)));
    }
}
