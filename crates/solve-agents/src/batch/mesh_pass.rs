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

//! Per-pass batching: flat object lists, material batches and the indirect
//! draw records built from them.

use solve_core::renderer::gpu_types::{
    DrawIndexedIndirect, GpuModelInformation, IndirectDrawRecord, PassObject,
};
use solve_core::scene::{MaterialHandle, MaterialPass};
use std::fmt;

/// The render pass buckets of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassType {
    /// Opaque surfaces.
    Forward,
    /// Transparent surfaces.
    Transparency,
    /// Shadow casters (the opaque surfaces).
    Shadow,
    /// Every surface, opaque first.
    EarlyDepth,
}

impl PassType {
    /// Every bucket, in storage order.
    pub const ALL: [PassType; 4] = [
        PassType::Forward,
        PassType::Transparency,
        PassType::Shadow,
        PassType::EarlyDepth,
    ];

    /// Position of the bucket in [`PassType::ALL`].
    pub const fn index(self) -> usize {
        match self {
            PassType::Forward => 0,
            PassType::Transparency => 1,
            PassType::Shadow => 2,
            PassType::EarlyDepth => 3,
        }
    }

    /// Whether draws of this bucket bind materials.
    pub const fn needs_materials(self) -> bool {
        matches!(self, PassType::Forward | PassType::Transparency)
    }

    /// A stable name for labels and logs.
    pub const fn name(self) -> &'static str {
        match self {
            PassType::Forward => "forward",
            PassType::Transparency => "transparency",
            PassType::Shadow => "shadow",
            PassType::EarlyDepth => "early_depth",
        }
    }
}

impl fmt::Display for PassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A contiguous run of records sharing one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectBatch {
    /// Material of the run; `None` in material-less passes.
    pub material: Option<MaterialHandle>,
    /// First record.
    pub first: u32,
    /// Number of records.
    pub count: u32,
}

/// Consecutive batches drawn with one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multibatch {
    /// First record.
    pub first: u32,
    /// Number of records.
    pub count: u32,
    /// Pipeline family of the run.
    pub pass: MaterialPass,
}

/// Output of a pass refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassBatches {
    /// Material batches.
    pub batches: Vec<IndirectBatch>,
    /// Pipeline runs.
    pub multibatches: Vec<Multibatch>,
    /// One record per object, in flat list order.
    pub records: Vec<IndirectDrawRecord>,
}

/// The host half of a render pass bucket.
#[derive(Debug, Clone)]
pub struct MeshPass {
    pass_type: PassType,
    /// Model indices of the pass's objects. The position in this list is the
    /// object ID of a record.
    flat_objects: Vec<u32>,
    batches: PassBatches,
}

impl MeshPass {
    /// An empty pass.
    pub fn new(pass_type: PassType) -> Self {
        Self {
            pass_type,
            flat_objects: Vec::new(),
            batches: PassBatches::default(),
        }
    }

    /// The bucket this pass feeds.
    pub fn pass_type(&self) -> PassType {
        self.pass_type
    }

    /// Whether draws of this pass bind materials.
    pub fn needs_materials(&self) -> bool {
        self.pass_type.needs_materials()
    }

    /// Model index of every object.
    pub fn flat_objects(&self) -> &[u32] {
        &self.flat_objects
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.flat_objects.len()
    }

    /// Returns `true` if the pass holds no object.
    pub fn is_empty(&self) -> bool {
        self.flat_objects.is_empty()
    }

    /// Material batches, valid after a refresh.
    pub fn batches(&self) -> &[IndirectBatch] {
        &self.batches.batches
    }

    /// Pipeline runs, valid after a refresh.
    pub fn multibatches(&self) -> &[Multibatch] {
        &self.batches.multibatches
    }

    /// Indirect draw records, valid after a refresh.
    pub fn records(&self) -> &[IndirectDrawRecord] {
        &self.batches.records
    }

    pub(crate) fn set_objects(&mut self, objects: Vec<u32>) {
        self.flat_objects = objects;
        self.batches = PassBatches::default();
    }

    pub(crate) fn apply(&mut self, batches: PassBatches) {
        self.batches = batches;
    }

    /// Builds batches and records from the merged model information.
    ///
    /// Material-less passes get one batch and one multibatch spanning every
    /// object. Otherwise each run of objects sharing a material becomes a
    /// batch, and consecutive batches of the same pipeline family a
    /// multibatch.
    pub fn refresh(
        &self,
        models: &[GpuModelInformation],
        materials: &[MaterialHandle],
    ) -> PassBatches {
        let count = self.flat_objects.len() as u32;
        let mut out = PassBatches {
            records: Vec::with_capacity(self.flat_objects.len()),
            ..Default::default()
        };
        if count == 0 {
            return out;
        }

        if !self.needs_materials() {
            out.batches.push(IndirectBatch {
                material: None,
                first: 0,
                count,
            });
            out.multibatches.push(Multibatch {
                first: 0,
                count,
                pass: MaterialPass::MainColor,
            });
        } else {
            for (object_id, &model_index) in self.flat_objects.iter().enumerate() {
                let material = materials[model_index as usize];
                match out.batches.last_mut() {
                    Some(batch) if batch.material == Some(material) => batch.count += 1,
                    _ => out.batches.push(IndirectBatch {
                        material: Some(material),
                        first: object_id as u32,
                        count: 1,
                    }),
                }
            }
            for batch in &out.batches {
                let pass = batch.material.map_or(MaterialPass::MainColor, |m| m.pass);
                match out.multibatches.last_mut() {
                    Some(multi) if multi.pass == pass => multi.count += batch.count,
                    _ => out.multibatches.push(Multibatch {
                        first: batch.first,
                        count: batch.count,
                        pass,
                    }),
                }
            }
        }

        let mut batch_id = 0u32;
        for (object_id, &model_index) in self.flat_objects.iter().enumerate() {
            let object_id = object_id as u32;
            while let Some(batch) = out.batches.get(batch_id as usize) {
                if object_id < batch.first + batch.count {
                    break;
                }
                batch_id += 1;
            }
            let model = &models[model_index as usize];
            out.records.push(IndirectDrawRecord {
                command: DrawIndexedIndirect {
                    index_count: model.index_count,
                    instance_count: 0,
                    first_index: model.first_index,
                    vertex_offset: model.first_vertex as i32,
                    first_instance: object_id,
                },
                object_id,
                batch_id,
            });
        }
        out
    }

    /// The device object list: one [`PassObject`] per record.
    pub fn pass_objects(&self) -> Vec<PassObject> {
        self.flat_objects
            .iter()
            .zip(self.records())
            .map(|(&model_index, record)| PassObject {
                model_index,
                batch_id: record.batch_id,
            })
            .collect()
    }

    /// The tightly packed draw arguments of every record.
    pub fn commands(&self) -> Vec<DrawIndexedIndirect> {
        self.records().iter().map(|r| r.command).collect()
    }

    /// Triangles drawn by `count` records starting at `first`, if all are
    /// visible.
    pub fn triangles_in(&self, first: u32, count: u32) -> u64 {
        self.records()
            .iter()
            .skip(first as usize)
            .take(count as usize)
            .map(|r| (r.command.index_count / 3) as u64)
            .sum()
    }
}
