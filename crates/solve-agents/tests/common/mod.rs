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

//! A recording graphics device for orchestration tests.
//!
//! Nothing is executed on a GPU: compute dispatches and draws are only
//! logged, while buffer writes and buffer-to-buffer copies are applied to
//! host memory so scene merging can be checked byte for byte.

#![allow(dead_code)]

use solve_core::math::{Aabb, Bounds, Mat4, Vec3};
use solve_core::renderer::gpu_types::Vertex;
use solve_core::renderer::traits::{CommandEncoder, ComputePass, GraphicsDevice, RenderPass};
use solve_core::renderer::*;
use solve_core::scene::{MaterialHandle, MeshBufferHandle, RenderObject};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One entry of the device command log.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginComputePass { label: String },
    Dispatch { x: u32, y: u32, z: u32 },
    BeginRenderPass { label: String },
    MultiDrawIndirect { buffer: BufferId, offset: u64, count: u32 },
    Draw { vertices: Range<u32> },
    Barrier(Vec<Barrier>),
    Copy { src: BufferId, src_offset: u64, dst: BufferId, dst_offset: u64, size: u64 },
    Submit(u64),
}

#[derive(Debug, Default)]
struct MockState {
    next_id: usize,
    buffers: HashMap<BufferId, Vec<u8>>,
    finished: HashMap<u64, Vec<Command>>,
    log: Vec<Command>,
    submissions: u64,
    waits: u32,
    stalled: bool,
    fail_shaders: bool,
    fail_pipeline: Option<String>,
}

impl MockState {
    fn id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }
}

/// The recording device. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device on which every shader module fails to compile.
    pub fn with_failing_shaders() -> Self {
        let device = Self::new();
        device.lock().fail_shaders = true;
        device
    }

    /// A device that rejects the compute or render pipeline labeled `label`,
    /// the way a backend validation layer does.
    pub fn with_failing_pipeline(label: &str) -> Self {
        let device = Self::new();
        device.lock().fail_pipeline = Some(label.to_string());
        device
    }

    fn check_pipeline(&self, label: Option<&str>) -> Result<(), ResourceError> {
        match (&self.lock().fail_pipeline, label) {
            (Some(failing), Some(label)) if failing == label => {
                Err(PipelineError::CompilationFailed {
                    label: Some(label.to_string()),
                    details: "mock validation rejected the pipeline".to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Makes every following fence wait time out.
    pub fn stall(&self) {
        self.lock().stalled = true;
    }

    /// Everything submitted so far, in submission order.
    pub fn log(&self) -> Vec<Command> {
        self.lock().log.clone()
    }

    /// Clears the command log.
    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    pub fn submissions(&self) -> u64 {
        self.lock().submissions
    }

    pub fn waits(&self) -> u32 {
        self.lock().waits
    }

    /// The host copy of a live buffer.
    pub fn contents(&self, id: BufferId) -> Option<Vec<u8>> {
        self.lock().buffers.get(&id).cloned()
    }

    pub fn is_live(&self, id: BufferId) -> bool {
        self.lock().buffers.contains_key(&id)
    }

    pub fn live_buffers(&self) -> usize {
        self.lock().buffers.len()
    }
}

impl GraphicsDevice for MockDevice {
    fn create_shader_module(
        &self,
        desc: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let mut state = self.lock();
        if state.fail_shaders {
            return Err(ShaderError::CompilationError {
                label: desc.label.unwrap_or("unnamed").to_string(),
                details: "mock compiler refuses everything".to_string(),
            }
            .into());
        }
        Ok(ShaderModuleId(state.id()))
    }

    fn create_bind_group_layout(
        &self,
        _desc: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        Ok(BindGroupLayoutId(self.lock().id()))
    }

    fn create_pipeline_layout(
        &self,
        _desc: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        Ok(PipelineLayoutId(self.lock().id()))
    }

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        self.check_pipeline(desc.label.as_deref())?;
        Ok(ComputePipelineId(self.lock().id() as u64))
    }

    fn create_render_pipeline(
        &self,
        desc: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        self.check_pipeline(desc.label.as_deref())?;
        Ok(RenderPipelineId(self.lock().id()))
    }

    fn create_bind_group(&self, _desc: &BindGroupDescriptor) -> Result<BindGroupId, ResourceError> {
        Ok(BindGroupId(self.lock().id()))
    }

    fn destroy_bind_group(&self, _id: BindGroupId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.lock();
        let id = BufferId(state.id());
        state.buffers.insert(id, vec![0; desc.size as usize]);
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        _desc: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        let mut state = self.lock();
        let id = BufferId(state.id());
        state.buffers.insert(id, data.to_vec());
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.lock();
        let buffer = state.buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        let range = offset as usize..offset as usize + data.len();
        buffer
            .get_mut(range)
            .ok_or(ResourceError::OutOfBounds)?
            .copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let state = self.lock();
        let buffer = state.buffers.get(&id).ok_or(ResourceError::NotFound)?;
        buffer
            .get(offset as usize..(offset + size) as usize)
            .map(<[u8]>::to_vec)
            .ok_or(ResourceError::OutOfBounds)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.lock()
            .buffers
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_texture(&self, _desc: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        Ok(TextureId(self.lock().id()))
    }

    fn create_texture_view(
        &self,
        _texture: TextureId,
        _desc: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        Ok(TextureViewId(self.lock().id()))
    }

    fn destroy_texture_view(&self, _id: TextureViewId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn destroy_texture(&self, _id: TextureId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(MockEncoder {
            state: self.state.clone(),
            commands: Vec::new(),
        })
    }

    fn submit_command_buffer(
        &self,
        command_buffer: CommandBufferId,
    ) -> Result<SubmissionIndex, ResourceError> {
        let mut state = self.lock();
        let commands = state
            .finished
            .remove(&command_buffer.0)
            .ok_or(ResourceError::InvalidHandle)?;
        for command in &commands {
            if let Command::Copy {
                src,
                src_offset,
                dst,
                dst_offset,
                size,
            } = *command
            {
                let bytes = state
                    .buffers
                    .get(&src)
                    .and_then(|b| b.get(src_offset as usize..(src_offset + size) as usize))
                    .map(<[u8]>::to_vec)
                    .ok_or(ResourceError::OutOfBounds)?;
                state
                    .buffers
                    .get_mut(&dst)
                    .and_then(|b| b.get_mut(dst_offset as usize..(dst_offset + size) as usize))
                    .ok_or(ResourceError::OutOfBounds)?
                    .copy_from_slice(&bytes);
            }
        }
        state.submissions += 1;
        let index = state.submissions;
        state.log.extend(commands);
        state.log.push(Command::Submit(index));
        Ok(SubmissionIndex(index))
    }

    fn wait_for_submission(
        &self,
        _submission: SubmissionIndex,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let mut state = self.lock();
        state.waits += 1;
        if state.stalled {
            return Err(RenderError::DeviceTimeout { waited: timeout });
        }
        Ok(())
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        GraphicsAdapterInfo {
            name: "Mock Adapter".to_string(),
            backend_type: GraphicsBackendType::Unknown,
            device_type: RendererDeviceType::Cpu,
        }
    }
}

struct MockEncoder {
    state: Arc<Mutex<MockState>>,
    commands: Vec<Command>,
}

struct MockComputePass<'a> {
    commands: &'a mut Vec<Command>,
}

struct MockRenderPass<'a> {
    commands: &'a mut Vec<Command>,
}

impl ComputePass<'_> for MockComputePass<'_> {
    fn set_pipeline(&mut self, _pipeline: ComputePipelineId) {}
    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupId) {}
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(Command::Dispatch { x, y, z });
    }
}

impl RenderPass<'_> for MockRenderPass<'_> {
    fn set_pipeline(&mut self, _pipeline: RenderPipelineId) {}
    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupId) {}
    fn set_index_buffer(&mut self, _buffer: BufferId, _offset: u64, _format: IndexFormat) {}
    fn draw(&mut self, vertices: Range<u32>, _instances: Range<u32>) {
        self.commands.push(Command::Draw { vertices });
    }
    fn draw_indexed(&mut self, _indices: Range<u32>, _base_vertex: i32, _instances: Range<u32>) {}
    fn multi_draw_indexed_indirect(&mut self, buffer: BufferId, offset: u64, count: u32) {
        self.commands.push(Command::MultiDrawIndirect {
            buffer,
            offset,
            count,
        });
    }
}

impl CommandEncoder for MockEncoder {
    fn begin_render_pass<'encoder>(
        &'encoder mut self,
        desc: &RenderPassDescriptor<'_>,
    ) -> Box<dyn RenderPass<'encoder> + 'encoder> {
        self.commands.push(Command::BeginRenderPass {
            label: desc.label.unwrap_or_default().to_string(),
        });
        Box::new(MockRenderPass {
            commands: &mut self.commands,
        })
    }

    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        desc: &ComputePassDescriptor<'_>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        self.commands.push(Command::BeginComputePass {
            label: desc.label.unwrap_or_default().to_string(),
        });
        Box::new(MockComputePass {
            commands: &mut self.commands,
        })
    }

    fn pipeline_barrier(&mut self, barriers: &[Barrier]) {
        self.commands.push(Command::Barrier(barriers.to_vec()));
    }

    fn copy_buffer_to_buffer(
        &mut self,
        src: BufferId,
        src_offset: u64,
        dst: BufferId,
        dst_offset: u64,
        size: u64,
    ) {
        self.commands.push(Command::Copy {
            src,
            src_offset,
            dst,
            dst_offset,
            size,
        });
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let mut state = self.state.lock().unwrap();
        let id = state.id() as u64;
        state.finished.insert(id, self.commands);
        CommandBufferId(id)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A surface whose acquisitions can be made to fail.
#[derive(Debug)]
pub struct MockSurface {
    pub extent: (u32, u32),
    pub reconfigures: u32,
    pub presented: u32,
    failures: VecDeque<SurfaceError>,
}

impl MockSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: (width, height),
            reconfigures: 0,
            presented: 0,
            failures: VecDeque::new(),
        }
    }

    /// Queues an error returned by the next acquisition.
    pub fn fail_next(&mut self, error: SurfaceError) {
        self.failures.push_back(error);
    }
}

impl RenderSurface for MockSurface {
    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn acquire(&mut self, _device: &dyn GraphicsDevice) -> Result<SurfaceFrame, SurfaceError> {
        match self.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(SurfaceFrame {
                view: TextureViewId(usize::MAX),
            }),
        }
    }

    fn present(
        &mut self,
        _device: &dyn GraphicsDevice,
        _frame: SurfaceFrame,
    ) -> Result<(), SurfaceError> {
        self.presented += 1;
        Ok(())
    }

    fn reconfigure(
        &mut self,
        _device: &dyn GraphicsDevice,
        size: Option<(u32, u32)>,
    ) -> Result<(), SurfaceError> {
        if let Some(size) = size {
            self.extent = size;
        }
        self.reconfigures += 1;
        Ok(())
    }
}

/// Uploads a mesh of `vertex_count` vertices and `index_count` indices into
/// its own buffers. Vertex `i` carries `tag` in `uv_x` and `i` in `uv_y`.
pub fn mesh(device: &MockDevice, tag: f32, vertex_count: u32, index_count: u32) -> MeshBufferHandle {
    let vertices: Vec<Vertex> = (0..vertex_count)
        .map(|i| Vertex {
            position: [i as f32, 0.0, 0.0],
            uv_x: tag,
            normal: [0.0, 1.0, 0.0],
            uv_y: i as f32,
            color: [1.0; 4],
        })
        .collect();
    let indices: Vec<u32> = (0..index_count).map(|i| i % vertex_count.max(1)).collect();
    let vertex_buffer = device
        .create_buffer_with_data(
            &BufferDescriptor::new("Test Vertices", 0, BufferUsage::COPY_SRC),
            bytemuck::cast_slice(&vertices),
        )
        .unwrap();
    let index_buffer = device
        .create_buffer_with_data(
            &BufferDescriptor::new("Test Indices", 0, BufferUsage::COPY_SRC),
            bytemuck::cast_slice(&indices),
        )
        .unwrap();
    MeshBufferHandle {
        vertex_buffer,
        first_vertex: 0,
        vertex_count,
        index_buffer,
        first_index: 0,
        index_count,
    }
}

/// A unit cube-sized surface at `position`.
pub fn object(mesh: MeshBufferHandle, material: MaterialHandle, position: Vec3) -> RenderObject {
    RenderObject {
        mesh,
        material,
        transform: Mat4::from_translation(position),
        bounds: Bounds::from_aabb(Aabb::from_min_max(Vec3::splat(-1.0), Vec3::ONE)),
    }
}

/// Indices into `log` of the entries matching `predicate`.
pub fn positions(log: &[Command], predicate: impl Fn(&Command) -> bool) -> Vec<usize> {
    log.iter()
        .enumerate()
        .filter(|(_, c)| predicate(c))
        .map(|(i, _)| i)
        .collect()
}

/// Decodes tightly packed records from a host buffer copy.
pub fn decode<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}
