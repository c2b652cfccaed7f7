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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use solve_core::renderer::api::*;
use solve_core::renderer::traits::{CommandEncoder, GraphicsDevice};
use solve_core::renderer::{PipelineError, RenderError, ResourceError, ShaderError};

use super::command::WgpuCommandEncoder;
use super::context::WgpuContext;
use super::conversions::{from_wgpu_backend, from_wgpu_device_type, IntoWgpu};

#[derive(Debug)]
pub(crate) struct WgpuBufferEntry {
    pub(crate) wgpu_buffer: Arc<wgpu::Buffer>,
    pub(crate) size: u64,
}

#[derive(Debug)]
pub(crate) struct WgpuTextureEntry {
    pub(crate) wgpu_texture: Arc<wgpu::Texture>,
}

/// Resolved bind group resource, kept alive while the wgpu entries borrow it.
enum ResolvedResource {
    Buffer {
        buffer: Arc<wgpu::Buffer>,
        offset: u64,
        size: Option<u64>,
    },
    TextureView(Arc<wgpu::TextureView>),
}

/// Device objects whose creation runs under a validation error scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceObject {
    BindGroupLayout,
    PipelineLayout,
    ComputePipeline,
    RenderPipeline,
    BindGroup,
}

/// Runs `create` inside a validation error scope and returns the error the
/// scope caught, if any, instead of the object.
fn validated<R>(
    device: &wgpu::Device,
    create: impl FnOnce(&wgpu::Device) -> R,
) -> Result<R, wgpu::Error> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let object = create(device);
    match pollster::block_on(scope.pop()) {
        Some(error) => Err(error),
        None => Ok(object),
    }
}

fn creation_error(object: DeviceObject, label: Option<&str>, error: wgpu::Error) -> ResourceError {
    let name = label.unwrap_or("unlabeled");
    log::error!("WgpuDevice: {object:?} '{name}' rejected by the device: {error}");
    match object {
        DeviceObject::BindGroupLayout | DeviceObject::PipelineLayout => {
            PipelineError::LayoutCreationFailed(format!("'{name}': {error}")).into()
        }
        DeviceObject::ComputePipeline | DeviceObject::RenderPipeline => {
            PipelineError::CompilationFailed {
                label: label.map(str::to_string),
                details: error.to_string(),
            }
            .into()
        }
        DeviceObject::BindGroup => {
            ResourceError::BackendError(format!("bind group '{name}': {error}"))
        }
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

#[derive(Debug)]
pub struct WgpuDeviceInternal {
    context: Arc<Mutex<WgpuContext>>,
    shader_modules: Mutex<HashMap<ShaderModuleId, Arc<wgpu::ShaderModule>>>,
    bind_group_layouts: Mutex<HashMap<BindGroupLayoutId, Arc<wgpu::BindGroupLayout>>>,
    pipeline_layouts: Mutex<HashMap<PipelineLayoutId, Arc<wgpu::PipelineLayout>>>,
    compute_pipelines: Mutex<HashMap<ComputePipelineId, Arc<wgpu::ComputePipeline>>>,
    render_pipelines: Mutex<HashMap<RenderPipelineId, Arc<wgpu::RenderPipeline>>>,
    bind_groups: Mutex<HashMap<BindGroupId, Arc<wgpu::BindGroup>>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,
    texture_views: Mutex<HashMap<TextureViewId, Arc<wgpu::TextureView>>>,

    next_shader_id: AtomicUsize,
    next_bind_group_layout_id: AtomicUsize,
    next_pipeline_layout_id: AtomicUsize,
    next_compute_pipeline_id: AtomicU64,
    next_render_pipeline_id: AtomicUsize,
    next_bind_group_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_texture_view_id: AtomicUsize,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    command_buffer_id_counter: AtomicU64,

    /// Submissions the host has not waited on yet.
    in_flight: Mutex<HashMap<SubmissionIndex, wgpu::SubmissionIndex>>,
    submission_counter: AtomicU64,
}

/// A [`GraphicsDevice`] backed by wgpu.
///
/// Cloning is cheap: every clone shares the same resource tables.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

impl WgpuDevice {
    pub fn new(context: WgpuContext) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context: Arc::new(Mutex::new(context)),
                shader_modules: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                pipeline_layouts: Mutex::new(HashMap::new()),
                compute_pipelines: Mutex::new(HashMap::new()),
                render_pipelines: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                texture_views: Mutex::new(HashMap::new()),
                next_shader_id: AtomicUsize::new(0),
                next_bind_group_layout_id: AtomicUsize::new(0),
                next_pipeline_layout_id: AtomicUsize::new(0),
                next_compute_pipeline_id: AtomicU64::new(0),
                next_render_pipeline_id: AtomicUsize::new(0),
                next_bind_group_id: AtomicUsize::new(0),
                next_buffer_id: AtomicUsize::new(0),
                next_texture_id: AtomicUsize::new(0),
                next_texture_view_id: AtomicUsize::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
                in_flight: Mutex::new(HashMap::new()),
                submission_counter: AtomicU64::new(1),
            }),
        }
    }

    /// Executes an operation with the wgpu device locked.
    fn with_wgpu_device<F, R>(&self, operation: F) -> Result<R, ResourceError>
    where
        F: FnOnce(&wgpu::Device) -> Result<R, ResourceError>,
    {
        let context_guard = lock(&self.internal.context, "context")?;
        operation(&context_guard.device)
    }

    /// The context lock, recovering the guard if a panicking thread poisoned it.
    fn context(&self) -> MutexGuard<'_, WgpuContext> {
        self.internal
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = self.internal.buffers.lock().ok()?;
        buffers.get(&id).map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    pub(crate) fn get_wgpu_texture(&self, id: TextureId) -> Option<Arc<wgpu::Texture>> {
        let textures = self.internal.textures.lock().ok()?;
        textures.get(&id).map(|entry| Arc::clone(&entry.wgpu_texture))
    }

    pub(crate) fn get_wgpu_texture_view(&self, id: TextureViewId) -> Option<Arc<wgpu::TextureView>> {
        let views = self.internal.texture_views.lock().ok()?;
        views.get(&id).cloned()
    }

    pub(crate) fn get_wgpu_bind_group(&self, id: BindGroupId) -> Option<Arc<wgpu::BindGroup>> {
        let groups = self.internal.bind_groups.lock().ok()?;
        groups.get(&id).cloned()
    }

    pub(crate) fn get_wgpu_render_pipeline(
        &self,
        id: RenderPipelineId,
    ) -> Option<Arc<wgpu::RenderPipeline>> {
        let pipelines = self.internal.render_pipelines.lock().ok()?;
        pipelines.get(&id).cloned()
    }

    pub(crate) fn get_wgpu_compute_pipeline(
        &self,
        id: ComputePipelineId,
    ) -> Option<Arc<wgpu::ComputePipeline>> {
        let pipelines = self.internal.compute_pipelines.lock().ok()?;
        pipelines.get(&id).cloned()
    }

    fn get_wgpu_shader_module(&self, id: ShaderModuleId) -> Option<Arc<wgpu::ShaderModule>> {
        let modules = self.internal.shader_modules.lock().ok()?;
        modules.get(&id).cloned()
    }

    fn get_wgpu_pipeline_layout(
        &self,
        id: Option<PipelineLayoutId>,
    ) -> Result<Option<Arc<wgpu::PipelineLayout>>, ResourceError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let layouts = lock(&self.internal.pipeline_layouts, "pipeline_layouts")?;
        layouts
            .get(&id)
            .cloned()
            .map(Some)
            .ok_or_else(|| PipelineError::InvalidPipelineLayout { id }.into())
    }

    /// Registers a finished command buffer and returns its handle.
    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let id = CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        match self.internal.pending_command_buffers.lock() {
            Ok(mut guard) => {
                guard.insert(id, buffer);
            }
            Err(e) => log::error!("WgpuDevice: Mutex poisoned (pending_command_buffers): {e}"),
        }
        id
    }

    /// Wraps a wgpu texture allocated outside this device, such as a
    /// swapchain image, and returns a view handle for it.
    pub fn register_external_view(
        &self,
        texture: &wgpu::Texture,
        label: Option<&str>,
    ) -> Result<TextureViewId, ResourceError> {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label,
            ..Default::default()
        });
        let id = TextureViewId(
            self.internal
                .next_texture_view_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.texture_views, "texture_views")?.insert(id, Arc::new(view));
        Ok(id)
    }

    /// Number of buffers currently alive on the device.
    pub fn live_buffer_count(&self) -> usize {
        self.internal
            .buffers
            .lock()
            .map(|buffers| buffers.len())
            .unwrap_or_default()
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let label = descriptor.label;
        let ShaderSourceData::Wgsl(source) = &descriptor.source;

        let module = self.with_wgpu_device(|device| {
            log::debug!("WgpuDevice: Creating wgpu::ShaderModule with label: {label:?}");
            Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label,
                source: wgpu::ShaderSource::Wgsl(source.clone()),
            }))
        })?;

        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| m.message.clone())
            .collect();
        if !errors.is_empty() {
            return Err(ShaderError::CompilationError {
                label: label.unwrap_or("unlabeled").to_string(),
                details: errors.join("\n"),
            }
            .into());
        }

        let id = ShaderModuleId(self.internal.next_shader_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.shader_modules, "shader_modules")?.insert(id, Arc::new(module));

        log::info!(
            "WgpuDevice: Created shader module '{}' with ID: {:?}",
            label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    // --- Layout Operations ---

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: entry.ty.into_wgpu(),
                count: None,
            })
            .collect();

        let layout = self.with_wgpu_device(|device| {
            validated(device, |device| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: descriptor.label,
                    entries: &entries,
                })
            })
            .map_err(|e| creation_error(DeviceObject::BindGroupLayout, descriptor.label, e))
        })?;

        let id = BindGroupLayoutId(
            self.internal
                .next_bind_group_layout_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .insert(id, Arc::new(layout));
        log::debug!(
            "WgpuDevice: Created bind group layout '{}' with ID: {:?}",
            descriptor.label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let group_layouts: Vec<Arc<wgpu::BindGroupLayout>> = {
            let layouts = lock(&self.internal.bind_group_layouts, "bind_group_layouts")?;
            descriptor
                .bind_group_layouts
                .iter()
                .map(|id| layouts.get(id).cloned().ok_or(ResourceError::InvalidHandle))
                .collect::<Result<_, _>>()?
        };
        let group_layout_refs: Vec<Option<&wgpu::BindGroupLayout>> =
            group_layouts.iter().map(|layout| Some(layout.as_ref())).collect();

        let layout = self.with_wgpu_device(|device| {
            validated(device, |device| {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: descriptor.label,
                    bind_group_layouts: &group_layout_refs,
                    immediate_size: 0,
                })
            })
            .map_err(|e| creation_error(DeviceObject::PipelineLayout, descriptor.label, e))
        })?;

        let id = PipelineLayoutId(
            self.internal
                .next_pipeline_layout_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.pipeline_layouts, "pipeline_layouts")?.insert(id, Arc::new(layout));
        log::debug!("WgpuDevice: Created pipeline layout with ID: {id:?}");
        Ok(id)
    }

    // --- Pipeline Operations ---

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let label = descriptor.label.as_deref();
        let module = self
            .get_wgpu_shader_module(descriptor.shader_module)
            .ok_or_else(|| PipelineError::InvalidShaderModuleForPipeline {
                id: descriptor.shader_module,
                pipeline_label: label.map(str::to_string),
            })?;
        let layout = self.get_wgpu_pipeline_layout(descriptor.layout)?;

        let pipeline = self.with_wgpu_device(|device| {
            validated(device, |device| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label,
                    layout: layout.as_deref(),
                    module: &module,
                    entry_point: Some(descriptor.entry_point.as_ref()),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
            })
            .map_err(|e| creation_error(DeviceObject::ComputePipeline, label, e))
        })?;

        let id = ComputePipelineId(
            self.internal
                .next_compute_pipeline_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.compute_pipelines, "compute_pipelines")?
            .insert(id, Arc::new(pipeline));
        log::info!(
            "WgpuDevice: Created compute pipeline '{}' with ID: {:?}",
            label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<RenderPipelineId, ResourceError> {
        let label = descriptor.label.as_deref();
        log::debug!("WgpuDevice: Creating render pipeline with label: {label:?}");

        let vertex_module = self
            .get_wgpu_shader_module(descriptor.vertex_shader_module)
            .ok_or_else(|| PipelineError::InvalidShaderModuleForPipeline {
                id: descriptor.vertex_shader_module,
                pipeline_label: label.map(str::to_string),
            })?;

        let fragment = match descriptor.fragment_shader_module {
            Some(id) => {
                let module = self.get_wgpu_shader_module(id).ok_or_else(|| {
                    PipelineError::InvalidShaderModuleForPipeline {
                        id,
                        pipeline_label: label.map(str::to_string),
                    }
                })?;
                let entry_point = descriptor.fragment_entry_point.as_deref().ok_or_else(|| {
                    PipelineError::MissingEntryPointForFragmentShader {
                        pipeline_label: label.map(str::to_string),
                    }
                })?;
                Some((module, entry_point))
            }
            None => None,
        };

        let layout = self.get_wgpu_pipeline_layout(descriptor.layout)?;

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_targets
            .iter()
            .map(|target| {
                Some(wgpu::ColorTargetState {
                    format: target.format.into_wgpu(),
                    blend: target.blend.map(IntoWgpu::into_wgpu),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let depth_stencil = descriptor
            .depth_stencil
            .map(|state| wgpu::DepthStencilState {
                format: state.format.into_wgpu(),
                depth_write_enabled: Some(state.depth_write_enabled),
                depth_compare: Some(state.depth_compare.into_wgpu()),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: state.depth_bias,
                    slope_scale: state.depth_bias_slope_scale,
                    clamp: 0.0,
                },
            });

        let pipeline = self.with_wgpu_device(|device| {
            validated(device, |device| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label,
                    layout: layout.as_deref(),
                    vertex: wgpu::VertexState {
                        module: &vertex_module,
                        entry_point: Some(descriptor.vertex_entry_point.as_ref()),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        // Vertices are pulled from storage buffers.
                        buffers: &[],
                    },
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: descriptor.cull_mode.map(IntoWgpu::into_wgpu),
                        ..Default::default()
                    },
                    depth_stencil,
                    multisample: wgpu::MultisampleState::default(),
                    fragment: fragment
                        .as_ref()
                        .map(|(module, entry_point)| wgpu::FragmentState {
                            module,
                            entry_point: Some(*entry_point),
                            compilation_options: wgpu::PipelineCompilationOptions::default(),
                            targets: &color_targets,
                        }),
                    multiview_mask: None,
                    cache: None,
                })
            })
            .map_err(|e| creation_error(DeviceObject::RenderPipeline, label, e))
        })?;

        let id = RenderPipelineId(
            self.internal
                .next_render_pipeline_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.render_pipelines, "render_pipelines")?.insert(id, Arc::new(pipeline));
        log::info!(
            "WgpuDevice: Created render pipeline '{}' with ID: {:?}",
            label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    // --- Bind Group Operations ---

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let layout = lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .get(&descriptor.layout)
            .cloned()
            .ok_or(ResourceError::InvalidHandle)?;

        let resolved: Vec<(u32, ResolvedResource)> = descriptor
            .entries
            .iter()
            .map(|entry| {
                let resource = match entry.resource {
                    BindingResource::Buffer(binding) => ResolvedResource::Buffer {
                        buffer: self
                            .get_wgpu_buffer(binding.buffer)
                            .ok_or(ResourceError::InvalidHandle)?,
                        offset: binding.offset,
                        size: binding.size,
                    },
                    BindingResource::TextureView(view) => ResolvedResource::TextureView(
                        self.get_wgpu_texture_view(view)
                            .ok_or(ResourceError::InvalidHandle)?,
                    ),
                };
                Ok((entry.binding, resource))
            })
            .collect::<Result<_, ResourceError>>()?;

        let entries: Vec<wgpu::BindGroupEntry> = resolved
            .iter()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: match resource {
                    ResolvedResource::Buffer {
                        buffer,
                        offset,
                        size,
                    } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: *offset,
                        size: size.and_then(wgpu::BufferSize::new),
                    }),
                    ResolvedResource::TextureView(view) => wgpu::BindingResource::TextureView(view),
                },
            })
            .collect();

        let group = self.with_wgpu_device(|device| {
            validated(device, |device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: descriptor.label,
                    layout: &layout,
                    entries: &entries,
                })
            })
            .map_err(|e| creation_error(DeviceObject::BindGroup, descriptor.label, e))
        })?;

        let id = BindGroupId(self.internal.next_bind_group_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.bind_groups, "bind_groups")?.insert(id, Arc::new(group));
        log::debug!(
            "WgpuDevice: Created bind group '{}' with ID: {:?}",
            descriptor.label.unwrap_or_default(),
            id
        );
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        match lock(&self.internal.bind_groups, "bind_groups")?.remove(&id) {
            Some(_) => {
                log::debug!("WgpuDevice: Destroyed bind group with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer(&wgpu::BufferDescriptor {
                label: descriptor.label.as_deref(),
                size: descriptor.size,
                usage: descriptor.usage.into_wgpu(),
                mapped_at_creation: descriptor.mapped_at_creation,
            }))
        })?;

        let id = BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(buffer),
                size: descriptor.size,
            },
        );

        log::info!(
            "WgpuDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        use wgpu::util::DeviceExt;

        let buffer = self.with_wgpu_device(|device| {
            Ok(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: descriptor.label.as_deref(),
                contents: data,
                usage: descriptor.usage.into_wgpu(),
            }))
        })?;

        let id = BufferId(self.internal.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        let size = buffer.size();
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(buffer),
                size,
            },
        );

        log::info!(
            "WgpuDevice: Created buffer '{}' with initial data. ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            size
        );
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let (buffer, size) = {
            let buffers = lock(&self.internal.buffers, "buffers")?;
            let entry = buffers.get(&id).ok_or(ResourceError::NotFound)?;
            (Arc::clone(&entry.wgpu_buffer), entry.size)
        };
        if offset + data.len() as u64 > size {
            return Err(ResourceError::OutOfBounds);
        }
        self.context().queue.write_buffer(&buffer, offset, data);
        log::trace!(
            "WgpuDevice: Queued write of {} bytes to buffer {:?} at offset {}",
            data.len(),
            id,
            offset
        );
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let (buffer, buffer_size) = {
            let buffers = lock(&self.internal.buffers, "buffers")?;
            let entry = buffers.get(&id).ok_or(ResourceError::NotFound)?;
            (Arc::clone(&entry.wgpu_buffer), entry.size)
        };
        if offset + size > buffer_size {
            return Err(ResourceError::OutOfBounds);
        }

        let slice = buffer.slice(offset..offset + size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.with_wgpu_device(|device| {
            device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: None,
                })
                .map(|_| ())
                .map_err(|e| ResourceError::BackendError(format!("Device poll failed: {e}")))
        })?;

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ResourceError::BackendError(format!(
                    "Failed to map buffer {id:?}: {e}"
                )))
            }
            Err(_) => {
                return Err(ResourceError::BackendError(format!(
                    "Map callback for buffer {id:?} was dropped"
                )))
            }
        }

        let bytes = slice.get_mapped_range().to_vec();
        buffer.unmap();
        Ok(bytes)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        match lock(&self.internal.buffers, "buffers")?.remove(&id) {
            Some(_) => {
                log::debug!("WgpuDevice: Destroyed buffer with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    // --- Texture Operations ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let texture = self.with_wgpu_device(|device| {
            Ok(device.create_texture(&wgpu::TextureDescriptor {
                label: descriptor.label.as_deref(),
                size: wgpu::Extent3d {
                    width: descriptor.size.width,
                    height: descriptor.size.height,
                    depth_or_array_layers: descriptor.size.depth_or_array_layers,
                },
                mip_level_count: descriptor.mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: descriptor.format.into_wgpu(),
                usage: descriptor.usage.into_wgpu(),
                view_formats: &[],
            }))
        })?;

        let id = TextureId(self.internal.next_texture_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.textures, "textures")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(texture),
            },
        );
        log::info!(
            "WgpuDevice: Created texture '{}' with ID: {:?} ({}x{}x{}, {} mips)",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth_or_array_layers,
            descriptor.mip_level_count
        );
        Ok(id)
    }

    fn create_texture_view(
        &self,
        texture: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        let wgpu_texture = self
            .get_wgpu_texture(texture)
            .ok_or(ResourceError::NotFound)?;

        let view = wgpu_texture.create_view(&wgpu::TextureViewDescriptor {
            label: descriptor.label.as_deref(),
            format: None,
            dimension: descriptor.dimension.map(IntoWgpu::into_wgpu),
            usage: None,
            aspect: wgpu::TextureAspect::All,
            base_mip_level: descriptor.base_mip_level,
            mip_level_count: descriptor.mip_level_count,
            base_array_layer: descriptor.base_array_layer,
            array_layer_count: descriptor.array_layer_count,
        });

        let id = TextureViewId(
            self.internal
                .next_texture_view_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.texture_views, "texture_views")?.insert(id, Arc::new(view));
        log::debug!("WgpuDevice: Created texture view {id:?} for texture {texture:?}");
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        match lock(&self.internal.texture_views, "texture_views")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        match lock(&self.internal.textures, "textures")?.remove(&id) {
            Some(_) => {
                log::debug!("WgpuDevice: Destroyed texture with ID: {id:?}");
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    // --- Submission ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        let encoder = self
            .context()
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label });
        Box::new(WgpuCommandEncoder {
            encoder,
            device: self.clone(),
        })
    }

    fn submit_command_buffer(
        &self,
        command_buffer: CommandBufferId,
    ) -> Result<SubmissionIndex, ResourceError> {
        let buffer = lock(&self.internal.pending_command_buffers, "pending_command_buffers")?
            .remove(&command_buffer)
            .ok_or_else(|| {
                log::error!(
                    "Attempted to submit a CommandBufferId ({command_buffer:?}) that does not exist."
                );
                ResourceError::InvalidHandle
            })?;

        let wgpu_index = self.context().queue.submit(std::iter::once(buffer));
        let index = SubmissionIndex(
            self.internal
                .submission_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        lock(&self.internal.in_flight, "in_flight")?.insert(index, wgpu_index);
        log::trace!("WgpuDevice: Submitted {command_buffer:?} as {index:?}");
        Ok(index)
    }

    fn wait_for_submission(
        &self,
        submission: SubmissionIndex,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let wgpu_index = {
            let mut in_flight = lock(&self.internal.in_flight, "in_flight")?;
            let index = in_flight.remove(&submission);
            // Queue order retires older submissions first.
            in_flight.retain(|pending, _| *pending > submission);
            index
        };
        let Some(wgpu_index) = wgpu_index else {
            return Ok(());
        };

        match self.context().device.poll(wgpu::PollType::Wait {
            submission_index: Some(wgpu_index),
            timeout: Some(timeout),
        }) {
            Ok(_) => Ok(()),
            Err(wgpu::PollError::Timeout) => {
                log::error!("WgpuDevice: {submission:?} did not retire within {timeout:?}");
                Err(RenderError::DeviceTimeout { waited: timeout })
            }
            Err(e) => Err(RenderError::Internal(format!("Device poll failed: {e}"))),
        }
    }

    fn adapter_info(&self) -> GraphicsAdapterInfo {
        let context = self.context();
        GraphicsAdapterInfo {
            name: context.adapter_name.clone(),
            backend_type: from_wgpu_backend(context.adapter_backend),
            device_type: from_wgpu_device_type(context.adapter_device_type),
        }
    }
}
