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

//! Conversions from `solve-core` descriptors into their wgpu counterparts.

use solve_core::renderer::api::{
    AccessScope, BindingType, BlendMode, BufferBindingType, BufferUsage, Color, CompareFunction,
    Face, GraphicsBackendType, IndexFormat, LoadOp, RendererDeviceType, ShaderStageFlags,
    StorageTextureAccess, TextureFormat, TextureSampleType, TextureUsage, TextureViewDimension,
};

/// Converts a backend-agnostic value into its wgpu representation.
///
/// A local trait is needed because the orphan rules forbid `From` impls
/// between two foreign crates' types.
pub trait IntoWgpu<T> {
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::TextureFormat> for TextureFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// Maps a wgpu format back into the renderer's format set.
///
/// Returns `None` for formats the renderer never allocates.
pub fn from_wgpu_texture_format(format: wgpu::TextureFormat) -> Option<TextureFormat> {
    match format {
        wgpu::TextureFormat::R32Float => Some(TextureFormat::R32Float),
        wgpu::TextureFormat::Depth32Float => Some(TextureFormat::Depth32Float),
        wgpu::TextureFormat::Rgba8UnormSrgb => Some(TextureFormat::Rgba8UnormSrgb),
        wgpu::TextureFormat::Bgra8UnormSrgb => Some(TextureFormat::Bgra8UnormSrgb),
        wgpu::TextureFormat::Rgba16Float => Some(TextureFormat::Rgba16Float),
        _ => None,
    }
}

impl IntoWgpu<wgpu::TextureViewDimension> for TextureViewDimension {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureViewDimension::D2 => wgpu::TextureViewDimension::D2,
            TextureViewDimension::D2Array => wgpu::TextureViewDimension::D2Array,
        }
    }
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        let mut usages = wgpu::TextureUsages::empty();
        if self.contains(TextureUsage::COPY_SRC) {
            usages |= wgpu::TextureUsages::COPY_SRC;
        }
        if self.contains(TextureUsage::COPY_DST) {
            usages |= wgpu::TextureUsages::COPY_DST;
        }
        if self.contains(TextureUsage::TEXTURE_BINDING) {
            usages |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if self.contains(TextureUsage::STORAGE_BINDING) {
            usages |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        if self.contains(TextureUsage::RENDER_ATTACHMENT) {
            usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        usages
    }
}

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::empty();
        if self.contains(BufferUsage::MAP_READ) {
            usages |= wgpu::BufferUsages::MAP_READ;
        }
        if self.contains(BufferUsage::MAP_WRITE) {
            usages |= wgpu::BufferUsages::MAP_WRITE;
        }
        if self.contains(BufferUsage::COPY_SRC) {
            usages |= wgpu::BufferUsages::COPY_SRC;
        }
        if self.contains(BufferUsage::COPY_DST) {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        if self.contains(BufferUsage::VERTEX) {
            usages |= wgpu::BufferUsages::VERTEX;
        }
        if self.contains(BufferUsage::INDEX) {
            usages |= wgpu::BufferUsages::INDEX;
        }
        if self.contains(BufferUsage::UNIFORM) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        if self.contains(BufferUsage::STORAGE) {
            usages |= wgpu::BufferUsages::STORAGE;
        }
        if self.contains(BufferUsage::INDIRECT) {
            usages |= wgpu::BufferUsages::INDIRECT;
        }
        usages
    }
}

impl IntoWgpu<wgpu::ShaderStages> for ShaderStageFlags {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        let mut stages = wgpu::ShaderStages::NONE;
        if self.contains(ShaderStageFlags::VERTEX) {
            stages |= wgpu::ShaderStages::VERTEX;
        }
        if self.contains(ShaderStageFlags::FRAGMENT) {
            stages |= wgpu::ShaderStages::FRAGMENT;
        }
        if self.contains(ShaderStageFlags::COMPUTE) {
            stages |= wgpu::ShaderStages::COMPUTE;
        }
        stages
    }
}

impl IntoWgpu<wgpu::BindingType> for BindingType {
    fn into_wgpu(self) -> wgpu::BindingType {
        match self {
            BindingType::Buffer { ty } => wgpu::BindingType::Buffer {
                ty: match ty {
                    BufferBindingType::Uniform => wgpu::BufferBindingType::Uniform,
                    BufferBindingType::Storage { read_only } => {
                        wgpu::BufferBindingType::Storage { read_only }
                    }
                },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingType::Texture {
                sample_type,
                view_dimension,
            } => wgpu::BindingType::Texture {
                sample_type: match sample_type {
                    TextureSampleType::Float { filterable } => {
                        wgpu::TextureSampleType::Float { filterable }
                    }
                    TextureSampleType::Depth => wgpu::TextureSampleType::Depth,
                },
                view_dimension: view_dimension.into_wgpu(),
                multisampled: false,
            },
            BindingType::StorageTexture {
                access,
                format,
                view_dimension,
            } => wgpu::BindingType::StorageTexture {
                access: match access {
                    StorageTextureAccess::WriteOnly => wgpu::StorageTextureAccess::WriteOnly,
                    StorageTextureAccess::ReadOnly => wgpu::StorageTextureAccess::ReadOnly,
                },
                format: format.into_wgpu(),
                view_dimension: view_dimension.into_wgpu(),
            },
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<wgpu::Face> for Face {
    fn into_wgpu(self) -> wgpu::Face {
        match self {
            Face::Front => wgpu::Face::Front,
            Face::Back => wgpu::Face::Back,
        }
    }
}

impl IntoWgpu<wgpu::BlendState> for BlendMode {
    fn into_wgpu(self) -> wgpu::BlendState {
        match self {
            BlendMode::AlphaBlending => wgpu::BlendState::ALPHA_BLENDING,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl IntoWgpu<wgpu::Color> for Color {
    fn into_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r,
            g: self.g,
            b: self.b,
            a: self.a,
        }
    }
}

impl IntoWgpu<wgpu::LoadOp<wgpu::Color>> for LoadOp<Color> {
    fn into_wgpu(self) -> wgpu::LoadOp<wgpu::Color> {
        match self {
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear(color) => wgpu::LoadOp::Clear(color.into_wgpu()),
        }
    }
}

impl IntoWgpu<wgpu::LoadOp<f32>> for LoadOp<f32> {
    fn into_wgpu(self) -> wgpu::LoadOp<f32> {
        match self {
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear(depth) => wgpu::LoadOp::Clear(depth),
        }
    }
}

impl IntoWgpu<wgpu::StoreOp> for bool {
    fn into_wgpu(self) -> wgpu::StoreOp {
        if self {
            wgpu::StoreOp::Store
        } else {
            wgpu::StoreOp::Discard
        }
    }
}

/// Whether a barrier scope is serviced by wgpu's automatic resource tracking.
///
/// Host reads are not: they need the submission to retire before mapping.
pub fn tracked_by_wgpu(scope: AccessScope) -> bool {
    !matches!(scope, AccessScope::HostRead)
}

pub fn from_wgpu_backend(backend: wgpu::Backend) -> GraphicsBackendType {
    match backend {
        wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
        wgpu::Backend::Metal => GraphicsBackendType::Metal,
        wgpu::Backend::Dx12 => GraphicsBackendType::DirectX12,
        wgpu::Backend::Gl => GraphicsBackendType::OpenGL,
        wgpu::Backend::BrowserWebGpu => GraphicsBackendType::WebGpu,
        _ => GraphicsBackendType::Unknown,
    }
}

pub fn from_wgpu_device_type(device_type: wgpu::DeviceType) -> RendererDeviceType {
    match device_type {
        wgpu::DeviceType::IntegratedGpu => RendererDeviceType::IntegratedGpu,
        wgpu::DeviceType::DiscreteGpu => RendererDeviceType::DiscreteGpu,
        wgpu::DeviceType::VirtualGpu => RendererDeviceType::VirtualGpu,
        wgpu::DeviceType::Cpu => RendererDeviceType::Cpu,
        _ => RendererDeviceType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_conversion() {
        assert_eq!(
            wgpu::TextureFormat::R32Float,
            TextureFormat::R32Float.into_wgpu()
        );
        assert_eq!(
            wgpu::TextureFormat::Depth32Float,
            TextureFormat::Depth32Float.into_wgpu()
        );
        assert_eq!(
            from_wgpu_texture_format(wgpu::TextureFormat::Bgra8UnormSrgb),
            Some(TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(from_wgpu_texture_format(wgpu::TextureFormat::R8Unorm), None);
    }

    #[test]
    fn test_indirect_buffer_usage_conversion() {
        let usage = BufferUsage::STORAGE | BufferUsage::INDIRECT | BufferUsage::COPY_DST;
        let wgpu_usage: wgpu::BufferUsages = usage.into_wgpu();
        assert_eq!(
            wgpu_usage,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST
        );
    }

    #[test]
    fn test_readback_usage_conversion() {
        let wgpu_usage: wgpu::BufferUsages = (BufferUsage::MAP_READ | BufferUsage::COPY_DST).into_wgpu();
        assert_eq!(
            wgpu_usage,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST
        );
    }

    #[test]
    fn test_shader_stage_conversion() {
        let stages: wgpu::ShaderStages =
            (ShaderStageFlags::VERTEX | ShaderStageFlags::COMPUTE).into_wgpu();
        assert_eq!(
            stages,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::COMPUTE
        );
    }

    #[test]
    fn test_depth_texture_binding_conversion() {
        let ty = BindingType::Texture {
            sample_type: TextureSampleType::Depth,
            view_dimension: TextureViewDimension::D2Array,
        };
        match ty.into_wgpu() {
            wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled,
            } => {
                assert_eq!(sample_type, wgpu::TextureSampleType::Depth);
                assert_eq!(view_dimension, wgpu::TextureViewDimension::D2Array);
                assert!(!multisampled);
            }
            other => panic!("unexpected binding type {other:?}"),
        }
    }

    #[test]
    fn test_load_store_conversion() {
        let load: wgpu::LoadOp<f32> = LoadOp::Clear(1.0f32).into_wgpu();
        assert_eq!(load, wgpu::LoadOp::Clear(1.0));
        let store: wgpu::StoreOp = false.into_wgpu();
        assert_eq!(store, wgpu::StoreOp::Discard);
    }

    #[test]
    fn test_compare_and_face_conversion() {
        assert_eq!(
            wgpu::CompareFunction::Equal,
            CompareFunction::Equal.into_wgpu()
        );
        assert_eq!(wgpu::Face::Back, Face::Back.into_wgpu());
        assert_eq!(
            wgpu::BlendState::ALPHA_BLENDING,
            BlendMode::AlphaBlending.into_wgpu()
        );
    }

    #[test]
    fn test_host_read_is_untracked() {
        assert!(tracked_by_wgpu(AccessScope::IndirectRead));
        assert!(!tracked_by_wgpu(AccessScope::HostRead));
    }
}
