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

//! The graphics API abstraction: handles and descriptors shared by every backend.

pub mod bind_group;
pub mod buffer;
pub mod command;
pub mod pipeline;
pub mod shader;
pub mod texture;

pub use self::bind_group::*;
pub use self::buffer::*;
pub use self::command::*;
pub use self::pipeline::*;
pub use self::shader::*;
pub use self::texture::*;

/// Type of a physical graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererDeviceType {
    /// A GPU integrated with the CPU.
    IntegratedGpu,
    /// A dedicated GPU.
    DiscreteGpu,
    /// A virtualized GPU.
    VirtualGpu,
    /// A software rasterizer.
    Cpu,
    /// Unknown device type.
    Unknown,
}

/// Graphics API used underneath the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsBackendType {
    /// Vulkan.
    Vulkan,
    /// Metal.
    Metal,
    /// Direct3D 12.
    DirectX12,
    /// OpenGL / GLES.
    OpenGL,
    /// WebGPU in a browser.
    WebGpu,
    /// Unknown backend.
    Unknown,
}

/// Information about the adapter a device was created on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsAdapterInfo {
    /// Adapter name as reported by the driver.
    pub name: String,
    /// Underlying API.
    pub backend_type: GraphicsBackendType,
    /// Device type.
    pub device_type: RendererDeviceType,
}
