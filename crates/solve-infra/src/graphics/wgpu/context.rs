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

use anyhow::{anyhow, Result};
use wgpu::{Adapter, Features, Instance};

/// Owns the wgpu device and queue the renderer submits to.
///
/// The renderer runs without a window: every frame targets an offscreen
/// color texture, so no surface is created here.
#[derive(Debug)]
pub struct WgpuContext {
    #[allow(dead_code)]
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,
    pub adapter_device_type: wgpu::DeviceType,
    pub active_device_features: wgpu::Features,
}

impl WgpuContext {
    /// Features the indirect path cannot run without: culled draw records
    /// carry a non-zero `first_instance`.
    pub const REQUIRED_FEATURES: Features = Features::INDIRECT_FIRST_INSTANCE;

    /// Picks a high-performance adapter and opens a device on it.
    ///
    /// Blocks the calling thread on adapter and device creation.
    pub fn new_headless() -> Result<Self> {
        let instance = Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| anyhow!("No suitable graphics adapter found: {e}"))?;
        pollster::block_on(Self::with_adapter(adapter))
    }

    /// Opens the logical device on a pre-selected adapter.
    pub async fn with_adapter(adapter: Adapter) -> Result<Self> {
        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        if !adapter.features().contains(Self::REQUIRED_FEATURES) {
            return Err(anyhow!(
                "Adapter \"{}\" lacks required features: {:?}",
                adapter_info.name,
                Self::REQUIRED_FEATURES
            ));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Solve Logical Device"),
                required_features: Self::REQUIRED_FEATURES,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {e}"))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let active_device_features = device.features();
        log::info!("Active device features: {active_device_features:?}");

        Ok(Self {
            adapter,
            device,
            queue,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            adapter_device_type: adapter_info.device_type,
            active_device_features,
        })
    }
}
