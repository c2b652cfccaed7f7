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

use std::borrow::Cow;

use solve_core::renderer::api::{
    Extent3D, TextureDescriptor, TextureFormat, TextureId, TextureUsage, TextureViewDescriptor,
    TextureViewId,
};
use solve_core::renderer::{GraphicsDevice, RenderSurface, SurfaceError, SurfaceFrame};

/// A [`RenderSurface`] that renders into an owned color texture.
///
/// Used for headless runs. `invalidate` marks the target outdated so the
/// next acquire fails the same way a resized window would.
#[derive(Debug)]
pub struct OffscreenSurface {
    extent: (u32, u32),
    format: TextureFormat,
    target: Option<(TextureId, TextureViewId)>,
    outdated: bool,
    presented: u64,
}

impl OffscreenSurface {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            extent: (width.max(1), height.max(1)),
            format,
            target: None,
            outdated: false,
            presented: 0,
        }
    }

    /// Makes the next `acquire` report [`SurfaceError::Outdated`].
    pub fn invalidate(&mut self) {
        self.outdated = true;
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// The current color texture, if one has been allocated.
    pub fn color_texture(&self) -> Option<TextureId> {
        self.target.map(|(texture, _)| texture)
    }

    fn allocate(&mut self, device: &dyn GraphicsDevice) -> Result<TextureViewId, SurfaceError> {
        let (width, height) = self.extent;
        let texture = device
            .create_texture(&TextureDescriptor {
                label: Some(Cow::Borrowed("Offscreen Color")),
                size: Extent3D::d2(width, height),
                mip_level_count: 1,
                format: self.format,
                usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
            })
            .map_err(|e| SurfaceError::Other(e.to_string()))?;
        let view = device
            .create_texture_view(texture, &TextureViewDescriptor::default())
            .map_err(|e| SurfaceError::Other(e.to_string()))?;
        self.target = Some((texture, view));
        log::debug!("OffscreenSurface: allocated {width}x{height} target");
        Ok(view)
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        if let Some((texture, view)) = self.target.take() {
            if let Err(e) = device.destroy_texture_view(view) {
                log::warn!("OffscreenSurface: failed to destroy view: {e}");
            }
            if let Err(e) = device.destroy_texture(texture) {
                log::warn!("OffscreenSurface: failed to destroy texture: {e}");
            }
        }
    }
}

impl RenderSurface for OffscreenSurface {
    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn acquire(&mut self, device: &dyn GraphicsDevice) -> Result<SurfaceFrame, SurfaceError> {
        if self.outdated {
            return Err(SurfaceError::Outdated);
        }
        let view = match self.target {
            Some((_, view)) => view,
            None => self.allocate(device)?,
        };
        Ok(SurfaceFrame { view })
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
        device: &dyn GraphicsDevice,
        size: Option<(u32, u32)>,
    ) -> Result<(), SurfaceError> {
        if let Some((width, height)) = size {
            if width == 0 || height == 0 {
                log::warn!("OffscreenSurface: ignoring resize to {width}x{height}");
            } else {
                self.extent = (width, height);
            }
        }
        self.release(device);
        self.outdated = false;
        self.allocate(device).map(|_| ())
    }
}
