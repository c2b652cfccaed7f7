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

//! The presentation target abstraction.

use crate::renderer::api::{TextureFormat, TextureViewId};
use crate::renderer::traits::GraphicsDevice;
use std::fmt;

/// An acquired image ready to be rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFrame {
    /// View of the acquired image.
    pub view: TextureViewId,
}

/// Why a surface image could not be acquired or presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The surface no longer matches its target and must be reconfigured.
    Outdated,
    /// The surface was lost and must be reconfigured.
    Lost,
    /// Acquisition timed out.
    Timeout,
    /// Any other backend failure.
    Other(String),
}

impl SurfaceError {
    /// Whether reconfiguring the surface can recover from this error.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(self, SurfaceError::Outdated | SurfaceError::Lost)
    }
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::Outdated => write!(f, "The surface is outdated."),
            SurfaceError::Lost => write!(f, "The surface was lost."),
            SurfaceError::Timeout => write!(f, "Timed out acquiring the next surface image."),
            SurfaceError::Other(msg) => write!(f, "Surface error: {msg}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// A swapchain-like target the frame's final color is written to.
pub trait RenderSurface: Send {
    /// Current size in pixels.
    fn extent(&self) -> (u32, u32);

    /// Format of the acquired images.
    fn format(&self) -> TextureFormat;

    /// Acquires the next image.
    fn acquire(&mut self, device: &dyn GraphicsDevice) -> Result<SurfaceFrame, SurfaceError>;

    /// Presents an image acquired with [`acquire`](Self::acquire).
    fn present(
        &mut self,
        device: &dyn GraphicsDevice,
        frame: SurfaceFrame,
    ) -> Result<(), SurfaceError>;

    /// Recreates the surface images, at a new size if given.
    fn reconfigure(
        &mut self,
        device: &dyn GraphicsDevice,
        size: Option<(u32, u32)>,
    ) -> Result<(), SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(SurfaceError::Outdated.needs_reconfigure());
        assert!(SurfaceError::Lost.needs_reconfigure());
        assert!(!SurfaceError::Timeout.needs_reconfigure());
        assert!(!SurfaceError::Other("x".into()).needs_reconfigure());
    }
}
