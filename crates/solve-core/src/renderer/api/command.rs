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

//! Command recording descriptors: passes, attachments and barriers.

use super::buffer::BufferId;
use super::texture::{TextureId, TextureViewId};

/// An opaque handle to a finished, not yet submitted command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub u64);

/// Identifies one queue submission, so the host can wait for it to retire.
///
/// This is the fence of a frame in flight: the orchestrator stores the index
/// returned by [`GraphicsDevice::submit_command_buffer`](crate::renderer::GraphicsDevice::submit_command_buffer)
/// and waits on it before reusing that frame's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionIndex(pub u64);

/// A linear RGBA clear color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    /// Opaque black.
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
}

/// What happens to an attachment when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<V> {
    /// Clear the attachment to the given value.
    Clear(V),
    /// Keep the attachment's current content.
    Load,
}

/// A color attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassColorAttachment {
    /// The view rendered into.
    pub view: TextureViewId,
    /// The load operation.
    pub load: LoadOp<Color>,
    /// Whether results are stored.
    pub store: bool,
}

/// The depth attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDepthAttachment {
    /// The depth view.
    pub view: TextureViewId,
    /// The load operation.
    pub load: LoadOp<f32>,
    /// Whether depth results are stored.
    pub store: bool,
}

/// Describes a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// Color outputs.
    pub color_attachments: &'a [RenderPassColorAttachment],
    /// Depth output.
    pub depth_attachment: Option<RenderPassDepthAttachment>,
}

/// Describes a compute pass.
#[derive(Debug, Clone, Default)]
pub struct ComputePassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
}

/// A pipeline stage plus the kind of access performed in it: one side of a
/// barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessScope {
    /// Compute shader writes (storage buffers, storage images).
    ComputeWrite,
    /// Compute shader reads.
    ComputeRead,
    /// Indirect argument reads by a draw call.
    IndirectRead,
    /// Vertex/fragment shader reads.
    ShaderRead,
    /// Depth attachment reads and writes.
    DepthAttachment,
    /// Copy destination.
    TransferWrite,
    /// Copy source.
    TransferRead,
    /// Host reads after mapping.
    HostRead,
}

/// A memory dependency recorded between two commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    /// Orders accesses to a buffer.
    Buffer {
        /// The buffer.
        buffer: BufferId,
        /// Accesses that must complete first.
        src: AccessScope,
        /// Accesses that wait.
        dst: AccessScope,
    },
    /// Orders accesses to a mip range of a texture.
    Texture {
        /// The texture.
        texture: TextureId,
        /// First mip level covered.
        base_mip_level: u32,
        /// Number of mip levels covered.
        mip_level_count: u32,
        /// Accesses that must complete first.
        src: AccessScope,
        /// Accesses that wait.
        dst: AccessScope,
    },
}

impl Barrier {
    /// The barrier between a culling dispatch and the indirect draw reading
    /// the same buffer.
    pub const fn cull_to_indirect(buffer: BufferId) -> Self {
        Barrier::Buffer {
            buffer,
            src: AccessScope::ComputeWrite,
            dst: AccessScope::IndirectRead,
        }
    }

    /// Returns the destination scope.
    pub const fn dst(&self) -> AccessScope {
        match self {
            Barrier::Buffer { dst, .. } | Barrier::Texture { dst, .. } => *dst,
        }
    }
}
