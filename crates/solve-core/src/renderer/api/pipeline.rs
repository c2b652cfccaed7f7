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

//! Pipeline layouts, compute pipelines and render pipelines.
//!
//! Render pipelines in this renderer never declare vertex buffers: vertex data
//! is pulled from storage buffers in the shader, indexed by the instance's
//! object ID. A render pipeline is therefore fully described by its shaders,
//! its targets and its depth state.

use super::bind_group::BindGroupLayoutId;
use super::shader::ShaderModuleId;
use super::texture::TextureFormat;
use std::borrow::Cow;

/// An opaque handle to a pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineLayoutId(pub usize);

/// Describes a pipeline layout: the ordered bind group layouts of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// One layout per `@group(n)`, in order.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
}

/// An opaque handle to a compiled compute pipeline state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputePipelineId(pub u64);

/// A descriptor used to create a [`ComputePipelineId`].
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor<'a> {
    /// An optional debug label for the compute pipeline.
    pub label: Option<Cow<'a, str>>,
    /// The pipeline layout. `None` lets the backend infer it from the shader.
    pub layout: Option<PipelineLayoutId>,
    /// The compiled compute shader module.
    pub shader_module: ShaderModuleId,
    /// The name of the entry point function in the compute shader.
    pub entry_point: Cow<'a, str>,
}

/// An opaque handle to a compiled render pipeline state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPipelineId(pub usize);

/// Comparison function used for depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Passes if the new value is less than the stored one.
    Less,
    /// Passes if the new value is less than or equal to the stored one.
    LessEqual,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is greater than the stored one.
    Greater,
    /// Passes if the new value is greater than or equal to the stored one.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Which triangle faces are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    /// Front faces (counter-clockwise).
    Front,
    /// Back faces.
    Back,
}

/// Blending applied to a color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Standard `src_alpha, 1 - src_alpha` blending.
    AlphaBlending,
}

/// One color output of a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    /// The attachment format.
    pub format: TextureFormat,
    /// Blending, or `None` to overwrite.
    pub blend: Option<BlendMode>,
}

/// Depth test and write state of a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilState {
    /// The depth attachment format.
    pub format: TextureFormat,
    /// Whether passing fragments write their depth.
    pub depth_write_enabled: bool,
    /// The depth comparison.
    pub depth_compare: CompareFunction,
    /// Constant depth bias, used by the shadow pass.
    pub depth_bias: i32,
    /// Slope-scaled depth bias.
    pub depth_bias_slope_scale: f32,
}

/// A descriptor used to create a [`RenderPipelineId`].
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The pipeline layout.
    pub layout: Option<PipelineLayoutId>,
    /// Module holding the vertex entry point.
    pub vertex_shader_module: ShaderModuleId,
    /// The vertex entry point.
    pub vertex_entry_point: Cow<'a, str>,
    /// Module holding the fragment entry point, if any. Depth-only passes have none.
    pub fragment_shader_module: Option<ShaderModuleId>,
    /// The fragment entry point.
    pub fragment_entry_point: Option<Cow<'a, str>>,
    /// Color outputs.
    pub color_targets: Vec<ColorTargetState>,
    /// Depth state.
    pub depth_stencil: Option<DepthStencilState>,
    /// Face culling.
    pub cull_mode: Option<Face>,
}
