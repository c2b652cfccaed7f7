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

//! Shader module handles and descriptors.

use crate::solve_bitflags;
use std::borrow::Cow;

/// Represents the source data for a shader module.
#[derive(Debug, Clone)]
pub enum ShaderSourceData<'a> {
    /// WGSL source text.
    Wgsl(Cow<'a, str>),
}

/// Describes a shader module to be created by the `GraphicsDevice`.
///
/// A module may hold several entry points; pipelines pick theirs by name.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The shader source.
    pub source: ShaderSourceData<'a>,
}

impl<'a> ShaderModuleDescriptor<'a> {
    /// Builds a descriptor around static WGSL source.
    pub fn wgsl(label: &'a str, source: &'a str) -> Self {
        Self {
            label: Some(label),
            source: ShaderSourceData::Wgsl(Cow::Borrowed(source)),
        }
    }
}

/// An opaque handle representing a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub usize);

solve_bitflags! {
    /// Which shader stages can access a resource binding.
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Fragment shader stage.
        const FRAGMENT = 1 << 1;
        /// Compute shader stage.
        const COMPUTE = 1 << 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_module_descriptor_creation() {
        let descriptor = ShaderModuleDescriptor::wgsl("test_shader", "fn main() {}");
        assert_eq!(descriptor.label, Some("test_shader"));
        let ShaderSourceData::Wgsl(ref cow) = descriptor.source;
        assert_eq!(cow.as_ref(), "fn main() {}");
    }

    #[test]
    fn shader_stage_flags_combine() {
        let vf = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT;
        assert!(vf.contains(ShaderStageFlags::FRAGMENT));
        assert!(!vf.contains(ShaderStageFlags::COMPUTE));
    }
}
